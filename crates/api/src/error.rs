use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use goalconvo_domain::error::Error;

/// Wraps [`Error`] so handlers can return it directly via `?` and have
/// axum translate it into an HTTP response.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidDialogue(_) | Error::ConfigError(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Timeout(_) | Error::TransportFailure(_) | Error::BadLlmResponse(_) | Error::Io(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
