//! HTTP and WebSocket surface: the axum router, REST handlers for
//! pipeline runs, dataset versions, and human evaluation, and the
//! session-room WebSocket endpoint that streams pipeline events.

pub mod error;
pub mod health;
pub mod human_eval;
pub mod router;
pub mod run_pipeline;
pub mod state;
pub mod versions;
pub mod ws;

pub use error::ApiError;
pub use router::router;
pub use state::AppState;
