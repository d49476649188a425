use goalconvo_pipeline::PipelineContext;

/// Shared application state passed to all API handlers. A thin wrapper
/// over [`PipelineContext`] so axum's `State` extractor has a single,
/// cheaply cloneable type to carry.
#[derive(Clone)]
pub struct AppState {
    pub ctx: PipelineContext,
}

impl AppState {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}
