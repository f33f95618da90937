use crate::recommendation::RecommendationPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the completion client, the department catalog and the corpus store.
    pub pipeline: RecommendationPipeline,
}
