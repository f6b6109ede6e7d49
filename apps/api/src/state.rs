use std::sync::Arc;

use crate::backend::BackendClient;
use crate::intake::IntakeOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeOrchestrator>,
    /// Job search and lookup passthroughs.
    pub backend: Arc<BackendClient>,
}
