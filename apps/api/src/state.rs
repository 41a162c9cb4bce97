use std::sync::Arc;

use crate::analysis::pipeline::Analyzer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide pipeline; holds the shared completion and audit clients.
    pub analyzer: Arc<Analyzer>,
}
