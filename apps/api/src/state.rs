use std::sync::Arc;

use crate::config::Config;
use crate::optimizer::ResumeOptimizer;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    pub optimizer: Arc<ResumeOptimizer>,
    pub config: Config,
}
