use std::sync::Arc;

use crate::config::Config;
use crate::plan::pipeline::PlanGenerator;
use crate::preferences::FeedbackStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub generator: PlanGenerator,
    /// Feedback history. Default: PgFeedbackStore over the lazily-connected pool.
    pub feedback: Arc<dyn FeedbackStore>,
    pub config: Config,
}
