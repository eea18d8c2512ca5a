use crate::config::Config;
use crate::enhancement::orchestrator::Orchestrator;
use crate::enhancement::registry::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionRegistry,
    /// Holds the pluggable `CvGenerator`. Default: `LlmCvGenerator`.
    pub orchestrator: Orchestrator,
    pub config: Config,
}
