use clinician::AgentRunner;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<dyn AgentRunner>,
}

impl AppState {
    pub fn new(runner: Arc<dyn AgentRunner>) -> Self {
        Self { runner }
    }
}
