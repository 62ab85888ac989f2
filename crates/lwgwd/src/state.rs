//! Application state for the ingress API

use std::sync::Arc;

use lwgw_gateway::GatewayEngine;

/// Shared across all handlers
#[derive(Clone)]
pub struct AppState {
    engine: Arc<GatewayEngine>,
}

impl AppState {
    pub fn new(engine: Arc<GatewayEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &GatewayEngine {
        &self.engine
    }
}
