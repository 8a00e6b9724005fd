//! Shared application state.

use std::sync::Arc;

use medimind_core::AssistantConfig;
use medimind_gateway::BackendGateway;
use medimind_ledger::SessionLedger;
use medimind_runtime::QueryOrchestrator;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: AssistantConfig,
    pub gateway: Arc<BackendGateway>,
    pub ledger: Arc<SessionLedger>,
    pub orchestrator: QueryOrchestrator,
}

impl AppState {
    pub fn new(config: AssistantConfig, gateway: Arc<BackendGateway>) -> Self {
        let ledger = Arc::new(SessionLedger::new());
        let orchestrator = QueryOrchestrator::new(gateway.clone(), ledger.clone())
            .with_policy(config.synthesis_policy);

        Self {
            config,
            gateway,
            ledger,
            orchestrator,
        }
    }

    /// Seconds since the epoch, used to name default snapshot and export files.
    pub fn unix_now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}
