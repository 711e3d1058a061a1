use std::sync::Arc;

use crate::config::Config;
use crate::providers::Providers;
use crate::session_memory::SessionLocks;

/// Shared state for all handlers. Chains and store handles are built per
/// request; only the session lock registry is shared mutable state.
pub struct AppState {
    pub config: Arc<Config>,
    pub providers: Arc<dyn Providers>,
    pub locks: SessionLocks,
}

impl AppState {
    pub fn new(config: Arc<Config>, providers: Arc<dyn Providers>) -> Arc<Self> {
        Arc::new(Self {
            config,
            providers,
            locks: SessionLocks::new(),
        })
    }
}
