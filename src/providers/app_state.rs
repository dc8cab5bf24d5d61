//! Application state provider for dependency injection.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    app_context::{AppState, RunMode},
    config::ConfigManager,
    event::EventBus,
    providers::traits::AsyncProvider,
};

/// Provider for creating and initializing application state.
///
/// Handles async initialization of the slot store and the sensor backend,
/// which may export GPIO lines.
pub struct AppStateProvider {
    config_manager: ConfigManager,
    event_bus: EventBus,
    mode: RunMode,
}

impl AppStateProvider {
    pub const fn new(config_manager: ConfigManager, event_bus: EventBus, mode: RunMode) -> Self {
        Self {
            config_manager,
            event_bus,
            mode,
        }
    }
}

#[async_trait]
impl AsyncProvider<Arc<AppState>> for AppStateProvider {
    async fn provide(&self) -> Result<Arc<AppState>> {
        let app_state =
            AppState::new(self.config_manager.clone(), self.event_bus.clone(), self.mode).await?;
        Ok(Arc::new(app_state))
    }
}
