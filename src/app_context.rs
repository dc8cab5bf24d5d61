//! Application state and global context management.

use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::{
    config::{Config, ConfigManager},
    event::EventBus,
    sensor_drivers,
    slot_store::SlotStore,
    state_service::StateService,
};

/// Which half of the system this process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// State service over HTTP, plus a co-located display when enabled.
    #[default]
    Serve,
    /// Display sync only, polling a remote state service.
    Display,
}

/// Shared application state handed to every service provider.
///
/// In [`RunMode::Display`] no store or sensors exist: the process only
/// talks to a remote state service.
pub struct AppState {
    /// Configuration manager for centralized config handling
    pub config_manager: Arc<ConfigManager>,
    /// Occupancy service owning the store and the sensor backend
    pub service: Option<Arc<StateService>>,
    pub mode: RunMode,
}

impl AppState {
    /// Creates the state for `mode`.
    ///
    /// Serving builds the slot store and the configured sensor backend, which
    /// may export GPIO lines.
    pub async fn new(
        config_manager: ConfigManager,
        event_bus: EventBus,
        mode: RunMode,
    ) -> Result<Self> {
        let config = config_manager.clone_config().await;

        let service = match mode {
            RunMode::Serve => Some(Arc::new(Self::build_service(&config, event_bus).await)),
            RunMode::Display => None,
        };

        Ok(Self {
            config_manager: Arc::new(config_manager),
            service,
            mode,
        })
    }

    async fn build_service(config: &Config, event_bus: EventBus) -> StateService {
        let store = Arc::new(SlotStore::new(config.slot_ids()));
        let sensors = sensor_drivers::from_config(config).await;
        info!(
            "Serving {} slots: {}",
            config.slots.len(),
            config
                .slots
                .iter()
                .map(|s| s.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        StateService::new(store, sensors, config.sensor_timeout(), event_bus)
    }

    /// Gets a read-only reference to the current configuration.
    pub async fn config(&self) -> tokio::sync::RwLockReadGuard<'_, Config> {
        self.config_manager.get().await
    }

    /// Gets the configuration manager.
    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config_manager
    }
}
