//! System coordinator for managing service lifecycle and dependency injection.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::{debug, info, warn};
use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::{
    app_context::{AppState, RunMode},
    config::ConfigManager,
    event::{Event, EventBus},
    providers::{
        AppStateProvider, AsyncProvider, DisplayServiceProvider, HttpServiceProvider,
        ServiceProvider,
    },
    task_manager::TaskManager,
};

/// Owns the service providers and drives them from startup to shutdown.
///
/// Providers start in priority order. A critical provider that fails to
/// start aborts startup; the others are logged and skipped.
pub struct SystemCoordinator {
    mode: RunMode,
    task_manager: TaskManager,
    event_bus: EventBus,
    event_rx: Option<Receiver<Event>>,
    shared_state: Option<Arc<AppState>>,
    service_providers: Vec<Box<dyn ServiceProvider>>,
}

impl Default for SystemCoordinator {
    fn default() -> Self {
        Self::new(RunMode::default())
    }
}

impl SystemCoordinator {
    pub fn new(mode: RunMode) -> Self {
        let event_bus = EventBus::new();
        Self {
            mode,
            task_manager: TaskManager::with_event_bus(event_bus.clone()),
            event_rx: Some(event_bus.subscribe()),
            event_bus,
            shared_state: None,
            service_providers: Vec::new(),
        }
    }

    /// Builds the shared state and registers the providers for the run mode.
    pub async fn initialize(&mut self, config_manager: ConfigManager) -> Result<()> {
        info!("Initializing SystemCoordinator in {:?} mode...", self.mode);

        let app_state_provider =
            AppStateProvider::new(config_manager, self.event_bus.clone(), self.mode);
        let state = app_state_provider
            .provide()
            .await
            .context("Failed to initialize application state")?;
        self.shared_state = Some(state.clone());

        self.register_service_providers(state)
            .await
            .context("Failed to register service providers")?;

        info!("SystemCoordinator initialization completed");
        Ok(())
    }

    async fn register_service_providers(&mut self, state: Arc<AppState>) -> Result<()> {
        let mut providers: Vec<Box<dyn ServiceProvider>> = Vec::new();

        match self.mode {
            RunMode::Serve => {
                providers.push(Box::new(
                    HttpServiceProvider::new(state.clone())
                        .await
                        .context("Failed to create HTTP service")?,
                ));
                if state.config().await.display.enabled {
                    providers.push(Box::new(DisplayServiceProvider::new(state.clone())));
                } else {
                    info!("Co-located display disabled");
                }
            }
            RunMode::Display => {
                providers.push(Box::new(DisplayServiceProvider::new(state.clone())));
            }
        }

        providers.sort_by_key(|b| std::cmp::Reverse(b.priority()));
        self.service_providers = providers;

        info!(
            "Registered {} service providers in priority order",
            self.service_providers.len()
        );

        Ok(())
    }

    /// Starts all registered services in priority order.
    pub async fn start_all_services(&mut self) -> Result<()> {
        info!(
            "Starting {} services in priority order...",
            self.service_providers.len()
        );

        for provider in &self.service_providers {
            let is_critical = provider.is_critical();

            match provider.start(&mut self.task_manager).await {
                Ok(()) => {
                    info!(
                        "Service '{}' started successfully (priority: {}, critical: {})",
                        provider.name(),
                        provider.priority(),
                        is_critical
                    );
                }
                Err(e) if is_critical => {
                    return Err(e).with_context(|| {
                        format!("Critical service '{}' failed to start", provider.name())
                    });
                }
                Err(e) => {
                    warn!(
                        "Non-critical service '{}' failed to start: {e:#}",
                        provider.name()
                    );
                }
            }
        }

        info!("All critical services started successfully");
        Ok(())
    }

    /// Waits for Ctrl+C or a shutdown event, then stops every service.
    pub async fn run_main_loop(&mut self) -> Result<()> {
        // Subscribed at construction so a task failing during startup is not missed.
        let mut event_rx = self
            .event_rx
            .take()
            .unwrap_or_else(|| self.event_bus.subscribe());
        info!("Starting main event loop");

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    result.context("Failed to listen for shutdown signal")?;
                    info!("Received Ctrl+C, initiating graceful shutdown...");
                    break;
                }

                event = event_rx.recv() => {
                    if self.handle_event(event)? {
                        break;
                    }
                }
            }
        }

        self.shutdown()
            .await
            .context("Failed to shutdown gracefully")?;
        info!("Main event loop terminated");
        Ok(())
    }

    /// Logs an event; returns `true` when the daemon should stop.
    fn handle_event(&self, event_result: Result<Event, RecvError>) -> Result<bool> {
        match event_result {
            Ok(Event::SlotsRefreshed(snapshot)) => {
                debug!("Slots refreshed: {snapshot:?}");
            }
            Ok(Event::SlotsUpdated(applied)) => {
                info!("External update applied to {} slots", applied.len());
            }
            Ok(Event::SystemShutdown) => {
                info!("Processing SystemShutdown event");
                return Ok(true);
            }
            Err(RecvError::Closed) => {
                bail!("Event bus channel closed unexpectedly");
            }
            Err(RecvError::Lagged(n)) => {
                warn!("Event bus lagged by {n} messages");
            }
        }
        Ok(false)
    }

    /// Performs graceful shutdown of all components.
    async fn shutdown(&mut self) -> Result<()> {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.task_manager.shutdown_all().await {
            log::error!("Error during task shutdown: {e:#}");
        }

        info!("Shutdown complete");
        Ok(())
    }

    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn running_services(&self) -> Vec<&'static str> {
        self.service_providers.iter().map(|p| p.name()).collect()
    }
}
