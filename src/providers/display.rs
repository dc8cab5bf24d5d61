//! Status display service provider.

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    app_context::{AppState, RunMode},
    display_sync::DisplaySync,
    providers::traits::ServiceProvider,
    renderer::StatusBoardRenderer,
    state_source::{HttpStateSource, LocalStateSource, StateSource},
    task_manager::TaskManager,
};

/// Display sync service provider.
///
/// Polls the state service and repaints the status board for every slot
/// that changed. When the daemon also serves the state, the display reads
/// it in-process; otherwise it polls the configured URL.
///
/// # Priority and Criticality
///
/// - **Priority**: 5
/// - **Critical**: only in display mode, where it is the sole service
pub struct DisplayServiceProvider {
    state: Arc<AppState>,
}

impl DisplayServiceProvider {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    async fn build_sync(&self) -> Result<DisplaySync> {
        let config = self.state.config().await;
        let display = &config.display;

        let source: Box<dyn StateSource> = match &self.state.service {
            Some(service) => {
                info!("Display reading local state service");
                Box::new(LocalStateSource::new(
                    service.clone(),
                    display.fetch_timeout(),
                ))
            }
            None => {
                info!("Display polling {}", display.url);
                Box::new(HttpStateSource::new(
                    display.url.clone(),
                    display.fetch_timeout(),
                )?)
            }
        };

        Ok(DisplaySync::new(
            config.slot_ids(),
            source,
            Box::new(StatusBoardRenderer),
            display.poll_interval(),
        ))
    }
}

#[async_trait]
impl ServiceProvider for DisplayServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let sync = self.build_sync().await?;
        let task = |cancel_token: CancellationToken| async move { sync.run(cancel_token).await };

        if self.is_critical() {
            task_manager
                .spawn_critical_task(self.name().to_string(), task)
                .await
        } else {
            task_manager.spawn_task(self.name().to_string(), task).await
        }
    }

    fn name(&self) -> &'static str {
        "DisplayService"
    }

    fn priority(&self) -> i32 {
        5
    }

    fn is_critical(&self) -> bool {
        self.state.mode == RunMode::Display
    }
}
