//! HTTP service provider for dependency injection.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::info;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    app_context::AppState, interface::build_router, net, providers::traits::ServiceProvider,
    state_service::StateService, task_manager::TaskManager,
};

/// HTTP service provider exposing the occupancy state service.
///
/// # Priority and Criticality
///
/// - **Priority**: 10 (highest)
/// - **Critical**: Yes (the daemon is useless without it)
///
/// The listener is bound when the provider is created, so an address
/// already in use fails registration instead of surfacing later inside the
/// task. The server stops accepting connections once its cancellation
/// token fires and drains in-flight requests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use parkd::providers::HttpServiceProvider;
/// use parkd::app_context::AppState;
///
/// # async fn example(state: Arc<AppState>) -> anyhow::Result<()> {
/// let provider = HttpServiceProvider::new(state).await?;
/// println!("listening on {}", provider.local_addr()?);
/// # Ok(())
/// # }
/// ```
pub struct HttpServiceProvider {
    service: Arc<StateService>,
    listener: Mutex<Option<TcpListener>>,
}

impl HttpServiceProvider {
    /// Binds the configured listening address.
    pub async fn new(state: Arc<AppState>) -> Result<Self> {
        let service = state
            .service
            .clone()
            .ok_or_else(|| anyhow!("HTTP service requires a local state service"))?;

        let addr = {
            let config = state.config().await;
            format!("{}:{}", config.server.host, config.server.port)
        };
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        Ok(Self {
            service,
            listener: Mutex::new(Some(listener)),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr> {
        self.listener
            .lock()
            .map_err(|_| anyhow!("HTTP listener lock poisoned"))?
            .as_ref()
            .ok_or_else(|| anyhow!("HTTP service already started"))?
            .local_addr()
            .context("Failed to read listener address")
    }
}

#[async_trait]
impl ServiceProvider for HttpServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| anyhow!("HTTP listener lock poisoned"))?
            .take()
            .ok_or_else(|| anyhow!("HTTP service already started"))?;
        let service = self.service.clone();

        task_manager
            .spawn_critical_task(self.name().to_string(), |cancel_token| async move {
                run_http_service(listener, service, cancel_token).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "HttpService"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_critical(&self) -> bool {
        true
    }
}

async fn run_http_service(
    listener: TcpListener,
    service: Arc<StateService>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("State service listening on {addr}");
    info!("{}", net::banner(net::local_ip().await, addr.port()));

    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(cancel_token.cancelled_owned())
        .await
        .context("HTTP server terminated")?;

    info!("HTTP service cancelled");
    Ok(())
}
