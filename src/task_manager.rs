//! Task management for async service lifecycle.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::event::{Event, EventBus};

/// Upper bound for each task to wind down after cancellation.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Manages async tasks with proper lifecycle and error handling.
///
/// Every task receives a child of one global token, so a single
/// [`shutdown_all`](Self::shutdown_all) cancels them together.
pub struct TaskManager {
    tasks: HashMap<String, JoinHandle<Result<()>>>,
    pub global_token: CancellationToken,
    shutdown_bus: Option<EventBus>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            global_token: CancellationToken::new(),
            shutdown_bus: None,
        }
    }

    /// Task manager that publishes [`Event::SystemShutdown`] when a critical task fails.
    pub fn with_event_bus(event_bus: EventBus) -> Self {
        Self {
            shutdown_bus: Some(event_bus),
            ..Self::new()
        }
    }

    /// Spawns and registers a task with the given name.
    ///
    /// Spawning a second task under a name already in use is an error.
    pub async fn spawn_task<F, Fut>(&mut self, name: String, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn(name, false, task_fn)
    }

    /// Like [`spawn_task`](Self::spawn_task), but a failure of the task
    /// requests a daemon shutdown.
    pub async fn spawn_critical_task<F, Fut>(&mut self, name: String, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        self.spawn(name, true, task_fn)
    }

    fn spawn<F, Fut>(&mut self, name: String, critical: bool, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        if self.tasks.contains_key(&name) {
            return Err(anyhow!("Task '{name}' is already running"));
        }

        let task_token = self.global_token.child_token();
        let task_name = name.clone();
        let shutdown_bus = self.shutdown_bus.clone().filter(|_| critical);

        let handle = tokio::spawn(async move {
            info!("Starting task: {task_name}");
            let result = task_fn(task_token).await;
            match &result {
                Ok(()) => info!("Task '{task_name}' completed successfully"),
                Err(e) => error!("Task '{task_name}' failed: {e:#}"),
            }
            if let (Err(_), Some(bus)) = (&result, shutdown_bus) {
                warn!("Critical task '{task_name}' is down, requesting shutdown");
                if bus.publish(Event::SystemShutdown).is_err() {
                    warn!("No subscriber for shutdown request from '{task_name}'");
                }
            }
            result
        });

        self.tasks.insert(name.clone(), handle);
        info!("Task '{name}' spawned");
        Ok(())
    }

    /// Cancels every task and waits for each to stop.
    ///
    /// Returns the first error encountered, if any.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        info!("Stopping all {} tasks", self.tasks.len());

        self.global_token.cancel();

        let mut first_error = None;
        for (name, handle) in self.tasks.drain() {
            let error = match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(Ok(()))) => continue,
                Ok(Ok(Err(e))) => {
                    warn!("Task '{name}' failed during shutdown: {e}");
                    e
                }
                Ok(Err(e)) => {
                    let error = anyhow!("Task '{name}' panicked: {e}");
                    error!("{error}");
                    error
                }
                Err(_) => {
                    let error = anyhow!("Task '{name}' did not stop within {SHUTDOWN_TIMEOUT:?}");
                    error!("{error}");
                    error
                }
            };
            first_error.get_or_insert(error);
        }

        match first_error {
            Some(error) => Err(error).context("One or more tasks failed during shutdown"),
            None => {
                info!("All tasks stopped");
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    pub fn is_running(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
