use anyhow::Result;
use async_trait::async_trait;

use crate::task_manager::TaskManager;

/// Base trait for providers that can create components asynchronously.
///
/// # Example
///
/// ```no_run
/// use parkd::providers::traits::AsyncProvider;
///
/// struct ListenAddrProvider;
///
/// #[async_trait::async_trait]
/// impl AsyncProvider<String> for ListenAddrProvider {
///     async fn provide(&self) -> anyhow::Result<String> {
///         Ok("0.0.0.0:80".to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncProvider<T> {
    async fn provide(&self) -> Result<T>;
}

/// Trait for services that can be started through TaskManager.
///
/// Critical services abort startup when they fail to start; the others
/// are logged and skipped. Critical services spawn through
/// [`TaskManager::spawn_critical_task`] so a failure at runtime stops the daemon.
///
/// # Example
///
/// ```no_run
/// use parkd::providers::traits::ServiceProvider;
/// use parkd::task_manager::TaskManager;
/// use anyhow::Result;
///
/// struct HeartbeatService;
///
/// #[async_trait::async_trait]
/// impl ServiceProvider for HeartbeatService {
///     async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
///         task_manager.spawn_task("heartbeat".to_string(), |token| async move {
///             token.cancelled().await;
///             Ok(())
///         }).await
///     }
///
///     fn name(&self) -> &'static str { "HeartbeatService" }
/// }
/// ```
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Starts the service in TaskManager.
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()>;

    /// Returns service name for logging and management.
    fn name(&self) -> &'static str;

    /// Returns startup priority (higher numbers start first).
    fn priority(&self) -> i32 {
        0
    }

    /// Indicates if service is critical for system operation.
    fn is_critical(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };
    use tokio::time::{Duration, sleep};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AsyncProvider<usize> for CountingProvider {
        async fn provide(&self) -> Result<usize> {
            Ok(self.calls.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl AsyncProvider<String> for FailingProvider {
        async fn provide(&self) -> Result<String> {
            Err(anyhow!("sensor backend unavailable"))
        }
    }

    struct RecordingService {
        name: &'static str,
        priority: i32,
        critical: bool,
        ran: Arc<AtomicBool>,
    }

    impl RecordingService {
        fn new(name: &'static str, priority: i32, critical: bool) -> Self {
            Self {
                name,
                priority,
                critical,
                ran: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl ServiceProvider for RecordingService {
        async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
            let ran = self.ran.clone();
            task_manager
                .spawn_task(self.name.to_string(), move |_token| async move {
                    ran.store(true, Ordering::SeqCst);
                    Ok(())
                })
                .await
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn is_critical(&self) -> bool {
            self.critical
        }
    }

    struct BrokenService;

    #[async_trait]
    impl ServiceProvider for BrokenService {
        async fn start(&self, _task_manager: &mut TaskManager) -> Result<()> {
            Err(anyhow!("BrokenService: address already in use"))
        }

        fn name(&self) -> &'static str {
            "BrokenService"
        }
    }

    #[tokio::test]
    async fn async_provider_is_called_each_time() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };

        assert_eq!(provider.provide().await.unwrap(), 1);
        assert_eq!(provider.provide().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn async_provider_error_propagates() {
        let err = FailingProvider.provide().await.unwrap_err();
        assert_eq!(err.to_string(), "sensor backend unavailable");
    }

    #[tokio::test]
    async fn service_start_spawns_task() {
        let mut task_manager = TaskManager::new();
        let service = RecordingService::new("recording", 5, false);

        service.start(&mut task_manager).await.unwrap();
        sleep(Duration::from_millis(10)).await;

        assert!(service.ran.load(Ordering::SeqCst));
        assert!(task_manager.is_running("recording"));
        task_manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn service_defaults_are_low_priority_non_critical() {
        assert_eq!(BrokenService.priority(), 0);
        assert!(!BrokenService.is_critical());
    }

    #[tokio::test]
    async fn failing_start_reports_service_name() {
        let mut task_manager = TaskManager::new();

        let err = BrokenService.start(&mut task_manager).await.unwrap_err();
        assert!(err.to_string().contains("BrokenService"));
        assert_eq!(task_manager.active_count(), 0);
    }

    #[tokio::test]
    async fn providers_sort_by_priority() {
        let mut services: Vec<Box<dyn ServiceProvider>> = vec![
            Box::new(RecordingService::new("display", 5, false)),
            Box::new(BrokenService),
            Box::new(RecordingService::new("http", 10, true)),
        ];
        services.sort_by_key(|s| std::cmp::Reverse(s.priority()));

        let order: Vec<_> = services.iter().map(|s| s.name()).collect();
        assert_eq!(order, vec!["http", "display", "BrokenService"]);
    }
}
