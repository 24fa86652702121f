// ABOUTME: Process-wide table of applications with a deployment in flight.
// ABOUTME: Test-and-set acquisition, released exactly once when the guard drops.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::types::AppName;

/// Tracks which applications are currently being deployed.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    busy: Mutex<HashSet<AppName>>,
    idle: Notify,
}

impl TaskRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark `app` busy if it is free.
    ///
    /// Returns `None`, changing nothing, while another deployment of the
    /// same application holds its guard.
    pub fn try_acquire(self: &Arc<Self>, app: &AppName) -> Option<TaskGuard> {
        if !self.busy.lock().insert(app.clone()) {
            return None;
        }
        tracing::debug!(app = %app, "deployment lock acquired");
        Some(TaskGuard {
            registry: Arc::clone(self),
            app: app.clone(),
        })
    }

    pub fn is_busy(&self, app: &AppName) -> bool {
        self.busy.lock().contains(app)
    }

    /// True when no application is being deployed; the process may exit.
    pub fn is_idle(&self) -> bool {
        self.busy.lock().is_empty()
    }

    /// Resolve once no application is busy.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not missed.
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    fn release(&self, app: &AppName) {
        let now_idle = {
            let mut busy = self.busy.lock();
            busy.remove(app);
            busy.is_empty()
        };
        tracing::debug!(app = %app, "deployment lock released");
        if now_idle {
            self.idle.notify_waiters();
        }
    }
}

/// Held for the lifetime of one deployment; releases the application on drop.
#[derive(Debug)]
pub struct TaskGuard {
    registry: Arc<TaskRegistry>,
    app: AppName,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.registry.release(&self.app);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn app(name: &str) -> AppName {
        AppName::new(name).unwrap()
    }

    #[test]
    fn second_acquire_fails_while_held() {
        let registry = TaskRegistry::new();
        let guard = registry.try_acquire(&app("shop"));
        assert!(guard.is_some());
        assert!(registry.try_acquire(&app("shop")).is_none());
        assert!(registry.is_busy(&app("shop")));
    }

    #[test]
    fn different_apps_do_not_conflict() {
        let registry = TaskRegistry::new();
        let _a = registry.try_acquire(&app("shop")).unwrap();
        let _b = registry.try_acquire(&app("blog")).unwrap();
        assert!(registry.is_busy(&app("blog")));
        assert!(registry.is_busy(&app("shop")));
    }

    #[test]
    fn drop_releases() {
        let registry = TaskRegistry::new();
        drop(registry.try_acquire(&app("shop")).unwrap());
        assert!(registry.is_idle());
        assert!(registry.try_acquire(&app("shop")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_resolves_after_last_release() {
        let registry = TaskRegistry::new();
        let guard = registry.try_acquire(&app("shop")).unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.wait_idle().await })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn wait_idle_returns_immediately_when_idle() {
        TaskRegistry::new().wait_idle().await;
    }
}
