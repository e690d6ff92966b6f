use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::debug;

/// 启动阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initializing,
    Ready,
}

/// 一次性初始化
///
/// 第一次调用 [`Bootstrap::ensure_started`] 时执行初始化，
/// 并发调用方等待同一次初始化完成并拿到同一个实例。
pub struct Bootstrap<T> {
    phase: watch::Sender<Phase>,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for Bootstrap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Bootstrap<T> {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(Phase::Uninitialized);
        Self {
            phase,
            slot: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub async fn ensure_started<F, Fut>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(ready) = slot.as_ref() {
            return Arc::clone(ready);
        }

        self.phase.send_replace(Phase::Initializing);
        debug!("开始初始化");
        let ready = Arc::new(init().await);
        *slot = Some(Arc::clone(&ready));
        self.phase.send_replace(Phase::Ready);
        ready
    }

    /// 已就绪时返回实例，不触发初始化
    pub async fn get(&self) -> Option<Arc<T>> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_init() {
        let bootstrap = Arc::new(Bootstrap::<usize>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let start = |bootstrap: Arc<Bootstrap<usize>>, runs: Arc<AtomicUsize>| async move {
            bootstrap
                .ensure_started(|| async {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    runs.fetch_add(1, Ordering::SeqCst) + 42
                })
                .await
        };

        let first = tokio::spawn(start(bootstrap.clone(), runs.clone()));
        let second = tokio::spawn(start(bootstrap.clone(), runs.clone()));
        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, 42);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(bootstrap.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_phase_transitions() {
        let bootstrap = Bootstrap::<String>::new();
        assert_eq!(bootstrap.phase(), Phase::Uninitialized);
        assert!(bootstrap.get().await.is_none());

        let mut phases = bootstrap.subscribe();
        let value = bootstrap
            .ensure_started(|| async { "ready".to_string() })
            .await;
        assert_eq!(value.as_str(), "ready");
        assert!(phases.has_changed().unwrap());
        assert_eq!(*phases.borrow_and_update(), Phase::Ready);

        let again = bootstrap
            .ensure_started(|| async { "second".to_string() })
            .await;
        assert!(Arc::ptr_eq(&value, &again));
        assert_eq!(again.as_str(), "ready");
    }
}
