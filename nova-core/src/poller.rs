use crate::aggregator::Refresh;
use crate::models::Provider;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 判断当前页面是否处于激活状态
pub type ActivePredicate = Arc<dyn Fn() -> bool + Send + Sync>;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// 定时刷新
///
/// 每个实例只维护一个定时器，首次刷新发生在启动后一个完整周期。
/// 谓词不成立的周期直接跳过，不补发。
pub struct Poller {
    provider: Provider,
    refresher: Arc<dyn Refresh>,
    handle: Mutex<Option<PollHandle>>,
}

impl Poller {
    pub fn new(provider: Provider, refresher: Arc<dyn Refresh>) -> Self {
        Self {
            provider,
            refresher,
            handle: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// 启动定时器，已在运行时不做任何事并返回 false
    pub fn start(&self, interval: Duration, is_active: ActivePredicate) -> bool {
        let mut handle = self.lock();
        if handle.as_ref().is_some_and(|h| !h.task.is_finished()) {
            debug!(provider = %self.provider, "轮询已在运行");
            return false;
        }

        let interval = interval.max(MIN_INTERVAL);
        let token = CancellationToken::new();
        let task = tokio::spawn(poll_loop(
            self.provider,
            Arc::clone(&self.refresher),
            interval,
            is_active,
            token.clone(),
        ));
        info!(provider = %self.provider, interval_ms = interval.as_millis() as u64, "🔄 启动定时刷新");
        *handle = Some(PollHandle { token, task });
        true
    }

    /// 停止定时器，可重复调用；返回是否确实停止了一个运行中的定时器
    pub fn stop(&self) -> bool {
        match self.lock().take() {
            Some(handle) => {
                handle.token.cancel();
                info!(provider = %self.provider, "⏹️ 停止定时刷新");
                !handle.task.is_finished()
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|h| !h.task.is_finished() && !h.token.is_cancelled())
    }

    fn lock(&self) -> MutexGuard<'_, Option<PollHandle>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.lock().take() {
            handle.token.cancel();
        }
    }
}

async fn poll_loop(
    provider: Provider,
    refresher: Arc<dyn Refresh>,
    period: Duration,
    is_active: ActivePredicate,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if !is_active() {
                    debug!(provider = %provider, "页面未激活，跳过本次刷新");
                    continue;
                }
                let summary = refresher.refresh(provider).await;
                debug!(
                    provider = %provider,
                    pass = %summary.pass_id,
                    records = summary.records,
                    "定时刷新完成"
                );
            }
        }
    }
    debug!(provider = %provider, "轮询任务退出");
}
