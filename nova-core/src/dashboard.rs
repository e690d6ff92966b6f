//! 控制台会话：组装各组件并维护页面状态
//!
//! 组件全部在 [`Dashboard::mount`] 中一次性构造，之后不再替换。

use crate::aggregator::{FetchAggregator, Published, Refresh, RefreshSummary};
use crate::api::BackupApi;
use crate::confirm::{ConfirmationGate, GateState, PendingAction, Prompt};
use crate::dispatcher::ActionDispatcher;
use crate::error::{NovaError, Result};
use crate::models::{
    AliExportReceipt, AwsExportReceipt, BackupRecord, EnvironmentId, Provider, S3Target,
    SnapshotRecord,
};
use crate::notify::{Notification, Notifier};
use crate::poller::{ActivePredicate, Poller};
use crate::registry::EnvironmentRegistry;
use crate::view::{AliColumn, AwsColumn, TableView, ViewQuery};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 会话依赖
pub struct DashboardDeps {
    pub api: Arc<dyn BackupApi>,
    pub notifier: Arc<dyn Notifier>,
    /// 为 None 时从后端加载环境清单
    pub registry: Option<EnvironmentRegistry>,
    pub poll_interval: Duration,
    /// 打开后首先显示的标签页，页面默认为阿里云
    pub initial_tab: Provider,
}

/// 导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Aws(AwsExportReceipt),
    Aliyun(AliExportReceipt),
}

pub struct Dashboard {
    notifier: Arc<dyn Notifier>,
    aggregator: Arc<FetchAggregator>,
    dispatcher: ActionDispatcher,
    gate: Mutex<ConfirmationGate>,
    s3_target: Option<S3Target>,
    active: Arc<watch::Sender<Provider>>,
    aws_poller: Poller,
    poll_interval: Duration,
    torn_down: Arc<AtomicBool>,
}

impl Dashboard {
    /// 加载环境清单和 S3 配置，并刷新初始标签页
    pub async fn mount(deps: DashboardDeps) -> Self {
        let DashboardDeps {
            api,
            notifier,
            registry,
            poll_interval,
            initial_tab,
        } = deps;

        let registry = match registry {
            Some(registry) => registry,
            None => EnvironmentRegistry::load(api.as_ref(), notifier.as_ref()).await,
        };

        let s3_target = match api.s3_config().await {
            Ok(target) => {
                info!(bucket = %target.bucket_name, region = %target.region, "S3 配置加载完成");
                Some(target)
            }
            Err(e) => {
                error!("获取S3配置失败: {}", e);
                notifier.notify(Notification::error(format!("获取S3配置失败：{}", e.reason())));
                None
            }
        };

        let aggregator = Arc::new(FetchAggregator::new(
            Arc::clone(&api),
            Arc::new(registry),
            Arc::clone(&notifier),
        ));
        let refresher: Arc<dyn Refresh> = aggregator.clone();
        let (active, _) = watch::channel(initial_tab);

        let dashboard = Self {
            dispatcher: ActionDispatcher::new(api, Arc::clone(&notifier)),
            notifier,
            aws_poller: Poller::new(Provider::Aws, refresher),
            aggregator,
            gate: Mutex::new(ConfirmationGate::new()),
            s3_target,
            active: Arc::new(active),
            poll_interval,
            torn_down: Arc::new(AtomicBool::new(false)),
        };
        dashboard.refresh_active().await;
        dashboard
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        self.aggregator.registry()
    }

    pub fn s3_target(&self) -> Option<&S3Target> {
        self.s3_target.as_ref()
    }

    pub fn active_tab(&self) -> Provider {
        *self.active.borrow()
    }

    pub fn subscribe_aliyun(&self) -> watch::Receiver<Published<BackupRecord>> {
        self.aggregator.subscribe_aliyun()
    }

    pub fn subscribe_aws(&self) -> watch::Receiver<Published<SnapshotRecord>> {
        self.aggregator.subscribe_aws()
    }

    /// 切换标签页并刷新新标签页数据；清单为空时不发请求
    pub async fn switch_tab(&self, provider: Provider) -> Option<RefreshSummary> {
        self.active.send_replace(provider);
        self.refresh_active().await
    }

    /// 刷新当前标签页
    pub async fn refresh_active(&self) -> Option<RefreshSummary> {
        if self.is_torn_down() || self.registry().is_empty() {
            return None;
        }
        Some(self.aggregator.refresh(self.active_tab()).await)
    }

    pub fn aliyun_view(&self, query: &ViewQuery<AliColumn>) -> TableView<BackupRecord> {
        TableView::build(&self.aggregator.aliyun_records(), query)
    }

    pub fn aws_view(&self, query: &ViewQuery<AwsColumn>) -> TableView<SnapshotRecord> {
        TableView::build(&self.aggregator.aws_records(), query)
    }

    pub fn gate_state(&self) -> GateState {
        self.gate().state().clone()
    }

    /// 为当前数据中的记录打开确认框，前置条件不满足时直接拒绝
    pub fn request_export(&self, provider: Provider, env: &EnvironmentId) -> Result<Prompt> {
        let action = match provider {
            Provider::Aws => {
                let record = self
                    .aggregator
                    .aws_records()
                    .iter()
                    .find(|r| &r.env == env)
                    .cloned()
                    .ok_or_else(|| NovaError::UnknownEnvironment {
                        provider,
                        env: env.clone(),
                    })?;
                ActionDispatcher::check_aws_export(&record)?;
                PendingAction::ExportAwsSnapshot(record)
            }
            Provider::Aliyun => {
                let record = self
                    .aggregator
                    .aliyun_records()
                    .iter()
                    .find(|r| &r.env == env)
                    .cloned()
                    .ok_or_else(|| NovaError::UnknownEnvironment {
                        provider,
                        env: env.clone(),
                    })?;
                let target = ActionDispatcher::check_ali_export(self.s3_target.as_ref())?;
                PendingAction::ExportAliBackup {
                    record,
                    target: target.clone(),
                }
            }
        };
        self.gate().begin(action)
    }

    pub fn cancel_export(&self) -> Result<()> {
        let action = self.gate().cancel()?;
        info!(env = %action.env(), "取消导出");
        self.notifier.notify(Notification::info("已取消导出操作"));
        Ok(())
    }

    /// 执行已确认的导出；AWS 导出受理后启动定时刷新
    pub async fn confirm_export(&self) -> Result<ExportOutcome> {
        let action = self.gate().confirm()?;

        let outcome = match &action {
            PendingAction::ExportAwsSnapshot(record) => self
                .dispatcher
                .export_aws_snapshot(record)
                .await
                .map(ExportOutcome::Aws),
            PendingAction::ExportAliBackup { record, target } => self
                .dispatcher
                .export_ali_backup(record, Some(target))
                .await
                .map(ExportOutcome::Aliyun),
        };
        self.gate().settle();

        if matches!(outcome, Ok(ExportOutcome::Aws(_))) {
            self.start_aws_polling();
        }
        outcome
    }

    /// 仅在 AWS 标签页激活时刷新
    pub fn start_aws_polling(&self) -> bool {
        if self.is_torn_down() {
            warn!("会话已关闭，忽略轮询请求");
            return false;
        }
        let active = Arc::clone(&self.active);
        let torn_down = Arc::clone(&self.torn_down);
        let predicate: ActivePredicate = Arc::new(move || {
            !torn_down.load(Ordering::SeqCst) && *active.borrow() == Provider::Aws
        });
        self.aws_poller.start(self.poll_interval, predicate)
    }

    pub fn is_polling(&self) -> bool {
        self.aws_poller.is_running()
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// 关闭会话，停止轮询；在途请求的结果不再使用
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            self.aws_poller.stop();
            info!("控制台会话已关闭");
        }
    }

    fn gate(&self) -> MutexGuard<'_, ConfirmationGate> {
        self.gate
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.teardown();
    }
}
