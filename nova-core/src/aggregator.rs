//! 按环境并发拉取备份/快照状态，汇总成整表一次性替换

use crate::api::BackupApi;
use crate::error::{FetchError, NovaError, Result};
use crate::models::{BackupRecord, EnvironmentId, Provider, SnapshotRecord};
use crate::notify::{Notification, Notifier};
use crate::registry::EnvironmentRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

/// 一次刷新的结果
#[derive(Debug, Clone)]
pub struct RefreshReport<R> {
    pub provider: Provider,
    /// 刷新批次标识，用于日志关联
    pub pass_id: Uuid,
    pub issued_at: DateTime<Utc>,
    /// 按清单顺序排列的每个环境结果
    pub outcomes: Vec<(EnvironmentId, std::result::Result<R, FetchError>)>,
    /// 是否成为当前展示的数据（被更新的批次抢先时为 false）
    pub published: bool,
}

impl<R: Clone> RefreshReport<R> {
    pub fn records(&self) -> Vec<R> {
        self.outcomes
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok().cloned())
            .collect()
    }

    /// 失败的环境，不含 404
    pub fn failures(&self) -> Vec<(&EnvironmentId, &FetchError)> {
        self.outcomes
            .iter()
            .filter_map(|(env, result)| match result {
                Err(e) if !e.is_not_found() => Some((env, e)),
                _ => None,
            })
            .collect()
    }

    pub fn summary(&self) -> RefreshSummary {
        RefreshSummary {
            provider: self.provider,
            pass_id: self.pass_id,
            total: self.outcomes.len(),
            records: self.outcomes.iter().filter(|(_, r)| r.is_ok()).count(),
            failed: self.failures().into_iter().map(|(env, _)| env.clone()).collect(),
            published: self.published,
        }
    }
}

/// 不带记录内容的刷新摘要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshSummary {
    pub provider: Provider,
    pub pass_id: Uuid,
    pub total: usize,
    pub records: usize,
    pub failed: Vec<EnvironmentId>,
    pub published: bool,
}

impl RefreshSummary {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    /// 存在失败环境时转换为 `PartialBatch` 错误
    pub fn ensure_complete(&self) -> Result<()> {
        if self.is_partial() {
            return Err(NovaError::PartialBatch {
                provider: self.provider,
                failed: self.failed.clone(),
            });
        }
        Ok(())
    }
}

/// 已发布的整表数据
#[derive(Debug)]
pub struct Published<R> {
    pub generation: u64,
    pub records: Arc<Vec<R>>,
}

impl<R> Clone for Published<R> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            records: Arc::clone(&self.records),
        }
    }
}

/// 记录存储
///
/// 只支持整表替换；批次号不大于当前值的结果直接丢弃，
/// 先发出但后返回的批次不会覆盖较新的数据。
#[derive(Debug)]
pub struct RecordStore<R> {
    sender: watch::Sender<Published<R>>,
}

impl<R> Default for RecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> RecordStore<R> {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Published {
            generation: 0,
            records: Arc::new(Vec::new()),
        });
        Self { sender }
    }

    pub fn current(&self) -> Arc<Vec<R>> {
        Arc::clone(&self.sender.borrow().records)
    }

    pub fn generation(&self) -> u64 {
        self.sender.borrow().generation
    }

    pub fn subscribe(&self) -> watch::Receiver<Published<R>> {
        self.sender.subscribe()
    }

    fn publish(&self, generation: u64, records: Vec<R>) -> bool {
        let mut records = Some(records);
        self.sender.send_if_modified(|current| {
            if generation <= current.generation {
                return false;
            }
            *current = Published {
                generation,
                records: Arc::new(records.take().unwrap_or_default()),
            };
            true
        })
    }
}

/// 可被轮询器调用的刷新操作
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self, provider: Provider) -> RefreshSummary;
}

/// 抓取汇总器
pub struct FetchAggregator {
    api: Arc<dyn BackupApi>,
    registry: Arc<EnvironmentRegistry>,
    notifier: Arc<dyn Notifier>,
    aliyun: RecordStore<BackupRecord>,
    aws: RecordStore<SnapshotRecord>,
    generation: AtomicU64,
}

impl FetchAggregator {
    pub fn new(
        api: Arc<dyn BackupApi>,
        registry: Arc<EnvironmentRegistry>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            registry,
            notifier,
            aliyun: RecordStore::new(),
            aws: RecordStore::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &EnvironmentRegistry {
        &self.registry
    }

    pub fn aliyun_records(&self) -> Arc<Vec<BackupRecord>> {
        self.aliyun.current()
    }

    pub fn aws_records(&self) -> Arc<Vec<SnapshotRecord>> {
        self.aws.current()
    }

    pub fn subscribe_aliyun(&self) -> watch::Receiver<Published<BackupRecord>> {
        self.aliyun.subscribe()
    }

    pub fn subscribe_aws(&self) -> watch::Receiver<Published<SnapshotRecord>> {
        self.aws.subscribe()
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 刷新阿里云备份列表
    pub async fn refresh_aliyun(&self) -> RefreshReport<BackupRecord> {
        let generation = self.next_generation();
        let pass_id = Uuid::now_v7();
        let span = info_span!("refresh", provider = "aliyun", pass = %pass_id);

        async move {
            let issued_at = Utc::now();
            let envs = self.registry.list(Provider::Aliyun);
            debug!(count = envs.len(), "开始获取阿里云备份");

            let settled = join_all(envs.iter().map(|env| async move {
                (env.clone(), self.api.ali_backup(env).await)
            }))
            .await;

            let outcomes: Vec<_> = settled
                .into_iter()
                .map(|(env, result)| {
                    let result = self.reconcile_backup(&env, result);
                    (env, result)
                })
                .collect();

            let mut report = RefreshReport {
                provider: Provider::Aliyun,
                pass_id,
                issued_at,
                outcomes,
                published: false,
            };
            report.published = self.aliyun.publish(generation, report.records());
            log_report(&report);
            report
        }
        .instrument(span)
        .await
    }

    /// 刷新 AWS 快照列表
    pub async fn refresh_aws(&self) -> RefreshReport<SnapshotRecord> {
        let generation = self.next_generation();
        let pass_id = Uuid::now_v7();
        let span = info_span!("refresh", provider = "aws", pass = %pass_id);

        async move {
            let issued_at = Utc::now();
            let envs = self.registry.list(Provider::Aws);
            debug!(count = envs.len(), "开始获取AWS快照");

            let settled = join_all(envs.iter().map(|env| async move {
                (env.clone(), self.api.aws_snapshot(env).await)
            }))
            .await;

            let outcomes: Vec<_> = settled
                .into_iter()
                .map(|(env, result)| {
                    self.reconcile_snapshot(&env, &result);
                    (env, result)
                })
                .collect();

            let mut report = RefreshReport {
                provider: Provider::Aws,
                pass_id,
                issued_at,
                outcomes,
                published: false,
            };
            report.published = self.aws.publish(generation, report.records());
            log_report(&report);
            report
        }
        .instrument(span)
        .await
    }

    /// 无备份是正常状态：保留空行并给出提示
    fn reconcile_backup(
        &self,
        env: &EnvironmentId,
        result: std::result::Result<BackupRecord, FetchError>,
    ) -> std::result::Result<BackupRecord, FetchError> {
        match result {
            Ok(record) => {
                if !record.has_backup() {
                    self.notifier
                        .notify(Notification::info(format!("{env} 暂无可用备份")).for_env(env));
                }
                Ok(record)
            }
            Err(FetchError::NotFound(_)) => {
                self.notifier
                    .notify(Notification::info(format!("{env} 暂无可用备份")).for_env(env));
                Ok(BackupRecord::empty(env.clone()))
            }
            Err(e) => {
                self.report_failure(env, &e);
                Err(e)
            }
        }
    }

    fn reconcile_snapshot(
        &self,
        env: &EnvironmentId,
        result: &std::result::Result<SnapshotRecord, FetchError>,
    ) {
        match result {
            Ok(_) => {}
            Err(FetchError::NotFound(_)) => {
                self.notifier
                    .notify(Notification::info(format!("{env} 暂无可用快照")).for_env(env));
            }
            Err(e) => self.report_failure(env, e),
        }
    }

    fn report_failure(&self, env: &EnvironmentId, err: &FetchError) {
        warn!(env = %env, "获取实例数据失败: {}", err);
        self.notifier.notify(
            Notification::error(format!("获取实例 {env} 数据失败: {}", err.reason())).for_env(env),
        );
    }
}

fn log_report<R: Clone>(report: &RefreshReport<R>) {
    let summary = report.summary();
    if summary.published {
        info!(
            total = summary.total,
            records = summary.records,
            failed = summary.failed.len(),
            "{} 数据刷新完成",
            report.provider.display_name()
        );
    } else {
        debug!("已有更新的刷新结果，丢弃本批次");
    }
}

#[async_trait]
impl Refresh for FetchAggregator {
    async fn refresh(&self, provider: Provider) -> RefreshSummary {
        match provider {
            Provider::Aliyun => self.refresh_aliyun().await.summary(),
            Provider::Aws => self.refresh_aws().await.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{NotificationLevel, RecordingNotifier};
    use crate::testing::{FakeApi, backup, snapshot};
    use std::time::Duration;

    fn aggregator(
        api: Arc<FakeApi>,
        aliyun: &[&str],
        aws: &[&str],
    ) -> (Arc<FetchAggregator>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let registry = Arc::new(EnvironmentRegistry::from_static(
            aliyun.iter().copied(),
            aws.iter().copied(),
        ));
        let aggregator = Arc::new(FetchAggregator::new(api, registry, notifier.clone()));
        (aggregator, notifier)
    }

    #[tokio::test]
    async fn test_empty_backup_and_network_error() {
        let api = Arc::new(FakeApi::new());
        api.set_ali("envA", Ok(backup("envA", None, None)));
        api.set_ali("envB", Err(FetchError::Transport("connection reset".to_string())));
        let (aggregator, notifier) = aggregator(api, &["envA", "envB"], &[]);

        let report = aggregator.refresh_aliyun().await;
        assert!(report.published);

        let records = aggregator.aliyun_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].env.as_str(), "envA");
        assert!(records[0].public_download_url.is_none());
        assert!(records[0].intranet_download_url.is_none());

        let infos = notifier.with_level(NotificationLevel::Info);
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].env, Some(EnvironmentId::from("envA")));

        let errors = notifier.with_level(NotificationLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].env, Some(EnvironmentId::from("envB")));
        assert!(errors[0].message.contains("envB"));
    }

    #[tokio::test]
    async fn test_partial_failures_drop_rows() {
        let envs = ["e1", "e2", "e3", "e4", "e5"];
        let failing = ["e2", "e5"];
        let api = Arc::new(FakeApi::new());
        for env in envs {
            if failing.contains(&env) {
                api.set_aws(
                    env,
                    Err(FetchError::Server {
                        status: 500,
                        message: "failed to get snapshot info".to_string(),
                    }),
                );
            } else {
                api.set_aws(env, Ok(snapshot(env, "available", None)));
            }
        }
        let (aggregator, notifier) = aggregator(api.clone(), &[], &envs);

        let summary = aggregator.refresh(Provider::Aws).await;
        assert_eq!(summary.total, 5);
        assert_eq!(summary.records, 3);
        assert_eq!(summary.failed, vec![EnvironmentId::from("e2"), EnvironmentId::from("e5")]);
        assert!(summary.ensure_complete().is_err());

        let records = aggregator.aws_records();
        let ids: Vec<_> = records.iter().map(|r| r.env.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e3", "e4"]);
        assert_eq!(notifier.with_level(NotificationLevel::Error).len(), 2);
        assert_eq!(api.calls_with_prefix("aws:"), 5);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty_list() {
        let api = Arc::new(FakeApi::new());
        let (aggregator, notifier) = aggregator(api, &["a", "b"], &[]);

        let report = aggregator.refresh_aliyun().await;
        assert!(report.records().is_empty());
        assert_eq!(report.failures().len(), 2);
        assert!(aggregator.aliyun_records().is_empty());
        assert_eq!(notifier.with_level(NotificationLevel::Error).len(), 2);
    }

    #[tokio::test]
    async fn test_aws_not_found_is_informational() {
        let api = Arc::new(FakeApi::new());
        api.set_aws("prod", Ok(snapshot("prod", "available", None)));
        api.set_aws("dev", Err(FetchError::NotFound("no snapshots found".to_string())));
        let (aggregator, notifier) = aggregator(api, &[], &["prod", "dev"]);

        let summary = aggregator.refresh(Provider::Aws).await;
        assert!(!summary.is_partial());
        assert_eq!(summary.records, 1);
        assert!(notifier.with_level(NotificationLevel::Error).is_empty());
        assert_eq!(notifier.with_level(NotificationLevel::Info).len(), 1);
    }

    #[tokio::test]
    async fn test_aliyun_not_found_keeps_empty_row() {
        let api = Arc::new(FakeApi::new());
        api.set_ali("cn", Err(FetchError::NotFound("no backups found".to_string())));
        let (aggregator, _notifier) = aggregator(api, &["cn"], &[]);

        aggregator.refresh_aliyun().await;
        let records = aggregator.aliyun_records();
        assert_eq!(records.as_slice(), &[BackupRecord::empty("cn".into())]);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let api = Arc::new(FakeApi::new());
        api.set_ali("a", Ok(backup("a", Some("https://oss/a.tar.gz"), Some("2024-03-20T10:00:00Z"))));
        api.set_ali("b", Ok(backup("b", None, None)));
        let (aggregator, _notifier) = aggregator(api, &["a", "b"], &[]);

        aggregator.refresh_aliyun().await;
        let first = aggregator.aliyun_records();
        aggregator.refresh_aliyun().await;
        let second = aggregator.aliyun_records();

        assert_eq!(*first, *second);
        assert_eq!(aggregator.aliyun.generation(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publication_is_atomic() {
        let api = Arc::new(FakeApi::new());
        api.set_aws("fast", Ok(snapshot("fast", "available", None)));
        api.set_aws("slow", Ok(snapshot("slow", "creating", None)));
        api.set_delay("slow", Duration::from_secs(5));
        let (aggregator, _notifier) = aggregator(api, &[], &["fast", "slow"]);

        let task = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.refresh_aws().await })
        };

        // fast 已返回，slow 仍在途中：不应看到半张表
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(aggregator.aws_records().is_empty());

        let report = task.await.unwrap();
        assert!(report.published);
        assert_eq!(aggregator.aws_records().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_pass_does_not_overwrite_newer() {
        let api = Arc::new(FakeApi::new());
        api.set_ali("a", Ok(backup("a", Some("https://oss/old"), None)));
        api.set_delay("a", Duration::from_secs(10));
        let (aggregator, _notifier) = aggregator(api.clone(), &["a"], &[]);

        let stale = {
            let aggregator = aggregator.clone();
            tokio::spawn(async move { aggregator.refresh_aliyun().await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        api.set_delay("a", Duration::ZERO);
        api.set_ali("a", Ok(backup("a", Some("https://oss/new"), None)));
        let fresh = aggregator.refresh_aliyun().await;
        assert!(fresh.published);

        let stale = stale.await.unwrap();
        assert!(!stale.published);

        let records = aggregator.aliyun_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].public_download_url.as_deref(), Some("https://oss/new"));
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_replacement() {
        let api = Arc::new(FakeApi::new());
        api.set_aws("x", Ok(snapshot("x", "available", None)));
        let (aggregator, _notifier) = aggregator(api, &[], &["x"]);

        let mut receiver = aggregator.subscribe_aws();
        aggregator.refresh(Provider::Aws).await;

        assert!(receiver.has_changed().unwrap());
        let published = receiver.borrow_and_update().clone();
        assert_eq!(published.generation, 1);
        assert_eq!(published.records.len(), 1);
    }
}
