use crate::api::BackupApi;
use crate::error::{NovaError, Result};
use crate::models::{
    AliExportReceipt, AwsExportReceipt, BackupRecord, EnvironmentId, S3Target, SnapshotRecord,
};
use crate::notify::{Notification, Notifier};
use std::sync::Arc;
use tracing::{error, info};

/// 导出操作触发器
///
/// 只负责提交任务，后端受理即视为成功，不等待任务完成。
/// 前置条件在本地检查，不满足时不会发出请求。
pub struct ActionDispatcher {
    api: Arc<dyn BackupApi>,
    notifier: Arc<dyn Notifier>,
}

impl ActionDispatcher {
    pub fn new(api: Arc<dyn BackupApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// AWS 快照导出前置条件：快照状态必须为 available
    pub fn check_aws_export(record: &SnapshotRecord) -> Result<()> {
        if !record.status.is_available() {
            return Err(NovaError::precondition(format!(
                "快照 {} 当前状态为 {}，仅 available 状态可导出",
                record.snapshot_id,
                record.status.as_str()
            )));
        }
        Ok(())
    }

    /// 阿里云备份导出前置条件：S3 目标已加载
    pub fn check_ali_export(target: Option<&S3Target>) -> Result<&S3Target> {
        target.ok_or_else(|| NovaError::precondition("S3 配置尚未加载，无法导出"))
    }

    pub async fn export_aws_snapshot(&self, record: &SnapshotRecord) -> Result<AwsExportReceipt> {
        Self::check_aws_export(record)?;
        info!(env = %record.env, snapshot = %record.snapshot_id, "🚀 提交快照导出任务");

        match self.api.export_aws_snapshot(&record.env).await {
            Ok(receipt) => {
                self.notifier.notify(
                    Notification::success(format!(
                        "快照导出任务已启动 (任务ID: {})",
                        receipt.export_task_id
                    ))
                    .for_env(&record.env),
                );
                let region = receipt
                    .target_region
                    .as_deref()
                    .unwrap_or(record.region.as_str());
                let eta = receipt.estimated_completion.as_deref().unwrap_or("未知");
                self.notifier.notify(
                    Notification::info(format!("目标区域: {region}，预计完成时间: {eta}"))
                        .for_env(&record.env),
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(env = %record.env, "快照导出失败: {}", e);
                Err(self.dispatch_failed(&record.env, e.reason()))
            }
        }
    }

    pub async fn export_ali_backup(
        &self,
        record: &BackupRecord,
        target: Option<&S3Target>,
    ) -> Result<AliExportReceipt> {
        let target = Self::check_ali_export(target)?;
        info!(env = %record.env, bucket = %target.bucket_name, "🚀 提交备份上传任务");

        match self.api.export_ali_backup(&record.env).await {
            Ok(receipt) => {
                self.notifier
                    .notify(Notification::success("导出任务已启动").for_env(&record.env));
                let bucket = if receipt.bucket.is_empty() {
                    target.bucket_name.as_str()
                } else {
                    receipt.bucket.as_str()
                };
                let region = receipt.region.as_deref().unwrap_or(target.region.as_str());
                self.notifier.notify(
                    Notification::info(format!("备份将上传至 {bucket} ({region})"))
                        .for_env(&record.env),
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(env = %record.env, "备份导出失败: {}", e);
                Err(self.dispatch_failed(&record.env, e.reason()))
            }
        }
    }

    fn dispatch_failed(&self, env: &EnvironmentId, reason: String) -> NovaError {
        self.notifier
            .notify(Notification::error(format!("导出失败：{reason}")).for_env(env));
        NovaError::Dispatch {
            env: env.clone(),
            message: reason,
        }
    }
}
