//! 测试用的内存后端

use crate::api::BackupApi;
use crate::error::FetchError;
use crate::models::{
    AliExportReceipt, AwsExportReceipt, BackupRecord, EnvironmentId, InstanceCatalog, S3Target,
    SnapshotRecord, SnapshotStatus, Timestamp,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

type Reply<T> = Result<T, FetchError>;

#[derive(Default)]
struct FakeState {
    instances: Option<Reply<InstanceCatalog>>,
    s3: Option<Reply<S3Target>>,
    ali: HashMap<EnvironmentId, Reply<BackupRecord>>,
    aws: HashMap<EnvironmentId, Reply<SnapshotRecord>>,
    ali_export: HashMap<EnvironmentId, Reply<AliExportReceipt>>,
    aws_export: HashMap<EnvironmentId, Reply<AwsExportReceipt>>,
    delays: HashMap<EnvironmentId, Duration>,
}

/// 可编程的后端，记录每个端点的调用次数
#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
    calls: Mutex<HashMap<String, usize>>,
}

fn not_configured<T>() -> Reply<T> {
    Err(FetchError::Server {
        status: 500,
        message: "not configured".to_string(),
    })
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_instances(&self, reply: Reply<InstanceCatalog>) {
        self.state.lock().unwrap().instances = Some(reply);
    }

    pub fn set_s3(&self, reply: Reply<S3Target>) {
        self.state.lock().unwrap().s3 = Some(reply);
    }

    pub fn set_ali(&self, env: &str, reply: Reply<BackupRecord>) {
        self.state.lock().unwrap().ali.insert(env.into(), reply);
    }

    pub fn set_aws(&self, env: &str, reply: Reply<SnapshotRecord>) {
        self.state.lock().unwrap().aws.insert(env.into(), reply);
    }

    pub fn set_ali_export(&self, env: &str, reply: Reply<AliExportReceipt>) {
        self.state.lock().unwrap().ali_export.insert(env.into(), reply);
    }

    pub fn set_aws_export(&self, env: &str, reply: Reply<AwsExportReceipt>) {
        self.state.lock().unwrap().aws_export.insert(env.into(), reply);
    }

    pub fn set_delay(&self, env: &str, delay: Duration) {
        self.state.lock().unwrap().delays.insert(env.into(), delay);
    }

    pub fn calls(&self, key: &str) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    /// 以指定前缀开头的调用总数
    pub fn calls_with_prefix(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, count)| count)
            .sum()
    }

    fn record(&self, key: String) {
        *self.calls.lock().unwrap().entry(key).or_default() += 1;
    }

    /// 模拟慢响应，应答内容在请求发出时已确定
    async fn delay_for(&self, env: &EnvironmentId) {
        let delay = self.state.lock().unwrap().delays.get(env).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl BackupApi for FakeApi {
    async fn list_instances(&self) -> Reply<InstanceCatalog> {
        self.record("instances".to_string());
        self.state
            .lock()
            .unwrap()
            .instances
            .clone()
            .unwrap_or_else(|| Ok(InstanceCatalog::default()))
    }

    async fn ali_backup(&self, env: &EnvironmentId) -> Reply<BackupRecord> {
        self.record(format!("ali:{env}"));
        let reply = self.state.lock().unwrap().ali.get(env).cloned();
        self.delay_for(env).await;
        reply.unwrap_or_else(not_configured)
    }

    async fn s3_config(&self) -> Reply<S3Target> {
        self.record("s3config".to_string());
        let reply = self.state.lock().unwrap().s3.clone();
        reply.unwrap_or_else(not_configured)
    }

    async fn export_ali_backup(&self, env: &EnvironmentId) -> Reply<AliExportReceipt> {
        self.record(format!("ali_export:{env}"));
        let reply = self.state.lock().unwrap().ali_export.get(env).cloned();
        reply.unwrap_or_else(not_configured)
    }

    async fn aws_snapshot(&self, env: &EnvironmentId) -> Reply<SnapshotRecord> {
        self.record(format!("aws:{env}"));
        let reply = self.state.lock().unwrap().aws.get(env).cloned();
        self.delay_for(env).await;
        reply.unwrap_or_else(not_configured)
    }

    async fn export_aws_snapshot(&self, env: &EnvironmentId) -> Reply<AwsExportReceipt> {
        self.record(format!("aws_export:{env}"));
        let reply = self.state.lock().unwrap().aws_export.get(env).cloned();
        reply.unwrap_or_else(not_configured)
    }

    async fn health(&self) -> Reply<String> {
        self.record("health".to_string());
        Ok("healthy".to_string())
    }
}

pub fn backup(env: &str, url: Option<&str>, start: Option<&str>) -> BackupRecord {
    BackupRecord {
        env: env.into(),
        backup_start_time: start.and_then(Timestamp::parse),
        public_download_url: url.map(str::to_string),
        intranet_download_url: url.map(|u| format!("{u}?intranet")),
        retry_count: 1,
    }
}

pub fn snapshot(env: &str, status: &str, created: Option<&str>) -> SnapshotRecord {
    SnapshotRecord {
        env: env.into(),
        snapshot_id: format!("rds:{env}-snap"),
        snapshot_arn: format!("arn:aws:rds:us-east-1:123456789012:snapshot:rds:{env}-snap"),
        create_time: created.and_then(Timestamp::parse),
        status: SnapshotStatus::from(status),
        instance_id: format!("{env}-db"),
        region: "us-east-1".to_string(),
        export_task_id: None,
        export_status: None,
    }
}

pub fn s3_target() -> S3Target {
    S3Target {
        bucket_name: "dr-backups".to_string(),
        region: "ap-northeast-1".to_string(),
    }
}
