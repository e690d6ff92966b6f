use crate::api_config::ApiConfig;
use crate::constants::api::http;
use crate::error::{FetchError, Result};
use crate::models::{
    AliExportReceipt, AwsExportReceipt, BackupRecord, EnvironmentId, ExportStatus,
    InstanceCatalog, S3Target, SnapshotRecord, SnapshotStatus, Timestamp,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// 后端 API 抽象
///
/// 聚合器、派发器等组件通过该 trait 接收已构造好的客户端，测试中可替换为内存实现。
#[async_trait]
pub trait BackupApi: Send + Sync {
    /// 获取实例清单
    async fn list_instances(&self) -> std::result::Result<InstanceCatalog, FetchError>;

    /// 获取阿里云某环境的最新备份
    async fn ali_backup(&self, env: &EnvironmentId) -> std::result::Result<BackupRecord, FetchError>;

    /// 获取阿里云备份导出使用的 S3 配置
    async fn s3_config(&self) -> std::result::Result<S3Target, FetchError>;

    /// 触发阿里云备份上传到 S3
    async fn export_ali_backup(
        &self,
        env: &EnvironmentId,
    ) -> std::result::Result<AliExportReceipt, FetchError>;

    /// 获取 AWS 某环境的最新快照
    async fn aws_snapshot(&self, env: &EnvironmentId)
    -> std::result::Result<SnapshotRecord, FetchError>;

    /// 触发 AWS 快照导出
    async fn export_aws_snapshot(
        &self,
        env: &EnvironmentId,
    ) -> std::result::Result<AwsExportReceipt, FetchError>;

    /// 健康检查，返回服务端状态描述
    async fn health(&self) -> std::result::Result<String, FetchError>;
}

/// 实例清单响应
#[derive(Debug, Deserialize)]
struct InstancesResponse {
    #[serde(default)]
    aliyun: Vec<String>,
    #[serde(default)]
    aws: Vec<String>,
}

/// 阿里云备份响应
#[derive(Debug, Default, Deserialize)]
struct AliBackupResponse {
    backup_start_time: Option<String>,
    backup_download_url: Option<String>,
    backup_intranet_download_url: Option<String>,
    retries: Option<u32>,
}

/// S3配置响应
#[derive(Debug, Deserialize)]
struct S3ConfigResponse {
    #[serde(default)]
    bucket_name: String,
    #[serde(default)]
    region: String,
}

/// 阿里云上传S3响应
#[derive(Debug, Deserialize)]
struct AliExportResponse {
    #[serde(default)]
    s3_bucket: String,
    s3_key: Option<String>,
    s3_prefix: Option<String>,
    region: Option<String>,
}

/// AWS快照响应
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AwsSnapshotResponse {
    snapshot_id: String,
    snapshot_arn: String,
    snapshot_create_time: Option<String>,
    status: String,
    instance_id: String,
    region: String,
    export_task_id: Option<String>,
    export_status: Option<String>,
}

/// AWS快照导出响应
#[derive(Debug, Deserialize)]
struct AwsExportResponse {
    #[serde(default)]
    export_task_id: String,
    target_region: Option<String>,
    estimated_completion_time: Option<String>,
}

/// 健康检查响应
#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    status: String,
}

/// 空字符串视为缺失
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 解析统一的响应约定
///
/// - 404：资源不存在
/// - 其他非 2xx：服务端错误，优先使用 `error`/`details` 字段
/// - 2xx 但带 `error` 字段：服务端错误
/// - 其余按目标结构解析，可选字段缺失时使用默认值
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    status: u16,
    body: &str,
) -> std::result::Result<T, FetchError> {
    let success = (200..300).contains(&status);
    let value: Option<Value> = serde_json::from_str(body).ok();

    if status == 404 {
        let message = value
            .as_ref()
            .and_then(server_message)
            .or_else(|| value.as_ref().and_then(|v| text_field(v, "message")))
            .unwrap_or_else(|| "not found".to_string());
        return Err(FetchError::NotFound(message));
    }

    if !success {
        let message = value
            .as_ref()
            .and_then(server_message)
            .unwrap_or_else(|| {
                let text = body.trim();
                if text.is_empty() {
                    format!("HTTP {status}")
                } else {
                    text.to_string()
                }
            });
        return Err(FetchError::Server { status, message });
    }

    let value = value.ok_or_else(|| FetchError::Malformed("响应不是有效的JSON".to_string()))?;
    if let Some(message) = server_message(&value) {
        return Err(FetchError::Server { status, message });
    }

    serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

/// 提取 `error` 字段，附带 `details`
fn server_message(value: &Value) -> Option<String> {
    let error = value.get("error").filter(|v| !v.is_null())?;
    let error = match error.as_str() {
        Some(text) => text.to_string(),
        None => error.to_string(),
    };
    match value.get("details").filter(|v| !v.is_null()) {
        Some(Value::String(details)) => Some(format!("{error}: {details}")),
        Some(details) => Some(format!("{error}: {details}")),
        None => Some(error),
    }
}

fn text_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// API 客户端
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ApiConfig,
}

impl ApiClient {
    /// 创建新的 API 客户端
    pub fn new(config: ApiConfig) -> Result<Self> {
        Self::with_timeout(config, Duration::from_secs(http::DEFAULT_TIMEOUT))
    }

    pub fn with_timeout(config: ApiConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(http::USER_AGENT)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(
        &self,
        endpoint: &str,
        env: Option<&EnvironmentId>,
    ) -> std::result::Result<Url, FetchError> {
        self.config
            .endpoint_url(endpoint, env)
            .map_err(|e| FetchError::Transport(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, FetchError> {
        debug!(url = %url, "GET");
        let response = self.client.get(url).send().await?;
        Self::read(response).await
    }

    async fn post_json<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, FetchError> {
        debug!(url = %url, "POST");
        let response = self.client.post(url).send().await?;
        Self::read(response).await
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> std::result::Result<T, FetchError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        let decoded = decode_envelope(status, &body);
        if let Err(ref e) = decoded {
            if !e.is_not_found() {
                warn!(status, "后端请求失败: {}", e);
            }
        }
        decoded
    }
}

#[async_trait]
impl BackupApi for ApiClient {
    async fn list_instances(&self) -> std::result::Result<InstanceCatalog, FetchError> {
        let url = self.url(&self.config.endpoints.instances, None)?;
        let response: InstancesResponse = self.get_json(url).await?;
        Ok(InstanceCatalog {
            aliyun: response.aliyun.into_iter().map(EnvironmentId::from).collect(),
            aws: response.aws.into_iter().map(EnvironmentId::from).collect(),
        })
    }

    async fn ali_backup(&self, env: &EnvironmentId) -> std::result::Result<BackupRecord, FetchError> {
        let url = self.url(&self.config.endpoints.ali_backup, Some(env))?;
        let response: AliBackupResponse = self.get_json(url).await?;
        Ok(BackupRecord {
            env: env.clone(),
            backup_start_time: response
                .backup_start_time
                .as_deref()
                .and_then(Timestamp::parse),
            public_download_url: non_empty(response.backup_download_url),
            intranet_download_url: non_empty(response.backup_intranet_download_url),
            retry_count: response.retries.unwrap_or(0),
        })
    }

    async fn s3_config(&self) -> std::result::Result<S3Target, FetchError> {
        let url = self.url(&self.config.endpoints.ali_s3_config, None)?;
        let response: S3ConfigResponse = self.get_json(url).await?;
        if response.bucket_name.is_empty() || response.region.is_empty() {
            return Err(FetchError::Malformed("S3配置缺少存储桶或区域".to_string()));
        }
        Ok(S3Target {
            bucket_name: response.bucket_name,
            region: response.region,
        })
    }

    async fn export_ali_backup(
        &self,
        env: &EnvironmentId,
    ) -> std::result::Result<AliExportReceipt, FetchError> {
        let url = self.url(&self.config.endpoints.ali_export_s3, Some(env))?;
        let response: AliExportResponse = self.post_json(url).await?;
        Ok(AliExportReceipt {
            bucket: response.s3_bucket,
            region: non_empty(response.region),
            key: non_empty(response.s3_key),
            prefix: non_empty(response.s3_prefix),
        })
    }

    async fn aws_snapshot(
        &self,
        env: &EnvironmentId,
    ) -> std::result::Result<SnapshotRecord, FetchError> {
        let url = self.url(&self.config.endpoints.aws_snapshot, Some(env))?;
        let response: AwsSnapshotResponse = self.get_json(url).await?;
        Ok(SnapshotRecord {
            env: env.clone(),
            snapshot_id: response.snapshot_id,
            snapshot_arn: response.snapshot_arn,
            create_time: response
                .snapshot_create_time
                .as_deref()
                .and_then(Timestamp::parse),
            status: SnapshotStatus::from(response.status.as_str()),
            instance_id: response.instance_id,
            region: response.region,
            export_task_id: non_empty(response.export_task_id),
            export_status: non_empty(response.export_status)
                .map(|s| ExportStatus::from(s.as_str())),
        })
    }

    async fn export_aws_snapshot(
        &self,
        env: &EnvironmentId,
    ) -> std::result::Result<AwsExportReceipt, FetchError> {
        let url = self.url(&self.config.endpoints.aws_export, Some(env))?;
        let response: AwsExportResponse = self.post_json(url).await?;
        if response.export_task_id.is_empty() {
            return Err(FetchError::Malformed("响应缺少 export_task_id".to_string()));
        }
        Ok(AwsExportReceipt {
            export_task_id: response.export_task_id,
            target_region: non_empty(response.target_region),
            estimated_completion: non_empty(response.estimated_completion_time),
        })
    }

    async fn health(&self) -> std::result::Result<String, FetchError> {
        let url = self.url(&self.config.endpoints.health, None)?;
        let response: HealthResponse = self.get_json(url).await?;
        Ok(response.status)
    }
}
