use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 云厂商
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Aliyun,
    Aws,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Aliyun, Provider::Aws];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Aliyun => "aliyun",
            Provider::Aws => "aws",
        }
    }

    /// 标签页标题
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Aliyun => "阿里云RDS备份",
            Provider::Aws => "AWS RDS快照",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aliyun" | "ali" => Ok(Provider::Aliyun),
            "aws" => Ok(Provider::Aws),
            other => Err(format!("未知的云厂商: {other}")),
        }
    }
}

/// 环境标识，在所属云厂商内唯一
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentId(String);

impl EnvironmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EnvironmentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EnvironmentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 后端返回的时间戳
///
/// 排序按绝对时间；展示沿用服务端给出的时区偏移，不换算。
/// 阿里云返回 RFC3339（偶尔不带秒），AWS 侧带毫秒、偏移和时区名。
/// 不带偏移的时间按 UTC 处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    raw: String,
    instant: Option<DateTime<FixedOffset>>,
}

impl Timestamp {
    /// 空字符串视为缺失
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            instant: parse_instant(raw),
        })
    }

    pub fn epoch_millis(&self) -> Option<i64> {
        self.instant.map(|t| t.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instant {
            Some(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            None => f.write_str(&self.raw),
        }
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t);
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%MZ"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(t.and_utc().fixed_offset());
        }
    }

    // 形如 "2024-03-20 10:00:00.123 +0000 UTC"，末尾时区名忽略
    let mut parts = raw.split_whitespace();
    if let (Some(date), Some(time), Some(offset)) = (parts.next(), parts.next(), parts.next()) {
        let candidate = format!("{date} {time} {offset}");
        if let Ok(t) = DateTime::parse_from_str(&candidate, "%Y-%m-%d %H:%M:%S%.f %z") {
            return Some(t);
        }
    }

    None
}

/// 标签颜色语义
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Processing,
    Error,
    Warning,
    Default,
}

/// AWS 快照状态，未识别的值原样保留
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    Available,
    Creating,
    Failed,
    Deleting,
    Other(String),
}

impl SnapshotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SnapshotStatus::Available => "available",
            SnapshotStatus::Creating => "creating",
            SnapshotStatus::Failed => "failed",
            SnapshotStatus::Deleting => "deleting",
            SnapshotStatus::Other(raw) => raw,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SnapshotStatus::Available)
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            SnapshotStatus::Available => StatusTone::Success,
            SnapshotStatus::Failed => StatusTone::Error,
            SnapshotStatus::Deleting => StatusTone::Warning,
            SnapshotStatus::Creating | SnapshotStatus::Other(_) => StatusTone::Processing,
        }
    }
}

impl From<&str> for SnapshotStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "available" => SnapshotStatus::Available,
            "creating" => SnapshotStatus::Creating,
            "failed" => SnapshotStatus::Failed,
            "deleting" => SnapshotStatus::Deleting,
            other => SnapshotStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SnapshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 快照导出任务状态，未识别的值原样保留
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportStatus {
    Starting,
    InProgress,
    Complete,
    Failed,
    Canceling,
    Canceled,
    Other(String),
}

impl ExportStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExportStatus::Starting => "STARTING",
            ExportStatus::InProgress => "IN_PROGRESS",
            ExportStatus::Complete => "COMPLETE",
            ExportStatus::Failed => "FAILED",
            ExportStatus::Canceling => "CANCELING",
            ExportStatus::Canceled => "CANCELED",
            ExportStatus::Other(raw) => raw,
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            ExportStatus::Starting | ExportStatus::InProgress => StatusTone::Processing,
            ExportStatus::Complete => StatusTone::Success,
            ExportStatus::Failed => StatusTone::Error,
            ExportStatus::Canceling => StatusTone::Warning,
            ExportStatus::Canceled | ExportStatus::Other(_) => StatusTone::Default,
        }
    }
}

impl From<&str> for ExportStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "STARTING" => ExportStatus::Starting,
            "IN_PROGRESS" => ExportStatus::InProgress,
            "COMPLETE" => ExportStatus::Complete,
            "FAILED" => ExportStatus::Failed,
            "CANCELING" => ExportStatus::Canceling,
            "CANCELED" => ExportStatus::Canceled,
            other => ExportStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 行高亮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTone {
    Normal,
    Failed,
    Processing,
}

/// 阿里云 RDS 最新备份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    pub env: EnvironmentId,
    pub backup_start_time: Option<Timestamp>,
    pub public_download_url: Option<String>,
    pub intranet_download_url: Option<String>,
    pub retry_count: u32,
}

impl BackupRecord {
    /// 尚无备份的环境
    pub fn empty(env: EnvironmentId) -> Self {
        Self {
            env,
            backup_start_time: None,
            public_download_url: None,
            intranet_download_url: None,
            retry_count: 0,
        }
    }

    pub fn has_backup(&self) -> bool {
        self.public_download_url.is_some() || self.intranet_download_url.is_some()
    }
}

/// AWS RDS 最新快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub env: EnvironmentId,
    pub snapshot_id: String,
    pub snapshot_arn: String,
    pub create_time: Option<Timestamp>,
    pub status: SnapshotStatus,
    pub instance_id: String,
    pub region: String,
    pub export_task_id: Option<String>,
    pub export_status: Option<ExportStatus>,
}

impl SnapshotRecord {
    pub fn row_tone(&self) -> RowTone {
        match (&self.status, &self.export_status) {
            (SnapshotStatus::Failed, _) | (_, Some(ExportStatus::Failed)) => RowTone::Failed,
            (_, Some(ExportStatus::InProgress)) => RowTone::Processing,
            _ => RowTone::Normal,
        }
    }
}

/// 阿里云备份导出使用的 S3 目标，会话内只读
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Target {
    pub bucket_name: String,
    pub region: String,
}

/// AWS 快照导出任务受理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwsExportReceipt {
    pub export_task_id: String,
    pub target_region: Option<String>,
    pub estimated_completion: Option<String>,
}

/// 阿里云备份上传 S3 结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliExportReceipt {
    pub bucket: String,
    pub region: Option<String>,
    pub key: Option<String>,
    pub prefix: Option<String>,
}

impl AliExportReceipt {
    /// 对象路径，优先 key
    pub fn object_path(&self) -> Option<&str> {
        self.key.as_deref().or(self.prefix.as_deref())
    }
}

/// 后端配置的实例清单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceCatalog {
    pub aliyun: Vec<EnvironmentId>,
    pub aws: Vec<EnvironmentId>,
}
