//! 导出前的二次确认

use crate::constants::view::PLACEHOLDER;
use crate::error::{NovaError, Result};
use crate::models::{BackupRecord, EnvironmentId, Provider, S3Target, SnapshotRecord, Timestamp};
use std::fmt;
use tracing::debug;

/// 等待确认的导出操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    ExportAwsSnapshot(SnapshotRecord),
    ExportAliBackup {
        record: BackupRecord,
        target: S3Target,
    },
}

impl PendingAction {
    pub fn env(&self) -> &EnvironmentId {
        match self {
            Self::ExportAwsSnapshot(record) => &record.env,
            Self::ExportAliBackup { record, .. } => &record.env,
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            Self::ExportAwsSnapshot(_) => Provider::Aws,
            Self::ExportAliBackup { .. } => Provider::Aliyun,
        }
    }

    /// 确认框内容
    pub fn prompt(&self) -> Prompt {
        match self {
            Self::ExportAwsSnapshot(record) => Prompt {
                title: "确认导出AWS RDS快照".to_string(),
                lines: vec![
                    ("环境".to_string(), record.env.to_string()),
                    ("快照ID".to_string(), record.snapshot_id.clone()),
                    ("创建时间".to_string(), display_time(record.create_time.as_ref())),
                    ("实例ID".to_string(), record.instance_id.clone()),
                    ("区域".to_string(), record.region.clone()),
                ],
                warnings: vec![
                    "导出过程可能需要较长时间，请耐心等待".to_string(),
                    "导出期间请勿关闭页面".to_string(),
                    "导出完成后会自动刷新数据".to_string(),
                ],
                ok_text: "确认导出".to_string(),
                cancel_text: "取消".to_string(),
            },
            Self::ExportAliBackup { record, target } => Prompt {
                title: "确认导出备份到 S3".to_string(),
                lines: vec![
                    ("环境".to_string(), record.env.to_string()),
                    (
                        "备份时间".to_string(),
                        display_time(record.backup_start_time.as_ref()),
                    ),
                    ("目标存储桶".to_string(), target.bucket_name.clone()),
                    ("目标区域".to_string(), target.region.clone()),
                ],
                warnings: vec!["导出过程可能需要较长时间，请耐心等待".to_string()],
                ok_text: "确认导出".to_string(),
                cancel_text: "取消".to_string(),
            },
        }
    }
}

fn display_time(time: Option<&Timestamp>) -> String {
    time.map(ToString::to_string)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// 确认框
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub lines: Vec<(String, String)>,
    pub warnings: Vec<String>,
    pub ok_text: String,
    pub cancel_text: String,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for (label, value) in &self.lines {
            writeln!(f, "  {label}: {value}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "  ⚠️  {warning}")?;
        }
        write!(f, "[{}] / [{}]", self.ok_text, self.cancel_text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Prompting(PendingAction),
    Dispatching(PendingAction),
}

/// 确认流程状态机
///
/// `Idle -> Prompting -> (确认) Dispatching -> Idle`，或 `Prompting -> (取消) Idle`。
/// Dispatching 期间拒绝取消和重复确认。
#[derive(Debug)]
pub struct ConfirmationGate {
    state: GateState,
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self {
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GateState::Idle)
    }

    pub fn is_dispatching(&self) -> bool {
        matches!(self.state, GateState::Dispatching(_))
    }

    /// 打开确认框
    pub fn begin(&mut self, action: PendingAction) -> Result<Prompt> {
        if !self.is_idle() {
            return Err(NovaError::gate("已有待确认的操作"));
        }
        let prompt = action.prompt();
        debug!(env = %action.env(), "打开确认框");
        self.state = GateState::Prompting(action);
        Ok(prompt)
    }

    /// 取消，返回被取消的操作
    pub fn cancel(&mut self) -> Result<PendingAction> {
        match std::mem::replace(&mut self.state, GateState::Idle) {
            GateState::Prompting(action) => Ok(action),
            GateState::Idle => Err(NovaError::gate("当前没有待确认的操作")),
            dispatching @ GateState::Dispatching(_) => {
                self.state = dispatching;
                Err(NovaError::gate("导出请求处理中，无法取消"))
            }
        }
    }

    /// 确认，进入 Dispatching，返回需要执行的操作
    pub fn confirm(&mut self) -> Result<PendingAction> {
        match &self.state {
            GateState::Prompting(action) => {
                let action = action.clone();
                self.state = GateState::Dispatching(action.clone());
                Ok(action)
            }
            GateState::Dispatching(_) => Err(NovaError::gate("导出请求处理中，请勿重复提交")),
            GateState::Idle => Err(NovaError::gate("当前没有待确认的操作")),
        }
    }

    /// 请求结束后回到 Idle，无论成败
    pub fn settle(&mut self) {
        self.state = GateState::Idle;
    }
}
