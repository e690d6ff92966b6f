//! 用户可见的提示消息
//!
//! 对应页面上的 `message.info/success/error`：只做展示，不进入记录列表。

use crate::models::EnvironmentId;
use std::sync::Mutex;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    /// 关联的环境，可为空
    pub env: Option<EnvironmentId>,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            env: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    pub fn for_env(mut self, env: &EnvironmentId) -> Self {
        self.env = Some(env.clone());
        self
    }
}

/// 提示消息出口
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// 通过 tracing 输出提示，供 CLI 使用
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => info!("ℹ️  {}", notification.message),
            NotificationLevel::Success => info!("✅ {}", notification.message),
            NotificationLevel::Error => error!("❌ {}", notification.message),
        }
    }
}

/// 收集所有提示，便于事后检查
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn with_level(&self, level: NotificationLevel) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter(|n| n.level == level)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.notifications
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.lock().push(notification);
    }
}
