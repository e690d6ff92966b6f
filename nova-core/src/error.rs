use crate::models::{EnvironmentId, Provider};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NovaError>;

/// 单次后端请求的失败分类
///
/// 聚合器在单个环境粒度上捕获这些错误，不会让它们中断整批请求。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// 网络错误、超时等传输层失败
    #[error("网络请求失败: {0}")]
    Transport(String),

    /// 非 2xx 响应，或 2xx 但携带 `error` 字段
    #[error("服务端错误 ({status}): {message}")]
    Server { status: u16, message: String },

    /// 404，表示资源不存在（例如没有快照），不属于故障
    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 响应体无法解析
    #[error("响应格式无效: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// 面向用户的原因描述：服务端消息原样透传，传输层失败使用通用提示
    pub fn reason(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            Self::NotFound(message) => message.clone(),
            Self::Transport(_) => "网络异常，请稍后重试".to_string(),
            Self::Malformed(detail) => format!("服务端响应无效: {detail}"),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum NovaError {
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL 错误: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("操作前置条件不满足: {0}")]
    Precondition(String),

    #[error("确认流程状态错误: {0}")]
    Gate(String),

    #[error("导出失败: {message}")]
    Dispatch { env: EnvironmentId, message: String },

    #[error("未知环境 {provider}/{env}")]
    UnknownEnvironment { provider: Provider, env: EnvironmentId },

    #[error("部分环境获取失败 ({provider}): {}", format_envs(.failed))]
    PartialBatch {
        provider: Provider,
        failed: Vec<EnvironmentId>,
    },

    #[error("配置文件未找到")]
    ConfigNotFound,

    #[error("自定义错误: {0}")]
    Custom(String),
}

fn format_envs(envs: &[EnvironmentId]) -> String {
    envs.iter()
        .map(|env| env.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl NovaError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn gate(msg: impl Into<String>) -> Self {
        Self::Gate(msg.into())
    }
}
