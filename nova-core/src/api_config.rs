//! API配置模块 - 后端端点配置

use crate::constants::api;
use crate::error::{NovaError, Result};
use crate::models::EnvironmentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// 环境占位符
const ENV_PLACEHOLDER: &str = "{env}";

/// API端点配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoints {
    /// 实例清单端点
    pub instances: String,
    /// 阿里云备份查询端点
    pub ali_backup: String,
    /// S3配置端点
    pub ali_s3_config: String,
    /// 阿里云备份上传S3端点
    pub ali_export_s3: String,
    /// AWS快照查询端点
    pub aws_snapshot: String,
    /// AWS快照导出端点
    pub aws_export: String,
    /// 健康检查端点
    pub health: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            instances: api::endpoints::INSTANCES.to_string(),
            ali_backup: api::endpoints::ALI_BACKUP.to_string(),
            ali_s3_config: api::endpoints::ALI_S3_CONFIG.to_string(),
            ali_export_s3: api::endpoints::ALI_EXPORT_S3.to_string(),
            aws_snapshot: api::endpoints::AWS_SNAPSHOT.to_string(),
            aws_export: api::endpoints::AWS_EXPORT.to_string(),
            health: api::endpoints::HEALTH.to_string(),
        }
    }
}

/// API配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 基础URL
    pub base_url: String,
    /// API端点
    pub endpoints: ApiEndpoints,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::with_base_url(api::DEFAULT_BASE_URL)
    }
}

impl ApiConfig {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoints: ApiEndpoints::default(),
        }
    }

    /// 获取完整的端点URL
    ///
    /// 环境名作为独立的路径段写入，特殊字符会被转义。
    pub fn endpoint_url(&self, endpoint: &str, env: Option<&EnvironmentId>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| NovaError::custom(format!("无效的服务器地址: {}", self.base_url)))?;
            segments.pop_if_empty();
            for segment in endpoint.split('/').filter(|s| !s.is_empty()) {
                if segment == ENV_PLACEHOLDER {
                    let env = env.ok_or_else(|| {
                        NovaError::custom(format!("端点 {endpoint} 需要环境参数"))
                    })?;
                    segments.push(env.as_str());
                } else {
                    segments.push(segment);
                }
            }
        }
        Ok(url)
    }

    /// 获取所有端点信息，用于CLI帮助显示
    pub fn get_endpoints_info(&self) -> Vec<(&str, String)> {
        vec![
            ("服务器地址", self.base_url.clone()),
            ("实例清单", format!("GET {}", self.endpoints.instances)),
            ("阿里云备份", format!("GET {}", self.endpoints.ali_backup)),
            ("S3配置", format!("GET {}", self.endpoints.ali_s3_config)),
            ("阿里云导出到S3", format!("POST {}", self.endpoints.ali_export_s3)),
            ("AWS快照", format!("GET {}", self.endpoints.aws_snapshot)),
            ("AWS快照导出", format!("POST {}", self.endpoints.aws_export)),
            ("健康检查", format!("GET {}", self.endpoints.health)),
        ]
    }
}

impl fmt::Display for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "当前API配置:")?;
        writeln!(f, "服务器地址: {}", self.base_url)?;
        writeln!(f, "\n主要端点:")?;
        for (name, url) in self.get_endpoints_info().into_iter().skip(1) {
            writeln!(f, "  {name}: {url}")?;
        }
        Ok(())
    }
}
