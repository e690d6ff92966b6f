use crate::api_config::ApiConfig;
use crate::constants::{api, config, poller, view};
use crate::error::{NovaError, Result};
use crate::models::EnvironmentId;
use crate::registry::EnvironmentRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub view: ViewConfig,
}

/// 后端服务配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// 环境清单来源
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegistrySource {
    #[default]
    Backend,
    Static,
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrySource::Backend => f.write_str("backend"),
            RegistrySource::Static => f.write_str("static"),
        }
    }
}

/// 环境清单配置
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    #[serde(default)]
    pub source: RegistrySource,
    #[serde(default)]
    pub aliyun: Vec<String>,
    #[serde(default)]
    pub aws: Vec<String>,
}

/// 定时刷新配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
}

/// 表格展示配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: api::DEFAULT_BASE_URL.to_string(),
            timeout_secs: api::http::DEFAULT_TIMEOUT,
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: poller::DEFAULT_INTERVAL_MS,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: view::DEFAULT_PAGE_SIZE,
        }
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：config.toml -> nova-rds.toml -> .nova-rds.toml
    /// 都不存在时使用默认配置，不自动写文件
    pub fn find_and_load_config() -> Result<Self> {
        Self::find_and_load_config_in(Path::new("."))
    }

    /// 在指定目录中查找配置文件
    pub fn find_and_load_config_in(dir: &Path) -> Result<Self> {
        for config_file in config::CONFIG_FILE_CANDIDATES {
            let path = dir.join(config_file);
            if path.exists() {
                tracing::info!("找到配置文件: {}", path.display());
                return Self::load_from_file(&path);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(Self::default())
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NovaError::ConfigNotFound);
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments();
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/config.toml.template");

        TEMPLATE
            .replace("{base_url}", &toml_string(&self.server.base_url))
            .replace("{timeout_secs}", &self.server.timeout_secs.to_string())
            .replace("{source}", &self.registry.source.to_string())
            .replace("{aliyun}", &toml_array(&self.registry.aliyun))
            .replace("{aws}", &toml_array(&self.registry.aws))
            .replace("{interval_ms}", &self.poller.interval_ms.to_string())
            .replace("{page_size}", &self.view.page_size.to_string())
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.server.base_url)?;
        if self.server.timeout_secs == 0 {
            return Err(NovaError::custom("server.timeout_secs 必须大于 0"));
        }
        if self.poller.interval_ms == 0 {
            return Err(NovaError::custom("poller.interval_ms 必须大于 0"));
        }
        if self.view.page_size == 0 {
            return Err(NovaError::custom("view.page_size 必须大于 0"));
        }
        Ok(())
    }

    /// 覆盖后端地址
    pub fn with_server_url(mut self, base_url: Option<String>) -> Result<Self> {
        if let Some(base_url) = base_url {
            url::Url::parse(&base_url)?;
            self.server.base_url = base_url;
        }
        Ok(self)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::with_base_url(self.server.base_url.clone())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poller.interval_ms)
    }

    /// 静态清单，仅当 source = "static" 时有效
    pub fn static_registry(&self) -> Option<EnvironmentRegistry> {
        match self.registry.source {
            RegistrySource::Static => Some(EnvironmentRegistry::from_static(
                self.registry.aliyun.iter().map(|s| EnvironmentId::from(s.as_str())),
                self.registry.aws.iter().map(|s| EnvironmentId::from(s.as_str())),
            )),
            RegistrySource::Backend => None,
        }
    }
}

fn toml_string(value: &str) -> String {
    toml::Value::String(value.to_string()).to_string()
}

fn toml_array(items: &[String]) -> String {
    toml::Value::Array(items.iter().cloned().map(toml::Value::String).collect()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.base_url, api::DEFAULT_BASE_URL);
        assert_eq!(config.poll_interval(), Duration::from_millis(30_000));
        assert_eq!(config.view.page_size, 10);
        assert!(config.static_registry().is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip_through_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.server.base_url = "http://dr.internal:9000".to_string();
        config.registry.source = RegistrySource::Static;
        config.registry.aliyun = vec!["cn-prod".to_string(), "cn-staging".to_string()];
        config.registry.aws = vec!["us-prod".to_string()];
        config.poller.interval_ms = 15_000;
        config.save_to_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Nova RDS"));

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);

        let registry = loaded.static_registry().unwrap();
        assert_eq!(registry.list(Provider::Aliyun).len(), 2);
        assert_eq!(registry.list(Provider::Aws)[0].as_str(), "us-prod");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nova-rds.toml");
        fs::write(&path, "[server]\nbase_url = \"http://localhost:9999\"\n").unwrap();

        let config = AppConfig::find_and_load_config_in(temp_dir.path()).unwrap();
        assert_eq!(config.server.base_url, "http://localhost:9999");
        assert_eq!(config.server.timeout_secs, api::http::DEFAULT_TIMEOUT);
        assert_eq!(config.poller.interval_ms, poller::DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn test_empty_sections_use_defaults() {
        let config: AppConfig = toml::from_str("[server]\n[poller]\n[view]\n").unwrap();
        assert_eq!(config, AppConfig::default());

        let config: AppConfig = toml::from_str("[server]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(config.server.base_url, api::DEFAULT_BASE_URL);
        assert_eq!(config.server.timeout_secs, 5);
    }

    #[test]
    fn test_template_escapes_base_url() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.server.base_url = r#"http://dr.internal:9000/a"b"#.to_string();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.server.base_url, config.server.base_url);
    }

    #[test]
    fn test_lookup_order_and_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::find_and_load_config_in(temp_dir.path()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(!temp_dir.path().join("config.toml").exists());

        fs::write(
            temp_dir.path().join(".nova-rds.toml"),
            "[view]\npage_size = 50\n",
        )
        .unwrap();
        fs::write(
            temp_dir.path().join("config.toml"),
            "[view]\npage_size = 20\n",
        )
        .unwrap();
        let config = AppConfig::find_and_load_config_in(temp_dir.path()).unwrap();
        assert_eq!(config.view.page_size, 20);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        fs::write(&path, "[poller]\ninterval_ms = 0\n").unwrap();
        assert!(AppConfig::load_from_file(&path).is_err());

        fs::write(&path, "[server]\nbase_url = \"not a url\"\n").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(NovaError::Url(_))
        ));

        fs::write(&path, "[registry]\nsource = \"magic\"\n").unwrap();
        assert!(matches!(
            AppConfig::load_from_file(&path),
            Err(NovaError::Config(_))
        ));
    }

    #[test]
    fn test_server_override() {
        let config = AppConfig::default()
            .with_server_url(Some("https://dr.example.com".to_string()))
            .unwrap();
        assert_eq!(config.api_config().base_url, "https://dr.example.com");
        assert!(AppConfig::default().with_server_url(Some("::".to_string())).is_err());
    }
}
