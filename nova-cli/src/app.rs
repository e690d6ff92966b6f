use crate::bootstrap::Bootstrap;
use crate::cli::{Cli, Commands};
use crate::commands;
use nova_core::{
    api::{ApiClient, BackupApi},
    api_config::ApiConfig,
    config::AppConfig,
    dashboard::{Dashboard, DashboardDeps},
    error::Result,
    models::Provider,
    notify::{LogNotifier, Notifier},
};
use std::sync::Arc;
use tracing::debug;

pub struct CliApp {
    pub config: AppConfig,
    pub api_config: ApiConfig,
    pub api: Arc<dyn BackupApi>,
    pub notifier: Arc<dyn Notifier>,
    dashboard: Bootstrap<Dashboard>,
}

impl CliApp {
    /// 按命令行参数加载配置并初始化CLI应用
    pub fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => AppConfig::load_from_file(path)?,
            None => AppConfig::find_and_load_config()?,
        }
        .with_server_url(cli.server.clone())?;

        let api_config = config.api_config();
        let api_client = ApiClient::with_timeout(api_config.clone(), config.request_timeout())?;
        debug!(base_url = %api_config.base_url, "API 客户端已创建");

        Ok(Self::from_parts(
            config,
            api_config,
            Arc::new(api_client),
            Arc::new(LogNotifier),
        ))
    }

    /// 使用已构造的组件创建应用
    pub fn from_parts(
        config: AppConfig,
        api_config: ApiConfig,
        api: Arc<dyn BackupApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            api_config,
            api,
            notifier,
            dashboard: Bootstrap::new(),
        }
    }

    /// 获取控制台会话，首次调用时完成加载
    pub async fn dashboard(&self, initial_tab: Provider) -> Arc<Dashboard> {
        self.dashboard
            .ensure_started(|| {
                Dashboard::mount(DashboardDeps {
                    api: Arc::clone(&self.api),
                    notifier: Arc::clone(&self.notifier),
                    registry: self.config.static_registry(),
                    poll_interval: self.config.poll_interval(),
                    initial_tab,
                })
            })
            .await
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::ApiInfo => commands::run_api_info(self),
            Commands::Health => commands::run_health(self).await,
            Commands::Instances => commands::run_instances(self).await,
            Commands::Status { provider, table } => {
                commands::run_status(self, provider, &table).await
            }
            Commands::ExportAws { env, yes, watch } => {
                commands::run_export_aws(self, &env, yes, watch).await
            }
            Commands::ExportAli { env, yes } => commands::run_export_ali(self, &env, yes).await,
            Commands::Dashboard => commands::run_dashboard(self).await,
        }
    }
}
