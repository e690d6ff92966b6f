use crate::app::CliApp;
use crate::project_info::{get_copyright_info, get_version_string};
use anyhow::{Result, anyhow};
use nova_core::models::Provider;
use nova_core::registry::EnvironmentRegistry;
use tracing::info;

/// 显示客户端版本信息
pub fn show_client_version() {
    info!("🛰️  {}", get_version_string());
    info!("   {}", get_copyright_info());
}

/// 显示API配置信息
pub fn run_api_info(app: &CliApp) -> Result<()> {
    show_client_version();
    info!("{}", app.api_config);
    Ok(())
}

/// 后端健康检查
pub async fn run_health(app: &CliApp) -> Result<()> {
    info!("🔍 检查后端服务: {}", app.api_config.base_url);
    match app.api.health().await {
        Ok(status) => {
            info!("✅ 后端服务状态: {}", status);
            Ok(())
        }
        Err(e) => Err(anyhow!("后端服务不可用: {}", e.reason())),
    }
}

/// 显示实例清单
pub async fn run_instances(app: &CliApp) -> Result<()> {
    let registry = match app.config.static_registry() {
        Some(registry) => {
            info!("📋 实例清单（来自配置文件）:");
            registry
        }
        None => {
            let registry =
                EnvironmentRegistry::load(app.api.as_ref(), app.notifier.as_ref()).await;
            info!("📋 实例清单（来自后端）:");
            registry
        }
    };

    for provider in Provider::ALL {
        let envs = registry.list(provider);
        info!("   {} ({} 个):", provider.display_name(), envs.len());
        if envs.is_empty() {
            info!("      -");
        }
        for env in envs {
            info!("      • {}", env);
        }
    }
    Ok(())
}
