use nova_core::{config::AppConfig, error::Result};
use std::path::Path;
use tracing::{info, warn};

/// 生成默认配置文件
pub fn run_init(path: &Path, force: bool) -> Result<bool> {
    info!("🛰️  Nova RDS 初始化");
    info!("======================");

    if path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", path.display());
        info!("如果您要重新生成，请使用 --force 参数");
        info!("示例: nova-cli init --force");
        return Ok(false);
    }

    let config = AppConfig::default();
    config.save_to_file(path)?;
    info!("   ✅ 创建配置文件: {}", path.display());

    info!("🎉 初始化完成！");
    info!("");
    info!("📝 接下来的步骤:");
    info!("   1️⃣  编辑 {} 中的 server.base_url 指向后端服务", path.display());
    info!("   2️⃣  运行 'nova-cli health' 检查后端连通性");
    info!("   3️⃣  运行 'nova-cli status aliyun' 或 'nova-cli status aws' 查看备份");
    info!("");
    info!("💡 提示:");
    info!("   - 使用 'nova-cli --help' 查看所有可用命令");
    info!("   - 使用 'nova-cli dashboard' 进入交互式控制台");

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_respects_force() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        assert!(run_init(&path, false).unwrap());
        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, AppConfig::default());

        std::fs::write(&path, "[view]\npage_size = 50\n").unwrap();
        assert!(!run_init(&path, false).unwrap());
        assert_eq!(AppConfig::load_from_file(&path).unwrap().view.page_size, 50);

        assert!(run_init(&path, true).unwrap());
        assert_eq!(AppConfig::load_from_file(&path).unwrap().view.page_size, 10);
    }
}
