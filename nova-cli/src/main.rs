use clap::Parser;
use nova_cli::{Cli, CliApp, Commands, run_init, setup_logging};
use nova_core::NovaError;
use nova_core::constants::config::CONFIG_FILE_NAME;
use std::path::PathBuf;
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志记录，文件日志的 guard 需要保持到退出
    let _log_guard = setup_logging(cli.verbose);

    // `init` 命令是特例，它不需要预先加载配置
    if let Commands::Init { force } = cli.command {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        if let Err(e) = run_init(&path, force) {
            error!("❌ 初始化失败: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // 对于其他所有命令，我们需要加载配置并初始化App
    let app = match CliApp::new(&cli) {
        Ok(app) => app,
        Err(NovaError::ConfigNotFound) => {
            if let Some(path) = &cli.config {
                error!("❌ 配置文件 '{}' 未找到。", path.display());
            }
            error!("👉 请先运行 'nova-cli init' 命令来创建配置文件。");
            std::process::exit(1);
        }
        Err(e) => {
            error!("❌ 应用初始化失败: {}", e);
            std::process::exit(1);
        }
    };

    // 运行命令
    if let Err(e) = app.run_command(cli.command).await {
        error!("❌ 操作失败: {:#}", e);
        std::process::exit(1);
    }
}
