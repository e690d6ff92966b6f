// 私有模块声明
mod app;
mod bootstrap;
mod cli;
mod commands;
mod init;
mod input;
pub mod project_info; // 公开项目信息模块
mod ui;
mod utils;

// 通过 pub use 精确控制对外暴露的接口
pub use app::CliApp;
pub use bootstrap::{Bootstrap, Phase};
pub use cli::{Cli, Commands, TableArgs};
pub use commands::{aliyun_query, aws_query, show_client_version};
pub use init::run_init;
pub use ui::render_panel;
pub use utils::setup_logging;
