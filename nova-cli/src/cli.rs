use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use nova_core::models::Provider;
use std::path::PathBuf;

/// Nova RDS CLI - 跨云数据库备份与快照导出工具
#[derive(Parser)]
#[command(name = "nova-cli")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径（不指定时依次查找 config.toml、nova-rds.toml、.nova-rds.toml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 后端服务地址，覆盖配置文件中的 server.base_url
    #[arg(long, env = "NOVA_SERVER_URL", global = true)]
    pub server: Option<String>,

    /// 详细输出
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// 表格查询参数
#[derive(clap::Args, Debug, Clone)]
pub struct TableArgs {
    /// 按环境名搜索（不区分大小写）
    #[arg(short, long)]
    pub search: Option<String>,

    /// 只显示指定环境（可重复）
    #[arg(long = "env")]
    pub envs: Vec<String>,

    /// 排序列：阿里云 env|time，AWS env|snapshot|time|status
    #[arg(long)]
    pub sort: Option<String>,

    /// 降序排列
    #[arg(long)]
    pub desc: bool,

    /// 页码，从 1 开始
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// 每页条数（10 / 20 / 50），默认取配置文件
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 生成默认配置文件
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 显示当前API配置信息
    ApiInfo,
    /// 检查后端服务健康状态
    Health,
    /// 显示后端配置的实例清单
    Instances,
    /// 查看备份或快照列表
    Status {
        /// 云厂商：aliyun 或 aws
        provider: Provider,

        #[command(flatten)]
        table: TableArgs,
    },
    /// 导出 AWS RDS 快照到 S3
    ExportAws {
        /// 环境名称
        env: String,

        /// 跳过确认
        #[arg(short, long)]
        yes: bool,

        /// 导出启动后持续刷新快照状态，Ctrl-C 退出
        #[arg(long)]
        watch: bool,
    },
    /// 将阿里云 RDS 最新备份上传到 S3
    ExportAli {
        /// 环境名称
        env: String,

        /// 跳过确认
        #[arg(short, long)]
        yes: bool,
    },
    /// 交互式控制台
    Dashboard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_arguments() {
        let cli = Cli::parse_from([
            "nova-cli", "status", "aws", "--search", "prod", "--env", "a", "--env", "b",
            "--sort", "time", "--desc", "--page-size", "20",
        ]);
        match cli.command {
            Commands::Status { provider, table } => {
                assert_eq!(provider, Provider::Aws);
                assert_eq!(table.search.as_deref(), Some("prod"));
                assert_eq!(table.envs, vec!["a", "b"]);
                assert!(table.desc);
                assert_eq!(table.page, 1);
                assert_eq!(table.page_size, Some(20));
            }
            _ => panic!("expected status command"),
        }
    }

    #[test]
    fn test_parse_export_with_global_flags() {
        let cli = Cli::parse_from([
            "nova-cli",
            "export-aws",
            "prod",
            "--yes",
            "--watch",
            "--server",
            "http://dr.internal:8080",
            "-v",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.server.as_deref(), Some("http://dr.internal:8080"));
        assert!(matches!(
            cli.command,
            Commands::ExportAws { ref env, yes: true, watch: true } if env == "prod"
        ));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(Cli::try_parse_from(["nova-cli", "status", "gcp"]).is_err());
    }
}
