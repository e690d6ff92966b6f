/// API服务相关常量
pub mod api {
    /// 默认API服务器地址
    pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

    /// API端点路径，`{env}` 为环境占位符
    pub mod endpoints {
        /// 实例清单
        pub const INSTANCES: &str = "/instances";

        /// 阿里云RDS最新备份
        pub const ALI_BACKUP: &str = "/alirds/{env}";

        /// 阿里云备份导出使用的S3配置
        pub const ALI_S3_CONFIG: &str = "/alirds/s3config";

        /// 阿里云备份上传到S3
        pub const ALI_EXPORT_S3: &str = "/alirds/export/s3/{env}";

        /// AWS RDS最新快照
        pub const AWS_SNAPSHOT: &str = "/awsrds/{env}";

        /// AWS RDS快照导出
        pub const AWS_EXPORT: &str = "/awsrds/export/{env}";

        /// 健康检查
        pub const HEALTH: &str = "/health";
    }

    /// HTTP相关常量
    pub mod http {
        /// 默认请求超时时间（秒）
        pub const DEFAULT_TIMEOUT: u64 = 30;

        /// User-Agent头
        pub const USER_AGENT: &str = "nova-cli/0.1";
    }
}

/// 轮询相关常量
pub mod poller {
    /// AWS 导出任务状态轮询间隔（毫秒）
    pub const DEFAULT_INTERVAL_MS: u64 = 30_000;
}

/// 表格展示相关常量
pub mod view {
    /// 默认每页条数
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    /// 可选每页条数
    pub const PAGE_SIZE_OPTIONS: [usize; 3] = [10, 20, 50];

    /// 缺失值占位
    pub const PLACEHOLDER: &str = "-";
}

/// 配置文件相关常量
pub mod config {
    /// 默认配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// 按优先级查找的配置文件
    pub const CONFIG_FILE_CANDIDATES: [&str; 3] = ["config.toml", "nova-rds.toml", ".nova-rds.toml"];
}

/// 日志相关常量
pub mod logging {
    /// 设置后日志写入该文件
    pub const LOG_FILE_ENV: &str = "NOVA_LOG_FILE";
}
