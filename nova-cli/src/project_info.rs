/// Nova CLI 项目信息模块
///
/// nova-cli 是面向用户的主程序，项目元数据统一在这里定义
/// nova-core 作为内部库，只提供技术性常量

/// 项目元数据（自动从 nova-cli 的 Cargo.toml 同步）
pub mod metadata {
    /// 项目描述
    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    /// 项目作者
    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    /// 项目许可证
    pub const PROJECT_LICENSE: &str = env!("CARGO_PKG_LICENSE");

    /// 用户友好的显示名称（手动维护，用于 UI 显示）
    pub mod display {
        /// 用户友好的项目名称
        pub const FRIENDLY_NAME: &str = "Nova RDS";

        /// 项目详细描述
        pub const DESCRIPTION_LONG: &str = "跨云 RDS 灾备控制台：查看阿里云 RDS 最新备份与 AWS RDS 最新快照，并将其导出到 S3";
    }
}

/// 版本信息
pub mod version_info {
    /// CLI 版本（自动从 Cargo.toml 同步）
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// 获取版本信息字符串
pub fn get_version_string() -> String {
    format!(
        "{} v{}",
        metadata::display::FRIENDLY_NAME,
        version_info::CLI_VERSION
    )
}

/// 获取作者和许可证信息
pub fn get_copyright_info() -> String {
    format!(
        "© {} - Licensed under {}",
        metadata::PROJECT_AUTHORS,
        metadata::PROJECT_LICENSE
    )
}
