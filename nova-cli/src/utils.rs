use nova_core::constants::logging::LOG_FILE_ENV;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

/// # Nova CLI 日志系统使用说明
///
/// ## 基本原则
/// 1. **库代码只使用 `tracing` 宏**：`info!()`, `warn!()`, `error!()`, `debug!()`
/// 2. **应用入口控制日志配置**：在 `main.rs` 中调用 `setup_logging()`
///
/// ## 日志配置选项
/// - `-v, --verbose`：启用详细日志模式（DEBUG 级别）
/// - `RUST_LOG`：标准的 Rust 日志级别控制
/// - `NOVA_LOG_FILE`：日志文件路径，设置后日志输出到文件而非终端
///
/// ```bash
/// NOVA_LOG_FILE=nova.log nova-cli status aws
/// RUST_LOG=nova_core::aggregator=debug nova-cli dashboard
/// ```
///
/// ## 日志格式
/// - **终端输出**：人类可读格式，不显示模块路径和时间戳
/// - **文件输出**：包含完整模块路径和更多调试信息
///
/// 返回的 guard 需要保持到程序退出，否则文件日志可能丢失
pub fn setup_logging(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt};

    // 根据verbose参数和环境变量确定日志级别
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 检查环境变量，决定是否输出到文件
    if let Some((dir, file_name)) = std::env::var(LOG_FILE_ENV)
        .ok()
        .as_deref()
        .and_then(split_log_path)
    {
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        fmt()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init();
        Some(guard)
    } else {
        // 输出到终端 - 使用简洁格式，用户友好
        fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .without_time()
            .compact()
            .init();
        None
    }
}

/// 拆分为目录和文件名，没有目录部分时使用当前目录
fn split_log_path(raw: &str) -> Option<(std::path::PathBuf, std::ffi::OsString)> {
    let path = Path::new(raw.trim());
    let file_name = path.file_name()?.to_os_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    Some((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_log_path() {
        let (dir, name) = split_log_path("logs/nova.log").unwrap();
        assert_eq!(dir, PathBuf::from("logs"));
        assert_eq!(name, "nova.log");

        let (dir, name) = split_log_path("nova.log").unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(name, "nova.log");

        assert!(split_log_path("").is_none());
    }
}
