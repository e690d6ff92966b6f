mod dashboard;
mod export;
mod info;
mod status;

// Info commands
pub use info::{run_api_info, run_health, run_instances, show_client_version};

// Table commands
pub use status::{aliyun_query, aws_query, run_status};

// Export commands
pub use export::{run_export_ali, run_export_aws};

// Interactive session
pub use dashboard::run_dashboard;
