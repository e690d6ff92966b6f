use crate::app::CliApp;
use crate::input::ask_confirmation;
use crate::ui;
use anyhow::Result;
use nova_core::confirm::Prompt;
use nova_core::dashboard::{Dashboard, ExportOutcome};
use nova_core::models::{EnvironmentId, Provider};
use nova_core::view::ViewQuery;
use tracing::{info, warn};

/// 显示确认框，用户拒绝时走取消流程
async fn confirm_or_cancel(dashboard: &Dashboard, prompt: &Prompt, yes: bool) -> Result<bool> {
    ui::print_lines(&ui::render_prompt(prompt));
    let accepted = yes || ask_confirmation(&prompt.ok_text).await?;
    if !accepted {
        dashboard.cancel_export()?;
    }
    Ok(accepted)
}

/// 导出 AWS RDS 快照
pub async fn run_export_aws(app: &CliApp, env: &str, yes: bool, watch: bool) -> Result<()> {
    let dashboard = app.dashboard(Provider::Aws).await;
    let env = EnvironmentId::from(env);

    let prompt = dashboard.request_export(Provider::Aws, &env)?;
    if !confirm_or_cancel(&dashboard, &prompt, yes).await? {
        return Ok(());
    }

    let outcome = dashboard.confirm_export().await?;
    if let ExportOutcome::Aws(receipt) = &outcome {
        info!("📦 导出任务ID: {}", receipt.export_task_id);
    }

    if watch {
        watch_aws(app, &dashboard).await?;
    } else {
        info!("💡 可使用 'nova-cli status aws' 查看导出进度");
    }
    dashboard.teardown();
    Ok(())
}

/// 跟随定时刷新输出快照表，直到 Ctrl-C
async fn watch_aws(app: &CliApp, dashboard: &Dashboard) -> Result<()> {
    if !dashboard.is_polling() {
        warn!("⚠️  定时刷新未启动");
        return Ok(());
    }
    info!(
        "👀 每 {} 秒刷新一次快照状态，按 Ctrl-C 退出",
        app.config.poll_interval().as_secs()
    );

    let query = ViewQuery::aws().with_page(1, app.config.view.page_size);
    let mut records = dashboard.subscribe_aws();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("⏹️ 停止跟踪");
                break;
            }
            changed = records.changed() => {
                if changed.is_err() {
                    break;
                }
                let lines = ui::render_panel(Provider::Aws.display_name(), || {
                    ui::render_aws(&dashboard.aws_view(&query))
                });
                ui::print_lines(&lines);
            }
        }
    }
    Ok(())
}

/// 将阿里云 RDS 最新备份上传到 S3
pub async fn run_export_ali(app: &CliApp, env: &str, yes: bool) -> Result<()> {
    let dashboard = app.dashboard(Provider::Aliyun).await;
    let env = EnvironmentId::from(env);

    let prompt = dashboard.request_export(Provider::Aliyun, &env)?;
    if !confirm_or_cancel(&dashboard, &prompt, yes).await? {
        return Ok(());
    }

    if let ExportOutcome::Aliyun(receipt) = dashboard.confirm_export().await? {
        if let Some(path) = receipt.object_path() {
            info!("📦 目标对象: s3://{}/{}", receipt.bucket, path);
        }
    }
    dashboard.teardown();
    Ok(())
}
