use crate::app::CliApp;
use crate::cli::TableArgs;
use crate::ui;
use anyhow::{Result, anyhow};
use nova_core::models::{EnvironmentId, Provider};
use nova_core::view::{AliColumn, AwsColumn, SortOrder, ViewQuery, is_standard_page_size};
use tracing::warn;

fn order(desc: bool) -> SortOrder {
    if desc {
        SortOrder::Descending
    } else {
        SortOrder::Ascending
    }
}

fn apply_common<C>(mut query: ViewQuery<C>, table: &TableArgs, default_page_size: usize) -> ViewQuery<C> {
    let page_size = table.page_size.unwrap_or(default_page_size);
    if !is_standard_page_size(page_size) {
        warn!("⚠️  每页条数 {} 不是标准选项（10 / 20 / 50）", page_size);
    }
    // 命令行输入去掉首尾空白
    query.search = table
        .search
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    query.envs = table
        .envs
        .iter()
        .map(|env| EnvironmentId::from(env.as_str()))
        .collect();
    query.with_page(table.page, page_size)
}

/// 阿里云表查询，未指定排序时按备份时间降序
pub fn aliyun_query(table: &TableArgs, default_page_size: usize) -> Result<ViewQuery<AliColumn>> {
    let mut query = apply_common(ViewQuery::aliyun(), table, default_page_size);
    if let Some(column) = &table.sort {
        let column = column.parse::<AliColumn>().map_err(|e| anyhow!(e))?;
        query = query.with_sort(column, order(table.desc));
    }
    Ok(query)
}

pub fn aws_query(table: &TableArgs, default_page_size: usize) -> Result<ViewQuery<AwsColumn>> {
    let mut query = apply_common(ViewQuery::aws(), table, default_page_size);
    if let Some(column) = &table.sort {
        let column = column.parse::<AwsColumn>().map_err(|e| anyhow!(e))?;
        query = query.with_sort(column, order(table.desc));
    }
    Ok(query)
}

/// 显示备份/快照列表
pub async fn run_status(app: &CliApp, provider: Provider, table: &TableArgs) -> Result<()> {
    let page_size = app.config.view.page_size;
    // 先校验参数，避免无效参数也触发请求
    let lines = match provider {
        Provider::Aliyun => {
            let query = aliyun_query(table, page_size)?;
            let dashboard = app.dashboard(provider).await;
            ui::render_panel(provider.display_name(), || {
                ui::render_aliyun(&dashboard.aliyun_view(&query))
            })
        }
        Provider::Aws => {
            let query = aws_query(table, page_size)?;
            let dashboard = app.dashboard(provider).await;
            ui::render_panel(provider.display_name(), || {
                ui::render_aws(&dashboard.aws_view(&query))
            })
        }
    };

    ui::print_lines(&lines);
    Ok(())
}
