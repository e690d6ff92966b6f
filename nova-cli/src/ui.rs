//! 终端表格输出

use anyhow::Result;
use nova_core::confirm::Prompt;
use nova_core::constants::view::PLACEHOLDER;
use nova_core::models::{BackupRecord, RowTone, SnapshotRecord, StatusTone};
use nova_core::view::TableView;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{error, info};

pub fn tone_icon(tone: StatusTone) -> &'static str {
    match tone {
        StatusTone::Success => "🟢",
        StatusTone::Processing => "🔵",
        StatusTone::Error => "🔴",
        StatusTone::Warning => "🟠",
        StatusTone::Default => "⚪",
    }
}

fn row_marker(tone: RowTone) -> &'static str {
    match tone {
        RowTone::Failed => "❗",
        RowTone::Processing => "⏳",
        RowTone::Normal => "  ",
    }
}

fn or_placeholder(value: Option<impl ToString>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// 终端显示宽度，中日韩字符和 emoji 按两列计算
fn display_width(s: &str) -> usize {
    s.chars()
        .map(|c| match c as u32 {
            0x1100..=0x115F
            | 0x2E80..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1F64F
            | 0x1F900..=0x1F9FF => 2,
            _ => 1,
        })
        .sum()
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(cell));
    format!("{cell}{}", " ".repeat(fill))
}

/// 按列对齐
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(display_width(cell));
            }
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| pad(cell, *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(line(headers.to_vec()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(line(row.iter().map(String::as_str).collect()));
    }
    lines
}

fn footer<R>(view: &TableView<R>) -> String {
    format!(
        "{}  第 {}/{} 页，每页 {} 条",
        view.total_label(),
        view.page,
        view.page_count,
        view.page_size
    )
}

pub fn render_aliyun(view: &TableView<BackupRecord>) -> Result<Vec<String>> {
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| {
            vec![
                r.env.to_string(),
                or_placeholder(r.backup_start_time.as_ref()),
                or_placeholder(r.public_download_url.as_deref()),
                or_placeholder(r.intranet_download_url.as_deref()),
            ]
        })
        .collect();

    let mut lines = render_table(&["环境", "备份开始时间", "外网下载地址", "内网下载地址"], &rows);
    lines.push(footer(view));
    Ok(lines)
}

pub fn render_aws(view: &TableView<SnapshotRecord>) -> Result<Vec<String>> {
    let rows: Vec<Vec<String>> = view
        .rows
        .iter()
        .map(|r| {
            let export_status = match &r.export_status {
                Some(status) => format!("{} {}", tone_icon(status.tone()), status.as_str()),
                None => PLACEHOLDER.to_string(),
            };
            vec![
                format!("{}{}", row_marker(r.row_tone()), r.env),
                r.snapshot_id.clone(),
                or_placeholder(r.create_time.as_ref()),
                format!("{} {}", tone_icon(r.status.tone()), r.status.as_str()),
                r.instance_id.clone(),
                r.region.clone(),
                or_placeholder(r.export_task_id.as_deref()),
                export_status,
            ]
        })
        .collect();

    let mut lines = render_table(
        &[
            "  环境", "快照ID", "创建时间", "状态", "实例ID", "区域", "导出任务", "导出状态",
        ],
        &rows,
    );
    lines.push(footer(view));
    Ok(lines)
}

/// 渲染一个面板，失败时只显示错误信息，不影响其他面板
pub fn render_panel<F>(title: &str, render: F) -> Vec<String>
where
    F: FnOnce() -> Result<Vec<String>>,
{
    let result = catch_unwind(AssertUnwindSafe(render));
    let mut lines = vec![format!("📋 {title}")];
    match result {
        Ok(Ok(body)) => lines.extend(body),
        Ok(Err(e)) => {
            error!("面板 {} 渲染失败: {:#}", title, e);
            lines.push(format!("组件加载错误: {e}"));
        }
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "未知错误".to_string());
            error!("面板 {} 渲染异常: {}", title, reason);
            lines.push(format!("组件加载错误: {reason}"));
        }
    }
    lines
}

pub fn render_prompt(prompt: &Prompt) -> Vec<String> {
    prompt.to_string().lines().map(str::to_string).collect()
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        info!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nova_core::models::{ExportStatus, SnapshotStatus, Timestamp};
    use nova_core::view::ViewQuery;

    fn snapshot(env: &str, status: &str, export: Option<&str>) -> SnapshotRecord {
        SnapshotRecord {
            env: env.into(),
            snapshot_id: format!("rds:{env}"),
            snapshot_arn: String::new(),
            create_time: Timestamp::parse("2024-03-20T10:00:00Z"),
            status: SnapshotStatus::from(status),
            instance_id: format!("{env}-db"),
            region: "us-east-1".to_string(),
            export_task_id: export.map(|_| "T1".to_string()),
            export_status: export.map(ExportStatus::from),
        }
    }

    #[test]
    fn test_table_alignment_with_wide_chars() {
        let lines = render_table(
            &["环境", "id"],
            &[vec!["prod".to_string(), "1".to_string()]],
        );
        assert_eq!(lines[0], "环境  id");
        assert_eq!(lines[1], "----  --");
        assert_eq!(lines[2], "prod  1");
    }

    #[test]
    fn test_aws_table_marks_rows() {
        let records = vec![
            snapshot("prod", "available", Some("IN_PROGRESS")),
            snapshot("dev", "failed", None),
        ];
        let view = TableView::build(&records, &ViewQuery::aws());
        let lines = render_aws(&view).unwrap();

        assert!(lines[2].starts_with("⏳prod"));
        assert!(lines[2].contains("2024-03-20 10:00:00"));
        assert!(lines[3].starts_with("❗dev"));
        assert!(lines[3].contains("🔴 failed"));
        assert_eq!(lines.last().unwrap(), "共 2 条记录  第 1/1 页，每页 10 条");
    }

    #[test]
    fn test_empty_aliyun_cells_use_placeholder() {
        let records = vec![BackupRecord::empty("cn".into())];
        let view = TableView::build(&records, &ViewQuery::aliyun());
        let lines = render_aliyun(&view).unwrap();
        assert_eq!(lines[2], "cn    -             -             -");
    }

    #[test]
    fn test_failed_panel_is_contained() {
        let broken = render_panel("AWS RDS快照", || anyhow::bail!("数据格式异常"));
        assert_eq!(broken, vec!["📋 AWS RDS快照", "组件加载错误: 数据格式异常"]);

        let panicked = render_panel("阿里云RDS备份", || -> Result<Vec<String>> {
            panic!("index out of bounds")
        });
        assert_eq!(panicked[1], "组件加载错误: index out of bounds");

        let healthy = render_panel("其他", || Ok(vec!["ok".to_string()]));
        assert_eq!(healthy, vec!["📋 其他", "ok"]);
    }
}
