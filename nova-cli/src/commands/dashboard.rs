use crate::app::CliApp;
use crate::input::is_affirmative;
use crate::ui;
use anyhow::Result;
use nova_core::aggregator::RefreshSummary;
use nova_core::confirm::GateState;
use nova_core::dashboard::Dashboard;
use nova_core::models::{EnvironmentId, Provider};
use nova_core::view::{AliColumn, AwsColumn, SortOrder, ViewQuery};
use std::collections::BTreeSet;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// 交互命令
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    Tab(Provider),
    Refresh,
    Search(String),
    Envs(Vec<String>),
    Sort { column: String, order: SortOrder },
    Page(usize),
    PageSize(usize),
    Export(String),
    Answer(bool),
    Quit,
    Empty,
    Invalid(String),
}

fn parse_command(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Command::Empty;
    };
    let rest: Vec<&str> = parts.collect();

    match head.to_lowercase().as_str() {
        "help" | "h" | "?" => Command::Help,
        "tab" => match rest.first().map(|p| p.parse::<Provider>()) {
            Some(Ok(provider)) => Command::Tab(provider),
            _ => Command::Invalid("用法: tab aliyun|aws".to_string()),
        },
        "refresh" | "r" => Command::Refresh,
        "search" | "s" => Command::Search(rest.join(" ")),
        "env" => Command::Envs(
            rest.iter()
                .flat_map(|p| p.split(','))
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        "sort" => match rest.as_slice() {
            [column] => Command::Sort {
                column: column.to_string(),
                order: SortOrder::Ascending,
            },
            [column, "desc"] => Command::Sort {
                column: column.to_string(),
                order: SortOrder::Descending,
            },
            [column, "asc"] => Command::Sort {
                column: column.to_string(),
                order: SortOrder::Ascending,
            },
            _ => Command::Invalid("用法: sort <列> [asc|desc]".to_string()),
        },
        "page" | "p" => match rest.first().and_then(|p| p.parse().ok()) {
            Some(page) => Command::Page(page),
            None => Command::Invalid("用法: page <页码>".to_string()),
        },
        "size" => match rest.first().and_then(|p| p.parse().ok()) {
            Some(size) if size > 0 => Command::PageSize(size),
            _ => Command::Invalid("用法: size 10|20|50".to_string()),
        },
        "export" | "e" => match rest.first() {
            Some(env) => Command::Export(env.to_string()),
            None => Command::Invalid("用法: export <环境>".to_string()),
        },
        "quit" | "q" | "exit" => Command::Quit,
        _ if is_affirmative(head) => Command::Answer(true),
        "n" | "no" | "取消" => Command::Answer(false),
        other => Command::Invalid(format!("未知命令: {other}，输入 help 查看帮助")),
    }
}

/// 两个标签页各自的查询状态
struct Session {
    aliyun: ViewQuery<AliColumn>,
    aws: ViewQuery<AwsColumn>,
}

impl Session {
    fn new(page_size: usize) -> Self {
        Self {
            aliyun: ViewQuery::aliyun().with_page(1, page_size),
            aws: ViewQuery::aws().with_page(1, page_size),
        }
    }

    fn render(&self, dashboard: &Dashboard) -> Vec<String> {
        let tab = dashboard.active_tab();
        let mut lines = vec![format!(
            "===== {} | {} =====",
            tab.display_name(),
            if dashboard.is_polling() {
                "🔄 自动刷新中"
            } else {
                "手动刷新"
            }
        )];
        lines.extend(match tab {
            Provider::Aliyun => ui::render_panel(tab.display_name(), || {
                ui::render_aliyun(&dashboard.aliyun_view(&self.aliyun))
            }),
            Provider::Aws => ui::render_panel(tab.display_name(), || {
                ui::render_aws(&dashboard.aws_view(&self.aws))
            }),
        });
        lines
    }
}

fn print_help() {
    info!("📖 可用命令:");
    info!("   tab aliyun|aws          切换标签页并刷新");
    info!("   refresh                 刷新当前标签页");
    info!("   search <文本>           按环境名搜索，留空清除");
    info!("   env <a,b,...>           只显示指定环境，留空清除");
    info!("   sort <列> [asc|desc]    排序（阿里云: env|time，AWS: env|snapshot|time|status）");
    info!("   page <n> / size <n>     翻页 / 每页条数");
    info!("   export <环境>           导出当前标签页中的记录");
    info!("   y / n                   确认或取消导出");
    info!("   quit                    退出");
}

/// 部分环境失败时追加一行汇总
fn warn_partial(summary: Option<RefreshSummary>) {
    if let Some(Err(e)) = summary.map(|s| s.ensure_complete()) {
        warn!("⚠️  {}", e);
    }
}

/// 处理一条命令，返回 false 表示退出
async fn handle(dashboard: &Dashboard, session: &mut Session, command: Command) -> Result<bool> {
    let prompting = matches!(dashboard.gate_state(), GateState::Prompting(_));
    match command {
        Command::Quit => return Ok(false),
        Command::Empty => return Ok(true),
        Command::Help => {
            print_help();
            return Ok(true);
        }
        Command::Invalid(message) => {
            warn!("⚠️  {}", message);
            return Ok(true);
        }
        Command::Answer(true) => {
            if let Err(e) = dashboard.confirm_export().await {
                warn!("⚠️  {}", e);
            }
        }
        Command::Answer(false) => {
            if let Err(e) = dashboard.cancel_export() {
                warn!("⚠️  {}", e);
            }
        }
        _ if prompting => {
            warn!("⚠️  请先输入 y 确认或 n 取消当前导出");
            return Ok(true);
        }
        Command::Tab(provider) => {
            warn_partial(dashboard.switch_tab(provider).await);
        }
        Command::Refresh => {
            warn_partial(dashboard.refresh_active().await);
        }
        Command::Search(text) => {
            session.aliyun.search = text.clone();
            session.aws.search = text;
        }
        Command::Envs(envs) => {
            let envs: BTreeSet<EnvironmentId> = envs.into_iter().map(EnvironmentId::from).collect();
            session.aliyun.envs = envs.clone();
            session.aws.envs = envs;
        }
        Command::Sort { column, order } => match dashboard.active_tab() {
            Provider::Aliyun => match column.parse::<AliColumn>() {
                Ok(column) => session.aliyun.sort = Some((column, order)),
                Err(e) => warn!("⚠️  {}", e),
            },
            Provider::Aws => match column.parse::<AwsColumn>() {
                Ok(column) => session.aws.sort = Some((column, order)),
                Err(e) => warn!("⚠️  {}", e),
            },
        },
        Command::Page(page) => match dashboard.active_tab() {
            Provider::Aliyun => session.aliyun.page = page,
            Provider::Aws => session.aws.page = page,
        },
        Command::PageSize(size) => {
            session.aliyun = session.aliyun.clone().with_page(1, size);
            session.aws = session.aws.clone().with_page(1, size);
        }
        Command::Export(env) => {
            match dashboard.request_export(dashboard.active_tab(), &EnvironmentId::from(env)) {
                Ok(prompt) => {
                    ui::print_lines(&ui::render_prompt(&prompt));
                    info!("输入 y 确认，n 取消");
                }
                Err(e) => warn!("⚠️  {}", e),
            }
            return Ok(true);
        }
    }

    ui::print_lines(&session.render(dashboard));
    Ok(true)
}

/// 交互式控制台
pub async fn run_dashboard(app: &CliApp) -> Result<()> {
    let dashboard = app.dashboard(Provider::Aliyun).await;
    let mut session = Session::new(app.config.view.page_size);
    info!("🛰️  Nova RDS 控制台，输入 help 查看命令");
    ui::print_lines(&session.render(&dashboard));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut aws_records = dashboard.subscribe_aws();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(&dashboard, &mut session, parse_command(&line)).await? {
                    break;
                }
                // 本次操作引起的刷新已经输出过
                aws_records.borrow_and_update();
            }
            changed = aws_records.changed() => {
                if changed.is_err() {
                    break;
                }
                let idle = dashboard.gate_state() == GateState::Idle;
                if idle && dashboard.active_tab() == Provider::Aws {
                    ui::print_lines(&session.render(&dashboard));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dashboard.teardown();
    info!("👋 已退出控制台");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("tab aws"), Command::Tab(Provider::Aws));
        assert!(matches!(parse_command("tab gcp"), Command::Invalid(_)));
        assert_eq!(
            parse_command("search prod cn"),
            Command::Search("prod cn".to_string())
        );
        assert_eq!(parse_command("search"), Command::Search(String::new()));
        assert_eq!(
            parse_command("env a,b c"),
            Command::Envs(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(
            parse_command("sort time desc"),
            Command::Sort {
                column: "time".to_string(),
                order: SortOrder::Descending
            }
        );
        assert_eq!(parse_command("size 20"), Command::PageSize(20));
        assert!(matches!(parse_command("size 0"), Command::Invalid(_)));
        assert_eq!(parse_command("export prod"), Command::Export("prod".to_string()));
        assert_eq!(parse_command("Y"), Command::Answer(true));
        assert_eq!(parse_command("n"), Command::Answer(false));
        assert_eq!(parse_command("q"), Command::Quit);
    }
}
