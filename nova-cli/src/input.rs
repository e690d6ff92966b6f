use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// 肯定回答：y / yes / 是 / 确认
pub fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "y" | "yes" | "是" | "确认"
    )
}

/// 从标准输入读取一行确认，默认否
pub async fn ask_confirmation(question: &str) -> Result<bool> {
    info!("{} [y/N]", question);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(is_affirmative(&line))
}
