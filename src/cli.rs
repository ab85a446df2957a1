// BkTidy - 命令行交互界面模块
// 提供交互式配置向导，生成并保存配置文件

use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::{Path, PathBuf};

use crate::store::AppConfig;

/// 运行交互式配置向导
///
/// 以现有配置为默认值，依次询问备份根目录、各项天数阈值和远程存储设置，
/// 用户确认后写入 `path`。
///
/// # 参数
/// * `path` - 配置文件路径
///
/// # 返回
/// * `Ok(true)` - 配置已保存
/// * `Ok(false)` - 用户取消
/// * `Err(anyhow::Error)` - 交互或写入失败
pub fn run_setup_wizard(path: &Path) -> Result<bool> {
    let mut config = AppConfig::load_from(path)?;
    let theme = ColorfulTheme::default();

    println!(
        "{}",
        style(format!("BkTidy Setup v{}", env!("CARGO_PKG_VERSION")))
            .cyan()
            .bold()
    );
    println!("{}", style("----------------------------------------").dim());

    // 备份根目录
    let root_default = config
        .root
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    let root: String = Input::with_theme(&theme)
        .with_prompt("Backup root (main area)")
        .with_initial_text(root_default)
        .interact_text()?;
    config.root = Some(PathBuf::from(root.trim()));

    config.retention_days = Input::with_theme(&theme)
        .with_prompt("Delete files older than (days)")
        .default(config.retention_days)
        .interact_text()?;

    config.rename_after_days = Input::with_theme(&theme)
        .with_prompt("Rename weekday files to dates after (days)")
        .default(config.rename_after_days)
        .interact_text()?;

    config.copy_to_s3_days = Input::with_theme(&theme)
        .with_prompt("Stage files modified within (days)")
        .default(config.copy_to_s3_days)
        .interact_text()?;

    config.stage_dated_full = Confirm::with_theme(&theme)
        .with_prompt("Also stage already-dated full backups in WEEKLYFULL?")
        .default(config.stage_dated_full)
        .interact()?;

    // 远程存储
    let bucket: String = Input::with_theme(&theme)
        .with_prompt("S3 bucket (empty for none)")
        .with_initial_text(config.remote.bucket.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    config.remote.bucket = non_empty(bucket);

    let profile: String = Input::with_theme(&theme)
        .with_prompt("AWS credential profile (empty for default)")
        .with_initial_text(config.remote.aws_profile.clone().unwrap_or_default())
        .allow_empty(true)
        .interact_text()?;
    config.remote.aws_profile = non_empty(profile);

    if !Confirm::with_theme(&theme)
        .with_prompt(format!("Save configuration to {:?}?", path))
        .default(true)
        .interact()?
    {
        println!("Operation cancelled.");
        return Ok(false);
    }

    config.save_to(path)?;
    println!("{} Configuration saved.", style("Success:").green());
    Ok(true)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
