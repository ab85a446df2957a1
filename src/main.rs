// BkTidy - 备份归档生命周期管理工具
//
// 主程序入口，负责命令行参数解析和各阶段协调
//
// 功能特性：
// - 重命名：过期的星期名备份改为永久日期名
// - 暂存：最近的备份以日期名复制到上传暂存区
// - 上传：暂存区文件移动到 S3（或本地镜像），成功后删除本地副本
// - 清理：删除超过保留期的备份，月末备份永久保留
// - 交互式配置向导

use anyhow::{Context, Result};
use bktidy::actions::{Phase, PhaseStats, RunSummary};
use bktidy::classify::{classify, FileKind};
use bktidy::config::{Settings, SettingsOverrides};
use bktidy::executor::{run_lifecycle, run_phase};
use bktidy::store::AppConfig;
use bktidy::utils::{format_bytes, format_duration};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 子命令枚举
#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// 完整运行：重命名 → 暂存 → 上传 → 清理（默认）
    Run,

    /// 只运行重命名阶段
    Rename,

    /// 只运行暂存阶段
    Stage,

    /// 只运行上传阶段
    Upload,

    /// 只运行保留期清理阶段
    Prune,

    /// 显示文件名的分类结果
    Classify {
        /// 要分类的文件名
        #[arg(value_name = "NAME", required = true)]
        names: Vec<String>,
    },

    /// 显示当前生效的配置
    Config,

    /// 交互式生成配置文件
    Setup,
}

/// 命令行参数结构体
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 子命令
    #[command(subcommand)]
    command: Option<Commands>,

    /// 备份根目录（主区域）
    #[arg(long, global = true, env = "BKTIDY_ROOT", value_name = "DIR")]
    root: Option<PathBuf>,

    /// 配置文件路径（默认为系统配置目录下的 bktidy/config.toml）
    #[arg(long, global = true, env = "BKTIDY_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// 删除超过此天数的文件
    #[arg(long, global = true, env = "BKTIDY_RETENTION_DAYS")]
    retention_days: Option<u32>,

    /// 槽位日期超过此天数后重命名
    #[arg(long, global = true, env = "BKTIDY_RENAME_AFTER_DAYS")]
    rename_after_days: Option<u32>,

    /// 暂存最近多少天内修改的文件
    #[arg(long, global = true, env = "BKTIDY_COPY_DAYS")]
    copy_days: Option<u32>,

    /// S3 存储桶
    #[arg(long, global = true, env = "BKTIDY_BUCKET")]
    bucket: Option<String>,

    /// AWS 凭证配置名
    #[arg(long, global = true, env = "BKTIDY_AWS_PROFILE")]
    aws_profile: Option<String>,

    /// 上传到本地镜像目录而不是 S3
    #[arg(long, global = true, value_name = "DIR")]
    mirror: Option<PathBuf>,

    /// 试运行模式（只报告，不修改任何文件）
    #[arg(long, global = true)]
    dry_run: bool,

    /// 输出更多日志（-v 调试，-vv 追踪）
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            root: self.root.clone(),
            retention_days: self.retention_days,
            rename_after_days: self.rename_after_days,
            copy_to_s3_days: self.copy_days,
            bucket: self.bucket.clone(),
            aws_profile: self.aws_profile.clone(),
            mirror: self.mirror.clone(),
            dry_run: self.dry_run,
        }
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => AppConfig::default_path(),
        }
    }
}

/// 初始化日志，`RUST_LOG` 优先于 `-v`
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "bktidy=info",
        1 => "bktidy=debug",
        _ => "bktidy=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();
}

/// 程序入口
fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command.clone().unwrap_or(Commands::Run) {
        Commands::Classify { names } => print_classification(&names),
        Commands::Setup => {
            let path = args.config_path()?;
            bktidy::cli::run_setup_wizard(&path)?;
        }
        Commands::Config => print_config(&args)?,
        Commands::Run => run(&args, None)?,
        Commands::Rename => run(&args, Some(Phase::Rename))?,
        Commands::Stage => run(&args, Some(Phase::Stage))?,
        Commands::Upload => run(&args, Some(Phase::Upload))?,
        Commands::Prune => run(&args, Some(Phase::Retention))?,
    }
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let path = args.config_path()?;
    let config = AppConfig::load_from(&path)?;
    Settings::resolve(&config, args.overrides())
}

/// 执行完整运行（`only` 为空）或单个阶段
///
/// 单个文件的失败只体现在统计中，不影响退出状态。
fn run(args: &Args, only: Option<Phase>) -> Result<()> {
    let settings = load_settings(args)?;
    let store = settings.store_for(only)?;

    let start_time = Instant::now();
    let now = Local::now();

    println!(
        "{}",
        style(format!("BkTidy v{}", env!("CARGO_PKG_VERSION"))).cyan().bold()
    );
    println!("Root:   {:?}", style(&settings.layout.main).blue());
    if let Some(store) = &store {
        println!("Remote: {}", style(store.name()).blue());
    }
    println!("Time:   {}", style(now.format("%Y-%m-%d %H:%M:%S")).yellow());
    if settings.dry_run {
        println!("{}", style("Dry run: no files will be changed").yellow());
    }
    println!("{}", style("----------------------------------------").dim());

    let summary = match only {
        None => run_lifecycle(&settings, store.as_deref(), now)?,
        Some(phase) => {
            let stats = run_phase(phase, &settings, store.as_deref(), now)
                .with_context(|| format!("{} phase failed", phase))?;
            let mut summary = RunSummary::default();
            summary.push(phase, stats);
            summary
        }
    };

    print_summary(&summary, settings.dry_run);
    println!(
        "Total Duration:   {}",
        style(format_duration(start_time.elapsed())).bold()
    );
    Ok(())
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!("{}", style("----------------------------------------").dim());
    for (phase, stats) in &summary.phases {
        println!("{:<10} {}", style(phase.as_str()).bold(), describe(*phase, stats));
    }

    let totals = summary.totals();
    if totals.bytes > 0 {
        println!("Data Staged:      {}", style(format_bytes(totals.bytes)).cyan());
    }
    if totals.failed > 0 {
        println!(
            "{}",
            style(format!("Completed with {} failure(s); see log above.", totals.failed))
                .red()
                .bold()
        );
    } else if dry_run {
        println!("{}", style("Dry run completed.").green().bold());
    } else {
        println!("{}", style("Run Completed Successfully!").green().bold());
    }
}

fn describe(phase: Phase, stats: &PhaseStats) -> String {
    let done = match phase {
        Phase::Rename => format!("renamed {}", style(stats.renamed).green()),
        Phase::Stage => format!("staged {}", style(stats.staged).green()),
        Phase::Upload => format!("uploaded {}", style(stats.uploaded).green()),
        Phase::Retention => format!("deleted {}", style(stats.deleted).green()),
    };
    format!(
        "{}, skipped {}, failed {}",
        done,
        style(stats.skipped).dim(),
        style(stats.failed).red()
    )
}

fn print_classification(names: &[String]) {
    for name in names {
        let c = classify(name);
        let detail = match &c.kind {
            FileKind::RotatingWeekday { slot, suffix } => format!("slot={} suffix={:?}", slot, suffix),
            FileKind::DatedDaily { date, suffix } => format!("date={} suffix={:?}", date, suffix),
            FileKind::RotatingFull { number, suffix } => format!("full={} suffix={:?}", number, suffix),
            FileKind::DatedFull { date, number, suffix } => {
                format!("date={} full={} suffix={:?}", date, number, suffix)
            }
            FileKind::Invalid => String::new(),
        };
        let protected = if c.protected { " [eom]" } else { "" };
        let label = if c.is_valid() {
            style(c.kind.label()).green()
        } else {
            style(c.kind.label()).red()
        };
        println!("{:<28} {}{} {}", name, label, protected, style(detail).dim());
    }
}

fn print_config(args: &Args) -> Result<()> {
    let path = args.config_path()?;
    println!("Config file: {:?}{}", path, if path.exists() { "" } else { " (not present)" });

    let settings = load_settings(args)?;
    let layout = &settings.layout;
    println!("Main area:        {:?}", layout.main);
    println!("Weekly-full area: {:?}", layout.weekly_full);
    println!("Staging area:     {:?}", layout.staging);
    println!("Retention days:   {}", settings.retention_days);
    println!("Rename after:     {} day(s)", settings.rename_after_days);
    println!("Staging window:   {} day(s)", settings.copy_to_s3_days);
    println!("Stage dated full: {}", settings.stage_dated_full);
    println!("Storage class:    {}", settings.remote.tier.as_s3_class());
    match settings.build_store() {
        Ok(store) => println!("Remote store:     {}", store.name()),
        Err(e) => println!("Remote store:     {}", style(e).yellow()),
    }
    Ok(())
}
