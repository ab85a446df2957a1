// BkTidy - 生命周期执行器模块
// 负责执行已规划的文件操作（重命名、暂存复制、上传、删除）并按固定顺序运行各阶段

use crate::actions::{LifecycleAction, Phase, PhaseStats, PlannedTask, RunSummary, SkipReason};
use crate::config::Settings;
use crate::hasher::same_content;
use crate::remote::{MoveRequest, RemoteStore};
use crate::{prune, rename, stage, upload};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local};
use filetime::FileTime;
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// 单个任务的执行结果
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    /// 已完成，附带复制的字节数
    Done(u64),
    /// 执行时发现目标已存在
    Skipped(SkipReason),
}

/// 生命周期执行器
///
/// 逐个顺序处理任务；单个文件失败只计数和报告，不会中断阶段。
pub struct LifecycleExecutor<'a> {
    /// 是否为试运行模式
    dry_run: bool,

    /// 上传阶段使用的远程存储
    store: Option<&'a dyn RemoteStore>,
}

impl<'a> LifecycleExecutor<'a> {
    /// 创建新的执行器
    pub fn new(dry_run: bool, store: Option<&'a dyn RemoteStore>) -> Self {
        Self { dry_run, store }
    }

    /// 执行一个阶段的全部任务
    ///
    /// # 返回
    /// 阶段统计信息
    pub fn execute(&self, phase: Phase, tasks: Vec<PlannedTask>) -> PhaseStats {
        let mut stats = PhaseStats::new();

        let pb = if phase == Phase::Upload && !self.dry_run && !tasks.is_empty() {
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
            let pb = ProgressBar::new(tasks.len() as u64);
            pb.set_style(style);
            pb
        } else {
            ProgressBar::hidden()
        };

        for (task, action) in tasks {
            pb.set_message(task.name.clone());

            if let LifecycleAction::Skip(reason) = &action {
                pb.suspend(|| tracing::info!(%phase, file = %task.name, %reason, "skipped"));
                stats.skipped += 1;
                pb.inc(1);
                continue;
            }

            match self.process_task(&task.path, &action) {
                Ok(Outcome::Done(bytes)) => {
                    match action {
                        LifecycleAction::Rename { .. } => stats.renamed += 1,
                        LifecycleAction::Stage { .. } => stats.staged += 1,
                        LifecycleAction::Upload(request) => {
                            if !self.dry_run {
                                pb.suspend(|| {
                                    tracing::info!(file = %request.filename, key = %request.key(), "uploaded")
                                });
                            }
                            stats.uploaded += 1;
                        }
                        LifecycleAction::Delete => stats.deleted += 1,
                        LifecycleAction::Skip(_) => {}
                    }
                    stats.bytes += bytes;
                }
                Ok(Outcome::Skipped(reason)) => {
                    pb.suspend(|| tracing::info!(%phase, file = %task.name, %reason, "skipped"));
                    stats.skipped += 1;
                }
                Err(e) => {
                    pb.suspend(|| {
                        tracing::warn!(%phase, file = %task.name, error = %format!("{:#}", e), "failed");
                    });
                    stats.failed += 1;
                }
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        stats
    }

    /// 处理单个文件任务
    fn process_task(&self, path: &Path, action: &LifecycleAction) -> Result<Outcome> {
        // 试运行模式不执行实际操作
        if self.dry_run {
            describe_dry_run(path, action);
            return Ok(Outcome::Done(0));
        }

        match action {
            LifecycleAction::Rename { to } => rename_preserving(path, to),
            LifecycleAction::Stage { to } => stage_copy(path, to),
            LifecycleAction::Upload(request) => {
                let store = self
                    .store
                    .ok_or_else(|| anyhow!("No remote store configured for upload"))?;
                upload_file(store, request)
            }
            LifecycleAction::Delete => {
                fs::remove_file(path).with_context(|| format!("Failed to delete {:?}", path))?;
                tracing::info!(file = ?path, "deleted");
                Ok(Outcome::Done(0))
            }
            LifecycleAction::Skip(reason) => Ok(Outcome::Skipped(reason.clone())),
        }
    }
}

fn describe_dry_run(path: &Path, action: &LifecycleAction) {
    match action {
        LifecycleAction::Rename { to } => tracing::info!(from = ?path, to = ?to, "dry run: would rename"),
        LifecycleAction::Stage { to } => tracing::info!(from = ?path, to = ?to, "dry run: would stage"),
        LifecycleAction::Upload(req) => tracing::info!(file = ?path, key = %req.key(), "dry run: would upload"),
        LifecycleAction::Delete => tracing::info!(file = ?path, "dry run: would delete"),
        LifecycleAction::Skip(_) => {}
    }
}

/// 原地重命名
///
/// 目标已存在时不覆盖，报告为跳过。同一文件系统内的重命名不改变修改时间。
fn rename_preserving(from: &Path, to: &Path) -> Result<Outcome> {
    if fs::symlink_metadata(to).is_ok() {
        return Ok(Outcome::Skipped(SkipReason::DestinationExists(to.to_path_buf())));
    }
    fs::rename(from, to).with_context(|| format!("Failed to rename {:?} to {:?}", from, to))?;
    tracing::info!(from = ?from, to = ?to, "renamed");
    Ok(Outcome::Done(0))
}

/// 暂存用的临时文件名：`<name>.partial`
fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.file_name().map(OsString::from).unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

/// 复制到暂存区
///
/// 先写入 `.partial` 临时文件，保留时间戳并校验内容一致后再改为最终名称，
/// 中断时暂存区里不会出现不完整的同名文件。
fn stage_copy(src: &Path, dest: &Path) -> Result<Outcome> {
    if dest.exists() {
        return Ok(Outcome::Skipped(SkipReason::DestinationExists(dest.to_path_buf())));
    }

    let parent = dest
        .parent()
        .with_context(|| format!("Staging path has no parent: {:?}", dest))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create staging area {:?}", parent))?;

    let partial = partial_path(dest);
    let bytes = fs::copy(src, &partial)
        .with_context(|| format!("Failed to copy {:?} to {:?}", src, partial))?;

    if let Err(e) = preserve_times(src, &partial).and_then(|_| verify_copy(src, &partial)) {
        fs::remove_file(&partial).ok();
        return Err(e);
    }

    if dest.exists() {
        fs::remove_file(&partial).ok();
        return Ok(Outcome::Skipped(SkipReason::DestinationExists(dest.to_path_buf())));
    }

    fs::rename(&partial, dest)
        .with_context(|| format!("Failed to commit staged copy {:?}", dest))?;
    tracing::info!(from = ?src, to = ?dest, bytes, "staged");
    Ok(Outcome::Done(bytes))
}

/// 保留源文件的访问时间和修改时间
fn preserve_times(src: &Path, dest: &Path) -> Result<()> {
    let src_meta = fs::metadata(src)?;
    let mtime = FileTime::from_last_modification_time(&src_meta);
    let atime = FileTime::from_last_access_time(&src_meta);

    let mut perms = fs::metadata(dest)?.permissions();
    let original_readonly = perms.readonly();

    // 只读文件需要先取消只读才能设置时间戳
    if original_readonly {
        perms.set_readonly(false);
        fs::set_permissions(dest, perms.clone())
            .with_context(|| format!("Failed to unset readonly for {:?}", dest))?;
    }

    filetime::set_file_times(dest, atime, mtime)
        .with_context(|| format!("Failed to set time for {:?}", dest))?;

    if original_readonly {
        perms.set_readonly(true);
        fs::set_permissions(dest, perms)?;
    }
    Ok(())
}

fn verify_copy(src: &Path, copy: &Path) -> Result<()> {
    if !same_content(src, copy)? {
        bail!("Staged copy {:?} does not match source {:?}", copy, src);
    }
    Ok(())
}

/// 上传单个暂存文件
///
/// 远程确认成功后，如果本地文件仍存在（协作者只复制），由这里删除；
/// 失败时保留本地文件，下次运行自然重试。
fn upload_file(store: &dyn RemoteStore, request: &MoveRequest) -> Result<Outcome> {
    store
        .move_file(request)
        .with_context(|| format!("Upload of {:?} to {} failed", request.local_path, store.name()))?;

    if fs::symlink_metadata(&request.local_path).is_ok() {
        fs::remove_file(&request.local_path).with_context(|| {
            format!("Uploaded but failed to remove staged copy {:?}", request.local_path)
        })?;
    }
    Ok(Outcome::Done(0))
}

/// 运行单个阶段：重新扫描文件系统、规划、执行
///
/// 上传阶段需要 `store`，其他阶段可以传 `None`。
pub fn run_phase(
    phase: Phase,
    settings: &Settings,
    store: Option<&dyn RemoteStore>,
    now: DateTime<Local>,
) -> Result<PhaseStats> {
    let tasks = match phase {
        Phase::Rename => rename::plan_renames(settings, now)?,
        Phase::Stage => stage::plan_staging(settings, now)?,
        Phase::Upload => upload::plan_uploads(settings)?,
        Phase::Retention => prune::plan_retention(settings, now)?,
    };

    tracing::debug!(%phase, tasks = tasks.len(), "planned");
    let executor = LifecycleExecutor::new(settings.dry_run, store);
    Ok(executor.execute(phase, tasks))
}

/// 完整运行：重命名 → 暂存 → 上传 → 清理
///
/// 每个阶段独立扫描文件系统，阶段之间不共享文件列表。
/// 某个阶段无法规划（例如子目录不可读）时记录为一次失败并继续后续阶段。
///
/// # 返回
/// * `Ok(RunSummary)` - 各阶段统计
/// * `Err(anyhow::Error)` - 主区域不存在
pub fn run_lifecycle(
    settings: &Settings,
    store: Option<&dyn RemoteStore>,
    now: DateTime<Local>,
) -> Result<RunSummary> {
    if !settings.layout.main.is_dir() {
        bail!("Backup root does not exist: {:?}", settings.layout.main);
    }

    let mut summary = RunSummary::default();
    for phase in Phase::ORDER {
        let stats = match run_phase(phase, settings, store, now) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(%phase, error = %format!("{:#}", e), "phase could not run");
                PhaseStats {
                    failed: 1,
                    ..PhaseStats::default()
                }
            }
        };
        summary.push(phase, stats);
    }
    Ok(summary)
}
