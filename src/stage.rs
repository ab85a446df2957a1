// BkTidy - 暂存阶段
// 把最近修改的备份以日期名复制到上传暂存区，原文件保持不变

use crate::actions::{FileTask, LifecycleAction, PlannedTask, SkipReason};
use crate::classify::FileKind;
use crate::config::Settings;
use crate::resolver::SlotDates;
use crate::scanner::{list_files, list_files_if_present, ScannedFile};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::PathBuf;

/// 暂存候选：源文件和日期化后的目标文件名（`None` 表示日期无法解析）
struct Candidate<'a> {
    file: &'a ScannedFile,
    target_name: Option<String>,
}

/// 规划暂存
///
/// 主区域：最近窗口内修改的星期名文件改为 `{date}{suffix}`，
/// 日期名文件保持原名，其他类型忽略。
///
/// 完整备份区域（存在时）：`fullbackupN[-M]` 改为 `{date}-fullbackupN[-M]`；
/// 已带日期的完整备份只有在 `stage_dated_full` 打开时才暂存。
///
/// 暂存区已有同名文件时跳过，重复运行不会产生重复副本。
pub fn plan_staging(settings: &Settings, now: DateTime<Local>) -> Result<Vec<PlannedTask>> {
    let layout = &settings.layout;
    let window = settings.staging_window();

    let main_files = list_files(&layout.main)?;
    let weekly_files = list_files_if_present(&layout.weekly_full)?;

    let mut candidates = Vec::new();

    let mut main_slots = SlotDates::new(&layout.main);
    for file in main_files.iter().filter(|f| f.is_recent(now, window)) {
        let target_name = match &file.classified.kind {
            FileKind::RotatingWeekday { .. } | FileKind::DatedDaily { .. } => main_slots
                .resolve(&file.classified)
                .and_then(|date| file.classified.dated_name(&date)),
            FileKind::Invalid => continue,
            other => {
                tracing::debug!(file = file.name(), kind = other.label(), "not staged from main area");
                continue;
            }
        };
        candidates.push(Candidate { file, target_name });
    }

    let mut weekly_slots = SlotDates::new(&layout.weekly_full);
    for file in weekly_files.iter().filter(|f| f.is_recent(now, window)) {
        let target_name = match &file.classified.kind {
            FileKind::RotatingFull { .. } => weekly_slots
                .resolve(&file.classified)
                .and_then(|date| file.classified.dated_name(&date)),
            FileKind::DatedFull { .. } if settings.stage_dated_full => weekly_slots
                .resolve(&file.classified)
                .and_then(|date| file.classified.dated_name(&date)),
            FileKind::Invalid => continue,
            other => {
                tracing::debug!(file = file.name(), kind = other.label(), "not staged from weekly-full area");
                continue;
            }
        };
        candidates.push(Candidate { file, target_name });
    }

    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let tasks = candidates
        .into_iter()
        .map(|c| {
            let task = FileTask::new(c.file.name(), c.file.path.clone());
            let action = match c.target_name {
                None => LifecycleAction::Skip(SkipReason::UnresolvedDate),
                Some(name) => {
                    let to = layout.staging.join(name);
                    if to.exists() || !claimed.insert(to.clone()) {
                        LifecycleAction::Skip(SkipReason::DestinationExists(to))
                    } else {
                        LifecycleAction::Stage { to }
                    }
                }
            };
            (task, action)
        })
        .collect();

    Ok(tasks)
}
