// BkTidy - 重命名阶段
// 把已经过期的轮换星期名文件原地改为永久的日期名

use crate::actions::{FileTask, LifecycleAction, PlannedTask, SkipReason};
use crate::classify::{FileKind, Weekday};
use crate::config::Settings;
use crate::resolver::{start_of_day, SlotDates, DATE_FORMAT};
use crate::scanner::{list_files, ScannedFile};
use anyhow::Result;
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::PathBuf;

/// 规划重命名
///
/// 对每个星期槽位：
/// 1. 基准文件（如 `monday`）不存在则跳过整个槽位
/// 2. 槽位日期的零点早于 `now - rename_after_days` 才处理
/// 3. 同槽的所有文件（含后缀和保护标记）改名为 `{date}{suffix}`
///
/// 已是日期名的文件不会再被处理。基准文件排在同槽文件最后，
/// 中途失败时下次运行仍能从基准文件解析出同一日期。
pub fn plan_renames(settings: &Settings, now: DateTime<Local>) -> Result<Vec<PlannedTask>> {
    let main = &settings.layout.main;
    let files = list_files(main)?;
    let Some(cutoff) = settings.rename_cutoff(now) else {
        tracing::debug!(days = settings.rename_after_days, "rename cutoff out of range, nothing is old enough");
        return Ok(Vec::new());
    };
    let mut slots = SlotDates::new(main);
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut tasks = Vec::new();

    for slot in Weekday::ALL {
        let Some(slot_date) = slots.get(slot.as_str()) else {
            continue;
        };

        if start_of_day(slot_date) >= cutoff {
            tracing::debug!(%slot, date = %slot_date, "slot not old enough to rename");
            continue;
        }

        let date = slot_date.format(DATE_FORMAT).to_string();
        let mut members: Vec<&ScannedFile> = files
            .iter()
            .filter(|f| matches!(&f.classified.kind, FileKind::RotatingWeekday { slot: s, .. } if *s == slot))
            .collect();
        members.sort_by_key(|f| f.name() == slot.as_str());

        for file in members {
            let Some(new_name) = file.classified.dated_name(&date) else {
                continue;
            };
            let to = main.join(&new_name);
            let task = FileTask::new(file.name(), file.path.clone());

            if to.exists() || !claimed.insert(to.clone()) {
                tasks.push((task, LifecycleAction::Skip(SkipReason::DestinationExists(to))));
            } else {
                tasks.push((task, LifecycleAction::Rename { to }));
            }
        }
    }

    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{touch_at, touch_days_ago};
    use tempfile::TempDir;

    fn renames(tasks: &[PlannedTask]) -> Vec<(String, String)> {
        tasks
            .iter()
            .filter_map(|(task, action)| match action {
                LifecycleAction::Rename { to } => Some((
                    task.name.clone(),
                    to.file_name().unwrap().to_string_lossy().to_string(),
                )),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_aged_slot_renames_base_and_siblings() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        let base = touch_days_ago(root, "tuesday", now, 10);
        touch_at(root, "tuesday-1", now);
        let settings = Settings::new(root);

        let date = crate::resolver::modified_date(&base)
            .unwrap()
            .format(DATE_FORMAT)
            .to_string();
        let tasks = plan_renames(&settings, now).unwrap();
        assert_eq!(
            renames(&tasks),
            vec![
                ("tuesday-1".to_string(), format!("{date}-1")),
                ("tuesday".to_string(), date.clone()),
            ]
        );
    }

    #[test]
    fn test_fresh_slot_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        touch_at(root, "tuesday", now);
        touch_days_ago(root, "tuesday-1", now, 20);

        let tasks = plan_renames(&Settings::new(root), now).unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_missing_base_skips_slot() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        touch_days_ago(root, "wednesday-1", now, 30);

        assert!(plan_renames(&Settings::new(root), now).unwrap().is_empty());
    }

    #[test]
    fn test_protected_and_invalid_members() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        let base = touch_days_ago(root, "monday", now, 9);
        touch_days_ago(root, "monday-eom", now, 9);
        touch_days_ago(root, "mondayish", now, 9);
        touch_days_ago(root, "2024-01-01", now, 9);

        let date = crate::resolver::modified_date(&base)
            .unwrap()
            .format(DATE_FORMAT)
            .to_string();
        let tasks = plan_renames(&Settings::new(root), now).unwrap();
        let mut got = renames(&tasks);
        got.sort();
        assert_eq!(
            got,
            vec![
                ("monday".to_string(), date.clone()),
                ("monday-eom".to_string(), format!("{date}-eom")),
            ]
        );
    }

    #[test]
    fn test_existing_destination_is_skip() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        let base = touch_days_ago(root, "friday", now, 12);
        let date = crate::resolver::modified_date(&base)
            .unwrap()
            .format(DATE_FORMAT)
            .to_string();
        touch_days_ago(root, &date, now, 12);

        let tasks = plan_renames(&Settings::new(root), now).unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(matches!(
            &tasks[0].1,
            LifecycleAction::Skip(SkipReason::DestinationExists(p)) if p.ends_with(&date)
        ));
    }

    #[test]
    fn test_rename_after_days_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        touch_days_ago(root, "thursday", now, 3);

        let mut settings = Settings::new(root);
        assert!(plan_renames(&settings, now).unwrap().is_empty());

        settings.rename_after_days = 1;
        assert_eq!(renames(&plan_renames(&settings, now).unwrap()).len(), 1);
    }

    #[test]
    fn test_huge_threshold_renames_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        touch_days_ago(root, "saturday", now, 400);

        let mut settings = Settings::new(root);
        settings.rename_after_days = 100_000_000;
        assert!(plan_renames(&settings, now).unwrap().is_empty());
    }
}
