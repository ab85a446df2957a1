// BkTidy - 保留期清理阶段
// 删除主区域中超过保留期的备份文件，释放磁盘空间

use crate::actions::{FileTask, LifecycleAction, PlannedTask};
use crate::config::Settings;
use crate::scanner::list_files;
use anyhow::Result;
use chrono::{DateTime, Local};

/// 规划清理
///
/// 只看主区域（不递归）中修改时间早于 `retention_days` 的文件：
/// - 带 `-eom` 保护标记的文件永远不删除
/// - 无法分类的文件永远不删除
/// - 其余文件直接删除，没有确认和恢复
pub fn plan_retention(settings: &Settings, now: DateTime<Local>) -> Result<Vec<PlannedTask>> {
    let age = settings.retention_age();
    let files = list_files(&settings.layout.main)?;

    let tasks = files
        .iter()
        .filter(|f| f.is_older_than(now, age))
        .filter(|f| {
            if f.classified.protected {
                tracing::debug!(file = f.name(), "protected end-of-month file kept");
                return false;
            }
            f.classified.is_valid()
        })
        .map(|f| (FileTask::new(f.name(), f.path.clone()), LifecycleAction::Delete))
        .collect();

    Ok(tasks)
}
