// BkTidy - 上传阶段
// 把暂存区中的文件按 `{category}/{date}/{filename}` 移动到远程存储

use crate::actions::{FileTask, LifecycleAction, PlannedTask, SkipReason};
use crate::classify::date_prefix;
use crate::config::Settings;
use crate::remote::{MoveRequest, RemoteCategory};
use crate::resolver::DATE_FORMAT;
use crate::scanner::list_files_if_present;
use anyhow::Result;

/// 规划上传
///
/// 暂存区中的所有文件都会处理，不看修改时间：
/// - 日期取文件名开头的 `YYYY-MM-DD`，没有时退回修改日期
/// - 带日期的完整备份归入 `WeeklyFull`，其余归入 `Daily`
/// - 无法分类的文件（例如中断留下的 `.partial`）跳过并报告
pub fn plan_uploads(settings: &Settings) -> Result<Vec<PlannedTask>> {
    let files = list_files_if_present(&settings.layout.staging)?;

    let tasks = files
        .into_iter()
        .map(|file| {
            let task = FileTask::new(file.name(), file.path.clone());
            if !file.classified.is_valid() {
                tracing::warn!(file = file.name(), "unexpected file in staging area");
                return (task, LifecycleAction::Skip(SkipReason::InvalidName));
            }

            let date = match date_prefix(file.name()) {
                Some(date) => date.to_string(),
                None => file.modified.date_naive().format(DATE_FORMAT).to_string(),
            };

            let request = MoveRequest {
                local_path: file.path.clone(),
                category: RemoteCategory::for_kind(&file.classified.kind),
                date,
                filename: file.name().to_string(),
                tier: settings.remote.tier,
            };
            (task, LifecycleAction::Upload(request))
        })
        .collect();

    Ok(tasks)
}
