// BkTidy - 目录扫描模块
// 非递归列出备份目录中的文件并提供基于修改时间的筛选

use crate::classify::{classify, Classified};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 目录中的一个普通文件
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// 完整路径
    pub path: PathBuf,

    /// 分类结果（含文件名）
    pub classified: Classified,

    /// 修改时间（本地时区）
    pub modified: DateTime<Local>,
}

impl ScannedFile {
    pub fn name(&self) -> &str {
        &self.classified.name
    }

    /// 修改时间距 `now` 的时长，未来时间戳视为 0
    pub fn age(&self, now: DateTime<Local>) -> Duration {
        let age = now - self.modified;
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }

    /// 在最近 `window` 内修改过（严格小于）
    pub fn is_recent(&self, now: DateTime<Local>, window: Duration) -> bool {
        self.age(now) < window
    }

    /// 修改时间早于 `age` 之前（严格大于）
    pub fn is_older_than(&self, now: DateTime<Local>, age: Duration) -> bool {
        self.age(now) > age
    }
}

/// 列出目录中的所有普通文件（不递归，不跟随符号链接）
///
/// 子目录、符号链接和非 UTF-8 文件名会被忽略；单个条目读取失败只记录警告。
/// 结果按文件名排序，保证各阶段处理顺序稳定。
///
/// # 返回
/// * `Ok(Vec<ScannedFile>)` - 目录中的文件
/// * `Err(anyhow::Error)` - 目录本身无法读取
pub fn list_files(dir: &Path) -> Result<Vec<ScannedFile>> {
    if !dir.is_dir() {
        anyhow::bail!("Backup directory does not exist: {:?}", dir);
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                if err.depth() == 0 {
                    return Err(err).with_context(|| format!("Cannot read directory {:?}", dir));
                }
                tracing::warn!(path = ?err.path(), error = %err, "cannot access entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::debug!(path = ?entry.path(), "skipping non UTF-8 file name");
            continue;
        };

        let modified = match entry.metadata().map_err(anyhow::Error::from).and_then(|m| {
            m.modified().context("modification time unavailable")
        }) {
            Ok(t) => DateTime::<Local>::from(t),
            Err(e) => {
                tracing::warn!(path = ?entry.path(), error = %e, "cannot read modification time");
                continue;
            }
        };

        files.push(ScannedFile {
            path: entry.path().to_path_buf(),
            classified: classify(name),
            modified,
        });
    }

    Ok(files)
}

/// 同 [`list_files`]，但目录不存在时返回空列表
pub fn list_files_if_present(dir: &Path) -> Result<Vec<ScannedFile>> {
    if dir.is_dir() {
        list_files(dir)
    } else {
        Ok(Vec::new())
    }
}
