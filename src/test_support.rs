// BkTidy - 测试辅助函数

use chrono::{DateTime, Duration, Local};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};

/// 写入文件并把修改时间设为 `at`
pub fn touch_at(dir: &Path, name: &str, at: DateTime<Local>) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, format!("contents of {name}")).unwrap();
    let ft = FileTime::from_unix_time(at.timestamp(), 0);
    filetime::set_file_mtime(&path, ft).unwrap();
    path
}

/// 写入一个 `days` 天前修改的文件
pub fn touch_days_ago(dir: &Path, name: &str, now: DateTime<Local>, days: i64) -> PathBuf {
    touch_at(dir, name, now - Duration::days(days))
}

/// 目录中的文件名（排序）
pub fn names_in(dir: &Path) -> Vec<String> {
    if !dir.is_dir() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
