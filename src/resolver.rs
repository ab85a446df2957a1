// BkTidy - 日期解析模块
// 根据文件名或文件系统修改时间确定备份文件的日历日期

use crate::classify::{Classified, FileKind};
use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 日期在文件名和远程键中的格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 读取文件的修改时间（本地时区）
pub fn modified_local(path: &Path) -> Result<DateTime<Local>> {
    let meta = fs::metadata(path).with_context(|| format!("Failed to stat {:?}", path))?;
    let mtime = meta
        .modified()
        .with_context(|| format!("Modification time unavailable for {:?}", path))?;
    Ok(DateTime::<Local>::from(mtime))
}

/// 文件修改时间对应的本地日历日期
pub fn modified_date(path: &Path) -> Result<NaiveDate> {
    Ok(modified_local(path)?.date_naive())
}

/// 解析槽位日期
///
/// 同一槽位的所有文件（`monday`、`monday-1`、`monday-2`……）共享
/// 不带后缀的基准文件的修改日期，因为它们的保留时钟是一起开始的。
/// 后缀文件自己的时间戳不参与计算。
///
/// 基准文件不存在或无法读取时返回 `None`，调用方应跳过本次处理。
///
/// # 参数
/// * `dir` - 槽位所在目录
/// * `base_name` - 基准文件名，如 `monday` 或 `fullbackup2`
pub fn resolve_slot_date(dir: &Path, base_name: &str) -> Option<NaiveDate> {
    let base = dir.join(base_name);
    if !base.is_file() {
        tracing::debug!(slot = base_name, "slot base file missing, date unresolved");
        return None;
    }

    match modified_date(&base) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(slot = base_name, error = %e, "cannot read slot base file");
            None
        }
    }
}

/// 目录内槽位日期缓存
///
/// 同一阶段内每个槽位只解析一次，所有同槽文件使用同一个结果。
#[derive(Debug)]
pub struct SlotDates<'a> {
    dir: &'a Path,
    cache: HashMap<String, Option<NaiveDate>>,
}

impl<'a> SlotDates<'a> {
    pub fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            cache: HashMap::new(),
        }
    }

    /// 槽位基准文件的日期，见 [`resolve_slot_date`]
    pub fn get(&mut self, base_name: &str) -> Option<NaiveDate> {
        if let Some(date) = self.cache.get(base_name) {
            return *date;
        }
        let date = resolve_slot_date(self.dir, base_name);
        self.cache.insert(base_name.to_string(), date);
        date
    }

    /// 解析文件的规范日期（`YYYY-MM-DD`）
    ///
    /// - 日期名：直接使用文件名中的日期，不访问文件系统
    /// - 轮换名：使用所在目录中槽位基准文件的修改日期
    /// - 无效文件或槽位无法解析：返回 `None`
    pub fn resolve(&mut self, file: &Classified) -> Option<String> {
        match &file.kind {
            FileKind::DatedDaily { date, .. } | FileKind::DatedFull { date, .. } => Some(date.clone()),
            FileKind::RotatingWeekday { .. } | FileKind::RotatingFull { .. } => {
                let base = file.kind.slot_base_name()?;
                self.get(&base).map(|d| d.format(DATE_FORMAT).to_string())
            }
            FileKind::Invalid => None,
        }
    }
}

/// 单个文件的规范日期，不缓存，见 [`SlotDates::resolve`]
pub fn resolve(dir: &Path, file: &Classified) -> Option<String> {
    SlotDates::new(dir).resolve(file)
}

/// 日期在本地时区的零点
///
/// 夏令时切换导致零点不存在时，取当天第一个有效时刻。
pub fn start_of_day(date: NaiveDate) -> DateTime<Local> {
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt,
        None => Local
            .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&midnight)),
    }
}
