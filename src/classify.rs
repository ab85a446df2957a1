// BkTidy - 文件名分类模块
// 将备份文件名映射为生命周期类型（轮换星期名、日期名、完整备份等）

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// 永久保留标记（月末备份），只豁免清理，不豁免重命名和暂存
pub const PROTECTED_MARKER: &str = "-eom";

/// 轮换星期槽位
///
/// 七个星期名构成一个每周复用的环形缓冲区，每个槽位对应一个
/// 不带后缀的基准文件（如 `monday`）以及若干带数字后缀的同槽文件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// 全部槽位，按一周顺序排列
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// 槽位的文件名（仅小写）
    pub fn as_str(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// 从小写星期名解析槽位，大写或混合大小写不匹配
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.as_str() == name)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文件类型（互斥标签）
///
/// `suffix` 字段保存原样的 `-N` 后缀文本（含连字符），没有后缀时为空串。
/// `date` 字段保存文件名中的 `YYYY-MM-DD` 原文，不做日历合法性校验。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// 星期名，如 `monday` 或 `monday-3`
    RotatingWeekday { slot: Weekday, suffix: String },

    /// 日期名，如 `2024-05-01` 或 `2024-05-01-2`
    DatedDaily { date: String, suffix: String },

    /// 轮换完整备份，如 `fullbackup2` 或 `fullbackup2-1`
    RotatingFull { number: String, suffix: String },

    /// 带日期的完整备份，如 `2024-05-01-fullbackup2`
    DatedFull {
        date: String,
        number: String,
        suffix: String,
    },

    /// 不匹配任何文件名语法，任何阶段都不会处理
    Invalid,
}

impl FileKind {
    /// 轮换文件所属槽位的基准文件名（不带后缀的同级文件）
    ///
    /// 日期名和无效文件没有槽位，返回 `None`。
    pub fn slot_base_name(&self) -> Option<String> {
        match self {
            FileKind::RotatingWeekday { slot, .. } => Some(slot.as_str().to_string()),
            FileKind::RotatingFull { number, .. } => Some(format!("fullbackup{}", number)),
            _ => None,
        }
    }

    /// 简短的类型标签，用于日志和 `classify` 子命令输出
    pub fn label(&self) -> &'static str {
        match self {
            FileKind::RotatingWeekday { .. } => "rotating-weekday",
            FileKind::DatedDaily { .. } => "dated-daily",
            FileKind::RotatingFull { .. } => "rotating-full",
            FileKind::DatedFull { .. } => "dated-full",
            FileKind::Invalid => "invalid",
        }
    }
}

/// 分类结果：文件名、类型和保护标记
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// 原始文件名
    pub name: String,

    /// 文件类型
    pub kind: FileKind,

    /// 是否带有月末保护标记
    pub protected: bool,
}

impl Classified {
    /// 是否为有效的备份文件
    pub fn is_valid(&self) -> bool {
        self.kind != FileKind::Invalid
    }

    /// 计算日期化后的文件名
    ///
    /// - 星期名：`{date}{suffix}`，即用日期替换星期前缀
    /// - 轮换完整备份：`{date}-fullbackup{N}{suffix}`
    /// - 已是日期名：文件名不变
    ///
    /// 保护标记原样保留在末尾。无效文件返回 `None`。
    pub fn dated_name(&self, date: &str) -> Option<String> {
        let marker = if self.protected { PROTECTED_MARKER } else { "" };
        match &self.kind {
            FileKind::RotatingWeekday { suffix, .. } => {
                Some(format!("{}{}{}", date, suffix, marker))
            }
            FileKind::RotatingFull { number, suffix } => Some(format!(
                "{}-fullbackup{}{}{}",
                date, number, suffix, marker
            )),
            FileKind::DatedDaily { .. } | FileKind::DatedFull { .. } => Some(self.name.clone()),
            FileKind::Invalid => None,
        }
    }
}

fn weekday_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(monday|tuesday|wednesday|thursday|friday|saturday|sunday)(-[0-9]+)?$")
            .expect("valid regex")
    })
}

fn dated_daily_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})(-[0-9]+)?$").expect("valid regex")
    })
}

fn rotating_full_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^fullbackup([0-9]+)(-[0-9]+)?$").expect("valid regex"))
}

fn dated_full_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})-fullbackup([0-9]+)(-[0-9]+)?$")
            .expect("valid regex")
    })
}

fn date_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid regex"))
}

/// 对文件名分类
///
/// 先剥离末尾的 `-eom` 保护标记，再依次尝试四种文件名语法。
/// 四种语法互斥，因此尝试顺序不影响结果。
///
/// # 示例
/// ```
/// use bktidy::classify::{classify, FileKind};
///
/// let c = classify("monday-3");
/// assert_eq!(c.kind.label(), "rotating-weekday");
/// assert_eq!(classify("notes.txt").kind, FileKind::Invalid);
/// ```
pub fn classify(name: &str) -> Classified {
    let (core, protected) = match name.strip_suffix(PROTECTED_MARKER) {
        Some(core) => (core, true),
        None => (name, false),
    };

    Classified {
        name: name.to_string(),
        kind: classify_core(core),
        protected,
    }
}

fn suffix_of(m: Option<regex::Match<'_>>) -> String {
    m.map(|m| m.as_str().to_string()).unwrap_or_default()
}

fn classify_core(core: &str) -> FileKind {
    if let Some(caps) = weekday_re().captures(core) {
        if let Some(slot) = Weekday::from_name(&caps[1]) {
            return FileKind::RotatingWeekday {
                slot,
                suffix: suffix_of(caps.get(2)),
            };
        }
    }

    if let Some(caps) = dated_daily_re().captures(core) {
        return FileKind::DatedDaily {
            date: caps[1].to_string(),
            suffix: suffix_of(caps.get(2)),
        };
    }

    if let Some(caps) = rotating_full_re().captures(core) {
        return FileKind::RotatingFull {
            number: caps[1].to_string(),
            suffix: suffix_of(caps.get(2)),
        };
    }

    if let Some(caps) = dated_full_re().captures(core) {
        return FileKind::DatedFull {
            date: caps[1].to_string(),
            number: caps[2].to_string(),
            suffix: suffix_of(caps.get(3)),
        };
    }

    FileKind::Invalid
}

/// 取文件名开头的 `YYYY-MM-DD` 原文（上传阶段用作远程日期）
pub fn date_prefix(name: &str) -> Option<&str> {
    date_prefix_re().find(name).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_with_suffix() {
        let c = classify("monday-3");
        assert_eq!(
            c.kind,
            FileKind::RotatingWeekday {
                slot: Weekday::Monday,
                suffix: "-3".to_string()
            }
        );
        assert!(!c.protected);
    }

    #[test]
    fn test_all_weekdays_lowercase_only() {
        for slot in Weekday::ALL {
            assert_eq!(classify(slot.as_str()).kind.label(), "rotating-weekday");
        }
        assert_eq!(classify("Monday").kind, FileKind::Invalid);
        assert_eq!(classify("MONDAY-1").kind, FileKind::Invalid);
    }

    #[test]
    fn test_dated_daily() {
        assert_eq!(
            classify("2024-05-01").kind,
            FileKind::DatedDaily {
                date: "2024-05-01".to_string(),
                suffix: String::new()
            }
        );
        assert_eq!(
            classify("2024-05-01-12").kind,
            FileKind::DatedDaily {
                date: "2024-05-01".to_string(),
                suffix: "-12".to_string()
            }
        );
    }

    #[test]
    fn test_rotating_full() {
        assert_eq!(
            classify("fullbackup2-1").kind,
            FileKind::RotatingFull {
                number: "2".to_string(),
                suffix: "-1".to_string()
            }
        );
        assert_eq!(classify("fullbackup").kind, FileKind::Invalid);
    }

    #[test]
    fn test_dated_full() {
        assert_eq!(
            classify("2024-05-01-fullbackup2").kind,
            FileKind::DatedFull {
                date: "2024-05-01".to_string(),
                number: "2".to_string(),
                suffix: String::new()
            }
        );
        assert_eq!(classify("2024-05-01-fullbackup2-4").kind.label(), "dated-full");
    }

    #[test]
    fn test_invalid_names() {
        for name in [
            "notes.txt",
            "",
            "mondayx",
            "monday-",
            "monday-a",
            "2024-5-01",
            "2024-05-01.tar",
            "fullbackup2-",
            "2024-05-01-fullbackup",
            "2024-05-01.partial",
            "-eom",
        ] {
            assert_eq!(classify(name).kind, FileKind::Invalid, "{name}");
        }
    }

    #[test]
    fn test_protected_marker() {
        let c = classify("monday-eom");
        assert!(c.protected);
        assert_eq!(c.kind.label(), "rotating-weekday");

        let c = classify("2024-05-01-2-eom");
        assert!(c.protected);
        assert_eq!(c.kind.label(), "dated-daily");

        // 标记本身不会让无效文件名变为有效
        let c = classify("notes-eom");
        assert!(c.protected);
        assert!(!c.is_valid());
    }

    #[test]
    fn test_dated_name() {
        assert_eq!(
            classify("tuesday").dated_name("2024-05-07").as_deref(),
            Some("2024-05-07")
        );
        assert_eq!(
            classify("tuesday-1").dated_name("2024-05-07").as_deref(),
            Some("2024-05-07-1")
        );
        assert_eq!(
            classify("monday-2-eom").dated_name("2024-05-06").as_deref(),
            Some("2024-05-06-2-eom")
        );
        assert_eq!(
            classify("fullbackup3-1").dated_name("2024-05-05").as_deref(),
            Some("2024-05-05-fullbackup3-1")
        );
        assert_eq!(
            classify("2024-05-01").dated_name("1999-01-01").as_deref(),
            Some("2024-05-01")
        );
        assert_eq!(classify("notes.txt").dated_name("2024-05-01"), None);
    }

    #[test]
    fn test_slot_base_name() {
        assert_eq!(classify("friday-9").kind.slot_base_name().as_deref(), Some("friday"));
        assert_eq!(
            classify("fullbackup12-3").kind.slot_base_name().as_deref(),
            Some("fullbackup12")
        );
        assert_eq!(classify("2024-05-01").kind.slot_base_name(), None);
    }

    #[test]
    fn test_date_prefix() {
        assert_eq!(date_prefix("2024-05-01-fullbackup2"), Some("2024-05-01"));
        assert_eq!(date_prefix("2024-05-01"), Some("2024-05-01"));
        assert_eq!(date_prefix("monday"), None);
    }
}
