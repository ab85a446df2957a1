// BkTidy - 配置文件存储模块
// 负责管理用户配置文件的加载和保存

use crate::remote::StorageTier;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 默认保留天数
pub const DEFAULT_RETENTION_DAYS: u32 = 8;

/// 默认重命名天数
pub const DEFAULT_RENAME_AFTER_DAYS: u32 = 6;

/// 默认暂存窗口天数
pub const DEFAULT_COPY_DAYS: u32 = 1;

/// 远程存储配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteProfile {
    /// S3 存储桶名称
    pub bucket: Option<String>,

    /// AWS 凭证配置名
    pub aws_profile: Option<String>,

    /// 存储层级
    pub storage_class: StorageTier,

    /// 上传程序
    pub aws_program: String,

    /// 本地镜像目录，设置后替代 S3
    pub mirror: Option<PathBuf>,
}

impl Default for RemoteProfile {
    fn default() -> Self {
        Self {
            bucket: None,
            aws_profile: None,
            storage_class: StorageTier::default(),
            aws_program: "aws".to_string(),
            mirror: None,
        }
    }
}

/// 应用程序配置文件
///
/// 存储在系统标准配置目录中，所有字段都有默认值，
/// 缺失的字段按默认值处理。
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// 备份根目录（主区域）
    pub root: Option<PathBuf>,

    /// 超过此天数的文件会被删除
    pub retention_days: u32,

    /// 槽位日期超过此天数后重命名为日期名
    pub rename_after_days: u32,

    /// 最近多少天内修改的文件会被暂存
    pub copy_to_s3_days: u32,

    /// 是否暂存完整备份目录中已带日期的完整备份
    pub stage_dated_full: bool,

    /// 远程存储
    pub remote: RemoteProfile,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: None,
            retention_days: DEFAULT_RETENTION_DAYS,
            rename_after_days: DEFAULT_RENAME_AFTER_DAYS,
            copy_to_s3_days: DEFAULT_COPY_DAYS,
            stage_dated_full: false,
            remote: RemoteProfile::default(),
        }
    }
}

impl AppConfig {
    /// 从默认位置加载配置
    ///
    /// # 返回
    /// * `Ok(AppConfig)` - 加载的配置，如果文件不存在则返回默认配置
    /// * `Err(anyhow::Error)` - 如果配置文件存在但解析失败
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// 从指定文件加载配置，文件不存在时返回默认配置
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// 保存配置到指定文件，自动创建上级目录
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).context("Failed to write config file")
    }

    /// 获取配置文件的默认路径
    ///
    /// - Windows: `C:\Users\<用户>\AppData\Roaming\bktidy\config.toml`
    /// - macOS: `~/Library/Application Support/bktidy/config.toml`
    /// - Linux: `~/.config/bktidy/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "bktidy").context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
