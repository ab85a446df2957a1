// BkTidy - 运行配置模块
// 把配置文件、环境变量和命令行参数合并为一次运行使用的不可变配置

use crate::actions::Phase;
use crate::remote::{AwsCliStore, LocalMirrorStore, RemoteStore, StorageTier};
use crate::store::AppConfig;
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Local};
use std::path::{Path, PathBuf};

/// 完整备份子目录名
pub const WEEKLY_FULL_DIR: &str = "WEEKLYFULL";

/// 上传暂存子目录名
pub const STAGING_DIR: &str = "uploadtoaws";

/// 目录布局
///
/// 只有根目录可以配置，子目录名是固定约定。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// 主区域（轮换和日期化的每日备份）
    pub main: PathBuf,

    /// 完整备份区域
    pub weekly_full: PathBuf,

    /// 暂存区域
    pub staging: PathBuf,
}

impl Layout {
    pub fn new(root: &Path) -> Self {
        let main = path_clean::clean(root);
        Self {
            weekly_full: main.join(WEEKLY_FULL_DIR),
            staging: main.join(STAGING_DIR),
            main,
        }
    }
}

/// 远程存储设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub bucket: Option<String>,
    pub aws_profile: Option<String>,
    pub tier: StorageTier,
    pub aws_program: String,
    pub mirror: Option<PathBuf>,
}

/// 命令行或环境变量提供的覆盖项
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub root: Option<PathBuf>,
    pub retention_days: Option<u32>,
    pub rename_after_days: Option<u32>,
    pub copy_to_s3_days: Option<u32>,
    pub bucket: Option<String>,
    pub aws_profile: Option<String>,
    pub mirror: Option<PathBuf>,
    pub dry_run: bool,
}

/// 一次运行的配置
///
/// 构建后不再修改，显式传给每个阶段。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub layout: Layout,

    /// 超过此天数的文件被删除
    pub retention_days: u32,

    /// 槽位日期超过此天数后重命名
    pub rename_after_days: u32,

    /// 暂存窗口（天）
    pub copy_to_s3_days: u32,

    /// 是否暂存完整备份区域中已带日期的完整备份
    pub stage_dated_full: bool,

    /// 试运行模式（只规划和报告，不修改文件）
    pub dry_run: bool,

    pub remote: RemoteSettings,
}

impl Settings {
    /// 使用默认阈值为指定根目录创建配置
    pub fn new(root: &Path) -> Self {
        Self::from_config(&AppConfig::default(), root)
    }

    /// 合并配置文件和覆盖项
    ///
    /// # 返回
    /// * `Err(anyhow::Error)` - 配置文件和覆盖项都没有提供备份根目录
    pub fn resolve(config: &AppConfig, overrides: SettingsOverrides) -> Result<Self> {
        let root = match overrides.root.as_ref().or(config.root.as_ref()) {
            Some(root) => root.clone(),
            None => bail!("Backup root is not configured (use --root, BKTIDY_ROOT or `bktidy setup`)"),
        };

        let mut settings = Self::from_config(config, &root);
        if let Some(days) = overrides.retention_days {
            settings.retention_days = days;
        }
        if let Some(days) = overrides.rename_after_days {
            settings.rename_after_days = days;
        }
        if let Some(days) = overrides.copy_to_s3_days {
            settings.copy_to_s3_days = days;
        }
        if overrides.bucket.is_some() {
            settings.remote.bucket = overrides.bucket;
        }
        if overrides.aws_profile.is_some() {
            settings.remote.aws_profile = overrides.aws_profile;
        }
        if overrides.mirror.is_some() {
            settings.remote.mirror = overrides.mirror;
        }
        settings.dry_run = overrides.dry_run;
        Ok(settings)
    }

    fn from_config(config: &AppConfig, root: &Path) -> Self {
        Self {
            layout: Layout::new(root),
            retention_days: config.retention_days,
            rename_after_days: config.rename_after_days,
            copy_to_s3_days: config.copy_to_s3_days,
            stage_dated_full: config.stage_dated_full,
            dry_run: false,
            remote: RemoteSettings {
                bucket: config.remote.bucket.clone(),
                aws_profile: config.remote.aws_profile.clone(),
                tier: config.remote.storage_class,
                aws_program: config.remote.aws_program.clone(),
                mirror: config.remote.mirror.clone(),
            },
        }
    }

    /// 重命名截止时刻：`now - rename_after_days`
    ///
    /// 截止时刻超出可表示的日期范围时返回 `None`，此时没有槽位足够旧。
    pub fn rename_cutoff(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        now.checked_sub_signed(Duration::days(i64::from(self.rename_after_days)))
    }

    /// 暂存窗口，以分钟计
    pub fn staging_window(&self) -> Duration {
        Duration::minutes(i64::from(self.copy_to_s3_days) * 24 * 60)
    }

    /// 保留期
    pub fn retention_age(&self) -> Duration {
        Duration::days(i64::from(self.retention_days))
    }

    /// 根据设置创建远程存储
    ///
    /// 配置了镜像目录时使用本地镜像，否则需要 S3 存储桶。
    pub fn build_store(&self) -> Result<Box<dyn RemoteStore>> {
        if let Some(mirror) = &self.remote.mirror {
            return Ok(Box::new(LocalMirrorStore::new(mirror.clone())));
        }
        match &self.remote.bucket {
            Some(bucket) => Ok(Box::new(AwsCliStore::new(
                self.remote.aws_program.clone(),
                bucket.clone(),
                self.remote.aws_profile.clone(),
            ))),
            None => bail!("No remote store configured (set a bucket or --mirror)"),
        }
    }

    /// 为一次运行选择远程存储
    ///
    /// `only` 为空表示完整运行。只有单独运行上传阶段时缺少存储才是错误；
    /// 完整运行缺少存储时上传逐个失败，其余阶段照常执行。
    /// 试运行从不要求存储。
    pub fn store_for(&self, only: Option<Phase>) -> Result<Option<Box<dyn RemoteStore>>> {
        match only {
            Some(Phase::Upload) if !self.dry_run => self.build_store().map(Some),
            Some(Phase::Upload) => Ok(self.build_store().ok()),
            Some(_) => Ok(None),
            None => match self.build_store() {
                Ok(store) => Ok(Some(store)),
                Err(e) => {
                    if !self.dry_run {
                        tracing::warn!(error = %e, "uploads will fail this run");
                    }
                    Ok(None)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_fixed_subdirs() {
        let layout = Layout::new(Path::new("/srv/backups/./daily/"));
        assert_eq!(layout.main, PathBuf::from("/srv/backups/daily"));
        assert_eq!(layout.weekly_full, PathBuf::from("/srv/backups/daily/WEEKLYFULL"));
        assert_eq!(layout.staging, PathBuf::from("/srv/backups/daily/uploadtoaws"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = AppConfig {
            root: Some(PathBuf::from("/from/file")),
            retention_days: 30,
            ..AppConfig::default()
        };
        let overrides = SettingsOverrides {
            root: Some(PathBuf::from("/from/cli")),
            rename_after_days: Some(2),
            dry_run: true,
            ..SettingsOverrides::default()
        };

        let settings = Settings::resolve(&config, overrides).unwrap();
        assert_eq!(settings.layout.main, PathBuf::from("/from/cli"));
        assert_eq!(settings.retention_days, 30);
        assert_eq!(settings.rename_after_days, 2);
        assert_eq!(settings.copy_to_s3_days, 1);
        assert!(settings.dry_run);
    }

    #[test]
    fn test_missing_root_is_error() {
        let result = Settings::resolve(&AppConfig::default(), SettingsOverrides::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_windows_and_cutoffs() {
        let settings = Settings::new(Path::new("/data"));
        assert_eq!(settings.staging_window(), Duration::minutes(1440));
        assert_eq!(settings.retention_age(), Duration::days(8));

        let now = Local::now();
        assert_eq!(now - settings.rename_cutoff(now).unwrap(), Duration::days(6));
    }

    #[test]
    fn test_rename_cutoff_out_of_range() {
        let mut settings = Settings::new(Path::new("/data"));
        settings.rename_after_days = 100_000_000;
        assert_eq!(settings.rename_cutoff(Local::now()), None);

        settings.rename_after_days = u32::MAX;
        assert_eq!(settings.rename_cutoff(Local::now()), None);
    }

    #[test]
    fn test_store_selection() {
        let mut settings = Settings::new(Path::new("/data"));
        assert!(settings.build_store().is_err());

        settings.remote.bucket = Some("bucket".to_string());
        assert_eq!(settings.build_store().unwrap().name(), "s3://bucket");

        settings.remote.mirror = Some(PathBuf::from("/mirror"));
        assert!(settings.build_store().unwrap().name().starts_with("mirror"));
    }

    #[test]
    fn test_missing_store_only_blocks_upload_command() {
        let mut settings = Settings::new(Path::new("/data"));
        assert!(settings.store_for(Some(Phase::Upload)).is_err());
        assert!(settings.store_for(None).unwrap().is_none());
        assert!(settings.store_for(Some(Phase::Rename)).unwrap().is_none());

        settings.dry_run = true;
        assert!(settings.store_for(Some(Phase::Upload)).unwrap().is_none());

        settings.remote.bucket = Some("bucket".to_string());
        assert!(settings.store_for(None).unwrap().is_some());
        assert!(settings.store_for(Some(Phase::Retention)).unwrap().is_none());
    }
}
