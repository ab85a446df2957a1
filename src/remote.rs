// BkTidy - 远程存储模块
// 定义“将本地文件移动到远程存储”的协作接口及其实现

use crate::classify::FileKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// 远程分类（远程键的第一级）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCategory {
    Daily,
    WeeklyFull,
}

impl RemoteCategory {
    /// 带日期的完整备份归入 `WeeklyFull`，其余归入 `Daily`
    pub fn for_kind(kind: &FileKind) -> Self {
        match kind {
            FileKind::DatedFull { .. } => RemoteCategory::WeeklyFull,
            _ => RemoteCategory::Daily,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteCategory::Daily => "Daily",
            RemoteCategory::WeeklyFull => "WeeklyFull",
        }
    }
}

impl fmt::Display for RemoteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 存储层级提示，序列化为 S3 storage class 字符串
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageTier {
    Standard,
    /// 低频访问（默认）
    #[default]
    StandardIa,
    OnezoneIa,
    Glacier,
}

impl StorageTier {
    pub fn as_s3_class(self) -> &'static str {
        match self {
            StorageTier::Standard => "STANDARD",
            StorageTier::StandardIa => "STANDARD_IA",
            StorageTier::OnezoneIa => "ONEZONE_IA",
            StorageTier::Glacier => "GLACIER",
        }
    }
}

/// 一次远程移动请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    /// 本地暂存文件
    pub local_path: PathBuf,
    pub category: RemoteCategory,
    /// `YYYY-MM-DD`
    pub date: String,
    pub filename: String,
    pub tier: StorageTier,
}

impl MoveRequest {
    /// 远程键：`{category}/{date}/{filename}`
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.category, self.date, self.filename)
    }
}

/// 远程传输错误
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 无法启动上传程序
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// 上传程序返回失败
    #[error("remote store rejected {key} (exit status {status:?}): {stderr}")]
    Rejected {
        key: String,
        status: Option<i32>,
        stderr: String,
    },

    /// 本地镜像写入失败
    #[error("mirror write to {path:?} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 远程存储协作者
///
/// 实现可以是“移动”语义（成功后本地文件已不存在），也可以只复制；
/// 上传阶段在确认成功后会删除仍然存在的本地文件。
pub trait RemoteStore {
    /// 用于日志的名称
    fn name(&self) -> String;

    /// 将本地文件传到远程 `request.key()` 位置
    fn move_file(&self, request: &MoveRequest) -> Result<(), RemoteError>;
}

/// 通过 `aws s3 mv` 命令行上传到 S3
#[derive(Debug, Clone)]
pub struct AwsCliStore {
    /// 可执行程序，通常为 `aws`
    pub program: String,
    pub bucket: String,
    /// 凭证配置名（`--profile`）
    pub profile: Option<String>,
}

impl AwsCliStore {
    pub fn new(program: impl Into<String>, bucket: impl Into<String>, profile: Option<String>) -> Self {
        Self {
            program: program.into(),
            bucket: bucket.into(),
            profile,
        }
    }

    /// 构造命令行参数（不含程序名）
    pub fn args(&self, request: &MoveRequest) -> Vec<String> {
        let mut args = vec![
            "s3".to_string(),
            "mv".to_string(),
            request.local_path.to_string_lossy().to_string(),
            format!("s3://{}/{}", self.bucket, request.key()),
            "--storage-class".to_string(),
            request.tier.as_s3_class().to_string(),
            "--only-show-errors".to_string(),
        ];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args
    }
}

impl RemoteStore for AwsCliStore {
    fn name(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    fn move_file(&self, request: &MoveRequest) -> Result<(), RemoteError> {
        let output = Command::new(&self.program)
            .args(self.args(request))
            .output()
            .map_err(|source| RemoteError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(RemoteError::Rejected {
                key: request.key(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// 本地目录镜像，按远程键布局复制文件（仅复制，不删除源文件）
#[derive(Debug, Clone)]
pub struct LocalMirrorStore {
    root: PathBuf,
}

impl LocalMirrorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 请求对应的镜像路径
    pub fn target_path(&self, request: &MoveRequest) -> PathBuf {
        self.root
            .join(request.category.as_str())
            .join(&request.date)
            .join(&request.filename)
    }
}

impl RemoteStore for LocalMirrorStore {
    fn name(&self) -> String {
        format!("mirror {:?}", self.root)
    }

    fn move_file(&self, request: &MoveRequest) -> Result<(), RemoteError> {
        let target = self.target_path(request);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| RemoteError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::copy(&request.local_path, &target).map_err(|source| RemoteError::Io {
            path: target.clone(),
            source,
        })?;
        Ok(())
    }
}
