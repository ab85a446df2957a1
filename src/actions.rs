// BkTidy - 生命周期动作定义
// 定义各阶段对文件执行的操作类型以及统计数据结构

use crate::remote::MoveRequest;
use std::fmt;
use std::path::PathBuf;

/// 生命周期阶段，按固定顺序执行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 轮换名 → 日期名（原地重命名）
    Rename,
    /// 近期文件复制到暂存区
    Stage,
    /// 暂存区文件移动到远程存储
    Upload,
    /// 删除超过保留期的文件
    Retention,
}

impl Phase {
    /// 一次运行中的执行顺序
    pub const ORDER: [Phase; 4] = [Phase::Rename, Phase::Stage, Phase::Upload, Phase::Retention];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Rename => "rename",
            Phase::Stage => "stage",
            Phase::Upload => "upload",
            Phase::Retention => "retention",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 跳过原因（会被报告，但不是错误）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 目标文件已存在（重复运行或命名冲突）
    DestinationExists(PathBuf),

    /// 槽位基准文件缺失或无法读取，下次运行再试
    UnresolvedDate,

    /// 暂存区中出现无法分类的文件
    InvalidName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DestinationExists(p) => write!(f, "destination exists: {:?}", p),
            SkipReason::UnresolvedDate => f.write_str("slot date unresolved"),
            SkipReason::InvalidName => f.write_str("name matches no backup pattern"),
        }
    }
}

/// 生命周期动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    /// 原地重命名为日期名，保留修改时间
    Rename { to: PathBuf },

    /// 复制到暂存区的目标路径
    Stage { to: PathBuf },

    /// 移动到远程存储
    Upload(MoveRequest),

    /// 删除文件
    Delete,

    /// 跳过并报告
    Skip(SkipReason),
}

/// 单个文件任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// 文件名（用于报告）
    pub name: String,

    /// 文件完整路径
    pub path: PathBuf,
}

impl FileTask {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// 已规划的任务：文件 + 动作
pub type PlannedTask = (FileTask, LifecycleAction);

/// 单个阶段的统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PhaseStats {
    /// 重命名的文件数量
    pub renamed: u64,

    /// 复制到暂存区的文件数量
    pub staged: u64,

    /// 上传成功的文件数量
    pub uploaded: u64,

    /// 删除的文件数量
    pub deleted: u64,

    /// 跳过的文件数量
    pub skipped: u64,

    /// 失败的文件数量
    pub failed: u64,

    /// 复制的总字节数
    pub bytes: u64,
}

impl PhaseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 实际完成的操作数
    pub fn completed(&self) -> u64 {
        self.renamed + self.staged + self.uploaded + self.deleted
    }

    fn absorb(&mut self, other: &PhaseStats) {
        self.renamed += other.renamed;
        self.staged += other.staged;
        self.uploaded += other.uploaded;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.bytes += other.bytes;
    }
}

/// 一次运行的汇总
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub phases: Vec<(Phase, PhaseStats)>,
}

impl RunSummary {
    pub fn push(&mut self, phase: Phase, stats: PhaseStats) {
        self.phases.push((phase, stats));
    }

    pub fn get(&self, phase: Phase) -> Option<&PhaseStats> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, s)| s)
    }

    /// 所有阶段合计
    pub fn totals(&self) -> PhaseStats {
        let mut total = PhaseStats::new();
        for (_, stats) in &self.phases {
            total.absorb(stats);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals() {
        let mut summary = RunSummary::default();
        summary.push(
            Phase::Rename,
            PhaseStats {
                renamed: 2,
                skipped: 1,
                ..PhaseStats::default()
            },
        );
        summary.push(
            Phase::Retention,
            PhaseStats {
                deleted: 3,
                failed: 1,
                ..PhaseStats::default()
            },
        );

        let total = summary.totals();
        assert_eq!(total.completed(), 5);
        assert_eq!(total.skipped, 1);
        assert_eq!(total.failed, 1);
        assert_eq!(summary.get(Phase::Retention).unwrap().deleted, 3);
        assert!(summary.get(Phase::Upload).is_none());
    }
}
