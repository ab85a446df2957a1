// BkTidy - 备份归档生命周期管理工具
// 模块声明文件

/// 生命周期动作和统计数据
pub mod actions;

/// 文件名分类模块
pub mod classify;

/// 交互式配置向导
pub mod cli;

/// 运行配置模块
pub mod config;

/// 生命周期执行器模块
pub mod executor;

/// 文件哈希计算模块
pub mod hasher;

/// 保留期清理阶段
pub mod prune;

/// 远程存储模块
pub mod remote;

/// 重命名阶段
pub mod rename;

/// 日期解析模块
pub mod resolver;

/// 目录扫描模块
pub mod scanner;

/// 暂存阶段
pub mod stage;

/// 配置文件存储模块
pub mod store;

/// 上传阶段
pub mod upload;

/// 工具函数模块
pub mod utils;

#[cfg(test)]
mod test_support;
