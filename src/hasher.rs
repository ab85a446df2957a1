// BkTidy - 文件哈希计算模块
// 使用 XXH3 校验暂存副本与源文件逐字节一致

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

/// 计算文件内容的 XXH3 哈希值
///
/// 使用 1MB 读缓冲和 64KB 哈希块，备份归档通常很大。
pub fn calculate_hash(path: &Path) -> Result<u64> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?} for hashing", path))?;
    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut hasher = Xxh3::new();
    let mut buffer = [0u8; 64 * 1024];

    loop {
        let count = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {:?}", path))?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(hasher.digest())
}

/// 判断两个文件内容是否相同
///
/// 先比较长度，长度相同再比较哈希。
pub fn same_content(a: &Path, b: &Path) -> Result<bool> {
    let len_a = fs::metadata(a).with_context(|| format!("Failed to stat {:?}", a))?.len();
    let len_b = fs::metadata(b).with_context(|| format!("Failed to stat {:?}", b))?.len();
    if len_a != len_b {
        return Ok(false);
    }
    Ok(calculate_hash(a)? == calculate_hash(b)?)
}
