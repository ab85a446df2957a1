// BkTidy - 工具函数模块
// 提供报告输出用的格式化辅助函数

/// 格式化字节数为人类可读的单位
///
/// # 示例
/// ```
/// use bktidy::utils::format_bytes;
///
/// assert_eq!(format_bytes(500), "500 B");
/// assert_eq!(format_bytes(1024), "1.00 KB");
/// assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// 格式化时长为 "Xh Ym Zs"、"Xm Ys" 或 "Xs"
///
/// 不足一秒的运行按毫秒显示。
pub fn format_duration(elapsed: std::time::Duration) -> String {
    let secs = elapsed.as_secs();
    match (secs / 3600, (secs % 3600) / 60, secs % 60) {
        (0, 0, 0) => format!("{}ms", elapsed.as_millis()),
        (0, 0, s) => format!("{}s", s),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, m, s) => format!("{}h {}m {}s", h, m, s),
    }
}
