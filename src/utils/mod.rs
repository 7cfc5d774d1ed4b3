//! 工具函数模块
//!
//! 提供时间戳、消息 ID 生成、分页计算等通用工具函数

pub mod helpers;

pub use helpers::ServiceHelper;

use chrono::Utc;
use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// 获取当前时间戳（毫秒）
pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 获取当前 Unix 时间戳（秒）
pub fn current_unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// 生成指定长度的小写 base36 随机串
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// 生成本地消息 ID：`{prefix}_{毫秒时间戳}_{9位随机串}`
///
/// # 示例
/// ```
/// use wachat_core::utils::generate_message_id;
///
/// let id = generate_message_id("msg");
/// assert!(id.starts_with("msg_"));
/// assert_eq!(id.rsplit('_').next().map(str::len), Some(9));
/// ```
pub fn generate_message_id(prefix: &str) -> String {
    format!("{}_{}_{}", prefix, current_millis(), random_base36(9))
}

/// 解析提供方时间戳（字符串形式的 Unix 秒）
///
/// 与整数前缀解析一致：忽略首尾空白，接受 "1700000000" 或 "1700000000.5"
pub fn parse_unix_timestamp(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    let integral = trimmed.split('.').next().unwrap_or(trimmed);
    integral.parse::<i64>().ok()
}

/// 总页数计算（向上取整，limit 为 0 时返回 0）
pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_have_expected_shape() {
        let id = generate_message_id("auto_reply");
        let parts: Vec<&str> = id.rsplitn(3, '_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 9);
        assert!(parts[0].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2], "auto_reply");
    }

    #[test]
    fn ids_are_distinct() {
        assert_ne!(generate_message_id("msg"), generate_message_id("msg"));
    }

    #[test]
    fn unix_timestamps_parse_like_integers() {
        assert_eq!(parse_unix_timestamp("1700000000"), Some(1_700_000_000));
        assert_eq!(parse_unix_timestamp(" 1700000000 "), Some(1_700_000_000));
        assert_eq!(parse_unix_timestamp("1700000000.75"), Some(1_700_000_000));
        assert_eq!(parse_unix_timestamp("abc"), None);
        assert_eq!(parse_unix_timestamp(""), None);
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(50, 50), 1);
        assert_eq!(total_pages(51, 50), 2);
        assert_eq!(total_pages(10, 0), 0);
    }
}
