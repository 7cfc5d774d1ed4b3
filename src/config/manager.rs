//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 获取当前运行环境
//! - 加载环境特定配置
//! - 读取环境变量覆盖值

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use toml::Value;

use super::merge_value;

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取当前环境名称
    ///
    /// 从环境变量 WACHAT_ENV 获取当前环境名称，
    /// 如果未设置则默认为 "development"
    pub fn get_environment() -> String {
        env::var("WACHAT_ENV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "development".to_string())
    }

    /// 加载工作目录下的 `.env` 文件（不存在时忽略）
    pub fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to load .env file");
            }
        }
    }

    /// 根据环境合并特定配置
    ///
    /// 加载 `{root}/environments/{environment}.toml` 文件中的配置，
    /// 并将其合并到基础配置中
    pub fn apply_environment_overlay(
        base: &mut Value,
        root: &Path,
        environment: &str,
    ) -> Result<()> {
        let env_config_path = root
            .join("environments")
            .join(format!("{}.toml", environment));

        if !env_config_path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&env_config_path).with_context(|| {
            format!(
                "unable to read environment config: {}",
                env_config_path.display()
            )
        })?;
        let overlay: Value = toml::from_str(&content).with_context(|| {
            format!(
                "invalid environment config format: {}",
                env_config_path.display()
            )
        })?;

        merge_value(base, overlay);
        Ok(())
    }

    /// 读取非空字符串环境变量
    pub fn env_string(key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// 读取并解析环境变量，解析失败时忽略
    pub fn env_parse<T: FromStr>(key: &str) -> Option<T> {
        Self::env_string(key).and_then(|value| value.parse::<T>().ok())
    }

    /// 读取布尔环境变量（true/1/yes/on 视为真）
    pub fn env_bool(key: &str) -> Option<bool> {
        Self::env_string(key).map(|value| parse_flag(&value))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(parse_flag("on"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("maybe"));
    }

    #[test]
    fn missing_overlay_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut base: Value = toml::from_str("[server]\nport = 1\n").unwrap();
        ConfigManager::apply_environment_overlay(&mut base, dir.path(), "staging").unwrap();
        assert_eq!(base["server"]["port"].as_integer(), Some(1));
    }
}
