use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// 搜索结果最大数量（结果面板只能显示这么多）
pub const MAX_RESULTS: usize = 15;

/// 首个关键词的最小字符数，过短的查询代价大且噪音多
pub const MIN_TERM_CHARS: usize = 3;

/// 后端查询超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// 无法识别类型时的兜底类型，保证界面仍能挑出图标
pub const FALLBACK_CONTENT_TYPE: &str = "text/x-log";

pub const DIRECTORY_CONTENT_TYPE: &str = "inode/directory";

/// 通用的“未知二进制”类型
pub const UNKNOWN_CONTENT_TYPE: &str = "application/octet-stream";

/// Tracker 3 SPARQL 命令行
pub const DEFAULT_SPARQL_COMMAND: &str =
    "tracker3 sparql --dbus-service org.freedesktop.Tracker3.Miner.Files --query";

/// 旧版行输出搜索命令
pub const DEFAULT_LINE_COMMAND: &str = "tracker-search -f";

/// 查询后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// SPARQL 查询，表格输出
    Sparql,
    /// 旧版 tracker-search，逐行输出
    LineMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub max_results: usize,
    pub timeout_secs: u64,
    /// 全文搜索时排除目录命中，避免与“目录”分类重复
    pub exclude_folders: bool,
    pub backend: Backend,
    pub sparql_command: String,
    pub line_command: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            exclude_folders: true,
            backend: Backend::Sparql,
            sparql_command: DEFAULT_SPARQL_COMMAND.to_string(),
            line_command: DEFAULT_LINE_COMMAND.to_string(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 读取配置文件；文件不存在时使用默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置失败: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("解析配置失败: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 || self.max_results > 100 {
            bail!("max_results 超出范围 (1..=100): {}", self.max_results);
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs 必须大于 0");
        }
        for (name, command) in [
            ("sparql_command", &self.sparql_command),
            ("line_command", &self.line_command),
        ] {
            let parts = shell_words::split(command)
                .with_context(|| format!("{} 无法解析: {}", name, command))?;
            if parts.is_empty() {
                bail!("{} 不能为空", name);
            }
        }
        Ok(())
    }
}

/// 默认配置文件位置
pub fn config_path() -> PathBuf {
    let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("trackersearch");
    p.push("config.json");
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SearchConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, SearchConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_results": 12, "backend": "line_mode"}"#).unwrap();

        let config = SearchConfig::load(&path).unwrap();
        assert_eq!(config.max_results, 12);
        assert_eq!(config.backend, Backend::LineMode);
        assert!(config.exclude_folders);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = SearchConfig { max_results: 0, ..SearchConfig::default() };
        assert!(config.validate().is_err());
        config.max_results = 101;
        assert!(config.validate().is_err());
        config.max_results = 20;
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_command() {
        let config = SearchConfig { line_command: "   ".to_string(), ..SearchConfig::default() };
        assert!(config.validate().is_err());
    }
}
