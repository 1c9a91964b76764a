use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 搜索分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// 全文 + 标签
    FullText,
    /// 保留分类，暂不产生查询
    Files,
    Folders,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FullText => "full-text",
            Self::Files => "files",
            Self::Folders => "folders",
        }
    }
}

/// 后端返回的原始结果行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRow {
    /// SPARQL 表格行
    Tabular {
        urn: String,
        uri: String,
        title: Option<String>,
        parent_uri: Option<String>,
        last_modified: Option<String>,
    },
    /// tracker-search 输出中的一行，已去掉命中计数
    LineMode { location: String },
}

impl RawRow {
    /// 行对应的资源位置（URI 或路径）
    pub fn location(&self) -> &str {
        match self {
            Self::Tabular { uri, .. } => uri,
            Self::LineMode { location } => location,
        }
    }
}

/// 规范化后的搜索结果，交给界面层展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: String,
    pub name: String,
    pub filename: String,
    pub absolute_path: PathBuf,
    pub pretty_path: String,
    pub last_modified: Option<String>,
    pub content_type: String,
}

impl ResultRecord {
    pub fn is_dir(&self) -> bool {
        self.content_type == crate::config::DIRECTORY_CONTENT_TYPE
    }

    /// 解析 RFC 3339 时间戳，失败时返回 None
    pub fn modified_at(&self) -> Option<chrono::DateTime<chrono::Local>> {
        let raw = self.last_modified.as_deref()?;
        chrono::DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&chrono::Local))
    }
}
