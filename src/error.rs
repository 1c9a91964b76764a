use crate::types::Category;

pub type Result<T, E = SearchError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("搜索词被拒绝: {0}")]
    RejectedInput(String),
    #[error("搜索后端不可用: {reason}")]
    SourceUnavailable { reason: String },
    #[error("无法解析的结果行 {line:?}: {reason}")]
    MalformedRow { line: String, reason: String },
    #[error("分类尚未实现: {0:?}")]
    UnsupportedCategory(Category),
    #[error("搜索已取消")]
    Cancelled,
}

impl SearchError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable { reason: reason.into() }
    }

    pub fn malformed(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRow { line: line.into(), reason: reason.into() }
    }

    /// 行级错误只丢弃当前行，搜索继续
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::MalformedRow { .. })
    }
}
