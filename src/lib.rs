//! Tracker 桌面搜索集成层：构造查询、执行、把原始输出整理成可直接展示的结果。

pub mod config;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod query;
pub mod result_set;
pub mod sanitize;
pub mod searcher;
pub mod source;
pub mod types;

pub use error::SearchError;
pub use searcher::SearchService;
pub use types::{Category, RawRow, ResultRecord};
