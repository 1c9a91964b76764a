use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::normalize::{Filesystem, LocalFilesystem, Normalizer};
use crate::query::{self, QueryOptions};
use crate::result_set;
use crate::sanitize::sanitize;
use crate::source::{QuerySource, TrackerSource};
use crate::types::{Category, ResultRecord};

/// 搜索入口。只持有配置和协作者，调用之间没有共享的可变状态
pub struct SearchService<S = TrackerSource, F = LocalFilesystem> {
    config: SearchConfig,
    source: S,
    fs: F,
    home: Option<PathBuf>,
}

impl SearchService {
    /// 使用本机 Tracker 命令行与文件系统
    pub fn new(config: SearchConfig) -> Result<Self> {
        let source = TrackerSource::new(&config)?;
        Ok(Self::with_parts(config, source, LocalFilesystem, dirs::home_dir()))
    }
}

impl<S: QuerySource, F: Filesystem> SearchService<S, F> {
    pub fn with_parts(config: SearchConfig, source: S, fs: F, home: Option<PathBuf>) -> Self {
        Self { config, source, fs, home }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub async fn search<T: AsRef<str>>(&self, terms: &[T], category: Category) -> Vec<ResultRecord> {
        self.search_with_cancel(terms, category, &CancellationToken::new()).await
    }

    /// 细化搜索：旧结果不复用，直接重新查询
    pub async fn subsearch<T: AsRef<str>>(
        &self,
        _previous: &[ResultRecord],
        terms: &[T],
        category: Category,
    ) -> Vec<ResultRecord> {
        self.search(terms, category).await
    }

    /// 任何失败都降级为空结果，原因只记录到日志
    pub async fn search_with_cancel<T: AsRef<str>>(
        &self,
        terms: &[T],
        category: Category,
        cancel: &CancellationToken,
    ) -> Vec<ResultRecord> {
        match self.try_search(terms, category, cancel).await {
            Ok(records) => {
                info!("{} 搜索返回 {} 条结果", category.label(), records.len());
                records
            }
            Err(e @ SearchError::SourceUnavailable { .. }) => {
                warn!("搜索失败: {}", e);
                Vec::new()
            }
            Err(e) => {
                debug!("搜索未执行: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_search<T: AsRef<str>>(
        &self,
        terms: &[T],
        category: Category,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResultRecord>> {
        let terms = sanitize(terms)?;
        let query = query::build(&terms, category, &QueryOptions::from(&self.config));
        if query.is_empty() {
            return Err(SearchError::UnsupportedCategory(category));
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let mut rows = self.source.execute(&query).await?;
        let normalizer = Normalizer::new(&self.fs, self.home.as_deref());
        result_set::collect(rows.as_mut(), self.config.max_results, &normalizer, cancel).await
    }
}
