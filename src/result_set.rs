use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SearchError};
use crate::normalize::{Filesystem, Normalizer};
use crate::source::RowStream;
use crate::types::ResultRecord;

/// 按到达顺序收集结果，凑够 `cap` 条或输出结束即停止。
///
/// 行级错误跳过该行；后端错误和取消直接返回错误，由调用方降级为空结果。
pub async fn collect<F: Filesystem + ?Sized>(
    rows: &mut dyn RowStream,
    cap: usize,
    normalizer: &Normalizer<'_, F>,
    cancel: &CancellationToken,
) -> Result<Vec<ResultRecord>> {
    let mut records = Vec::with_capacity(cap.min(64));
    let mut seen = HashSet::new();
    let mut skipped = 0usize;

    while records.len() < cap {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SearchError::Cancelled),
            next = rows.next_row() => next,
        };
        let row = match next {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) if e.is_row_level() => {
                debug!("跳过结果行: {}", e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        match normalizer.normalize(&row) {
            Some(record) if seen.insert(record.absolute_path.clone()) => records.push(record),
            Some(record) => debug!("重复结果: {}", record.absolute_path.display()),
            None => skipped += 1,
        }
    }

    debug!("收集到 {} 条结果，跳过 {} 行", records.len(), skipped);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::LocalFilesystem;
    use crate::parser::OutputFormat;
    use crate::source::TextRows;

    fn listing(dir: &std::path::Path, names: &[&str]) -> String {
        let mut out = String::from("Files:\n");
        for name in names {
            let path = dir.join(name);
            std::fs::write(&path, b"x").unwrap();
            out.push_str(&format!("{},1\n", path.display()));
        }
        out
    }

    #[tokio::test]
    async fn stops_at_cap() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..20).map(|i| format!("f{}.txt", i)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut rows = TextRows::new(OutputFormat::LineMode, &listing(dir.path(), &names));
        let normalizer = Normalizer::new(&LocalFilesystem, None);

        let records = collect(&mut rows, 12, &normalizer, &CancellationToken::new()).await.unwrap();
        assert_eq!(records.len(), 12);
        assert_eq!(records[0].filename, "f0.txt");
        assert_eq!(records[11].filename, "f11.txt");
    }

    #[tokio::test]
    async fn skips_bad_and_duplicate_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut text = listing(dir.path(), &["a.txt", "b.txt"]);
        text.push_str("garbage line\n");
        text.push_str(&format!("{},4\n", dir.path().join("a.txt").display()));
        text.push_str(&format!("{},4\n", dir.path().join("missing.txt").display()));
        let mut rows = TextRows::new(OutputFormat::LineMode, &text);
        let normalizer = Normalizer::new(&LocalFilesystem, None);

        let records = collect(&mut rows, 10, &normalizer, &CancellationToken::new()).await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn cancelled_token_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut rows = TextRows::new(OutputFormat::LineMode, &listing(dir.path(), &["a.txt"]));
        let normalizer = Normalizer::new(&LocalFilesystem, None);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = collect(&mut rows, 10, &normalizer, &cancel).await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }
}
