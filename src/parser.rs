//! 后端输出的逐行解析。
//!
//! 两种格式共用同一套规则：第一条非空行如果以 `:` 结尾就是表头（`Results:` / `Files:`），
//! 之后每行是一条候选结果。

use crate::error::{Result, SearchError};
use crate::types::RawRow;

/// SPARQL 输出的列数：urn, url, parent, modified, title
const TABULAR_COLUMNS: usize = 5;

const TABULAR_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `tracker3 sparql` 的表格输出
    Tabular,
    /// `tracker-search -f` 的逐行输出
    LineMode,
}

#[derive(Debug)]
pub struct LineParser {
    format: OutputFormat,
    started: bool,
}

impl LineParser {
    pub fn new(format: OutputFormat) -> Self {
        Self { format, started: false }
    }

    /// 解析一行输出；表头、空行和“无结果”标记返回 Ok(None)
    pub fn feed(&mut self, line: &str) -> Result<Option<RawRow>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if !self.started {
            self.started = true;
            if is_header(line) {
                return Ok(None);
            }
        }
        match self.format {
            OutputFormat::Tabular => parse_tabular(line).map(Some),
            OutputFormat::LineMode => parse_line_mode(line),
        }
    }
}

fn is_header(line: &str) -> bool {
    line.ends_with(':') && !line.contains("://")
}

fn parse_tabular(line: &str) -> Result<RawRow> {
    let fields: Vec<&str> = line.splitn(TABULAR_COLUMNS, TABULAR_SEPARATOR).collect();
    if fields.len() < TABULAR_COLUMNS {
        return Err(SearchError::malformed(
            line,
            format!("期望 {} 列，实际 {} 列", TABULAR_COLUMNS, fields.len()),
        ));
    }
    let uri = value(fields[1])
        .ok_or_else(|| SearchError::malformed(line, "缺少 url"))?;
    Ok(RawRow::Tabular {
        urn: fields[0].trim().to_string(),
        uri,
        parent_uri: value(fields[2]),
        last_modified: value(fields[3]),
        title: value(fields[4]),
    })
}

/// 未绑定的变量输出为空或 `(null)`
fn value(field: &str) -> Option<String> {
    let field = field.trim();
    if field.is_empty() || field == "(null)" {
        None
    } else {
        Some(field.to_string())
    }
}

fn parse_line_mode(line: &str) -> Result<Option<RawRow>> {
    let body = strip_hit_count(line).trim();
    // ",0" 去掉计数后为空，是后端表示“无结果”的方式
    if body.is_empty() {
        return Ok(None);
    }
    let location = extract_location(body)
        .ok_or_else(|| SearchError::malformed(line, "不是 file:// URI 或绝对路径"))?;
    Ok(Some(RawRow::LineMode { location: location.to_string() }))
}

/// 去掉行尾的 `,<数字>` 命中计数
pub fn strip_hit_count(line: &str) -> &str {
    match line.rsplit_once(',') {
        Some((head, count)) if !count.is_empty() && count.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => line,
    }
}

/// 取出 `file://` 开头的 URI，或者绝对路径
pub fn extract_location(body: &str) -> Option<&str> {
    if let Some(start) = body.find("file://") {
        return Some(body[start..].trim());
    }
    if body.starts_with('/') {
        return Some(body);
    }
    None
}
