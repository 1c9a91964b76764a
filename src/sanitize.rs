use crate::config::MIN_TERM_CHARS;
use crate::error::{Result, SearchError};

/// 全文检索语法中有特殊含义的字符
const FTS_OPERATORS: &[char] = &['"', '*', '(', ')', '^', ':', '{', '}'];

/// 已校验的单个搜索词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    text: String,
}

impl Term {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn lowered(&self) -> String {
        self.text.to_lowercase()
    }

    /// SPARQL 双引号字符串内容，引号与反斜杠均被转义
    pub fn sparql_literal(&self) -> String {
        escape_sparql(&self.text)
    }

    /// 小写形式的 SPARQL 字符串内容，用于不区分大小写的子串过滤
    pub fn sparql_lowered(&self) -> String {
        escape_sparql(&self.lowered())
    }

    /// 前缀匹配模式 `term*`；去掉运算符后为空时返回 None
    pub fn fts_prefix(&self) -> Option<String> {
        let cleaned: String = self
            .text
            .chars()
            .filter(|c| !FTS_OPERATORS.contains(c))
            .collect();
        let cleaned = cleaned.trim_start_matches(['-', '+']).trim();
        if cleaned.is_empty() {
            return None;
        }
        Some(format!("{}*", escape_sparql(cleaned)))
    }

    /// 行模式命令参数 `term*`
    pub fn wildcard(&self) -> String {
        format!("{}*", self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedTerms {
    terms: Vec<Term>,
}

impl SanitizedTerms {
    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// 校验并清理搜索词
///
/// 长度规则针对调用方给出的第一个词，空词不会让后面的词顶上来。
pub fn sanitize<S: AsRef<str>>(terms: &[S]) -> Result<SanitizedTerms> {
    let cleaned: Vec<String> = terms
        .iter()
        .map(|t| t.as_ref().chars().filter(|c| !c.is_control()).collect::<String>())
        .map(|t| t.trim().to_string())
        .collect();

    let first = cleaned
        .first()
        .ok_or_else(|| SearchError::RejectedInput("没有搜索词".to_string()))?;
    if first.chars().count() < MIN_TERM_CHARS {
        return Err(SearchError::RejectedInput(format!(
            "首个搜索词少于 {} 个字符: {:?}",
            MIN_TERM_CHARS, first
        )));
    }

    let terms = cleaned
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(|text| Term { text })
        .collect();
    Ok(SanitizedTerms { terms })
}

fn escape_sparql(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            _ => out.push(c),
        }
    }
    out
}
