use crate::config::{Backend, SearchConfig};
use crate::sanitize::SanitizedTerms;
use crate::types::Category;

/// 发给后端的查询，每次搜索重新构造
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// SPARQL 查询语句
    Sparql(String),
    /// 行模式命令的参数（不含程序本身）
    Command(Vec<String>),
    /// 不执行任何查询
    Empty,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub limit: usize,
    pub exclude_folders: bool,
    pub backend: Backend,
}

impl From<&SearchConfig> for QueryOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            limit: config.max_results,
            exclude_folders: config.exclude_folders,
            backend: config.backend,
        }
    }
}

// 列顺序固定为 urn, url, parent, modified, title；标题放在最后，
// 这样标题里的 ", " 不会影响表格解析
const SELECT_COLUMNS: &str = "SELECT ?urn nie:url(?urn) nie:url(?parent) \
nfo:fileLastModified(?urn) tracker:coalesce(nie:title(?urn), nfo:fileName(?urn))";

const ORDER_BY: &str = "ORDER BY DESC(nfo:fileLastModified(?urn)) ASC(nie:title(?urn))";

pub fn build(terms: &SanitizedTerms, category: Category, options: &QueryOptions) -> Query {
    if terms.is_empty() {
        return Query::Empty;
    }
    match (options.backend, category) {
        (_, Category::Files) => Query::Empty,
        (Backend::Sparql, Category::FullText) => Query::Sparql(full_text(terms, options)),
        (Backend::Sparql, Category::Folders) => Query::Sparql(folders(terms, options)),
        (Backend::LineMode, Category::FullText) => Query::Command(line_mode(terms)),
        (Backend::LineMode, Category::Folders) => Query::Empty,
    }
}

fn full_text(terms: &SanitizedTerms, options: &QueryOptions) -> String {
    let mut branches = Vec::new();
    for term in terms.iter() {
        if let Some(prefix) = term.fts_prefix() {
            branches.push(format!("{{ ?urn fts:match \"{}\" }}", prefix));
        }
        branches.push(format!(
            "{{ ?urn nao:hasTag ?tag . FILTER (fn:contains(fn:lower-case(nao:prefLabel(?tag)), \"{}\")) }}",
            term.sparql_lowered()
        ));
    }

    let folder_filter = if options.exclude_folders {
        "  OPTIONAL { ?urn a nfo:Folder . BIND(true AS ?isFolder) }\n  FILTER (!BOUND(?isFolder))\n"
    } else {
        ""
    };

    format!(
        "{select}\nWHERE {{\n  ?urn a nfo:FileDataObject .\n  OPTIONAL {{ ?urn nfo:belongsToContainer ?parent . }}\n  {matches}\n{folder_filter}}}\n{order}\nLIMIT {limit}",
        select = SELECT_COLUMNS,
        matches = branches.join("\n  UNION\n  "),
        folder_filter = folder_filter,
        order = ORDER_BY,
        limit = options.limit,
    )
}

fn folders(terms: &SanitizedTerms, options: &QueryOptions) -> String {
    let filters: Vec<String> = terms
        .iter()
        .map(|term| {
            format!(
                "fn:contains(fn:lower-case(nfo:fileName(?urn)), \"{}\")",
                term.sparql_lowered()
            )
        })
        .collect();

    format!(
        "{select}\nWHERE {{\n  ?urn a nfo:Folder ;\n       tracker:available true .\n  OPTIONAL {{ ?urn nfo:belongsToContainer ?parent . }}\n  FILTER ({filters})\n}}\n{order} DESC(nie:contentCreated(?urn))\nLIMIT {limit}",
        select = SELECT_COLUMNS,
        filters = filters.join(" && "),
        order = ORDER_BY,
        limit = options.limit,
    )
}

fn line_mode(terms: &SanitizedTerms) -> Vec<String> {
    // "--" 之后的参数不会被当成选项
    std::iter::once("--".to_string())
        .chain(terms.iter().map(|t| t.wildcard()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize;

    fn options(backend: Backend) -> QueryOptions {
        QueryOptions { limit: 12, exclude_folders: true, backend }
    }

    fn sparql(terms: &[&str], category: Category, options: &QueryOptions) -> String {
        match build(&sanitize(terms).unwrap(), category, options) {
            Query::Sparql(q) => q,
            other => panic!("expected sparql, got {:?}", other),
        }
    }

    #[test]
    fn folder_query_filters_and_orders() {
        let q = sparql(&["Proj"], Category::Folders, &options(Backend::Sparql));
        assert!(q.contains("?urn a nfo:Folder"));
        assert!(q.contains("fn:contains(fn:lower-case(nfo:fileName(?urn)), \"proj\")"));
        assert!(q.contains("tracker:available true"));
        let desc = q.find("DESC(nfo:fileLastModified(?urn))").unwrap();
        let asc = q.find("ASC(nie:title(?urn))").unwrap();
        assert!(desc < asc);
        assert!(q.contains("DESC(nie:contentCreated(?urn))"));
        assert!(q.trim_end().ends_with("LIMIT 12"));
    }

    #[test]
    fn full_text_matches_content_or_tags() {
        let q = sparql(&["report", "2023"], Category::FullText, &options(Backend::Sparql));
        assert!(q.contains("fts:match \"report*\""));
        assert!(q.contains("fts:match \"2023*\""));
        assert!(q.contains("nao:prefLabel(?tag)), \"report\""));
        assert!(q.contains("UNION"));
        assert!(q.contains("tracker:coalesce(nie:title(?urn), nfo:fileName(?urn))"));
        assert!(q.contains("FILTER (!BOUND(?isFolder))"));
        assert!(q.trim_end().ends_with("LIMIT 12"));
    }

    #[test]
    fn folder_exclusion_is_optional() {
        let opts = QueryOptions { exclude_folders: false, ..options(Backend::Sparql) };
        let q = sparql(&["report"], Category::FullText, &opts);
        assert!(!q.contains("?isFolder"));
    }

    #[test]
    fn quoted_term_stays_inside_literal() {
        let q = sparql(&[r#"abc"}"#], Category::Folders, &options(Backend::Sparql));
        assert!(q.contains(r#""abc\"}""#));
    }

    #[test]
    fn files_category_builds_nothing() {
        let terms = sanitize(&["report"]).unwrap();
        assert!(build(&terms, Category::Files, &options(Backend::Sparql)).is_empty());
        assert!(build(&terms, Category::Files, &options(Backend::LineMode)).is_empty());
        assert!(build(&terms, Category::Folders, &options(Backend::LineMode)).is_empty());
    }

    #[test]
    fn line_mode_puts_terms_after_separator() {
        let terms = sanitize(&["report", "-rf"]).unwrap();
        let q = build(&terms, Category::FullText, &options(Backend::LineMode));
        assert_eq!(
            q,
            Query::Command(vec!["--".to_string(), "report*".to_string(), "-rf*".to_string()])
        );
    }
}
