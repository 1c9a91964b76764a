use std::path::Path;

use trackersearch::config::{
    self, Backend, SearchConfig, DIRECTORY_CONTENT_TYPE, FALLBACK_CONTENT_TYPE,
};
use trackersearch::{Category, ResultRecord, SearchService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let base = SearchConfig::load(&config::config_path())?;
    let sparql = SearchService::new(SearchConfig { backend: Backend::Sparql, ..base.clone() })?;
    let legacy = SearchService::new(SearchConfig { backend: Backend::LineMode, ..base })?;
    let home = dirs::home_dir();

    println!("# 对本机 Tracker 索引运行查询，检查结果记录是否自洽");
    let cases: [(&SearchService, &str, &[&str], Category); 8] = [
        (&sparql, "全文 document", &["document"], Category::FullText),
        (&sparql, "全文 report + 2023", &["report", "2023"], Category::FullText),
        (&sparql, "目录 download", &["download"], Category::Folders),
        (&sparql, "目录 DOCUMENTS (大小写)", &["DOCUMENTS"], Category::Folders),
        (&sparql, "文件分类 (预留，应无结果)", &["document"], Category::Files),
        (&sparql, "两个字符 (应被拒绝)", &["do"], Category::FullText),
        (&sparql, "引号注入", &["doc\" } #"], Category::FullText),
        (&legacy, "tracker-search 行输出", &["document"], Category::FullText),
    ];

    let mut flagged = 0;
    for (service, name, terms, category) in cases {
        flagged += run_case(service, name, terms, category, home.as_deref()).await;
    }
    println!("\n# 共 {} 条记录存在问题", flagged);
    Ok(())
}

/// 运行一组查询并打印每条记录的检查结果，返回有问题的记录数
async fn run_case(
    service: &SearchService,
    name: &str,
    terms: &[&str],
    category: Category,
    home: Option<&Path>,
) -> usize {
    println!("\n## {} ({}, {:?})", name, category.label(), terms);
    let results = service.search(terms, category).await;
    if results.is_empty() {
        println!("   (无结果)");
        return 0;
    }

    let mut flagged = 0;
    for res in &results {
        let issues = check_record(res, home);
        let mark = if issues.is_empty() { "ok" } else { "!!" };
        println!("   {} {:<40} {}", mark, res.pretty_path, res.content_type);
        for issue in &issues {
            println!("      - {}", issue);
        }
        if !issues.is_empty() {
            flagged += 1;
        }
    }
    println!("   {} 条结果，{} 条有问题", results.len(), flagged);
    flagged
}

/// 比对记录与磁盘状态：是否存在、目录类型、扩展名与类型、主目录缩写
fn check_record(res: &ResultRecord, home: Option<&Path>) -> Vec<String> {
    let path = &res.absolute_path;
    let mut issues = Vec::new();
    if !path.exists() {
        issues.push("路径已不存在".to_string());
        return issues;
    }

    let on_disk_dir = path.is_dir();
    if res.is_dir() && !on_disk_dir {
        issues.push(format!("标记为 {} 但不是目录", DIRECTORY_CONTENT_TYPE));
    }
    if on_disk_dir && !res.is_dir() && path.extension().is_none() {
        issues.push(format!("目录被标记为 {}", res.content_type));
    }

    if !on_disk_dir && res.content_type != FALLBACK_CONTENT_TYPE {
        let guess = mime_guess::from_path(path);
        if !guess.is_empty() && !guess.iter_raw().any(|m| m == res.content_type) {
            issues.push(format!(
                "扩展名对应 {}，记录为 {}",
                guess.first_raw().unwrap_or_default(),
                res.content_type
            ));
        }
    }

    if let Some(home) = home {
        if path.starts_with(home) && !res.pretty_path.starts_with('~') {
            issues.push(format!("主目录下的路径没有缩写: {}", res.pretty_path));
        }
    }
    issues
}
