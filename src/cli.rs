use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use trackersearch::config::{self, Backend, SearchConfig};
use trackersearch::{Category, ResultRecord, SearchService};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tracker 桌面搜索（JSON 输出）", long_about = None)]
pub struct CliArgs {
    /// 搜索关键词，按 shell 规则拆分
    #[arg(short = 'q', long = "query", required = true)]
    pub query: String,

    /// 搜索分类
    #[arg(short = 'c', long = "category", value_enum, default_value_t = Category::FullText)]
    pub category: Category,

    /// 最大结果数（默认取配置文件）
    #[arg(short = 'm', long = "max-results")]
    pub max_results: Option<usize>,

    /// 使用旧版 tracker-search 行输出
    #[arg(long = "line-mode")]
    pub line_mode: bool,

    /// 全文搜索时保留目录命中
    #[arg(long = "include-folders")]
    pub include_folders: bool,

    /// 后端超时（秒）
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// 配置文件路径
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// 配置文件 + 命令行覆盖
    pub fn resolve_config(&self) -> anyhow::Result<SearchConfig> {
        let path = self.config.clone().unwrap_or_else(config::config_path);
        let mut cfg = SearchConfig::load(&path)?;
        if let Some(max) = self.max_results {
            cfg.max_results = max;
        }
        if let Some(secs) = self.timeout {
            cfg.timeout_secs = secs;
        }
        if self.line_mode {
            cfg.backend = Backend::LineMode;
        }
        if self.include_folders {
            cfg.exclude_folders = false;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// 拆分关键词；引号不匹配时退回按空白拆分
    pub fn terms(&self) -> Vec<String> {
        match shell_words::split(&self.query) {
            Ok(parts) => parts,
            Err(_) => self.query.split_whitespace().map(str::to_string).collect(),
        }
    }
}

// CLI入口
pub async fn run_cli(args: CliArgs) -> anyhow::Result<()> {
    let cfg = args.resolve_config()?;
    let service = SearchService::new(cfg).context("初始化搜索后端失败")?;

    let terms = args.terms();
    let results = service.search(&terms, args.category).await;

    let output = json!({
        "code": 0,
        "msg": "success",
        "query": terms,
        "category": args.category.label(),
        "results": results.iter().map(render).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn render(record: &ResultRecord) -> serde_json::Value {
    let mut value = json!(record);
    if let Some(local) = record.modified_at() {
        value["modified_local"] = json!(local.format("%Y-%m-%d %H:%M").to_string());
    }
    value
}
