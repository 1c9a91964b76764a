mod cli;

use clap::Parser;

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日志，写到 stderr，stdout 只留给 JSON
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    cli::run_cli(args).await
}
