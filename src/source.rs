use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::parser::{LineParser, OutputFormat};
use crate::query::Query;
use crate::types::RawRow;

/// 子进程 stderr 最多保留的字节数
const STDERR_LIMIT: u64 = 64 * 1024;

/// 逐行拉取的结果流：有限、不可重启
#[async_trait]
pub trait RowStream: Send {
    /// 读取下一行；Ok(None) 表示输出结束
    async fn next_row(&mut self) -> Result<Option<RawRow>>;
}

/// 查询执行者。每次调用获取独立的连接/进程，不在并发搜索之间共享
#[async_trait]
pub trait QuerySource: Send + Sync {
    async fn execute(&self, query: &Query) -> Result<Box<dyn RowStream>>;
}

/// 内存中的输出文本，按与子进程相同的规则解析
pub struct TextRows {
    parser: LineParser,
    lines: VecDeque<String>,
}

impl TextRows {
    pub fn new(format: OutputFormat, text: &str) -> Self {
        Self {
            parser: LineParser::new(format),
            lines: text.lines().map(str::to_string).collect(),
        }
    }
}

#[async_trait]
impl RowStream for TextRows {
    async fn next_row(&mut self) -> Result<Option<RawRow>> {
        while let Some(line) = self.lines.pop_front() {
            if let Some(row) = self.parser.feed(&line)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

/// 通过命令行调用 Tracker
#[derive(Debug, Clone)]
pub struct TrackerSource {
    sparql_command: Vec<String>,
    line_command: Vec<String>,
    timeout: Duration,
}

impl TrackerSource {
    pub fn new(config: &SearchConfig) -> Result<Self> {
        Ok(Self {
            sparql_command: split_command(&config.sparql_command)?,
            line_command: split_command(&config.line_command)?,
            timeout: config.timeout(),
        })
    }
}

fn split_command(command: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(command)
        .map_err(|e| SearchError::unavailable(format!("命令无法解析 {:?}: {}", command, e)))?;
    if parts.is_empty() {
        return Err(SearchError::unavailable("命令为空"));
    }
    Ok(parts)
}

#[async_trait]
impl QuerySource for TrackerSource {
    async fn execute(&self, query: &Query) -> Result<Box<dyn RowStream>> {
        let (mut argv, format) = match query {
            Query::Sparql(_) => (self.sparql_command.clone(), OutputFormat::Tabular),
            Query::Command(_) => (self.line_command.clone(), OutputFormat::LineMode),
            Query::Empty => return Ok(Box::new(TextRows::new(OutputFormat::LineMode, ""))),
        };
        match query {
            Query::Sparql(sparql) => argv.push(sparql.clone()),
            Query::Command(args) => argv.extend(args.iter().cloned()),
            Query::Empty => {}
        }
        let rows = ProcessRows::spawn(&argv, format, self.timeout)?;
        Ok(Box::new(rows))
    }
}

/// 子进程标准输出上的结果流。
///
/// 进程在 drop 时被杀掉，无论搜索正常结束、被取消还是出错，句柄都会释放。
pub struct ProcessRows {
    program: String,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    parser: LineParser,
    deadline: Instant,
    finished: bool,
}

impl ProcessRows {
    pub fn spawn(argv: &[String], format: OutputFormat, timeout: Duration) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| SearchError::unavailable("命令为空"))?;

        debug!("执行 {} ({} 个参数)", program, args.len());
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SearchError::unavailable(format!("无法启动 {}: {}", program, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SearchError::unavailable(format!("{} 没有标准输出", program)))?;
        // stderr 单独读取，避免管道写满卡住子进程
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(read_capped(err, STDERR_LIMIT)));

        Ok(Self {
            program: program.clone(),
            child,
            stdout: BufReader::new(stdout),
            stderr,
            parser: LineParser::new(format),
            deadline: Instant::now() + timeout,
            finished: false,
        })
    }

    async fn wait_exit(&mut self) -> Result<()> {
        let status = timeout_at(self.deadline, self.child.wait())
            .await
            .map_err(|_| SearchError::unavailable(format!("{} 退出超时", self.program)))?
            .map_err(|e| SearchError::unavailable(format!("等待 {} 失败: {}", self.program, e)))?;
        if status.success() {
            return Ok(());
        }
        // 孙进程可能继承 stderr 不放，等待同样受截止时间约束
        let stderr = match self.stderr.take() {
            Some(mut handle) => match timeout_at(self.deadline, &mut handle).await {
                Ok(text) => text.unwrap_or_default(),
                Err(_) => {
                    handle.abort();
                    String::new()
                }
            },
            None => String::new(),
        };
        Err(SearchError::unavailable(format!(
            "{} 异常退出 ({}): {}",
            self.program,
            status,
            stderr.trim()
        )))
    }
}

impl Drop for ProcessRows {
    fn drop(&mut self) {
        if let Some(handle) = self.stderr.take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl RowStream for ProcessRows {
    async fn next_row(&mut self) -> Result<Option<RawRow>> {
        while !self.finished {
            let mut buf = Vec::new();
            let read = timeout_at(self.deadline, self.stdout.read_until(b'\n', &mut buf))
                .await
                .map_err(|_| SearchError::unavailable(format!("{} 查询超时", self.program)))?
                .map_err(|e| SearchError::unavailable(format!("读取 {} 输出失败: {}", self.program, e)))?;
            if read == 0 {
                self.finished = true;
                self.wait_exit().await?;
                break;
            }
            if let Some(row) = self.parser.feed(&decode_line(&buf))? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

/// 最多保留 `limit` 字节，其余读完丢弃，保证子进程不会因 stderr 写满而阻塞
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, limit: u64) -> String {
    let mut buf = Vec::new();
    let _ = (&mut reader).take(limit).read_to_end(&mut buf).await;
    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
    decode_line(&buf)
}

/// 按 UTF-8 解码，非法字节替换后继续
fn decode_line(bytes: &[u8]) -> String {
    let (text, had_errors) = encoding_rs::UTF_8.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("输出包含非 UTF-8 字节，已替换");
    }
    text.trim_end_matches(['\r', '\n']).to_string()
}
