#![cfg(target_os = "linux")]

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use trackersearch::normalize::{LocalFilesystem, Normalizer};
use trackersearch::parser::OutputFormat;
use trackersearch::result_set::collect;
use trackersearch::source::{ProcessRows, RowStream};
use trackersearch::SearchError;

/// 记下自己的 pid 后无限输出同一行，只能靠外部终止
fn endless_listing(dir: &Path) -> (Vec<String>, std::path::PathBuf) {
    let hit = dir.join("hit.txt");
    std::fs::write(&hit, b"content").unwrap();
    let pid_file = dir.join("pid");
    let script = format!(
        "echo $$ > '{}'; while :; do echo '{},1'; done",
        pid_file.display(),
        hit.display()
    );
    let argv = vec!["sh".to_string(), "-c".to_string(), script];
    (argv, pid_file)
}

fn read_pid(pid_file: &Path) -> u32 {
    std::fs::read_to_string(pid_file).unwrap().trim().parse().unwrap()
}

/// 进程不存在或只剩僵尸都算已终止
fn is_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        Err(_) => false,
    }
}

async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..40 {
        if !is_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn reaching_cap_releases_child() {
    let dir = tempfile::tempdir().unwrap();
    let (argv, pid_file) = endless_listing(dir.path());
    let mut rows = ProcessRows::spawn(&argv, OutputFormat::LineMode, Duration::from_secs(10)).unwrap();
    let normalizer = Normalizer::new(&LocalFilesystem, None);

    let records = collect(&mut rows, 1, &normalizer, &CancellationToken::new()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename, "hit.txt");

    let pid = read_pid(&pid_file);
    assert!(is_running(pid));
    drop(rows);
    assert!(wait_until_gone(pid).await, "pid {} still running", pid);
}

#[tokio::test]
async fn cancelling_mid_stream_releases_child() {
    let dir = tempfile::tempdir().unwrap();
    let (argv, pid_file) = endless_listing(dir.path());
    let mut rows = ProcessRows::spawn(&argv, OutputFormat::LineMode, Duration::from_secs(10)).unwrap();
    let normalizer = Normalizer::new(&LocalFilesystem, None);

    // 先确认子进程已经在输出
    assert!(rows.next_row().await.unwrap().is_some());
    let pid = read_pid(&pid_file);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = collect(&mut rows, 10, &normalizer, &cancel).await;
    assert!(matches!(result, Err(SearchError::Cancelled)));

    drop(rows);
    assert!(wait_until_gone(pid).await, "pid {} still running", pid);
}
