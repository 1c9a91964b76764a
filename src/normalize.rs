use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::config::{DIRECTORY_CONTENT_TYPE, FALLBACK_CONTENT_TYPE, UNKNOWN_CONTENT_TYPE};
use crate::types::{RawRow, ResultRecord};

/// 规范化时用到的文件系统操作，全部只读
pub trait Filesystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// 返回 (类型, 是否确定)
    fn guess_content_type(&self, path: &Path) -> (String, bool);
    fn resolve_uri_to_path(&self, uri: &str) -> Option<PathBuf>;
}

/// 本机文件系统，按扩展名猜测类型
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn guess_content_type(&self, path: &Path) -> (String, bool) {
        let guess = mime_guess::from_path(path);
        match guess.first_raw() {
            // 只有唯一候选时才算确定
            Some(mime) => (mime.to_string(), guess.count() == 1),
            None => (UNKNOWN_CONTENT_TYPE.to_string(), false),
        }
    }

    fn resolve_uri_to_path(&self, uri: &str) -> Option<PathBuf> {
        resolve_location(uri)
    }
}

/// `file://` URI 或者（可能经过百分号编码的）绝对路径转为本地路径
pub fn resolve_location(location: &str) -> Option<PathBuf> {
    if location.starts_with("file://") {
        let url = Url::parse(location).ok()?;
        return url.to_file_path().ok();
    }
    if location.contains("://") {
        return None;
    }
    let decoded = urlencoding::decode(location).ok()?;
    let path = PathBuf::from(decoded.as_ref());
    path.is_absolute().then_some(path)
}

/// 把主目录前缀替换成 `~`
pub fn pretty_path(path: &Path, home: Option<&Path>) -> String {
    if let Some(rest) = home.and_then(|h| path.strip_prefix(h).ok()) {
        if rest.as_os_str().is_empty() {
            return "~".to_string();
        }
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// 修正类型猜测：不确定的“未知二进制”按目录或兜底类型处理
pub fn classify<F: Filesystem + ?Sized>(fs: &F, path: &Path) -> String {
    let (guessed, certain) = fs.guess_content_type(path);
    if certain || guessed != UNKNOWN_CONTENT_TYPE {
        return guessed;
    }
    if fs.is_dir(path) {
        DIRECTORY_CONTENT_TYPE.to_string()
    } else {
        FALLBACK_CONTENT_TYPE.to_string()
    }
}

pub struct Normalizer<'a, F: Filesystem + ?Sized> {
    fs: &'a F,
    home: Option<&'a Path>,
}

impl<'a, F: Filesystem + ?Sized> Normalizer<'a, F> {
    pub fn new(fs: &'a F, home: Option<&'a Path>) -> Self {
        Self { fs, home }
    }

    /// 无效行（无法解析、非本地、已不存在）返回 None
    pub fn normalize(&self, row: &RawRow) -> Option<ResultRecord> {
        let location = row.location();
        let Some(path) = self.fs.resolve_uri_to_path(location) else {
            debug!("无法解析为本地路径: {}", location);
            return None;
        };
        if !self.fs.exists(&path) {
            if let RawRow::Tabular { urn, .. } = row {
                debug!("索引条目已失效 {}: {}", urn, path.display());
            } else {
                debug!("路径不存在: {}", path.display());
            }
            return None;
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let (name, last_modified) = match row {
            RawRow::Tabular { title, last_modified, .. } => (
                title.clone().filter(|t| !t.trim().is_empty()).unwrap_or_else(|| filename.clone()),
                last_modified.clone(),
            ),
            RawRow::LineMode { .. } => (filename.clone(), None),
        };

        Some(ResultRecord {
            id: location.to_string(),
            name,
            content_type: classify(self.fs, &path),
            pretty_path: pretty_path(&path, self.home),
            filename,
            absolute_path: path,
            last_modified,
        })
    }
}
