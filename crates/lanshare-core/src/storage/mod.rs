//! 上传文件存储
//!
//! 所有文件存放在一个扁平目录中，目录列表即为唯一的数据来源。
//!
//! # 命名
//!
//! 每个上传的文件都以 `<毫秒时间戳>-<随机数>-<原始文件名>` 保存。
//! 唯一性只依赖这个前缀，不检查目标文件是否已存在，
//! 因此并发上传之间不存在"检查后再创建"的竞争。
//!
//! # 暂存
//!
//! 上传内容先写入 `<root>/.incoming/`，完成后再重命名到最终位置，
//! 未完成的文件不会出现在列表或下载中。

mod upload;

pub use upload::PendingUpload;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;

/// 暂存目录名称（位于存储根目录下）
pub const STAGING_DIR: &str = ".incoming";

/// 原始文件名无法使用时的替代名称
const FALLBACK_NAME: &str = "file";

/// 常见文件系统的单个文件名上限（字节）
pub const MAX_NAME_LEN: usize = 255;

/// 原始文件名保留的最大字节数，给 `<时间戳>-<随机数>-` 前缀留出空间
const MAX_ORIGINAL_LEN: usize = 200;

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to prepare storage directory {path:?}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read storage directory: {0}")]
    List(#[source] io::Error),
    #[error("invalid file name: {0:?}")]
    InvalidName(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("failed to write {name}: {source}")]
    Write {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// 已存储文件的信息
///
/// 大小和修改时间每次都从文件系统读取，不做缓存。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub size: u64,
    pub mtime: DateTime<Utc>,
}

impl FileRecord {
    fn from_metadata(name: String, meta: &std::fs::Metadata) -> Self {
        let mtime = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Self {
            name,
            size: meta.len(),
            mtime,
        }
    }
}

/// 扁平目录文件存储
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 存储根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// 确保存储目录存在，并清理上次运行遗留的暂存文件
    ///
    /// 应在启动时调用一次。
    pub async fn ensure_ready(&self) -> Result<(), StorageError> {
        let staging = self.staging_dir();
        fs::create_dir_all(&staging)
            .await
            .map_err(|source| StorageError::Prepare {
                path: staging.clone(),
                source,
            })?;

        let mut entries = fs::read_dir(&staging)
            .await
            .map_err(|source| StorageError::Prepare {
                path: staging.clone(),
                source,
            })?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Removed stale upload {:?}", path),
                Err(e) => warn!("Failed to remove stale upload {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// 生成唯一文件名 `<毫秒时间戳>-<随机数>-<原始文件名>`
    ///
    /// 不会访问文件系统。原始文件名只保留最后一段路径。
    pub fn generate_unique_name(original: &str) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let random: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
        format!("{millis}-{random}-{}", sanitize_original_name(original))
    }

    /// 列出存储目录中的全部文件
    ///
    /// 返回顺序为目录遍历顺序，不保证与上传顺序一致。
    /// 在遍历和读取元数据之间消失的文件会被跳过。
    pub async fn list_files(&self) -> Result<Vec<FileRecord>, StorageError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(StorageError::List)?;
        let mut records = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(StorageError::List)? {
            let Ok(name) = entry.file_name().into_string() else {
                debug!("Skipping non UTF-8 entry {:?}", entry.path());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            match fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => records.push(FileRecord::from_metadata(name, &meta)),
                Ok(_) => {}
                Err(e) => debug!("Skipping {}: {}", name, e),
            }
        }

        Ok(records)
    }

    /// 将文件名映射到存储目录内的路径
    ///
    /// 拒绝任何可能离开存储目录的名称：路径分隔符、`.`/`..`、
    /// 以 `.` 开头的名称（包括暂存目录）以及绝对路径。
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if is_valid_name(name) {
            Ok(self.root.join(name))
        } else {
            Err(StorageError::InvalidName(name.to_string()))
        }
    }

    /// 读取已存储文件的大小和修改时间
    ///
    /// 除权限错误外，任何无法读取元数据的名称都视为不存在。
    pub async fn stat_file(&self, name: &str) -> Result<FileRecord, StorageError> {
        let path = self.resolve_path(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(FileRecord::from_metadata(name.to_string(), &meta)),
            Ok(_) => Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(StorageError::Io(e)),
            Err(e) => {
                debug!("Stat of {:?} failed: {}", name, e);
                Err(StorageError::NotFound(name.to_string()))
            }
        }
    }

    /// 为新上传分配唯一名称并创建暂存文件
    pub async fn begin_upload(&self, original: &str) -> Result<PendingUpload, StorageError> {
        let name = Self::generate_unique_name(original);
        let staged = self.staging_dir().join(&name);
        let target = self.root.join(&name);
        PendingUpload::create(name, staged, target).await
    }
}

/// 只保留原始文件名的最后一段，过长时截断开头保留扩展名
fn sanitize_original_name(original: &str) -> String {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut base: String = base.chars().filter(|c| *c != '\0').collect();
    while base.len() > MAX_ORIGINAL_LEN {
        base.remove(0);
    }
    match base.as_str() {
        "" | "." | ".." => FALLBACK_NAME.to_string(),
        _ => base,
    }
}

fn is_valid_name(name: &str) -> bool {
    if name.is_empty()
        || name.len() > MAX_NAME_LEN
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
    {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
