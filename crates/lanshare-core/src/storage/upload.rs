//! 进行中的上传
//!
//! 内容写入暂存文件，`commit` 时同步到磁盘并重命名到最终位置。

use super::{FileRecord, StorageError};
use log::{debug, warn};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// 一次尚未完成的上传
///
/// 必须以 [`PendingUpload::commit`] 或 [`PendingUpload::abort`] 结束。
/// 进程中途退出时遗留的暂存文件会在下次 `ensure_ready` 时清理。
#[derive(Debug)]
pub struct PendingUpload {
    name: String,
    staged: PathBuf,
    target: PathBuf,
    file: BufWriter<File>,
    written: u64,
}

impl PendingUpload {
    pub(super) async fn create(
        name: String,
        staged: PathBuf,
        target: PathBuf,
    ) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&staged)
            .await
            .map_err(|source| StorageError::Write {
                name: name.clone(),
                source,
            })?;
        debug!("Staging upload {} at {:?}", name, staged);

        Ok(Self {
            name,
            staged,
            target,
            file: BufWriter::new(file),
            written: 0,
        })
    }

    /// 分配的唯一文件名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 已写入的字节数
    pub fn written(&self) -> u64 {
        self.written
    }

    /// 追加一段内容
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), StorageError> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| StorageError::Write {
                name: self.name.clone(),
                source,
            })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// 完成上传：刷新、同步并重命名到最终位置
    ///
    /// 返回的记录使用提交后文件的实际大小和修改时间。
    /// 失败时暂存文件会被删除。
    pub async fn commit(self) -> Result<FileRecord, StorageError> {
        let Self {
            name,
            staged,
            target,
            file,
            ..
        } = self;

        match finish(file, &staged, &target).await {
            Ok(meta) => Ok(FileRecord::from_metadata(name, &meta)),
            Err(source) => {
                remove_staged(&staged).await;
                Err(StorageError::Write { name, source })
            }
        }
    }

    /// 放弃上传并删除暂存文件
    pub async fn abort(self) {
        let Self { name, staged, file, .. } = self;
        drop(file);
        remove_staged(&staged).await;
        debug!("Aborted upload {}", name);
    }
}

async fn finish(
    mut file: BufWriter<File>,
    staged: &Path,
    target: &Path,
) -> io::Result<std::fs::Metadata> {
    file.flush().await?;
    file.get_ref().sync_all().await?;
    drop(file);
    fs::rename(staged, target).await?;
    fs::metadata(target).await
}

async fn remove_staged(staged: &Path) {
    match fs::remove_file(staged).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            warn!("Failed to remove staged upload {:?}: {}", staged, e);
        }
        _ => {}
    }
}
