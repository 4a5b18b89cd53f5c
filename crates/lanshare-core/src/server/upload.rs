use crate::error::ShareError;
use crate::hub::ShareEvent;
use crate::server::AppState;
use crate::storage::{FileRecord, Storage};
use axum::{
    Json,
    extract::{
        State,
        multipart::{Field, Multipart, MultipartRejection},
    },
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// 上传文件所在的表单字段
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileRecord,
}

/// `POST /upload`
///
/// 只处理第一个带文件名的 `file` 字段，其余字段忽略。
/// 请求体不是 multipart 时按未上传文件处理。
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ShareError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Rejected non-multipart upload: {}", e);
        ShareError::NoFileProvided
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        ShareError::BadRequest(e.body_text())
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // 浏览器在未选择文件时会发送空文件名
        let Some(original) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            debug!("Ignoring `file` field without a file name");
            continue;
        };

        let record = receive_file(&state.storage, field, &original).await?;
        let delivered = state
            .hub
            .broadcast(&ShareEvent::FileUploaded(record.clone()))
            .await;
        info!(
            "Stored {} ({} bytes), notified {} client(s)",
            record.name, record.size, delivered
        );

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            file: record,
        }));
    }

    warn!("No file field found in multipart upload");
    Err(ShareError::NoFileProvided)
}

/// 把字段内容流式写入存储
async fn receive_file(
    storage: &Storage,
    mut field: Field<'_>,
    original: &str,
) -> Result<FileRecord, ShareError> {
    let mut pending = storage.begin_upload(original).await?;
    debug!("Receiving {:?} as {}", original, pending.name());

    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = pending.write_chunk(&chunk).await {
                    pending.abort().await;
                    return Err(e.into());
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(
                    "Upload of {} interrupted after {} bytes: {}",
                    pending.name(),
                    pending.written(),
                    e
                );
                pending.abort().await;
                return Err(ShareError::BadRequest(e.body_text()));
            }
        }
    }

    Ok(pending.commit().await?)
}
