use crate::error::ShareError;
use crate::server::AppState;
use crate::storage::FileRecord;
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use log::{debug, info};
use tokio::fs::File;

/// `GET /files`
pub async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>, ShareError> {
    let files = state.storage.list_files().await?;
    debug!("Listing {} files", files.len());
    Ok(Json(files))
}

/// `GET /download/:filename`
pub async fn download_file(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ShareError> {
    let path = state.storage.resolve_path(&filename)?;
    let record = state.storage.stat_file(&filename).await?;

    let file = File::open(&path).await.map_err(|e| {
        debug!("Failed to open {:?}: {}", path, e);
        ShareError::NotFound
    })?;

    info!("Download request for {} ({} bytes)", record.name, record.size);

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (header::CONTENT_LENGTH, record.size.to_string()),
        (header::CONTENT_DISPOSITION, content_disposition(&record.name)),
    ];
    let stream = tokio_util::io::ReaderStream::new(file);
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `attachment` 响应头，附带 ASCII 回退名和 RFC 5987 编码的原名
fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("1-2-cat.png"),
            "attachment; filename=\"1-2-cat.png\"; filename*=UTF-8''1-2-cat.png"
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("1-2-照片 \"a\".jpg");
        assert!(value.starts_with("attachment; filename=\"1-2-__ _a_.jpg\""));
        assert!(value.contains("filename*=UTF-8''1-2-%E7%85%A7%E7%89%87%20%22a%22.jpg"));
        assert!(value.is_ascii());
    }
}
