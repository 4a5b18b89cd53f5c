//! HTTP 层错误
//!
//! 每个错误都只影响当前请求，以 `{"error": "..."}` 返回给客户端。
//! 底层原因只写日志，不返回给客户端。

use crate::storage::StorageError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{error, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("No file uploaded")]
    NoFileProvided,
    #[error("Invalid upload: {0}")]
    BadRequest(String),
    #[error("Failed to save file")]
    WriteFailure,
    #[error("Failed to list files")]
    ListError,
    #[error("File not found")]
    NotFound,
    #[error("Failed to generate QR code")]
    EncodingFailure,
    #[error("Internal server error")]
    Internal,
}

/// 错误响应体
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ShareError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ShareError::NoFileProvided | ShareError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ShareError::NotFound => StatusCode::NOT_FOUND,
            ShareError::WriteFailure
            | ShareError::ListError
            | ShareError::EncodingFailure
            | ShareError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (self.status_code(), body).into_response()
    }
}

impl From<StorageError> for ShareError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidName(name) => {
                warn!("Rejected file name {:?}", name);
                ShareError::NotFound
            }
            StorageError::NotFound(_) => ShareError::NotFound,
            StorageError::List(_) => {
                error!("{}", e);
                ShareError::ListError
            }
            StorageError::Write { .. } | StorageError::Prepare { .. } => {
                error!("{}", e);
                ShareError::WriteFailure
            }
            StorageError::Io(_) => {
                error!("Storage I/O error: {}", e);
                ShareError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_status_codes() {
        assert_eq!(ShareError::NoFileProvided.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ShareError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ShareError::WriteFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ShareError::EncodingFailure.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_error_mapping() {
        let invalid = ShareError::from(StorageError::InvalidName("../x".to_string()));
        assert!(matches!(invalid, ShareError::NotFound));

        let list = ShareError::from(StorageError::List(io::Error::other("denied")));
        assert!(matches!(list, ShareError::ListError));

        let write = ShareError::from(StorageError::Write {
            name: "1-1-a".to_string(),
            source: io::Error::other("disk full"),
        });
        assert!(matches!(write, ShareError::WriteFailure));
    }

    #[test]
    fn test_cause_is_not_exposed() {
        let err = ShareError::from(StorageError::Write {
            name: "1-1-a".to_string(),
            source: io::Error::other("/secret/path: disk full"),
        });
        assert_eq!(err.to_string(), "Failed to save file");
    }
}
