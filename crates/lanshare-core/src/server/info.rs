use crate::error::ShareError;
use crate::netinfo;
use crate::server::AppState;
use axum::{Json, extract::State};
use log::error;
use serde::{Deserialize, Serialize};

/// 分享地址信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub url: String,
    pub qr_code_url: String,
}

/// `GET /server-info`
pub async fn server_info(State(state): State<AppState>) -> Result<Json<ServerInfo>, ShareError> {
    let qr_code_url = netinfo::qr_data_url(&state.share_url).map_err(|e| {
        error!("Failed to generate QR code: {}", e);
        ShareError::EncodingFailure
    })?;

    Ok(Json(ServerInfo {
        url: state.share_url.to_string(),
        qr_code_url,
    }))
}
