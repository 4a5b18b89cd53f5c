//! HTTP/WebSocket 分享服务器
//!
//! # 路由
//!
//! - `GET /server-info`: 分享地址和二维码
//! - `GET /files`: 文件列表
//! - `POST /upload`: 上传单个文件（multipart 字段 `file`）
//! - `GET /download/:filename`: 下载文件
//! - `GET /ws`: 实时通知
//! - 其他路径: 前端静态资源

pub mod files;
pub mod info;
pub mod upload;
pub mod websocket_handler;

use log::{info, warn};

use crate::config::ServerSettings;
use crate::hub::NotificationHub;
use crate::netinfo;
use crate::storage::Storage;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// 各请求共享的服务器状态
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub hub: Arc<NotificationHub>,
    /// 对外展示的分享地址
    pub share_url: Arc<str>,
}

/// 构建完整路由
pub fn router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/server-info", get(info::server_info))
        .route("/files", get(files::list_files))
        .route("/upload", post(upload::upload_file))
        .route("/download/:filename", get(files::download_file))
        .route("/ws", get(websocket_handler::ws_handler))
        .fallback_service(ServeDir::new(public_dir))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 分享服务器
pub struct ShareServer {
    settings: ServerSettings,
    storage: Arc<Storage>,
    hub: Arc<NotificationHub>,
}

impl ShareServer {
    pub fn new(settings: ServerSettings) -> Self {
        let storage = Arc::new(Storage::new(settings.storage_dir.clone()));
        Self {
            settings,
            storage,
            hub: Arc::new(NotificationHub::new()),
        }
    }

    pub fn storage(&self) -> Arc<Storage> {
        self.storage.clone()
    }

    pub fn hub(&self) -> Arc<NotificationHub> {
        self.hub.clone()
    }

    /// 准备存储目录并绑定监听端口
    ///
    /// 端口为 0 时由系统分配，实际地址见 [`BoundServer::local_addr`]。
    pub async fn bind(self) -> anyhow::Result<BoundServer> {
        self.storage.ensure_ready().await?;

        let listener =
            TcpListener::bind(SocketAddr::new(self.settings.bind_addr, self.settings.port)).await?;
        let local_addr = listener.local_addr()?;

        let host = match &self.settings.public_host {
            Some(host) => host.clone(),
            None if local_addr.ip().is_unspecified() => netinfo::local_ip().to_string(),
            None => local_addr.ip().to_string(),
        };
        let share_url = netinfo::share_url(&host, local_addr.port());

        if !self.settings.public_dir.is_dir() {
            warn!(
                "Public directory {:?} not found, front-end will not be served",
                self.settings.public_dir
            );
        }

        let state = AppState {
            storage: self.storage.clone(),
            hub: self.hub.clone(),
            share_url: Arc::from(share_url.as_str()),
        };
        let app = router(state, &self.settings.public_dir);

        Ok(BoundServer {
            listener,
            app,
            local_addr,
            share_url,
            hub: self.hub,
        })
    }
}

/// 已绑定端口、尚未开始服务的服务器
pub struct BoundServer {
    listener: TcpListener,
    app: Router,
    local_addr: SocketAddr,
    share_url: String,
    hub: Arc<NotificationHub>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn share_url(&self) -> &str {
        &self.share_url
    }

    /// 开始服务，直到 `shutdown` 完成
    ///
    /// 关闭时先断开所有 WebSocket 连接，再等待进行中的请求结束。
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let hub = self.hub;
        let shutdown = async move {
            shutdown.await;
            let closed = hub.close_all().await;
            info!("Shutting down, closed {} live connection(s)", closed);
        };

        info!("Share server listening on {}", self.local_addr);
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}
