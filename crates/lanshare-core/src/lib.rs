//! Lanshare Core Library
//!
//! 局域网文件分享服务的核心实现：浏览器上传文件，服务端落盘，
//! 并实时通知所有在线的浏览器。
//!
//! # 模块
//!
//! - **storage**: 扁平目录存储、唯一命名、文件列表
//! - **hub**: 在线连接集合和事件广播
//! - **server**: HTTP 路由、上传/下载处理、WebSocket 会话
//! - **netinfo**: 局域网地址探测和二维码
//! - **config**: 服务设置
//! - **logging**: 日志级别
//!
//! # 使用示例
//!
//! ```ignore
//! use lanshare_core::{ServerSettings, ShareServer};
//!
//! let server = ShareServer::new(ServerSettings::load()).bind().await?;
//! println!("Server running at {}", server.share_url());
//! server.serve(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod netinfo;
pub mod server;
pub mod storage;

pub use config::ServerSettings;
pub use error::{ErrorBody, ShareError};
pub use hub::{ConnectionId, NotificationHub, ShareEvent, Subscription};
pub use logging::LogLevel;
pub use server::info::ServerInfo;
pub use server::upload::UploadResponse;
pub use server::{AppState, BoundServer, ShareServer};
pub use storage::{FileRecord, PendingUpload, Storage, StorageError};
