//! Core Service - 分享服务生命周期管理

use anyhow::Result;
use lanshare_core::{ServerSettings, ShareServer, netinfo};

pub async fn run_service(settings: ServerSettings) -> Result<()> {
    tracing::info!("存储目录: {:?}", settings.storage_dir);

    let server = ShareServer::new(settings).bind().await?;
    let url = server.share_url().to_string();

    println!("Server running at {url}");
    // 终端二维码方便手机扫码访问
    match netinfo::qr_terminal(&url) {
        Ok(qr) => println!("{qr}"),
        Err(e) => tracing::warn!("生成终端二维码失败: {}", e),
    }

    server.serve(shutdown_signal()).await?;
    tracing::info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("无法监听退出信号: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("收到退出信号，正在关闭...");
}
