use crate::hub::{NotificationHub, Subscription};
use crate::server::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use std::sync::Arc;

/// `GET /ws`
///
/// 在返回 101 之前完成注册，握手成功的客户端一定能收到之后的事件。
/// 升级失败时订阅随闭包一起丢弃，下一次广播会把它移除。
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let subscription = state.hub.register().await;
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, subscription))
}

/// 处理单个 WebSocket 会话
async fn handle_socket(socket: WebSocket, hub: Arc<NotificationHub>, subscription: Subscription) {
    let Subscription { id, mut events } = subscription;
    info!(
        "Client connected: {} ({} online)",
        id,
        hub.connection_count().await
    );

    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    // 通知中心已关闭
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                let text = match event.to_text() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode {} event: {}", event.name(), e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    debug!("WebSocket write error for {}: {}", id, e);
                    break;
                }
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("WebSocket read error for {}: {}", id, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    hub.unregister(id).await;
    info!("Client disconnected: {}", id);
}
