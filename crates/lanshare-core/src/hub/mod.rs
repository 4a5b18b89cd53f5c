//! 实时通知中心
//!
//! 维护当前在线的 WebSocket 连接，并把上传完成事件推送给所有连接。
//!
//! 每个连接拥有独立的有界队列，广播只负责入队，
//! 慢速或已断开的客户端不会阻塞其他客户端。
//! 队列已满的连接会丢弃这一条事件，其他连接不受影响。
//! 新连接不会收到注册之前发生的事件。

pub mod protocol;

pub use protocol::ShareEvent;

use log::{debug, warn};
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

/// 每个连接最多积压的事件数
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// 连接标识，仅在连接存活期间有意义
pub type ConnectionId = Uuid;

/// 一次注册返回的订阅
#[derive(Debug)]
pub struct Subscription {
    pub id: ConnectionId,
    pub events: mpsc::Receiver<ShareEvent>,
}

/// 在线连接集合
#[derive(Debug, Default)]
pub struct NotificationHub {
    clients: Mutex<HashMap<ConnectionId, mpsc::Sender<ShareEvent>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册新连接
    pub async fn register(&self) -> Subscription {
        let (tx, events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let id = Uuid::new_v4();
        self.clients.lock().await.insert(id, tx);
        debug!("Registered connection {}", id);
        Subscription { id, events }
    }

    /// 移除连接，重复调用无副作用
    ///
    /// 返回该连接此前是否仍在集合中。
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let removed = self.clients.lock().await.remove(&id).is_some();
        if removed {
            debug!("Unregistered connection {}", id);
        }
        removed
    }

    /// 向所有在线连接推送事件
    ///
    /// 接收端已关闭的连接会被顺便移除。返回成功入队的连接数。
    pub async fn broadcast(&self, event: &ShareEvent) -> usize {
        let mut clients = self.clients.lock().await;
        let mut delivered = 0;
        clients.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Connection {} is not keeping up, dropping {} event", id, event.name());
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Dropping closed connection {}", id);
                false
            }
        });
        delivered
    }

    /// 当前在线连接数
    pub async fn connection_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// 关闭所有连接
    ///
    /// 发送端全部丢弃后，各连接的事件队列会结束，会话随之退出。
    pub async fn close_all(&self) -> usize {
        let mut clients = self.clients.lock().await;
        let count = clients.len();
        clients.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileRecord;
    use chrono::Utc;

    fn uploaded(name: &str) -> ShareEvent {
        ShareEvent::FileUploaded(FileRecord {
            name: name.to_string(),
            size: 1,
            mtime: Utc::now(),
        })
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_once() {
        let hub = NotificationHub::new();
        let mut a = hub.register().await;
        let mut b = hub.register().await;

        assert_eq!(hub.broadcast(&uploaded("1-1-a.txt")).await, 2);

        assert_eq!(a.events.recv().await, Some(uploaded("1-1-a.txt")));
        assert_eq!(b.events.recv().await, Some(uploaded("1-1-a.txt")));
        assert!(a.events.try_recv().is_err());
        assert!(b.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_history() {
        let hub = NotificationHub::new();
        hub.broadcast(&uploaded("1-1-early.txt")).await;

        let mut late = hub.register().await;
        hub.broadcast(&uploaded("2-2-later.txt")).await;

        assert_eq!(late.events.recv().await, Some(uploaded("2-2-later.txt")));
        assert!(late.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_per_connection_order() {
        let hub = NotificationHub::new();
        let mut sub = hub.register().await;

        for i in 0..10 {
            hub.broadcast(&uploaded(&format!("{i}-0-f"))).await;
        }
        for i in 0..10 {
            assert_eq!(sub.events.recv().await, Some(uploaded(&format!("{i}-0-f"))));
        }
    }

    #[tokio::test]
    async fn test_closed_connection_does_not_block_others() {
        let hub = NotificationHub::new();
        let gone = hub.register().await;
        let mut alive = hub.register().await;
        drop(gone.events);

        assert_eq!(hub.broadcast(&uploaded("1-1-x")).await, 1);
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(alive.events.recv().await, Some(uploaded("1-1-x")));
    }

    #[tokio::test]
    async fn test_stalled_connection_drops_overflow_only() {
        let hub = NotificationHub::new();
        let mut stalled = hub.register().await;

        for i in 0..EVENT_QUEUE_CAPACITY {
            assert_eq!(hub.broadcast(&uploaded(&format!("{i}-0-f"))).await, 1);
        }

        let mut fresh = hub.register().await;
        assert_eq!(hub.broadcast(&uploaded("overflow")).await, 1);
        assert_eq!(hub.connection_count().await, 2);
        assert_eq!(fresh.events.recv().await, Some(uploaded("overflow")));

        // 积压的事件按顺序保留，溢出的那条被丢弃
        for i in 0..EVENT_QUEUE_CAPACITY {
            assert_eq!(stalled.events.recv().await, Some(uploaded(&format!("{i}-0-f"))));
        }
        assert!(stalled.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let hub = NotificationHub::new();
        let mut sub = hub.register().await;

        assert!(hub.unregister(sub.id).await);
        assert!(!hub.unregister(sub.id).await);
        assert_eq!(hub.broadcast(&uploaded("1-1-x")).await, 0);
        assert_eq!(sub.events.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_all_ends_streams() {
        let hub = NotificationHub::new();
        let mut a = hub.register().await;
        let mut b = hub.register().await;

        assert_eq!(hub.close_all().await, 2);
        assert_eq!(a.events.recv().await, None);
        assert_eq!(b.events.recv().await, None);
    }
}
