//! 实时推送消息格式
//!
//! 服务端通过 WebSocket 文本帧推送 JSON:
//!
//! ```json
//! {"event": "file_uploaded", "data": {"name": "...", "size": 1, "mtime": "..."}}
//! ```
//!
//! 客户端到服务端没有定义任何消息。

use crate::storage::FileRecord;
use serde::{Deserialize, Serialize};

/// 推送给浏览器的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ShareEvent {
    /// 新文件上传完成
    FileUploaded(FileRecord),
}

impl ShareEvent {
    /// 事件名称
    pub fn name(&self) -> &'static str {
        match self {
            ShareEvent::FileUploaded(_) => "file_uploaded",
        }
    }

    /// 编码为 WebSocket 文本帧
    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 解析服务端推送的文本帧
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record() -> FileRecord {
        FileRecord {
            name: "1700000000000-42-cat.png".to_string(),
            size: 10_000,
            mtime: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn test_wire_format() {
        let text = ShareEvent::FileUploaded(record()).to_text().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["event"], "file_uploaded");
        assert_eq!(value["data"]["name"], "1700000000000-42-cat.png");
        assert_eq!(value["data"]["size"], 10_000);
        assert_eq!(value["data"]["mtime"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_parse() {
        let text = r#"{"event":"file_uploaded","data":{"name":"1700000000000-42-cat.png","size":10000,"mtime":"2024-01-02T03:04:05Z"}}"#;
        let event = ShareEvent::parse(text).unwrap();
        assert_eq!(event.name(), "file_uploaded");
        assert_eq!(event, ShareEvent::FileUploaded(record()));
    }

    #[test]
    fn test_parse_unknown_event() {
        assert!(ShareEvent::parse(r#"{"event":"file_deleted","data":{}}"#).is_none());
        assert!(ShareEvent::parse("not json").is_none());
    }
}
