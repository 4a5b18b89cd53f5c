//! 服务配置和持久化
//!
//! 提供监听地址、存储目录等设置的存储和读取。

use crate::logging::LogLevel;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 3000;

/// 服务设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// 监听地址
    pub bind_addr: IpAddr,
    /// 监听端口（0 表示随机端口）
    pub port: u16,
    /// 上传文件存放目录
    pub storage_dir: PathBuf,
    /// 前端静态资源目录
    pub public_dir: PathBuf,
    /// 分享链接中使用的主机名，未设置时自动探测局域网 IP
    pub public_host: Option<String>,
    /// 日志级别
    pub log_level: LogLevel,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            storage_dir: PathBuf::from("uploads"),
            public_dir: PathBuf::from("public"),
            public_host: None,
            log_level: LogLevel::Info,
        }
    }
}

impl ServerSettings {
    /// 获取配置文件路径
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lanshare");
        config_dir.join("settings.toml")
    }

    /// 加载设置（如果文件不存在则使用默认值）
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// 从指定路径加载设置，读取或解析失败时回退到默认值
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(settings) => {
                        debug!("Loaded settings from {:?}", path);
                        return settings;
                    }
                    Err(e) => {
                        warn!("Failed to parse settings: {}, using defaults", e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read settings file: {}, using defaults", e);
                }
            }
        }
        Self::default()
    }

    /// 保存设置
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    /// 保存设置到指定路径
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ServerSettings::default();
        assert_eq!(settings.port, 3000);
        assert!(settings.bind_addr.is_unspecified());
        assert_eq!(settings.storage_dir, PathBuf::from("uploads"));
        assert!(settings.public_host.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: ServerSettings = toml::from_str(
            r#"
            port = 8080
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.public_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        let settings = ServerSettings {
            port: 9000,
            storage_dir: PathBuf::from("/srv/share"),
            public_host: Some("share.lan".to_string()),
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        assert_eq!(ServerSettings::load_from(&path), settings);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "port = \"not a number\"").unwrap();

        assert_eq!(ServerSettings::load_from(&path), ServerSettings::default());
    }
}
