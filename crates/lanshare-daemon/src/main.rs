//! Lanshare Daemon
//!
//! 分享服务进程，负责：
//! - 加载配置并准备存储目录
//! - 提供 HTTP/WebSocket 服务和前端页面
//! - 在终端打印分享地址和二维码

mod service;

use anyhow::Result;
use clap::Parser;
use lanshare_core::{LogLevel, ServerSettings};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lanshare-daemon", version, about = "局域网文件分享服务")]
struct Args {
    /// 配置文件路径 (默认: ~/.config/lanshare/settings.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,
    /// 监听地址
    #[arg(short, long)]
    bind: Option<IpAddr>,
    /// 上传文件存放目录
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// 前端静态资源目录
    #[arg(long)]
    public: Option<PathBuf>,
    /// 分享链接中使用的主机名 (默认自动探测局域网 IP)
    #[arg(long)]
    host: Option<String>,
    /// 日志级别 (error, warn, info, debug, trace)
    #[arg(short, long)]
    log_level: Option<LogLevel>,
    /// 将合并后的设置写回配置文件
    #[arg(long)]
    save_config: bool,
}

impl Args {
    /// 命令行参数覆盖配置文件
    fn apply(self, mut settings: ServerSettings) -> ServerSettings {
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(bind) = self.bind {
            settings.bind_addr = bind;
        }
        if let Some(dir) = self.dir {
            settings.storage_dir = dir;
        }
        if let Some(public) = self.public {
            settings.public_dir = public;
        }
        if let Some(host) = self.host {
            settings.public_host = Some(host);
        }
        if let Some(level) = self.log_level {
            settings.log_level = level;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 桥接 log crate（lanshare-core 使用）到 tracing
    let _ = tracing_log::LogTracer::init();

    let config_path = args.config.clone();
    let save_config = args.save_config;
    let settings = match &config_path {
        Some(path) => ServerSettings::load_from(path),
        None => ServerSettings::load(),
    };
    let settings = args.apply(settings);

    // 初始化日志，RUST_LOG 优先于配置
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(settings.log_level.filter_directive())),
        )
        .try_init();

    tracing::info!("Lanshare Daemon starting...");
    tracing::debug!("配置: {:?}", settings);

    if save_config {
        match &config_path {
            Some(path) => settings.save_to(path)?,
            None => settings.save()?,
        }
        tracing::info!("设置已保存");
    }

    service::run_service(settings).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_settings() {
        let args = Args::parse_from([
            "lanshare-daemon",
            "--port",
            "8080",
            "--dir",
            "/tmp/share",
            "--log-level",
            "debug",
        ]);
        let settings = args.apply(ServerSettings::default());

        assert_eq!(settings.port, 8080);
        assert_eq!(settings.storage_dir, PathBuf::from("/tmp/share"));
        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.public_dir, PathBuf::from("public"));
    }

    #[test]
    fn test_save_config_flag() {
        assert!(Args::parse_from(["lanshare-daemon", "--save-config"]).save_config);
        assert!(!Args::parse_from(["lanshare-daemon"]).save_config);
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let base = ServerSettings {
            port: 9000,
            public_host: Some("share.lan".to_string()),
            ..Default::default()
        };
        let settings = Args::parse_from(["lanshare-daemon"]).apply(base.clone());
        assert_eq!(settings, base);
    }
}
