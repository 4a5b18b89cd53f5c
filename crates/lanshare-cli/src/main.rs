//! Lanshare CLI
//!
//! 命令行客户端，通过 HTTP/WebSocket 与分享服务通信

mod client;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use client::ShareClient;
use futures_util::future::join_all;
use lanshare_core::{FileRecord, ShareEvent, netinfo};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lanshare", version, about = "局域网文件分享 - 命令行客户端")]
struct Cli {
    /// 分享服务地址
    #[arg(
        short,
        long,
        global = true,
        env = "LANSHARE_SERVER",
        default_value = "http://127.0.0.1:3000"
    )]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查看分享地址
    Info,
    /// 列出服务器上的文件
    List,
    /// 上传文件（每个文件单独请求，并发进行）
    Upload {
        /// 要上传的文件路径
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// 下载文件
    Download {
        /// 服务器上的文件名
        name: String,
        /// 保存目录 (默认: ~/Downloads)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// 实时查看新上传的文件
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = ShareClient::new(&cli.server)?;

    match cli.command {
        Commands::Info => {
            let info = client.server_info().await?;
            println!("🔗 {}", info.url);
            if let Ok(qr) = netinfo::qr_terminal(&info.url) {
                println!("{qr}");
            }
        }
        Commands::List => {
            let files = client.list().await?;
            if files.is_empty() {
                println!("   暂无文件");
            }
            for file in &files {
                println!("{}", format_record(file));
            }
        }
        Commands::Upload { files } => {
            let uploads = files.iter().map(|path| client.upload(path));
            let mut failed = 0;
            for (path, result) in files.iter().zip(join_all(uploads).await) {
                match result {
                    Ok(record) => println!("✅ {} -> {}", path.display(), record.name),
                    Err(e) => {
                        failed += 1;
                        eprintln!("❌ {}: {:#}", path.display(), e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{failed} 个文件上传失败");
            }
        }
        Commands::Download { name, output } => {
            let dir = output.unwrap_or_else(|| {
                dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
            });
            let (path, size) = client.download(&name, &dir).await?;
            println!("📥 {} ({})", path.display(), format_size(size));
        }
        Commands::Watch => {
            println!("👀 等待新文件... (Ctrl-C 退出)");
            client
                .watch(|event| match event {
                    ShareEvent::FileUploaded(record) => println!("📄 {}", format_record(&record)),
                })
                .await?;
            println!("连接已关闭");
        }
    }

    Ok(())
}

fn format_record(record: &FileRecord) -> String {
    format!(
        "{}  {:>10}  {}",
        record.mtime.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        format_size(record.size),
        record.name
    )
}

/// 以 1024 为基数的可读大小
#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(10_000), "9.77 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
