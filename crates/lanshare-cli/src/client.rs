//! HTTP Client - 与分享服务通信

use anyhow::{Context, Result, anyhow, bail};
use futures_util::StreamExt;
use lanshare_core::{ErrorBody, FileRecord, ServerInfo, ShareEvent, UploadResponse};
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::io::ReaderStream;

pub struct ShareClient {
    base: String,
    http: reqwest::Client,
}

impl ShareClient {
    pub fn new(base: &str) -> Result<Self> {
        let base = base.trim_end_matches('/').to_string();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            bail!("服务地址必须以 http:// 或 https:// 开头: {base}");
        }
        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// 实时通知地址
    pub fn ws_url(&self) -> String {
        let rest = self
            .base
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                self.base
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| self.base.clone());
        format!("{rest}/ws")
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        let resp = self.http.get(self.url("/server-info")).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        let resp = self.http.get(self.url("/files")).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    /// 流式上传单个文件
    pub async fn upload(&self, path: &Path) -> Result<FileRecord> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("无效的文件名: {}", path.display()))?
            .to_string();
        let file = File::open(path)
            .await
            .with_context(|| format!("无法打开 {}", path.display()))?;
        let len = file.metadata().await?.len();

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len).file_name(name);
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let resp: UploadResponse = check(resp).await?.json().await?;
        Ok(resp.file)
    }

    /// 下载文件到指定目录，返回保存路径和字节数
    pub async fn download(&self, name: &str, dir: &Path) -> Result<(PathBuf, u64)> {
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| anyhow!("无效的文件名: {name}"))?;
        let dest = dir.join(file_name);

        let resp = self
            .http
            .get(self.url(&format!("/download/{}", urlencoding::encode(name))))
            .send()
            .await?;
        let resp = check(resp).await?;

        tokio::fs::create_dir_all(dir).await?;
        let file = File::create(&dest)
            .await
            .with_context(|| format!("无法创建 {}", dest.display()))?;

        match save_stream(file, resp.bytes_stream()).await {
            Ok(written) => Ok((dest, written)),
            Err(e) => {
                // 不保留下载了一半的文件
                let _ = tokio::fs::remove_file(&dest).await;
                Err(e.context(format!("下载 {name} 失败")))
            }
        }
    }

    /// 订阅实时通知，直到服务端关闭连接
    pub async fn watch<F>(&self, mut on_event: F) -> Result<()>
    where
        F: FnMut(ShareEvent),
    {
        let (mut ws_stream, _) = connect_async(self.ws_url()).await?;

        while let Some(msg) = ws_stream.next().await {
            match msg? {
                Message::Text(text) => match ShareEvent::parse(&text) {
                    Some(event) => on_event(event),
                    None => eprintln!("⚠️  未知消息: {text}"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }
}

/// 把字节流写入文件，返回写入的字节数
async fn save_stream<S, B, E>(mut file: File, stream: S) -> Result<u64>
where
    S: futures_util::Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut stream = std::pin::pin!(stream);
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let chunk = chunk.as_ref();
        file.write_all(chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// 将错误响应转换为 `anyhow` 错误
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = match resp.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    bail!("服务器返回 {}: {}", status.as_u16(), message)
}
