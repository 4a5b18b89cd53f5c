//! 局域网地址探测和二维码生成
//!
//! 用于 `/server-info` 和启动时在终端打印分享地址。

use base64::Engine;
use qrcode::QrCode;
use qrcode::render::{svg, unicode};
use qrcode::types::QrError;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// 探测本机在局域网中的 IPv4 地址
///
/// 通过"连接"一个 UDP socket 让系统选择出口地址，不会发送任何数据包。
/// 无可用路由时回退到 `127.0.0.1`。
pub fn local_ip() -> IpAddr {
    match probe_local_ip() {
        Ok(ip) if !ip.is_unspecified() => ip,
        Ok(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        Err(e) => {
            log::debug!("Local IP probe failed: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

fn probe_local_ip() -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9))?;
    Ok(socket.local_addr()?.ip())
}

/// 生成分享链接 `http://host:port`
pub fn share_url(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("http://[{host}]:{port}")
    } else {
        format!("http://{host}:{port}")
    }
}

/// 生成二维码的 SVG data URL，可直接用作 `<img src>`
pub fn qr_data_url(text: &str) -> Result<String, QrError> {
    let code = QrCode::new(text.as_bytes())?;
    let image = code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .build();
    let encoded = base64::engine::general_purpose::STANDARD.encode(image);
    Ok(format!("data:image/svg+xml;base64,{encoded}"))
}

/// 生成适合终端显示的二维码
pub fn qr_terminal(text: &str) -> Result<String, QrError> {
    let code = QrCode::new(text.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_url() {
        assert_eq!(share_url("192.168.1.20", 3000), "http://192.168.1.20:3000");
        assert_eq!(share_url("fe80::1", 8080), "http://[fe80::1]:8080");
        assert_eq!(share_url("[fe80::1]", 8080), "http://[fe80::1]:8080");
    }

    #[test]
    fn test_qr_data_url() {
        let url = qr_data_url("http://192.168.1.20:3000").unwrap();
        let encoded = url.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        let svg = String::from_utf8(svg).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_qr_too_long() {
        let text = "x".repeat(8000);
        assert!(qr_data_url(&text).is_err());
    }

    #[test]
    fn test_qr_terminal() {
        let art = qr_terminal("http://10.0.0.2:3000").unwrap();
        assert!(art.lines().count() > 10);
    }

    #[test]
    fn test_local_ip_is_not_unspecified() {
        assert!(!local_ip().is_unspecified());
    }
}
