//! LAN address discovery and landing-page launch.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

use tracing::{debug, info};

/// Address of the interface that routes to the public internet.
///
/// "Connecting" a UDP socket only selects a route; no packet is sent.
pub fn local_ip() -> IpAddr {
    let routed = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80))?;
        Ok(socket.local_addr()?.ip())
    };
    routed().unwrap_or_else(|e| {
        debug!(error = %e, "no routable interface; using loopback");
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    })
}

pub fn chat_url(ip: IpAddr, port: u16) -> String {
    format!("http://{ip}:{port}/chat")
}

/// Loopback landing page advertising `chat_url`.
pub fn landing_url(port: u16, chat_url: &str) -> String {
    format!("http://127.0.0.1:{port}/?u={chat_url}")
}

/// Open `url` in the desktop browser after `delay`. Failures are only logged.
pub fn open_browser_later(url: String, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let target = url.clone();
        match tokio::task::spawn_blocking(move || open::that(&target)).await {
            Ok(Ok(())) => info!(%url, "opened landing page in browser"),
            Ok(Err(e)) => debug!(%url, error = %e, "could not open browser"),
            Err(e) => debug!(%url, error = %e, "browser launcher panicked"),
        }
    });
}
