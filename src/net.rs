//! Local address discovery for the startup banner.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio::net::UdpSocket;

/// Address used only to pick the outbound route; nothing is sent to it.
const PROBE_TARGET: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 80);

/// Returns the address of the interface holding the default route.
///
/// Connecting a UDP socket selects a source address without sending any
/// packets. `None` when the host has no route.
pub async fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
    socket.connect(PROBE_TARGET).await.ok()?;
    socket
        .local_addr()
        .ok()
        .map(|addr| addr.ip())
        .filter(|ip| !ip.is_unspecified())
}

/// Banner text shown once the server is listening.
pub fn banner(ip: Option<IpAddr>, port: u16) -> String {
    match ip {
        Some(ip) => format!("Connected! IP Address: {ip}:{port}"),
        None => "Connected! IP Address: Unavailable".to_string(),
    }
}
