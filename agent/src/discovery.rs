//! Best-effort discovery of the host peers can reach us on.

use std::net::{IpAddr, UdpSocket};

/// Documentation-range address used only to pick an outbound interface.
/// Connecting a UDP socket sends no packets.
const PROBE_TARGET: &str = "192.0.2.1:9";

/// The configured host if any, otherwise the address of the interface that
/// routes outbound traffic.
pub fn advertise_host(configured: Option<&str>) -> Option<String> {
    if let Some(host) = configured {
        return Some(host.to_string());
    }

    let discovered = discover_local_ip();
    match &discovered {
        Some(ip) => tracing::info!(host = %ip, "Discovered local host"),
        None => tracing::warn!("Could not discover a routable local address"),
    }
    discovered.map(|ip| ip.to_string())
}

fn discover_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect(PROBE_TARGET).ok()?;
    let ip = socket.local_addr().ok()?.ip();

    if ip.is_unspecified() || ip.is_loopback() {
        None
    } else {
        Some(ip)
    }
}
