use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// The local IP used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only makes the OS pick the
/// route and source address. Without a route (offline host) this falls
/// back to loopback so a single-host fleet still works.
pub fn outbound_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip())
    };

    match probe() {
        Ok(ip) => ip,
        Err(e) => {
            tracing::warn!("Can't determine outbound IP ({}), using loopback", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// Address peers use to reach this instance's coordinator endpoints.
pub fn self_address(coordinator_port: u16) -> String {
    format!("{}:{}", outbound_ip(), coordinator_port)
}
