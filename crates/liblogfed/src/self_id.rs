use std::net::{IpAddr, SocketAddr};

use anyhow::Context;

/// A well-known address we never actually send a packet to: `connect()` on a
/// UDP socket just asks the kernel to pick the route (and thus the local
/// interface) it would use, without putting anything on the wire.
const ROUTE_PROBE_ADDR: &str = "1.1.1.1:80";

/// Determines this node's hostname and primary IPv4 address.
///
/// Shared by the Announcer (which advertises this pair) and the `/ls` JSON
/// response (which echoes it back to clients).
pub fn primary_ipv4_and_hostname() -> anyhow::Result<(String, IpAddr)> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").context("error binding probe socket")?;
    let probe: SocketAddr = ROUTE_PROBE_ADDR.parse().expect("valid hardcoded addr");
    socket
        .connect(probe)
        .context("error connecting probe socket")?;
    let local = socket
        .local_addr()
        .context("error reading local address of probe socket")?;
    let hostname = gethostname::gethostname()
        .into_string()
        .map_err(|_| anyhow::anyhow!("hostname is not valid UTF-8"))?;
    Ok((hostname, local.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_something() {
        // This only needs a route table entry, not actual connectivity.
        let (host, ip) = primary_ipv4_and_hostname().expect("should resolve a local route");
        assert!(!host.is_empty());
        assert!(!ip.is_unspecified());
    }
}
