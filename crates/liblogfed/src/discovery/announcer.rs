use std::time::Duration;

use anyhow::Context;
use tokio::net::UdpSocket;
use tracing::warn;

use super::{MulticastOptions, multicast_addr};
use crate::peer::Peer;
use crate::self_id::primary_ipv4_and_hostname;

/// Periodically broadcasts `{host, ip, port}` to the multicast group so
/// other nodes can discover this one.
pub struct Announcer {
    opts: MulticastOptions,
    http_port: u16,
    interval: Duration,
}

impl Announcer {
    pub fn new(opts: MulticastOptions, http_port: u16, interval: Duration) -> Self {
        Self {
            opts,
            http_port,
            interval,
        }
    }

    /// Runs forever, emitting one datagram per tick. Send errors are logged
    /// and retried on the next tick; there is no backoff, as a single
    /// dropped announcement is immaterial (the next one will follow
    /// shortly).
    pub async fn run(self) -> anyhow::Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .context("error binding announce socket")?;
        socket
            .set_multicast_ttl_v4(32)
            .context("error setting multicast TTL")?;

        let target = multicast_addr(&self.opts);
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            ticker.tick().await;
            if let Err(e) = self.announce_once(&socket, target).await {
                warn!(error = %e, "failed to send announcement, will retry next tick");
            }
        }
    }

    async fn announce_once(
        &self,
        socket: &UdpSocket,
        target: std::net::SocketAddr,
    ) -> anyhow::Result<()> {
        let (host, ip) = primary_ipv4_and_hostname()?;
        let payload = Peer {
            host,
            ip: ip.to_string(),
            port: self.http_port,
        };
        let json = serde_json::to_vec(&payload).context("error serializing announcement")?;
        socket
            .send_to(&json, target)
            .await
            .context("error sending announcement datagram")?;
        Ok(())
    }
}
