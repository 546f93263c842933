use tokio::net::UdpSocket;
use tracing::{debug, trace};

use super::{MulticastOptions, RECV_BUFFER_LEN, bind_multicast_receiver};
use crate::peer::{Peer, PeerTable, record_announcement};

/// Joins the multicast group and records every well-formed announcement
/// into the Peer Table. Malformed or oversized-and-truncated payloads are
/// dropped silently, per spec.
pub struct Listener {
    opts: MulticastOptions,
    table: PeerTable,
}

impl Listener {
    pub fn new(opts: MulticastOptions, table: PeerTable) -> Self {
        Self { opts, table }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let std_socket: std::net::UdpSocket = bind_multicast_receiver(&self.opts)?.into();
        let socket = UdpSocket::from_std(std_socket)?;

        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        loop {
            let (len, from) = match socket.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(e) => {
                    debug!(error = %e, "error receiving multicast datagram");
                    continue;
                }
            };

            match serde_json::from_slice::<Peer>(&buf[..len]) {
                Ok(peer) => {
                    trace!(?peer, %from, "received announcement");
                    record_announcement(&self.table, peer);
                }
                Err(e) => {
                    debug!(%from, error = %e, "dropping malformed announcement");
                }
            }
        }
    }
}
