use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// One announced peer: `{host, ip, port}` as carried in the multicast datagram.
///
/// Receivers must accept extra fields in the payload (forward-compat), hence
/// `deny_unknown_fields` is deliberately not set here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub host: String,
    pub ip: String,
    pub port: u16,
}

impl Peer {
    /// The `"ip:port"` identity key used throughout the routing tables.
    pub fn key(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }
}

/// Mapping `"ip:port" -> Peer`, written by the Listener and read by the Indexer.
///
/// A `DashMap` gives each insert/overwrite O(1) work without a single coarse
/// lock, the same tradeoff the teacher makes for its concurrently-written
/// routing-style maps (e.g. `librqbit-dht`'s `peer_store::PeerStore`).
pub type PeerTable = Arc<DashMap<String, Peer>>;

pub fn new_peer_table() -> PeerTable {
    Arc::new(DashMap::new())
}

/// Insert or overwrite a peer record, keyed by its own `ip:port`.
///
/// Maintains the invariant that every key in the table matches its value's
/// `ip:port` by deriving the key from the peer itself rather than trusting a
/// caller-supplied key.
pub fn record_announcement(table: &PeerTable, peer: Peer) {
    table.insert(peer.key(), peer);
}
