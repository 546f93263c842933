//! The Indexer: polls every known peer's `/ls` on a fixed cadence and
//! folds the replies into the File Index (filename -> peer) and Peer Files
//! (peer -> filenames) maps, which HTTP handlers read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use arc_swap::ArcSwap;
use tracing::{debug, warn};

use crate::peer::{Peer, PeerTable};

/// `filename -> Peer` that serves it. Last-writer-wins within a single
/// indexing cycle if two peers expose the same filename; no conflict
/// resolution is attempted (this mirrors the source and is called out in
/// the spec as a known, accepted ambiguity).
pub type FileIndex = Arc<ArcSwap<HashMap<String, Peer>>>;

/// `"ip:port" -> filenames` as reported by that peer's last successful
/// `/ls`, used to answer cluster-wide listing requests.
pub type PeerFiles = Arc<ArcSwap<HashMap<String, Vec<String>>>>;

pub fn new_file_index() -> FileIndex {
    Arc::new(ArcSwap::from_pointee(HashMap::new()))
}

pub fn new_peer_files() -> PeerFiles {
    Arc::new(ArcSwap::from_pointee(HashMap::new()))
}

pub struct Indexer {
    peer_table: PeerTable,
    file_index: FileIndex,
    peer_files: PeerFiles,
    client: reqwest::Client,
    poll_interval: Duration,
}

impl Indexer {
    pub fn new(
        peer_table: PeerTable,
        file_index: FileIndex,
        peer_files: PeerFiles,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("error building indexer HTTP client")?;
        Ok(Self {
            peer_table,
            file_index,
            peer_files,
            client,
            poll_interval,
        })
    }

    /// Runs forever: one `run_cycle` per `poll_interval` tick.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// Snapshots the Peer Table, polls every peer, and atomically publishes
    /// a freshly rebuilt File Index and Peer Files. A peer that fails to
    /// respond is simply absent from both maps until it succeeds again in a
    /// later cycle; it is never pruned from the Peer Table itself.
    async fn run_cycle(&self) {
        let snapshot: Vec<Peer> = self
            .peer_table
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut new_file_index = HashMap::new();
        let mut new_peer_files = HashMap::new();

        for peer in snapshot {
            match self.poll_peer(&peer).await {
                Ok(files) => {
                    for filename in &files {
                        new_file_index.insert(filename.clone(), peer.clone());
                    }
                    new_peer_files.insert(peer.key(), files);
                }
                Err(e) => {
                    warn!(peer = %peer.key(), error = %e, "peer unreachable, dropping from this cycle");
                }
            }
        }

        debug!(
            peers = new_peer_files.len(),
            files = new_file_index.len(),
            "indexing cycle complete"
        );
        self.file_index.store(Arc::new(new_file_index));
        self.peer_files.store(Arc::new(new_peer_files));
    }

    async fn poll_peer(&self, peer: &Peer) -> anyhow::Result<Vec<String>> {
        let url = format!("{}/ls", peer.base_url());
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/plain")
            .send()
            .await
            .with_context(|| format!("error connecting to {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("{url} responded with {}", response.status());
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("error reading response body from {url}"))?;
        Ok(body.split_whitespace().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer::new_peer_table;

    #[test]
    fn file_index_and_peer_files_start_empty() {
        assert!(new_file_index().load().is_empty());
        assert!(new_peer_files().load().is_empty());
    }

    #[tokio::test]
    async fn cycle_against_empty_peer_table_publishes_empty_maps() {
        let indexer = Indexer::new(
            new_peer_table(),
            new_file_index(),
            new_peer_files(),
            Duration::from_secs(2),
            Duration::from_secs(1),
        )
        .unwrap();
        indexer.run_cycle().await;
        assert!(indexer.file_index.load().is_empty());
        assert!(indexer.peer_files.load().is_empty());
    }
}
