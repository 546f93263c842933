use std::path::PathBuf;

use crate::index::{FileIndex, PeerFiles};
use crate::peer::PeerTable;

/// Everything an HTTP handler needs, bundled and cheaply `Clone`-able so it
/// can be used as `axum::extract::State`, mirroring the teacher's
/// `ApiState = Api` convention.
#[derive(Clone)]
pub struct ClusterState {
    pub peer_table: PeerTable,
    pub file_index: FileIndex,
    pub peer_files: PeerFiles,
    pub log_root: PathBuf,
    pub http_port: u16,
}

impl ClusterState {
    pub fn new(log_root: PathBuf, http_port: u16) -> Self {
        Self {
            peer_table: crate::peer::new_peer_table(),
            file_index: crate::index::new_file_index(),
            peer_files: crate::index::new_peer_files(),
            log_root,
            http_port,
        }
    }
}
