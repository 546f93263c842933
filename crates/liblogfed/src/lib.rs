//! Federated log-tail service library: multicast peer discovery, a
//! peer-polling indexer, an mmap-backed tail/filter engine, and the HTTP
//! front end that ties them together. The binary crate (`logfedd`) owns CLI
//! parsing, logging bootstrap, and process/signal wiring; everything else
//! lives here, mirroring the teacher's `librqbit` / `rqbit` split.

pub mod discovery;
pub mod filter;
pub mod http;
pub mod index;
pub mod peer;
pub mod self_id;
pub mod spawn;
pub mod state;
pub mod tail;

pub use discovery::{Announcer, Listener, MulticastOptions};
pub use index::Indexer;
pub use state::ClusterState;
