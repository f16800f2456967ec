pub mod client;
pub mod model;

pub use client::PeerClient;
pub use model::{Node, Peer, SyncAction};
