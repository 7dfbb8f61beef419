//! Authentication module.
//!
//! Handles peer credential verification for the Unix socket.

mod peer_creds;

pub use peer_creds::{verify_peer, PeerInfo};
