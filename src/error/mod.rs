//! Error types for the socks-bridge daemon.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
