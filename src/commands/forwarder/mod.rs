//! Forwarder commands.
//!
//! Control and readings commands for the socks-forwarder unit.

mod control;
mod readings;

pub use control::ControlForwarderCommand;
pub use readings::ForwarderReadingsCommand;
