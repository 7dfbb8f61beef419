//! Forwarder unit control and diagnostics.
//!
//! One [`ServiceController`] instance, parameterized by the configured
//! unit name, backs every command that drives the socks-forwarder
//! service. [`HciProbe`] captures Bluetooth HCI diagnostics as an
//! opaque text reading.

mod command;
mod controller;
mod diagnostics;

pub use command::ServiceCommand;
pub use controller::ServiceController;
pub use diagnostics::HciProbe;
