//! Command executor module.
//!
//! Handles safe subprocess spawning with timeout enforcement.

mod output;
mod subprocess;

pub use output::sanitize_output;
pub use subprocess::{run_command, SubprocessBuilder, SubprocessResult};
