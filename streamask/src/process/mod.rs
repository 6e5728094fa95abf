//! Process utilities for the background transfer.
//!
//! The transfer has to outlive the invocation that starts it, so it runs as
//! a detached child tracked only by pid.

mod monitor;
mod spawn;

pub use monitor::{ProcessMonitor, SystemProcesses};
pub use spawn::{spawn_detached, ProcessOptions};
