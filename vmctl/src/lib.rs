//! Single-VM controller.
//!
//! Starts, stops, suspends and queries one virtual machine and, after a
//! start, can poll it until it powers off while keeping a heartbeat file
//! with its latest observed state and guest variables.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod console;
pub mod error;
pub mod heartbeat;
pub mod interrupt;
pub mod poller;

pub use cli::{Command, Invocation};
pub use config::ControllerConfig;
pub use console::Console;
pub use error::{ExitStatus, VmctlError};
