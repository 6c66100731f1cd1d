//! Control client for a single virtual machine.
//!
//! Defines the [`VmControl`] seam the controller talks through, a backend
//! that drives the product's `vmrun` tool, and a scripted backend for tests.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod error;
pub mod handle;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod vmrun;

pub use backend::VmControl;
pub use config::{HostConfig, HostType, PowerOnOptions};
pub use error::{ClientError, Operation, Severity};
pub use handle::{Session, VmHandle};
pub use vmrun::VmrunClient;
