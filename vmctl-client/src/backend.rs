//! VM control abstraction trait.
//!
//! The controller only ever talks to the virtualization host through this
//! trait, so the `vmrun` backend can be swapped for a scripted one in tests.

use std::time::Duration;

use async_trait::async_trait;
use vmctl_core::PowerStateBits;

use crate::{ClientError, PowerOnOptions, Session, VmHandle};

/// Control surface for a single virtual machine.
///
/// Every method completes the underlying job before returning; callers
/// never have two operations in flight.
#[async_trait]
pub trait VmControl: Send + Sync {
    /// Establish a session with the virtualization host.
    ///
    /// # Errors
    /// Returns [`ClientError::BinaryNotFound`] or [`ClientError::InvalidHost`]
    /// if the host cannot be reached.
    async fn connect(&self) -> Result<Session, ClientError>;

    /// Resolve a VM descriptor path to a live handle.
    ///
    /// # Errors
    /// Returns [`ClientError::VmNotFound`] if the descriptor does not exist.
    async fn open_vm(&self, session: &Session, path: &str) -> Result<VmHandle, ClientError>;

    /// Power the VM on.
    ///
    /// # Errors
    /// Returns [`ClientError::CommandFailed`] if the host rejects the request.
    async fn power_on(&self, vm: &VmHandle, options: PowerOnOptions) -> Result<(), ClientError>;

    /// Power the VM off.
    ///
    /// # Errors
    /// Returns [`ClientError::CommandFailed`] if the host rejects the request.
    async fn power_off(&self, vm: &VmHandle) -> Result<(), ClientError>;

    /// Suspend the VM.
    ///
    /// # Errors
    /// Returns [`ClientError::CommandFailed`] if the host rejects the request.
    async fn suspend(&self, vm: &VmHandle) -> Result<(), ClientError>;

    /// Sample the current power-state bitmask.
    ///
    /// # Errors
    /// Returns [`ClientError::CommandFailed`] if the state cannot be queried.
    async fn read_power_state(&self, vm: &VmHandle) -> Result<PowerStateBits, ClientError>;

    /// Wait until guest tools report ready, at most `timeout`.
    ///
    /// # Errors
    /// Returns [`ClientError::GuestNotReady`] when the timeout elapses.
    async fn wait_for_guest_ready(&self, vm: &VmHandle, timeout: Duration)
        -> Result<(), ClientError>;

    /// Read a guest variable.
    ///
    /// # Errors
    /// Any failure; callers substitute an empty value and carry on.
    async fn read_guest_variable(&self, vm: &VmHandle, name: &str) -> Result<String, ClientError>;

    /// Release the handle. Safe to call more than once.
    async fn release_handle(&self, vm: &mut VmHandle);

    /// Close the session. Safe to call more than once.
    async fn disconnect(&self, session: &mut Session);
}
