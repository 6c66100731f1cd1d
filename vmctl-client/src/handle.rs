//! Session and VM handles.

use chrono::{DateTime, TimeDelta, Utc};

/// A connection to the virtualization host.
///
/// Dropping a session does NOT disconnect it. Call
/// [`VmControl::disconnect`](crate::VmControl::disconnect) explicitly.
#[derive(Debug)]
#[non_exhaustive]
pub struct Session {
    /// Human-readable host label for logs.
    pub host: String,

    /// When the session was established.
    pub connected_at: DateTime<Utc>,

    open: bool,
}

impl Session {
    /// Create an open session.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), connected_at: Utc::now(), open: true }
    }

    /// Whether the session has not been disconnected yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Time since the session was established.
    #[must_use]
    pub fn connected_for(&self) -> TimeDelta {
        Utc::now() - self.connected_at
    }

    /// Mark the session closed. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }
}

/// A handle to one virtual machine, resolved from its descriptor path.
///
/// Dropping this handle does NOT release it. Call
/// [`VmControl::release_handle`](crate::VmControl::release_handle).
#[derive(Debug)]
#[non_exhaustive]
pub struct VmHandle {
    /// Descriptor path as the backend addresses it.
    pub path: String,

    released: bool,
}

impl VmHandle {
    /// Create a live handle for `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), released: false }
    }

    /// Whether the handle has been released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Mark the handle released. Returns `false` if it already was.
    pub fn release(&mut self) -> bool {
        !std::mem::replace(&mut self.released, true)
    }
}
