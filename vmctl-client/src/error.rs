//! Error types and failure classification for the control client.

use std::fmt;
use std::path::PathBuf;

/// Vendor code reported when a file (binary or VM descriptor) is missing.
pub const CODE_FILE_NOT_FOUND: i32 = 4;
/// Vendor code reported for unusable host connection settings.
pub const CODE_INVALID_ARG: i32 = 3;
/// Vendor code reported when guest tools did not come up in time.
pub const CODE_TOOLS_TIMEOUT: i32 = 3016;
/// Generic vendor failure code.
pub const CODE_FAIL: i32 = 1;

/// Operations exposed by a [`VmControl`](crate::VmControl) implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    OpenVm,
    PowerOn,
    PowerOff,
    Suspend,
    ReadPowerState,
    WaitForGuest,
    ReadGuestVariable,
}

/// How a failed operation affects the invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the whole invocation after releasing resources.
    Fatal,
    /// Degrade one observation and carry on.
    Soft,
}

impl Operation {
    /// The single place where failures are sorted into fatal and soft.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Connect
            | Self::OpenVm
            | Self::PowerOn
            | Self::PowerOff
            | Self::Suspend
            | Self::ReadPowerState => Severity::Fatal,
            Self::WaitForGuest | Self::ReadGuestVariable => Severity::Soft,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::OpenVm => "open",
            Self::PowerOn => "power on",
            Self::PowerOff => "power off",
            Self::Suspend => "suspend",
            Self::ReadPowerState => "read power state",
            Self::WaitForGuest => "wait for guest",
            Self::ReadGuestVariable => "read guest variable",
        })
    }
}

/// Errors that can occur while talking to the virtualization host.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The `vmrun` binary was not found at the configured path or in `PATH`.
    #[error("vmrun binary not found at {path}")]
    BinaryNotFound { path: PathBuf },

    /// Host connection settings are incomplete or inconsistent.
    #[error("invalid host settings: {reason}")]
    InvalidHost { reason: String },

    /// The VM descriptor does not exist.
    #[error("virtual machine not found: {path}")]
    VmNotFound { path: String },

    /// The VM descriptor path cannot be made absolute.
    #[error("invalid virtual machine path {path}: {source}")]
    InvalidVmPath {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend reported a failure for an operation.
    #[error("{operation} failed [{code}]: {message}")]
    CommandFailed {
        operation: Operation,
        code: i32,
        message: String,
    },

    /// Guest tools did not report ready before the timeout elapsed.
    #[error("guest not ready after {timeout_secs}s")]
    GuestNotReady { timeout_secs: u64 },

    /// The backend process could not be launched.
    #[error("{operation} could not run vmrun: {source}")]
    Spawn {
        operation: Operation,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// The operation that failed.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::BinaryNotFound { .. } | Self::InvalidHost { .. } => Operation::Connect,
            Self::VmNotFound { .. } | Self::InvalidVmPath { .. } => Operation::OpenVm,
            Self::GuestNotReady { .. } => Operation::WaitForGuest,
            Self::CommandFailed { operation, .. } | Self::Spawn { operation, .. } => *operation,
        }
    }

    /// The vendor error code to report.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::BinaryNotFound { .. }
            | Self::VmNotFound { .. }
            | Self::InvalidVmPath { .. } => CODE_FILE_NOT_FOUND,
            Self::InvalidHost { .. } => CODE_INVALID_ARG,
            Self::GuestNotReady { .. } => CODE_TOOLS_TIMEOUT,
            Self::CommandFailed { code, .. } => *code,
            Self::Spawn { source, .. } => source.raw_os_error().unwrap_or(CODE_FAIL),
        }
    }

    /// Fatal or soft, derived from the failing operation.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.operation().severity()
    }

    /// Shorthand for a backend failure.
    #[must_use]
    pub fn failed(operation: Operation, code: i32, message: impl Into<String>) -> Self {
        Self::CommandFailed { operation, code, message: message.into() }
    }
}
