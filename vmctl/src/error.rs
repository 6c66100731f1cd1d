//! Error types and exit status mapping for the controller.

use std::process::ExitCode;

use vmctl_client::{ClientError, Operation};
use vmctl_core::CoreError;

use crate::config::ConfigError;

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    /// `status` found the VM powered on.
    PoweredOn,
    /// `status` found the VM powered off.
    PoweredOff,
}

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::PoweredOn => 10,
            Self::PoweredOff => 11,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Problems with the command line. All of them print usage.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum UsageError {
    #[error("missing command or vmx path")]
    MissingArguments,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("-var requires a space separated list of variable names")]
    MissingVarValue,

    #[error(transparent)]
    InvalidVariable(#[from] CoreError),

    /// Not a failure of parsing, but still ends in usage and a failure status.
    #[error("help requested")]
    HelpRequested,
}

/// Errors that end an invocation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum VmctlError {
    /// A fatal failure from the control client.
    #[error("{}", fatal_message(.0))]
    Client(#[from] ClientError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl VmctlError {
    /// Every error ends the process with the generic failure status.
    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        ExitStatus::Failure
    }
}

/// Console message for a client failure, always ending in the vendor code.
#[must_use]
pub fn fatal_message(err: &ClientError) -> String {
    let what = match err.operation() {
        Operation::Connect => "Failed to connect to host",
        Operation::OpenVm => "Failed to open virtual machine",
        Operation::PowerOn => "Failed to start virtual machine",
        Operation::PowerOff => "Failed to stop virtual machine, may have already been stopped",
        Operation::Suspend => "Failed to suspend virtual machine, may have already been stopped",
        Operation::ReadPowerState => "Failed to get virtual machine status",
        Operation::WaitForGuest => "VM not yet loaded",
        Operation::ReadGuestVariable => "Failed to get guest variable",
    };
    let detail = match err {
        ClientError::CommandFailed { message, .. } => message.clone(),
        other => other.to_string(),
    };
    format!("{what} [{}]: {detail}", err.code())
}
