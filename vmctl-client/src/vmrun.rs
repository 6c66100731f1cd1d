//! `vmrun` backend implementation.
//!
//! Drives the virtualization product through its `vmrun` command-line
//! tool. Each operation runs one `vmrun` child process to completion.
//!
//! # Command Reference
//! `vmrun -T <type> [-h <host> -u <user> -p <password>] <command> [args]`

use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use vmctl_core::PowerStateBits;

use crate::backend::VmControl;
use crate::error::{Operation, CODE_FAIL};
use crate::{ClientError, HostConfig, PowerOnOptions, Session, VmHandle};

/// Interval between `checkToolsState` probes while waiting for the guest.
const TOOLS_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// `vmrun`-backed VM control client.
#[derive(Debug, Clone)]
pub struct VmrunClient {
    host: HostConfig,
}

impl VmrunClient {
    /// Create a client for the given host settings.
    #[must_use]
    pub fn new(host: HostConfig) -> Self {
        Self { host }
    }

    /// Create a client for local Workstation with `vmrun` from `PATH`.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(HostConfig::default())
    }

    /// Run `vmrun` with the host prefix and `args`, returning its stdout.
    async fn vmrun(&self, operation: Operation, args: &[&str]) -> Result<String, ClientError> {
        let host_args = self.host.vmrun_args()?;

        tracing::debug!(%operation, ?args, "invoking vmrun");

        let output = Command::new(&self.host.vmrun_path)
            .args(&host_args)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ClientError::Spawn { operation, source })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let code = output.status.code().unwrap_or(CODE_FAIL);
        let message = error_message(&stdout, &stderr);
        tracing::debug!(%operation, code, %message, "vmrun failed");
        Err(ClientError::failed(operation, code, message))
    }

    async fn tools_running(&self, vm: &VmHandle) -> Result<bool, ClientError> {
        let out = self
            .vmrun(Operation::WaitForGuest, &["checkToolsState", &vm.path])
            .await?;
        Ok(out.trim().eq_ignore_ascii_case("running"))
    }
}

#[async_trait]
impl VmControl for VmrunClient {
    async fn connect(&self) -> Result<Session, ClientError> {
        which_binary(&self.host.vmrun_path)?;
        // Validates remote host settings before anything is opened.
        self.host.vmrun_args()?;

        let label = match &self.host.host {
            Some(host) if self.host.host_type.is_remote() => format!("{} {host}", self.host.host_type),
            _ => self.host.host_type.to_string(),
        };
        tracing::info!(host = %label, "connected to virtualization host");
        Ok(Session::new(label))
    }

    async fn open_vm(&self, session: &Session, path: &str) -> Result<VmHandle, ClientError> {
        if !session.is_open() {
            return Err(ClientError::failed(Operation::OpenVm, CODE_FAIL, "session is closed"));
        }

        // Remote products address VMs by datastore path, e.g. `[standard] vm/vm.vmx`.
        if self.host.host_type.is_remote() {
            return Ok(VmHandle::new(path));
        }

        let vmx = resolve_vmx(path)?;
        tracing::info!(vmx = %vmx.display(), "opened virtual machine");
        Ok(VmHandle::new(vmx.to_string_lossy().into_owned()))
    }

    async fn power_on(&self, vm: &VmHandle, options: PowerOnOptions) -> Result<(), ClientError> {
        tracing::info!(vmx = %vm.path, ui = options.as_arg(), "powering on");
        self.vmrun(Operation::PowerOn, &["start", &vm.path, options.as_arg()])
            .await
            .map(drop)
    }

    async fn power_off(&self, vm: &VmHandle) -> Result<(), ClientError> {
        tracing::info!(vmx = %vm.path, "powering off");
        self.vmrun(Operation::PowerOff, &["stop", &vm.path, "hard"])
            .await
            .map(drop)
    }

    async fn suspend(&self, vm: &VmHandle) -> Result<(), ClientError> {
        tracing::info!(vmx = %vm.path, "suspending");
        self.vmrun(Operation::Suspend, &["suspend", &vm.path, "hard"])
            .await
            .map(drop)
    }

    async fn read_power_state(&self, vm: &VmHandle) -> Result<PowerStateBits, ClientError> {
        let listing = self.vmrun(Operation::ReadPowerState, &["list"]).await?;
        Ok(power_state_from_list(&listing, &vm.path))
    }

    async fn wait_for_guest_ready(
        &self,
        vm: &VmHandle,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let probe = async {
            while !self.tools_running(vm).await? {
                tokio::time::sleep(TOOLS_PROBE_INTERVAL).await;
            }
            Ok::<(), ClientError>(())
        };

        tokio::time::timeout(timeout, probe)
            .await
            .map_err(|_| ClientError::GuestNotReady { timeout_secs: timeout.as_secs() })?
    }

    async fn read_guest_variable(&self, vm: &VmHandle, name: &str) -> Result<String, ClientError> {
        let out = self
            .vmrun(Operation::ReadGuestVariable, &["readVariable", &vm.path, "guestVar", name])
            .await?;
        Ok(out.trim_end_matches(['\r', '\n']).to_owned())
    }

    async fn release_handle(&self, vm: &mut VmHandle) {
        if vm.release() {
            tracing::debug!(vmx = %vm.path, "released VM handle");
        }
    }

    async fn disconnect(&self, session: &mut Session) {
        if session.close() {
            tracing::debug!(
                host = %session.host,
                connected_secs = session.connected_for().num_seconds(),
                "disconnected from host"
            );
        }
    }
}

/// Resolve a local descriptor path to the absolute, `.`/`..`-free form
/// `vmrun list` reports running VMs under.
fn resolve_vmx(path: &str) -> Result<PathBuf, ClientError> {
    let local = Path::new(path);
    if !local.is_file() {
        return Err(ClientError::VmNotFound { path: path.to_owned() });
    }
    let absolute = std::path::absolute(local)
        .map_err(|source| ClientError::InvalidVmPath { path: path.to_owned(), source })?;
    Ok(normalize(&absolute))
}

/// Lexically remove `.` and `..` components. Symlinks are left alone.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Verify a binary exists either at the given path or in PATH.
fn which_binary(path: &Path) -> Result<PathBuf, ClientError> {
    if path.is_absolute() || path.components().count() > 1 {
        if path.is_file() {
            return Ok(path.to_owned());
        }
        return Err(ClientError::BinaryNotFound { path: path.to_owned() });
    }

    let candidates = |dir: PathBuf| {
        let plain = dir.join(path);
        let exe = dir.join(path).with_extension("exe");
        [plain, exe]
    };

    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default()
        .into_iter()
        .flat_map(candidates)
        .find(|p| p.is_file())
        .ok_or_else(|| ClientError::BinaryNotFound { path: path.to_owned() })
}

/// Derive a power-state bitmask from `vmrun list` output.
///
/// `vmrun list` only reports running VMs, so a listed VM is powered on and
/// anything else is powered off.
fn power_state_from_list(listing: &str, vmx: &str) -> PowerStateBits {
    let running = listing
        .lines()
        .filter(|line| !line.starts_with("Total running VMs"))
        .any(|line| same_vmx(line.trim(), vmx));
    if running {
        PowerStateBits::POWERED_ON
    } else {
        PowerStateBits::POWERED_OFF
    }
}

fn same_vmx(listed: &str, vmx: &str) -> bool {
    if cfg!(windows) {
        listed.eq_ignore_ascii_case(vmx)
    } else {
        listed == vmx
    }
}

/// Extract the human-readable reason from a failed `vmrun` run.
///
/// `vmrun` reports failures as an `Error: ...` line, usually on stdout.
fn error_message(stdout: &str, stderr: &str) -> String {
    let lines = || stdout.lines().chain(stderr.lines()).map(str::trim);
    lines()
        .find_map(|line| line.strip_prefix("Error:").map(str::trim))
        .or_else(|| lines().find(|line| !line.is_empty()))
        .map_or_else(|| "vmrun exited without output".to_owned(), str::to_owned)
}
