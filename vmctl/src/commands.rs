//! Command dispatch and the per-command handlers.
//!
//! [`execute`] owns the session and VM handle for the whole invocation and
//! releases both on every path, including failures inside a handler.

use tokio_util::sync::CancellationToken;
use vmctl_client::{VmControl, VmHandle};
use vmctl_core::PowerState;

use crate::cli::{Command, Invocation};
use crate::config::ControllerConfig;
use crate::console::Console;
use crate::error::{ExitStatus, VmctlError};
use crate::heartbeat::HeartbeatRecorder;
use crate::poller::{read_guest_variables, PollOutcome, PollSession};

/// Run one parsed invocation against `client`.
///
/// Connect and open failures, and any fatal failure inside the handler,
/// are reported on the error stream and yield [`ExitStatus::Failure`].
pub async fn execute<C: VmControl + ?Sized>(
    client: &C,
    invocation: &Invocation,
    config: &ControllerConfig,
    console: &Console,
    cancel: &CancellationToken,
) -> ExitStatus {
    let mut session = match client.connect().await {
        Ok(session) => session,
        Err(e) => return fail(console, e.into()),
    };

    let mut vm = match client.open_vm(&session, &invocation.vmx).await {
        Ok(vm) => vm,
        Err(e) => {
            client.disconnect(&mut session).await;
            return fail(console, e.into());
        }
    };

    tracing::debug!(command = %invocation.command, vmx = %vm.path, "dispatching");
    let result = dispatch(client, &vm, invocation, config, console, cancel).await;

    client.release_handle(&mut vm).await;
    client.disconnect(&mut session).await;

    result.unwrap_or_else(|e| fail(console, e))
}

fn fail(console: &Console, err: VmctlError) -> ExitStatus {
    console.error(&err);
    err.exit_status()
}

async fn dispatch<C: VmControl + ?Sized>(
    client: &C,
    vm: &VmHandle,
    invocation: &Invocation,
    config: &ControllerConfig,
    console: &Console,
    cancel: &CancellationToken,
) -> Result<ExitStatus, VmctlError> {
    match invocation.command {
        Command::Start => start(client, vm, invocation, config, console, cancel).await,
        Command::Stop => {
            client.power_off(vm).await?;
            console.info("Stopped virtual machine");
            Ok(ExitStatus::Success)
        }
        Command::Suspend => {
            client.suspend(vm).await?;
            console.info("Suspended virtual machine");
            Ok(ExitStatus::Success)
        }
        Command::Status => status(client, vm, config, console).await,
        Command::GetIp => {
            print_ip(client, vm, config, console).await;
            Ok(ExitStatus::Success)
        }
    }
}

async fn start<C: VmControl + ?Sized>(
    client: &C,
    vm: &VmHandle,
    invocation: &Invocation,
    config: &ControllerConfig,
    console: &Console,
    cancel: &CancellationToken,
) -> Result<ExitStatus, VmctlError> {
    let bits = client.read_power_state(vm).await?;
    if bits.classify() == PowerState::PoweredOn {
        console.info("Virtual machine already running");
    } else {
        client.power_on(vm, invocation.power_on).await?;
        console.info("Virtual machine started");
    }

    let recorder = HeartbeatRecorder::new(config.heartbeat_path.clone(), invocation.heartbeat);
    let report = PollSession::new(client, vm, &recorder, console)
        .variables(&invocation.variables)
        .interval(config.poll_interval())
        .startup_wait(config.startup_wait())
        .guest_ready_timeout(config.guest_ready_timeout())
        .wait_for_exit(invocation.wait)
        .run(cancel)
        .await?;

    match report.outcome {
        PollOutcome::NotRequested => {}
        PollOutcome::Stopped => console.info("Virtual machine exited"),
        PollOutcome::Cancelled => console.info("Stopped waiting for virtual machine"),
    }
    Ok(ExitStatus::Success)
}

async fn status<C: VmControl + ?Sized>(
    client: &C,
    vm: &VmHandle,
    config: &ControllerConfig,
    console: &Console,
) -> Result<ExitStatus, VmctlError> {
    let bits = client.read_power_state(vm).await?;
    if bits.classify() == PowerState::PoweredOn {
        console.info("Virtual machine is powered on");
        print_ip(client, vm, config, console).await;
        Ok(ExitStatus::PoweredOn)
    } else {
        console.info("Virtual machine is powered off");
        Ok(ExitStatus::PoweredOff)
    }
}

/// Look up the guest's `ip` variable. Failures only degrade the output.
async fn print_ip<C: VmControl + ?Sized>(
    client: &C,
    vm: &VmHandle,
    config: &ControllerConfig,
    console: &Console,
) {
    let names = ["ip".to_owned()];
    let values =
        read_guest_variables(client, vm, &names, config.guest_ready_timeout(), console).await;
    match values.first().map(|v| v.value.as_str()) {
        Some(ip) if !ip.is_empty() => console.info(format!("IP Address: {ip}")),
        _ => console.info("Could not obtain IP Address"),
    }
}
