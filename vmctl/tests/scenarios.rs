//! End-to-end scenarios: command line in, console output, exit status and
//! heartbeat file out, against a scripted VM control client.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vmctl::console::Captured;
use vmctl::{cli, commands, Console, ControllerConfig, ExitStatus};
use vmctl_client::mock::{Call, ScriptedClient};
use vmctl_client::{Operation, PowerOnOptions};
use vmctl_core::PowerStateBits;

const ON: PowerStateBits = PowerStateBits::POWERED_ON;
const OFF: PowerStateBits = PowerStateBits::POWERED_OFF;

fn config_in(dir: &Path) -> ControllerConfig {
    let mut config = ControllerConfig::default();
    config.heartbeat_path = dir.join("heartbeat.log");
    config.poll_interval_ms = 1;
    config.guest_ready_timeout_secs = 1;
    config
}

async fn run(client: &ScriptedClient, args: &[&str], config: &ControllerConfig) -> (ExitStatus, Captured) {
    let args: Vec<String> = args.iter().map(|s| (*s).to_owned()).collect();
    let invocation = match cli::parse(&args) {
        Ok(i) => i,
        Err(e) => panic!("unexpected usage error: {e}"),
    };
    let (console, captured) = Console::captured();
    let status =
        commands::execute(client, &invocation, config, &console, &CancellationToken::new()).await;
    (status, captured)
}

fn tempdir() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => panic!("tempdir: {e}"),
    }
}

/// Scenario A: start with wait, heartbeat and two guest variables.
#[tokio::test]
async fn start_wait_heartbeat_records_running_state_and_variables() {
    let dir = tempdir();
    let config = config_in(dir.path());
    let client = ScriptedClient::new()
        .with_states([OFF, ON, OFF])
        .with_variable("ip", "10.0.0.5")
        .with_variable("status", "ready")
        .probing(&config.heartbeat_path);

    let (status, out) = run(
        &client,
        &["start", "vm.vmx", "-wait", "-heartbeat", "-var", "ip status"],
        &config,
    )
    .await;

    assert_eq!(status, ExitStatus::Success);
    assert!(out.stdout().contains("Virtual machine started"));
    assert_eq!(client.count(&Call::PowerOn(PowerOnOptions::LaunchGui)), 1);

    // Samples: start check, RUNNING tick, STOPPED tick. probed[2] shows the
    // file as written by the RUNNING tick.
    let probed = client.probed();
    let running = probed.get(2).cloned().flatten().unwrap_or_default();
    assert!(running.contains("state = RUNNING\n"), "got {running:?}");
    assert!(running.contains("ip = 10.0.0.5\n"));
    assert!(running.contains("status = ready\n"));

    let last = std::fs::read_to_string(&config.heartbeat_path).unwrap_or_default();
    assert!(last.ends_with("state = STOPPED\n"), "got {last:?}");

    let calls = client.calls();
    assert_eq!(calls.last(), Some(&Call::Disconnect));
    assert_eq!(client.count(&Call::ReleaseHandle), 1);
}

/// Scenario B: status on a powered-off VM.
#[tokio::test]
async fn status_of_powered_off_vm_exits_11() {
    let dir = tempdir();
    let client = ScriptedClient::new().with_states([OFF]);

    let (status, out) = run(&client, &["status", "vm.vmx"], &config_in(dir.path())).await;

    assert_eq!(status, ExitStatus::PoweredOff);
    assert_eq!(status.code(), 11);
    assert!(out.stdout().contains("Virtual machine is powered off"));
}

#[tokio::test]
async fn status_of_running_vm_prints_ip_and_exits_10() {
    let dir = tempdir();
    let client = ScriptedClient::new().with_states([ON]).with_variable("ip", "10.0.0.5");

    let (status, out) = run(&client, &["-status", "vm.vmx"], &config_in(dir.path())).await;

    assert_eq!(status.code(), 10);
    assert!(out.stdout().contains("Virtual machine is powered on"));
    assert!(out.stdout().contains("IP Address: 10.0.0.5"));
}

/// Scenario C: start without wait on a running VM.
#[tokio::test]
async fn start_on_running_vm_skips_power_on_and_loop() {
    let dir = tempdir();
    let client = ScriptedClient::new().with_states([ON]);

    let (status, out) = run(&client, &["start", "vm.vmx"], &config_in(dir.path())).await;

    assert_eq!(status, ExitStatus::Success);
    assert!(out.stdout().contains("Virtual machine already running"));
    assert_eq!(client.count(&Call::PowerOn(PowerOnOptions::LaunchGui)), 0);
    assert_eq!(client.count(&Call::ReadPowerState), 1, "no poll loop may run");
}

/// Scenario D: connect failure for every command.
#[tokio::test]
async fn connect_failure_is_fatal_for_every_command() {
    for command in ["start", "stop", "suspend", "status", "getip"] {
        let dir = tempdir();
        let client = ScriptedClient::new().failing(Operation::Connect, 20000);

        let (status, out) = run(&client, &[command, "vm.vmx", "-wait"], &config_in(dir.path())).await;

        assert_eq!(status, ExitStatus::Failure, "{command} must fail");
        assert!(
            out.stderr().contains("Failed to connect to host [20000]"),
            "{command}: got {:?}",
            out.stderr()
        );
        assert_eq!(client.calls(), vec![Call::Connect], "{command} must stop after connect");
    }
}

#[tokio::test]
async fn open_failure_disconnects_session() {
    let dir = tempdir();
    let client = ScriptedClient::new().failing(Operation::OpenVm, 4);

    let (status, out) = run(&client, &["stop", "missing.vmx"], &config_in(dir.path())).await;

    assert_eq!(status, ExitStatus::Failure);
    assert!(out.stderr().contains("Failed to open virtual machine [4]"));
    assert_eq!(
        client.calls(),
        vec![Call::Connect, Call::OpenVm("missing.vmx".to_owned()), Call::Disconnect]
    );
}

#[tokio::test]
async fn power_on_failure_releases_resources() {
    let dir = tempdir();
    let client = ScriptedClient::new().with_states([OFF]).failing(Operation::PowerOn, 3006);

    let (status, out) = run(&client, &["start", "vm.vmx", "-nogui", "-wait"], &config_in(dir.path())).await;

    assert_eq!(status, ExitStatus::Failure);
    assert!(out.stderr().contains("Failed to start virtual machine [3006]"));
    assert_eq!(client.count(&Call::PowerOn(PowerOnOptions::Headless)), 1);
    assert_eq!(client.count(&Call::ReleaseHandle), 1);
    assert_eq!(client.count(&Call::Disconnect), 1);
}

#[tokio::test]
async fn stop_and_suspend_report_outcome() {
    let dir = tempdir();
    let client = ScriptedClient::new();
    let (status, out) = run(&client, &["-stop", "vm.vmx"], &config_in(dir.path())).await;
    assert_eq!(status, ExitStatus::Success);
    assert!(out.stdout().contains("Stopped virtual machine"));

    let client = ScriptedClient::new().failing(Operation::Suspend, 3006);
    let (status, out) = run(&client, &["suspend", "vm.vmx"], &config_in(dir.path())).await;
    assert_eq!(status, ExitStatus::Failure);
    assert!(out
        .stderr()
        .contains("Failed to suspend virtual machine, may have already been stopped [3006]"));
}

#[tokio::test]
async fn getip_without_guest_value_still_succeeds() {
    let dir = tempdir();
    let client = ScriptedClient::new().with_states([ON]);

    let (status, out) = run(&client, &["getip", "vm.vmx"], &config_in(dir.path())).await;

    assert_eq!(status, ExitStatus::Success);
    assert!(out.stdout().contains("Could not obtain IP Address"));
    assert!(out.stderr().contains("Failed to get guest variable `ip`"));
}

#[tokio::test]
async fn heartbeat_write_failure_does_not_stop_lifecycle() {
    let dir = tempdir();
    let mut config = config_in(dir.path());
    config.heartbeat_path = dir.path().join("no-such-dir").join("heartbeat.log");
    let client = ScriptedClient::new().with_states([OFF, ON, ON, OFF]);

    let (status, out) = run(&client, &["start", "vm.vmx", "-wait", "-heartbeat"], &config).await;

    assert_eq!(status, ExitStatus::Success);
    assert_eq!(client.count(&Call::ReadPowerState), 4);
    assert!(out.stderr().contains("failed to open heartbeat file"));
}

#[tokio::test]
async fn cancelled_wait_still_releases_resources() {
    let dir = tempdir();
    let config = config_in(dir.path());
    let client = ScriptedClient::new().with_states([ON]);
    let args: Vec<String> = ["start", "vm.vmx", "-wait"].iter().map(|s| (*s).to_owned()).collect();
    let invocation = match cli::parse(&args) {
        Ok(i) => i,
        Err(e) => panic!("unexpected usage error: {e}"),
    };
    let (console, captured) = Console::captured();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let interrupt = async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    };
    let (status, ()) = tokio::join!(
        commands::execute(&client, &invocation, &config, &console, &cancel),
        interrupt
    );

    assert_eq!(status, ExitStatus::Success);
    assert!(captured.stdout().contains("Stopped waiting for virtual machine"));
    assert_eq!(client.calls().last(), Some(&Call::Disconnect));
}
