//! Status poller: samples a started VM until it powers off.
//!
//! Each tick samples the power state, classifies it, writes a heartbeat
//! record and sleeps a fixed interval. The loop ends when the VM is
//! powered off, when the cancellation token fires, or when sampling fails.
//!
//! # Cancel Safety
//! The token is checked before every sample and raced against every
//! sleep. A client call already in flight is allowed to complete.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vmctl_client::{ClientError, VmControl, VmHandle};
use vmctl_core::{GuestVariable, HeartbeatRecord, PowerState};

use crate::console::Console;
use crate::heartbeat::HeartbeatRecorder;

/// How a poll session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Waiting was not requested; no tick ran.
    NotRequested,
    /// The VM was observed powered off.
    Stopped,
    /// The cancellation token fired.
    Cancelled,
}

/// Result of a completed poll session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Number of power-state samples taken.
    pub ticks: u64,
}

/// Working state for one `start` invocation.
///
/// Borrows the client and handle; releasing them is the caller's job.
pub struct PollSession<'a, C: VmControl + ?Sized> {
    client: &'a C,
    vm: &'a VmHandle,
    recorder: &'a HeartbeatRecorder,
    console: &'a Console,
    variables: &'a [String],
    interval: Duration,
    startup_wait: Duration,
    guest_ready_timeout: Duration,
    wait_for_exit: bool,
}

impl<'a, C: VmControl + ?Sized> PollSession<'a, C> {
    /// Session with a one-second interval, ten-second guest timeout and
    /// no variables. Waiting is off until [`PollSession::wait_for_exit`].
    #[must_use]
    pub fn new(
        client: &'a C,
        vm: &'a VmHandle,
        recorder: &'a HeartbeatRecorder,
        console: &'a Console,
    ) -> Self {
        Self {
            client,
            vm,
            recorder,
            console,
            variables: &[],
            interval: Duration::from_secs(1),
            startup_wait: Duration::ZERO,
            guest_ready_timeout: Duration::from_secs(10),
            wait_for_exit: false,
        }
    }

    #[must_use]
    pub fn variables(mut self, names: &'a [String]) -> Self {
        self.variables = names;
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn startup_wait(mut self, wait: Duration) -> Self {
        self.startup_wait = wait;
        self
    }

    #[must_use]
    pub fn guest_ready_timeout(mut self, timeout: Duration) -> Self {
        self.guest_ready_timeout = timeout;
        self
    }

    #[must_use]
    pub fn wait_for_exit(mut self, wait: bool) -> Self {
        self.wait_for_exit = wait;
        self
    }

    /// Poll until the VM powers off or `cancel` fires.
    ///
    /// # Errors
    /// Returns the [`ClientError`] of a failed power-state sample; the
    /// session is then aborted and the caller must release resources.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<PollReport, ClientError> {
        if !self.wait_for_exit {
            return Ok(PollReport { outcome: PollOutcome::NotRequested, ticks: 0 });
        }

        let mut ticks = 0;
        if !self.startup_wait.is_zero() && !pause(self.startup_wait, cancel).await {
            return Ok(PollReport { outcome: PollOutcome::Cancelled, ticks });
        }

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let state = self.tick().await?;
            ticks += 1;

            if state.is_terminal() {
                tracing::info!(vmx = %self.vm.path, ticks, "virtual machine powered off");
                return Ok(PollReport { outcome: PollOutcome::Stopped, ticks });
            }

            if !pause(self.interval, cancel).await {
                break;
            }
        }

        tracing::info!(vmx = %self.vm.path, ticks, "polling cancelled");
        Ok(PollReport { outcome: PollOutcome::Cancelled, ticks })
    }

    /// One sample-classify-record step.
    async fn tick(&self) -> Result<PowerState, ClientError> {
        let bits = self.client.read_power_state(self.vm).await?;
        let state = bits.classify();
        tracing::debug!(%bits, detail = ?PowerState::describe(bits), "sampled power state");

        match state {
            PowerState::PoweredOn => {
                if self.recorder.is_enabled() {
                    let variables = read_guest_variables(
                        self.client,
                        self.vm,
                        self.variables,
                        self.guest_ready_timeout,
                        self.console,
                    )
                    .await;
                    self.record(HeartbeatRecord::new(state, variables)).await;
                }
            }
            PowerState::PoweredOff => {
                self.record(HeartbeatRecord::new(state, Vec::new())).await;
            }
            PowerState::InTransition | PowerState::Suspended | PowerState::Unknown => {
                self.record(HeartbeatRecord::new(state, Vec::new())).await;
                self.console
                    .error(format!("Virtual machine in transition state [{}]", bits.bits()));
            }
        }

        Ok(state)
    }

    async fn record(&self, record: HeartbeatRecord) {
        if let Err(e) = self.recorder.write(&record).await {
            self.console.error(e);
        }
    }
}

/// Sleep for `duration` unless `cancel` fires first. Returns `false` if cancelled.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

/// Read `names` from the guest after waiting for it to become ready.
///
/// Every failure is soft: it is reported and the value is left empty. If
/// the guest never becomes ready no reads are attempted. Nothing is waited
/// for when `names` is empty.
pub(crate) async fn read_guest_variables<C: VmControl + ?Sized>(
    client: &C,
    vm: &VmHandle,
    names: &[String],
    timeout: Duration,
    console: &Console,
) -> Vec<GuestVariable> {
    if names.is_empty() {
        return Vec::new();
    }

    if let Err(e) = client.wait_for_guest_ready(vm, timeout).await {
        console.soft(format!("VM not yet loaded [{}]", e.code()));
        return names.iter().map(|name| GuestVariable::new(name.clone(), "")).collect();
    }

    let mut variables = Vec::with_capacity(names.len());
    for name in names {
        let value = match client.read_guest_variable(vm, name).await {
            Ok(value) => value,
            Err(e) => {
                console.soft(format!("Failed to get guest variable `{name}` [{}]", e.code()));
                String::new()
            }
        };
        variables.push(GuestVariable::new(name.clone(), value));
    }
    variables
}
