//! Scripted in-memory backend for tests.
//!
//! Replays a fixed sequence of power states and records every call so
//! tests can assert on what the controller asked the host to do.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use vmctl_core::PowerStateBits;

use crate::backend::VmControl;
use crate::error::Operation;
use crate::{ClientError, PowerOnOptions, Session, VmHandle};

/// A call observed by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    OpenVm(String),
    PowerOn(PowerOnOptions),
    PowerOff,
    Suspend,
    ReadPowerState,
    WaitForGuestReady,
    ReadGuestVariable(String),
    ReleaseHandle,
    Disconnect,
}

#[derive(Debug, Default)]
struct Script {
    states: VecDeque<PowerStateBits>,
    last_state: PowerStateBits,
    variables: HashMap<String, String>,
    failures: HashMap<Operation, i32>,
    guest_ready: bool,
    calls: Vec<Call>,
    probe: Option<PathBuf>,
    probed: Vec<Option<String>>,
}

/// Backend that plays back a script instead of talking to a host.
#[derive(Debug)]
pub struct ScriptedClient {
    script: Mutex<Script>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    /// A client whose VM is powered off and whose guest is ready.
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                last_state: PowerStateBits::POWERED_OFF,
                guest_ready: true,
                ..Script::default()
            }),
        }
    }

    /// Power states returned by successive samples. The last one repeats.
    #[must_use]
    pub fn with_states(self, states: impl IntoIterator<Item = PowerStateBits>) -> Self {
        self.edit(|s| {
            s.states = states.into_iter().collect();
            if let Some(last) = s.states.back() {
                s.last_state = *last;
            }
        })
    }

    /// A guest variable the guest reports.
    #[must_use]
    pub fn with_variable(self, name: &str, value: &str) -> Self {
        self.edit(|s| {
            s.variables.insert(name.to_owned(), value.to_owned());
        })
    }

    /// Make `operation` fail with vendor `code`.
    #[must_use]
    pub fn failing(self, operation: Operation, code: i32) -> Self {
        self.edit(|s| {
            s.failures.insert(operation, code);
        })
    }

    /// Make guest-ready waits time out.
    #[must_use]
    pub fn guest_never_ready(self) -> Self {
        self.edit(|s| s.guest_ready = false)
    }

    /// Capture the contents of `path` at every power-state sample.
    #[must_use]
    pub fn probing(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.edit(|s| s.probe = Some(path))
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls equal to `call`.
    #[must_use]
    pub fn count(&self, call: &Call) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    /// Probed file contents, one entry per power-state sample.
    #[must_use]
    pub fn probed(&self) -> Vec<Option<String>> {
        self.lock().probed.clone()
    }

    fn edit(self, f: impl FnOnce(&mut Script)) -> Self {
        f(&mut self.lock());
        self
    }

    #[expect(clippy::expect_used, reason = "lock poisoning is unrecoverable")]
    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().expect("scripted client lock poisoned")
    }

    fn record(&self, call: Call, operation: Operation) -> Result<(), ClientError> {
        let mut script = self.lock();
        script.calls.push(call);
        match script.failures.get(&operation) {
            Some(code) => Err(ClientError::failed(operation, *code, "scripted failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VmControl for ScriptedClient {
    async fn connect(&self) -> Result<Session, ClientError> {
        self.record(Call::Connect, Operation::Connect)?;
        Ok(Session::new("scripted"))
    }

    async fn open_vm(&self, _session: &Session, path: &str) -> Result<VmHandle, ClientError> {
        self.record(Call::OpenVm(path.to_owned()), Operation::OpenVm)?;
        Ok(VmHandle::new(path))
    }

    async fn power_on(&self, _vm: &VmHandle, options: PowerOnOptions) -> Result<(), ClientError> {
        self.record(Call::PowerOn(options), Operation::PowerOn)
    }

    async fn power_off(&self, _vm: &VmHandle) -> Result<(), ClientError> {
        self.record(Call::PowerOff, Operation::PowerOff)
    }

    async fn suspend(&self, _vm: &VmHandle) -> Result<(), ClientError> {
        self.record(Call::Suspend, Operation::Suspend)
    }

    async fn read_power_state(&self, _vm: &VmHandle) -> Result<PowerStateBits, ClientError> {
        self.record(Call::ReadPowerState, Operation::ReadPowerState)?;
        let mut script = self.lock();
        if let Some(path) = script.probe.clone() {
            let contents = std::fs::read_to_string(path).ok();
            script.probed.push(contents);
        }
        let last = script.last_state;
        Ok(script.states.pop_front().unwrap_or(last))
    }

    async fn wait_for_guest_ready(
        &self,
        _vm: &VmHandle,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        self.record(Call::WaitForGuestReady, Operation::WaitForGuest)?;
        if self.lock().guest_ready {
            Ok(())
        } else {
            Err(ClientError::GuestNotReady { timeout_secs: timeout.as_secs() })
        }
    }

    async fn read_guest_variable(&self, _vm: &VmHandle, name: &str) -> Result<String, ClientError> {
        self.record(Call::ReadGuestVariable(name.to_owned()), Operation::ReadGuestVariable)?;
        self.lock()
            .variables
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::failed(Operation::ReadGuestVariable, 3, "unknown variable"))
    }

    async fn release_handle(&self, vm: &mut VmHandle) {
        self.lock().calls.push(Call::ReleaseHandle);
        vm.release();
    }

    async fn disconnect(&self, session: &mut Session) {
        self.lock().calls.push(Call::Disconnect);
        session.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn states_are_replayed_then_last_repeats() {
        let client = ScriptedClient::new()
            .with_states([PowerStateBits::POWERED_ON, PowerStateBits::POWERED_OFF]);
        let vm = VmHandle::new("a.vmx");
        let mut seen = Vec::new();
        for _ in 0..3 {
            match client.read_power_state(&vm).await {
                Ok(bits) => seen.push(bits),
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(
            seen,
            vec![PowerStateBits::POWERED_ON, PowerStateBits::POWERED_OFF, PowerStateBits::POWERED_OFF]
        );
    }

    #[tokio::test]
    async fn scripted_failure_carries_code() {
        let client = ScriptedClient::new().failing(Operation::Connect, 42);
        let result = client.connect().await;
        assert!(matches!(result, Err(ref e) if e.code() == 42));
        assert_eq!(client.calls(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn unknown_variable_is_an_error() {
        let client = ScriptedClient::new().with_variable("ip", "10.0.0.5");
        let vm = VmHandle::new("a.vmx");
        assert_eq!(client.read_guest_variable(&vm, "ip").await.ok().as_deref(), Some("10.0.0.5"));
        assert!(client.read_guest_variable(&vm, "status").await.is_err());
    }
}
