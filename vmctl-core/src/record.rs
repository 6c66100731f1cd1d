use std::fmt::Write as _;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::guest::GuestVariable;
use crate::power::PowerState;
use crate::time::format_timestamp;

/// The latest observation of the VM, written on every poll tick.
///
/// Records are built fresh per tick and replace the previous snapshot on
/// disk; no history is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct HeartbeatRecord {
    /// When the observation was taken.
    pub timestamp: DateTime<Local>,
    /// Classified power state.
    pub state: PowerState,
    /// Guest variables in configured order. Empty unless running.
    pub variables: Vec<GuestVariable>,
}

impl HeartbeatRecord {
    /// Creates a record stamped with the current local time.
    #[must_use]
    pub fn new(state: PowerState, variables: Vec<GuestVariable>) -> Self {
        Self::at(Local::now(), state, variables)
    }

    /// Creates a record with an explicit timestamp.
    #[must_use]
    pub fn at(timestamp: DateTime<Local>, state: PowerState, variables: Vec<GuestVariable>) -> Self {
        Self { timestamp, state, variables }
    }

    /// Renders the record as heartbeat file text.
    ///
    /// ```text
    /// date = 2014-05-01 13:37:00
    /// state = RUNNING
    /// ip = 10.0.0.5
    /// ```
    ///
    /// Values are written verbatim; a value containing a newline will
    /// produce an extra line.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(64 + self.variables.len() * 32);
        // Writing into a String cannot fail.
        let _ = writeln!(out, "date = {}", format_timestamp(&self.timestamp));
        let _ = writeln!(out, "state = {}", self.state.token());
        for var in &self.variables {
            let _ = writeln!(out, "{} = {}", var.key, var.value);
        }
        out
    }
}
