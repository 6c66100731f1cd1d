//! Core types for the vmctl single-VM controller.
//!
//! Defines the data shared by the control client, the heartbeat recorder
//! and the status poller: power-state classification, guest variables,
//! heartbeat records and timestamp formatting.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod guest;
pub mod power;
pub mod record;
pub mod time;

pub use error::CoreError;
pub use guest::{parse_variable_names, GuestVariable};
pub use power::{PowerState, PowerStateBits};
pub use record::HeartbeatRecord;
pub use time::{format_timestamp, timestamp};
