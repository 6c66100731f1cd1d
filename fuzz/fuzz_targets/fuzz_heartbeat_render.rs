//! Fuzz target: heartbeat record rendering.
//!
//! Names that pass `parse_variable_names` must render as exactly one
//! `name = value` line each when values carry no newline.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vmctl_core::{parse_variable_names, GuestVariable, HeartbeatRecord, PowerState};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let (names, value) = text.split_once('|').unwrap_or((&text, ""));
    let Ok(names) = parse_variable_names(names) else {
        return;
    };
    let value = value.replace(['\n', '\r'], " ");

    let variables: Vec<GuestVariable> =
        names.iter().map(|n| GuestVariable::new(n.clone(), value.clone())).collect();
    let rendered = HeartbeatRecord::new(PowerState::PoweredOn, variables).render();

    assert_eq!(rendered.lines().count(), 2 + names.len(), "unexpected line count");
    assert!(rendered.lines().nth(1) == Some("state = RUNNING"));
});
