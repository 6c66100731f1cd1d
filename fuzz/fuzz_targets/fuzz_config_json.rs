//! Fuzz target: controller configuration file parsing.
//!
//! Arbitrary bytes are parsed as a configuration document. Errors are
//! expected; panics are not.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vmctl::ControllerConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<ControllerConfig>(data) {
        let _ = config.validate();
        let _ = config.poll_interval();
        let _ = config.guest_ready_timeout();
    }
});
