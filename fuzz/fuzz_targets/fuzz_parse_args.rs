//! Fuzz target: command-line parsing.
//!
//! Splits arbitrary input on NUL into an argument vector. Parsing may
//! reject it but must never panic, and every accepted variable name must
//! be usable as a heartbeat key.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let args: Vec<String> = text.split('\0').map(str::to_owned).collect();

    if let Ok(invocation) = vmctl::cli::parse(&args) {
        for name in &invocation.variables {
            assert!(!name.is_empty(), "empty variable name accepted");
            assert!(!name.contains('='), "variable name with '=' accepted: {name:?}");
            assert!(!name.chars().any(char::is_control), "control char accepted: {name:?}");
        }
    }
});
