//! Guest-reported variables.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A named value read from the running guest.
///
/// `value` is empty both when the guest left the variable empty and when
/// the read failed; callers cannot tell the two apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct GuestVariable {
    /// Variable name as configured on the command line.
    pub key: String,
    /// Value reported by the guest, or empty.
    pub value: String,
}

impl GuestVariable {
    /// Creates a variable from a key and a value.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// Splits a space-separated list of names, e.g. `"ip modem_status"`.
///
/// Names must be writable as `name = value` heartbeat keys, so `=` and
/// control characters are rejected.
///
/// # Errors
/// Returns [`CoreError::InvalidVariableName`] for the first unusable name.
pub fn parse_variable_names(list: &str) -> Result<Vec<String>, CoreError> {
    list.split_whitespace()
        .map(|name| {
            if name.contains('=') {
                return Err(CoreError::InvalidVariableName {
                    name: name.to_owned(),
                    reason: "contains '='".to_owned(),
                });
            }
            if name.chars().any(char::is_control) {
                return Err(CoreError::InvalidVariableName {
                    name: name.escape_debug().to_string(),
                    reason: "contains a control character".to_owned(),
                });
            }
            Ok(name.to_owned())
        })
        .collect()
}
