/// Errors produced by the `vmctl-core` crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CoreError {
    /// A guest variable name cannot be written as a heartbeat key.
    #[error("invalid guest variable name '{name}': {reason}")]
    InvalidVariableName { name: String, reason: String },

    /// A report token did not name a known power state.
    #[error("unknown power state token '{0}'")]
    UnknownStateToken(String),
}
