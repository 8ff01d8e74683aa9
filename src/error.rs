//! Error types for Estate Intake.

use std::time::Duration;

use crate::registry::StepId;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Listings lookup error: {0}")]
    Lookup(#[from] LookupError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Answer registry errors.
///
/// The construction variants surface at startup when a step table is
/// malformed. `UnknownStep` is the runtime fault: a session points at a step
/// the registry does not know. Transports report it to the user as a generic
/// failure and keep running.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Step table is empty")]
    Empty,

    #[error("Duplicate step id: {0}")]
    DuplicateStep(StepId),

    #[error("Step {step} links to {next}, which is not in the table")]
    UnknownNext { step: StepId, next: StepId },

    #[error("Step chain covers {visited} of {total} steps; the table must form a single chain")]
    BrokenChain { visited: usize, total: usize },

    #[error("Step chain loops back to {0}; the table must form a single chain")]
    ChainCycle(StepId),

    #[error("Choice step {0} has an empty choice set")]
    NoChoices(StepId),

    #[error("Choice step {step} repeats token {token:?}")]
    DuplicateToken { step: StepId, token: String },

    #[error("Unknown step id: {0}")]
    UnknownStep(StepId),
}

/// Transport channel errors.
///
/// Unusable inbound updates are skipped during normalization rather than
/// reported, so only the outbound direction can fail.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Listings lookup errors.
///
/// The finalizer recovers from every variant here; lookup trouble reaches
/// the user only as an empty match list.
#[derive(Debug)]
pub enum LookupError {
    RequestFailed { source: String, reason: String },

    InvalidResponse { source: String, reason: String },

    Timeout { after: Duration },
}

// `source` names the listings backend, not an error cause; thiserror's derive
// would treat a field with that name as `Error::source`, which a `String`
// cannot be, so Display and Error are implemented by hand instead.
impl std::fmt::Display for LookupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupError::RequestFailed { source, reason } => {
                write!(f, "Listings source {source} request failed: {reason}")
            }
            LookupError::InvalidResponse { source, reason } => {
                write!(f, "Listings source {source} returned an invalid response: {reason}")
            }
            LookupError::Timeout { after } => {
                write!(f, "Listings lookup timed out after {after:?}")
            }
        }
    }
}

impl std::error::Error for LookupError {}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
