//! Error types for BMC operations

use std::time::Duration;
use thiserror::Error;

/// Error type for BMC operations
#[derive(Debug, Error)]
pub enum BmcError {
    /// Request could not be sent or its body could not be read
    #[error("transport error: {0}")]
    Transport(String),

    /// Controller answered with a non-success status
    #[error("{method} {url} returned {status}: {body}")]
    Http {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Controller answered, but without the field we need
    #[error("unexpected response from {resource}: {reason}")]
    UnexpectedResponse { resource: String, reason: String },

    /// A polling sequence did not reach its terminal state in time
    #[error("{operation} timed out after {timeout:?}")]
    Timeout { operation: String, timeout: Duration },

    /// BIOS left POST, but the host ended up powered off
    ///
    /// A BIOS settings commit can legitimately end this way, so the
    /// settings watcher accepts it. Everywhere else it is fatal.
    #[error("host exited POST but is powered off")]
    ExitedPostPoweredOff,

    /// Planned boot order was rejected
    #[error("boot order: {0}")]
    BootOrder(#[from] BootOrderError),

    /// Requested BIOS attribute is not exposed by the controller
    #[error("unsupported attribute: {0}")]
    UnsupportedAttribute(String),

    /// Task reached a failure terminal state
    #[error("task {location} finished in state {state}")]
    TaskFailed {
        location: String,
        state: String,
        log: Option<String>,
    },

    /// Task failed, and fetching its log failed as well
    #[error("task {location} finished in state {state}; fetching its log failed: {source}")]
    TaskLogUnavailable {
        location: String,
        state: String,
        #[source]
        source: Box<BmcError>,
    },

    /// Request was accepted but the controller returned no task reference
    #[error("{0} was accepted without a task location")]
    MissingTaskLocation(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BmcError {
    /// Build a timeout error for `operation`
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        BmcError::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// True for the one soft failure the settings watcher tolerates
    pub fn is_exited_post_powered_off(&self) -> bool {
        matches!(self, BmcError::ExitedPostPoweredOff)
    }

    /// True for any timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, BmcError::Timeout { .. })
    }
}

impl From<reqwest::Error> for BmcError {
    fn from(err: reqwest::Error) -> Self {
        BmcError::Transport(err.to_string())
    }
}

/// Validation failures of a planned boot order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootOrderError {
    /// The settings resource carries no boot sequence attribute at all
    #[error("no boot order attribute found on the boot sources resource")]
    NoBootOrderAttribute,

    /// A planned entry is not one of the current boot options
    #[error("boot option {0} did not pass validation")]
    UnknownEntry(String),

    /// Planned and current orders differ in length
    #[error("planned boot order has {planned} entries, a different length than currently configured ({current})")]
    LengthMismatch { planned: usize, current: usize },

    /// Some current options are absent from the plan
    #[error("planned boot order does not contain all available boot options, missing: {}", .0.join(", "))]
    MissingEntries(Vec<String>),

    /// A planned entry had no counterpart when building the write
    #[error("boot option {0} has no matching device in the current boot order")]
    UnmatchedEntry(String),
}

/// Result type for BMC operations
pub type Result<T> = std::result::Result<T, BmcError>;
