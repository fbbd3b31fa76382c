//! Error types for the pipebroker core.
//!
//! Every registry operation is total: it always maps to one of these kinds,
//! never blocks indefinitely, and never panics past its own boundary.

use thiserror::Error;

/// Main error type for broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Lookup miss, or a stale entry discovered (and removed) during acquire.
    #[error("Pipe not found: {name}")]
    PipeNotFound { name: String },

    /// Registration collision with a live runner. Registration never
    /// overwrites a live entry, even for a runner re-registering over a new
    /// connection.
    #[error("Pipe already registered with a live runner: {name}")]
    DuplicatePipe { name: String },

    /// The lease is already held by a live client.
    #[error("Pipe is busy: {name}")]
    RunnerBusy { name: String },

    /// Monitoring registration itself failed; the peer reference was already
    /// invalid at call time.
    #[error("Remote peer is dead: {message}")]
    RunnerDead { message: String },

    /// Caller misuse (empty name, null capability reference).
    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    /// Host-process misuse or unexpected internal state.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

impl BrokerError {
    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32700: Parse error
    /// - -32600: Invalid Request
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Pipe not found
    /// - -32001: Duplicate pipe
    /// - -32002: Runner busy
    /// - -32003: Runner dead
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            BrokerError::PipeNotFound { .. } => -32000,
            BrokerError::DuplicatePipe { .. } => -32001,
            BrokerError::RunnerBusy { .. } => -32002,
            BrokerError::RunnerDead { .. } => -32003,
            BrokerError::InvalidParams { .. } => -32602,
            BrokerError::Internal { .. } => -32603,
        }
    }

    /// Check if the caller can usefully retry after this error.
    ///
    /// `RunnerBusy` clears when the holding client releases (dies);
    /// `PipeNotFound` clears when a runner (re-)registers the name.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerError::RunnerBusy { .. } | BrokerError::PipeNotFound { .. }
        )
    }
}
