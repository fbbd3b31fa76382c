//! Centralized configuration for pipebroker.
//!
//! Constants consumed by the RPC host; the registry core itself has no
//! tunables.

/// RPC transport limits.
pub struct RpcConfig;

impl RpcConfig {
    /// Maximum size of a single framed RPC message, in bytes.
    pub const MAX_MESSAGE_SIZE: usize = 1_048_576; // 1MB

    /// Maximum number of concurrent peer connections.
    pub const MAX_CONNECTIONS: usize = 256;
}
