//! Error types and handling for pktpool

use crate::arena::NumaNode;

/// Result type alias for pool operations
pub type Result<T> = std::result::Result<T, PoolError>;

/// Error types for pool construction and registration.
///
/// Runtime capacity exhaustion and "no matching pool" are *not* errors:
/// allocation paths report them as `None` so callers can distinguish
/// "misconfigured ahead of time" from "ran out now".
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Memory allocation or mapping failures
    #[error("memory error: {message}")]
    Memory { message: String },

    /// Invalid parameters or configuration
    #[error("invalid parameter: {parameter} - {message}")]
    InvalidParameter { parameter: String, message: String },

    /// A pool for this (node, payload size) pair is already registered
    #[error("pool for payload size {payload_size} on node {node} already exists")]
    PoolExists { node: NumaNode, payload_size: usize },
}

impl PoolError {
    /// Create a memory error
    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a pool-exists error
    pub fn pool_exists(node: NumaNode, payload_size: usize) -> Self {
        Self::PoolExists { node, payload_size }
    }
}
