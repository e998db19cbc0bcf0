//! Gateway error types

use crate::classifier::ClassifyError;
use thiserror::Error;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Registration refused after `close()`
    #[error("Gateway is shutting down")]
    ShuttingDown,

    /// Underlying transport fault
    #[error("Transport error: {0}")]
    Transport(String),

    /// Inbound frame could not be classified
    #[error("Classification failed: {0}")]
    Classification(#[from] ClassifyError),
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
