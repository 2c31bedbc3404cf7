//! Error types for the MLX bridge.
//!
//! Every failure is returned synchronously to the immediate caller. Only
//! [`BridgeError::LoadFailure`] and [`BridgeError::MissingSymbols`] touch
//! process-wide state, and both leave the bridge cleanly uninitialized so
//! `initialize` can be retried.

use thiserror::Error;

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by the bridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A forwarding call was made before a successful `initialize`.
    #[error("{operation}: library not initialized. Call initialize() first.")]
    NotInitialized {
        operation: &'static str,
    },

    /// The dynamic library could not be opened.
    #[error("Failed to load library at {path}: {reason}")]
    LoadFailure {
        path: String,
        reason: String,
    },

    /// The library opened but mandatory entry points are absent.
    #[error("Failed to load functions: {}", symbols.join(" "))]
    MissingSymbols {
        symbols: Vec<String>,
    },

    /// A required argument is absent or has the wrong shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The native load entry point returned a negative handle.
    #[error("Failed to load model: {model_id}")]
    ModelLoadRejected {
        model_id: String,
        code: i32,
    },

    /// The native generate entry point returned null.
    #[error("{0}")]
    GenerationFailure(String),
}

impl BridgeError {
    /// Stable kind name, for hosts that map errors onto their own classes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotInitialized { .. } => "NotInitialized",
            Self::LoadFailure { .. } => "LoadFailure",
            Self::MissingSymbols { .. } => "MissingSymbols",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::ModelLoadRejected { .. } => "ModelLoadRejected",
            Self::GenerationFailure(_) => "GenerationFailure",
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
