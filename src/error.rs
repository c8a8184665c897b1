//! Error types for varql.

use thiserror::Error;

/// The main error type for varql operations.
///
/// A token that simply is not an operand or operator of the expected kind is
/// not an error: the chain parser treats it as the end of that token's chain.
#[derive(Debug, Error)]
pub enum VarqlError {
    /// The leading identifier of a source path is not registered.
    #[error("Unknown source: '{0}'")]
    UnknownSource(String),

    /// A path segment does not exist in the current nested value.
    #[error("Path not found: '{path}' (missing segment '{segment}')")]
    PathNotFound { path: String, segment: String },

    /// A combination operator was applied to operands it cannot handle.
    #[error("Operator '{symbol}' failed: {message}")]
    OperatorType {
        symbol: &'static str,
        message: String,
    },

    /// A SELECT, FROM or WHERE chain is missing or has an unparseable operand.
    #[error("Empty {clause} chain: {reason}")]
    EmptyChain {
        clause: &'static str,
        reason: String,
    },

    /// Two masks of different lengths were combined.
    #[error("Mask length mismatch: {left} vs {right}")]
    MaskLength { left: usize, right: usize },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VarqlError {
    /// Create a path-not-found error.
    pub fn path_not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::PathNotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// Create an operator type error.
    pub fn operator(symbol: &'static str, message: impl Into<String>) -> Self {
        Self::OperatorType {
            symbol,
            message: message.into(),
        }
    }

    /// Create an empty chain error for the given clause.
    pub fn empty_chain(clause: &'static str, reason: impl Into<String>) -> Self {
        Self::EmptyChain {
            clause,
            reason: reason.into(),
        }
    }
}

/// Result type alias for varql operations.
pub type VarqlResult<T> = Result<T, VarqlError>;
