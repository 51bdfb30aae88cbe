//! Error types for the reasoning core.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level error wrapping every subsystem error
//! - [`ValidationError`]: Out-of-contract numeric input that must be rejected
//! - [`GenerationError`]: Step-generation collaborator failures
//! - [`StorageError`]: Chain persistence failures
//! - [`ChainError`]: Reasoning chain invariant violations
//! - [`ConfigError`]: Configuration errors
//!
//! Only [`ValidationError`] ever reaches a caller of the public operations.
//! Generation and storage failures are soft misses, and chain errors are
//! converted into a fallback chain at the orchestrator boundary.
//!
//! All errors implement `Send + Sync` for async compatibility.

use thiserror::Error;

/// Top-level application error.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Step generation error.
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chain invariant error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Input that is explicitly out of contract for a resource-granting operation.
///
/// `allocate` rejects these rather than repairing them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric input fell outside its closed range.
    #[error("{field} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        /// The offending input name.
        field: String,
        /// The value received.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A numeric input was NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite {
        /// The offending input name.
        field: String,
    },

    /// The provider token ceiling cannot fund any budget.
    #[error("Provider token ceiling must be positive, got {value}")]
    InvalidCeiling {
        /// The ceiling received.
        value: u32,
    },
}

impl ValidationError {
    /// Check that `value` is finite and within `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotFinite`] or [`ValidationError::OutOfRange`].
    pub fn check_unit_range(field: &str, value: f64, min: f64, max: f64) -> Result<f64, Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite {
                field: field.into(),
            });
        }
        if value < min || value > max {
            return Err(Self::OutOfRange {
                field: field.into(),
                value,
                min,
                max,
            });
        }
        Ok(value)
    }
}

/// Step-generation collaborator errors.
///
/// These never abort a search: each one costs exactly one expansion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The generative model could not be reached.
    #[error("Step generator unavailable: {message}")]
    Unavailable {
        /// Description of the outage.
        message: String,
    },

    /// The generation call timed out.
    #[error("Step generation timed out after {elapsed_ms}ms")]
    Timeout {
        /// Elapsed time in milliseconds.
        elapsed_ms: u64,
    },

    /// The model refused or the request was malformed.
    #[error("Step generation rejected: {message}")]
    Rejected {
        /// Description of the rejection.
        message: String,
    },

    /// The model returned nothing usable.
    #[error("Step generator returned an empty step")]
    EmptyResponse,
}

impl GenerationError {
    /// Returns true if the failure is likely to clear on its own.
    ///
    /// Used for log classification only; the core never retries.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

/// Storage errors.
///
/// These errors represent failures in chain persistence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Failed to connect to the database.
    #[error("Database connection failed: {message}")]
    ConnectionFailed {
        /// Description of the connection failure.
        message: String,
    },

    /// A database query failed.
    #[error("Query failed: {query} - {message}")]
    QueryFailed {
        /// The query that failed.
        query: String,
        /// Description of the failure.
        message: String,
    },

    /// Database migration failed.
    #[error("Migration failed: {version} - {message}")]
    MigrationFailed {
        /// The migration version that failed.
        version: String,
        /// Description of the failure.
        message: String,
    },

    /// A stored document could not be encoded or decoded.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// Chain not found.
    #[error("Chain not found: {chain_id}")]
    NotFound {
        /// The chain ID that was not found.
        chain_id: String,
    },
}

/// Reasoning chain invariant violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// The chain has already reached its terminal state.
    #[error("Chain {chain_id} is already complete")]
    AlreadyCompleted {
        /// The completed chain.
        chain_id: String,
    },

    /// A step was appended without any content.
    #[error("Reasoning step content must not be empty")]
    EmptyStepContent,
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Missing required: {var}")]
    MissingRequired {
        /// The missing variable name.
        var: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}
