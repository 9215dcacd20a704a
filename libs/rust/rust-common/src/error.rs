//! Centralized error types for all Rust libraries.
//!
//! This module provides a unified error type that can be used across all
//! hookline Rust services, with built-in retryability classification.

use thiserror::Error;

/// Common error type for platform operations.
///
/// All errors are classified as either retryable or non-retryable,
/// which helps callers decide whether to retry failed operations.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// State store backend failed
    #[error("Store error: {0}")]
    Store(String),

    /// Optimistic concurrency conflict on a shared record
    #[error("Concurrent update conflict for {key}")]
    Conflict {
        /// The record key that lost the compare-and-swap
        key: String,
    },

    /// Circuit breaker is open for the specified endpoint
    #[error("Circuit breaker open for {endpoint}")]
    CircuitOpen {
        /// The endpoint whose breaker is open
        endpoint: String,
    },

    /// Dependency is temporarily unavailable
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Timeout occurred
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Operation was cancelled before completion
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Retryable errors are transient failures that may succeed on retry:
    /// network issues, temporary unavailability, or a lost optimistic
    /// concurrency race that should be re-evaluated against fresh state.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::conflict("endpoint-1");
    /// assert!(err.is_retryable());
    ///
    /// let err = PlatformError::NotFound("endpoint-2".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Timeout(_) | Self::Conflict { .. }
        )
    }

    /// Create a store error with the given message.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create a conflict error for the given record key.
    #[must_use]
    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// Create a circuit open error for the given endpoint.
    #[must_use]
    pub fn circuit_open(endpoint: impl Into<String>) -> Self {
        Self::CircuitOpen {
            endpoint: endpoint.into(),
        }
    }

    /// Create an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an internal error with the given message.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
