//! Shared Error Types
//!
//! This module defines the error types surfaced by the chat data layer.
//! Every error here is scoped to a single channel view; none is fatal to
//! the process.
//!
//! # Error Categories
//!
//! - `FetchFailed` - a backward history page request was rejected by the store
//! - `SubscriptionFailed` - the live tail or deletion watch could not attach
//! - `StaleDelivery` - an async completion arrived after its view was torn down
//! - `Validation` - message composition input failed validation
//! - `Store` - an error propagated from the store contract
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync` and can be safely shared across task
//! boundaries.
use crate::store::StoreError;
use thiserror::Error;

/// Errors produced by the channel chat data layer
#[derive(Debug, Error, Clone)]
pub enum ChatError {
    /// Backward page request rejected by the store.
    ///
    /// The cursor is left unchanged and the fetching flag cleared; retry
    /// is user-driven via the next scroll event.
    #[error("history fetch failed: {message}")]
    FetchFailed {
        /// Human-readable error message
        message: String,
    },

    /// Live-tail or existence-watch attach rejected by the store.
    ///
    /// Surfaced as a notice; reopening is manual, there is no automatic
    /// retry.
    #[error("subscription failed: {message}")]
    SubscriptionFailed {
        /// Human-readable error message
        message: String,
    },

    /// An async completion arrived after the owning view was torn down.
    ///
    /// Never surfaced to the user and never mutates state.
    #[error("completion arrived after view teardown")]
    StaleDelivery,

    /// Message composition input failed validation
    #[error("validation error in field '{field}': {message}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Error propagated from the store contract
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ChatError {
    /// Create a new fetch failure
    pub fn fetch_failed(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
        }
    }

    /// Create a new subscription failure
    pub fn subscription_failed(message: impl Into<String>) -> Self {
        Self::SubscriptionFailed {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Whether this error should be silently discarded rather than surfaced
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleDelivery)
    }
}
