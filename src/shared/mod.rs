//! Shared Module
//!
//! This module contains the platform-agnostic types of the chat data
//! layer: the message model, channel identity, view-facing events, error
//! types, and configuration. All types are designed for serialization and
//! for safe sharing across task boundaries.

/// Message data structures
pub mod message;

/// Channel identity and store paths
pub mod channel;

/// View-facing event system
pub mod event;

/// Shared error types
pub mod error;

/// Chat data layer configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use channel::ChannelPath;
pub use config::{ChatConfig, ChatConfigBuilder, ConfigError, DEFAULT_PAGE_SIZE};
pub use error::ChatError;
pub use event::ChatEvent;
pub use message::{Attachment, Message, MessageKey, QuotedMessage, MAX_MESSAGE_CHARS};
