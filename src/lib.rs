//! Emberchat - Channel Chat Data Layer
//!
//! Emberchat is the client-side data layer for a group chat application
//! (servers → channels → messages). Storage, fan-out, and persistence are
//! delegated to an external key-ordered store; this crate owns the logic
//! that decides which window of a channel's message history is
//! materialized in memory, how it grows backward on scroll and forward
//! through a live subscription, and how the initial snapshot hands off to
//! the streaming listener without gaps or duplicates.
//!
//! # Overview
//!
//! This library provides:
//! - Pagination cursor tracking the loaded key range per channel
//! - Scroll-triggered backward history fetches (one in flight, dropped
//!   not queued)
//! - A single live-tail subscription per channel view, appending new
//!   messages as they arrive
//! - A de-duplicated, key-ordered rendered window backing the display
//! - Channel-deletion detection that evicts the view and deselects the
//!   channel
//! - Message composition: text, attachments, quoted replies, reactions
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic types
//!   - Message model, channel identity, events, errors, configuration
//!
//! - **`store`** - The key-ordered store contracts
//!   - Read and write traits, subscription handles
//!   - An in-memory implementation for tests and demos
//!
//! - **`chat`** - The controller
//!   - Pagination cursor, rendered window, live tail, deletion watch
//!   - Session state: loaded views, selection, deselect-on-delete
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use emberchat::chat::ChatSession;
//! use emberchat::shared::ChatConfig;
//! use emberchat::store::MemoryStore;
//!
//! # async fn example() -> Result<(), emberchat::shared::ChatError> {
//! let store = Arc::new(MemoryStore::new());
//! let (mut session, mut events) = ChatSession::new(store, ChatConfig::default());
//! session.select_server(Some("rustaceans"));
//! let view = session.select_channel("general").await?;
//!
//! while let Some(event) = events.recv().await {
//!     session.handle_event(&event);
//!     // re-render from view.window_snapshot() on WindowUpdated, etc.
//! }
//! # Ok(())
//! # }
//! ```

/// Platform-agnostic shared types
pub mod shared;

/// Key-ordered store contracts and in-memory implementation
pub mod store;

/// Pagination and live-append controller
pub mod chat;

/// Re-export commonly used types for convenience
pub use chat::{ChannelChatController, ChatPhase, ChatSession, PaginationCursor, RenderedWindow};
pub use shared::{ChannelPath, ChatConfig, ChatError, ChatEvent, Message, MessageKey};
pub use store::{ChatStore, KeyOrderedStore, MemoryStore, StoreError, StoreWriter};
