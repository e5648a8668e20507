//! # Key-Ordered Store Contracts
//!
//! This module defines the abstract contract of the external key-ordered
//! store the chat data layer is built on. The store assigns each inserted
//! message a unique, lexically monotonic key per path, and supports the
//! four read capabilities the pagination controller consumes plus the
//! write capabilities the composer uses.
//!
//! ## Ordering guarantees required of an implementation
//!
//! - Within a single path, insertion order equals key order.
//! - `get_last_n_before` returns a contiguous, correctly ordered slice.
//! - `subscribe_after` delivers items in non-decreasing key order and
//!   never delivers an item with a key at or before the subscription key.
//!   Items already present past the key are replayed first, then live
//!   inserts follow, so the hand-off from a snapshot read to the
//!   subscription is gapless.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use emberchat::store::{KeyOrderedStore, MemoryStore};
//!
//! # async fn example() -> Result<(), emberchat::store::StoreError> {
//! let store = Arc::new(MemoryStore::new());
//! let page = store.get_last_n("/serverMessages/s/c", 12).await?;
//! let mut tail = store
//!     .subscribe_after("/serverMessages/s/c", page.last().map(|(key, _)| key))
//!     .await?;
//! while let Some((key, message)) = tail.next_item().await {
//!     println!("{}: {}", key, message.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod memory;

use crate::shared::channel::ChannelPath;
use crate::shared::message::{Message, MessageKey};
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub use memory::MemoryStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store contract
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// The store rejected the request
    #[error("request rejected: {message}")]
    Rejected {
        /// Human-readable error message
        message: String,
    },

    /// The referenced item does not exist
    #[error("no item with key '{key}' under '{path}'")]
    MissingItem {
        /// Store path that was addressed
        path: String,
        /// Key that was not found
        key: String,
    },

    /// The store connection or subscription channel closed
    #[error("store connection closed")]
    ConnectionClosed,
}

impl StoreError {
    /// Create a new rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Live message feed returned by [`KeyOrderedStore::subscribe_after`]
///
/// Delivers `(key, message)` pairs in non-decreasing key order. Dropping
/// the subscription (or calling [`MessageSubscription::cancel`]) detaches
/// it; the store stops delivering immediately after.
#[derive(Debug)]
pub struct MessageSubscription {
    rx: UnboundedReceiver<(MessageKey, Message)>,
}

impl MessageSubscription {
    /// Wrap a receiver produced by a store implementation
    pub fn new(rx: UnboundedReceiver<(MessageKey, Message)>) -> Self {
        Self { rx }
    }

    /// Receive the next delivered item, or `None` once detached
    pub async fn next_item(&mut self) -> Option<(MessageKey, Message)> {
        self.rx.recv().await
    }

    /// Detach the subscription; queued items are dropped
    pub fn cancel(&mut self) {
        self.rx.close();
    }
}

impl Stream for MessageSubscription {
    type Item = (MessageKey, Message);

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Existence feed returned by [`KeyOrderedStore::watch_existence`]
///
/// Delivers the current existence of the watched path immediately, then a
/// boolean on every change.
#[derive(Debug)]
pub struct ExistenceSubscription {
    rx: UnboundedReceiver<bool>,
}

impl ExistenceSubscription {
    /// Wrap a receiver produced by a store implementation
    pub fn new(rx: UnboundedReceiver<bool>) -> Self {
        Self { rx }
    }

    /// Receive the next existence change, or `None` once detached
    pub async fn next_change(&mut self) -> Option<bool> {
        self.rx.recv().await
    }

    /// Detach the watch
    pub fn cancel(&mut self) {
        self.rx.close();
    }
}

impl Stream for ExistenceSubscription {
    type Item = bool;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Read contract of the key-ordered store
///
/// All reads address one path (one channel's message collection). A path
/// with no items behaves as an empty collection, not an error.
#[async_trait]
pub trait KeyOrderedStore: Send + Sync {
    /// Snapshot read of the most recent `n` items, ascending key order
    async fn get_last_n(&self, path: &str, n: usize) -> StoreResult<Vec<(MessageKey, Message)>>;

    /// Snapshot read of the `n` items strictly preceding `before`,
    /// ascending key order
    async fn get_last_n_before(
        &self,
        path: &str,
        before: &MessageKey,
        n: usize,
    ) -> StoreResult<Vec<(MessageKey, Message)>>;

    /// Subscribe to every item with a key greater than `after`
    ///
    /// `after = None` subscribes to the whole path. Existing items past
    /// the key are replayed first, then live inserts follow.
    async fn subscribe_after(
        &self,
        path: &str,
        after: Option<&MessageKey>,
    ) -> StoreResult<MessageSubscription>;

    /// Watch whether `path` exists
    ///
    /// The current existence is delivered immediately, then every change.
    async fn watch_existence(&self, path: &str) -> StoreResult<ExistenceSubscription>;
}

/// Write contract of the key-ordered store
#[async_trait]
pub trait StoreWriter: Send + Sync {
    /// Append a message under `path`; the store assigns and returns the key
    async fn push(&self, path: &str, message: Message) -> StoreResult<MessageKey>;

    /// Add (`present = true`) or remove one author id in one reaction set
    async fn set_reaction(
        &self,
        path: &str,
        key: &MessageKey,
        emoji: &str,
        user: Uuid,
        present: bool,
    ) -> StoreResult<()>;

    /// Create a channel's metadata node
    async fn create_channel(&self, path: &ChannelPath) -> StoreResult<()>;

    /// Delete a channel: removes the metadata node and cascades to the
    /// channel's message collection
    async fn delete_channel(&self, path: &ChannelPath) -> StoreResult<()>;
}

/// Combined store handle consumed by the chat layer
///
/// Blanket-implemented for any type providing both contracts, so a single
/// `Arc<dyn ChatStore>` can be constructor-injected everywhere.
pub trait ChatStore: KeyOrderedStore + StoreWriter {}

impl<T: KeyOrderedStore + StoreWriter> ChatStore for T {}
