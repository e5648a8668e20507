//! # In-Memory Key-Ordered Store
//!
//! A process-local implementation of the store contracts, used by tests
//! and demos in place of the hosted backend. It honors the same ordering
//! guarantees: counter-based keys are lexically monotonic per store, range
//! reads return contiguous ascending slices, and subscriptions replay
//! existing items before streaming live inserts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use uuid::Uuid;
//! use emberchat::shared::{ChannelPath, Message};
//! use emberchat::store::{MemoryStore, StoreWriter};
//!
//! # async fn example() -> Result<(), emberchat::store::StoreError> {
//! let store = Arc::new(MemoryStore::new());
//! let path = ChannelPath::new("rustaceans", "general");
//! store.create_channel(&path).await?;
//! store
//!     .push(&path.messages_path(), Message::new_text(Uuid::new_v4(), "hi"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::shared::channel::ChannelPath;
use crate::shared::message::{Message, MessageKey};
use crate::store::{
    ExistenceSubscription, KeyOrderedStore, MessageSubscription, StoreError, StoreResult,
    StoreWriter,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedSender};
use uuid::Uuid;

/// One path's ordered message collection plus its live subscribers
#[derive(Default)]
struct Collection {
    items: BTreeMap<MessageKey, Message>,
    tails: Vec<UnboundedSender<(MessageKey, Message)>>,
}

#[derive(Default)]
struct Inner {
    /// Message collections keyed by store path
    collections: HashMap<String, Collection>,
    /// Metadata nodes that currently exist
    nodes: HashSet<String>,
    /// Existence watchers keyed by store path
    watchers: HashMap<String, Vec<UnboundedSender<bool>>>,
}

impl Inner {
    fn path_exists(&self, path: &str) -> bool {
        self.nodes.contains(path)
            || self
                .collections
                .get(path)
                .map(|collection| !collection.items.is_empty())
                .unwrap_or(false)
    }

    /// Fan an existence change out to the path's watchers, pruning
    /// detached ones.
    fn notify_existence(&mut self, path: &str, exists: bool) {
        if let Some(watchers) = self.watchers.get_mut(path) {
            watchers.retain(|tx| tx.send(exists).is_ok());
            if watchers.is_empty() {
                self.watchers.remove(path);
            }
        }
    }
}

/// In-memory store implementing both store contracts
///
/// All state lives behind one mutex that is never held across an await
/// point; every operation is a short critical section.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    counter: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next message key
    ///
    /// Fixed-width hex over a shared counter, so lexical order equals
    /// assignment order.
    fn next_key(&self) -> MessageKey {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        MessageKey::new(format!("k{:016x}", n))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyOrderedStore for MemoryStore {
    async fn get_last_n(&self, path: &str, n: usize) -> StoreResult<Vec<(MessageKey, Message)>> {
        let inner = self.lock();
        let Some(collection) = inner.collections.get(path) else {
            return Ok(Vec::new());
        };
        let mut page: Vec<(MessageKey, Message)> = collection
            .items
            .iter()
            .rev()
            .take(n)
            .map(|(key, message)| (key.clone(), message.clone()))
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn get_last_n_before(
        &self,
        path: &str,
        before: &MessageKey,
        n: usize,
    ) -> StoreResult<Vec<(MessageKey, Message)>> {
        let inner = self.lock();
        let Some(collection) = inner.collections.get(path) else {
            return Ok(Vec::new());
        };
        let mut page: Vec<(MessageKey, Message)> = collection
            .items
            .range(..before.clone())
            .rev()
            .take(n)
            .map(|(key, message)| (key.clone(), message.clone()))
            .collect();
        page.reverse();
        Ok(page)
    }

    async fn subscribe_after(
        &self,
        path: &str,
        after: Option<&MessageKey>,
    ) -> StoreResult<MessageSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let collection = inner.collections.entry(path.to_string()).or_default();
        // Replay existing items past the key, then register for live
        // inserts, all under the lock: no insert can slip between.
        let replay = match after {
            Some(after) => collection
                .items
                .range((
                    std::ops::Bound::Excluded(after.clone()),
                    std::ops::Bound::Unbounded,
                ))
                .map(|(key, message)| (key.clone(), message.clone()))
                .collect::<Vec<_>>(),
            None => collection
                .items
                .iter()
                .map(|(key, message)| (key.clone(), message.clone()))
                .collect(),
        };
        for item in replay {
            let _ = tx.send(item);
        }
        collection.tails.push(tx);
        Ok(MessageSubscription::new(rx))
    }

    async fn watch_existence(&self, path: &str) -> StoreResult<ExistenceSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let exists = inner.path_exists(path);
        let _ = tx.send(exists);
        inner.watchers.entry(path.to_string()).or_default().push(tx);
        Ok(ExistenceSubscription::new(rx))
    }
}

#[async_trait]
impl StoreWriter for MemoryStore {
    async fn push(&self, path: &str, message: Message) -> StoreResult<MessageKey> {
        let key = self.next_key();
        let mut inner = self.lock();
        let existed = inner.path_exists(path);
        let collection = inner.collections.entry(path.to_string()).or_default();
        collection.items.insert(key.clone(), message.clone());
        collection
            .tails
            .retain(|tx| tx.send((key.clone(), message.clone())).is_ok());
        if !existed {
            inner.notify_existence(path, true);
        }
        Ok(key)
    }

    async fn set_reaction(
        &self,
        path: &str,
        key: &MessageKey,
        emoji: &str,
        user: Uuid,
        present: bool,
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        let message = inner
            .collections
            .get_mut(path)
            .and_then(|collection| collection.items.get_mut(key))
            .ok_or_else(|| StoreError::MissingItem {
                path: path.to_string(),
                key: key.to_string(),
            })?;
        if present {
            message
                .reactions
                .entry(emoji.to_string())
                .or_default()
                .insert(user);
        } else if let Some(reactors) = message.reactions.get_mut(emoji) {
            reactors.remove(&user);
            if reactors.is_empty() {
                message.reactions.remove(emoji);
            }
        }
        Ok(())
    }

    async fn create_channel(&self, path: &ChannelPath) -> StoreResult<()> {
        let metadata_path = path.metadata_path();
        let mut inner = self.lock();
        if inner.nodes.insert(metadata_path.clone()) {
            inner.notify_existence(&metadata_path, true);
        }
        Ok(())
    }

    async fn delete_channel(&self, path: &ChannelPath) -> StoreResult<()> {
        let metadata_path = path.metadata_path();
        let messages_path = path.messages_path();
        let mut inner = self.lock();
        let existed = inner.nodes.remove(&metadata_path);
        // Cascade: the message collection goes with the channel. Dropping
        // the tail senders closes every live subscription on the path.
        inner.collections.remove(&messages_path);
        if existed {
            inner.notify_existence(&metadata_path, false);
        }
        inner.notify_existence(&messages_path, false);
        Ok(())
    }
}
