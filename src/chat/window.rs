//! Rendered Window
//!
//! The de-duplicated, key-ordered sequence of message entries backing the
//! display. Backward fetches prepend, the live tail appends; both reject
//! keys already present, which defends against the two racing on an
//! overlapping key (first writer wins).

use crate::shared::message::{Message, MessageKey};
use std::collections::BTreeMap;

/// Key-ordered message window for one channel view
#[derive(Debug, Clone, Default)]
pub struct RenderedWindow {
    entries: BTreeMap<MessageKey, Message>,
}

impl RenderedWindow {
    /// Empty window
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an older page at the front of the window
    ///
    /// Items must be in ascending key order. Items whose key is already
    /// present are rejected. Returns the number actually inserted.
    pub fn prepend(&mut self, items: Vec<(MessageKey, Message)>) -> usize {
        let mut inserted = 0;
        for (key, message) in items {
            if let std::collections::btree_map::Entry::Vacant(entry) = self.entries.entry(key) {
                entry.insert(message);
                inserted += 1;
            }
        }
        inserted
    }

    /// Append one live-delivered item at the tail
    ///
    /// Returns `false` (no-op) if the key is already present.
    pub fn append(&mut self, key: MessageKey, message: Message) -> bool {
        match self.entries.entry(key) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(message);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Whether a key is already materialized
    pub fn contains(&self, key: &MessageKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries in the window
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate the window in ascending key order
    ///
    /// The display layer re-renders from this full sequence after every
    /// mutation.
    pub fn iter(&self) -> impl Iterator<Item = (&MessageKey, &Message)> {
        self.entries.iter()
    }

    /// The window's keys in ascending order
    pub fn keys(&self) -> impl Iterator<Item = &MessageKey> {
        self.entries.keys()
    }

    /// Clone the window out as an ordered vector
    pub fn snapshot(&self) -> Vec<(MessageKey, Message)> {
        self.entries
            .iter()
            .map(|(key, message)| (key.clone(), message.clone()))
            .collect()
    }
}
