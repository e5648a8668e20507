//! Pagination Cursor
//!
//! Single source of truth for how much of a channel's history has been
//! loaded and from where to continue. One cursor is owned exclusively by
//! one controller per open channel view.

use crate::shared::message::MessageKey;

/// Bookkeeping of the loaded key range and exhaustion state for one channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationCursor {
    oldest_key: Option<MessageKey>,
    newest_key: Option<MessageKey>,
    exhausted: bool,
    listener_active: bool,
}

impl PaginationCursor {
    /// Fresh cursor: nothing loaded, not exhausted, no listener
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest key retrieved so far, the backfill continuation point
    pub fn oldest_key(&self) -> Option<&MessageKey> {
        self.oldest_key.as_ref()
    }

    /// Newest key of the initial page, the live-tail attach point
    pub fn newest_key(&self) -> Option<&MessageKey> {
        self.newest_key.as_ref()
    }

    /// Whether all history before the loaded window has been retrieved
    ///
    /// Once true, stays true for the remainder of the view's lifetime.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Whether the live tail has been attached
    pub fn listener_active(&self) -> bool {
        self.listener_active
    }

    /// Claim the live-tail slot
    ///
    /// Returns `false` if the listener was already active; attaching a
    /// second time is a no-op for the caller.
    pub fn mark_listener_active(&mut self) -> bool {
        if self.listener_active {
            return false;
        }
        self.listener_active = true;
        true
    }

    /// Release the live-tail slot after a failed attach, allowing a
    /// manual reopen
    pub fn release_listener(&mut self) {
        self.listener_active = false;
    }

    /// Record a retrieved snapshot page
    ///
    /// `keys` is the page's ascending key sequence, `page_size` the count
    /// that was requested. An empty page marks the history exhausted; a
    /// short page means the store had fewer remaining than requested, so
    /// no more history exists either.
    pub fn record_page(&mut self, keys: &[MessageKey], page_size: usize) {
        let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
            self.exhausted = true;
            return;
        };
        let precedes = self
            .oldest_key
            .as_ref()
            .map(|oldest| first < oldest)
            .unwrap_or(true);
        if precedes {
            self.oldest_key = Some(first.clone());
        }
        // Only the very first page establishes the newest key; live
        // appends never move it.
        if self.newest_key.is_none() {
            self.newest_key = Some(last.clone());
        }
        if keys.len() < page_size {
            self.exhausted = true;
        }
    }
}
