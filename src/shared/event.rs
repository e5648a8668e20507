//! View-Facing Event System
//!
//! This module defines the events the data layer emits toward the display
//! layer: window updates, the history-fetching indicator, transient
//! notices, and channel removal. Events are delivered over an unbounded
//! channel owned by the hosting view; the display layer re-reads the full
//! rendered window on every `WindowUpdated`, no incremental diffing is
//! implied.

use crate::shared::channel::ChannelPath;
use serde::{Deserialize, Serialize};

/// Event emitted by the chat data layer toward the display layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The rendered window of a channel changed; re-render from it
    WindowUpdated {
        /// Channel whose window changed
        path: ChannelPath,
    },
    /// The backfill spinner should be shown or hidden
    FetchingHistory {
        /// Channel the indicator belongs to
        path: ChannelPath,
        /// `true` when a backward fetch starts, `false` when it settles
        active: bool,
    },
    /// Transient user-visible notice (the snackbar)
    Notice {
        /// Human-readable notice text
        message: String,
    },
    /// The channel was deleted out from under the view
    ///
    /// The hosting session must drop the view and deselect the channel if
    /// it was selected.
    ChannelRemoved {
        /// Channel that no longer exists
        path: ChannelPath,
    },
}

impl ChatEvent {
    /// Create a window-updated event
    pub fn window_updated(path: ChannelPath) -> Self {
        Self::WindowUpdated { path }
    }

    /// Create a fetching-indicator event
    pub fn fetching_history(path: ChannelPath, active: bool) -> Self {
        Self::FetchingHistory { path, active }
    }

    /// Create a transient notice
    pub fn notice(message: impl Into<String>) -> Self {
        Self::Notice {
            message: message.into(),
        }
    }

    /// Create a channel-removed event
    pub fn channel_removed(path: ChannelPath) -> Self {
        Self::ChannelRemoved { path }
    }
}
