//! Chat Message Data Structures
//!
//! Represents a message stored under a channel's message path, together
//! with the store-assigned key that orders it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Maximum number of characters allowed in a message body.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Store-assigned message key.
///
/// Keys are opaque strings assigned by the key-ordered store on insert.
/// Within one channel path they are unique and lexically monotonic, so
/// lexical comparison is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageKey(String);

impl MessageKey {
    /// Wrap a raw key string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Reference to a file stored in the external object store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Path of the object in the external file store
    pub storage_path: String,
    /// MIME type of the uploaded file
    pub content_type: String,
}

/// Snapshot of a quoted message, embedded in the reply at send time
///
/// The snapshot is denormalized on purpose: the quoted message may be
/// outside the loaded window (or deleted) when the reply is rendered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuotedMessage {
    /// Display name of the quoted author
    pub author_display_name: String,
    /// Quoted message text
    pub text: String,
    /// Whether the quoted message carried an attachment
    pub has_attachment: bool,
    /// When the quoted message was sent
    pub timestamp: DateTime<Utc>,
}

/// A single chat message
///
/// Immutable once created, except for the `reactions` sub-map which is
/// append/remove only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// User who sent the message
    pub author_id: Uuid,
    /// Message text (may be empty when an attachment is present)
    pub text: String,
    /// Optional attachment reference
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// When the message was sent
    pub timestamp: DateTime<Utc>,
    /// Optional quoted-message snapshot (reply)
    #[serde(default)]
    pub quote: Option<QuotedMessage>,
    /// Reactions: emoji -> set of reacting author ids
    #[serde(default)]
    pub reactions: BTreeMap<String, BTreeSet<Uuid>>,
}

impl Message {
    /// Create a new plain text message
    pub fn new_text(author_id: Uuid, text: impl Into<String>) -> Self {
        Self {
            author_id,
            text: text.into(),
            attachment: None,
            timestamp: Utc::now(),
            quote: None,
            reactions: BTreeMap::new(),
        }
    }

    /// Attach a file reference
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Embed a quoted-message snapshot
    pub fn with_quote(mut self, quote: QuotedMessage) -> Self {
        self.quote = Some(quote);
        self
    }

    /// Build the quote snapshot a reply to this message would embed
    pub fn as_quote(&self, author_display_name: impl Into<String>) -> QuotedMessage {
        QuotedMessage {
            author_display_name: author_display_name.into(),
            text: self.text.clone(),
            has_attachment: self.attachment.is_some(),
            timestamp: self.timestamp,
        }
    }

    /// Get a preview of the message (first N characters)
    pub fn preview(&self, max_len: usize) -> String {
        if self.text.chars().count() <= max_len {
            self.text.clone()
        } else {
            let mut preview: String = self.text.chars().take(max_len.saturating_sub(3)).collect();
            preview.push_str("...");
            preview
        }
    }
}
