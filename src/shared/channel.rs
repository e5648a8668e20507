//! Channel Identity and Store Paths
//!
//! A channel is identified by its `(server, channel)` pair. The pair maps
//! to two locations in the key-ordered store: the message path holding the
//! channel's ordered message collection, and the metadata path whose
//! existence the deletion watch observes.

use serde::{Deserialize, Serialize};

/// Identity of one channel inside one server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelPath {
    server: String,
    channel: String,
}

impl ChannelPath {
    /// Create a channel path from server and channel names
    pub fn new(server: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            channel: channel.into(),
        }
    }

    /// The server name
    pub fn server(&self) -> &str {
        &self.server
    }

    /// The channel name
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Store path of the channel's ordered message collection
    pub fn messages_path(&self) -> String {
        format!("/serverMessages/{}/{}", self.server, self.channel)
    }

    /// Store path of the channel's metadata node
    ///
    /// Deleting a channel removes this node; the deletion watch observes it.
    pub fn metadata_path(&self) -> String {
        format!("/serverChannels/{}/{}", self.server, self.channel)
    }
}

impl std::fmt::Display for ChannelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.server, self.channel)
    }
}
