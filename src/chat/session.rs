//! Chat Session
//!
//! Hosting-view state across channels: which channel views are loaded,
//! which server/channel is selected, and the reaction to a channel being
//! deleted out from under the user. A view is loaded lazily the first
//! time its channel is selected and kept warm across channel switches;
//! switching away does not tear it down, deletion or an explicit close
//! does.

use crate::chat::{ChannelChatController, ChatPhase};
use crate::shared::channel::ChannelPath;
use crate::shared::config::ChatConfig;
use crate::shared::error::ChatError;
use crate::shared::event::ChatEvent;
use crate::store::ChatStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Multi-channel session state for one signed-in user
pub struct ChatSession {
    store: Arc<dyn ChatStore>,
    config: ChatConfig,
    events_tx: UnboundedSender<ChatEvent>,
    views: HashMap<ChannelPath, Arc<ChannelChatController>>,
    selected_server: Option<String>,
    selected_channel: Option<String>,
}

impl ChatSession {
    /// Create a session; the returned receiver carries every view event
    /// from every loaded channel
    pub fn new(
        store: Arc<dyn ChatStore>,
        config: ChatConfig,
    ) -> (Self, UnboundedReceiver<ChatEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                config,
                events_tx,
                views: HashMap::new(),
                selected_server: None,
                selected_channel: None,
            },
            events_rx,
        )
    }

    /// Currently selected server, if any
    pub fn selected_server(&self) -> Option<&str> {
        self.selected_server.as_deref()
    }

    /// Currently selected channel, if any
    pub fn selected_channel(&self) -> Option<&str> {
        self.selected_channel.as_deref()
    }

    /// Controller of an already-loaded channel view
    pub fn view(&self, path: &ChannelPath) -> Option<Arc<ChannelChatController>> {
        self.views.get(path).cloned()
    }

    /// Controller backing the current selection, if a channel is selected
    pub fn active_view(&self) -> Option<Arc<ChannelChatController>> {
        let path = self.selected_path()?;
        self.view(&path)
    }

    /// Paths of every loaded channel view
    pub fn loaded_channels(&self) -> impl Iterator<Item = &ChannelPath> {
        self.views.keys()
    }

    /// Select a server; any channel selection is cleared
    pub fn select_server(&mut self, server: Option<&str>) {
        self.selected_server = server.map(str::to_string);
        self.selected_channel = None;
    }

    /// Clear the channel selection, keeping its view loaded
    pub fn deselect_channel(&mut self) {
        self.selected_channel = None;
    }

    /// Select a channel on the current server, loading its view on first
    /// selection
    pub async fn select_channel(
        &mut self,
        channel: &str,
    ) -> Result<Arc<ChannelChatController>, ChatError> {
        let Some(server) = self.selected_server.clone() else {
            return Err(ChatError::validation("channel", "no server selected"));
        };
        let path = ChannelPath::new(server, channel);
        self.selected_channel = Some(channel.to_string());

        if let Some(view) = self.views.get(&path) {
            return Ok(Arc::clone(view));
        }

        tracing::info!("[Session] loading channel view {}", path);
        let controller = Arc::new(ChannelChatController::new(
            path.clone(),
            Arc::clone(&self.store),
            self.config.clone(),
            self.events_tx.clone(),
        ));
        if let Err(error) = controller.start().await {
            // Leave nothing behind: a failed start may have attached the
            // deletion watch already.
            controller.teardown().await;
            return Err(error);
        }
        self.views.insert(path, Arc::clone(&controller));
        Ok(controller)
    }

    /// React to a view event
    ///
    /// `ChannelRemoved` drops the deleted channel's view and clears the
    /// selection if it pointed at that channel; every other event is left
    /// for the display layer.
    pub fn handle_event(&mut self, event: &ChatEvent) {
        if let ChatEvent::ChannelRemoved { path } = event {
            // The controller already evicted itself; just forget it.
            self.views.remove(path);
            if self.selected_path().as_ref() == Some(path) {
                tracing::info!("[Session] selected channel {} removed, deselecting", path);
                self.selected_channel = None;
            }
        }
    }

    /// Explicitly close one channel view
    pub async fn close_channel(&mut self, path: &ChannelPath) {
        if let Some(view) = self.views.remove(path) {
            view.teardown().await;
        }
        if self.selected_path().as_ref() == Some(path) {
            self.selected_channel = None;
        }
    }

    /// Tear down every loaded view (sign-out / shutdown)
    pub async fn shutdown(&mut self) {
        for (_, view) in self.views.drain() {
            view.teardown().await;
        }
        self.selected_server = None;
        self.selected_channel = None;
    }

    fn selected_path(&self) -> Option<ChannelPath> {
        match (&self.selected_server, &self.selected_channel) {
            (Some(server), Some(channel)) => Some(ChannelPath::new(server, channel)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("selected_server", &self.selected_server)
            .field("selected_channel", &self.selected_channel)
            .field("loaded", &self.views.len())
            .finish_non_exhaustive()
    }
}
