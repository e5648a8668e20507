//! # Channel Message Pagination & Live-Append Controller
//!
//! Decides which window of a channel's message history is materialized in
//! memory, how it grows backward (manual fetch-on-scroll) and forward
//! (live subscription), and how it hands off from the initial snapshot
//! read to the streaming listener without gaps or duplicates.
//!
//! ## Architecture
//!
//! One [`ChannelChatController`] is created per open channel view and
//! coordinates four pieces:
//! - **Pagination Cursor**: the loaded key range and exhaustion state
//! - **Rendered Window**: the de-duplicated, key-ordered message sequence
//! - **Live Tail**: the single forward subscription appending new messages
//! - **Deletion Watch**: the existence watch detecting channel deletion
//!
//! ## Lifecycle
//!
//! `Uninitialized → LoadingInitial → { Steady | ExhaustedLive }`, with the
//! backfill in-flight flag orthogonal to the main phase. `TornDown` is
//! terminal and reachable from any phase; it cancels the subscriptions
//! and discards every late async completion via a generation token.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use emberchat::chat::ChannelChatController;
//! use emberchat::shared::{ChannelPath, ChatConfig};
//! use emberchat::store::MemoryStore;
//!
//! # async fn example() -> Result<(), emberchat::shared::ChatError> {
//! let store = Arc::new(MemoryStore::new());
//! let (events_tx, mut events_rx) = mpsc::unbounded_channel();
//! let controller = ChannelChatController::new(
//!     ChannelPath::new("rustaceans", "general"),
//!     store,
//!     ChatConfig::default(),
//!     events_tx,
//! );
//! controller.start().await?;
//! // scroll near the top:
//! controller.fetch_earlier().await?;
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod session;
pub mod window;

pub use cursor::PaginationCursor;
pub use session::ChatSession;
pub use window::RenderedWindow;

use crate::shared::channel::ChannelPath;
use crate::shared::config::ChatConfig;
use crate::shared::error::ChatError;
use crate::shared::event::ChatEvent;
use crate::shared::message::{Attachment, Message, MessageKey, QuotedMessage, MAX_MESSAGE_CHARS};
use crate::store::{ChatStore, ExistenceSubscription, MessageSubscription};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Notice shown when a backward history fetch fails
const NOTICE_FETCH_FAILED: &str = "Could not load earlier messages, please try again.";
/// Notice shown when the live tail or deletion watch cannot attach
const NOTICE_SUBSCRIBE_FAILED: &str = "Live updates unavailable for this channel.";
/// Notice shown when sending a message fails
const NOTICE_SEND_FAILED: &str = "Could not send, please try again.";

/// Lifecycle phase of one channel view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    /// Created, nothing loaded yet
    Uninitialized,
    /// Initial snapshot page in flight
    LoadingInitial,
    /// Live tail attached, more history may remain
    Steady,
    /// Live tail attached, all history loaded
    ExhaustedLive,
    /// View closed or channel deleted; terminal
    TornDown,
}

/// Mutable state owned by one channel view
#[derive(Debug)]
struct ViewState {
    phase: ChatPhase,
    cursor: PaginationCursor,
    window: RenderedWindow,
    fetching: bool,
}

impl ViewState {
    fn new() -> Self {
        Self {
            phase: ChatPhase::Uninitialized,
            cursor: PaginationCursor::new(),
            window: RenderedWindow::new(),
            fetching: false,
        }
    }

    /// Drop the materialized history; used on teardown
    fn evict(&mut self) {
        self.phase = ChatPhase::TornDown;
        self.cursor = PaginationCursor::new();
        self.window = RenderedWindow::new();
        self.fetching = false;
    }
}

/// State shared between the controller handle and its spawned tasks
struct Shared {
    path: ChannelPath,
    events: UnboundedSender<ChatEvent>,
    state: RwLock<ViewState>,
    /// Liveness token: bumped on teardown, checked by every async
    /// completion before it mutates state
    generation: AtomicU64,
    /// Whether the deletion watch is attached; a retried `start` after a
    /// failed initial load must not attach a second watch
    watch_attached: AtomicBool,
    tasks: StdMutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn emit(&self, event: ChatEvent) {
        // The display layer may have dropped its receiver; that only
        // means nobody is rendering this view anymore.
        let _ = self.events.send(event);
    }

    fn generation_now(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether a completion issued at `generation` may still mutate state
    fn is_current(&self, generation: u64, state: &ViewState) -> bool {
        self.generation_now() == generation && state.phase != ChatPhase::TornDown
    }

    fn abort_tasks(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().expect("task list mutex poisoned");
            tasks.drain(..).collect()
        };
        for handle in handles {
            handle.abort();
        }
    }
}

/// Pagination and live-append controller for one open channel view
///
/// Owns the channel's cursor and rendered window exclusively; no
/// cross-view sharing. The store handle is a shared, read-mostly
/// collaborator injected at construction.
pub struct ChannelChatController {
    store: Arc<dyn ChatStore>,
    config: ChatConfig,
    shared: Arc<Shared>,
}

impl ChannelChatController {
    /// Create a controller for `path`, emitting view events on `events`
    pub fn new(
        path: ChannelPath,
        store: Arc<dyn ChatStore>,
        config: ChatConfig,
        events: UnboundedSender<ChatEvent>,
    ) -> Self {
        Self {
            store,
            config,
            shared: Arc::new(Shared {
                path,
                events,
                state: RwLock::new(ViewState::new()),
                generation: AtomicU64::new(0),
                watch_attached: AtomicBool::new(false),
                tasks: StdMutex::new(Vec::new()),
            }),
        }
    }

    /// The channel this controller serves
    pub fn channel_path(&self) -> &ChannelPath {
        &self.shared.path
    }

    /// Current lifecycle phase
    pub async fn phase(&self) -> ChatPhase {
        self.shared.state.read().await.phase
    }

    /// Whether all history before the loaded window has been retrieved
    pub async fn is_exhausted(&self) -> bool {
        self.shared.state.read().await.cursor.is_exhausted()
    }

    /// Whether a backward fetch is currently in flight
    pub async fn is_fetching(&self) -> bool {
        self.shared.state.read().await.fetching
    }

    /// Ordered copy of the rendered window for the display layer
    pub async fn window_snapshot(&self) -> Vec<(MessageKey, Message)> {
        self.shared.state.read().await.window.snapshot()
    }

    /// Load the initial page, attach the deletion watch and the live tail
    ///
    /// Idempotent: calling `start` on a view that already left
    /// `Uninitialized` is a no-op.
    pub async fn start(&self) -> Result<(), ChatError> {
        {
            let mut state = self.shared.state.write().await;
            if state.phase != ChatPhase::Uninitialized {
                tracing::warn!("[ChannelChat] start ignored, view already {:?}", state.phase);
                return Ok(());
            }
            state.phase = ChatPhase::LoadingInitial;
        }
        let generation = self.shared.generation_now();
        tracing::info!("[ChannelChat] opening view for {}", self.shared.path);

        if let Err(error) = self.attach_deletion_watch(generation).await {
            let mut state = self.shared.state.write().await;
            if self.shared.is_current(generation, &state) {
                state.phase = ChatPhase::Uninitialized;
            }
            return Err(error);
        }

        let messages_path = self.shared.path.messages_path();
        let page_size = self.config.page_size();
        let page = match self.store.get_last_n(&messages_path, page_size).await {
            Ok(page) => page,
            Err(error) => {
                tracing::error!("[ChannelChat] initial load failed for {}: {}", self.shared.path, error);
                let mut state = self.shared.state.write().await;
                if self.shared.is_current(generation, &state) {
                    state.phase = ChatPhase::Uninitialized;
                }
                self.shared.emit(ChatEvent::notice(NOTICE_FETCH_FAILED));
                return Err(ChatError::fetch_failed(error.to_string()));
            }
        };

        {
            let mut state = self.shared.state.write().await;
            if !self.shared.is_current(generation, &state) {
                return Err(ChatError::StaleDelivery);
            }
            let keys: Vec<MessageKey> = page.iter().map(|(key, _)| key.clone()).collect();
            state.cursor.record_page(&keys, page_size);
            let inserted = state.window.prepend(page);
            tracing::debug!(
                "[ChannelChat] initial page for {}: {} messages, exhausted={}",
                self.shared.path,
                inserted,
                state.cursor.is_exhausted()
            );
            if inserted > 0 {
                self.shared.emit(ChatEvent::window_updated(self.shared.path.clone()));
            }
        }

        self.attach_live_tail(generation).await
    }

    /// Fetch one older page (scroll-triggered backfill)
    ///
    /// Returns `Ok(true)` when a page was fetched and applied, `Ok(false)`
    /// when the request was dropped (already fetching, exhausted, no
    /// initial page yet, or the view went away). Dropped requests are not
    /// queued; the next scroll event retries.
    pub async fn fetch_earlier(&self) -> Result<bool, ChatError> {
        let (generation, oldest) = {
            let mut state = self.shared.state.write().await;
            if state.fetching || state.cursor.is_exhausted() {
                tracing::debug!("[ChannelChat] backfill dropped for {}", self.shared.path);
                return Ok(false);
            }
            let Some(oldest) = state.cursor.oldest_key().cloned() else {
                return Ok(false);
            };
            if state.phase == ChatPhase::TornDown {
                return Ok(false);
            }
            state.fetching = true;
            self.shared
                .emit(ChatEvent::fetching_history(self.shared.path.clone(), true));
            (self.shared.generation_now(), oldest)
        };

        let messages_path = self.shared.path.messages_path();
        let page_size = self.config.page_size();
        let result = self
            .store
            .get_last_n_before(&messages_path, &oldest, page_size)
            .await;

        let mut state = self.shared.state.write().await;
        if !self.shared.is_current(generation, &state) {
            tracing::debug!("[ChannelChat] discarding stale backfill for {}", self.shared.path);
            return Ok(false);
        }
        match result {
            Err(error) => {
                tracing::warn!("[ChannelChat] backfill failed for {}: {}", self.shared.path, error);
                state.fetching = false;
                self.shared
                    .emit(ChatEvent::fetching_history(self.shared.path.clone(), false));
                self.shared.emit(ChatEvent::notice(NOTICE_FETCH_FAILED));
                Err(ChatError::fetch_failed(error.to_string()))
            }
            Ok(page) => {
                let keys: Vec<MessageKey> = page.iter().map(|(key, _)| key.clone()).collect();
                state.cursor.record_page(&keys, page_size);
                let inserted = state.window.prepend(page);
                state.fetching = false;
                if state.cursor.is_exhausted() && state.phase == ChatPhase::Steady {
                    state.phase = ChatPhase::ExhaustedLive;
                }
                tracing::debug!(
                    "[ChannelChat] backfill for {}: {} messages, exhausted={}",
                    self.shared.path,
                    inserted,
                    state.cursor.is_exhausted()
                );
                self.shared
                    .emit(ChatEvent::fetching_history(self.shared.path.clone(), false));
                if inserted > 0 {
                    self.shared.emit(ChatEvent::window_updated(self.shared.path.clone()));
                }
                Ok(true)
            }
        }
    }

    /// Manually reopen the live tail after a failed attach
    pub async fn reopen_live_tail(&self) -> Result<(), ChatError> {
        let generation = self.shared.generation_now();
        self.attach_live_tail(generation).await
    }

    /// Compose and push a message; it is not locally echoed and arrives
    /// back through the live tail like any other message
    pub async fn send_message(
        &self,
        author_id: Uuid,
        text: &str,
        attachment: Option<Attachment>,
        quote: Option<QuotedMessage>,
    ) -> Result<(), ChatError> {
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return Err(ChatError::validation("text", "message text cannot be empty"));
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ChatError::validation(
                "text",
                format!("message text exceeds {} characters", MAX_MESSAGE_CHARS),
            ));
        }
        if self.phase().await == ChatPhase::TornDown {
            return Err(ChatError::StaleDelivery);
        }

        let mut message = Message::new_text(author_id, text);
        if let Some(attachment) = attachment {
            message = message.with_attachment(attachment);
        }
        if let Some(quote) = quote {
            message = message.with_quote(quote);
        }

        match self.store.push(&self.shared.path.messages_path(), message).await {
            Ok(key) => {
                tracing::debug!("[ChannelChat] sent {} to {}", key, self.shared.path);
                Ok(())
            }
            Err(error) => {
                tracing::warn!("[ChannelChat] send failed for {}: {}", self.shared.path, error);
                self.shared.emit(ChatEvent::notice(NOTICE_SEND_FAILED));
                Err(error.into())
            }
        }
    }

    /// Add one user's reaction to a message
    pub async fn add_reaction(
        &self,
        key: &MessageKey,
        emoji: &str,
        user: Uuid,
    ) -> Result<(), ChatError> {
        self.store
            .set_reaction(&self.shared.path.messages_path(), key, emoji, user, true)
            .await
            .map_err(ChatError::from)
    }

    /// Remove one user's reaction from a message
    pub async fn remove_reaction(
        &self,
        key: &MessageKey,
        emoji: &str,
        user: Uuid,
    ) -> Result<(), ChatError> {
        self.store
            .set_reaction(&self.shared.path.messages_path(), key, emoji, user, false)
            .await
            .map_err(ChatError::from)
    }

    /// Close the view: cancel the subscriptions, evict the window and
    /// cursor, discard every in-flight completion
    ///
    /// The generation bump happens before anything else, so a completion
    /// racing with teardown can never observe pre-teardown state as
    /// current.
    pub async fn teardown(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        {
            let mut state = self.shared.state.write().await;
            if state.phase == ChatPhase::TornDown {
                return;
            }
            state.evict();
        }
        self.shared.abort_tasks();
        tracing::info!("[ChannelChat] closed view for {}", self.shared.path);
    }

    /// Attach the forward subscription appending newly inserted messages
    ///
    /// Opens at most once per view, guarded by the cursor's listener
    /// flag. With a newest key the subscription starts after it; on an
    /// empty channel it covers the whole path.
    async fn attach_live_tail(&self, generation: u64) -> Result<(), ChatError> {
        let after = {
            let mut state = self.shared.state.write().await;
            if !self.shared.is_current(generation, &state) {
                return Err(ChatError::StaleDelivery);
            }
            if !state.cursor.mark_listener_active() {
                tracing::debug!("[LiveTail] already attached for {}", self.shared.path);
                return Ok(());
            }
            state.cursor.newest_key().cloned()
        };

        let subscription = match self
            .store
            .subscribe_after(&self.shared.path.messages_path(), after.as_ref())
            .await
        {
            Ok(subscription) => subscription,
            Err(error) => {
                tracing::error!("[LiveTail] attach failed for {}: {}", self.shared.path, error);
                let mut state = self.shared.state.write().await;
                if self.shared.is_current(generation, &state) {
                    state.cursor.release_listener();
                }
                self.shared.emit(ChatEvent::notice(NOTICE_SUBSCRIBE_FAILED));
                return Err(ChatError::subscription_failed(error.to_string()));
            }
        };
        tracing::info!(
            "[LiveTail] attached for {} after {:?}",
            self.shared.path,
            after.as_ref().map(MessageKey::as_str)
        );

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(run_live_tail(shared, subscription, generation));
        self.shared
            .tasks
            .lock()
            .expect("task list mutex poisoned")
            .push(handle);

        let mut state = self.shared.state.write().await;
        if self.shared.is_current(generation, &state) {
            state.phase = if state.cursor.is_exhausted() {
                ChatPhase::ExhaustedLive
            } else {
                ChatPhase::Steady
            };
        }
        Ok(())
    }

    /// Attach the existence watch on the channel's metadata node
    ///
    /// Attaches at most once per view; a retried `start` finds the watch
    /// already in place and skips it.
    async fn attach_deletion_watch(&self, generation: u64) -> Result<(), ChatError> {
        if self.shared.watch_attached.load(Ordering::SeqCst) {
            tracing::debug!("[DeletionWatch] already attached for {}", self.shared.path);
            return Ok(());
        }
        let watch = match self
            .store
            .watch_existence(&self.shared.path.metadata_path())
            .await
        {
            Ok(watch) => watch,
            Err(error) => {
                tracing::error!(
                    "[DeletionWatch] attach failed for {}: {}",
                    self.shared.path,
                    error
                );
                self.shared.emit(ChatEvent::notice(NOTICE_SUBSCRIBE_FAILED));
                return Err(ChatError::subscription_failed(error.to_string()));
            }
        };
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(run_deletion_watch(shared, watch, generation));
        self.shared
            .tasks
            .lock()
            .expect("task list mutex poisoned")
            .push(handle);
        self.shared.watch_attached.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for ChannelChatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelChatController")
            .field("path", &self.shared.path)
            .finish_non_exhaustive()
    }
}

/// Live tail task: append each delivered message to the rendered window
async fn run_live_tail(
    shared: Arc<Shared>,
    mut subscription: MessageSubscription,
    generation: u64,
) {
    while let Some((key, message)) = subscription.next_item().await {
        let mut state = shared.state.write().await;
        if !shared.is_current(generation, &state) {
            tracing::debug!("[LiveTail] discarding stale delivery for {}", shared.path);
            break;
        }
        if state.window.append(key.clone(), message) {
            tracing::debug!("[LiveTail] appended {} to {}", key, shared.path);
            shared.emit(ChatEvent::window_updated(shared.path.clone()));
        } else {
            // The backfill got there first on an overlapping key.
            tracing::debug!("[LiveTail] duplicate {} for {}", key, shared.path);
        }
    }
    tracing::debug!("[LiveTail] detached for {}", shared.path);
}

/// Deletion watch task: tear the view down when the channel disappears
async fn run_deletion_watch(
    shared: Arc<Shared>,
    mut watch: ExistenceSubscription,
    generation: u64,
) {
    while let Some(exists) = watch.next_change().await {
        if exists {
            continue;
        }
        {
            let mut state = shared.state.write().await;
            if !shared.is_current(generation, &state) {
                break;
            }
            // Bump before mutating so every other in-flight completion
            // observes itself as stale.
            shared.generation.fetch_add(1, Ordering::SeqCst);
            state.evict();
        }
        shared.abort_tasks();
        tracing::info!("[DeletionWatch] channel {} deleted, view evicted", shared.path);
        shared.emit(ChatEvent::channel_removed(shared.path.clone()));
        break;
    }
}
