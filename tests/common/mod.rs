//! Shared fixtures for the integration tests

use async_trait::async_trait;
use emberchat::chat::ChannelChatController;
use emberchat::shared::{ChannelPath, ChatConfig, ChatEvent, Message, MessageKey};
use emberchat::store::{
    ChatStore, ExistenceSubscription, KeyOrderedStore, MemoryStore, MessageSubscription,
    StoreError, StoreResult, StoreWriter,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

/// Install a test subscriber honoring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a store holding one channel seeded with `count` messages
pub async fn seeded_store(
    path: &ChannelPath,
    count: usize,
) -> (Arc<MemoryStore>, Vec<MessageKey>) {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    store.create_channel(path).await.unwrap();
    let author = Uuid::new_v4();
    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        let key = store
            .push(
                &path.messages_path(),
                Message::new_text(author, format!("message {}", i + 1)),
            )
            .await
            .unwrap();
        keys.push(key);
    }
    (store, keys)
}

/// Open a controller over `store` with the given page size
pub fn open_controller(
    path: &ChannelPath,
    store: Arc<dyn ChatStore>,
    page_size: usize,
) -> (ChannelChatController, UnboundedReceiver<ChatEvent>) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let config = ChatConfig::builder().page_size(page_size).build().unwrap();
    (
        ChannelChatController::new(path.clone(), store, config, events_tx),
        events_rx,
    )
}

/// Poll until the controller's window holds `expected` entries
///
/// Live-tail deliveries land asynchronously; panics after two seconds.
pub async fn wait_for_window_len(controller: &ChannelChatController, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if controller.window_snapshot().await.len() == expected {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!(
                "window never reached {} entries (currently {})",
                expected,
                controller.window_snapshot().await.len()
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Receive events until one matches `predicate`; panics after two seconds
pub async fn wait_for_event(
    events: &mut UnboundedReceiver<ChatEvent>,
    predicate: impl Fn(&ChatEvent) -> bool,
) -> ChatEvent {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event never arrived")
}

/// Store wrapper that rejects a configurable number of calls per
/// operation, then delegates
///
/// Each failure budget burns down by one per rejected call. Successful
/// `watch_existence` attaches are counted.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_reads: AtomicUsize,
    failing_subscribes: AtomicUsize,
    failing_watches: AtomicUsize,
    watch_attaches: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            failing_reads: AtomicUsize::new(0),
            failing_subscribes: AtomicUsize::new(0),
            failing_watches: AtomicUsize::new(0),
            watch_attaches: AtomicUsize::new(0),
        }
    }

    /// Reject the next `n` calls to `get_last_n`
    pub fn with_failing_reads(self, n: usize) -> Self {
        self.failing_reads.store(n, Ordering::SeqCst);
        self
    }

    /// Reject the next `n` calls to `subscribe_after`
    pub fn with_failing_subscribes(self, n: usize) -> Self {
        self.failing_subscribes.store(n, Ordering::SeqCst);
        self
    }

    /// Reject the next `n` calls to `watch_existence`
    pub fn with_failing_watches(self, n: usize) -> Self {
        self.failing_watches.store(n, Ordering::SeqCst);
        self
    }

    /// Number of `watch_existence` attaches that reached the store
    pub fn watch_attach_count(&self) -> usize {
        self.watch_attaches.load(Ordering::SeqCst)
    }

    fn take_failure(budget: &AtomicUsize) -> bool {
        budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl KeyOrderedStore for FlakyStore {
    async fn get_last_n(&self, path: &str, n: usize) -> StoreResult<Vec<(MessageKey, Message)>> {
        if Self::take_failure(&self.failing_reads) {
            return Err(StoreError::rejected("simulated read failure"));
        }
        self.inner.get_last_n(path, n).await
    }

    async fn get_last_n_before(
        &self,
        path: &str,
        before: &MessageKey,
        n: usize,
    ) -> StoreResult<Vec<(MessageKey, Message)>> {
        self.inner.get_last_n_before(path, before, n).await
    }

    async fn subscribe_after(
        &self,
        path: &str,
        after: Option<&MessageKey>,
    ) -> StoreResult<MessageSubscription> {
        if Self::take_failure(&self.failing_subscribes) {
            return Err(StoreError::rejected("simulated subscribe failure"));
        }
        self.inner.subscribe_after(path, after).await
    }

    async fn watch_existence(&self, path: &str) -> StoreResult<ExistenceSubscription> {
        if Self::take_failure(&self.failing_watches) {
            return Err(StoreError::rejected("simulated watch failure"));
        }
        self.watch_attaches.fetch_add(1, Ordering::SeqCst);
        self.inner.watch_existence(path).await
    }
}

#[async_trait]
impl StoreWriter for FlakyStore {
    async fn push(&self, path: &str, message: Message) -> StoreResult<MessageKey> {
        self.inner.push(path, message).await
    }

    async fn set_reaction(
        &self,
        path: &str,
        key: &MessageKey,
        emoji: &str,
        user: Uuid,
        present: bool,
    ) -> StoreResult<()> {
        self.inner.set_reaction(path, key, emoji, user, present).await
    }

    async fn create_channel(&self, path: &ChannelPath) -> StoreResult<()> {
        self.inner.create_channel(path).await
    }

    async fn delete_channel(&self, path: &ChannelPath) -> StoreResult<()> {
        self.inner.delete_channel(path).await
    }
}

/// Store wrapper that delays backward page reads and counts them
///
/// Used to hold a backfill in flight long enough to race a second request
/// or a teardown against it.
pub struct SlowBackfillStore {
    inner: Arc<MemoryStore>,
    delay: Duration,
    before_fetches: AtomicUsize,
}

impl SlowBackfillStore {
    pub fn new(inner: Arc<MemoryStore>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            before_fetches: AtomicUsize::new(0),
        }
    }

    /// Number of `get_last_n_before` calls that reached the store
    pub fn before_fetch_count(&self) -> usize {
        self.before_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyOrderedStore for SlowBackfillStore {
    async fn get_last_n(&self, path: &str, n: usize) -> StoreResult<Vec<(MessageKey, Message)>> {
        self.inner.get_last_n(path, n).await
    }

    async fn get_last_n_before(
        &self,
        path: &str,
        before: &MessageKey,
        n: usize,
    ) -> StoreResult<Vec<(MessageKey, Message)>> {
        self.before_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.get_last_n_before(path, before, n).await
    }

    async fn subscribe_after(
        &self,
        path: &str,
        after: Option<&MessageKey>,
    ) -> StoreResult<MessageSubscription> {
        self.inner.subscribe_after(path, after).await
    }

    async fn watch_existence(&self, path: &str) -> StoreResult<ExistenceSubscription> {
        self.inner.watch_existence(path).await
    }
}

#[async_trait]
impl StoreWriter for SlowBackfillStore {
    async fn push(&self, path: &str, message: Message) -> StoreResult<MessageKey> {
        self.inner.push(path, message).await
    }

    async fn set_reaction(
        &self,
        path: &str,
        key: &MessageKey,
        emoji: &str,
        user: Uuid,
        present: bool,
    ) -> StoreResult<()> {
        self.inner.set_reaction(path, key, emoji, user, present).await
    }

    async fn create_channel(&self, path: &ChannelPath) -> StoreResult<()> {
        self.inner.create_channel(path).await
    }

    async fn delete_channel(&self, path: &ChannelPath) -> StoreResult<()> {
        self.inner.delete_channel(path).await
    }
}
