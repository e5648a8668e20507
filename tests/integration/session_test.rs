//! Session-level tests: selection, deletion handling, shutdown

use crate::common::{seeded_store, wait_for_event, wait_for_window_len};
use emberchat::chat::{ChatPhase, ChatSession};
use emberchat::shared::{ChannelPath, ChatConfig, ChatEvent};
use emberchat::store::{ChatStore, StoreWriter};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_selected_view_survives_channel_switch() {
    let general = ChannelPath::new("s", "general");
    let random = ChannelPath::new("s", "random");
    let (store, _keys) = seeded_store(&general, 5).await;
    store.create_channel(&random).await.unwrap();

    let (mut session, _events) = ChatSession::new(Arc::clone(&store) as Arc<dyn ChatStore>, ChatConfig::default());
    session.select_server(Some("s"));

    let general_view = session.select_channel("general").await.unwrap();
    wait_for_window_len(&general_view, 5).await;

    session.select_channel("random").await.unwrap();
    assert_eq!(session.selected_channel(), Some("random"));

    // The first view is still loaded and still live.
    assert_eq!(session.loaded_channels().count(), 2);
    assert_eq!(general_view.phase().await, ChatPhase::ExhaustedLive);
    assert_eq!(general_view.window_snapshot().await.len(), 5);
}

#[tokio::test]
async fn test_channel_deletion_evicts_and_deselects() {
    let path = ChannelPath::new("s", "general");
    let (store, _keys) = seeded_store(&path, 5).await;

    let (mut session, mut events) =
        ChatSession::new(Arc::clone(&store) as Arc<dyn ChatStore>, ChatConfig::default());
    session.select_server(Some("s"));
    let view = session.select_channel("general").await.unwrap();
    wait_for_window_len(&view, 5).await;

    store.delete_channel(&path).await.unwrap();

    let removed = wait_for_event(&mut events, |event| {
        matches!(event, ChatEvent::ChannelRemoved { .. })
    })
    .await;
    session.handle_event(&removed);

    assert!(session.selected_channel().is_none());
    assert!(session.view(&path).is_none());
    assert_eq!(view.phase().await, ChatPhase::TornDown);
    assert!(view.window_snapshot().await.is_empty());
}

#[tokio::test]
async fn test_close_channel_tears_view_down() {
    let path = ChannelPath::new("s", "general");
    let (store, _keys) = seeded_store(&path, 5).await;

    let (mut session, _events) = ChatSession::new(Arc::clone(&store) as Arc<dyn ChatStore>, ChatConfig::default());
    session.select_server(Some("s"));
    let view = session.select_channel("general").await.unwrap();

    session.close_channel(&path).await;
    assert!(session.selected_channel().is_none());
    assert!(session.view(&path).is_none());
    assert_eq!(view.phase().await, ChatPhase::TornDown);
}
