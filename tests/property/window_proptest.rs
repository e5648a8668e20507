//! Invariants of the rendered window and the pagination cursor under
//! arbitrary operation interleavings

use emberchat::chat::{PaginationCursor, RenderedWindow};
use emberchat::shared::{Message, MessageKey};
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

fn key(n: u32) -> MessageKey {
    MessageKey::new(format!("k{:08}", n))
}

fn message(text: impl Into<String>) -> Message {
    Message::new_text(Uuid::nil(), text)
}

/// One window mutation: a backward page landing or a tail delivery
#[derive(Debug, Clone)]
enum WindowOp {
    Prepend(Vec<u32>),
    Append(u32),
}

fn window_op() -> impl Strategy<Value = WindowOp> {
    prop_oneof![
        prop::collection::vec(0u32..200, 0..15).prop_map(WindowOp::Prepend),
        (0u32..200).prop_map(WindowOp::Append),
    ]
}

proptest! {
    /// The window is always key-sorted with no duplicate keys, whatever
    /// order pages and tail deliveries land in.
    #[test]
    fn window_stays_sorted_and_unique(ops in prop::collection::vec(window_op(), 0..40)) {
        let mut window = RenderedWindow::new();
        let mut expected: BTreeSet<u32> = BTreeSet::new();

        for op in ops {
            match op {
                WindowOp::Prepend(keys) => {
                    let mut keys = keys;
                    keys.sort_unstable();
                    keys.dedup();
                    let page = keys
                        .iter()
                        .map(|n| (key(*n), message(format!("m{}", n))))
                        .collect();
                    window.prepend(page);
                    expected.extend(keys);
                }
                WindowOp::Append(n) => {
                    window.append(key(n), message(format!("m{}", n)));
                    expected.insert(n);
                }
            }
        }

        let snapshot = window.snapshot();
        prop_assert_eq!(snapshot.len(), expected.len());
        let keys: Vec<MessageKey> = snapshot.into_iter().map(|(k, _)| k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        prop_assert_eq!(keys, sorted);
    }

    /// The first insert of a key wins; later writers never replace it.
    #[test]
    fn window_first_writer_wins(n in 0u32..200) {
        let mut window = RenderedWindow::new();
        prop_assert!(window.append(key(n), message("first")));
        prop_assert!(!window.append(key(n), message("second")));
        prop_assert_eq!(window.prepend(vec![(key(n), message("third"))]), 0);

        let snapshot = window.snapshot();
        prop_assert_eq!(snapshot.len(), 1);
        prop_assert_eq!(snapshot[0].1.text.as_str(), "first");
    }

    /// Once a page sequence exhausts the cursor it can never revert, and
    /// the oldest key only ever moves backward.
    #[test]
    fn cursor_exhaustion_is_monotone(
        pages in prop::collection::vec(prop::collection::vec(0u32..200, 0..15), 1..10),
        page_size in 1usize..15,
    ) {
        let mut cursor = PaginationCursor::new();
        let mut exhausted = false;
        let mut oldest: Option<MessageKey> = None;

        for page in pages {
            let mut keys: Vec<MessageKey> = page.iter().map(|n| key(*n)).collect();
            keys.sort();
            keys.dedup();
            cursor.record_page(&keys, page_size);

            if exhausted {
                prop_assert!(cursor.is_exhausted());
            }
            exhausted = cursor.is_exhausted();

            if let (Some(previous), Some(current)) = (oldest.as_ref(), cursor.oldest_key()) {
                prop_assert!(current <= previous);
            }
            oldest = cursor.oldest_key().cloned();
        }
    }
}
