//! End-to-end flows through the chat service: connect, send, fan out,
//! history, block policy, and failure recovery — all against the in-memory
//! backends.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use felchat_server::delivery::{ChatService, SendOutcome};
use felchat_server::directory::{MemoryDirectory, UserInfo};
use felchat_server::history::{ChatHistory, MemoryHistory};
use felchat_server::models::{ChatKey, DeliveryFrame, MessageRecord};
use felchat_server::registry::Session;

const ALICE: i64 = 1;
const BOB: i64 = 2;

fn test_directory() -> Arc<MemoryDirectory> {
    let directory = Arc::new(MemoryDirectory::new());
    directory.insert_user(UserInfo {
        id: ALICE,
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
    });
    directory.insert_user(UserInfo {
        id: BOB,
        username: "bob".to_string(),
        email: "bob@example.com".to_string(),
    });
    directory
}

fn test_service(directory: Arc<MemoryDirectory>) -> ChatService {
    ChatService::new(
        Arc::new(MemoryHistory::new(Duration::from_secs(1800))),
        Some(directory),
        50,
    )
}

#[tokio::test]
async fn full_conversation_flow() {
    let service = test_service(test_directory());

    let (alice_session, mut alice_rx) = Session::channel();
    let (bob_session, mut bob_rx) = Session::channel();
    service.connect(ALICE, alice_session.clone());
    service.connect(BOB, bob_session.clone());

    let mut online = service.online_users();
    online.sort_unstable();
    assert_eq!(online, vec![ALICE, BOB]);

    assert!(service.send_personal_message("hey bob", BOB, ALICE).await);
    assert!(service.send_personal_message("hey alice", ALICE, BOB).await);

    // Each party sees both messages: their own echo plus the peer's.
    for rx in [&mut alice_rx, &mut bob_rx] {
        let first: DeliveryFrame = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let second: DeliveryFrame = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first.from, ALICE);
        assert_eq!(first.message, "hey bob");
        assert_eq!(second.from, BOB);
        assert_eq!(second.message, "hey alice");
    }

    // History is symmetric and ordered.
    let history = service.get_history(BOB, ALICE, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].message, "hey bob");
    assert_eq!(history[0].from_username.as_deref(), Some("alice"));
    assert_eq!(history[1].message, "hey alice");
    assert_eq!(
        service.get_message_count(ALICE, BOB).await.unwrap(),
        service.get_message_count(BOB, ALICE).await.unwrap()
    );

    service.disconnect(ALICE, &alice_session);
    service.disconnect(BOB, &bob_session);
    assert!(service.online_users().is_empty());
}

#[tokio::test]
async fn block_stops_delivery_and_persistence() {
    let directory = test_directory();
    let service = test_service(directory.clone());

    let (bob_session, mut bob_rx) = Session::channel();
    service.connect(BOB, bob_session);

    directory.block(BOB, ALICE);
    assert_eq!(
        service.deliver("can you hear me?", BOB, ALICE).await,
        SendOutcome::Blocked
    );
    assert_eq!(service.get_message_count(ALICE, BOB).await.unwrap(), 0);
    assert!(bob_rx.try_recv().is_err());

    // Unblocking restores the path.
    directory.unblock(BOB, ALICE);
    assert!(service.send_personal_message("now?", BOB, ALICE).await);
    assert!(bob_rx.recv().await.is_some());
    assert_eq!(service.get_message_count(ALICE, BOB).await.unwrap(), 1);
}

#[tokio::test]
async fn history_limit_returns_most_recent_window() {
    let service = test_service(test_directory());

    for i in 0..6 {
        assert!(
            service
                .send_personal_message(&format!("message {i}"), BOB, ALICE)
                .await
        );
    }

    let window = service.get_history(ALICE, BOB, Some(3)).await.unwrap();
    assert_eq!(window.len(), 3);
    assert_eq!(window[0].message, "message 3");
    assert_eq!(window[2].message, "message 5");

    let all = service.get_history(ALICE, BOB, None).await.unwrap();
    assert_eq!(all.len(), 6);
}

#[tokio::test]
async fn clear_history_then_count_is_zero() {
    let service = test_service(test_directory());

    assert!(service.send_personal_message("gone soon", BOB, ALICE).await);
    assert!(service.clear_chat_history(ALICE, BOB).await.unwrap());
    assert_eq!(service.get_message_count(ALICE, BOB).await.unwrap(), 0);
    assert!(service.get_history(ALICE, BOB, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_session_does_not_stop_the_other_party() {
    let service = test_service(test_directory());

    let (broken, broken_rx) = Session::channel();
    let (bob_session, mut bob_rx) = Session::channel();
    service.connect(ALICE, broken.clone());
    service.connect(BOB, bob_session);
    drop(broken_rx);

    assert!(service.send_personal_message("through", BOB, ALICE).await);

    let frame: DeliveryFrame = serde_json::from_str(&bob_rx.recv().await.unwrap()).unwrap();
    assert_eq!(frame.message, "through");
    // The broken session was pruned; alice is offline now.
    assert!(!service.online_users().contains(&ALICE));
}

/// History backend that refuses every operation, standing in for an
/// unreachable store.
struct UnreachableHistory;

#[async_trait]
impl ChatHistory for UnreachableHistory {
    async fn append(&self, _key: ChatKey, _record: &MessageRecord) -> Result<()> {
        bail!("store unreachable")
    }
    async fn read(&self, _key: ChatKey, _limit: usize) -> Result<Vec<MessageRecord>> {
        bail!("store unreachable")
    }
    async fn count(&self, _key: ChatKey) -> Result<usize> {
        bail!("store unreachable")
    }
    async fn clear(&self, _key: ChatKey) -> Result<bool> {
        bail!("store unreachable")
    }
}

#[tokio::test]
async fn store_failure_fails_the_send_without_fan_out() {
    let service = ChatService::new(Arc::new(UnreachableHistory), Some(test_directory()), 50);

    let (bob_session, mut bob_rx) = Session::channel();
    service.connect(BOB, bob_session.clone());

    assert_eq!(
        service.deliver("lost", BOB, ALICE).await,
        SendOutcome::Failed
    );
    assert!(!service.send_personal_message("lost", BOB, ALICE).await);
    // Persistence precedes fan-out, so nothing reached the live session.
    assert!(bob_rx.try_recv().is_err());
    // The session itself is untouched; the connection outlives failed sends.
    assert!(service.registry().sessions_of(BOB).contains(&bob_session));
}
