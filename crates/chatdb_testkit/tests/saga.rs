//! Friend acceptance under injected journal failures.
//!
//! With nothing already applied, accept appends three journal frames in
//! order: sender update, recipient update, request delete. A compensating
//! undo of the sender update comes right after a failed recipient update.

use chatdb_chat::{ChatError, ChatStore, FriendRequest, UpdateStage, User};
use chatdb_core::StoreError;
use chatdb_testkit::prelude::*;

async fn setup(store: &ChatStore) -> (User, User, FriendRequest) {
    let users = scenarios::users(store, &["alice", "bob"]).await;
    let request = store
        .send_friend_request(&users[0].id, &users[1].id)
        .await
        .unwrap()
        .unwrap();
    let [alice, bob]: [User; 2] = users.try_into().unwrap();
    (alice, bob, request)
}

async fn friends(store: &ChatStore, user: &User) -> Vec<String> {
    store.get_user_by_id(&user.id).await.unwrap().unwrap().friends
}

async fn pending(store: &ChatStore, user: &User) -> usize {
    store.get_pending_requests(&user.id).await.unwrap().len()
}

#[tokio::test]
async fn clean_accept_appends_three_frames() {
    let (store, plan) = TestStore::flaky().await;
    let (_, _, request) = setup(&store).await;

    let before = plan.appends();
    store.accept_friend_request(&request.id).await.unwrap();
    assert_eq!(plan.appends() - before, 3);
}

#[tokio::test]
async fn failed_recipient_update_is_compensated() {
    let (store, plan) = TestStore::flaky().await;
    let (alice, bob, request) = setup(&store).await;

    plan.fail_nth_append(2);
    let err = store.accept_friend_request(&request.id).await.unwrap_err();
    assert!(matches!(err, ChatError::Store(StoreError::Storage(_))));
    assert_eq!(err.partial_stage(), None);

    assert!(friends(&store, &alice).await.is_empty());
    assert!(friends(&store, &bob).await.is_empty());
    assert_eq!(pending(&store, &bob).await, 1);

    store.accept_friend_request(&request.id).await.unwrap();
    assert_eq!(friends(&store, &alice).await, vec![bob.id.clone()]);
    assert_eq!(friends(&store, &bob).await, vec![alice.id.clone()]);
}

#[tokio::test]
async fn failed_compensation_reports_one_sided_friendship() {
    let (store, plan) = TestStore::flaky().await;
    let (alice, bob, request) = setup(&store).await;

    plan.fail_nth_append(2);
    plan.fail_nth_append(3);
    let err = store.accept_friend_request(&request.id).await.unwrap_err();
    match &err {
        ChatError::PartialUpdateFailure {
            request_id, stage, ..
        } => {
            assert_eq!(request_id, &request.id);
            assert_eq!(*stage, UpdateStage::ToUser);
        }
        other => panic!("expected partial failure, got {other}"),
    }
    assert!(std::error::Error::source(&err).is_some());

    assert_eq!(friends(&store, &alice).await, vec![bob.id.clone()]);
    assert!(friends(&store, &bob).await.is_empty());

    // Retrying converges: sender is already linked, so only two frames.
    let before = plan.appends();
    store.accept_friend_request(&request.id).await.unwrap();
    assert_eq!(plan.appends() - before, 2);
    assert_eq!(friends(&store, &bob).await, vec![alice.id.clone()]);
    assert_eq!(pending(&store, &bob).await, 0);
}

#[tokio::test]
async fn failed_request_delete_leaves_dangling_request() {
    let (store, plan) = TestStore::flaky().await;
    let (alice, bob, request) = setup(&store).await;

    plan.fail_nth_append(3);
    let err = store.accept_friend_request(&request.id).await.unwrap_err();
    assert_eq!(err.partial_stage(), Some(UpdateStage::RequestDelete));

    assert_eq!(friends(&store, &alice).await, vec![bob.id.clone()]);
    assert_eq!(friends(&store, &bob).await, vec![alice.id.clone()]);
    assert_eq!(pending(&store, &bob).await, 1);

    let before = plan.appends();
    let accepted = store.accept_friend_request(&request.id).await.unwrap();
    assert_eq!(accepted.map(|r| r.id), Some(request.id));
    assert_eq!(plan.appends() - before, 1);
    assert_eq!(pending(&store, &bob).await, 0);
}

#[tokio::test]
async fn failed_sender_update_writes_nothing() {
    let (store, plan) = TestStore::flaky().await;
    let (alice, bob, request) = setup(&store).await;

    plan.fail_nth_append(1);
    let err = store.accept_friend_request(&request.id).await.unwrap_err();
    assert!(matches!(err, ChatError::Store(_)));
    assert_eq!(plan.failures(), 1);

    assert!(friends(&store, &alice).await.is_empty());
    assert!(friends(&store, &bob).await.is_empty());
    assert_eq!(pending(&store, &bob).await, 1);
}

#[tokio::test]
async fn failed_sync_rolls_the_commit_back() {
    let (store, plan) = TestStore::flaky().await;
    let alice = store.create_user("alice").await.unwrap();
    let size = store.stats().unwrap().journal_bytes;

    plan.fail_syncs();
    assert!(store.create_user("bob").await.is_err());
    assert_eq!(store.stats().unwrap().journal_bytes, size);
    plan.heal();

    let users = store.users().get_all().await.unwrap();
    assert_eq!(users, vec![alice]);
}
