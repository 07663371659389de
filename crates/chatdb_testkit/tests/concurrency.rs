//! Read-write scopes racing from several threads on one store.

use chatdb_chat::{ChatError, ChatStore, Message};
use chatdb_core::StoreError;
use chatdb_testkit::prelude::*;
use std::future::Future;
use std::sync::Barrier;
use std::thread;

const THREADS: usize = 8;
const ROUNDS: usize = 10;

/// Runs `task(i)` on `THREADS` threads, each with its own runtime, released
/// together by a barrier.
fn race<T, F, Fut>(task: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Fut + Sync,
    Fut: Future<Output = T>,
{
    let barrier = Barrier::new(THREADS);
    thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let barrier = &barrier;
                let task = &task;
                s.spawn(move || {
                    let runtime = tokio::runtime::Builder::new_current_thread()
                        .build()
                        .expect("Failed to build runtime");
                    barrier.wait();
                    runtime.block_on(task(i))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("racing thread panicked"))
            .collect()
    })
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("Failed to build runtime")
        .block_on(future)
}

#[test]
fn racing_sends_create_one_request_per_pair() {
    for _ in 0..ROUNDS {
        let chat: ChatStore = block_on(ChatStore::open_in_memory()).unwrap();
        let users = block_on(scenarios::users(&chat, &["alice", "bob"]));
        let (a, b) = (&users[0].id, &users[1].id);

        let sent = race(|i| {
            let chat = &chat;
            async move {
                let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
                chat.send_friend_request(from, to).await.unwrap()
            }
        });

        assert_eq!(sent.iter().filter(|r| r.is_some()).count(), 1);
        let pending = block_on(async {
            let to_a = chat.get_pending_requests(a).await.unwrap();
            let to_b = chat.get_pending_requests(b).await.unwrap();
            to_a.len() + to_b.len()
        });
        assert_eq!(pending, 1);
    }
}

#[test]
fn racing_adds_of_one_message_store_it_once() {
    for _ in 0..ROUNDS {
        let chat: ChatStore = block_on(ChatStore::open_in_memory()).unwrap();
        let message = Message::text("u1", "once");

        let results = race(|_| {
            let chat = &chat;
            let message = message.clone();
            async move { chat.add_message(message).await }
        });

        let stored = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(stored, 1);
        for result in results.into_iter().filter_map(Result::err) {
            assert!(matches!(
                result,
                ChatError::Store(StoreError::DuplicateKey { .. })
            ));
        }
        assert_eq!(block_on(chat.messages().count()).unwrap(), 1);
    }
}

#[test]
fn racing_accepts_leave_a_symmetric_friendship() {
    for _ in 0..ROUNDS {
        let chat: ChatStore = block_on(ChatStore::open_in_memory()).unwrap();
        let users = block_on(scenarios::users(&chat, &["alice", "bob"]));
        let request = block_on(chat.send_friend_request(&users[0].id, &users[1].id))
            .unwrap()
            .unwrap();

        let results = race(|_| {
            let chat = &chat;
            let id = request.id.clone();
            async move { chat.accept_friend_request(&id).await.unwrap() }
        });
        assert!(results.iter().any(Option::is_some));

        let (alice, bob) = block_on(async {
            let alice = chat.get_user_by_id(&users[0].id).await.unwrap().unwrap();
            let bob = chat.get_user_by_id(&users[1].id).await.unwrap().unwrap();
            (alice, bob)
        });
        assert_eq!(alice.friends, vec![bob.id.clone()]);
        assert_eq!(bob.friends, vec![alice.id.clone()]);
        assert!(block_on(chat.get_pending_requests(&bob.id)).unwrap().is_empty());
    }
}
