//! Concurrent registrations of the same kind

mod common;

use common::*;
use regcache::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn coordinator(
    store: &Arc<ScriptedStore>,
    cache: &Arc<RecordingCache>,
) -> WriteCoordinator<User> {
    WriteCoordinator::<User>::new(store.clone(), cache.clone(), KeyNamer::default())
        .unwrap()
        .with_retry(fast_retry(3))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_alice_and_bob_register_concurrently() {
    let store = Arc::new(ScriptedStore::new());
    let cache = Arc::new(RecordingCache::new());
    cache.seed("users:all", b"[]").await;
    let coordinator = coordinator(&store, &cache);

    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|name| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.register_and_cache(user(name)).await })
        })
        .collect();

    let mut registrations = Vec::new();
    for handle in handles {
        registrations.push(handle.await.unwrap().unwrap());
    }

    for registration in &registrations {
        assert_eq!(registration.state(), RegistrationState::Invalidated);
        let key = format!("user:{}", registration.id());
        assert_eq!(cache.count(|c| *c == CacheCall::Set(key.clone())), 1);
        assert_eq!(
            &decode_user(&cache.peek(&key).await.unwrap()),
            registration.record()
        );
    }

    let mut ids: Vec<String> = registrations.iter().map(|r| r.id().to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["u1", "u2"]);

    assert_eq!(cache.keys().await, vec!["user:u1", "user:u2"]);
    assert_eq!(
        cache.count(|c| *c == CacheCall::DeleteByPrefix("users:".into())),
        2
    );
    assert_eq!(store.len().await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_listing_sees_every_concurrent_registration() {
    let store = Arc::new(ScriptedStore::new());
    let cache = Arc::new(RecordingCache::new());
    let coordinator = coordinator(&store, &cache);
    let reader = coordinator.reader(Duration::from_secs(60));

    let names: Vec<String> = (0..16).map(|i| format!("user{i}")).collect();
    let handles: Vec<_> = names
        .iter()
        .cloned()
        .map(|name| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.register_and_cache(user(&name)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Readers that start after every registration returned see all records
    let listed = reader.list(&ListQuery::all()).await.unwrap();
    assert_eq!(listed.len(), names.len());
    for i in 1..=names.len() {
        let key = format!("user:u{i}");
        assert!(cache.peek(&key).await.is_some(), "missing {key}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_names_race_to_a_single_winner() {
    let store = Arc::new(ScriptedStore::new());
    let cache = Arc::new(RecordingCache::new());
    let coordinator = coordinator(&store, &cache);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.register_and_cache(user("alice")).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => winners += 1,
            Err(err) => assert!(matches!(
                err.persist_error(),
                Some(PersistError::Conflict { .. })
            )),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(store.len().await, 1);
    assert_eq!(cache.keys().await.len(), 1);
}
