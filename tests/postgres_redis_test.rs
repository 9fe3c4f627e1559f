//! End-to-end registration against live PostgreSQL and Redis
//!
//! Requires `DATABASE_URL` and `REDIS_URL`. Run with `cargo test -- --ignored`.

use regcache::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub email: String,
    pub display_name: String,
}

impl Entity for Member {
    const KIND: &'static str = "member";

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }
}

fn member(email: &str) -> Member {
    Member {
        email: email.to_string(),
        display_name: email.split('@').next().unwrap_or_default().to_string(),
    }
}

/// Each test uses its own kind so parallel tests never share a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    pub email: String,
}

impl Entity for Visitor {
    const KIND: &'static str = "visitor";
}

async fn setup<T: Entity>() -> (GenericStore<T>, Arc<CacheManager>, KeyNamer) {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let redis_url =
        std::env::var("REDIS_URL").expect("REDIS_URL must be set for integration tests");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database");
    let store = GenericStore::<T>::new(pool.clone()).unwrap();
    sqlx::query(&store.drop_table_sql()).execute(&pool).await.unwrap();
    sqlx::query(&store.create_table_sql()).execute(&pool).await.unwrap();

    let cache = Arc::new(CacheManager::new(CacheConfig::new(redis_url, 3000)).unwrap());
    let namer = KeyNamer::new(format!("regcache_test_{}", std::process::id()));
    cache.delete_by_prefix(&namer.namespace_prefix(store.kind())).await.unwrap();

    (store, cache, namer)
}

#[tokio::test]
#[ignore]
async fn test_register_against_live_services() {
    let (store, cache, namer) = setup::<Member>().await;
    let kind = store.kind().clone();
    let coordinator =
        WriteCoordinator::<Member>::new(Arc::new(store), cache.clone(), namer.clone()).unwrap();

    let listing_key = namer.listing_key(&kind, &ListQuery::all());
    cache.set(&listing_key, b"[]", Duration::ZERO).await.unwrap();

    let registration = coordinator
        .register_and_cache(member("alice@example.com"))
        .await
        .unwrap();
    assert_eq!(registration.state(), RegistrationState::Invalidated);

    let point_key = namer.point_key(&kind, registration.id());
    let bytes = cache.get(&point_key).await.unwrap().unwrap();
    let cached: Record<Member> = regcache::cache_system::codec::decode(&bytes).unwrap();
    assert_eq!(&cached, registration.record());
    assert_eq!(cache.get(&listing_key).await.unwrap(), None);

    let reader = coordinator.reader(Duration::from_secs(30));
    let listed = reader.list(&ListQuery::all()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].fields.display_name, "alice");

    let err = coordinator
        .register_and_cache(member("alice@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.persist_error(),
        Some(PersistError::Conflict { .. })
    ));

    cache.delete(&point_key).await.unwrap();
    cache.delete_by_prefix(&namer.namespace_prefix(&kind)).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_store_round_trips_records() {
    let (store, _cache, _namer) = setup::<Visitor>().await;
    let visitor = |email: &str| Visitor {
        email: email.to_string(),
    };

    let created = store.insert(visitor("bob@example.com")).await.unwrap();
    let fetched = store.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, Some(created.clone()));

    // no unique key, so duplicates are separate records
    store.insert(visitor("carol@example.com")).await.unwrap();
    store.insert(visitor("carol@example.com")).await.unwrap();
    let page = store.list(&ListQuery::page(2, 0)).await.unwrap();
    assert_eq!(page.len(), 2);
    assert!(page.iter().all(|r| r.fields.email == "carol@example.com"));

    let oldest = store
        .list(&ListQuery::all().order(SortOrder::OldestFirst))
        .await
        .unwrap();
    assert_eq!(oldest[0].id, created.id);
}
