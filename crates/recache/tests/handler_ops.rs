//! Basic handler operations: set/get round trips, key namespacing, error
//! surfacing, invalidation, codecs, and stats.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use recache::{Cache, CacheError, CacheStore, CallOptions, MsgPackCodec};
use recache_memory::MemoryStore;

use common::failing_generator;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u64,
    name: String,
    roles: Vec<String>,
}

fn profile() -> Profile {
    Profile {
        id: 7,
        name: "ada".to_string(),
        roles: vec!["admin".to_string()],
    }
}

#[tokio::test]
async fn set_then_get_round_trips_with_prefix() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<Profile> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>)
        .prefix("app")
        .default_ttl(Duration::from_secs(60))
        .build();

    cache.set("user:7", &profile(), CallOptions::new()).await.unwrap();

    // The store sees the namespaced key, the caller never does.
    assert!(store.exists("app:user:7").await.unwrap());
    assert!(!store.exists("user:7").await.unwrap());

    let hit = cache.get("user:7").await.unwrap();
    assert_eq!(hit.value, profile());
    assert!(hit.from_cache);
}

#[tokio::test]
async fn get_on_absent_key_is_a_miss() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(store).build();

    let err = cache.get("nope").await.unwrap_err();
    assert!(err.is_miss());
}

#[tokio::test]
async fn undecodable_entry_is_not_a_miss() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<Profile> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>).build();

    store
        .set("bad", b"{ not json".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    let err = cache.get("bad").await.unwrap_err();
    assert!(matches!(err, CacheError::Decode(_)));
    assert!(!err.is_miss());
}

#[tokio::test]
async fn transport_failure_is_not_a_miss() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>).build();

    store.fail_operations(true);
    let err = cache.get("k").await.unwrap_err();
    assert!(matches!(err, CacheError::Store(_)));
    assert!(!err.is_miss());

    // The read-through path propagates it instead of generating.
    let (calls, generator) = failing_generator();
    let err = cache
        .get_or_refresh("k", generator, CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Store(_)));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generator_failure_is_wrapped() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(store).build();

    let (_calls, generator) = failing_generator();
    let err = cache
        .get_or_refresh("k", generator, CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Generator(_)));
    assert!(err.to_string().starts_with("generator: "));
}

#[tokio::test]
async fn sync_write_failure_surfaces_and_drops_the_value() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>).build();

    store.fail_writes(true);
    let err = cache
        .get_or_refresh(
            "k",
            || async { Ok::<_, recache::BoxError>("v".to_string()) },
            CallOptions::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Store(_)));

    store.fail_writes(false);
    assert!(cache.get("k").await.unwrap_err().is_miss());
}

#[tokio::test]
async fn invalidate_removes_entry_and_companion() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>)
        .prefix("app")
        .build();

    cache.set("k", &"v".to_string(), CallOptions::new()).await.unwrap();
    store
        .set(
            "app:k:stale",
            serde_json::to_vec(&"v".to_string()).unwrap(),
            Duration::from_secs(3600),
        )
        .await
        .unwrap();

    cache.invalidate("k").await.unwrap();
    assert!(!store.exists("app:k").await.unwrap());
    assert!(!store.exists("app:k:stale").await.unwrap());
}

#[tokio::test]
async fn msgpack_codec_round_trips() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<Profile> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>)
        .codec(MsgPackCodec)
        .build();

    cache.set("k", &profile(), CallOptions::new()).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap().value, profile());

    // MessagePack bytes are not JSON.
    let raw = store.get("k").await.unwrap().unwrap();
    assert!(serde_json::from_slice::<Profile>(&raw).is_err());
}

#[tokio::test]
async fn call_ttl_overrides_default() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(Arc::clone(&store) as Arc<dyn CacheStore>)
        .default_ttl(Duration::from_secs(3600))
        .build();

    cache
        .set(
            "short",
            &"v".to_string(),
            CallOptions::new().ttl(Duration::from_millis(30)),
        )
        .await
        .unwrap();
    assert!(store.exists("short").await.unwrap());

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.get("short").await.unwrap_err().is_miss());
}

#[tokio::test]
async fn stats_count_hits_and_misses() {
    let store = Arc::new(MemoryStore::new());
    let cache: Cache<String> = Cache::builder(store).build();

    assert!(cache.get("k").await.is_err());
    cache.set("k", &"v".to_string(), CallOptions::new()).await.unwrap();
    cache.get("k").await.unwrap();
    cache.get("k").await.unwrap();

    let stats = cache.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert!((stats.hit_rate() - 66.666).abs() < 0.1);
}
