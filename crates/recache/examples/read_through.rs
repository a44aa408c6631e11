//! Read-through caching walkthrough.
//!
//! Populates a key once, then watches the facade serve hits and refresh the
//! entry in the background as the cooldown allows. Runs against the
//! in-memory store so it needs no external services:
//!
//! ```sh
//! cargo run -p recache --example read_through
//! ```

use std::sync::Arc;
use std::time::Duration;

use recache::{Cache, CacheStore, CallOptions, MissPolicy};
use recache_memory::MemoryStore;

async fn data_source(key: &str) -> Result<String, recache::BoxError> {
    // Stands in for a database or upstream API call.
    tokio::time::sleep(Duration::from_millis(25)).await;
    let stamp = time::OffsetDateTime::now_utc().time();
    Ok(format!("{key}@{stamp}"))
}

#[tokio::main]
async fn main() -> recache::Result<()> {
    let store = Arc::new(MemoryStore::with_latency(Duration::from_millis(2)));
    let cache: Cache<String> = Cache::builder(store as Arc<dyn CacheStore>)
        .prefix("myapp")
        .default_ttl(Duration::from_secs(2))
        .refresh_cooldown(Duration::from_millis(1500))
        .miss_policy(MissPolicy::SyncWriteThenReturn)
        .build();

    let key = "user:123";
    cache.set(key, &"initial_user_data".to_string(), CallOptions::new()).await?;
    println!("seeded {key}\n");

    for round in 1..=8 {
        let fetched = cache
            .get_or_refresh(
                key,
                move || async move { data_source("user:123").await },
                CallOptions::new(),
            )
            .await?;
        println!(
            "round {round}: {} (from cache: {})",
            fetched.value, fetched.from_cache
        );
        tokio::time::sleep(Duration::from_millis(600)).await;
    }

    let stats = cache.stats();
    println!(
        "\nhits: {}, misses: {}, background refreshes: {}, hit rate: {:.0}%",
        stats.hits,
        stats.misses,
        stats.background_refreshes,
        stats.hit_rate()
    );
    Ok(())
}
