//! Shared helpers for the integration tests: counting generators and a
//! polling probe for background effects.
#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use recache::BoxError;

pub type BoxedFuture = Pin<Box<dyn Future<Output = Result<String, BoxError>> + Send>>;

/// A generator that returns `value` after `latency` and counts how many
/// times it actually ran.
pub fn counting_generator(
    value: &str,
    latency: Duration,
) -> (Arc<AtomicUsize>, impl Fn() -> BoxedFuture + Send + Sync + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let value = value.to_owned();
    let counter = Arc::clone(&calls);
    let generator = move || -> BoxedFuture {
        let value = value.clone();
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            Ok(value)
        })
    };
    (calls, generator)
}

/// A generator that always fails, counting attempts.
pub fn failing_generator() -> (Arc<AtomicUsize>, impl Fn() -> BoxedFuture + Send + Sync + 'static)
{
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let generator = move || -> BoxedFuture {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("upstream unavailable".into())
        })
    };
    (calls, generator)
}

/// Poll `probe` every few milliseconds until it reports true or `timeout`
/// passes. Background tasks have no completion handle, so tests observe
/// their effects through the store.
pub async fn eventually<F, Fut>(mut probe: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if probe().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
