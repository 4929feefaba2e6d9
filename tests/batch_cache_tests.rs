//! Integration Tests for batch execution over the cache
//!
//! Fans work out with the batch executor where each item consults the
//! cache-aside store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use batch_cache::cache::{Backend, CacheAside, MemoryBackend, NullBackend};
use batch_cache::{BatchExecutor, CacheError};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Score {
    site: String,
    value: u32,
    checked_at: DateTime<Utc>,
}

fn checked_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap()
}

/// Scores every site through `getset`, counting how often the slow path runs.
async fn score_sites(
    executor: &BatchExecutor,
    cache: &CacheAside,
    sites: &[&str],
    computed: &AtomicUsize,
) -> Result<Vec<Score>, CacheError> {
    executor
        .run(sites.iter().map(|s| s.to_string()), |site, index| async move {
            let key = format!("score:{}", site);
            cache
                .getset(
                    &key,
                    || async {
                        computed.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok::<_, CacheError>(Score {
                            site: site.clone(),
                            value: index as u32 * 10,
                            checked_at: checked_at(),
                        })
                    },
                    None,
                )
                .await
        })
        .await
}

#[tokio::test]
async fn test_second_run_served_from_cache() {
    let cache = CacheAside::new(Arc::new(MemoryBackend::new()), "it:");
    let executor = BatchExecutor::new().with_concurrency_limit(2);
    let computed = AtomicUsize::new(0);
    let sites = ["a.example", "b.example", "c.example", "d.example", "e.example"];

    let first = score_sites(&executor, &cache, &sites, &computed).await.unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(computed.load(Ordering::SeqCst), 5);

    let second = score_sites(&executor, &cache, &sites, &computed).await.unwrap();
    assert_eq!(second.len(), 5);
    assert_eq!(computed.load(Ordering::SeqCst), 5, "second run must not recompute");

    let mut first = first;
    let mut second = second;
    first.sort_by(|a, b| a.site.cmp(&b.site));
    second.sort_by(|a, b| a.site.cmp(&b.site));
    assert_eq!(first, second);
    assert!(second.iter().all(|s| s.checked_at == checked_at()));

    let stats = cache.stats();
    assert_eq!(stats.hits, 5);
    assert_eq!(stats.computes, 5);
}

#[tokio::test]
async fn test_null_backend_always_recomputes() {
    let cache = CacheAside::new(Arc::new(NullBackend), "it:");
    let executor = BatchExecutor::new();
    let computed = AtomicUsize::new(0);
    let sites = ["a.example", "b.example", "c.example"];

    score_sites(&executor, &cache, &sites, &computed).await.unwrap();
    score_sites(&executor, &cache, &sites, &computed).await.unwrap();

    assert_eq!(computed.load(Ordering::SeqCst), 6);
    assert_eq!(cache.stats().writes, 0);
}

#[tokio::test]
async fn test_cancellation_token_stops_admission() {
    let token = CancellationToken::new();
    let launched = AtomicUsize::new(0);

    let results = BatchExecutor::new()
        .with_concurrency_limit(2)
        .run_until(
            0..10u32,
            |n, _| {
                launched.fetch_add(1, Ordering::SeqCst);
                let token = token.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    // the fourth item cancels further admissions
                    if n == 3 {
                        token.cancel();
                    }
                    Ok::<_, CacheError>(n)
                }
            },
            &token,
        )
        .await
        .unwrap();

    // The signal is polled before the drain barrier: item 4 passes the check
    // while 3 is still pending, is admitted after the drain, and item 5 is
    // the first one refused.
    assert_eq!(launched.load(Ordering::SeqCst), 5);
    let mut results = results;
    results.sort();
    assert_eq!(results, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_cache_failure_fails_batch() {
    let cache = CacheAside::new(Arc::new(MemoryBackend::new()), "it:");

    // corrupt one entry so its read fails
    cache
        .backend()
        .set("it:bad", "{oops".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    let result = BatchExecutor::new()
        .run(vec!["good", "bad", "other"], |key, _| {
            let cache = &cache;
            async move {
                cache
                    .getset(key, || async { Ok::<_, CacheError>(1u32) }, None)
                    .await
            }
        })
        .await;

    assert!(matches!(result, Err(CacheError::Serialization(_))));
}
