//! Batch Executor Module
//!
//! Runs an async worker over a sequence of items with a concurrency ceiling.
//!
//! Items are started in input order. When the active set reaches the ceiling,
//! the executor waits for the whole active set to settle (a drain barrier)
//! before admitting the next item. All in-flight futures are polled by the
//! `run` future itself, so no task is spawned.

use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::batch::abort::{AbortSignal, NeverAbort};
use crate::config::{Config, DEFAULT_CONCURRENCY};

// == Batch Executor ==
/// Bounded-concurrency executor with a full drain barrier.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    /// Maximum number of in-flight items
    concurrency_limit: usize,
    /// Diagnostic logging only
    verbose: bool,
}

impl BatchExecutor {
    // == Constructor ==
    /// Creates an executor with the default ceiling of 3.
    pub fn new() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            verbose: false,
        }
    }

    /// Creates an executor from the batch settings of a `Config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_concurrency_limit(config.batch_concurrency)
            .with_verbose(config.batch_verbose)
    }

    /// Sets the concurrency ceiling. A ceiling of zero behaves like one.
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit.max(1);
        self
    }

    /// Enables per-item diagnostic logging.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    // == Run ==
    /// Runs `worker` over every item and returns the successful results in
    /// completion order.
    ///
    /// # Arguments
    /// * `items` - The work items, started in iteration order
    /// * `worker` - Called with each item and its zero-based index
    ///
    /// # Errors
    /// The first worker failure observed is returned unchanged. Results of
    /// items that completed before it are discarded.
    pub async fn run<I, T, N, E, F, Fut>(&self, items: I, worker: F) -> Result<Vec<N>, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T, usize) -> Fut,
        Fut: Future<Output = Result<N, E>>,
    {
        self.run_until(items, worker, &NeverAbort).await
    }

    // == Run Until ==
    /// Same as [`run`](Self::run), but polls `abort` before starting each item.
    ///
    /// Once `abort` fires no further items are started; items already in
    /// flight are awaited and their results returned.
    pub async fn run_until<I, T, N, E, F, Fut, A>(
        &self,
        items: I,
        mut worker: F,
        abort: &A,
    ) -> Result<Vec<N>, E>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T, usize) -> Fut,
        Fut: Future<Output = Result<N, E>>,
        A: AbortSignal + ?Sized,
    {
        let mut active = FuturesUnordered::new();
        let mut results = Vec::new();
        let mut started = 0usize;

        for (index, item) in items.into_iter().enumerate() {
            if abort.should_abort() {
                info!(
                    "Batch aborted before item {} ({} started, {} in flight)",
                    index,
                    started,
                    active.len()
                );
                break;
            }

            if active.len() >= self.concurrency_limit {
                if self.verbose {
                    debug!("Draining {} active items before item {}", active.len(), index);
                }
                self.drain(&mut active, &mut results).await?;
            }

            if self.verbose {
                debug!("Starting item {}", index);
            }
            active.push(worker(item, index));
            started += 1;
        }

        self.drain(&mut active, &mut results).await?;

        if self.verbose {
            info!(
                "Batch finished: {} started, {} succeeded",
                started,
                results.len()
            );
        }

        Ok(results)
    }

    // == Drain ==
    /// Waits for every active item to settle.
    ///
    /// Successful results are appended in completion order. If any item
    /// fails, the rest of the active set still runs to completion and the
    /// first failure is returned afterwards.
    async fn drain<N, E, Fut>(
        &self,
        active: &mut FuturesUnordered<Fut>,
        results: &mut Vec<N>,
    ) -> Result<(), E>
    where
        Fut: Future<Output = Result<N, E>>,
    {
        let mut first_failure = None;

        while let Some(outcome) = active.next().await {
            match outcome {
                Ok(value) => results.push(value),
                Err(err) => {
                    if first_failure.is_none() {
                        warn!("Batch item failed, stopping after the active set settles");
                        first_failure = Some(err);
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Tracks how many workers are pending at once.
    #[derive(Default)]
    struct Gauge {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Gauge {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn exit(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_executor_defaults() {
        let executor = BatchExecutor::new();
        assert_eq!(executor.concurrency_limit(), 3);
        assert_eq!(BatchExecutor::default().concurrency_limit(), 3);
    }

    #[test]
    fn test_zero_limit_clamped() {
        let executor = BatchExecutor::new().with_concurrency_limit(0);
        assert_eq!(executor.concurrency_limit(), 1);
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            batch_concurrency: 7,
            batch_verbose: true,
            ..Config::default()
        };
        let executor = BatchExecutor::from_config(&config);
        assert_eq!(executor.concurrency_limit(), 7);
        assert!(executor.verbose);
    }

    #[tokio::test]
    async fn test_doubles_with_limit_two() {
        let gauge = Arc::new(Gauge::default());
        let executor = BatchExecutor::new().with_concurrency_limit(2);

        let results = executor
            .run(vec![1, 2, 3, 4, 5], |x: i32, _| {
                let gauge = gauge.clone();
                async move {
                    gauge.enter();
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    gauge.exit();
                    Ok::<_, String>(x * 2)
                }
            })
            .await
            .unwrap();

        let mut sorted = results.clone();
        sorted.sort();
        assert_eq!(sorted, vec![2, 4, 6, 8, 10]);
        assert!(gauge.peak() <= 2, "peak was {}", gauge.peak());
        assert_eq!(gauge.peak(), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = BatchExecutor::new()
            .run(Vec::<u32>::new(), |x, _| async move { Ok::<_, String>(x) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_worker_receives_index() {
        let results = BatchExecutor::new()
            .run(vec!["a", "b", "c"], |item, index| async move {
                Ok::<_, String>(format!("{}{}", item, index))
            })
            .await
            .unwrap();

        let mut sorted = results;
        sorted.sort();
        assert_eq!(sorted, vec!["a0", "b1", "c2"]);
    }

    #[tokio::test]
    async fn test_results_in_completion_order() {
        // Item 0 is slow, item 1 is fast: item 1 completes first
        let results = BatchExecutor::new()
            .with_concurrency_limit(2)
            .run(vec![60u64, 5], |delay, index| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, String>(index)
            })
            .await
            .unwrap();

        assert_eq!(results, vec![1, 0]);
    }

    #[tokio::test]
    async fn test_drain_barrier_waits_for_whole_batch() {
        // With limit 2, item 2 must not start until both 0 and 1 finished,
        // even though item 0 finishes long before item 1.
        let log = Arc::new(Mutex::new(Vec::new()));
        let executor = BatchExecutor::new().with_concurrency_limit(2);

        executor
            .run(vec![5u64, 80, 5], |delay, index| {
                let log = log.clone();
                async move {
                    log.lock().unwrap().push(format!("start {}", index));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    log.lock().unwrap().push(format!("end {}", index));
                    Ok::<_, String>(())
                }
            })
            .await
            .unwrap();

        let log = log.lock().unwrap().clone();
        let end_1 = log.iter().position(|e| e == "end 1").unwrap();
        let start_2 = log.iter().position(|e| e == "start 2").unwrap();
        assert!(end_1 < start_2, "log: {:?}", log);
    }

    #[tokio::test]
    async fn test_abort_immediately_starts_nothing() {
        let launched = AtomicUsize::new(0);

        let results = BatchExecutor::new()
            .run_until(
                vec![1, 2, 3],
                |x: i32, _| {
                    launched.fetch_add(1, Ordering::SeqCst);
                    async move { Ok::<_, String>(x) }
                },
                &|| true,
            )
            .await
            .unwrap();

        assert!(results.is_empty());
        assert_eq!(launched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_abort_midway_completes_started_items() {
        let launched = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = launched.clone();

        let results = BatchExecutor::new()
            .with_concurrency_limit(3)
            .run_until(
                vec![1, 2, 3, 4, 5],
                |x: i32, _| {
                    launched.fetch_add(1, Ordering::SeqCst);
                    let finished = finished.clone();
                    async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        finished.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, String>(x)
                    }
                },
                &move || counter.load(Ordering::SeqCst) >= 2,
            )
            .await
            .unwrap();

        assert_eq!(launched.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        let mut sorted = results;
        sorted.sort();
        assert_eq!(sorted, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failure_propagates_verbatim() {
        let launched = AtomicUsize::new(0);
        let settled = Arc::new(AtomicUsize::new(0));

        // limit 2: [0,1] drain, [2,3] drain fails, item 4 never starts
        let result = BatchExecutor::new()
            .with_concurrency_limit(2)
            .run(vec![0, 1, 2, 3, 4], |x: i32, _| {
                launched.fetch_add(1, Ordering::SeqCst);
                let settled = settled.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    settled.fetch_add(1, Ordering::SeqCst);
                    if x == 2 {
                        Err(format!("item {} failed", x))
                    } else {
                        Ok(x)
                    }
                }
            })
            .await;

        assert_eq!(result, Err("item 2 failed".to_string()));
        assert_eq!(launched.load(Ordering::SeqCst), 4);
        // item 3 was in the same active set and still ran to completion
        assert_eq!(settled.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let result = BatchExecutor::new()
            .with_concurrency_limit(3)
            .run(vec![30u64, 5, 60], |delay, index| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Err::<(), _>(index)
            })
            .await;

        // item 1 fails first in completion order
        assert_eq!(result, Err(1));
    }
}
