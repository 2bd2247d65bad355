// src/scheduler/frontier.rs
// =============================================================================
// This module drives the traversal: one task per visited item.
//
// Each task:
// 1. Waits for a permit from the admission controller (or gives up)
// 2. Expands its item into children
// 3. Charges the children against the cap
// 4. Pushes every child onto the result stream, then spawns a task for it
//
// Completion:
// - A shared pending counter tracks live tasks
// - When it returns to zero the run waits for the admission controller and
//   drops the last result sender, which ends the stream
//
// Rust concepts:
// - Arc: Shared ownership of the context between many tasks
// - Drop: The pending guard decrements on every exit path, panics included
// - BoxFuture: A task that spawns tasks of its own type needs a boxed future
// =============================================================================

use std::fmt::Debug;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use futures::Stream;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, warn};

use super::admission::AdmissionController;

/// Turns one item into its children.
///
/// Called concurrently for different items. An error ends the branch rooted
/// at that item and nothing else.
#[async_trait]
pub trait Expand<P>: Send + Sync + 'static {
    async fn expand(&self, item: &P) -> anyhow::Result<Vec<P>>;
}

/// Runs one traversal. Single-use: `run` consumes it.
pub struct Scheduler<P> {
    admission: Arc<AdmissionController>,
    results_tx: mpsc::Sender<P>,
    results_rx: Option<mpsc::Receiver<P>>,
    pending: Arc<Pending>,
}

impl<P> Scheduler<P>
where
    P: Clone + Debug + Send + Sync + 'static,
{
    pub fn new(admission: Arc<AdmissionController>) -> Self {
        // Capacity 1: a producer parks until the consumer reads
        let (results_tx, results_rx) = mpsc::channel(1);

        Self {
            admission,
            results_tx,
            results_rx: Some(results_rx),
            pending: Arc::new(Pending::default()),
        }
    }

    /// Hands out the result stream. Only the first call gets the live
    /// stream; later calls get one that is already finished.
    pub fn results(&mut self) -> Results<P> {
        Results {
            rx: self.results_rx.take(),
        }
    }

    /// Traverses from `seed` and returns once every spawned task has retired
    /// and the result stream is closed.
    pub async fn run<E>(self, expand: E, seed: P)
    where
        E: Expand<P>,
    {
        let Scheduler {
            admission,
            results_tx,
            results_rx,
            pending,
        } = self;
        // Nobody asked for the stream, so nobody will ever read it
        drop(results_rx);

        let frontier = Arc::new(Frontier {
            admission: Arc::clone(&admission),
            expand,
            results: results_tx,
            pending: Arc::clone(&pending),
        });

        debug!(seed = ?seed, "starting traversal");
        let guard = PendingGuard::new(&pending);
        tokio::spawn(Arc::clone(&frontier).visit(seed, guard));

        pending.drained().await;
        admission.wait().await;

        debug!(
            takes = admission.takes(),
            max_takes = admission.max_takes(),
            "traversal finished"
        );
        // Last sender goes away here, the stream ends
        drop(frontier);
    }
}

/// Items visited by a run, in arrival order.
///
/// Reading is what lets producers make progress: a task that found children
/// waits until each one has been read.
pub struct Results<P> {
    rx: Option<mpsc::Receiver<P>>,
}

impl<P> Unpin for Results<P> {}

impl<P> Stream for Results<P> {
    type Item = P;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<P>> {
        match self.rx.as_mut() {
            Some(rx) => rx.poll_recv(cx),
            None => Poll::Ready(None),
        }
    }
}

// Everything a task needs, shared by all tasks of one run
struct Frontier<P, E> {
    admission: Arc<AdmissionController>,
    expand: E,
    results: mpsc::Sender<P>,
    pending: Arc<Pending>,
}

impl<P, E> Frontier<P, E>
where
    P: Clone + Debug + Send + Sync + 'static,
    E: Expand<P>,
{
    fn visit(self: Arc<Self>, item: P, guard: PendingGuard) -> BoxFuture<'static, ()> {
        async move {
            let _guard = guard;

            if !self.admission.take().await {
                debug!(item = ?item, "max takes reached, stop crawling");
                return;
            }

            let children = match self.expand.expand(&item).await {
                Ok(children) => children,
                Err(e) => {
                    error!(item = ?item, error = %e, "expanding item failed");
                    return;
                }
            };

            self.admission.done(children.len());

            for child in children {
                // Counted before the push so the run can never see zero while
                // this child is still on its way
                let child_guard = PendingGuard::new(&self.pending);

                if self.results.send(child.clone()).await.is_err() {
                    warn!(item = ?item, "result stream dropped, abandoning branch");
                    return;
                }

                tokio::spawn(Arc::clone(&self).visit(child, child_guard));
            }
        }
        .boxed()
    }
}

#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    drained: Notify,
}

impl Pending {
    async fn drained(&self) {
        // notify_one stores a permit, so a wakeup between the load and the
        // await is not lost
        while self.count.load(Ordering::Acquire) != 0 {
            self.drained.notified().await;
        }
    }
}

struct PendingGuard {
    pending: Arc<Pending>,
}

impl PendingGuard {
    fn new(pending: &Arc<Pending>) -> Self {
        pending.count.fetch_add(1, Ordering::AcqRel);
        Self {
            pending: Arc::clone(pending),
        }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.pending.drained.notify_one();
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why count pending tasks instead of joining handles?
//    - Tasks spawn more tasks, so there is no fixed list of handles to join
//    - A counter that starts at one (the seed) and only grows while some task
//      is alive can reach zero exactly once: when the whole tree is done
//
// 2. What does `impl Drop for PendingGuard` buy us?
//    - drop() runs however the task ends: early return, error, even a panic
//    - So the counter cannot get stuck above zero because of a forgotten
//      decrement on some exit path
//
// 3. Why is the stream closed by dropping a Sender?
//    - A tokio mpsc channel ends (recv returns None) once every Sender is gone
//    - Every task holds a clone through the shared Frontier; the run holds
//      the last one and drops it after the admission controller has stopped
//
// 4. What is BoxFuture?
//    - Pin<Box<dyn Future + Send>>: a future with a known size
//    - visit() spawns visit(); without the box the compiler would need the
//      size of a future that contains itself
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::testing::assert_no_alive_tasks;
    use crate::scheduler::AdmissionConfig;
    use anyhow::anyhow;
    use futures::StreamExt;
    use std::collections::HashSet;
    use std::time::Duration;

    // Three children per item; "-1" always fails, and nothing deeper than
    // `max_depth` slashes gets children
    struct MockExpand {
        max_depth: Option<usize>,
        failing: Option<&'static str>,
        latency: Duration,
    }

    impl MockExpand {
        fn unbounded() -> Self {
            Self {
                max_depth: None,
                failing: None,
                latency: Duration::ZERO,
            }
        }

        fn depth(max_depth: usize) -> Self {
            Self {
                max_depth: Some(max_depth),
                ..Self::unbounded()
            }
        }
    }

    #[async_trait]
    impl Expand<String> for MockExpand {
        async fn expand(&self, item: &String) -> anyhow::Result<Vec<String>> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if item == "-1" || Some(item.as_str()) == self.failing {
                return Err(anyhow!("fake error"));
            }
            let depth = item.matches('/').count();
            if self.max_depth.is_some_and(|max| depth >= max) {
                return Ok(Vec::new());
            }
            Ok((1..=3).map(|idx| format!("{}/{}", item, idx)).collect())
        }
    }

    fn scheduler(max_takes: usize) -> Scheduler<String> {
        scheduler_with(AdmissionConfig {
            defer_time: Duration::from_millis(1),
            max_takes,
            max_workers: 1,
        })
    }

    fn scheduler_with(config: AdmissionConfig) -> Scheduler<String> {
        Scheduler::new(Arc::new(AdmissionController::new(config)))
    }

    async fn crawl(mut scheduler: Scheduler<String>, expand: MockExpand, seed: &str) -> Vec<String> {
        let mut results = scheduler.results();
        let run = tokio::spawn(scheduler.run(expand, seed.to_string()));

        let mut ids = Vec::new();
        while let Some(id) = results.next().await {
            ids.push(id);
        }

        run.await.unwrap();
        ids
    }

    fn parent_of(id: &str) -> &str {
        id.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_success() {
        let ids = crawl(scheduler(10), MockExpand::unbounded(), "1").await;

        assert_eq!(ids.len(), 12);

        // First level
        let mut first: Vec<_> = ids[..3].to_vec();
        first.sort();
        assert_eq!(first, vec!["1/1", "1/2", "1/3"]);

        // Second level
        let mut second: Vec<_> = ids[3..].to_vec();
        second.sort();
        assert_eq!(
            second,
            vec![
                "1/1/1", "1/1/2", "1/1/3", "1/2/1", "1/2/2", "1/2/3", "1/3/1", "1/3/2", "1/3/3",
            ]
        );

        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_failure() {
        let ids = crawl(scheduler(10), MockExpand::unbounded(), "-1").await;

        assert!(ids.is_empty());
        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cap_larger_than_tree_terminates() {
        let ids = crawl(scheduler(100), MockExpand::depth(2), "1").await;

        assert_eq!(ids.len(), 12);
        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_branch_contributes_nothing() {
        let expand = MockExpand {
            failing: Some("1/2"),
            ..MockExpand::depth(2)
        };
        let ids = crawl(scheduler(100), expand, "1").await;

        // 1/2 itself is still emitted by its parent
        assert!(ids.contains(&"1/2".to_string()));
        assert!(!ids.iter().any(|id| id.starts_with("1/2/")));
        assert_eq!(ids.len(), 9);
        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_emitted_before_child() {
        let ids = crawl(scheduler(40), MockExpand::unbounded(), "1").await;

        let mut seen = HashSet::new();
        for id in &ids {
            let parent = parent_of(id);
            assert!(parent == "1" || seen.contains(parent), "{} before {}", id, parent);
            seen.insert(id.as_str());
        }
        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_overshoot_is_bounded() {
        let max_takes = 10;
        let fanout = 3;
        let ids = crawl(scheduler(max_takes), MockExpand::unbounded(), "1").await;

        assert!(ids.len() >= max_takes);
        // Only the expansion admitted just under the cap goes past it
        assert!(ids.len() <= max_takes + fanout, "{} items", ids.len());
        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_overshoot_is_bounded_with_width_and_latency() {
        let max_takes = 10;
        let fanout = 3;
        let max_workers = 3;
        let defer_time = Duration::from_millis(1);
        let expand = MockExpand {
            latency: Duration::from_millis(5),
            ..MockExpand::unbounded()
        };

        let ids = crawl(
            scheduler_with(AdmissionConfig {
                defer_time,
                max_takes,
                max_workers,
            }),
            expand,
            "1",
        )
        .await;

        // Permits granted while earlier expansions are still sleeping are not
        // charged yet: at most `max_workers` per tick over one latency window
        let ticks_in_flight = 5 + 1;
        let uncharged = max_workers * ticks_in_flight;
        assert!(ids.len() >= max_takes);
        assert!(
            ids.len() <= max_takes + fanout * (1 + uncharged),
            "{} items",
            ids.len()
        );
        assert_no_alive_tasks().await;
    }

    async fn repeat_scenario_a(runs: usize) {
        for run in 0..runs {
            let ids = crawl(scheduler(10), MockExpand::unbounded(), "1").await;
            assert_eq!(ids.len(), 12, "run {}: {:?}", run, ids);
            assert_no_alive_tasks().await;
        }
    }

    #[tokio::test]
    async fn test_scheduler_success_real_clock() {
        repeat_scenario_a(20).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_scheduler_success_real_clock_multi_thread() {
        repeat_scenario_a(20).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_results_still_terminates() {
        let mut scheduler = scheduler(50);
        drop(scheduler.results());

        scheduler.run(MockExpand::unbounded(), "1".to_string()).await;
        assert_no_alive_tasks().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_is_single_pass() {
        let mut scheduler = scheduler(10);
        let mut first = scheduler.results();
        let mut second = scheduler.results();

        assert!(second.next().await.is_none());

        let run = tokio::spawn(scheduler.run(MockExpand::depth(1), "1".to_string()));
        let mut count = 0;
        while first.next().await.is_some() {
            count += 1;
        }
        run.await.unwrap();
        assert_eq!(count, 3);
        assert_no_alive_tasks().await;
    }
}
