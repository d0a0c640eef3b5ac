//! Scheduler (spec §4.G).
//!
//! Owns the due-queue and the bounded worker pool that runs polls. Grounded
//! on the teacher's `servers/api-server/src/services/scheduler.rs`
//! (`tokio::spawn` background loop, `std::sync::Mutex`-guarded metrics) and
//! the `other_examples` healthcheck crate's `Semaphore`-gated concurrency
//! cap, generalized from one fixed tick to a per-service due-queue with
//! jitter and failure backoff.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use db::models::Service;
use rand::Rng;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::poll_executor::PollExecutor;

/// Consecutive poll failures before backoff starts extending the interval.
const BACKOFF_THRESHOLD: u32 = 3;
/// Backoff multiplier ceiling relative to the configured interval.
const MAX_BACKOFF_MULTIPLIER: u64 = 10;
/// `min(32, 4×CPU)` per spec; callers compute the CPU-scaled half of that.
pub const DEFAULT_WORKERS: usize = 32;
/// Default grace period for in-flight workers on shutdown.
pub const DEFAULT_DRAIN_DEADLINE: Duration = Duration::from_secs(30);

struct Slot {
    service: Service,
    consecutive_failures: u32,
    in_flight: bool,
}

/// Priority structure keyed by `next_poll_at`, plus the per-service slot
/// state backing lifecycle hooks and backoff.
struct DueQueue {
    heap: BinaryHeap<Reverse<(DateTime<Utc>, Uuid)>>,
    slots: HashMap<Uuid, Slot>,
}

impl DueQueue {
    fn new() -> Self {
        Self { heap: BinaryHeap::new(), slots: HashMap::new() }
    }

    fn insert(&mut self, service: Service, next_poll_at: DateTime<Utc>) {
        let id = service.id;
        self.heap.push(Reverse((next_poll_at, id)));
        self.slots.insert(id, Slot { service, consecutive_failures: 0, in_flight: false });
    }

    fn remove(&mut self, id: Uuid) {
        self.slots.remove(&id);
    }

    fn next_due_at(&self) -> Option<DateTime<Utc>> {
        self.heap.peek().map(|Reverse((at, _))| *at)
    }

    /// Pops every entry at or before `now` whose slot is still registered
    /// and not already in flight; stale heap entries for removed/in-flight
    /// services are simply dropped.
    fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<Service> {
        let mut due = Vec::new();
        while let Some(Reverse((at, _))) = self.heap.peek() {
            if *at > now {
                break;
            }
            let Reverse((_, id)) = self.heap.pop().unwrap();
            if let Some(slot) = self.slots.get_mut(&id) {
                if !slot.in_flight {
                    slot.in_flight = true;
                    due.push(slot.service.clone());
                }
            }
        }
        due
    }

    fn reinsert_after_poll(&mut self, id: Uuid, success: bool, default_interval_ms: u32) {
        let Some(slot) = self.slots.get_mut(&id) else { return };
        slot.in_flight = false;
        slot.consecutive_failures = if success { 0 } else { slot.consecutive_failures + 1 };

        let base = slot.service.poll_interval_ms.filter(|&ms| ms > 0).unwrap_or(default_interval_ms as i32) as u64;
        let interval_ms = if slot.consecutive_failures >= BACKOFF_THRESHOLD {
            let multiplier = (slot.consecutive_failures - BACKOFF_THRESHOLD + 2) as u64;
            base.saturating_mul(multiplier.min(MAX_BACKOFF_MULTIPLIER))
        } else {
            base
        };

        let next_poll_at = Utc::now() + chrono::Duration::milliseconds(interval_ms as i64);
        self.heap.push(Reverse((next_poll_at, id)));
    }
}

/// Point-in-time counters, useful for an admin endpoint without exposing
/// the queue itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchedulerMetrics {
    pub polls_run: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
}

#[derive(Default)]
struct Counters {
    polls_run: AtomicU64,
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
}

/// Runs the poll loop: one dedicated dispatch task, and a bounded pool of
/// worker tasks executing [`PollExecutor::run_once_cancellable`].
pub struct Scheduler {
    queue: Arc<Mutex<DueQueue>>,
    executor: Arc<PollExecutor>,
    semaphore: Arc<Semaphore>,
    default_interval_ms: u32,
    stop: CancellationToken,
    drain: CancellationToken,
    drain_deadline: Duration,
    counters: Counters,
}

impl Scheduler {
    pub fn new(executor: PollExecutor, workers: usize, default_interval_ms: u32, drain_deadline: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(DueQueue::new())),
            executor: Arc::new(executor),
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            default_interval_ms,
            stop: CancellationToken::new(),
            drain: CancellationToken::new(),
            drain_deadline,
            counters: Counters::default(),
        }
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            polls_run: self.counters.polls_run.load(Ordering::Relaxed),
            polls_succeeded: self.counters.polls_succeeded.load(Ordering::Relaxed),
            polls_failed: self.counters.polls_failed.load(Ordering::Relaxed),
        }
    }

    /// Seeds the due-queue from the services active at startup, each
    /// jittered within its own interval to avoid a thundering herd.
    pub async fn seed(&self, services: Vec<Service>) {
        let mut queue = self.queue.lock().await;
        for service in services {
            let interval_ms = service.poll_interval_ms.filter(|&ms| ms > 0).unwrap_or(self.default_interval_ms as i32) as u64;
            let jitter_ms = rand::thread_rng().gen_range(0..interval_ms.max(1));
            let next_poll_at = Utc::now() + chrono::Duration::milliseconds(jitter_ms as i64);
            queue.insert(service, next_poll_at);
        }
    }

    /// Spawns the dispatch loop. The returned handle resolves once
    /// `shutdown` has stopped pop-dispatch and the loop task exits.
    pub fn run(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!("scheduler dispatch loop starting");
            loop {
                if self.stop.is_cancelled() {
                    break;
                }

                let wait = {
                    let queue = self.queue.lock().await;
                    match queue.next_due_at() {
                        Some(at) => (at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
                        None => Duration::from_secs(1),
                    }
                };

                tokio::select! {
                    _ = sleep(wait) => {}
                    _ = self.stop.cancelled() => break,
                }

                let due = {
                    let mut queue = self.queue.lock().await;
                    queue.pop_due(Utc::now())
                };

                for service in due {
                    let scheduler = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = match scheduler.semaphore.clone().acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => return,
                        };
                        let id = service.id;
                        let result = scheduler.executor.run_once_cancellable(&service, &scheduler.drain).await;
                        scheduler.counters.polls_run.fetch_add(1, Ordering::Relaxed);
                        if result.success {
                            scheduler.counters.polls_succeeded.fetch_add(1, Ordering::Relaxed);
                        } else {
                            scheduler.counters.polls_failed.fetch_add(1, Ordering::Relaxed);
                            warn!(service_id = %id, error = ?result.error, "poll failed");
                        }
                        let mut queue = scheduler.queue.lock().await;
                        queue.reinsert_after_poll(id, result.success, scheduler.default_interval_ms);
                    });
                }
            }
            info!("scheduler dispatch loop stopped");
        })
    }

    pub async fn on_service_created(&self, service: Service) {
        self.schedule_with_jitter(service).await;
    }

    pub async fn on_service_updated(&self, service: Service) {
        let mut queue = self.queue.lock().await;
        queue.remove(service.id);
        queue.insert(service, Utc::now());
    }

    pub async fn on_service_deleted(&self, id: Uuid) {
        let mut queue = self.queue.lock().await;
        queue.remove(id);
    }

    pub async fn on_service_activated(&self, service: Service) {
        self.schedule_with_jitter(service).await;
    }

    pub async fn on_service_deactivated(&self, id: Uuid) {
        let mut queue = self.queue.lock().await;
        queue.remove(id);
    }

    async fn schedule_with_jitter(&self, service: Service) {
        let interval_ms = service.poll_interval_ms.filter(|&ms| ms > 0).unwrap_or(self.default_interval_ms as i32) as u64;
        let jitter_ms = rand::thread_rng().gen_range(0..interval_ms.max(1));
        let next_poll_at = Utc::now() + chrono::Duration::milliseconds(jitter_ms as i64);
        let mut queue = self.queue.lock().await;
        queue.insert(service, next_poll_at);
    }

    /// Stops pop-dispatch immediately; in-flight workers get `drain_deadline`
    /// to finish before their HTTP calls are cancelled via the drain token.
    pub async fn shutdown(&self) {
        self.stop.cancel();
        sleep(self.drain_deadline).await;
        self.drain.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    fn service(id: Uuid, interval_ms: Option<i32>) -> Service {
        Service {
            id,
            team_id: Uuid::new_v4(),
            name: "svc".to_string(),
            health_endpoint: "https://example.com/health".to_string(),
            metrics_endpoint: None,
            schema_config: None,
            poll_interval_ms: interval_ms,
            poll_timeout_ms: None,
            is_active: true,
            last_poll_success: None,
            last_poll_error: None,
            poll_warnings: serde_json::json!([]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn pop_due_only_returns_entries_at_or_before_now() {
        let mut queue = DueQueue::new();
        let id = Uuid::new_v4();
        queue.insert(service(id, Some(1000)), Utc::now() + ChronoDuration::seconds(10));
        assert!(queue.pop_due(Utc::now()).is_empty());
        assert_eq!(queue.pop_due(Utc::now() + ChronoDuration::seconds(11)).len(), 1);
    }

    #[test]
    fn removed_service_does_not_surface_on_pop() {
        let mut queue = DueQueue::new();
        let id = Uuid::new_v4();
        queue.insert(service(id, Some(1000)), Utc::now());
        queue.remove(id);
        assert!(queue.pop_due(Utc::now()).is_empty());
    }

    #[test]
    fn backoff_extends_interval_after_threshold_failures() {
        let mut queue = DueQueue::new();
        let id = Uuid::new_v4();
        queue.insert(service(id, Some(1000)), Utc::now());
        for _ in 0..BACKOFF_THRESHOLD {
            queue.pop_due(Utc::now() + ChronoDuration::seconds(1));
            queue.reinsert_after_poll(id, false, 30_000);
        }
        let slot = queue.slots.get(&id).unwrap();
        assert!(slot.consecutive_failures >= BACKOFF_THRESHOLD);
    }

    #[test]
    fn success_resets_failure_count() {
        let mut queue = DueQueue::new();
        let id = Uuid::new_v4();
        queue.insert(service(id, Some(1000)), Utc::now());
        queue.reinsert_after_poll(id, false, 30_000);
        queue.reinsert_after_poll(id, true, 30_000);
        assert_eq!(queue.slots.get(&id).unwrap().consecutive_failures, 0);
    }
}
