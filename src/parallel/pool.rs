use crossbeam::channel::{Receiver, Sender, TrySendError, bounded, select, unbounded};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use super::error::{PoolError, TaskError};
use super::task::{self, CancelToken, TaskHandle, TaskShared, lock};

/// Scanning is I/O bound, so the automatic ceiling oversubscribes the cores.
const IO_WORKERS_PER_CORE: usize = 4;

pub(crate) type Job = Box<dyn FnOnce(&Activity) + Send + 'static>;

/// Elastic sizing policy for a [`WorkerPool`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPolicy {
    /// Workers kept alive even when idle (started eagerly)
    pub min_workers: usize,
    /// Hard ceiling on live worker threads
    pub max_workers: usize,
    /// How long a surplus worker may sit idle before it exits
    pub idle_timeout: Duration,
    /// Intake queue bound (0 = unbounded, no backpressure)
    pub queue_capacity: usize,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            min_workers: 0,
            max_workers: Self::auto_max_workers(),
            idle_timeout: Duration::from_secs(60),
            queue_capacity: 0,
        }
    }
}

impl PoolPolicy {
    /// Ceiling used when the configuration asks for "auto" (`max_workers = 0`)
    pub fn auto_max_workers() -> usize {
        num_cpus::get().max(1) * IO_WORKERS_PER_CORE
    }

    /// A pool that never grows or shrinks
    pub fn fixed(workers: usize) -> Self {
        Self {
            min_workers: workers,
            max_workers: workers,
            ..Self::default()
        }
    }

    fn normalized(mut self) -> Self {
        self.max_workers = self.max_workers.max(1);
        self.min_workers = self.min_workers.min(self.max_workers);
        self
    }
}

/// Point-in-time view of pool utilisation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Most tasks ever running at the same time
    pub peak_concurrency: usize,
    /// Most worker threads ever alive at the same time
    pub largest_pool_size: usize,
    pub live_workers: usize,
    pub idle_workers: usize,
    pub active_tasks: usize,
    pub submitted_tasks: usize,
    pub completed_tasks: usize,
}

/// Running-task bookkeeping, entered by a job only once its body really starts.
#[derive(Debug, Default)]
pub(crate) struct Activity {
    active: AtomicUsize,
    peak: AtomicUsize,
    completed: AtomicUsize,
}

impl Activity {
    pub(crate) fn enter(&self) -> ActiveGuard<'_> {
        let running = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        ActiveGuard { activity: self }
    }
}

pub(crate) struct ActiveGuard<'a> {
    activity: &'a Activity,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.activity.active.fetch_sub(1, Ordering::SeqCst);
        self.activity.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Worker bookkeeping guarded by the pool mutex
struct Workers {
    live: usize,
    next_id: usize,
    intake: Option<Intake>,
}

/// Submission side of the pool. Dropped on shutdown.
#[derive(Clone)]
struct Intake {
    /// Zero-capacity: succeeds only when a worker is already waiting
    handoff: Sender<Job>,
    /// Overflow once the pool is at `max_workers`
    backlog: Sender<Job>,
}

enum Wake {
    Job(Job),
    Idle,
    Closed,
}

struct PoolInner {
    policy: PoolPolicy,
    workers: Mutex<Workers>,
    terminated: Condvar,
    handoff_rx: Receiver<Job>,
    backlog_rx: Receiver<Job>,
    shutdown: AtomicBool,
    live: AtomicUsize,
    largest: AtomicUsize,
    idle: AtomicUsize,
    submitted: AtomicUsize,
    activity: Activity,
}

/// Elastic thread pool.
///
/// A submission is handed directly to a waiting worker if there is one,
/// otherwise a new worker is started with the task as its first job. Only at
/// `max_workers` does work queue up in the backlog. Workers idle for longer
/// than the policy timeout exit, down to `min_workers`.
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(policy: PoolPolicy) -> Result<Self, PoolError> {
        let policy = policy.normalized();
        let (handoff_tx, handoff_rx) = bounded(0);
        let (backlog_tx, backlog_rx) = if policy.queue_capacity == 0 {
            unbounded()
        } else {
            bounded(policy.queue_capacity)
        };

        let inner = Arc::new(PoolInner {
            workers: Mutex::new(Workers {
                live: 0,
                next_id: 0,
                intake: Some(Intake {
                    handoff: handoff_tx,
                    backlog: backlog_tx,
                }),
            }),
            terminated: Condvar::new(),
            handoff_rx,
            backlog_rx,
            shutdown: AtomicBool::new(false),
            live: AtomicUsize::new(0),
            largest: AtomicUsize::new(0),
            idle: AtomicUsize::new(0),
            submitted: AtomicUsize::new(0),
            activity: Activity::default(),
            policy,
        });

        {
            let mut workers = lock(&inner.workers);
            for _ in 0..inner.policy.min_workers {
                inner
                    .spawn_worker(&mut workers, None)
                    .map_err(|(err, _)| err)?;
            }
        }

        tracing::debug!(
            min = inner.policy.min_workers,
            max = inner.policy.max_workers,
            idle_timeout_ms = inner.policy.idle_timeout.as_millis() as u64,
            "Worker pool created"
        );
        Ok(Self { inner })
    }

    pub fn policy(&self) -> &PoolPolicy {
        &self.inner.policy
    }

    /// Enqueue a task. Blocks only while a bounded backlog is full.
    pub fn submit<V, F>(&self, task: F) -> Result<TaskHandle<V>, PoolError>
    where
        V: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
    {
        self.submit_with(task, None)
    }

    pub(crate) fn submit_with<V, F>(
        &self,
        task: F,
        notify: Option<(usize, Sender<usize>)>,
    ) -> Result<TaskHandle<V>, PoolError>
    where
        V: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
    {
        let shared = TaskShared::new(notify);
        self.inner.dispatch(task::into_job(task, Arc::clone(&shared)))?;
        Ok(TaskHandle::new(shared))
    }

    /// Most tasks this pool has run simultaneously since creation
    pub fn peak_concurrency(&self) -> usize {
        self.inner.activity.peak.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        PoolStats {
            peak_concurrency: inner.activity.peak.load(Ordering::SeqCst),
            largest_pool_size: inner.largest.load(Ordering::SeqCst),
            live_workers: inner.live.load(Ordering::SeqCst),
            idle_workers: inner.idle.load(Ordering::SeqCst),
            active_tasks: inner.activity.active.load(Ordering::SeqCst),
            submitted_tasks: inner.submitted.load(Ordering::Relaxed),
            completed_tasks: inner.activity.completed.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting work. Queued and running tasks still complete.
    pub fn shutdown(&self) {
        let mut workers = lock(&self.inner.workers);
        if workers.intake.take().is_some() {
            self.inner.shutdown.store(true, Ordering::SeqCst);
            tracing::debug!(live = workers.live, "Worker pool shutting down");
        }
        if workers.live == 0 {
            self.inner.terminated.notify_all();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    /// Wait for every worker to exit. Only meaningful after [`shutdown`](Self::shutdown);
    /// returns false if workers are still alive when `timeout` elapses.
    pub fn await_termination(&self, timeout: Duration) -> bool {
        let workers = lock(&self.inner.workers);
        let (workers, _) = self
            .inner
            .terminated
            .wait_timeout_while(workers, timeout, |workers| workers.live > 0)
            .unwrap_or_else(PoisonError::into_inner);
        workers.live == 0
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl PoolInner {
    fn dispatch(self: &Arc<Self>, job: Job) -> Result<(), PoolError> {
        // Everything below happens under the lock so a worker cannot retire
        // between the sizing decision and the job landing somewhere.
        let mut workers = lock(&self.workers);
        let intake = workers.intake.clone().ok_or(PoolError::ShutDown)?;

        let job = match intake.handoff.try_send(job) {
            Ok(()) => return Ok(self.admitted()),
            Err(err) => err.into_inner(),
        };

        let overflow = if workers.live < self.policy.max_workers {
            match self.spawn_worker(&mut workers, Some(job)) {
                Ok(()) => return Ok(self.admitted()),
                Err((err, _)) if workers.live == 0 => return Err(err),
                Err((err, job)) => {
                    tracing::warn!(
                        "Could not grow worker pool beyond {} workers: {}",
                        workers.live,
                        err
                    );
                    job
                }
            }
        } else {
            Some(job)
        };

        // The seed job always comes back from a failed spawn
        let Some(job) = overflow else {
            return Ok(self.admitted());
        };
        let job = match intake.backlog.try_send(job) {
            Ok(()) => return Ok(self.admitted()),
            Err(TrySendError::Disconnected(_)) => return Err(PoolError::ShutDown),
            Err(TrySendError::Full(job)) => job,
        };

        // Backlog full: wait for room without holding the lock
        drop(workers);
        intake.backlog.send(job).map_err(|_| PoolError::ShutDown)?;
        let mut workers = lock(&self.workers);
        if workers.live == 0 {
            // Everyone retired while we were blocked
            self.spawn_worker(&mut workers, None).map_err(|(err, _)| err)?;
        }
        self.admitted();
        Ok(())
    }

    fn admitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn spawn_worker(
        self: &Arc<Self>,
        workers: &mut Workers,
        first: Option<Job>,
    ) -> Result<(), (PoolError, Option<Job>)> {
        let id = workers.next_id;
        let inner = Arc::clone(self);
        let seed = Arc::new(Mutex::new(first));
        let worker_seed = Arc::clone(&seed);

        let spawned = thread::Builder::new()
            .name(format!("wordscan-worker-{id}"))
            .spawn(move || {
                let first = lock(&worker_seed).take();
                inner.work(id, first);
            });
        if let Err(err) = spawned {
            return Err((PoolError::Spawn(err), lock(&seed).take()));
        }

        workers.next_id += 1;
        workers.live += 1;
        self.live.store(workers.live, Ordering::SeqCst);
        self.largest.fetch_max(workers.live, Ordering::SeqCst);
        tracing::debug!(worker = id, live = workers.live, "Spawned pool worker");
        Ok(())
    }

    fn work(&self, id: usize, first: Option<Job>) {
        if let Some(job) = first {
            job(&self.activity);
        }

        loop {
            self.idle.fetch_add(1, Ordering::SeqCst);
            let wake = select! {
                recv(self.backlog_rx) -> job => job.map_or(Wake::Closed, Wake::Job),
                recv(self.handoff_rx) -> job => job.map_or(Wake::Closed, Wake::Job),
                default(self.policy.idle_timeout) => Wake::Idle,
            };
            self.idle.fetch_sub(1, Ordering::SeqCst);

            match wake {
                Wake::Job(job) => job(&self.activity),
                Wake::Idle => {
                    let mut workers = lock(&self.workers);
                    if workers.live > self.policy.min_workers && self.backlog_rx.is_empty() {
                        self.retire(&mut workers);
                        tracing::trace!(worker = id, live = workers.live, "Retired idle worker");
                        return;
                    }
                }
                Wake::Closed => {
                    // Shut down: finish whatever is still queued, then exit
                    while let Ok(job) = self.backlog_rx.try_recv() {
                        job(&self.activity);
                    }
                    let mut workers = lock(&self.workers);
                    self.retire(&mut workers);
                    tracing::trace!(worker = id, live = workers.live, "Worker stopped");
                    return;
                }
            }
        }
    }

    fn retire(&self, workers: &mut Workers) {
        workers.live -= 1;
        self.live.store(workers.live, Ordering::SeqCst);
        if workers.live == 0 {
            self.terminated.notify_all();
        }
    }
}
