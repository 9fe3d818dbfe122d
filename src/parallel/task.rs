use crossbeam::channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use super::error::TaskError;
use super::pool::{Activity, Job};

/// A task body as the pool sees it: one work item already bound in, the
/// cancel token handed over at run time.
pub type BoxedTask<V> = Box<dyn FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static>;

/// Cooperative stop signal shared between a [`TaskHandle`] and the running task.
///
/// Task bodies that loop over bounded units of work (lines, tokens, chunks)
/// should call [`CancelToken::check`] between units and bail out with `?`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// `Err(TaskError::Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> Result<(), TaskError> {
        if self.is_cancelled() {
            Err(TaskError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Terminal state of one task. Produced exactly once per task.
#[derive(Debug)]
pub enum TaskOutcome<V> {
    Success(V),
    Failure(TaskError),
    Cancelled,
}

impl<V> TaskOutcome<V> {
    fn from_result(result: Result<V, TaskError>) -> Self {
        match result {
            Ok(value) => TaskOutcome::Success(value),
            Err(TaskError::Cancelled) => TaskOutcome::Cancelled,
            Err(err) => TaskOutcome::Failure(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }

    /// The value of a successful task, discarding failures and cancellations.
    pub fn success(self) -> Option<V> {
        match self {
            TaskOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

enum Slot<V> {
    Queued,
    Running,
    Done(TaskOutcome<V>),
    /// Outcome moved out by the consuming handle
    Taken,
}

/// State shared by the job sitting in the pool queue and the caller's handle.
pub(crate) struct TaskShared<V> {
    slot: Mutex<Slot<V>>,
    ready: Condvar,
    token: CancelToken,
    /// Batch index plus the coordinator's completion channel, if any.
    notify: Mutex<Option<(usize, Sender<usize>)>>,
}

impl<V> TaskShared<V> {
    pub(crate) fn new(notify: Option<(usize, Sender<usize>)>) -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(Slot::Queued),
            ready: Condvar::new(),
            token: CancelToken::new(),
            notify: Mutex::new(notify),
        })
    }

    /// Queued -> Running. Returns false when the task was cancelled before a
    /// worker picked it up; the body must then never be invoked.
    fn begin(&self) -> bool {
        let mut slot = lock(&self.slot);
        if matches!(*slot, Slot::Queued) {
            *slot = Slot::Running;
            true
        } else {
            false
        }
    }

    fn finish(&self, outcome: TaskOutcome<V>) {
        let mut slot = lock(&self.slot);
        if matches!(*slot, Slot::Running) {
            *slot = Slot::Done(outcome);
            drop(slot);
            self.completed();
        }
    }

    fn cancel(&self) {
        self.token.cancel();
        let mut slot = lock(&self.slot);
        if matches!(*slot, Slot::Queued) {
            *slot = Slot::Done(TaskOutcome::Cancelled);
            drop(slot);
            self.completed();
        }
    }

    /// Wakes joiners and reports the batch index. Called once per task, on
    /// the single transition into `Done`.
    fn completed(&self) {
        self.ready.notify_all();
        if let Some((index, done_tx)) = lock(&self.notify).take() {
            // The coordinator may already have returned (first-success losers).
            let _ = done_tx.send(index);
        }
    }
}

/// Caller-side view of a submitted task.
pub struct TaskHandle<V> {
    shared: Arc<TaskShared<V>>,
}

impl<V> TaskHandle<V> {
    pub(crate) fn new(shared: Arc<TaskShared<V>>) -> Self {
        Self { shared }
    }

    /// Request cooperative cancellation. Idempotent, and a no-op once the
    /// task is terminal.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn token(&self) -> CancelToken {
        self.shared.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        matches!(*lock(&self.shared.slot), Slot::Done(_))
    }

    /// Block until the task is terminal and take its outcome.
    ///
    /// The handle is the only consumer of the outcome: both this and
    /// the coordinator's `try_into_outcome` take `self`, so the slot
    /// is still `Done` once the wait ends.
    pub fn join(self) -> TaskOutcome<V> {
        let slot = lock(&self.shared.slot);
        let mut slot = self
            .shared
            .ready
            .wait_while(slot, |slot| matches!(slot, Slot::Queued | Slot::Running))
            .unwrap_or_else(PoisonError::into_inner);
        let Slot::Done(outcome) = std::mem::replace(&mut *slot, Slot::Taken) else {
            unreachable!("task outcome consumed by more than one handle");
        };
        outcome
    }

    /// Non-blocking take used by the coordinator after a completion notice.
    /// `None` if the task is not terminal yet.
    pub(crate) fn try_into_outcome(self) -> Option<TaskOutcome<V>> {
        let mut slot = lock(&self.shared.slot);
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Done(outcome) => Some(outcome),
            other => {
                *slot = other;
                None
            }
        }
    }
}

/// Wrap a task body into a queue job. Panics inside the body are captured as
/// a failure outcome so they never take a worker down.
pub(crate) fn into_job<V, F>(task: F, shared: Arc<TaskShared<V>>) -> Job
where
    V: Send + 'static,
    F: FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
{
    Box::new(move |activity: &Activity| {
        if !shared.begin() {
            tracing::trace!("Skipping task cancelled before start");
            return;
        }
        let _running = activity.enter();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task(&shared.token))) {
            Ok(result) => TaskOutcome::from_result(result),
            Err(payload) => TaskOutcome::Failure(TaskError::Panicked(panic_message(payload))),
        };
        shared.finish(outcome);
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;

    fn run_job<V: Send + 'static>(
        shared: &Arc<TaskShared<V>>,
        task: impl FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
    ) {
        let activity = Activity::default();
        into_job(task, Arc::clone(shared))(&activity);
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(TaskOutcome::from_result(Ok::<_, TaskError>(1)).is_success());
        assert!(TaskOutcome::<u8>::from_result(Err(TaskError::Cancelled)).is_cancelled());
        let failed = TaskOutcome::<u8>::from_result(Err(anyhow::anyhow!("boom").into()));
        assert!(matches!(failed, TaskOutcome::Failure(TaskError::Other(_))));
    }

    #[test]
    fn test_cancel_before_start_skips_body() {
        let shared = TaskShared::<u32>::new(None);
        let handle = TaskHandle::new(Arc::clone(&shared));
        handle.cancel();

        let invoked = Arc::new(AtomicBool::new(false));
        let flag = invoked.clone();
        run_job(&shared, move |_| {
            flag.store(true, Ordering::SeqCst);
            Ok(7)
        });

        assert!(!invoked.load(Ordering::SeqCst));
        assert!(handle.join().is_cancelled());
    }

    #[test]
    fn test_double_cancel_notifies_once() {
        let (done_tx, done_rx) = unbounded();
        let shared = TaskShared::<u32>::new(Some((4, done_tx)));
        let handle = TaskHandle::new(Arc::clone(&shared));

        handle.cancel();
        handle.cancel();
        run_job(&shared, |_| Ok(1));

        assert_eq!(done_rx.try_iter().collect::<Vec<_>>(), vec![4]);
        assert!(handle.join().is_cancelled());
    }

    #[test]
    fn test_cancel_after_finish_is_noop() {
        let shared = TaskShared::<u32>::new(None);
        let handle = TaskHandle::new(Arc::clone(&shared));
        run_job(&shared, |_| Ok(9));

        assert!(handle.is_finished());
        handle.cancel();
        assert_eq!(handle.join().success(), Some(9));
    }

    #[test]
    fn test_running_task_sees_token() {
        let shared = TaskShared::<u32>::new(None);
        let handle = TaskHandle::new(Arc::clone(&shared));
        let token = handle.token();
        run_job(&shared, move |inner| {
            token.cancel();
            inner.check()?;
            Ok(1)
        });

        assert!(handle.join().is_cancelled());
    }

    #[test]
    fn test_panic_becomes_failure() {
        let shared = TaskShared::<u32>::new(None);
        let handle = TaskHandle::new(Arc::clone(&shared));
        run_job(&shared, |_| panic!("scanner exploded"));

        match handle.join() {
            TaskOutcome::Failure(TaskError::Panicked(message)) => {
                assert!(message.contains("scanner exploded"))
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_outcome_taken_once_by_its_handle() {
        let shared = TaskShared::<u32>::new(None);
        let pending = TaskHandle::new(Arc::clone(&shared));
        assert!(pending.try_into_outcome().is_none());

        run_job(&shared, |_| Ok(5));
        let handle = TaskHandle::new(Arc::clone(&shared));
        assert!(handle.is_finished());
        assert_eq!(handle.try_into_outcome().and_then(TaskOutcome::success), Some(5));
    }
}
