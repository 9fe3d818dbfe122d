use crossbeam::channel::unbounded;

use super::error::{PoolError, TaskError};
use super::pool::WorkerPool;
use super::task::{CancelToken, TaskHandle, TaskOutcome};

/// Decision returned by a batch fold after each task outcome
#[derive(Debug)]
pub enum Step<A, R> {
    /// Keep waiting, with the updated accumulator
    Continue(A),
    /// Stop now with this result; every other task is cancelled
    Stop(R),
}

/// Result of a first-success race
#[derive(Debug)]
pub enum FirstSuccess<V> {
    Resolved { index: usize, value: V },
    /// No task succeeded. Only reported once every task is terminal.
    Exhausted { failed: usize, cancelled: usize },
}

impl<V> FirstSuccess<V> {
    pub fn into_option(self) -> Option<V> {
        match self {
            FirstSuccess::Resolved { value, .. } => Some(value),
            FirstSuccess::Exhausted { .. } => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, FirstSuccess::Exhausted { .. })
    }
}

/// Drives a batch of tasks through a [`WorkerPool`] under one completion
/// discipline.
///
/// Both disciplines are instances of [`race`](Self::race): submit everything,
/// fold outcomes as they complete, stop early when the fold says so.
pub struct BatchCoordinator<'p> {
    pool: &'p WorkerPool,
    progress: Option<Box<dyn Fn(usize, usize) + 'p>>,
}

impl<'p> BatchCoordinator<'p> {
    pub fn new(pool: &'p WorkerPool) -> Self {
        Self {
            pool,
            progress: None,
        }
    }

    /// Called with `(terminal, total)` each time a task reaches a terminal state
    pub fn with_progress<P>(mut self, progress: P) -> Self
    where
        P: Fn(usize, usize) + 'p,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Submit every task, then feed outcomes to `fold` in completion order.
    ///
    /// Returns the first [`Step::Stop`] result, cancelling all other tasks
    /// without waiting for them, or `finish(acc)` once every task is terminal.
    /// An empty batch never touches the pool.
    pub fn race<V, F, A, R, G, H>(
        &self,
        tasks: Vec<F>,
        init: A,
        mut fold: G,
        finish: H,
    ) -> Result<R, PoolError>
    where
        V: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
        G: FnMut(A, usize, TaskOutcome<V>) -> Step<A, R>,
        H: FnOnce(A) -> R,
    {
        let total = tasks.len();
        if total == 0 {
            return Ok(finish(init));
        }

        let (done_tx, done_rx) = unbounded();
        // A slot empties once its outcome has been taken
        let mut handles: Vec<Option<TaskHandle<V>>> = Vec::with_capacity(total);
        for (index, task) in tasks.into_iter().enumerate() {
            match self.pool.submit_with(task, Some((index, done_tx.clone()))) {
                Ok(handle) => handles.push(Some(handle)),
                Err(err) => {
                    tracing::warn!("Aborting batch after {} of {} submissions: {}", index, total, err);
                    handles.iter().flatten().for_each(TaskHandle::cancel);
                    return Err(err);
                }
            }
        }
        drop(done_tx);
        tracing::debug!(tasks = total, "Batch submitted");

        let mut acc = init;
        for terminal in 1..=total {
            let outstanding = total - terminal + 1;
            let index = done_rx.recv().map_err(|_| PoolError::Lost(outstanding))?;
            let outcome = handles
                .get_mut(index)
                .and_then(Option::take)
                .and_then(TaskHandle::try_into_outcome)
                .ok_or(PoolError::Lost(outstanding))?;

            if let Some(progress) = &self.progress {
                progress(terminal, total);
            }

            match fold(acc, index, outcome) {
                Step::Continue(next) => acc = next,
                Step::Stop(result) => {
                    tracing::debug!(
                        winner = index,
                        outstanding = total - terminal,
                        "Batch resolved, cancelling the rest"
                    );
                    handles.iter().flatten().for_each(TaskHandle::cancel);
                    return Ok(result);
                }
            }
        }

        tracing::debug!(tasks = total, "Batch complete");
        Ok(finish(acc))
    }

    /// Run every task to completion. Outcomes are index-aligned with `tasks`.
    pub fn run_all<V, F>(&self, tasks: Vec<F>) -> Result<Vec<TaskOutcome<V>>, PoolError>
    where
        V: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
    {
        let slots: Vec<Option<TaskOutcome<V>>> =
            std::iter::repeat_with(|| None).take(tasks.len()).collect();

        self.race(
            tasks,
            slots,
            |mut slots, index, outcome| {
                slots[index] = Some(outcome);
                Step::Continue(slots)
            },
            |slots| slots.into_iter().flatten().collect::<Vec<_>>(),
        )
    }

    /// Return the first task to succeed and cancel the others.
    pub fn run_first_success<V, F>(&self, tasks: Vec<F>) -> Result<FirstSuccess<V>, PoolError>
    where
        V: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<V, TaskError> + Send + 'static,
    {
        self.race(
            tasks,
            (0usize, 0usize),
            |(failed, cancelled), index, outcome| match outcome {
                TaskOutcome::Success(value) => Step::Stop(FirstSuccess::Resolved { index, value }),
                TaskOutcome::Failure(err) => {
                    tracing::trace!(task = index, "Task failed: {}", err);
                    Step::Continue((failed + 1, cancelled))
                }
                TaskOutcome::Cancelled => Step::Continue((failed, cancelled + 1)),
            },
            |(failed, cancelled)| FirstSuccess::Exhausted { failed, cancelled },
        )
    }
}
