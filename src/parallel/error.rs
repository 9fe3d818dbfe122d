use thiserror::Error;

/// Pool-level faults. These abort the batch that hit them.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool has been shut down")]
    ShutDown,

    #[error("failed to spawn worker thread")]
    Spawn(#[source] std::io::Error),

    #[error("{0} task(s) never reported an outcome")]
    Lost(usize),
}

/// Why a single task did not produce a value.
///
/// `Cancelled` is how a task body reports that it honoured its cancel token;
/// the pool records that as [`TaskOutcome::Cancelled`](super::TaskOutcome),
/// never as a failure.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
