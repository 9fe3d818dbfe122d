//! Generic parallel execution framework
//!
//! This module runs batches of independent tasks on an elastic worker pool.
//! It knows nothing about files or words: a task is any closure taking a
//! [`CancelToken`] and returning `Result<V, TaskError>`.
//!
//! # Architecture Responsibilities
//!
//! ## What This Module Does:
//! - **Worker Management**: Grows threads on demand, reclaims idle ones ([`WorkerPool`])
//! - **Completion Disciplines**: Run-all and first-success batches ([`BatchCoordinator`])
//! - **Cancellation**: Cooperative stop signals handed to every task ([`CancelToken`])
//! - **Telemetry**: Peak concurrency and pool size snapshots ([`PoolStats`])
//!
//! ## What This Module Does NOT Do:
//! - **Domain Logic**: Does not walk directories or read files
//! - **Aggregation**: Summing or otherwise reducing outcomes is the caller's job
//! - **Timeouts or Retries**: A hung task blocks a run-all batch; failed tasks are not retried
//!
//! # Separation of Concerns
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │   Client        │    │   Batch          │    │   Worker        │
//! │   (Scanner)     │───▶│   Coordinator    │───▶│   Pool          │
//! │                 │    │                  │    │                 │
//! │ • File list     │    │ • Submit all     │    │ • Handoff/spawn │
//! │ • Task closures │    │ • Fold outcomes  │    │ • Backlog       │
//! │ • Aggregation   │    │ • Cancel losers  │    │ • Idle reaping  │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use wordscan::parallel::{BatchCoordinator, CancelToken, PoolPolicy, TaskError, WorkerPool};
//!
//! let pool = WorkerPool::new(PoolPolicy::default()).unwrap();
//! let coordinator = BatchCoordinator::new(&pool);
//!
//! let tasks: Vec<_> = [2u64, 5, 1]
//!     .into_iter()
//!     .map(|n| move |_: &CancelToken| Ok::<_, TaskError>(n))
//!     .collect();
//! let outcomes = coordinator.run_all(tasks).unwrap();
//! let total: u64 = outcomes.into_iter().filter_map(|o| o.success()).sum();
//! assert_eq!(total, 8);
//! ```

pub mod batch;
pub mod error;
pub mod pool;
pub mod task;

// Re-export main types for easier access
pub use batch::{BatchCoordinator, FirstSuccess, Step};
pub use error::{PoolError, TaskError};
pub use pool::{PoolPolicy, PoolStats, WorkerPool};
pub use task::{BoxedTask, CancelToken, TaskHandle, TaskOutcome};
