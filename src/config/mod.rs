//! Configuration management for wordscan
//!
//! Settings are layered with figment (see [`WordscanConfig::load`]) and
//! extracted into the typed [`Settings`] tree below.

pub mod core;

pub use core::WordscanConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::parallel::PoolPolicy;
use crate::reports::ReportFormat;
use crate::scanner::ScanOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Worker pool sizing
    pub pool: PoolSettings,

    /// Directory walking
    pub scan: ScanOptions,

    /// Report output
    pub report: ReportSettings,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Workers kept alive while idle
    pub min_workers: usize,

    /// Ceiling on worker threads (0 = auto)
    pub max_workers: usize,

    /// Idle time before a surplus worker exits
    pub idle_timeout_ms: u64,

    /// Backlog size once the pool is saturated (0 = unbounded)
    pub queue_capacity: usize,
}

/// Report configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub format: ReportFormat,

    /// Wait for cancelled tasks to finish before reading pool stats
    pub wait_for_quiescence: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            min_workers: 0,
            max_workers: 0,
            idle_timeout_ms: 60_000,
            queue_capacity: 0,
        }
    }
}

impl PoolSettings {
    /// Effective worker ceiling, resolving 0 to the automatic value
    pub fn resolved_max_workers(&self) -> usize {
        if self.max_workers == 0 {
            PoolPolicy::auto_max_workers()
        } else {
            self.max_workers
        }
    }

    pub fn policy(&self) -> PoolPolicy {
        PoolPolicy {
            min_workers: self.min_workers,
            max_workers: self.resolved_max_workers(),
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            queue_capacity: self.queue_capacity,
        }
    }
}

impl Settings {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let max_workers = self.pool.resolved_max_workers();
        if self.pool.min_workers > max_workers {
            anyhow::bail!(
                "pool.min_workers ({}) cannot exceed pool.max_workers ({})",
                self.pool.min_workers,
                max_workers
            );
        }

        if self.pool.idle_timeout_ms == 0 {
            anyhow::bail!("pool.idle_timeout_ms cannot be 0");
        }

        Ok(())
    }
}
