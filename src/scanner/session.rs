use anyhow::{Context, Result};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use super::core::Scanner;
use super::directory::descendants;
use super::words::is_separator;
use crate::config::Settings;
use crate::parallel::{BatchCoordinator, WorkerPool};
use crate::reports::{CountReport, RunReport, SearchReport};

/// Upper bound on waiting for cancelled searches to wind down before the
/// pool stats are read with `wait_for_quiescence`.
const QUIESCENCE_TIMEOUT: Duration = Duration::from_secs(30);

/// Which batches a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Count,
    Search,
    Both,
}

impl ScanMode {
    pub fn counts(self) -> bool {
        matches!(self, ScanMode::Count | ScanMode::Both)
    }

    pub fn searches(self) -> bool {
        matches!(self, ScanMode::Search | ScanMode::Both)
    }
}

/// One keyword, one base directory
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub base_directory: PathBuf,
    pub keyword: String,
    pub mode: ScanMode,
}

impl ScanRequest {
    pub fn new(base_directory: PathBuf, keyword: &str, mode: ScanMode) -> Result<Self> {
        let keyword = keyword.trim_matches(is_separator);
        anyhow::ensure!(!keyword.is_empty(), "Keyword must not be empty");
        anyhow::ensure!(
            !keyword.contains(is_separator),
            "Keyword must be a single word, got '{}'",
            keyword
        );
        Ok(Self {
            base_directory,
            keyword: keyword.to_string(),
            mode,
        })
    }
}

/// Walk the base directory, then run the requested batches on one shared pool.
///
/// Blocking: call from a plain thread or `spawn_blocking`.
pub fn run(request: &ScanRequest, settings: &Settings, progress: Option<ProgressBar>) -> Result<RunReport> {
    let files = descendants(&request.base_directory, &settings.scan)?;
    let pool = WorkerPool::new(settings.pool.policy()).context("Failed to start worker pool")?;
    let scanner = Scanner::new(&request.keyword);
    let mut report = RunReport::new(&request.keyword, request.base_directory.clone(), files.len());

    if request.mode.counts() {
        let started = Instant::now();
        let mut coordinator = BatchCoordinator::new(&pool);
        if let Some(bar) = &progress {
            bar.set_length(files.len() as u64);
            coordinator = coordinator.with_progress(move |done, _| bar.set_position(done as u64));
        }
        let summary = scanner
            .count(&coordinator, &files)
            .context("Count batch aborted")?;
        if let Some(bar) = &progress {
            bar.finish_and_clear();
        }
        report.count = Some(CountReport::new(&summary, started.elapsed()));
    }

    if request.mode.searches() {
        let started = Instant::now();
        let result = scanner
            .search(&BatchCoordinator::new(&pool), &files)
            .context("Search batch aborted")?;
        report.search = Some(SearchReport::new(result, started.elapsed()));
    }

    // By default the snapshot may include cancelled searches still winding down
    if settings.report.wait_for_quiescence {
        pool.shutdown();
        if !pool.await_termination(QUIESCENCE_TIMEOUT) {
            tracing::warn!("Pool workers still busy after {:?}", QUIESCENCE_TIMEOUT);
        }
    }
    report.pool = pool.stats();
    tracing::info!(
        peak_concurrency = report.pool.peak_concurrency,
        largest_pool_size = report.pool.largest_pool_size,
        completed_tasks = report.pool.completed_tasks,
        "Pool telemetry"
    );

    Ok(report)
}
