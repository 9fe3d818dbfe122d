use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::words;
use crate::parallel::{BatchCoordinator, CancelToken, FirstSuccess, PoolError, TaskOutcome};

/// Totals from a count batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CountSummary {
    pub occurrences: u64,
    pub files: usize,
    /// Files that could not be scanned; they contribute zero
    pub failed_files: usize,
}

/// Builds one pool task per file for a single keyword
#[derive(Debug, Clone)]
pub struct Scanner {
    word: Arc<str>,
}

impl Scanner {
    pub fn new(word: &str) -> Self {
        Self { word: Arc::from(word) }
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    /// Count the keyword across every file. Best effort: unreadable files
    /// are logged and counted as failed, never abort the batch.
    pub fn count(
        &self,
        coordinator: &BatchCoordinator<'_>,
        files: &[PathBuf],
    ) -> Result<CountSummary, PoolError> {
        let tasks: Vec<_> = files
            .iter()
            .map(|path| {
                let word = Arc::clone(&self.word);
                let path = path.clone();
                move |token: &CancelToken| words::count_occurrences(&word, &path, token)
            })
            .collect();

        let outcomes = coordinator.run_all(tasks)?;

        let mut summary = CountSummary {
            files: outcomes.len(),
            ..CountSummary::default()
        };
        for (path, outcome) in files.iter().zip(outcomes) {
            match outcome {
                TaskOutcome::Success(count) => summary.occurrences += count,
                TaskOutcome::Failure(err) => {
                    tracing::warn!("Could not scan {}: {}", path.display(), err);
                    summary.failed_files += 1;
                }
                TaskOutcome::Cancelled => summary.failed_files += 1,
            }
        }
        Ok(summary)
    }

    /// Race every file for the first one containing the keyword
    pub fn search(
        &self,
        coordinator: &BatchCoordinator<'_>,
        files: &[PathBuf],
    ) -> Result<FirstSuccess<PathBuf>, PoolError> {
        let tasks: Vec<_> = files
            .iter()
            .map(|path| {
                let word = Arc::clone(&self.word);
                let path = path.clone();
                move |token: &CancelToken| words::find_word(&word, &path, token)
            })
            .collect();

        coordinator.run_first_success(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::{PoolPolicy, WorkerPool};
    use std::fs;
    use tempfile::TempDir;

    fn corpus() -> (TempDir, Vec<PathBuf>) {
        let dir = TempDir::new().unwrap();
        let mut files = Vec::new();
        for (name, content) in [
            ("a.txt", "lock free lock"),
            ("b.txt", "nothing"),
            ("c.txt", "lock"),
        ] {
            let path = dir.path().join(name);
            fs::write(&path, content).unwrap();
            files.push(path);
        }
        (dir, files)
    }

    #[test]
    fn test_count_sums_across_files() {
        let (_dir, files) = corpus();
        let pool = WorkerPool::new(PoolPolicy::default()).unwrap();
        let summary = Scanner::new("lock")
            .count(&BatchCoordinator::new(&pool), &files)
            .unwrap();
        assert_eq!(
            summary,
            CountSummary {
                occurrences: 3,
                files: 3,
                failed_files: 0
            }
        );
    }

    #[test]
    fn test_count_treats_unreadable_as_zero() {
        let (dir, mut files) = corpus();
        files.push(dir.path().join("vanished.txt"));
        let pool = WorkerPool::new(PoolPolicy::default()).unwrap();
        let summary = Scanner::new("lock")
            .count(&BatchCoordinator::new(&pool), &files)
            .unwrap();
        assert_eq!(summary.occurrences, 3);
        assert_eq!(summary.files, 4);
        assert_eq!(summary.failed_files, 1);
    }

    #[test]
    fn test_search_finds_a_matching_file() {
        let (dir, files) = corpus();
        let pool = WorkerPool::new(PoolPolicy::default()).unwrap();
        let found = Scanner::new("lock")
            .search(&BatchCoordinator::new(&pool), &files)
            .unwrap()
            .into_option()
            .unwrap();
        assert!(found == dir.path().join("a.txt") || found == dir.path().join("c.txt"));
    }

    #[test]
    fn test_search_exhausts_without_match() {
        let (_dir, files) = corpus();
        let pool = WorkerPool::new(PoolPolicy::default()).unwrap();
        let result = Scanner::new("absent")
            .search(&BatchCoordinator::new(&pool), &files)
            .unwrap();
        assert!(matches!(
            result,
            FirstSuccess::Exhausted {
                failed: 3,
                cancelled: 0
            }
        ));
    }
}
