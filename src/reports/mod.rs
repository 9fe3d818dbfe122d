//! Run reports: what a scan found plus how the pool behaved.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Output;
use crate::parallel::{FirstSuccess, PoolStats};
use crate::scanner::CountSummary;

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub occurrences: u64,
    pub failed_files: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    /// First file found to contain the keyword
    pub found: Option<PathBuf>,
    pub failed_files: usize,
    pub cancelled: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub keyword: String,
    pub base_directory: PathBuf,
    pub files: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<CountReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchReport>,
    pub pool: PoolStats,
}

impl CountReport {
    pub fn new(summary: &CountSummary, elapsed: Duration) -> Self {
        Self {
            occurrences: summary.occurrences,
            failed_files: summary.failed_files,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

impl SearchReport {
    pub fn new(result: FirstSuccess<PathBuf>, elapsed: Duration) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        match result {
            FirstSuccess::Resolved { value, .. } => Self {
                found: Some(value),
                failed_files: 0,
                cancelled: 0,
                elapsed_ms,
            },
            FirstSuccess::Exhausted { failed, cancelled } => Self {
                found: None,
                failed_files: failed,
                cancelled,
                elapsed_ms,
            },
        }
    }
}

impl RunReport {
    pub fn new(keyword: &str, base_directory: PathBuf, files: usize) -> Self {
        Self {
            keyword: keyword.to_string(),
            base_directory,
            files,
            count: None,
            search: None,
            pool: PoolStats::default(),
        }
    }

    /// Print to stdout in the requested format. Report lines are printed
    /// even in quiet mode; only decorations are suppressed.
    pub fn print(&self, format: ReportFormat, output: &Output) -> Result<()> {
        match format {
            ReportFormat::Json => println!("{}", serde_json::to_string_pretty(self)?),
            ReportFormat::Text => {
                for line in self.text_lines() {
                    println!("{line}");
                }
                if let Some(count) = &self.count {
                    if count.failed_files > 0 {
                        output.warning(&format!(
                            "{} of {} files could not be read and counted as zero",
                            count.failed_files, self.files
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(count) = &self.count {
            lines.push(format!("Occurrences of {}: {}", self.keyword, count.occurrences));
            lines.push(format!("Time elapsed: {}ms", count.elapsed_ms));
        }
        if let Some(search) = &self.search {
            match &search.found {
                Some(path) => lines.push(format!("{} occurs in: {}", self.keyword, path.display())),
                None => lines.push(format!("{} not found", self.keyword)),
            }
            lines.push(format!("Search time: {}ms", search.elapsed_ms));
        }
        lines.push(format!("Largest pool size: {}", self.pool.largest_pool_size));
        lines.push(format!("Peak concurrency: {}", self.pool.peak_concurrency));
        lines
    }
}
