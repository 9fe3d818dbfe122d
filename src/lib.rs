//! # wordscan
//!
//! Count and locate a word across a directory tree using a bounded,
//! elastic worker pool.
//!
//! ## Features
//!
//! - **Elastic pool**: workers grow on demand up to a ceiling and retire when idle
//! - **All-complete batches**: per-file results in submission order
//! - **First-success batches**: the first file to match wins, the rest are cancelled
//! - **Telemetry**: peak concurrency and largest pool size for every run
//!
//! ## Quick Start
//!
//! ```bash
//! # Count, then search, prompting for directory and word
//! wordscan
//!
//! # Count only, as JSON
//! wordscan count ./src volatile --format json
//! ```

pub mod cli;
pub mod config;
pub mod parallel;
pub mod reports;
pub mod scanner;

pub use cli::Output;
pub use config::WordscanConfig;

/// Result type alias for wordscan operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
