//! Keyword scanning over a directory tree.
//!
//! The scanner supplies the domain side of the parallel engine: the list of
//! files to process ([`directory::descendants`]), the per-file leaf operations
//! ([`words`]) and the glue that turns them into batches ([`Scanner`],
//! [`session::run`]).

pub mod core;
pub mod directory;
pub mod session;
pub mod words;

pub use core::{CountSummary, Scanner};
pub use directory::{ScanOptions, descendants};
pub use session::{ScanMode, ScanRequest};
