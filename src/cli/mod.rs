//! Command-line interface for wordscan
//!
//! Argument parsing lives in [`commands`]; [`Output`] handles styled messages.

pub mod commands;
mod output;

pub use output::Output;
