use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::cli::Output;
use crate::reports::ReportFormat;
use crate::scanner::{ScanMode, ScanRequest};

#[derive(Args)]
pub struct SearchArgs {
    /// Base directory to scan
    #[arg(value_name = "DIR")]
    pub base_dir: PathBuf,

    /// Word to look for
    pub word: String,

    /// Output format (overrides report.format)
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Race every file for the word; a miss still exits successfully
pub async fn execute(args: SearchArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let request = ScanRequest::new(args.base_dir, &args.word, ScanMode::Search)?;
    super::scan_and_report(request, custom_config, args.format, output).await
}
