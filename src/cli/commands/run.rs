use anyhow::{Context, Result};
use clap::Args;
use dialoguer::{Input, theme::ColorfulTheme};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::cli::Output;
use crate::reports::ReportFormat;
use crate::scanner::{ScanMode, ScanRequest};

#[derive(Args, Default)]
pub struct RunArgs {
    /// Base directory (prompted for when omitted)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Keyword (prompted for when omitted)
    #[arg(long)]
    pub word: Option<String>,

    /// Output format (overrides report.format)
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,
}

pub async fn execute(args: RunArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let directory = match args.dir {
        Some(dir) => dir,
        None => PathBuf::from(prompt("Enter base directory")?),
    };
    let word = match args.word {
        Some(word) => word,
        None => prompt("Enter keyword")?,
    };

    let request = ScanRequest::new(directory, &word, ScanMode::Both)?;
    super::scan_and_report(request, custom_config, args.format, output).await
}

/// Ask for one line. Uses dialoguer on a terminal, plain stdin otherwise so
/// answers can be piped in.
fn prompt(label: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stderr) {
        let answer: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(label)
            .interact_text()
            .with_context(|| format!("Failed to read {}", label.to_lowercase()))?;
        return Ok(answer.trim().to_string());
    }

    eprint!("{label}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    let read = io::stdin().lock().read_line(&mut line)?;
    anyhow::ensure!(read > 0, "No input for '{}'", label);
    Ok(line.trim().to_string())
}
