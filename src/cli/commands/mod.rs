use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::cli::Output;
use crate::config::WordscanConfig;
use crate::reports::ReportFormat;
use crate::scanner::session::{self, ScanRequest};

pub mod config;
pub mod count;
pub mod run;
pub mod search;

#[derive(Parser)]
#[command(
    name = "wordscan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Count and locate a word across a directory tree on a bounded worker pool",
    long_about = "wordscan walks a directory, counts every whole-token occurrence of a word \
                  across all files in parallel, then races the same files to find the first \
                  one that contains it, reporting how large the worker pool grew."
)]
pub struct Cli {
    /// Run as if started in <DIR> instead of current working directory
    #[arg(short = 'C', long = "directory", global = true)]
    pub directory: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use custom configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count and search, prompting for anything not given (default)
    Run(run::RunArgs),
    /// Count occurrences of a word across all files
    Count(count::CountArgs),
    /// Find any one file containing a word
    Search(search::SearchArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        // Change directory if specified
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        // Set up logging based on verbosity
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        let config = self.config.as_deref();

        match self.command {
            Some(Commands::Run(args)) => run::execute(args, config, &output).await,
            Some(Commands::Count(args)) => count::execute(args, config, &output).await,
            Some(Commands::Search(args)) => search::execute(args, config, &output).await,
            Some(Commands::Config(args)) => config::execute(args, config).await,
            None => run::execute(run::RunArgs::default(), config, &output).await,
        }
    }
}

/// Load settings, run the session off the async runtime, print the report
pub(crate) async fn scan_and_report(
    request: ScanRequest,
    custom_config: Option<&str>,
    format: Option<ReportFormat>,
    output: &Output,
) -> Result<()> {
    let settings = WordscanConfig::load(custom_config)?.settings()?;
    let format = format.unwrap_or(settings.report.format);
    output.verbose(&format!(
        "Scanning {} for '{}'",
        request.base_directory.display(),
        request.keyword
    ));

    let progress = (format == ReportFormat::Text && request.mode.counts() && !output.is_quiet())
        .then(|| output.progress_bar(0, "counting"));

    let report =
        tokio::task::spawn_blocking(move || session::run(&request, &settings, progress)).await??;

    report.print(format, output)
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info,ignore=warn"),
            2 => tracing_subscriber::EnvFilter::new("debug,ignore=warn"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_count_parses_positionals() {
        let cli = Cli::try_parse_from(["wordscan", "count", "d", "w"]).unwrap();
        let Some(Commands::Count(args)) = cli.command else {
            panic!("expected count");
        };
        assert_eq!(args.base_dir, PathBuf::from("d"));
        assert_eq!(args.word, "w");
        assert!(cli.directory.is_none());
    }

    #[test]
    fn test_global_directory_does_not_clash_with_positionals() {
        let cli = Cli::try_parse_from(["wordscan", "-C", "x", "search", "d", "w"]).unwrap();
        assert_eq!(cli.directory.as_deref(), Some("x"));
        let Some(Commands::Search(args)) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.base_dir, PathBuf::from("d"));
        assert_eq!(args.word, "w");
    }

    #[test]
    fn test_run_flags_and_default_command() {
        let cli = Cli::try_parse_from([
            "wordscan", "-vv", "run", "--dir", "src", "--word", "lock", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.dir, Some(PathBuf::from("src")));
        assert_eq!(args.format, Some(ReportFormat::Json));

        let cli = Cli::try_parse_from(["wordscan", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
