use anyhow::Result;
use clap::Parser;

use wordscan::cli::commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
