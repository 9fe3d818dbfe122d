use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use crate::config::WordscanConfig;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Display current merged configuration
    Show {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ShowFormat::Toml)]
        format: ShowFormat,
    },
    /// Get a single configuration value or section
    Get { key: String },
    /// Validate the merged configuration
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ShowFormat {
    Toml,
    Json,
}

pub async fn execute(args: ConfigArgs, custom_config: Option<&str>) -> Result<()> {
    let config = WordscanConfig::load(custom_config)?;

    match args.command {
        ConfigCommand::Show { format } => {
            let merged = config.get_full_config()?;
            match format {
                ShowFormat::Toml => print!("{}", toml::to_string_pretty(&merged)?),
                ShowFormat::Json => println!("{}", serde_json::to_string_pretty(&merged)?),
            }
        }
        ConfigCommand::Get { key } => {
            let value = config
                .get_section(&key)
                .map_err(|_| anyhow::anyhow!("Configuration key '{}' not found", key))?;
            match value {
                serde_json::Value::String(s) => println!("{s}"),
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    println!("{}", serde_json::to_string_pretty(&value)?)
                }
                other => println!("{other}"),
            }
        }
        ConfigCommand::Validate => {
            let settings = config.settings()?;
            println!(
                "Configuration is valid (max_workers = {})",
                settings.pool.resolved_max_workers()
            );
        }
    }

    Ok(())
}
