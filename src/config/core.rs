use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml, Yaml},
};
use std::path::Path;

use super::Settings;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

const ENV_PREFIX: &str = "WORDSCAN_";

pub struct WordscanConfig {
    figment: Figment,
}

impl WordscanConfig {
    /// Layered configuration: embedded defaults, then user and repository
    /// files (or only `custom_config` when given), then `WORDSCAN_*` variables.
    pub fn load(custom_config: Option<&str>) -> Result<Self> {
        tracing::trace!("CONFIG LOAD: custom config {:?}", custom_config);
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG));

        if let Some(custom_path) = custom_config {
            let path = Path::new(custom_path);
            anyhow::ensure!(path.is_file(), "Config file not found: {}", custom_path);
            figment = merge_file(figment, path);
        } else {
            let user_config = Self::user_config_path();
            figment = figment
                // User config - support multiple formats
                .merge(Toml::file(format!("{user_config}.toml")))
                .merge(Json::file(format!("{user_config}.json")))
                .merge(Yaml::file(format!("{user_config}.yaml")))
                // Repository config - support multiple formats
                .merge(Toml::file("wordscan.toml"))
                .merge(Json::file("wordscan.json"))
                .merge(Yaml::file("wordscan.yaml"));
        }

        // Environment variables always have highest priority
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(Self { figment })
    }

    /// Typed, validated settings
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .context("Invalid wordscan configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        Ok(self.figment.extract_inner(path)?)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    /// Base path (without extension) of the per-user config file
    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/wordscan/config"),
            Err(_) => "~/.config/wordscan/config".to_string(),
        }
    }
}

fn merge_file(figment: Figment, path: &Path) -> Figment {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => figment.merge(Json::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        _ => figment.merge(Toml::file(path)),
    }
}
