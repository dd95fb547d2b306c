//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.cfb-aggregator.toml` files.

use anyhow::{Context, Result};
use cfb_aggregator::aggregator::AggregatorSettings;
use cfb_aggregator::models::Season;
use cfb_aggregator::scouting::ScoutingClientConfig;
use cfb_aggregator::store::RestStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".cfb-aggregator.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Primary data store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Scouting API settings.
    #[serde(default)]
    pub scouting: ScoutingConfig,

    /// Default selections and list bounds.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Serve reads from a JSON fixture file instead of the REST store.
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

/// REST store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the PostgREST endpoint.
    #[serde(default = "default_store_url")]
    pub url: String,

    /// API key sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_store_url() -> String {
    "http://localhost:54321/rest/v1".to_string()
}

fn default_timeout() -> u64 {
    10
}

/// Scouting API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutingConfig {
    #[serde(default = "default_scouting_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// How long profile and report reads stay cached.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,

    /// Maximum cached entries per cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for ScoutingConfig {
    fn default() -> Self {
        Self {
            url: default_scouting_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            cache_ttl_seconds: default_cache_ttl(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_scouting_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_cache_ttl() -> u64 {
    3600 // 1 hour
}

fn default_cache_capacity() -> usize {
    1024
}

/// Default selections and list bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Season used when the store cannot report one.
    #[serde(default = "default_fallback_season")]
    pub fallback_season: Season,

    /// Poll preferred when none is requested.
    #[serde(default = "default_primary_poll")]
    pub primary_poll: String,

    #[serde(default = "default_standings_limit")]
    pub standings_limit: usize,

    #[serde(default = "default_recent_games_limit")]
    pub recent_games_limit: usize,

    /// Teams per stat leader category.
    #[serde(default = "default_leaders_limit")]
    pub leaders_limit: usize,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            fallback_season: default_fallback_season(),
            primary_poll: default_primary_poll(),
            standings_limit: default_standings_limit(),
            recent_games_limit: default_recent_games_limit(),
            leaders_limit: default_leaders_limit(),
            search_limit: default_search_limit(),
        }
    }
}

fn default_fallback_season() -> Season {
    2025
}

fn default_primary_poll() -> String {
    "AP Top 25".to_string()
}

fn default_standings_limit() -> usize {
    25
}

fn default_recent_games_limit() -> usize {
    10
}

fn default_leaders_limit() -> usize {
    5
}

fn default_search_limit() -> usize {
    20
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.store_url {
            self.store.url = url.clone();
        }
        if let Some(ref key) = args.store_key {
            self.store.api_key = Some(key.clone());
        }
        if let Some(ref url) = args.scouting_url {
            self.scouting.url = url.clone();
        }
        if let Some(ref key) = args.scouting_key {
            self.scouting.api_key = Some(key.clone());
        }
        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = timeout;
            self.scouting.timeout_seconds = timeout;
        }
        if let Some(ref poll) = args.primary_poll {
            self.defaults.primary_poll = poll.clone();
        }
        if let Some(ref fixture) = args.fixture {
            self.general.fixture = Some(fixture.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }

    pub fn rest_store(&self) -> RestStoreConfig {
        RestStoreConfig {
            url: self.store.url.clone(),
            api_key: self.store.api_key.clone(),
            timeout_seconds: self.store.timeout_seconds,
        }
    }

    pub fn scouting_client(&self) -> ScoutingClientConfig {
        ScoutingClientConfig {
            url: self.scouting.url.clone(),
            api_key: self.scouting.api_key.clone(),
            timeout_seconds: self.scouting.timeout_seconds,
            cache_ttl_seconds: self.scouting.cache_ttl_seconds,
            cache_capacity: self.scouting.cache_capacity,
        }
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            fallback_season: self.defaults.fallback_season,
            primary_poll: self.defaults.primary_poll.clone(),
            standings_limit: self.defaults.standings_limit,
            recent_games_limit: self.defaults.recent_games_limit,
            leaders_limit: self.defaults.leaders_limit,
            search_limit: self.defaults.search_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.timeout_seconds, 10);
        assert_eq!(config.scouting.cache_ttl_seconds, 3600);
        assert_eq!(config.defaults.primary_poll, "AP Top 25");
        assert_eq!(config.defaults.fallback_season, 2025);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true

[store]
url = "https://example.supabase.co/rest/v1"
api_key = "anon"

[defaults]
primary_poll = "Coaches Poll"
standings_limit = 10
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.store.url, "https://example.supabase.co/rest/v1");
        assert_eq!(config.store.api_key.as_deref(), Some("anon"));
        assert_eq!(config.store.timeout_seconds, 10);
        assert_eq!(config.defaults.primary_poll, "Coaches Poll");
        assert_eq!(config.defaults.standings_limit, 10);
        assert_eq!(config.defaults.search_limit, 20);
        assert_eq!(config.scouting.url, "http://localhost:8000");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scouting]\ncache_ttl_seconds = 60").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.scouting.cache_ttl_seconds, 60);
        assert_eq!(config.scouting_client().cache_ttl_seconds, 60);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store\nurl = ").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config: Config = toml::from_str("[store]\nurl = \"http://file\"\ntimeout_seconds = 30").unwrap();
        let args = Args::try_parse_from([
            "cfb-aggregator",
            "--store-url",
            "http://cli",
            "--primary-poll",
            "Coaches Poll",
            "seasons",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.store.url, "http://cli");
        assert_eq!(config.store.timeout_seconds, 30);
        assert_eq!(config.aggregator_settings().primary_poll, "Coaches Poll");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[scouting]"));
        assert!(toml_str.contains("[defaults]"));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.defaults.primary_poll, "AP Top 25");
    }
}
