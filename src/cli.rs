//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use cfb_aggregator::models::Season;
use cfb_aggregator::scouting::{LinkStatus, ReviewDecision};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CFB Aggregator - college football stats query layer
///
/// Reads seasons, games, rankings, standings and player stats from a
/// PostgREST store (or a JSON fixture) and prints them as Markdown or JSON.
///
/// Examples:
///   cfb-aggregator dashboard
///   cfb-aggregator games --season 2025 --week 2
///   cfb-aggregator rankings --poll "AP Top 25" --format json
///   cfb-aggregator --fixture fixtures/sample.json player-leaders --category passing
///   cfb-aggregator --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .cfb-aggregator.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Serve reads from a JSON fixture file instead of the REST store
    #[arg(long, value_name = "FILE", global = true)]
    pub fixture: Option<PathBuf>,

    /// PostgREST base URL
    #[arg(long, value_name = "URL", env = "CFB_STORE_URL", global = true)]
    pub store_url: Option<String>,

    /// Store API key
    #[arg(long, value_name = "KEY", env = "CFB_STORE_KEY", hide_env_values = true, global = true)]
    pub store_key: Option<String>,

    /// Scouting API base URL
    #[arg(long, value_name = "URL", env = "CFB_SCOUTING_URL", global = true)]
    pub scouting_url: Option<String>,

    /// Scouting API key
    #[arg(long, value_name = "KEY", env = "CFB_SCOUTING_KEY", hide_env_values = true, global = true)]
    pub scouting_key: Option<String>,

    /// Request timeout in seconds for both the store and the scouting API
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Poll preferred when none is requested
    #[arg(long, value_name = "POLL", global = true)]
    pub primary_poll: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .cfb-aggregator.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Seasons with data, most recent first
    Seasons {
        /// List seasons with published rankings instead of games
        #[arg(long)]
        rankings: bool,
    },

    /// Weeks with games in a season
    Weeks {
        #[arg(long)]
        season: Option<Season>,
        #[arg(long, default_value = "regular")]
        phase: String,
    },

    /// Games for a season phase, opening on the default week
    Games {
        #[arg(long)]
        season: Option<Season>,
        /// regular or postseason
        #[arg(long, default_value = "regular")]
        phase: String,
        #[arg(long)]
        week: Option<u32>,
    },

    /// Poll rankings for a week, with season trajectories
    Rankings {
        #[arg(long)]
        season: Option<Season>,
        #[arg(long)]
        poll: Option<String>,
        #[arg(long)]
        week: Option<u32>,
    },

    /// Polls published in a season
    Polls {
        #[arg(long)]
        season: Option<Season>,
    },

    /// Standings by composite score
    Standings {
        #[arg(long)]
        season: Option<Season>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Team stat leaders per category
    Leaders {
        #[arg(long)]
        season: Option<Season>,
    },

    /// Player leaderboard for one category
    PlayerLeaders {
        #[arg(long)]
        season: Option<Season>,
        /// passing, rushing, receiving, tackles, sacks or interceptions
        #[arg(long)]
        category: String,
        #[arg(long)]
        conference: Option<String>,
        #[arg(long, default_value = "25")]
        limit: usize,
    },

    /// Player profile, seasons, game log and percentiles
    Player {
        id: i64,
        #[arg(long)]
        season: Option<Season>,
    },

    /// Search players by name or team
    Search { query: String },

    /// All teams with their slugs
    Teams {
        /// Only report teams whose slugs collide
        #[arg(long)]
        collisions: bool,
    },

    /// Team page by slug
    Team {
        slug: String,
        #[arg(long)]
        season: Option<Season>,
    },

    /// Team efficiency and style table
    Analytics {
        #[arg(long)]
        season: Option<Season>,
    },

    /// Standings, recent games and stat leaders
    Dashboard {
        #[arg(long)]
        season: Option<Season>,
    },

    /// Scouting profile and report for a player
    ScoutingProfile {
        id: i64,
        /// Drop cached entries before reading
        #[arg(long)]
        refresh: bool,
    },

    /// Moderation queue of candidate scouting links
    PendingLinks {
        #[arg(long, default_value = "pending")]
        status: LinkStatus,
    },

    /// Approve or reject a candidate scouting link
    ReviewLink { id: i64, decision: ReviewDecision },
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("A command is required (see --help)".to_string());
        }

        for url in [&self.store_url, &self.scouting_url].into_iter().flatten() {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("URL must start with 'http://' or 'https://': {}", url));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        match &self.command {
            Some(Command::Standings { limit: Some(0), .. })
            | Some(Command::PlayerLeaders { limit: 0, .. }) => {
                return Err("Limit must be at least 1".to_string());
            }
            Some(Command::Games { week: Some(0), .. }) | Some(Command::Rankings { week: Some(0), .. }) => {
                return Err("Weeks start at 1".to_string());
            }
            _ => {}
        }

        if let Some(ref fixture) = self.fixture {
            if !fixture.is_file() {
                return Err(format!("Fixture file does not exist: {}", fixture.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity flags and the config file's
    /// `verbose` setting. `--quiet` wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
