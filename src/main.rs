//! CFB Aggregator - college football stats query layer
//!
//! A CLI over the aggregation library: it resolves configuration, picks a
//! store backend, runs one read and prints the view model.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, store unavailable, invalid input, etc.)
//!   2 - Requested record not found

mod cli;
mod config;

use anyhow::{bail, Context, Result};
use cfb_aggregator::aggregator::Aggregator;
use cfb_aggregator::fetch::Fetch;
use cfb_aggregator::models::{Phase, Season};
use cfb_aggregator::report::{self, MarkdownSection};
use cfb_aggregator::scouting::ScoutingClient;
use cfb_aggregator::store::{MemoryStore, RestStore, Store};
use cfb_aggregator::CancelContext;
use cli::{Args, Command, OutputFormat};
use config::{Config, CONFIG_FILE};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging so its verbose setting applies
    let loaded = load_config(&args);
    let config_verbose = loaded
        .as_ref()
        .is_ok_and(|(config, _)| config.general.verbose);
    init_logging(args.log_level(config_verbose));

    info!("cfb-aggregator v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, loaded).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .cfb-aggregator.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the store URL, API keys and default poll.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Where the configuration came from, reported once logging is up.
enum ConfigSource {
    File(PathBuf),
    Default,
    Builtin,
    Unreadable(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::Default)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(e))),
    }
}

/// Fixture file when one is configured, otherwise the REST store.
fn build_store(config: &Config) -> Result<Arc<dyn Store>> {
    if let Some(ref fixture) = config.general.fixture {
        info!("Using fixture store: {}", fixture.display());
        let store = MemoryStore::load(fixture)
            .with_context(|| format!("Failed to load fixture {}", fixture.display()))?;
        return Ok(Arc::new(store));
    }

    info!("Using REST store: {}", config.store.url);
    let store = RestStore::new(config.rest_store()).context("Failed to create store client")?;
    Ok(Arc::new(store))
}

/// Serialized and printed output of one command.
struct Output {
    json: String,
    markdown: String,
}

impl Output {
    fn view<T: Serialize + MarkdownSection>(title: &str, view: &T) -> Result<Self> {
        Ok(Self {
            json: report::generate_json(view)?,
            markdown: report::generate_markdown(title, view),
        })
    }

    fn list<T: Serialize + std::fmt::Display>(title: &str, values: &Fetch<Vec<T>>) -> Result<Self> {
        Ok(Self {
            json: report::generate_json(values)?,
            markdown: report::generate_markdown_list(title, values),
        })
    }
}

/// Run one command. Returns the exit code.
async fn run(args: Args, loaded: Result<(Config, ConfigSource)>) -> Result<i32> {
    let start_time = Instant::now();

    let (mut config, source) = loaded?;
    source.log();
    config.merge_with_args(&args);

    let Some(command) = args.command.clone() else {
        bail!("No command given");
    };

    // One cancellation scope per invocation; Ctrl-C abandons in-flight reads.
    let (handle, cancel) = CancelContext::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight requests");
            handle.cancel();
        }
    });

    let output = match command {
        Command::ScoutingProfile { .. } | Command::PendingLinks { .. } | Command::ReviewLink { .. } => {
            let client = ScoutingClient::new(config.scouting_client())
                .context("Failed to create scouting client")?
                .for_request(cancel);
            run_scouting(&client, command).await?
        }
        _ => {
            let store = build_store(&config)?;
            let aggregator = Aggregator::new(store, config.aggregator_settings()).for_request(cancel);
            run_query(&aggregator, command).await?
        }
    };

    let Some(output) = output else {
        eprintln!("Not found.");
        return Ok(2);
    };

    let content = match args.format {
        OutputFormat::Json => output.json,
        OutputFormat::Markdown => output.markdown,
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            if !args.quiet {
                println!("Output saved to: {}", path.display());
            }
        }
        None => println!("{}", content),
    }

    debug!("Completed in {:.2}s", start_time.elapsed().as_secs_f64());
    Ok(0)
}

async fn season_or_latest(aggregator: &Aggregator, season: Option<Season>) -> Season {
    match season {
        Some(season) => season,
        None => aggregator.latest_season().await,
    }
}

/// Store-backed commands. `Ok(None)` means the requested record does not exist.
async fn run_query(aggregator: &Aggregator, command: Command) -> Result<Option<Output>> {
    let output = match command {
        Command::Seasons { rankings } => {
            if rankings {
                Output::list("Ranking Seasons", &aggregator.available_ranking_seasons().await)?
            } else {
                Output::list("Seasons", &aggregator.available_seasons().await)?
            }
        }
        Command::Weeks { season, phase } => {
            let season = season_or_latest(aggregator, season).await;
            let phase: Phase = phase.parse()?;
            let weeks = aggregator.available_weeks_for_phase(season, phase).await;
            Output::list(&format!("{} {} Weeks", season, phase), &weeks)?
        }
        Command::Games { season, phase, week } => {
            let season = season_or_latest(aggregator, season).await;
            let page = aggregator.games_page(season, &phase, week).await?;
            Output::view(&format!("{} Games", season), &page)?
        }
        Command::Rankings { season, poll, week } => {
            let season = season_or_latest(aggregator, season).await;
            let page = aggregator.rankings_page(season, poll.as_deref(), week).await;
            Output::view(&format!("{} Rankings", season), &page)?
        }
        Command::Polls { season } => {
            let season = season_or_latest(aggregator, season).await;
            Output::list(&format!("{} Polls", season), &aggregator.available_polls(season).await)?
        }
        Command::Standings { season, limit } => {
            let season = season_or_latest(aggregator, season).await;
            let limit = limit.unwrap_or(aggregator.settings().standings_limit);
            let standings = aggregator.standings(season, limit).await;
            Output::view(&format!("{} Standings", season), &standings)?
        }
        Command::Leaders { season } => {
            let season = season_or_latest(aggregator, season).await;
            let leaders = aggregator.stat_leaders(season).await;
            Output::view(&format!("{} Stat Leaders", season), &leaders)?
        }
        Command::PlayerLeaders {
            season,
            category,
            conference,
            limit,
        } => {
            let season = season_or_latest(aggregator, season).await;
            let leaders = aggregator
                .player_season_leaders(season, &category, conference.as_deref(), limit)
                .await?;
            Output::view(&format!("{} {} Leaders", season, category.to_lowercase()), &leaders)?
        }
        Command::Player { id, season } => match aggregator.player_page(id, season).await? {
            Some(page) => Output::view(&page.player.name, &page)?,
            None => return Ok(None),
        },
        Command::Search { query } => {
            let hits = aggregator.search_players(&query).await;
            Output::view(&format!("Search: {}", query), &hits)?
        }
        Command::Teams { collisions } => {
            if collisions {
                let groups = aggregator.slug_collisions().await;
                let lines = groups.map(|g| {
                    g.into_iter()
                        .map(|(slug, names)| format!("{}: {}", slug, names.join(", ")))
                        .collect::<Vec<_>>()
                });
                Output::list("Slug Collisions", &lines)?
            } else {
                Output::view("Teams", &aggregator.teams().await)?
            }
        }
        Command::Team { slug, season } => match aggregator.team_page(&slug, season).await? {
            Some(page) => Output::view(&page.team.team.school, &page)?,
            None => return Ok(None),
        },
        Command::Analytics { season } => {
            let season = season_or_latest(aggregator, season).await;
            let page = aggregator.analytics_page(season).await;
            Output::view(&format!("{} Team Analytics", season), &page)?
        }
        Command::Dashboard { season } => {
            let page = aggregator.dashboard_page(season).await;
            Output::view(&format!("{} Dashboard", page.season), &page)?
        }
        Command::ScoutingProfile { .. } | Command::PendingLinks { .. } | Command::ReviewLink { .. } => {
            bail!("Scouting commands do not use the store")
        }
    };

    Ok(Some(output))
}

/// Scouting API commands.
async fn run_scouting(client: &ScoutingClient, command: Command) -> Result<Option<Output>> {
    let output = match command {
        Command::ScoutingProfile { id, refresh } => {
            if refresh {
                client.invalidate(id);
            }
            let (profile, scouting_report) = futures::join!(client.player_profile(id), client.player_report(id));
            let Some(profile) = profile? else {
                return Ok(None);
            };
            let scouting_report = scouting_report.unwrap_or_else(|e| {
                warn!("Scouting report for {} unavailable: {}", id, e);
                None
            });

            let mut markdown = report::generate_markdown("Scouting Profile", &profile);
            if let Some(ref r) = scouting_report {
                markdown.push_str(&r.to_markdown());
            }
            Output {
                json: report::generate_json(&serde_json::json!({
                    "profile": profile,
                    "report": scouting_report,
                }))?,
                markdown,
            }
        }
        Command::PendingLinks { status } => {
            let links = client.pending_links(status).await;
            Output::view(&format!("Pending Links ({})", status), &links)?
        }
        Command::ReviewLink { id, decision } => {
            if !client.review_pending_link(id, decision).await {
                bail!("Review of pending link {} was not accepted", id);
            }
            let message = format!("Pending link {} marked {:?}", id, decision).to_lowercase();
            Output {
                json: report::generate_json(&serde_json::json!({ "id": id, "status": decision, "ok": true }))?,
                markdown: format!("{}\n", message),
            }
        }
        _ => bail!("Not a scouting command"),
    };

    Ok(Some(output))
}
