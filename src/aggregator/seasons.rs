//! Season and week filter values.

use super::{tables, Aggregator};
use crate::fetch::Fetch;
use crate::models::{Phase, Season};
use crate::query::{Direction, Query};
use futures::join;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct SeasonRow {
    season: Season,
}

#[derive(Deserialize)]
struct WeekRow {
    week: u32,
}

impl Aggregator {
    /// Most recent season with any game data.
    ///
    /// Best-effort: falls back to the configured fallback season when the
    /// store is unreachable or empty.
    pub async fn latest_season(&self) -> Season {
        let query = Query::table(tables::GAMES)
            .select(&["season"])
            .desc("season")
            .limit(1);

        match self.fetch::<SeasonRow>(query).await {
            Ok(rows) => match rows.first() {
                Some(row) => row.season,
                None => {
                    warn!(
                        "No seasons recorded, using fallback season {}",
                        self.settings.fallback_season
                    );
                    self.settings.fallback_season
                }
            },
            Err(e) => {
                warn!(
                    "Latest season lookup failed ({}), using fallback season {}",
                    e, self.settings.fallback_season
                );
                self.settings.fallback_season
            }
        }
    }

    /// Seasons with game data, most recent first.
    pub async fn available_seasons(&self) -> Fetch<Vec<Season>> {
        self.distinct_values(
            "Available seasons",
            Query::table(tables::GAMES),
            "season",
            Direction::Desc,
        )
        .await
    }

    /// Regular-season weeks in `season`, ascending.
    pub async fn available_weeks(&self, season: Season) -> Fetch<Vec<u32>> {
        self.available_weeks_for_phase(season, Phase::Regular).await
    }

    /// Weeks with games in `season` and `phase`, ascending.
    pub async fn available_weeks_for_phase(&self, season: Season, phase: Phase) -> Fetch<Vec<u32>> {
        let base = Query::table(tables::GAMES)
            .eq("season", season)
            .eq("season_type", phase.as_str());
        self.distinct_values("Available weeks", base, "week", Direction::Asc)
            .await
    }

    /// Seasons with published rankings, most recent first.
    pub async fn available_ranking_seasons(&self) -> Fetch<Vec<Season>> {
        self.distinct_values(
            "Available ranking seasons",
            Query::table(tables::RANKINGS),
            "season",
            Direction::Desc,
        )
        .await
    }

    /// Week a games view opens on.
    ///
    /// The most recent regular-season week with at least one completed game;
    /// if nothing has been played, the earliest scheduled week; week 1 when
    /// the season has no games or the store is unreachable.
    pub async fn default_week(&self, season: Season) -> u32 {
        let base = Query::table(tables::GAMES)
            .select(&["week"])
            .eq("season", season)
            .eq("season_type", Phase::Regular.as_str())
            .not_null("week");

        let (played, scheduled) = join!(
            self.fetch::<WeekRow>(base.clone().eq("completed", true).desc("week").limit(1)),
            self.fetch::<WeekRow>(base.asc("week").limit(1)),
        );
        let latest_played = played.map(|rows| rows.first().map(|r| r.week));
        let earliest = scheduled.map(|rows| rows.first().map(|r| r.week));

        match (latest_played, earliest) {
            (Ok(Some(week)), _) => {
                debug!("Default week for {}: latest played {}", season, week);
                week
            }
            (Ok(None), Ok(week)) => {
                debug!("Default week for {}: earliest scheduled {:?}", season, week);
                week.unwrap_or(1)
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!("Default week lookup for {} failed: {}", season, e);
                1
            }
        }
    }
}
