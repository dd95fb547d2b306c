//! Game listings and lookups.

use super::sorting::{sort_games_chronological, sort_games_recent_first};
use super::{tables, Aggregator};
use crate::error::AggregatorError;
use crate::fetch::Fetch;
use crate::models::{Game, Phase, Season};
use crate::query::{Filter, Query};
use serde::Serialize;
use serde_json::Value;

/// Which games to list. `week: None` means every week in the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameFilter {
    pub season: Season,
    pub phase: Phase,
    pub week: Option<u32>,
}

impl GameFilter {
    pub fn new(season: Season, phase: Phase, week: Option<u32>) -> Self {
        Self { season, phase, week }
    }

    /// Build a filter from a caller-supplied phase string.
    pub fn parse(season: Season, phase: &str, week: Option<u32>) -> Result<Self, AggregatorError> {
        Ok(Self::new(season, phase.parse()?, week))
    }

    fn to_query(self) -> Query {
        let mut query = Query::table(tables::GAMES)
            .eq("season", self.season)
            .eq("season_type", self.phase.as_str());
        if let Some(week) = self.week {
            query = query.eq("week", week);
        }
        query.asc("start_date").asc("id")
    }
}

impl Aggregator {
    /// Games matching `filter`, chronological with id as the tiebreak.
    pub async fn games(&self, filter: &GameFilter) -> Fetch<Vec<Game>> {
        self.fetch_list::<Game>("Games", filter.to_query())
            .await
            .map(|mut games| {
                sort_games_chronological(&mut games);
                games
            })
    }

    /// The `limit` most recently completed games of a season.
    pub async fn recent_games(&self, season: Season, limit: usize) -> Fetch<Vec<Game>> {
        let query = Query::table(tables::GAMES)
            .eq("season", season)
            .eq("completed", true)
            .desc("start_date")
            .desc("id")
            .limit(limit);

        self.fetch_list::<Game>("Recent games", query)
            .await
            .map(|mut games| {
                sort_games_recent_first(&mut games);
                games
            })
    }

    /// A single game. `Ok(None)` when no game has this id.
    pub async fn game_by_id(&self, id: i64) -> Result<Option<Game>, AggregatorError> {
        let query = Query::table(tables::GAMES).eq("id", id);
        Ok(self.fetch_one(query).await?)
    }

    /// Every game `team` played or will play in `season`, both phases.
    pub async fn team_schedule(&self, team: &str, season: Season) -> Fetch<Vec<Game>> {
        let query = Query::table(tables::GAMES)
            .eq("season", season)
            .or(vec![
                Filter::Eq("home_team".to_string(), Value::from(team)),
                Filter::Eq("away_team".to_string(), Value::from(team)),
            ])
            .asc("start_date")
            .asc("id");

        self.fetch_list::<Game>("Team schedule", query)
            .await
            .map(|mut games| {
                sort_games_chronological(&mut games);
                games
            })
    }
}
