//! Player leaderboards, profiles and search.

use super::sorting::{rank_player_leaders, rank_search_results};
use super::{tables, Aggregator};
use crate::error::AggregatorError;
use crate::fetch::Fetch;
use crate::models::{
    LeaderCategory, PlayerGameLogEntry, PlayerLeader, PlayerPercentile, PlayerSearchResult,
    PlayerSeason, Season,
};
use crate::query::{Filter, Query};
use futures::join;
use tracing::{debug, warn};

impl Aggregator {
    /// Ranked leaderboard for one category.
    ///
    /// `category` is validated before any fetch. A conference filter narrows
    /// the pool before ranks are assigned, so ranks always start at 1.
    pub async fn player_season_leaders(
        &self,
        season: Season,
        category: &str,
        conference: Option<&str>,
        limit: usize,
    ) -> Result<Fetch<Vec<PlayerLeader>>, AggregatorError> {
        let category: LeaderCategory = category.parse()?;

        let mut query = Query::table(tables::PLAYER_LEADERS)
            .eq("season", season)
            .eq("category", category.as_str());
        if let Some(conference) = conference {
            query = query.eq("conference", conference);
        }
        let query = query
            .desc("stat_value")
            .asc("player_name")
            .asc("player_id")
            .limit(limit);

        Ok(self
            .fetch_list::<PlayerLeader>("Player leaders", query)
            .await
            .map(|mut leaders| {
                rank_player_leaders(&mut leaders, limit);
                leaders
            }))
    }

    /// A player's profile for `season`, or for their most recent season when
    /// `season` is `None`. `Ok(None)` when the player has no such season.
    pub async fn player_detail(
        &self,
        player_id: i64,
        season: Option<Season>,
    ) -> Result<Option<PlayerSeason>, AggregatorError> {
        let query = Query::table(tables::PLAYER_SEASONS).eq("player_id", player_id);
        let query = match season {
            Some(season) => query.eq("season", season),
            None => query.desc("season"),
        };
        Ok(self.fetch_one(query).await?)
    }

    /// Every season with data for the player, oldest first.
    pub async fn player_seasons(&self, player_id: i64) -> Fetch<Vec<PlayerSeason>> {
        let query = Query::table(tables::PLAYER_SEASONS)
            .eq("player_id", player_id)
            .asc("season");
        self.fetch_list::<PlayerSeason>("Player seasons", query)
            .await
            .map(|mut seasons| {
                seasons.sort_by_key(|s| s.season);
                seasons
            })
    }

    /// Game-by-game line for one season, by week.
    pub async fn player_game_log(&self, player_id: i64, season: Season) -> Fetch<Vec<PlayerGameLogEntry>> {
        let query = Query::table(tables::PLAYER_GAME_LOGS)
            .eq("player_id", player_id)
            .eq("season", season)
            .asc("week")
            .asc("game_id");
        self.fetch_list::<PlayerGameLogEntry>("Player game log", query)
            .await
            .map(|mut games| {
                games.sort_by_key(|g| (g.week, g.game_id));
                games
            })
    }

    pub async fn player_percentiles(&self, player_id: i64, season: Season) -> Fetch<Vec<PlayerPercentile>> {
        let query = Query::table(tables::PLAYER_PERCENTILES)
            .eq("player_id", player_id)
            .eq("season", season)
            .asc("metric");
        self.fetch_list::<PlayerPercentile>("Player percentiles", query)
            .await
            .map(|mut rows| {
                rows.sort_by(|a, b| a.metric.cmp(&b.metric));
                rows
            })
    }

    /// Case-insensitive substring search over player name and team.
    ///
    /// Name and team matches are fetched as separate bounded queries so a
    /// crowd of team-only hits cannot push name hits out of the window before
    /// ranking. A blank query matches nothing and never reaches the store.
    pub async fn search_players(&self, query: &str) -> Fetch<Vec<PlayerSearchResult>> {
        let needle = query.trim();
        if needle.is_empty() {
            debug!("Empty player search");
            return Fetch::Empty;
        }

        let limit = self.settings.search_limit;
        let matching = |column: &str| {
            Query::table(tables::PLAYERS)
                .filter(Filter::Contains(column.to_string(), needle.to_string()))
                .asc("name")
                .asc("player_id")
                .limit(limit * 4)
        };

        let (by_name, by_team) = join!(
            self.fetch::<PlayerSearchResult>(matching("name")),
            self.fetch::<PlayerSearchResult>(matching("team")),
        );

        let hits = match (by_name, by_team) {
            (Ok(mut names), Ok(teams)) => {
                names.extend(teams);
                names
            }
            (Ok(hits), Err(e)) | (Err(e), Ok(hits)) => {
                warn!("Player search partially failed: {}", e);
                hits
            }
            (Err(e), Err(_)) => return Fetch::failed("Player search", e),
        };

        Fetch::from_list(rank_search_results(needle, hits, limit))
    }
}
