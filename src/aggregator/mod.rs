//! Query aggregator.
//!
//! Translates a page's data needs into store queries and shapes the rows
//! into view models. Two policies apply and every operation declares which
//! one it follows:
//!
//! - listing and default-selection reads are best-effort and return
//!   [`Fetch`](crate::fetch::Fetch); a store failure is logged and surfaces
//!   as `Fetch::Failed`, never as an error.
//! - detail reads are must-succeed and return
//!   `Result<Option<T>, AggregatorError>`; `Ok(None)` is the not-found
//!   sentinel and store failures propagate as `DataUnavailable`.
//!
//! An [`Aggregator`] is bound to one request's [`CancelContext`]; use
//! [`Aggregator::for_request`] to rebind a shared instance.

pub mod games;
pub mod pages;
pub mod players;
pub mod rankings;
pub mod seasons;
pub mod sorting;
pub mod teams;

pub use games::GameFilter;
pub use pages::{AnalyticsPage, DashboardPage, GamesPage, PlayerPage, RankingsPage, TeamAnalytics, TeamPage};

use crate::cancel::CancelContext;
use crate::error::StoreError;
use crate::fetch::Fetch;
use crate::models::Season;
use crate::query::{Direction, Query};
use crate::store::{decode_rows, Row, Store};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Store table and view names.
pub mod tables {
    pub const TEAMS: &str = "teams";
    pub const TEAM_EPA: &str = "team_epa_season";
    pub const TEAM_STYLE: &str = "team_style_profile";
    pub const TEAM_TRAJECTORY: &str = "team_season_trajectory";
    pub const STANDINGS: &str = "team_standings";
    pub const GAMES: &str = "games";
    pub const RANKINGS: &str = "rankings";
    pub const PLAYER_LEADERS: &str = "player_season_leaders";
    pub const PLAYER_SEASONS: &str = "player_seasons";
    pub const PLAYER_GAME_LOGS: &str = "player_game_logs";
    pub const PLAYER_PERCENTILES: &str = "player_percentiles";
    pub const PLAYERS: &str = "players";
}

/// Defaults and bounds applied by the aggregator.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Season reported when the store cannot be reached.
    pub fallback_season: Season,
    /// Poll preferred by the default poll selection.
    pub primary_poll: String,
    pub standings_limit: usize,
    pub recent_games_limit: usize,
    /// Entries per stat leader category.
    pub leaders_limit: usize,
    pub search_limit: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            fallback_season: 2025,
            primary_poll: "AP Top 25".to_string(),
            standings_limit: 25,
            recent_games_limit: 10,
            leaders_limit: 5,
            search_limit: 20,
        }
    }
}

#[derive(Clone)]
pub struct Aggregator {
    store: Arc<dyn Store>,
    settings: Arc<AggregatorSettings>,
    cancel: CancelContext,
}

impl Aggregator {
    pub fn new(store: Arc<dyn Store>, settings: AggregatorSettings) -> Self {
        debug!("Aggregator using {} store", store.backend_type());
        Self {
            store,
            settings: Arc::new(settings),
            cancel: CancelContext::none(),
        }
    }

    /// Same store and settings, bound to a request's cancellation context.
    pub fn for_request(&self, cancel: CancelContext) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Run a query under the request's cancellation context and decode rows.
    async fn fetch<T: DeserializeOwned>(&self, query: Query) -> Result<Vec<T>, StoreError> {
        let rows = self.cancel.run(self.store.execute(&query)).await?;
        debug!("{}: {} rows", query.table, rows.len());
        decode_rows(&query.table, rows)
    }

    /// Best-effort list read.
    async fn fetch_list<T: DeserializeOwned>(&self, context: &str, query: Query) -> Fetch<Vec<T>> {
        Fetch::from_result(context, self.fetch(query).await)
    }

    /// Must-succeed single-row read.
    async fn fetch_one<T: DeserializeOwned>(&self, query: Query) -> Result<Option<T>, StoreError> {
        Ok(self.fetch(query.limit(1)).await?.into_iter().next())
    }

    /// Distinct non-null values of `column` among rows matching `base`, in
    /// `direction` order.
    ///
    /// Walks one value per round trip (`limit 1` past the previous value), so
    /// a server-side row cap never truncates the set.
    async fn distinct_values<T>(
        &self,
        context: &str,
        base: Query,
        column: &str,
        direction: Direction,
    ) -> Fetch<Vec<T>>
    where
        T: DeserializeOwned + PartialEq + Clone + Into<Value>,
    {
        let mut values: Vec<T> = Vec::new();

        loop {
            let mut query = base
                .clone()
                .select(&[column])
                .not_null(column)
                .order_by(column, direction)
                .limit(1);
            if let Some(last) = values.last() {
                query = match direction {
                    Direction::Asc => query.gt(column, last.clone()),
                    Direction::Desc => query.lt(column, last.clone()),
                };
            }

            let row = match self.fetch::<Row>(query).await {
                Ok(rows) => rows.into_iter().next(),
                Err(e) => return Fetch::failed(context, e),
            };
            let Some(value) = row.and_then(|mut r| r.remove(column)) else {
                break;
            };

            let value: T = match serde_json::from_value(value) {
                Ok(v) => v,
                Err(e) => {
                    return Fetch::failed(context, StoreError::Decode(format!("{}: {}", column, e)))
                }
            };
            if values.last() == Some(&value) {
                break;
            }
            values.push(value);
        }

        debug!("{}: {} distinct values", context, values.len());
        Fetch::from_list(values)
    }
}
