//! Poll rankings.

use super::sorting::{sort_rankings, sort_rankings_by_week};
use super::{tables, Aggregator};
use crate::fetch::Fetch;
use crate::models::{RankingEntry, Season};
use crate::query::{Direction, Query};
use serde::Deserialize;
use tracing::debug;

#[derive(Deserialize)]
struct WeekRow {
    week: u32,
}

impl Aggregator {
    /// One poll's ballot for one week: ranked teams by rank, then teams
    /// receiving votes by points.
    pub async fn rankings_for_week(&self, season: Season, week: u32, poll: &str) -> Fetch<Vec<RankingEntry>> {
        let query = Query::table(tables::RANKINGS)
            .eq("season", season)
            .eq("week", week)
            .eq("poll", poll)
            .asc("rank")
            .desc("points")
            .asc("school");

        self.fetch_list::<RankingEntry>("Rankings", query)
            .await
            .map(|mut entries| {
                sort_rankings(&mut entries);
                entries
            })
    }

    /// Every week a poll published in `season`, week ascending. A team that
    /// dropped out of the poll simply has no entry for that week.
    pub async fn rankings_all_weeks(&self, season: Season, poll: &str) -> Fetch<Vec<RankingEntry>> {
        let query = Query::table(tables::RANKINGS)
            .eq("season", season)
            .eq("poll", poll)
            .asc("week")
            .asc("rank");

        self.fetch_list::<RankingEntry>("Rankings by week", query)
            .await
            .map(|mut entries| {
                sort_rankings_by_week(&mut entries);
                entries
            })
    }

    /// Polls with data in `season`, alphabetical.
    pub async fn available_polls(&self, season: Season) -> Fetch<Vec<String>> {
        let base = Query::table(tables::RANKINGS).eq("season", season);
        self.distinct_values("Available polls", base, "poll", Direction::Asc)
            .await
    }

    /// The configured primary poll when offered, else the first poll listed.
    pub fn default_poll(&self, polls: &[String]) -> Option<String> {
        let primary = &self.settings.primary_poll;
        let choice = polls
            .iter()
            .find(|p| *p == primary)
            .or_else(|| polls.first())
            .cloned();
        debug!("Default poll: {:?}", choice);
        choice
    }

    /// Weeks `poll` published in `season`, ascending.
    pub async fn available_ranking_weeks(&self, season: Season, poll: &str) -> Fetch<Vec<u32>> {
        let base = Query::table(tables::RANKINGS)
            .eq("season", season)
            .eq("poll", poll);
        self.distinct_values("Ranking weeks", base, "week", Direction::Asc)
            .await
    }

    /// Highest week with data for (`season`, `poll`).
    pub async fn latest_poll_week(&self, season: Season, poll: &str) -> Fetch<u32> {
        let query = Query::table(tables::RANKINGS)
            .select(&["week"])
            .eq("season", season)
            .eq("poll", poll)
            .desc("week")
            .limit(1);

        match self.fetch_list::<WeekRow>("Latest poll week", query).await {
            Fetch::Ok(rows) => rows.first().map_or(Fetch::Empty, |r| Fetch::Ok(r.week)),
            Fetch::Empty => Fetch::Empty,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::aggregator::sorting::ranking_trajectory;
    use crate::error::StoreError;

    fn schools(fetch: Fetch<Vec<RankingEntry>>) -> Vec<String> {
        fetch.into_inner_or_default().into_iter().map(|e| e.school).collect()
    }

    #[tokio::test]
    async fn test_rankings_for_week_order() {
        let agg = fixtures::aggregator(fixtures::store());
        assert_eq!(
            schools(agg.rankings_for_week(2025, 5, "AP Top 25").await),
            vec!["Georgia", "Ohio State", "Texas", "Navy"]
        );
    }

    #[tokio::test]
    async fn test_rankings_for_week_is_deterministic() {
        let agg = fixtures::aggregator(fixtures::store());
        let first = agg.rankings_for_week(2025, 5, "AP Top 25").await;
        let second = agg.rankings_for_week(2025, 5, "AP Top 25").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_poll_is_empty() {
        let agg = fixtures::aggregator(fixtures::store());
        assert_eq!(agg.rankings_for_week(2025, 5, "Playoff Committee").await, Fetch::Empty);
    }

    #[tokio::test]
    async fn test_rankings_all_weeks_keeps_gaps() {
        let agg = fixtures::aggregator(fixtures::store());
        let entries = agg
            .rankings_all_weeks(2025, "AP Top 25")
            .await
            .into_inner_or_default();
        let keys: Vec<_> = entries.iter().map(|e| (e.week, e.school.as_str())).collect();
        assert_eq!(
            keys,
            vec![
                (4, "Texas"),
                (4, "Georgia"),
                (5, "Georgia"),
                (5, "Ohio State"),
                (5, "Texas"),
                (5, "Navy"),
            ]
        );

        let ohio_state = ranking_trajectory(&entries, "Ohio State");
        assert_eq!(ohio_state.weeks, vec![(4, None), (5, Some(2))]);
    }

    #[tokio::test]
    async fn test_polls_and_default_poll() {
        let agg = fixtures::aggregator(fixtures::store());
        let polls = agg.available_polls(2025).await.into_inner_or_default();
        assert_eq!(polls, vec!["AP Top 25", "Coaches Poll"]);
        assert_eq!(agg.default_poll(&polls).as_deref(), Some("AP Top 25"));

        let others = vec!["Coaches Poll".to_string(), "Playoff Committee".to_string()];
        assert_eq!(agg.default_poll(&others).as_deref(), Some("Coaches Poll"));
        assert_eq!(agg.default_poll(&[]), None);
    }

    #[tokio::test]
    async fn test_ranking_weeks_and_latest() {
        let agg = fixtures::aggregator(fixtures::store());
        assert_eq!(
            agg.available_ranking_weeks(2025, "AP Top 25").await,
            Fetch::Ok(vec![4, 5])
        );
        assert_eq!(agg.latest_poll_week(2025, "AP Top 25").await, Fetch::Ok(5));
        assert_eq!(agg.latest_poll_week(2025, "Coaches Poll").await, Fetch::Ok(5));
        assert_eq!(agg.latest_poll_week(2019, "AP Top 25").await, Fetch::Empty);
    }

    #[tokio::test]
    async fn test_rankings_failure_is_isolated() {
        let store = fixtures::store();
        store.fail_table(tables::RANKINGS, StoreError::Status { status: 503, body: String::new() });
        let agg = fixtures::aggregator(store);
        assert!(agg.rankings_for_week(2025, 5, "AP Top 25").await.is_failed());
        assert!(agg.latest_poll_week(2025, "AP Top 25").await.is_failed());
    }
}
