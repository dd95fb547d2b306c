//! Page assemblies.
//!
//! Each page is a scatter/gather over the single-purpose reads: independent
//! regions are fetched concurrently with `futures::join!`, and a read whose
//! input depends on another result (default poll, default week, resolved
//! season) is only issued once that input is known. Every region keeps its
//! own [`Fetch`] so one failed table never blanks the rest of the page.

use super::games::GameFilter;
use super::sorting::ranking_trajectory;
use super::{tables, Aggregator};
use crate::error::AggregatorError;
use crate::fetch::Fetch;
use crate::models::{
    Game, Phase, PlayerGameLogEntry, PlayerPercentile, PlayerSeason, RankingEntry,
    RankingTrajectory, Season, Standing, StatLeaders, TeamSeasonEpa, TeamStyleProfile,
    TeamTrajectoryPoint, TeamView,
};
use crate::query::Query;
use crate::slug::team_name_to_slug;
use futures::join;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardPage {
    pub season: Season,
    pub standings: Fetch<Vec<Standing>>,
    pub recent_games: Fetch<Vec<Game>>,
    pub stat_leaders: Fetch<StatLeaders>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsPage {
    pub season: Season,
    pub teams: Fetch<Vec<TeamView>>,
    pub epa: Fetch<Vec<TeamSeasonEpa>>,
    pub styles: Fetch<Vec<TeamStyleProfile>>,
}

/// One row of the analytics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAnalytics {
    pub school: String,
    pub slug: String,
    pub conference: Option<String>,
    pub epa: Option<TeamSeasonEpa>,
    pub style: Option<TeamStyleProfile>,
}

impl AnalyticsPage {
    /// Join the three regions by team name.
    ///
    /// Rows come from whichever regions loaded, so a failed team list still
    /// yields metric rows, just without identity columns.
    pub fn joined(&self) -> Vec<TeamAnalytics> {
        let teams = region(&self.teams);
        let epa = region(&self.epa);
        let styles = region(&self.styles);

        let schools: BTreeSet<&str> = teams
            .iter()
            .map(|t| t.team.school.as_str())
            .chain(epa.iter().map(|e| e.team.as_str()))
            .chain(styles.iter().map(|s| s.team.as_str()))
            .collect();

        schools
            .into_iter()
            .map(|school| {
                let team = teams.iter().find(|t| t.team.school == school);
                TeamAnalytics {
                    school: school.to_string(),
                    slug: team
                        .map(|t| t.slug.clone())
                        .unwrap_or_else(|| team_name_to_slug(school)),
                    conference: team.and_then(|t| t.team.conference.clone()),
                    epa: epa.iter().find(|e| e.team == school).cloned(),
                    style: styles.iter().find(|s| s.team == school).cloned(),
                }
            })
            .collect()
    }
}

fn region<T>(fetch: &Fetch<Vec<T>>) -> &[T] {
    match fetch {
        Fetch::Ok(items) => items,
        _ => &[],
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingsPage {
    pub season: Season,
    pub polls: Fetch<Vec<String>>,
    /// Poll shown, requested or defaulted. `None` when the season has no polls.
    pub poll: Option<String>,
    pub weeks: Fetch<Vec<u32>>,
    pub week: Option<u32>,
    pub rankings: Fetch<Vec<RankingEntry>>,
    /// Week-by-week rank of every team on the shown ballot.
    pub trajectories: Vec<RankingTrajectory>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamesPage {
    pub filter: GameFilter,
    pub weeks: Fetch<Vec<u32>>,
    pub games: Fetch<Vec<Game>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPage {
    pub player: PlayerSeason,
    pub seasons: Fetch<Vec<PlayerSeason>>,
    pub game_log: Fetch<Vec<PlayerGameLogEntry>>,
    pub percentiles: Fetch<Vec<PlayerPercentile>>,
}

impl PlayerPage {
    /// Whether a season selector applies: the player has more than one season.
    pub fn has_multiple_seasons(&self) -> bool {
        self.seasons.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPage {
    pub team: TeamView,
    pub season: Season,
    pub epa: Fetch<TeamSeasonEpa>,
    pub style: Fetch<TeamStyleProfile>,
    pub schedule: Fetch<Vec<Game>>,
    pub trajectory: Fetch<Vec<TeamTrajectoryPoint>>,
}

fn first<T>(fetch: Fetch<Vec<T>>) -> Fetch<T> {
    match fetch {
        Fetch::Ok(items) => items.into_iter().next().map_or(Fetch::Empty, Fetch::Ok),
        Fetch::Empty => Fetch::Empty,
        Fetch::Failed(reason) => Fetch::Failed(reason),
    }
}

impl Aggregator {
    async fn resolve_season(&self, season: Option<Season>) -> Season {
        match season {
            Some(season) => season,
            None => self.latest_season().await,
        }
    }

    /// Standings, recent results and stat leaders for a season (default: the
    /// latest one).
    pub async fn dashboard_page(&self, season: Option<Season>) -> DashboardPage {
        let season = self.resolve_season(season).await;
        info!("Assembling dashboard for {}", season);

        let (standings, recent_games, stat_leaders) = join!(
            self.standings(season, self.settings.standings_limit),
            self.recent_games(season, self.settings.recent_games_limit),
            self.stat_leaders(season)
        );

        DashboardPage {
            season,
            standings,
            recent_games,
            stat_leaders,
        }
    }

    pub async fn analytics_page(&self, season: Season) -> AnalyticsPage {
        info!("Assembling analytics for {}", season);
        let (teams, epa, styles) = join!(self.teams(), self.team_epa(season), self.team_styles(season));
        AnalyticsPage {
            season,
            teams,
            epa,
            styles,
        }
    }

    /// Rankings for a poll and week, defaulting the poll to the primary one
    /// and the week to the poll's latest.
    pub async fn rankings_page(&self, season: Season, poll: Option<&str>, week: Option<u32>) -> RankingsPage {
        info!("Assembling rankings for {}", season);
        let polls = self.available_polls(season).await;

        let poll = match poll {
            Some(p) => Some(p.to_string()),
            None => match &polls {
                Fetch::Ok(names) => self.default_poll(names),
                _ => None,
            },
        };

        let Some(poll_name) = poll.clone() else {
            debug!("No poll for {}, skipping rankings", season);
            return RankingsPage {
                season,
                polls,
                poll: None,
                weeks: Fetch::Empty,
                week: None,
                rankings: Fetch::Empty,
                trajectories: Vec::new(),
            };
        };

        let (selected, weeks, all_weeks) = join!(
            async {
                match week {
                    Some(w) => Fetch::Ok(w),
                    None => self.latest_poll_week(season, &poll_name).await,
                }
            },
            self.available_ranking_weeks(season, &poll_name),
            self.rankings_all_weeks(season, &poll_name)
        );

        let week = selected.ok();
        let rankings = match week {
            Some(w) => self.rankings_for_week(season, w, &poll_name).await,
            None => Fetch::Empty,
        };

        let trajectories = match (&rankings, &all_weeks) {
            (Fetch::Ok(ballot), Fetch::Ok(history)) => ballot
                .iter()
                .map(|entry| ranking_trajectory(history, &entry.school))
                .collect(),
            _ => Vec::new(),
        };

        RankingsPage {
            season,
            polls,
            poll,
            weeks,
            week,
            rankings,
            trajectories,
        }
    }

    /// Games for a season phase. A regular-season page without a week opens
    /// on [`default_week`](Aggregator::default_week); a postseason page
    /// without one lists every bowl week.
    pub async fn games_page(
        &self,
        season: Season,
        phase: &str,
        week: Option<u32>,
    ) -> Result<GamesPage, AggregatorError> {
        let phase: Phase = phase.parse()?;
        info!("Assembling {} games for {}", phase, season);

        let (weeks, week) = join!(self.available_weeks_for_phase(season, phase), async {
            match (week, phase) {
                (Some(w), _) => Some(w),
                (None, Phase::Regular) => Some(self.default_week(season).await),
                (None, Phase::Postseason) => None,
            }
        });

        let filter = GameFilter::new(season, phase, week);
        let games = self.games(&filter).await;

        Ok(GamesPage { filter, weeks, games })
    }

    /// A player's profile plus supporting regions. `Ok(None)` when the player
    /// or the requested season does not exist.
    pub async fn player_page(
        &self,
        player_id: i64,
        season: Option<Season>,
    ) -> Result<Option<PlayerPage>, AggregatorError> {
        let Some(player) = self.player_detail(player_id, season).await? else {
            debug!("Player {} not found for {:?}", player_id, season);
            return Ok(None);
        };

        let (seasons, game_log, percentiles) = join!(
            self.player_seasons(player_id),
            self.player_game_log(player_id, player.season),
            self.player_percentiles(player_id, player.season)
        );

        Ok(Some(PlayerPage {
            player,
            seasons,
            game_log,
            percentiles,
        }))
    }

    /// A team's season page, resolved from its slug.
    pub async fn team_page(&self, slug: &str, season: Option<Season>) -> Result<Option<TeamPage>, AggregatorError> {
        let (team, season) = join!(self.team_by_slug(slug), self.resolve_season(season));
        let Some(team) = team? else {
            debug!("No team with slug '{}'", slug);
            return Ok(None);
        };
        let school = team.team.school.clone();

        let epa_query = Query::table(tables::TEAM_EPA)
            .eq("season", season)
            .eq("team", school.as_str());
        let style_query = Query::table(tables::TEAM_STYLE)
            .eq("season", season)
            .eq("team", school.as_str());

        let (epa, style, schedule, trajectory) = join!(
            self.fetch_list::<TeamSeasonEpa>("Team EPA", epa_query),
            self.fetch_list::<TeamStyleProfile>("Team style", style_query),
            self.team_schedule(&school, season),
            self.team_trajectory(&school)
        );

        Ok(Some(TeamPage {
            team,
            season,
            epa: first(epa),
            style: first(style),
            schedule,
            trajectory,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures;
    use super::*;
    use crate::cancel::CancelContext;
    use crate::error::StoreError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_dashboard_defaults_to_latest_season() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.dashboard_page(None).await;
        assert_eq!(page.season, 2025);
        assert_eq!(page.standings.len(), 4);
        assert_eq!(page.recent_games.len(), 5);
        assert!(page.stat_leaders.is_ok());
    }

    #[tokio::test]
    async fn test_dashboard_region_failure_is_isolated() {
        let store = fixtures::store();
        store.fail_table(tables::STANDINGS, StoreError::Unavailable("down".into()));
        let agg = fixtures::aggregator(store);

        let page = agg.dashboard_page(Some(2025)).await;
        assert!(page.standings.is_failed());
        assert!(page.recent_games.is_ok());
        assert!(page.stat_leaders.is_ok());
    }

    #[tokio::test]
    async fn test_analytics_join() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.analytics_page(2025).await;
        let rows = page.joined();
        assert_eq!(rows.len(), 3);

        let aggies = rows.iter().find(|r| r.slug == "texas-am").unwrap();
        assert_eq!(aggies.conference.as_deref(), Some("SEC"));
        assert!(aggies.epa.is_some());
        assert!(aggies.style.is_none());
    }

    #[tokio::test]
    async fn test_analytics_join_without_teams() {
        let store = fixtures::store();
        store.fail_table(tables::TEAMS, StoreError::Unavailable("down".into()));
        let agg = fixtures::aggregator(store);

        let page = agg.analytics_page(2025).await;
        assert!(page.teams.is_failed());
        let rows = page.joined();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.conference.is_none() && r.epa.is_some()));
    }

    #[tokio::test]
    async fn test_rankings_page_defaults() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.rankings_page(2025, None, None).await;
        assert_eq!(page.poll.as_deref(), Some("AP Top 25"));
        assert_eq!(page.week, Some(5));
        assert_eq!(page.weeks, Fetch::Ok(vec![4, 5]));
        assert_eq!(page.rankings.len(), 4);

        let texas = page.trajectories.iter().find(|t| t.school == "Texas").unwrap();
        assert_eq!(texas.weeks, vec![(4, Some(1)), (5, None)]);
    }

    #[tokio::test]
    async fn test_rankings_page_explicit_week_and_poll() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.rankings_page(2025, Some("AP Top 25"), Some(4)).await;
        let schools: Vec<_> = page
            .rankings
            .into_inner_or_default()
            .into_iter()
            .map(|e| e.school)
            .collect();
        assert_eq!(schools, vec!["Texas", "Georgia"]);
    }

    #[tokio::test]
    async fn test_rankings_page_without_polls() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.rankings_page(2010, None, None).await;
        assert_eq!(page.polls, Fetch::Empty);
        assert_eq!(page.poll, None);
        assert_eq!(page.rankings, Fetch::Empty);
    }

    #[tokio::test]
    async fn test_games_page_uses_default_week() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.games_page(2025, "regular", None).await.unwrap();
        assert_eq!(page.filter.week, Some(2));
        assert_eq!(page.weeks, Fetch::Ok(vec![1, 2, 3]));
        let ids: Vec<_> = page.games.into_inner_or_default().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![21, 22]);

        let bowls = agg.games_page(2024, "postseason", None).await.unwrap();
        assert_eq!(bowls.filter.week, None);
        assert_eq!(bowls.games.len(), 1);

        assert!(matches!(
            agg.games_page(2025, "preseason", None).await,
            Err(AggregatorError::InvalidPhase(_))
        ));
    }

    #[tokio::test]
    async fn test_player_page() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.player_page(2, None).await.unwrap().unwrap();
        assert_eq!(page.player.season, 2025);
        assert!(page.has_multiple_seasons());
        assert_eq!(page.game_log.len(), 2);
        assert_eq!(page.percentiles.len(), 2);

        assert_eq!(agg.player_page(404, None).await, Ok(None));
    }

    #[tokio::test]
    async fn test_player_page_region_failure() {
        let store = fixtures::store();
        store.fail_table(tables::PLAYER_GAME_LOGS, StoreError::Unavailable("down".into()));
        let agg = fixtures::aggregator(store);

        let page = agg.player_page(2, Some(2024)).await.unwrap().unwrap();
        assert!(page.game_log.is_failed());
        assert!(page.seasons.is_ok());
    }

    #[tokio::test]
    async fn test_team_page() {
        let agg = fixtures::aggregator(fixtures::store());
        let page = agg.team_page("georgia", Some(2025)).await.unwrap().unwrap();
        assert_eq!(page.team.team.school, "Georgia");
        assert!(page.epa.is_ok());
        assert!(page.style.is_ok());
        assert_eq!(page.schedule.len(), 1);
        assert_eq!(page.trajectory.len(), 3);

        let aggies = agg.team_page("texas-am", Some(2025)).await.unwrap().unwrap();
        assert_eq!(aggies.style, Fetch::Empty);

        assert_eq!(agg.team_page("alabama", None).await, Ok(None));
    }

    #[tokio::test]
    async fn test_cancelled_request_releases_fetches() {
        let store = fixtures::store();
        store.set_delay(Some(Duration::from_secs(30)));
        let (handle, cancel) = CancelContext::pair();
        let agg = fixtures::aggregator(store).for_request(cancel);

        let task = tokio::spawn(async move {
            let dashboard = agg.dashboard_page(Some(2025)).await;
            let player = agg.player_page(2, None).await;
            (dashboard, player)
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let (dashboard, player) = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert!(dashboard.standings.is_failed());
        assert!(dashboard.recent_games.is_failed());
        assert_eq!(
            player,
            Err(AggregatorError::DataUnavailable(StoreError::Cancelled))
        );
    }

    #[tokio::test]
    async fn test_dropped_handle_cancels() {
        let (handle, cancel) = CancelContext::pair();
        drop(handle);
        let agg = fixtures::aggregator(fixtures::store()).for_request(cancel);
        assert!(agg.analytics_page(2025).await.epa.is_failed());
    }

    #[tokio::test]
    async fn test_bundled_sample_fixture() {
        let path = std::path::Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample.json"));
        let store = crate::store::MemoryStore::load(path).unwrap();
        let agg = fixtures::aggregator(std::sync::Arc::new(store));

        let dashboard = agg.dashboard_page(None).await;
        assert_eq!(dashboard.season, 2025);
        assert_eq!(dashboard.recent_games.len(), 4);

        let games = agg.games_page(2025, "regular", None).await.unwrap();
        assert_eq!(games.filter.week, Some(2));
        assert_eq!(games.games.len(), 2);

        let rankings = agg.rankings_page(2025, None, None).await;
        assert_eq!(rankings.poll.as_deref(), Some("AP Top 25"));
        assert_eq!(rankings.week, Some(2));

        let team = agg.team_page("texas-am", None).await.unwrap().unwrap();
        assert_eq!(team.team.team.school, "Texas A&M");
    }
}
