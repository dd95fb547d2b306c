//! Team identity, season metrics and standings.

use super::sorting::{sort_standings, top_n_by};
use super::{tables, Aggregator};
use crate::error::AggregatorError;
use crate::fetch::Fetch;
use crate::models::{
    Season, Standing, StatLeaders, Team, TeamSeasonEpa, TeamStatCategory, TeamStyleProfile,
    TeamTrajectoryPoint, TeamView,
};
use crate::query::Query;
use crate::slug;
use std::collections::BTreeMap;
use tracing::warn;

impl Aggregator {
    /// All teams ordered by school, each with its slug.
    pub async fn teams(&self) -> Fetch<Vec<TeamView>> {
        let query = Query::table(tables::TEAMS).asc("school");
        self.fetch_list::<Team>("Teams", query)
            .await
            .map(|mut teams| {
                teams.sort_by(|a, b| a.school.cmp(&b.school));
                teams.into_iter().map(TeamView::from).collect()
            })
    }

    /// Resolve a URL slug to a team. `Ok(None)` when no team has this slug.
    ///
    /// Slugs are derived, not stored, so every team is read and matched.
    /// When several schools share the slug the alphabetically first one wins
    /// and the collision is logged.
    pub async fn team_by_slug(&self, slug: &str) -> Result<Option<TeamView>, AggregatorError> {
        let query = Query::table(tables::TEAMS).asc("school");
        let mut matches: Vec<Team> = self
            .fetch::<Team>(query)
            .await?
            .into_iter()
            .filter(|t| t.slug() == slug)
            .collect();
        matches.sort_by(|a, b| a.school.cmp(&b.school));

        if matches.len() > 1 {
            let schools: Vec<&str> = matches.iter().map(|t| t.school.as_str()).collect();
            warn!("Slug '{}' is shared by {:?}, using '{}'", slug, schools, schools[0]);
        }

        Ok(matches.into_iter().next().map(TeamView::from))
    }

    /// Groups of team names that derive the same slug.
    pub async fn slug_collisions(&self) -> Fetch<BTreeMap<String, Vec<String>>> {
        match self.teams().await {
            Fetch::Ok(teams) => {
                let collisions = slug::slug_collisions(teams.iter().map(|t| t.team.school.as_str()));
                if collisions.is_empty() {
                    Fetch::Empty
                } else {
                    Fetch::Ok(collisions)
                }
            }
            Fetch::Empty => Fetch::Empty,
            Fetch::Failed(reason) => Fetch::Failed(reason),
        }
    }

    /// Efficiency rows for every team in `season`, ordered by team.
    pub async fn team_epa(&self, season: Season) -> Fetch<Vec<TeamSeasonEpa>> {
        let query = Query::table(tables::TEAM_EPA).eq("season", season).asc("team");
        self.fetch_list("Team EPA", query).await
    }

    /// Style profiles for every team in `season`, ordered by team.
    pub async fn team_styles(&self, season: Season) -> Fetch<Vec<TeamStyleProfile>> {
        let query = Query::table(tables::TEAM_STYLE).eq("season", season).asc("team");
        self.fetch_list("Team styles", query).await
    }

    /// One team's rows across seasons, oldest first.
    pub async fn team_trajectory(&self, team: &str) -> Fetch<Vec<TeamTrajectoryPoint>> {
        let query = Query::table(tables::TEAM_TRAJECTORY).eq("team", team).asc("season");
        self.fetch_list::<TeamTrajectoryPoint>("Team trajectory", query)
            .await
            .map(|mut points| {
                points.sort_by_key(|p| p.season);
                points
            })
    }

    /// Top `limit` teams by composite score.
    pub async fn standings(&self, season: Season, limit: usize) -> Fetch<Vec<Standing>> {
        let query = Query::table(tables::STANDINGS)
            .eq("season", season)
            .desc("composite_score")
            .asc("team")
            .limit(limit);

        self.fetch_list::<Standing>("Standings", query)
            .await
            .map(|mut rows| {
                sort_standings(&mut rows);
                rows
            })
    }

    /// Top teams in each [`TeamStatCategory`] for `season`.
    pub async fn stat_leaders(&self, season: Season) -> Fetch<StatLeaders> {
        let n = self.settings.leaders_limit;
        self.team_epa(season).await.map(|rows| StatLeaders {
            season,
            categories: TeamStatCategory::ALL
                .into_iter()
                .map(|category| {
                    let leaders = top_n_by(
                        &rows,
                        n,
                        category.lower_is_better(),
                        |r| category.value(r),
                        |r| r.team.as_str(),
                    );
                    (category, leaders)
                })
                .collect(),
        })
    }
}
