//! Data models for the aggregation layer.
//!
//! Row types mirror the store's tables and views and are deserialized
//! straight from JSON rows. View models built on top of them are what the
//! aggregator hands to callers.

use crate::error::AggregatorError;
use crate::slug::team_name_to_slug;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A season year, e.g. `2025`.
pub type Season = i32;

/// Season phase used to group games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Regular,
    Postseason,
}

impl Phase {
    /// Value stored in the `season_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Regular => "regular",
            Phase::Postseason => "postseason",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "regular" => Ok(Phase::Regular),
            "postseason" => Ok(Phase::Postseason),
            other => Err(AggregatorError::InvalidPhase(other.to_string())),
        }
    }
}

/// Player leaderboard category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderCategory {
    Passing,
    Rushing,
    Receiving,
    Tackles,
    Sacks,
    Interceptions,
}

impl LeaderCategory {
    pub const ALL: [LeaderCategory; 6] = [
        LeaderCategory::Passing,
        LeaderCategory::Rushing,
        LeaderCategory::Receiving,
        LeaderCategory::Tackles,
        LeaderCategory::Sacks,
        LeaderCategory::Interceptions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderCategory::Passing => "passing",
            LeaderCategory::Rushing => "rushing",
            LeaderCategory::Receiving => "receiving",
            LeaderCategory::Tackles => "tackles",
            LeaderCategory::Sacks => "sacks",
            LeaderCategory::Interceptions => "interceptions",
        }
    }
}

impl fmt::Display for LeaderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeaderCategory {
    type Err = AggregatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        LeaderCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| AggregatorError::InvalidCategory(s.to_string()))
    }
}

/// Team identity row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub school: String,
    #[serde(default)]
    pub mascot: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub alt_color: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub logo_dark: Option<String>,
}

impl Team {
    pub fn slug(&self) -> String {
        team_name_to_slug(&self.school)
    }
}

/// Team plus its derived slug.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamView {
    pub slug: String,
    #[serde(flatten)]
    pub team: Team,
}

impl From<Team> for TeamView {
    fn from(team: Team) -> Self {
        Self {
            slug: team.slug(),
            team,
        }
    }
}

/// Per-team efficiency for one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSeasonEpa {
    pub season: Season,
    pub team: String,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub games: Option<u32>,
    #[serde(default)]
    pub plays: Option<u32>,
    #[serde(default)]
    pub off_epa_per_play: Option<f64>,
    #[serde(default)]
    pub def_epa_per_play: Option<f64>,
    #[serde(default)]
    pub epa_margin: Option<f64>,
    #[serde(default)]
    pub off_success_rate: Option<f64>,
    #[serde(default)]
    pub def_success_rate: Option<f64>,
    #[serde(default)]
    pub off_explosiveness: Option<f64>,
    #[serde(default)]
    pub def_explosiveness: Option<f64>,
    #[serde(default)]
    pub off_epa_rank: Option<u32>,
    #[serde(default)]
    pub def_epa_rank: Option<u32>,
}

/// Play-calling tendencies for one team and season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamStyleProfile {
    pub season: Season,
    pub team: String,
    #[serde(default)]
    pub run_rate: Option<f64>,
    #[serde(default)]
    pub pass_rate: Option<f64>,
    #[serde(default)]
    pub plays_per_game: Option<f64>,
    #[serde(default)]
    pub early_down_pass_rate: Option<f64>,
    #[serde(default)]
    pub third_down_conversion_rate: Option<f64>,
    /// Short label such as "pass-heavy" or "balanced".
    #[serde(default)]
    pub identity: Option<String>,
}

/// One season of a team's multi-season trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTrajectoryPoint {
    pub season: Season,
    pub team: String,
    #[serde(default)]
    pub wins: Option<u32>,
    #[serde(default)]
    pub losses: Option<u32>,
    #[serde(default)]
    pub off_epa_rank: Option<u32>,
    #[serde(default)]
    pub def_epa_rank: Option<u32>,
    #[serde(default)]
    pub composite_rank: Option<u32>,
    #[serde(default)]
    pub composite_score: Option<f64>,
}

/// A team's standing in a season, ordered by composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub season: Season,
    pub team: String,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub wins: u32,
    #[serde(default)]
    pub losses: u32,
    #[serde(default)]
    pub conference_wins: Option<u32>,
    #[serde(default)]
    pub conference_losses: Option<u32>,
    #[serde(default)]
    pub composite_score: Option<f64>,
}

/// A scheduled or completed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub season: Season,
    pub week: u32,
    pub season_type: Phase,
    pub start_date: DateTime<Utc>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub home_points: Option<u32>,
    #[serde(default)]
    pub away_points: Option<u32>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub conference_game: bool,
    #[serde(default)]
    pub neutral_site: bool,
}

impl Game {
    /// Winning team, if the game is complete and not tied.
    pub fn winner(&self) -> Option<&str> {
        if !self.completed {
            return None;
        }
        match (self.home_points, self.away_points) {
            (Some(h), Some(a)) if h > a => Some(&self.home_team),
            (Some(h), Some(a)) if a > h => Some(&self.away_team),
            _ => None,
        }
    }

    /// Absolute point margin of a completed game.
    pub fn margin(&self) -> Option<u32> {
        if !self.completed {
            return None;
        }
        match (self.home_points, self.away_points) {
            (Some(h), Some(a)) => Some(h.abs_diff(a)),
            _ => None,
        }
    }
}

/// One team's entry in one poll for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub season: Season,
    pub week: u32,
    pub poll: String,
    pub school: String,
    #[serde(default)]
    pub conference: Option<String>,
    /// `None` for teams only receiving votes.
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub first_place_votes: Option<u32>,
}

/// A team's rank in every week a poll published. Weeks where the team was
/// out of the poll hold `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingTrajectory {
    pub school: String,
    pub weeks: Vec<(u32, Option<u32>)>,
}

/// One row of a player leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerLeader {
    /// Position after filtering and sorting, starting at 1.
    #[serde(default)]
    pub rank: u32,
    pub season: Season,
    pub category: LeaderCategory,
    pub player_id: i64,
    pub player_name: String,
    pub team: String,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    pub stat_value: f64,
}

/// A player's profile for one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeason {
    pub player_id: i64,
    pub season: Season,
    pub name: String,
    pub team: String,
    #[serde(default)]
    pub conference: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub jersey: Option<u32>,
    #[serde(default)]
    pub class_year: Option<String>,
    #[serde(default)]
    pub games: Option<u32>,
    #[serde(default)]
    pub passing_yards: Option<f64>,
    #[serde(default)]
    pub passing_tds: Option<f64>,
    #[serde(default)]
    pub rushing_yards: Option<f64>,
    #[serde(default)]
    pub rushing_tds: Option<f64>,
    #[serde(default)]
    pub receptions: Option<f64>,
    #[serde(default)]
    pub receiving_yards: Option<f64>,
    #[serde(default)]
    pub receiving_tds: Option<f64>,
    #[serde(default)]
    pub tackles: Option<f64>,
    #[serde(default)]
    pub sacks: Option<f64>,
    #[serde(default)]
    pub interceptions: Option<f64>,
    #[serde(default)]
    pub epa_per_play: Option<f64>,
}

/// One game of a player's season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameLogEntry {
    pub player_id: i64,
    pub season: Season,
    pub week: u32,
    pub game_id: i64,
    pub opponent: String,
    #[serde(default)]
    pub home: bool,
    /// "W 31-24" style result string.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub passing_yards: Option<f64>,
    #[serde(default)]
    pub rushing_yards: Option<f64>,
    #[serde(default)]
    pub receiving_yards: Option<f64>,
    #[serde(default)]
    pub tackles: Option<f64>,
    #[serde(default)]
    pub epa: Option<f64>,
}

/// Percentile standing within a position group for one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPercentile {
    pub player_id: i64,
    pub season: Season,
    pub position_group: String,
    pub metric: String,
    #[serde(default)]
    pub value: Option<f64>,
    /// 0-100.
    pub percentile: f64,
}

/// Search index row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSearchResult {
    pub player_id: i64,
    pub name: String,
    pub team: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub latest_season: Option<Season>,
}

/// Team metric used by the dashboard stat leader lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamStatCategory {
    OffensiveEpa,
    DefensiveEpa,
    SuccessRate,
    Explosiveness,
}

impl TeamStatCategory {
    pub const ALL: [TeamStatCategory; 4] = [
        TeamStatCategory::OffensiveEpa,
        TeamStatCategory::DefensiveEpa,
        TeamStatCategory::SuccessRate,
        TeamStatCategory::Explosiveness,
    ];

    /// Extract the metric value from a team's season row.
    pub fn value(&self, row: &TeamSeasonEpa) -> Option<f64> {
        match self {
            TeamStatCategory::OffensiveEpa => row.off_epa_per_play,
            TeamStatCategory::DefensiveEpa => row.def_epa_per_play,
            TeamStatCategory::SuccessRate => row.off_success_rate,
            TeamStatCategory::Explosiveness => row.off_explosiveness,
        }
    }

    /// Defensive EPA is better when lower.
    pub fn lower_is_better(&self) -> bool {
        matches!(self, TeamStatCategory::DefensiveEpa)
    }
}

impl fmt::Display for TeamStatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamStatCategory::OffensiveEpa => write!(f, "Offensive EPA/play"),
            TeamStatCategory::DefensiveEpa => write!(f, "Defensive EPA/play"),
            TeamStatCategory::SuccessRate => write!(f, "Success Rate"),
            TeamStatCategory::Explosiveness => write!(f, "Explosiveness"),
        }
    }
}

/// One entry of a stat leader list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLeader {
    pub team: String,
    pub value: f64,
}

/// Top-N lists for each team stat category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatLeaders {
    pub season: Season,
    pub categories: Vec<(TeamStatCategory, Vec<StatLeader>)>,
}

impl StatLeaders {
    pub fn get(&self, category: TeamStatCategory) -> Option<&[StatLeader]> {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, leaders)| leaders.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn game(home: Option<u32>, away: Option<u32>, completed: bool) -> Game {
        Game {
            id: 1,
            season: 2025,
            week: 1,
            season_type: Phase::Regular,
            start_date: Utc.with_ymd_and_hms(2025, 8, 30, 19, 0, 0).unwrap(),
            home_team: "Georgia".to_string(),
            away_team: "Clemson".to_string(),
            home_points: home,
            away_points: away,
            completed,
            conference_game: false,
            neutral_site: true,
        }
    }

    #[test]
    fn test_phase_from_str() {
        assert_eq!("regular".parse::<Phase>().unwrap(), Phase::Regular);
        assert_eq!("Postseason".parse::<Phase>().unwrap(), Phase::Postseason);
        assert!(matches!(
            "preseason".parse::<Phase>(),
            Err(AggregatorError::InvalidPhase(_))
        ));
    }

    #[test]
    fn test_leader_category_from_str() {
        assert_eq!(
            "Rushing".parse::<LeaderCategory>().unwrap(),
            LeaderCategory::Rushing
        );
        assert_eq!(
            "invalid-category".parse::<LeaderCategory>(),
            Err(AggregatorError::InvalidCategory("invalid-category".to_string()))
        );
    }

    #[test]
    fn test_game_winner_and_margin() {
        let g = game(Some(28), Some(10), true);
        assert_eq!(g.winner(), Some("Georgia"));
        assert_eq!(g.margin(), Some(18));

        let g = game(Some(7), Some(21), true);
        assert_eq!(g.winner(), Some("Clemson"));

        let tie = game(Some(14), Some(14), true);
        assert_eq!(tie.winner(), None);
        assert_eq!(tie.margin(), Some(0));

        let scheduled = game(None, None, false);
        assert_eq!(scheduled.winner(), None);
        assert_eq!(scheduled.margin(), None);
    }

    #[test]
    fn test_game_deserializes_from_row() {
        let row = serde_json::json!({
            "id": 401,
            "season": 2025,
            "week": 3,
            "season_type": "regular",
            "start_date": "2025-09-13T16:00:00Z",
            "home_team": "Ohio State",
            "away_team": "Ohio",
            "home_points": null,
            "away_points": null,
            "completed": false
        });
        let g: Game = serde_json::from_value(row).unwrap();
        assert_eq!(g.week, 3);
        assert!(!g.conference_game);
        assert_eq!(g.away_team, "Ohio");
    }

    #[test]
    fn test_team_view_carries_slug() {
        let team: Team = serde_json::from_value(serde_json::json!({
            "school": "Texas A&M",
            "mascot": "Aggies"
        }))
        .unwrap();
        let view = TeamView::from(team);
        assert_eq!(view.slug, "texas-am");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["school"], "Texas A&M");
        assert_eq!(json["slug"], "texas-am");
    }
}
