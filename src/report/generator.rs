//! Markdown and JSON rendering.
//!
//! Every page region is rendered on its own: a region that loaded becomes a
//! table, an empty one a placeholder, and a failed one a notice with the
//! failure reason so the rest of the page still reads normally.

use crate::aggregator::{AnalyticsPage, DashboardPage, GamesPage, PlayerPage, RankingsPage, TeamAnalytics, TeamPage};
use crate::fetch::Fetch;
use crate::models::{
    Game, PlayerGameLogEntry, PlayerLeader, PlayerPercentile, PlayerSearchResult, PlayerSeason,
    RankingEntry, Standing, StatLeaders, TeamSeasonEpa, TeamStyleProfile, TeamTrajectoryPoint,
    TeamView,
};
use crate::scouting::{PendingLink, ScoutingProfile, ScoutingReport};
use serde::Serialize;
use std::fmt::Display;

/// A view that renders as one or more Markdown sections.
pub trait MarkdownSection {
    fn to_markdown(&self) -> String;
}

/// A row type that renders as a Markdown table row.
pub trait TableRow {
    fn headers() -> &'static [&'static str];
    fn cells(&self) -> Vec<String>;
}

/// Pretty-printed JSON for any view model.
pub fn generate_json<T: Serialize + ?Sized>(view: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(view)
}

/// A complete Markdown document with a title and footer.
pub fn generate_markdown<T: MarkdownSection + ?Sized>(title: &str, view: &T) -> String {
    let mut output = format!("# {}\n\n", title);
    output.push_str(&view.to_markdown());
    output.push_str(&generate_footer());
    output
}

/// A titled bullet list of filter values such as seasons, weeks or polls.
pub fn generate_markdown_list<T: Display>(title: &str, values: &Fetch<Vec<T>>) -> String {
    let mut output = format!("# {}\n\n", title);
    output.push_str(&region_body(values, |items| {
        let mut list = String::new();
        for item in items {
            list.push_str(&format!("- {}\n", item));
        }
        list.push('\n');
        list
    }));
    output.push_str(&generate_footer());
    output
}

fn generate_footer() -> String {
    format!("---\n\n*Generated by cfb-aggregator v{}*\n", env!("CARGO_PKG_VERSION"))
}

fn region<T>(title: &str, fetch: &Fetch<T>, body: impl FnOnce(&T) -> String) -> String {
    let mut section = format!("## {}\n\n", title);
    section.push_str(&region_body(fetch, body));
    section
}

fn region_body<T>(fetch: &Fetch<T>, body: impl FnOnce(&T) -> String) -> String {
    match fetch {
        Fetch::Ok(value) => body(value),
        Fetch::Empty => "_No data._\n\n".to_string(),
        Fetch::Failed(reason) => format!("> **Unavailable:** {}. Retry the request to reload this section.\n\n", reason),
    }
}

fn table<T: TableRow>(rows: &[T]) -> String {
    let headers = T::headers();
    let mut output = format!("| {} |\n", headers.join(" | "));
    output.push_str(&format!("|{}\n", ":---|".repeat(headers.len())));

    for row in rows {
        let cells: Vec<String> = row.cells().iter().map(|c| c.replace('|', "\\|")).collect();
        output.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    output.push('\n');
    output
}

fn opt<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

fn metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))
}

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}%", v * 100.0))
}

impl<T: TableRow> MarkdownSection for Fetch<Vec<T>> {
    fn to_markdown(&self) -> String {
        region_body(self, |rows| table(rows))
    }
}

impl TableRow for Game {
    fn headers() -> &'static [&'static str] {
        &["Week", "Date", "Away", "Home", "Score", "Status"]
    }

    fn cells(&self) -> Vec<String> {
        let score = match (self.away_points, self.home_points) {
            (Some(a), Some(h)) => format!("{}-{}", a, h),
            _ => "-".to_string(),
        };
        let status = if self.completed {
            match self.winner() {
                Some(winner) => format!("Final, {} by {}", winner, opt(self.margin())),
                None => "Final, tie".to_string(),
            }
        } else {
            "Scheduled".to_string()
        };
        let home = if self.neutral_site {
            format!("{} (neutral)", self.home_team)
        } else {
            self.home_team.clone()
        };
        vec![
            self.week.to_string(),
            self.start_date.format("%Y-%m-%d %H:%M").to_string(),
            self.away_team.clone(),
            home,
            score,
            status,
        ]
    }
}

impl TableRow for RankingEntry {
    fn headers() -> &'static [&'static str] {
        &["Rank", "School", "Conference", "Points", "First-place votes"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.rank.map_or_else(|| "RV".to_string(), |r| r.to_string()),
            self.school.clone(),
            opt_str(&self.conference),
            self.points.to_string(),
            opt(self.first_place_votes),
        ]
    }
}

impl TableRow for Standing {
    fn headers() -> &'static [&'static str] {
        &["Team", "Conference", "Record", "Conference record", "Composite"]
    }

    fn cells(&self) -> Vec<String> {
        let conf_record = match (self.conference_wins, self.conference_losses) {
            (Some(w), Some(l)) => format!("{}-{}", w, l),
            _ => "-".to_string(),
        };
        vec![
            self.team.clone(),
            opt_str(&self.conference),
            format!("{}-{}", self.wins, self.losses),
            conf_record,
            self.composite_score.map_or_else(|| "-".to_string(), |s| format!("{:.1}", s)),
        ]
    }
}

impl TableRow for PlayerLeader {
    fn headers() -> &'static [&'static str] {
        &["Rank", "Player", "Team", "Conference", "Position", "Value"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            format!("{} (#{})", self.player_name, self.player_id),
            self.team.clone(),
            opt_str(&self.conference),
            opt_str(&self.position),
            format!("{}", self.stat_value),
        ]
    }
}

impl TableRow for PlayerSeason {
    fn headers() -> &'static [&'static str] {
        &["Season", "Team", "Games", "Pass yds", "Rush yds", "Rec yds", "Tackles", "EPA/play"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.season.to_string(),
            self.team.clone(),
            opt(self.games),
            opt(self.passing_yards),
            opt(self.rushing_yards),
            opt(self.receiving_yards),
            opt(self.tackles),
            metric(self.epa_per_play),
        ]
    }
}

impl TableRow for PlayerGameLogEntry {
    fn headers() -> &'static [&'static str] {
        &["Week", "Opponent", "Result", "Pass yds", "Rush yds", "Rec yds", "Tackles", "EPA"]
    }

    fn cells(&self) -> Vec<String> {
        let opponent = if self.home {
            format!("vs {}", self.opponent)
        } else {
            format!("@ {}", self.opponent)
        };
        vec![
            self.week.to_string(),
            opponent,
            opt_str(&self.result),
            opt(self.passing_yards),
            opt(self.rushing_yards),
            opt(self.receiving_yards),
            opt(self.tackles),
            metric(self.epa),
        ]
    }
}

impl TableRow for PlayerPercentile {
    fn headers() -> &'static [&'static str] {
        &["Metric", "Group", "Value", "Percentile"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.metric.clone(),
            self.position_group.clone(),
            opt(self.value),
            format!("{:.0}", self.percentile),
        ]
    }
}

impl TableRow for PlayerSearchResult {
    fn headers() -> &'static [&'static str] {
        &["ID", "Name", "Team", "Position", "Latest season"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.player_id.to_string(),
            self.name.clone(),
            self.team.clone(),
            opt_str(&self.position),
            opt(self.latest_season),
        ]
    }
}

impl TableRow for TeamView {
    fn headers() -> &'static [&'static str] {
        &["School", "Slug", "Mascot", "Conference"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.team.school.clone(),
            self.slug.clone(),
            opt_str(&self.team.mascot),
            opt_str(&self.team.conference),
        ]
    }
}

impl TableRow for TeamTrajectoryPoint {
    fn headers() -> &'static [&'static str] {
        &["Season", "Record", "Off EPA rank", "Def EPA rank", "Composite rank"]
    }

    fn cells(&self) -> Vec<String> {
        let record = match (self.wins, self.losses) {
            (Some(w), Some(l)) => format!("{}-{}", w, l),
            _ => "-".to_string(),
        };
        vec![
            self.season.to_string(),
            record,
            opt(self.off_epa_rank),
            opt(self.def_epa_rank),
            opt(self.composite_rank),
        ]
    }
}

impl TableRow for TeamAnalytics {
    fn headers() -> &'static [&'static str] {
        &["Team", "Conference", "Off EPA", "Def EPA", "Success", "Explosiveness", "Run rate", "Identity"]
    }

    fn cells(&self) -> Vec<String> {
        let epa = self.epa.as_ref();
        let style = self.style.as_ref();
        vec![
            self.school.clone(),
            opt_str(&self.conference),
            metric(epa.and_then(|e| e.off_epa_per_play)),
            metric(epa.and_then(|e| e.def_epa_per_play)),
            pct(epa.and_then(|e| e.off_success_rate)),
            metric(epa.and_then(|e| e.off_explosiveness)),
            pct(style.and_then(|s| s.run_rate)),
            style.and_then(|s| s.identity.clone()).unwrap_or_else(|| "-".to_string()),
        ]
    }
}

impl TableRow for PendingLink {
    fn headers() -> &'static [&'static str] {
        &["ID", "Player", "Candidate", "Candidate team", "Confidence", "Status"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            format!("{} (#{})", self.player_name, self.player_id),
            self.candidate_name.clone(),
            opt_str(&self.candidate_team),
            pct(self.confidence),
            self.status.to_string(),
        ]
    }
}

fn stat_leaders_body(leaders: &StatLeaders) -> String {
    let mut output = String::new();
    for (category, entries) in &leaders.categories {
        output.push_str(&format!("### {}\n\n", category));
        if entries.is_empty() {
            output.push_str("_No data._\n\n");
            continue;
        }
        for (i, entry) in entries.iter().enumerate() {
            output.push_str(&format!("{}. {} ({:.3})\n", i + 1, entry.team, entry.value));
        }
        output.push('\n');
    }
    output
}

impl MarkdownSection for DashboardPage {
    fn to_markdown(&self) -> String {
        let mut output = format!("**Season:** {}\n\n", self.season);
        output.push_str(&region("Standings", &self.standings, |rows| table(rows)));
        output.push_str(&region("Recent Games", &self.recent_games, |rows| table(rows)));
        output.push_str(&region("Stat Leaders", &self.stat_leaders, stat_leaders_body));
        output
    }
}

impl MarkdownSection for AnalyticsPage {
    fn to_markdown(&self) -> String {
        let mut output = format!("**Season:** {}\n\n", self.season);
        if let Fetch::Failed(reason) = &self.teams {
            output.push_str(&format!("> **Teams unavailable:** {}\n\n", reason));
        }
        if let Fetch::Failed(reason) = &self.epa {
            output.push_str(&format!("> **Efficiency unavailable:** {}\n\n", reason));
        }
        if let Fetch::Failed(reason) = &self.styles {
            output.push_str(&format!("> **Styles unavailable:** {}\n\n", reason));
        }

        let rows = self.joined();
        output.push_str("## Team Analytics\n\n");
        if rows.is_empty() {
            output.push_str("_No data._\n\n");
        } else {
            output.push_str(&table(&rows));
        }
        output
    }
}

impl MarkdownSection for RankingsPage {
    fn to_markdown(&self) -> String {
        let mut output = format!("**Season:** {}\n\n", self.season);
        output.push_str(&format!(
            "**Poll:** {} | **Week:** {}\n\n",
            opt_str(&self.poll),
            opt(self.week)
        ));
        if let Fetch::Ok(polls) = &self.polls {
            output.push_str(&format!("*Available polls: {}*\n\n", polls.join(", ")));
        }
        if let Fetch::Ok(weeks) = &self.weeks {
            let weeks: Vec<String> = weeks.iter().map(|w| w.to_string()).collect();
            output.push_str(&format!("*Published weeks: {}*\n\n", weeks.join(", ")));
        }
        output.push_str(&region("Rankings", &self.rankings, |rows| table(rows)));

        if !self.trajectories.is_empty() {
            output.push_str("## Season Trajectory\n\n");
            for trajectory in &self.trajectories {
                let path: Vec<String> = trajectory
                    .weeks
                    .iter()
                    .map(|(week, rank)| format!("W{}: {}", week, rank.map_or_else(|| "-".to_string(), |r| r.to_string())))
                    .collect();
                output.push_str(&format!("- **{}**: {}\n", trajectory.school, path.join(", ")));
            }
            output.push('\n');
        }
        output
    }
}

impl MarkdownSection for GamesPage {
    fn to_markdown(&self) -> String {
        let mut output = format!(
            "**Season:** {} | **Phase:** {} | **Week:** {}\n\n",
            self.filter.season,
            self.filter.phase,
            self.filter.week.map_or_else(|| "all".to_string(), |w| w.to_string())
        );
        if let Fetch::Ok(weeks) = &self.weeks {
            let weeks: Vec<String> = weeks.iter().map(|w| w.to_string()).collect();
            output.push_str(&format!("*Weeks: {}*\n\n", weeks.join(", ")));
        }
        output.push_str(&region("Games", &self.games, |rows| table(rows)));
        output
    }
}

impl MarkdownSection for PlayerPage {
    fn to_markdown(&self) -> String {
        let p = &self.player;
        let mut output = format!("## {} (#{})\n\n", p.name, p.player_id);
        output.push_str(&format!("- **Team:** {}\n", p.team));
        output.push_str(&format!("- **Season:** {}\n", p.season));
        output.push_str(&format!("- **Position:** {}\n", opt_str(&p.position)));
        if let Some(ref class_year) = p.class_year {
            output.push_str(&format!("- **Class:** {}\n", class_year));
        }
        if let Some(jersey) = p.jersey {
            output.push_str(&format!("- **Jersey:** {}\n", jersey));
        }
        output.push('\n');

        output.push_str(&region("Seasons", &self.seasons, |rows| table(rows)));
        output.push_str(&region("Game Log", &self.game_log, |rows| table(rows)));
        output.push_str(&region("Percentiles", &self.percentiles, |rows| table(rows)));
        output
    }
}

fn epa_body(epa: &TeamSeasonEpa) -> String {
    let mut output = String::new();
    output.push_str(&format!("- **Offensive EPA/play:** {} (rank {})\n", metric(epa.off_epa_per_play), opt(epa.off_epa_rank)));
    output.push_str(&format!("- **Defensive EPA/play:** {} (rank {})\n", metric(epa.def_epa_per_play), opt(epa.def_epa_rank)));
    output.push_str(&format!("- **Success rate:** {}\n", pct(epa.off_success_rate)));
    output.push_str(&format!("- **Explosiveness:** {}\n\n", metric(epa.off_explosiveness)));
    output
}

fn style_body(style: &TeamStyleProfile) -> String {
    let mut output = String::new();
    output.push_str(&format!("- **Identity:** {}\n", opt_str(&style.identity)));
    output.push_str(&format!("- **Run rate:** {}\n", pct(style.run_rate)));
    output.push_str(&format!("- **Pass rate:** {}\n", pct(style.pass_rate)));
    output.push_str(&format!("- **Plays per game:** {}\n\n", opt(style.plays_per_game)));
    output
}

impl MarkdownSection for TeamPage {
    fn to_markdown(&self) -> String {
        let team = &self.team.team;
        let mut output = format!("## {}\n\n", team.school);
        if let Some(ref mascot) = team.mascot {
            output.push_str(&format!("- **Mascot:** {}\n", mascot));
        }
        output.push_str(&format!("- **Conference:** {}\n", opt_str(&team.conference)));
        output.push_str(&format!("- **Season:** {}\n\n", self.season));

        output.push_str(&region("Efficiency", &self.epa, epa_body));
        output.push_str(&region("Style", &self.style, style_body));
        output.push_str(&region("Schedule", &self.schedule, |rows| table(rows)));
        output.push_str(&region("Trajectory", &self.trajectory, |rows| table(rows)));
        output
    }
}

impl MarkdownSection for Fetch<StatLeaders> {
    fn to_markdown(&self) -> String {
        region_body(self, stat_leaders_body)
    }
}

impl MarkdownSection for ScoutingProfile {
    fn to_markdown(&self) -> String {
        let stars = self.stars.map_or_else(|| "-".to_string(), |s| "*".repeat(s as usize));
        let mut output = format!("## {} (#{})\n\n", self.name, self.player_id);
        output.push_str(&format!("- **Team:** {}\n", opt_str(&self.team)));
        output.push_str(&format!("- **Position:** {}\n", opt_str(&self.position)));
        output.push_str(&format!("- **Stars:** {}\n", stars));
        output.push_str(&format!("- **Rating:** {}\n", metric(self.rating)));
        output.push_str(&format!("- **National rank:** {}\n", opt(self.national_rank)));
        output.push_str(&format!("- **Hometown:** {}\n", opt_str(&self.hometown)));
        output.push_str(&format!("- **High school:** {}\n\n", opt_str(&self.high_school)));
        output
    }
}

impl MarkdownSection for ScoutingReport {
    fn to_markdown(&self) -> String {
        let mut output = String::from("## Scouting Report\n\n");
        if !self.summary.is_empty() {
            output.push_str(&format!("{}\n\n", self.summary));
        }
        for (heading, items) in [("Strengths", &self.strengths), ("Weaknesses", &self.weaknesses)] {
            if items.is_empty() {
                continue;
            }
            output.push_str(&format!("### {}\n\n", heading));
            for item in items {
                output.push_str(&format!("- {}\n", item));
            }
            output.push('\n');
        }
        if let Some(grade) = self.grade {
            output.push_str(&format!("**Grade:** {:.1}\n\n", grade));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::GameFilter;
    use crate::models::{LeaderCategory, Phase, StatLeader, Team, TeamStatCategory};
    use chrono::{TimeZone, Utc};

    fn game(id: i64, completed: bool) -> Game {
        Game {
            id,
            season: 2025,
            week: 2,
            season_type: Phase::Regular,
            start_date: Utc.with_ymd_and_hms(2025, 9, 6, 16, 0, 0).unwrap(),
            home_team: "Michigan".to_string(),
            away_team: "Oklahoma".to_string(),
            home_points: completed.then_some(13),
            away_points: completed.then_some(24),
            completed,
            conference_game: false,
            neutral_site: false,
        }
    }

    #[test]
    fn test_game_row() {
        let cells = game(21, true).cells();
        assert_eq!(cells[4], "24-13");
        assert_eq!(cells[5], "Final, Oklahoma by 11");

        let cells = game(31, false).cells();
        assert_eq!(cells[4], "-");
        assert_eq!(cells[5], "Scheduled");
    }

    #[test]
    fn test_table_escapes_pipes() {
        let view = TeamView::from(Team {
            school: "A|B".to_string(),
            mascot: None,
            abbreviation: None,
            conference: None,
            color: None,
            alt_color: None,
            logo: None,
            logo_dark: None,
        });
        let output = table(&[view]);
        assert!(output.starts_with("| School | Slug | Mascot | Conference |\n|:---|:---|:---|:---|\n"));
        assert!(output.contains("A\\|B"));
    }

    #[test]
    fn test_games_page_regions() {
        let page = GamesPage {
            filter: GameFilter::new(2025, Phase::Regular, Some(2)),
            weeks: Fetch::Ok(vec![1, 2, 3]),
            games: Fetch::Ok(vec![game(21, true)]),
        };
        let markdown = generate_markdown("Games", &page);
        assert!(markdown.starts_with("# Games\n\n"));
        assert!(markdown.contains("**Week:** 2"));
        assert!(markdown.contains("*Weeks: 1, 2, 3*"));
        assert!(markdown.contains("| 2 | 2025-09-06 16:00 | Oklahoma | Michigan |"));
        assert!(markdown.contains("Generated by cfb-aggregator"));
    }

    #[test]
    fn test_failed_region_does_not_hide_others() {
        let page = DashboardPage {
            season: 2025,
            standings: Fetch::Failed("store unavailable: timeout".to_string()),
            recent_games: Fetch::Ok(vec![game(21, true)]),
            stat_leaders: Fetch::Empty,
        };
        let markdown = page.to_markdown();
        assert!(markdown.contains("## Standings\n\n> **Unavailable:** store unavailable: timeout"));
        assert!(markdown.contains("## Recent Games\n\n| Week |"));
        assert!(markdown.contains("## Stat Leaders\n\n_No data._"));
    }

    #[test]
    fn test_stat_leaders_section() {
        let leaders = Fetch::Ok(StatLeaders {
            season: 2025,
            categories: vec![
                (
                    TeamStatCategory::DefensiveEpa,
                    vec![StatLeader {
                        team: "Ohio State".to_string(),
                        value: -0.12,
                    }],
                ),
                (TeamStatCategory::Explosiveness, Vec::new()),
            ],
        });
        let markdown = leaders.to_markdown();
        assert!(markdown.contains("### Defensive EPA/play\n\n1. Ohio State (-0.120)"));
        assert!(markdown.contains("### Explosiveness\n\n_No data._"));
    }

    #[test]
    fn test_ranking_row_marks_unranked() {
        let entry = RankingEntry {
            season: 2025,
            week: 5,
            poll: "AP Top 25".to_string(),
            school: "Navy".to_string(),
            conference: None,
            rank: None,
            points: 12,
            first_place_votes: None,
        };
        assert_eq!(entry.cells()[0], "RV");
    }

    #[test]
    fn test_markdown_list() {
        let markdown = generate_markdown_list("Seasons", &Fetch::Ok(vec![2025, 2024]));
        assert!(markdown.contains("- 2025\n- 2024\n"));

        let empty: Fetch<Vec<u32>> = Fetch::Empty;
        assert!(generate_markdown_list("Weeks", &empty).contains("_No data._"));
    }

    #[test]
    fn test_generate_json_tags_regions() {
        let leaders: Fetch<Vec<PlayerLeader>> = Fetch::Ok(vec![PlayerLeader {
            rank: 1,
            season: 2025,
            category: LeaderCategory::Passing,
            player_id: 2,
            player_name: "Arch Manning".to_string(),
            team: "Texas".to_string(),
            conference: Some("SEC".to_string()),
            position: Some("QB".to_string()),
            stat_value: 1612.0,
        }]);
        let json = generate_json(&leaders).unwrap();
        assert!(json.contains("\"status\": \"ok\""));
        assert!(json.contains("\"category\": \"passing\""));

        let failed: Fetch<Vec<PlayerLeader>> = Fetch::Failed("down".to_string());
        let json = generate_json(&failed).unwrap();
        assert!(json.contains("\"status\": \"failed\""));
    }
}
