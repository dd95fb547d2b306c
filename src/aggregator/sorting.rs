//! Ordering, ranking and default-selection rules.
//!
//! Store ordering is not trusted for ties, so every list the aggregator
//! returns goes through one of these functions to get a deterministic order.

use crate::models::{
    Game, PlayerLeader, PlayerSearchResult, RankingEntry, RankingTrajectory, Standing, StatLeader,
};
use std::cmp::{Ordering, Reverse};
use std::collections::BTreeSet;

/// Ranked entries by ascending rank, then unranked entries by descending
/// points. Ties break on school name.
pub fn sort_rankings(entries: &mut [RankingEntry]) {
    entries.sort_by(|a, b| {
        let by_rank = match (a.rank, b.rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => b.points.cmp(&a.points),
        };
        by_rank.then_with(|| a.school.cmp(&b.school))
    });
}

/// Week-by-week rankings: ascending week, then [`sort_rankings`] order.
pub fn sort_rankings_by_week(entries: &mut [RankingEntry]) {
    entries.sort_by_key(|e| e.week);
    let mut start = 0;
    while start < entries.len() {
        let week = entries[start].week;
        let end = start + entries[start..].iter().take_while(|e| e.week == week).count();
        sort_rankings(&mut entries[start..end]);
        start = end;
    }
}

/// A team's rank in every week the poll published, with `None` for weeks
/// it was unranked or absent.
pub fn ranking_trajectory(entries: &[RankingEntry], school: &str) -> RankingTrajectory {
    let weeks: BTreeSet<u32> = entries.iter().map(|e| e.week).collect();

    let weeks = weeks
        .into_iter()
        .map(|week| {
            let rank = entries
                .iter()
                .find(|e| e.week == week && e.school == school)
                .and_then(|e| e.rank);
            (week, rank)
        })
        .collect();

    RankingTrajectory {
        school: school.to_string(),
        weeks,
    }
}

/// Chronological by start date, then by id.
pub fn sort_games_chronological(games: &mut [Game]) {
    games.sort_by(|a, b| a.start_date.cmp(&b.start_date).then(a.id.cmp(&b.id)));
}

/// Most recent first, ties on higher id first.
pub fn sort_games_recent_first(games: &mut [Game]) {
    games.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
}

/// Composite score descending with missing scores last, tiebreak team.
pub fn sort_standings(standings: &mut [Standing]) {
    standings.sort_by(|a, b| {
        cmp_desc_nulls_last(a.composite_score, b.composite_score).then_with(|| a.team.cmp(&b.team))
    });
}

fn cmp_desc_nulls_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stat value descending, tiebreak player name then id; ranks start at 1.
pub fn rank_player_leaders(leaders: &mut Vec<PlayerLeader>, limit: usize) {
    leaders.sort_by(|a, b| {
        b.stat_value
            .total_cmp(&a.stat_value)
            .then_with(|| a.player_name.cmp(&b.player_name))
            .then(a.player_id.cmp(&b.player_id))
    });
    leaders.truncate(limit);
    for (i, leader) in leaders.iter_mut().enumerate() {
        leader.rank = i as u32 + 1;
    }
}

/// Top `n` items by `value`, skipping items without one. Ties break on
/// `name`.
pub fn top_n_by<T, V, N>(items: &[T], n: usize, lower_is_better: bool, value: V, name: N) -> Vec<StatLeader>
where
    V: Fn(&T) -> Option<f64>,
    N: Fn(&T) -> &str,
{
    let mut scored: Vec<StatLeader> = items
        .iter()
        .filter_map(|item| {
            value(item).map(|v| StatLeader {
                team: name(item).to_string(),
                value: v,
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        let ord = if lower_is_better {
            a.value.total_cmp(&b.value)
        } else {
            b.value.total_cmp(&a.value)
        };
        ord.then_with(|| a.team.cmp(&b.team))
    });
    scored.truncate(n);
    scored
}

/// Order search hits: name prefix, then word prefix, then name substring,
/// then team-only matches. Within a tier, newer players first, then name.
pub fn rank_search_results(
    query: &str,
    mut results: Vec<PlayerSearchResult>,
    limit: usize,
) -> Vec<PlayerSearchResult> {
    let needle = query.trim().to_lowercase();

    let tier = |r: &PlayerSearchResult| -> u8 {
        let name = r.name.to_lowercase();
        if name.starts_with(&needle) {
            0
        } else if name.split_whitespace().any(|w| w.starts_with(&needle)) {
            1
        } else if name.contains(&needle) {
            2
        } else {
            3
        }
    };

    results.retain(|r| {
        r.name.to_lowercase().contains(&needle) || r.team.to_lowercase().contains(&needle)
    });
    results.sort_by_key(|r| (tier(r), Reverse(r.latest_season), r.name.clone(), r.player_id));
    results.dedup_by_key(|r| r.player_id);
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeaderCategory, Phase};
    use chrono::{TimeZone, Utc};

    fn entry(week: u32, school: &str, rank: Option<u32>, points: u32) -> RankingEntry {
        RankingEntry {
            season: 2025,
            week,
            poll: "AP Top 25".to_string(),
            school: school.to_string(),
            conference: None,
            rank,
            points,
            first_place_votes: None,
        }
    }

    fn schools(entries: &[RankingEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.school.as_str()).collect()
    }

    #[test]
    fn test_sort_rankings_unranked_after_ranked() {
        let mut entries = vec![
            entry(5, "C", None, 300),
            entry(5, "B", Some(2), 1400),
            entry(5, "D", None, 450),
            entry(5, "A", Some(1), 1500),
        ];
        sort_rankings(&mut entries);
        assert_eq!(schools(&entries), vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn test_sort_rankings_is_deterministic_under_input_order() {
        let base = vec![
            entry(5, "Y", None, 10),
            entry(5, "X", None, 10),
            entry(5, "Z", Some(3), 900),
        ];
        let mut forward = base.clone();
        let mut backward: Vec<_> = base.into_iter().rev().collect();
        sort_rankings(&mut forward);
        sort_rankings(&mut backward);
        assert_eq!(forward, backward);
        assert_eq!(schools(&forward), vec!["Z", "X", "Y"]);
    }

    #[test]
    fn test_sort_rankings_by_week() {
        let mut entries = vec![
            entry(6, "B", Some(1), 1500),
            entry(5, "B", Some(2), 1400),
            entry(5, "A", Some(1), 1500),
        ];
        sort_rankings_by_week(&mut entries);
        let keys: Vec<_> = entries.iter().map(|e| (e.week, e.school.as_str())).collect();
        assert_eq!(keys, vec![(5, "A"), (5, "B"), (6, "B")]);
    }

    #[test]
    fn test_ranking_trajectory_keeps_gaps() {
        let entries = vec![
            entry(1, "Navy", Some(20), 200),
            entry(1, "Army", Some(25), 100),
            entry(2, "Army", Some(24), 120),
            entry(3, "Navy", None, 40),
            entry(3, "Army", Some(22), 150),
        ];
        let trajectory = ranking_trajectory(&entries, "Navy");
        assert_eq!(trajectory.weeks, vec![(1, Some(20)), (2, None), (3, None)]);
    }

    fn game(id: i64, hour: u32) -> Game {
        Game {
            id,
            season: 2025,
            week: 1,
            season_type: Phase::Regular,
            start_date: Utc.with_ymd_and_hms(2025, 8, 30, hour, 0, 0).unwrap(),
            home_team: "H".to_string(),
            away_team: "A".to_string(),
            home_points: None,
            away_points: None,
            completed: false,
            conference_game: false,
            neutral_site: false,
        }
    }

    #[test]
    fn test_game_orderings() {
        let mut games = vec![game(3, 19), game(2, 16), game(1, 19)];
        sort_games_chronological(&mut games);
        assert_eq!(games.iter().map(|g| g.id).collect::<Vec<_>>(), vec![2, 1, 3]);

        sort_games_recent_first(&mut games);
        assert_eq!(games.iter().map(|g| g.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }

    fn standing(team: &str, score: Option<f64>) -> Standing {
        Standing {
            season: 2025,
            team: team.to_string(),
            conference: None,
            wins: 0,
            losses: 0,
            conference_wins: None,
            conference_losses: None,
            composite_score: score,
        }
    }

    #[test]
    fn test_sort_standings() {
        let mut rows = vec![
            standing("Navy", None),
            standing("Ohio State", Some(90.0)),
            standing("Georgia", Some(90.0)),
            standing("Texas", Some(95.0)),
        ];
        sort_standings(&mut rows);
        let teams: Vec<_> = rows.iter().map(|s| s.team.as_str()).collect();
        assert_eq!(teams, vec!["Texas", "Georgia", "Ohio State", "Navy"]);
    }

    fn leader(id: i64, name: &str, value: f64) -> PlayerLeader {
        PlayerLeader {
            rank: 0,
            season: 2025,
            category: LeaderCategory::Passing,
            player_id: id,
            player_name: name.to_string(),
            team: "T".to_string(),
            conference: None,
            position: None,
            stat_value: value,
        }
    }

    #[test]
    fn test_rank_player_leaders() {
        let mut leaders = vec![leader(1, "B", 10.0), leader(2, "A", 10.0), leader(3, "C", 20.0)];
        rank_player_leaders(&mut leaders, 2);
        let ranked: Vec<_> = leaders.iter().map(|l| (l.rank, l.player_name.as_str())).collect();
        assert_eq!(ranked, vec![(1, "C"), (2, "A")]);
    }

    #[test]
    fn test_top_n_by_direction() {
        let rows = vec![("A", Some(0.1)), ("B", Some(-0.2)), ("C", None), ("D", Some(0.3))];
        let best = top_n_by(&rows, 2, false, |r| r.1, |r| r.0);
        assert_eq!(best.iter().map(|l| l.team.as_str()).collect::<Vec<_>>(), vec!["D", "A"]);

        let lowest = top_n_by(&rows, 5, true, |r| r.1, |r| r.0);
        assert_eq!(
            lowest.iter().map(|l| l.team.as_str()).collect::<Vec<_>>(),
            vec!["B", "A", "D"]
        );
    }

    fn hit(id: i64, name: &str, team: &str, season: i32) -> PlayerSearchResult {
        PlayerSearchResult {
            player_id: id,
            name: name.to_string(),
            team: team.to_string(),
            position: None,
            latest_season: Some(season),
        }
    }

    #[test]
    fn test_rank_search_results() {
        let hits = vec![
            hit(1, "Khalil Malachi", "Tulane", 2025),
            hit(2, "Sam Jones", "Alabama", 2025),
            hit(3, "Alan Smith", "Georgia", 2025),
            hit(4, "Bo Nix", "Oregon", 2023),
            hit(5, "Sam Alawode", "Navy", 2025),
        ];
        let ranked = rank_search_results("ala", hits, 10);
        let ids: Vec<_> = ranked.iter().map(|r| r.player_id).collect();
        assert_eq!(ids, vec![3, 5, 1, 2]);
    }
}
