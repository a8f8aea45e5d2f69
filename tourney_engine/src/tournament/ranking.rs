//! Standings computed from played matches.

use std::collections::HashMap;

use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, MatchFilter, Team, TeamId, TeamScore, TournamentId};
use crate::db::repository::StoreTransaction;

/// Points awarded for a victory
pub const POINTS_PER_VICTORY: u32 = 3;

/// Rank `teams` by the results of `matches`.
///
/// Unplayed matches and matches involving a team outside `teams` are ignored.
/// Ordering is by points, then score difference, then victories; equal teams
/// keep their roster order.
pub fn rank(teams: &[Team], matches: &[Match]) -> Vec<TeamScore> {
    let mut scores: Vec<TeamScore> = teams.iter().map(TeamScore::new).collect();
    let index: HashMap<TeamId, usize> = teams
        .iter()
        .enumerate()
        .map(|(position, team)| (team.id, position))
        .collect();

    for record in matches.iter().filter(|record| record.played) {
        let (Some(team_a), Some(team_b), Some(winner)) =
            (record.team_a_id, record.team_b_id, record.winner_id)
        else {
            continue;
        };
        let (Some(&a), Some(&b)) = (index.get(&team_a), index.get(&team_b)) else {
            continue;
        };

        let difference = i64::from(record.score_a) - i64::from(record.score_b);
        scores[a].score_difference += difference;
        scores[b].score_difference -= difference;

        let (won, lost) = if winner == team_a { (a, b) } else { (b, a) };
        scores[won].victories += 1;
        scores[won].points += POINTS_PER_VICTORY;
        scores[lost].defeats += 1;
    }

    scores.sort_by(|left, right| {
        right
            .points
            .cmp(&left.points)
            .then(right.score_difference.cmp(&left.score_difference))
            .then(right.victories.cmp(&left.victories))
    });
    scores
}

/// Standings of a tournament, or of one of its groups.
///
/// A group ranking covers only the teams seated in that group's matches.
pub async fn ranking(
    tx: &mut dyn StoreTransaction,
    tournament_id: TournamentId,
    group_name: Option<&str>,
) -> TournamentResult<Vec<TeamScore>> {
    let loaded = tx
        .get_tournament_with_teams(tournament_id, false)
        .await?
        .ok_or(TournamentError::TournamentNotFound(tournament_id))?;

    let mut filter = MatchFilter::new(tournament_id);
    if let Some(group) = group_name {
        filter = filter.group(group);
    }
    let matches = tx.list_matches(&filter).await?;

    let roster: Vec<Team> = match group_name {
        Some(_) => loaded
            .teams
            .into_iter()
            .filter(|team| matches.iter().any(|record| record.involves(team.id)))
            .collect(),
        None => loaded.teams,
    };

    Ok(rank(&roster, &matches))
}

/// Standings of every group, in group name order
pub async fn group_rankings(
    tx: &mut dyn StoreTransaction,
    tournament_id: TournamentId,
) -> TournamentResult<Vec<(String, Vec<TeamScore>)>> {
    let mut standings = Vec::new();
    for group in tx.list_distinct_group_names(tournament_id).await? {
        let scores = ranking(tx, tournament_id, Some(&group)).await?;
        standings.push((group, scores));
    }
    Ok(standings)
}

/// The top `per_group` teams of each group, groups in name order
pub async fn qualified_teams(
    tx: &mut dyn StoreTransaction,
    tournament_id: TournamentId,
    per_group: usize,
) -> TournamentResult<Vec<TeamId>> {
    Ok(group_rankings(tx, tournament_id)
        .await?
        .into_iter()
        .flat_map(|(_, scores)| scores.into_iter().take(per_group).map(|score| score.team_id))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{NewMatch, Stage, WinnerSide};
    use proptest::prelude::*;

    fn team(id: TeamId) -> Team {
        Team {
            id,
            name: format!("Team {id}"),
            tag: None,
        }
    }

    fn played(id: i64, a: TeamId, b: TeamId, score_a: i32, score_b: i32) -> Match {
        let mut record = NewMatch::new(1, Stage::RoundRobin, 1)
            .teams(a, b)
            .into_match(id);
        let side = if score_a >= score_b {
            WinnerSide::A
        } else {
            WinnerSide::B
        };
        record.record_result(score_a, score_b, side).unwrap();
        record
    }

    #[test]
    fn test_points_and_difference() {
        let teams = vec![team(1), team(2), team(3)];
        let matches = vec![played(1, 1, 2, 3, 1), played(2, 2, 3, 2, 0), played(3, 3, 1, 1, 0)];

        let scores = rank(&teams, &matches);
        // everyone won once; difference decides: 1 => +1, 2 => 0, 3 => -1
        let order: Vec<TeamId> = scores.iter().map(|score| score.team_id).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert!(scores.iter().all(|score| score.points == 3 && score.victories == 1));
        assert_eq!(scores[0].score_difference, 1);
        assert_eq!(scores[2].score_difference, -1);
    }

    #[test]
    fn test_ties_keep_roster_order() {
        let teams = vec![team(4), team(2), team(9)];
        let scores = rank(&teams, &[]);
        let order: Vec<TeamId> = scores.iter().map(|score| score.team_id).collect();
        assert_eq!(order, vec![4, 2, 9]);
        assert!(scores.iter().all(|score| score.points == 0));
    }

    #[test]
    fn test_ignores_unplayed_and_foreign_matches() {
        let teams = vec![team(1), team(2)];
        let pending = NewMatch::new(1, Stage::RoundRobin, 1).teams(1, 2).into_match(5);
        let foreign = played(6, 1, 77, 9, 0);

        let scores = rank(&teams, &[pending, foreign]);
        assert!(scores.iter().all(|score| score.victories == 0 && score.score_difference == 0));
    }

    proptest! {
        #[test]
        fn prop_rank_ignores_match_order(
            results in prop::collection::vec((1i64..=6, 1i64..=6, 0i32..10, 0i32..10), 0..30),
            seed in any::<u64>(),
        ) {
            let teams: Vec<Team> = (1..=6).map(team).collect();
            let matches: Vec<Match> = results
                .iter()
                .enumerate()
                .filter(|(_, (a, b, _, _))| a != b)
                .map(|(id, &(a, b, score_a, score_b))| played(id as i64, a, b, score_a, score_b))
                .collect();

            let mut shuffled = matches.clone();
            let len = shuffled.len();
            if len > 1 {
                shuffled.rotate_left((seed as usize) % len);
                shuffled.reverse();
            }

            prop_assert_eq!(rank(&teams, &matches), rank(&teams, &shuffled));
        }

        #[test]
        fn prop_points_balance_victories(
            results in prop::collection::vec((1i64..=5, 1i64..=5, 0i32..10, 0i32..10), 0..20),
        ) {
            let teams: Vec<Team> = (1..=5).map(team).collect();
            let matches: Vec<Match> = results
                .iter()
                .enumerate()
                .filter(|(_, (a, b, _, _))| a != b)
                .map(|(id, &(a, b, score_a, score_b))| played(id as i64, a, b, score_a, score_b))
                .collect();

            let scores = rank(&teams, &matches);
            let victories: u32 = scores.iter().map(|score| score.victories).sum();
            let defeats: u32 = scores.iter().map(|score| score.defeats).sum();
            let difference: i64 = scores.iter().map(|score| score.score_difference).sum();
            prop_assert_eq!(victories as usize, matches.len());
            prop_assert_eq!(defeats as usize, matches.len());
            prop_assert_eq!(difference, 0);
            for pair in scores.windows(2) {
                prop_assert!(pair[0].points >= pair[1].points);
            }
        }
    }
}
