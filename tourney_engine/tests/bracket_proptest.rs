/// Property-based tests for bracket topology and schedule planning
///
/// These tests check structural invariants of generated schedules across
/// random field sizes and shuffle seeds.
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};
use tourney_engine::tournament::topology::{self, NodeKind};
use tourney_engine::tournament::{MatchScheduleGenerator, TeamId};

fn entrants(n: usize) -> Vec<TeamId> {
    (1..=n as i64).collect()
}

proptest! {
    #[test]
    fn prop_elimination_plan_decides_every_team(n in 2usize..=70, seed in any::<u64>()) {
        let generator = MatchScheduleGenerator::new(StdRng::seed_from_u64(seed));
        let plan = generator.plan_single_elimination(1, &entrants(n)).unwrap();

        prop_assert_eq!(plan.len(), n - 1);
        prop_assert_eq!(plan.links.len(), n - 2);

        // each team is seated once at generation
        let mut seen = HashSet::new();
        for new in &plan.matches {
            for team in [new.team_a_id, new.team_b_id].into_iter().flatten() {
                prop_assert!(seen.insert(team));
            }
        }
        prop_assert_eq!(seen.len(), n);

        // a slot is either pre-filled or fed by exactly one link, never both
        let mut fed = HashSet::new();
        for link in &plan.links {
            prop_assert!(fed.insert((link.target, link.slot)));
            prop_assert_eq!(plan.matches[link.target].round, plan.matches[link.source].round + 1);
            let target = &plan.matches[link.target];
            let seated = match link.slot {
                tourney_engine::tournament::SlotType::TeamA => target.team_a_id,
                tourney_engine::tournament::SlotType::TeamB => target.team_b_id,
            };
            prop_assert!(seated.is_none());
        }
    }

    #[test]
    fn prop_bracket_paths_reach_final(n in 2usize..=130) {
        let topology = topology::elimination_bracket(&entrants(n), 1);
        prop_assert_eq!(topology.nodes.len(), topology.bracket_size - 1);
        prop_assert_eq!(topology.match_count(), n - 1);

        let byes = topology
            .nodes
            .iter()
            .filter(|node| matches!(node.kind, NodeKind::Bye(_)))
            .count();
        prop_assert_eq!(byes, topology.bracket_size - n);

        for node in &topology.nodes {
            let mut current = node.index;
            let mut round = node.round;
            while let Some((parent, _)) = topology.nodes[current].feeds {
                prop_assert!(topology.nodes[parent].round > round);
                round = topology.nodes[parent].round;
                current = parent;
            }
            prop_assert_eq!(current, 0);
            prop_assert_eq!(round, topology.final_round());
        }
    }

    #[test]
    fn prop_round_robin_meets_everyone_once(n in 2usize..=24) {
        let rounds = topology::round_robin_rounds(&entrants(n));
        let mut meetings: HashMap<(TeamId, TeamId), usize> = HashMap::new();
        for round in &rounds {
            for &(a, b) in round {
                *meetings.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        prop_assert_eq!(meetings.len(), n * (n - 1) / 2);
        prop_assert!(meetings.values().all(|&count| count == 1));
        prop_assert_eq!(rounds.len(), if n % 2 == 0 { n - 1 } else { n });
    }

    #[test]
    fn prop_groups_are_balanced(groups in 1usize..=8, per_group in 2usize..=6) {
        let field = entrants(groups * per_group);
        let assignment = topology::group_assignment(&field, groups);
        prop_assert_eq!(assignment.len(), groups);
        for group in &assignment {
            prop_assert_eq!(group.teams.len(), per_group);
            prop_assert_eq!(
                topology::group_pairings(&group.teams).len(),
                per_group * (per_group - 1) / 2
            );
        }
    }
}
