//! Bracket shapes for every tournament format.
//!
//! Everything here is pure: given the same entrant order the same shape comes
//! out. Shuffling happens in the generator before entrants reach this module.
//!
//! Elimination brackets are laid out as a binary heap: node 0 is the final,
//! the children of node `k` are `2k + 1` and `2k + 2`, and the last
//! `bracket_size / 2` nodes are the first-round pairings.

use super::models::{SlotType, TeamId};

/// Smallest power of two greater than or equal to `n`
pub fn next_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Number of rounds in an elimination bracket of `bracket_size` slots
pub fn round_count(bracket_size: usize) -> u32 {
    next_power_of_two(bracket_size).trailing_zeros()
}

/// What occupies a bracket node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Interior placeholder, filled by advancement
    Future,
    /// First-round pairing of two entrants
    Paired(TeamId, TeamId),
    /// First-round position with a single entrant, who advances directly
    Bye(TeamId),
}

/// Node of an elimination bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketNode {
    /// Heap index, 0 is the final
    pub index: usize,
    pub round: i32,
    /// Position of this node within its round, left to right
    pub position: usize,
    pub kind: NodeKind,
    /// Parent node and the slot this node's winner takes there
    pub feeds: Option<(usize, SlotType)>,
}

/// Complete elimination bracket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationTopology {
    pub bracket_size: usize,
    pub rounds: u32,
    pub initial_round: i32,
    /// Nodes in heap order
    pub nodes: Vec<BracketNode>,
}

impl EliminationTopology {
    /// Number of first-round positions
    pub fn first_round_size(&self) -> usize {
        self.bracket_size / 2
    }

    /// Nodes that become playable or placeholder matches (everything but byes)
    pub fn match_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| !matches!(node.kind, NodeKind::Bye(_)))
            .count()
    }

    pub fn bye_count(&self) -> usize {
        self.nodes.len() - self.match_count()
    }

    /// Round of the final
    pub fn final_round(&self) -> i32 {
        self.initial_round + self.rounds as i32 - 1
    }
}

/// Build a single-elimination bracket over `entrants` in the given order.
///
/// First-round position `i` pairs `entrants[i]` with
/// `entrants[bracket_size - 1 - i]`; positions without a second entrant are
/// byes. The first round is numbered `initial_round`.
///
/// `entrants` must hold at least two teams.
pub fn elimination_bracket(entrants: &[TeamId], initial_round: i32) -> EliminationTopology {
    let bracket_size = next_power_of_two(entrants.len().max(2));
    let rounds = round_count(bracket_size);
    let first_round = bracket_size / 2;

    let nodes = (0..bracket_size - 1)
        .map(|index| {
            let depth = (index + 1).ilog2();
            let position = index + 1 - (1 << depth);
            let round = initial_round + rounds as i32 - 1 - depth as i32;

            let kind = if index + 1 < first_round {
                NodeKind::Future
            } else {
                let team_a = entrants[position];
                match entrants.get(bracket_size - 1 - position) {
                    Some(&team_b) => NodeKind::Paired(team_a, team_b),
                    None => NodeKind::Bye(team_a),
                }
            };

            let feeds = (index > 0).then(|| {
                let parent_position = position / 2;
                let parent = (1 << (depth - 1)) - 1 + parent_position;
                (parent, SlotType::for_position(position))
            });

            BracketNode {
                index,
                round,
                position,
                kind,
                feeds,
            }
        })
        .collect();

    EliminationTopology {
        bracket_size,
        rounds,
        initial_round,
        nodes,
    }
}

/// Round-robin schedule using the circle method.
///
/// Returns one list of pairings per round. An odd field is padded with a bye
/// and pairings against the bye are dropped, so every unordered pair of
/// entrants meets exactly once.
pub fn round_robin_rounds(entrants: &[TeamId]) -> Vec<Vec<(TeamId, TeamId)>> {
    let mut circle: Vec<Option<TeamId>> = entrants.iter().copied().map(Some).collect();
    if circle.len() % 2 != 0 {
        circle.push(None);
    }
    let size = circle.len();
    if size < 2 {
        return Vec::new();
    }

    let fixed = circle[0];
    let mut rotating = circle[1..].to_vec();
    let mut rounds = Vec::with_capacity(size - 1);

    for _ in 0..size - 1 {
        let mut pairs = Vec::with_capacity(size / 2);
        let mut pair = |a: Option<TeamId>, b: Option<TeamId>| {
            if let (Some(a), Some(b)) = (a, b) {
                pairs.push((a, b));
            }
        };

        pair(fixed, rotating[0]);
        for i in 1..size / 2 {
            pair(rotating[i], rotating[size - 1 - i]);
        }
        rounds.push(pairs);

        rotating.rotate_right(1);
    }

    rounds
}

/// Opening Swiss round: consecutive entrants meet
pub fn swiss_opening_pairs(entrants: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    entrants
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}

/// Winners-bracket opening round of a double elimination.
///
/// Bracket size is at least 4; positions without two entrants produce no
/// pairing.
pub fn double_elimination_opening(entrants: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    let bracket_size = next_power_of_two(entrants.len()).max(4);
    (0..bracket_size / 2)
        .filter_map(|i| {
            let team_a = entrants.get(i)?;
            let team_b = entrants.get(bracket_size - 1 - i)?;
            Some((*team_a, *team_b))
        })
        .collect()
}

/// Teams of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub teams: Vec<TeamId>,
}

/// Display name of the group at `index`: "Group A", "Group B", …
pub fn group_name(index: usize) -> String {
    match u8::try_from(index) {
        Ok(offset) if offset < 26 => format!("Group {}", char::from(b'A' + offset)),
        _ => format!("Group {}", index + 1),
    }
}

/// Deal entrants into `group_count` groups: entrant `i` joins group
/// `i % group_count`.
pub fn group_assignment(entrants: &[TeamId], group_count: usize) -> Vec<Group> {
    let mut groups: Vec<Group> = (0..group_count)
        .map(|index| Group {
            name: group_name(index),
            teams: Vec::new(),
        })
        .collect();

    if group_count == 0 {
        return groups;
    }

    for (index, &team) in entrants.iter().enumerate() {
        groups[index % group_count].teams.push(team);
    }
    groups
}

/// Every unordered pair within a group, once
pub fn group_pairings(teams: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    teams
        .iter()
        .enumerate()
        .flat_map(|(i, &a)| teams[i + 1..].iter().map(move |&b| (a, b)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(n: i64) -> Vec<TeamId> {
        (1..=n).collect()
    }

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(1), 1);
        assert_eq!(next_power_of_two(2), 2);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
        assert_eq!(next_power_of_two(9), 16);
    }

    #[test]
    fn test_round_count() {
        assert_eq!(round_count(2), 1);
        assert_eq!(round_count(8), 3);
        assert_eq!(round_count(64), 6);
    }

    #[test]
    fn test_eight_team_bracket_shape() {
        let topology = elimination_bracket(&ids(8), 1);
        assert_eq!(topology.bracket_size, 8);
        assert_eq!(topology.rounds, 3);
        assert_eq!(topology.nodes.len(), 7);
        assert_eq!(topology.match_count(), 7);
        assert_eq!(topology.final_round(), 3);

        let rounds: Vec<i32> = topology.nodes.iter().map(|node| node.round).collect();
        assert_eq!(rounds, vec![3, 2, 2, 1, 1, 1, 1]);

        let pairings: Vec<NodeKind> = topology.nodes[3..].iter().map(|node| node.kind).collect();
        assert_eq!(
            pairings,
            vec![
                NodeKind::Paired(1, 8),
                NodeKind::Paired(2, 7),
                NodeKind::Paired(3, 6),
                NodeKind::Paired(4, 5),
            ]
        );
    }

    #[test]
    fn test_feeds_follow_position_parity() {
        let topology = elimination_bracket(&ids(8), 1);
        let feeds: Vec<Option<(usize, SlotType)>> =
            topology.nodes.iter().map(|node| node.feeds).collect();
        assert_eq!(
            feeds,
            vec![
                None,
                Some((0, SlotType::TeamA)),
                Some((0, SlotType::TeamB)),
                Some((1, SlotType::TeamA)),
                Some((1, SlotType::TeamB)),
                Some((2, SlotType::TeamA)),
                Some((2, SlotType::TeamB)),
            ]
        );
    }

    #[test]
    fn test_byes_for_non_power_of_two() {
        let topology = elimination_bracket(&ids(5), 1);
        assert_eq!(topology.bracket_size, 8);
        assert_eq!(topology.nodes.len(), 7);
        assert_eq!(topology.bye_count(), 3);
        // n - 1 matches decide n entrants
        assert_eq!(topology.match_count(), 4);

        let leaves: Vec<NodeKind> = topology.nodes[3..].iter().map(|node| node.kind).collect();
        assert_eq!(
            leaves,
            vec![
                NodeKind::Bye(1),
                NodeKind::Bye(2),
                NodeKind::Bye(3),
                NodeKind::Paired(4, 5),
            ]
        );
    }

    #[test]
    fn test_two_team_bracket_is_a_single_final() {
        let topology = elimination_bracket(&[7, 9], 1);
        assert_eq!(topology.nodes.len(), 1);
        assert_eq!(topology.nodes[0].kind, NodeKind::Paired(7, 9));
        assert_eq!(topology.nodes[0].feeds, None);
        assert_eq!(topology.nodes[0].round, 1);
    }

    #[test]
    fn test_rounds_increase_along_every_path() {
        for n in 2..=40 {
            let topology = elimination_bracket(&ids(n), 1);
            for node in &topology.nodes {
                if let Some((parent, _)) = node.feeds {
                    assert!(topology.nodes[parent].round > node.round);
                    assert_eq!(topology.nodes[parent].round, node.round + 1);
                }
            }

            // every node reaches the final
            for node in &topology.nodes {
                let mut current = node.index;
                let mut steps = 0;
                while let Some((parent, _)) = topology.nodes[current].feeds {
                    current = parent;
                    steps += 1;
                }
                assert_eq!(current, 0);
                assert!(steps < topology.rounds as usize);
            }
        }
    }

    #[test]
    fn test_each_parent_slot_fed_once() {
        let topology = elimination_bracket(&ids(16), 1);
        let mut seen = HashSet::new();
        for node in &topology.nodes {
            if let Some(edge) = node.feeds {
                assert!(seen.insert(edge), "slot {edge:?} fed twice");
            }
        }
        assert_eq!(seen.len(), topology.nodes.len() - 1);
    }

    #[test]
    fn test_round_robin_even_field() {
        let rounds = round_robin_rounds(&ids(6));
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|round| round.len() == 3));
        assert_eq!(rounds[0], vec![(1, 2), (3, 6), (4, 5)]);
        // the last rotating entry moves to the front
        assert_eq!(rounds[1], vec![(1, 6), (2, 5), (3, 4)]);
    }

    #[test]
    fn test_round_robin_odd_field_skips_bye() {
        let rounds = round_robin_rounds(&ids(5));
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|round| round.len() == 2));

        let pairs: HashSet<(TeamId, TeamId)> = rounds
            .iter()
            .flatten()
            .map(|&(a, b)| (a.min(b), a.max(b)))
            .collect();
        assert_eq!(pairs.len(), 10);
    }

    #[test]
    fn test_round_robin_every_pair_once() {
        for n in 2..=12 {
            let rounds = round_robin_rounds(&ids(n));
            let all: Vec<(TeamId, TeamId)> = rounds
                .iter()
                .flatten()
                .map(|&(a, b)| (a.min(b), a.max(b)))
                .collect();
            let unique: HashSet<_> = all.iter().copied().collect();
            let n = n as usize;
            assert_eq!(all.len(), n * (n - 1) / 2);
            assert_eq!(unique.len(), all.len());
            let expected_rounds = if n % 2 == 0 { n - 1 } else { n };
            assert_eq!(rounds.len(), expected_rounds);

            // nobody plays twice in a round
            for round in &rounds {
                let mut seen = HashSet::new();
                for &(a, b) in round {
                    assert!(seen.insert(a));
                    assert!(seen.insert(b));
                }
            }
        }
    }

    #[test]
    fn test_round_robin_degenerate_fields() {
        assert!(round_robin_rounds(&[]).is_empty());
        // a lone entrant is padded with a bye and never plays
        let rounds = round_robin_rounds(&[3]);
        assert_eq!(rounds, vec![Vec::<(TeamId, TeamId)>::new()]);
    }

    #[test]
    fn test_swiss_opening_pairs() {
        assert_eq!(swiss_opening_pairs(&ids(6)), vec![(1, 2), (3, 4), (5, 6)]);
    }

    #[test]
    fn test_double_elimination_opening() {
        assert_eq!(double_elimination_opening(&ids(4)), vec![(1, 4), (2, 3)]);
        // 6 entrants in an 8 bracket: positions 0 and 1 have no opponent
        assert_eq!(double_elimination_opening(&ids(6)), vec![(3, 6), (4, 5)]);
    }

    #[test]
    fn test_group_assignment_deals_round_robin_style() {
        let groups = group_assignment(&ids(8), 4);
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].name, "Group A");
        assert_eq!(groups[0].teams, vec![1, 5]);
        assert_eq!(groups[3].name, "Group D");
        assert_eq!(groups[3].teams, vec![4, 8]);
    }

    #[test]
    fn test_group_names_past_the_alphabet() {
        assert_eq!(group_name(25), "Group Z");
        assert_eq!(group_name(26), "Group 27");
    }

    #[test]
    fn test_group_pairings() {
        assert_eq!(group_pairings(&[1, 2]), vec![(1, 2)]);
        assert_eq!(
            group_pairings(&[1, 2, 3, 4]),
            vec![(1, 2), (1, 3), (1, 4), (2, 3), (2, 4), (3, 4)]
        );
        assert!(group_pairings(&[1]).is_empty());
    }
}
