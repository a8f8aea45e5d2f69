//! Match schedule generation.
//!
//! Generation is split in two: a planner turns the entrant list into a
//! [`SchedulePlan`] without touching storage, then the plan is written with
//! one batch of matches followed by one batch of bracket slots.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::sync::{Arc, Mutex, PoisonError};

use super::config::EngineConfig;
use super::errors::{TournamentError, TournamentResult};
use super::models::{
    BracketTag, Match, NewBracketSlot, NewMatch, SlotType, SourceOutcome, Stage, TeamId,
    Tournament, TournamentFormat, TournamentId,
};
use super::topology::{self, NodeKind};
use crate::db::repository::StoreTransaction;

/// Edge between two planned matches, by index into [`SchedulePlan::matches`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedLink {
    pub target: usize,
    pub slot: SlotType,
    pub source: usize,
    pub outcome: SourceOutcome,
}

/// Matches and bracket edges to be created together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePlan {
    pub tournament_id: TournamentId,
    pub matches: Vec<NewMatch>,
    pub links: Vec<PlannedLink>,
}

impl SchedulePlan {
    pub fn new(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id,
            matches: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Add a match, returning its plan index
    pub fn push(&mut self, new: NewMatch) -> usize {
        self.matches.push(new);
        self.matches.len() - 1
    }

    /// The `outcome` of `source` fills `slot` of `target`
    pub fn link(&mut self, source: usize, target: usize, slot: SlotType, outcome: SourceOutcome) {
        self.links.push(PlannedLink {
            target,
            slot,
            source,
            outcome,
        });
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Translate plan indices into the IDs of the created matches.
    ///
    /// `created` must be in plan order.
    pub fn resolve_links(&self, created: &[Match]) -> TournamentResult<Vec<NewBracketSlot>> {
        let id_of = |index: usize| {
            created.get(index).map(|record| record.id).ok_or_else(|| {
                TournamentError::Corrupted(format!(
                    "planned match {index} missing from {} created",
                    created.len()
                ))
            })
        };

        self.links
            .iter()
            .map(|link| {
                Ok(NewBracketSlot {
                    tournament_id: self.tournament_id,
                    match_id: id_of(link.target)?,
                    slot_type: link.slot,
                    source_match_id: id_of(link.source)?,
                    source_outcome: link.outcome,
                })
            })
            .collect()
    }

    /// Write the plan, returning the number of matches created
    pub async fn persist(self, tx: &mut dyn StoreTransaction) -> TournamentResult<usize> {
        if self.is_empty() {
            return Ok(0);
        }

        let created = tx.create_matches_batch(&self.matches).await?;
        let slots = self.resolve_links(&created)?;
        if !slots.is_empty() {
            tx.create_bracket_slots_batch(&slots).await?;
        }

        log::debug!(
            "Tournament {}: created {} matches and {} bracket slots",
            self.tournament_id,
            created.len(),
            slots.len()
        );
        Ok(created.len())
    }
}

/// Builds the match schedule of each tournament format
#[derive(Clone)]
pub struct MatchScheduleGenerator {
    rng: Arc<Mutex<StdRng>>,
}

impl MatchScheduleGenerator {
    /// Create a generator shuffling with the given random source
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.rng())
    }

    fn shuffled(&self, teams: &[TeamId]) -> Vec<TeamId> {
        let mut entrants = teams.to_vec();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        entrants.shuffle(&mut *rng);
        entrants
    }

    /// Generate and persist the opening schedule of a tournament.
    ///
    /// Nothing is written when the roster does not fit the format.
    pub async fn generate(
        &self,
        tx: &mut dyn StoreTransaction,
        tournament: &Tournament,
        teams: &[TeamId],
        config: &EngineConfig,
    ) -> TournamentResult<usize> {
        let plan = match tournament.format {
            TournamentFormat::SingleElimination => {
                self.plan_single_elimination(tournament.id, teams)?
            }
            TournamentFormat::DoubleElimination => {
                self.plan_double_elimination(tournament.id, teams)?
            }
            TournamentFormat::RoundRobin => self.plan_round_robin(tournament.id, teams)?,
            TournamentFormat::Swiss => self.plan_swiss_first_round(tournament.id, teams)?,
            TournamentFormat::GroupStageElimination => {
                self.plan_group_stage(tournament.id, teams, config.group_count)?
            }
        };

        log::info!(
            "Tournament {}: generated {} schedule with {} matches for {} teams",
            tournament.id,
            tournament.format,
            plan.len(),
            teams.len()
        );
        plan.persist(tx).await
    }

    /// Generate and persist an elimination bracket over `teams` in the given
    /// order. Used for playoffs, so entrants are not shuffled.
    pub async fn generate_elimination_phase(
        &self,
        tx: &mut dyn StoreTransaction,
        tournament_id: TournamentId,
        teams: &[TeamId],
        initial_round: i32,
        stage: Stage,
        bracket: BracketTag,
    ) -> TournamentResult<usize> {
        let plan =
            self.plan_elimination_phase(tournament_id, teams, initial_round, stage, bracket)?;
        plan.persist(tx).await
    }

    pub fn plan_single_elimination(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
    ) -> TournamentResult<SchedulePlan> {
        require_teams(teams, 2, TournamentFormat::SingleElimination)?;
        let entrants = self.shuffled(teams);
        self.plan_elimination_phase(
            tournament_id,
            &entrants,
            1,
            Stage::SingleElimination,
            BracketTag::Main,
        )
    }

    /// Full elimination bracket: first-round pairings, placeholders for every
    /// later round and winner edges between them. Bye entrants are written
    /// straight into the placeholder they advance to.
    pub fn plan_elimination_phase(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
        initial_round: i32,
        stage: Stage,
        bracket: BracketTag,
    ) -> TournamentResult<SchedulePlan> {
        if teams.len() < 2 {
            return Err(TournamentError::InvalidConfiguration(format!(
                "an elimination bracket needs at least 2 teams, got {}",
                teams.len()
            )));
        }

        let topology = topology::elimination_bracket(teams, initial_round);
        let mut plan = SchedulePlan::new(tournament_id);
        // heap index -> plan index; byes have no match
        let mut planned: Vec<Option<usize>> = Vec::with_capacity(topology.nodes.len());

        for node in &topology.nodes {
            let base = NewMatch::new(tournament_id, stage, node.round).bracket(bracket);
            match node.kind {
                NodeKind::Future => planned.push(Some(plan.push(base))),
                NodeKind::Paired(team_a, team_b) => {
                    planned.push(Some(plan.push(base.teams(team_a, team_b))))
                }
                NodeKind::Bye(team) => {
                    planned.push(None);
                    let (parent, slot) = node.feeds.ok_or_else(|| {
                        TournamentError::Corrupted(format!("bye at bracket root for team {team}"))
                    })?;
                    let target = planned[parent].ok_or_else(|| {
                        TournamentError::Corrupted(format!("bye {team} advances into a bye"))
                    })?;
                    let placeholder = &mut plan.matches[target];
                    match slot {
                        SlotType::TeamA => placeholder.team_a_id = Some(team),
                        SlotType::TeamB => placeholder.team_b_id = Some(team),
                    }
                }
            }
        }

        for node in &topology.nodes {
            if let (Some(source), Some((parent, slot))) = (planned[node.index], node.feeds) {
                if let Some(target) = planned[parent] {
                    plan.link(source, target, slot, SourceOutcome::Winner);
                }
            }
        }

        Ok(plan)
    }

    /// Every team meets every other team once, in registration order
    pub fn plan_round_robin(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
    ) -> TournamentResult<SchedulePlan> {
        require_teams(teams, 2, TournamentFormat::RoundRobin)?;

        let mut plan = SchedulePlan::new(tournament_id);
        for (index, pairs) in topology::round_robin_rounds(teams).into_iter().enumerate() {
            let round = index as i32 + 1;
            for (team_a, team_b) in pairs {
                plan.push(NewMatch::new(tournament_id, Stage::RoundRobin, round).teams(team_a, team_b));
            }
        }
        Ok(plan)
    }

    /// Winners-bracket opening round only
    pub fn plan_double_elimination(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
    ) -> TournamentResult<SchedulePlan> {
        require_teams(teams, 4, TournamentFormat::DoubleElimination)?;
        let entrants = self.shuffled(teams);

        let mut plan = SchedulePlan::new(tournament_id);
        for (team_a, team_b) in topology::double_elimination_opening(&entrants) {
            plan.push(
                NewMatch::new(tournament_id, Stage::DoubleElimination, 1)
                    .bracket(BracketTag::Winners)
                    .teams(team_a, team_b),
            );
        }
        Ok(plan)
    }

    /// Opening Swiss round of random pairs
    pub fn plan_swiss_first_round(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
    ) -> TournamentResult<SchedulePlan> {
        require_teams(teams, 4, TournamentFormat::Swiss)?;
        if teams.len() % 2 != 0 {
            return Err(TournamentError::InvalidConfiguration(format!(
                "Swiss needs an even number of teams, got {}",
                teams.len()
            )));
        }
        let entrants = self.shuffled(teams);

        let mut plan = SchedulePlan::new(tournament_id);
        for (team_a, team_b) in topology::swiss_opening_pairs(&entrants) {
            plan.push(NewMatch::new(tournament_id, Stage::SwissStage, 1).teams(team_a, team_b));
        }
        Ok(plan)
    }

    /// Equal groups, each playing a full round robin in round 1
    pub fn plan_group_stage(
        &self,
        tournament_id: TournamentId,
        teams: &[TeamId],
        group_count: usize,
    ) -> TournamentResult<SchedulePlan> {
        if group_count == 0 {
            return Err(TournamentError::InvalidConfiguration(
                "group count must be at least 1".to_string(),
            ));
        }
        require_teams(teams, group_count * 2, TournamentFormat::GroupStageElimination)?;
        if teams.len() % group_count != 0 {
            return Err(TournamentError::InvalidConfiguration(format!(
                "{} teams cannot be split into {group_count} equal groups",
                teams.len()
            )));
        }
        let entrants = self.shuffled(teams);

        let mut plan = SchedulePlan::new(tournament_id);
        for group in topology::group_assignment(&entrants, group_count) {
            for (team_a, team_b) in topology::group_pairings(&group.teams) {
                plan.push(
                    NewMatch::new(tournament_id, Stage::GroupStage, 1)
                        .group(group.name.clone())
                        .teams(team_a, team_b),
                );
            }
        }
        Ok(plan)
    }
}

fn require_teams(
    teams: &[TeamId],
    minimum: usize,
    format: TournamentFormat,
) -> TournamentResult<()> {
    if teams.len() < minimum {
        return Err(TournamentError::InvalidConfiguration(format!(
            "{format} needs at least {minimum} teams, got {}",
            teams.len()
        )));
    }
    Ok(())
}
