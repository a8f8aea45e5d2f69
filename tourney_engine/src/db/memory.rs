//! In-memory store used by tests and the simulator.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state on commit.
//! Transactions are therefore fully serialized.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repository::{StoreTransaction, TournamentStore};
use crate::tournament::{
    BracketSlot, Match, MatchFilter, MatchId, MatchWithEdges, NewBracketSlot, NewMatch,
    NewTournament, Stage, Team, TeamId, Tournament, TournamentError, TournamentId,
    TournamentResult, TournamentStatus, TournamentWithTeams,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    next_id: i64,
    tournaments: BTreeMap<TournamentId, Tournament>,
    teams: BTreeMap<TeamId, Team>,
    /// Registrations in insertion order
    registrations: Vec<(TournamentId, TeamId)>,
    matches: BTreeMap<MatchId, Match>,
    slots: Vec<BracketSlot>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn tournament(&self, tournament_id: TournamentId) -> TournamentResult<&Tournament> {
        self.tournaments
            .get(&tournament_id)
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }
}

/// Store keeping everything in process memory
#[derive(Clone, Default)]
pub struct MemoryTournamentStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTournamentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentStore for MemoryTournamentStore {
    async fn begin(&self) -> TournamentResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

/// Transaction over a [`MemoryTournamentStore`]
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn create_tournament(&mut self, new: &NewTournament) -> TournamentResult<Tournament> {
        let tournament = Tournament {
            id: self.working.allocate_id(),
            name: new.name.clone(),
            format: new.format,
            status: TournamentStatus::Pending,
            max_teams: new.max_teams,
            champion_id: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        };
        self.working
            .tournaments
            .insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn create_team(&mut self, name: &str, tag: Option<&str>) -> TournamentResult<Team> {
        let team = Team {
            id: self.working.allocate_id(),
            name: name.to_string(),
            tag: tag.map(str::to_string),
        };
        self.working.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn get_team(&mut self, team_id: TeamId) -> TournamentResult<Option<Team>> {
        Ok(self.working.teams.get(&team_id).cloned())
    }

    async fn get_tournament_with_teams(
        &mut self,
        tournament_id: TournamentId,
        _for_update: bool,
    ) -> TournamentResult<Option<TournamentWithTeams>> {
        let Some(tournament) = self.working.tournaments.get(&tournament_id) else {
            return Ok(None);
        };
        let teams = self
            .working
            .registrations
            .iter()
            .filter(|(tid, _)| *tid == tournament_id)
            .filter_map(|(_, team_id)| self.working.teams.get(team_id).cloned())
            .collect();
        Ok(Some(TournamentWithTeams {
            tournament: tournament.clone(),
            teams,
        }))
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> TournamentResult<()> {
        let stored = self
            .working
            .tournaments
            .get_mut(&tournament.id)
            .ok_or(TournamentError::TournamentNotFound(tournament.id))?;
        *stored = tournament.clone();
        Ok(())
    }

    async fn register_team(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        self.working.tournament(tournament_id)?;
        if !self.working.teams.contains_key(&team_id) {
            return Err(TournamentError::TeamNotFound(team_id));
        }
        if self.working.registrations.contains(&(tournament_id, team_id)) {
            return Err(TournamentError::AlreadyRegistered { team_id });
        }
        self.working.registrations.push((tournament_id, team_id));
        Ok(())
    }

    async fn unregister_team(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<bool> {
        let before = self.working.registrations.len();
        self.working
            .registrations
            .retain(|entry| *entry != (tournament_id, team_id));
        Ok(self.working.registrations.len() != before)
    }

    async fn create_match(&mut self, new: &NewMatch) -> TournamentResult<Match> {
        self.working.tournament(new.tournament_id)?;
        let record = new.clone().into_match(self.working.allocate_id());
        self.working.matches.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_match(&mut self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.working.matches.get(&match_id).cloned())
    }

    async fn get_match_with_edges(
        &mut self,
        match_id: MatchId,
    ) -> TournamentResult<Option<MatchWithEdges>> {
        let Some(record) = self.working.matches.get(&match_id) else {
            return Ok(None);
        };
        let tournament = self.working.tournament(record.tournament_id)?.clone();
        let outgoing = self
            .working
            .slots
            .iter()
            .filter(|slot| slot.source_match_id == match_id)
            .cloned()
            .collect();
        Ok(Some(MatchWithEdges {
            tournament,
            record: record.clone(),
            outgoing,
        }))
    }

    async fn update_match(&mut self, record: &Match) -> TournamentResult<()> {
        let stored = self
            .working
            .matches
            .get_mut(&record.id)
            .ok_or(TournamentError::MatchNotFound(record.id))?;
        *stored = record.clone();
        Ok(())
    }

    async fn list_matches(&mut self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        Ok(self
            .working
            .matches
            .values()
            .filter(|record| filter.accepts(record))
            .cloned()
            .collect())
    }

    async fn count_matches(&mut self, filter: &MatchFilter) -> TournamentResult<usize> {
        Ok(self
            .working
            .matches
            .values()
            .filter(|record| filter.accepts(record))
            .count())
    }

    async fn count_bracket_roots(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
    ) -> TournamentResult<usize> {
        let sources: BTreeSet<MatchId> = self
            .working
            .slots
            .iter()
            .map(|slot| slot.source_match_id)
            .collect();
        Ok(self
            .working
            .matches
            .values()
            .filter(|record| record.tournament_id == tournament_id && record.stage == stage)
            .filter(|record| !sources.contains(&record.id))
            .count())
    }

    async fn create_bracket_slots_batch(
        &mut self,
        slots: &[NewBracketSlot],
    ) -> TournamentResult<Vec<BracketSlot>> {
        let mut created = Vec::with_capacity(slots.len());
        for new in slots {
            for id in [new.match_id, new.source_match_id] {
                if !self.working.matches.contains_key(&id) {
                    return Err(TournamentError::MatchNotFound(id));
                }
            }
            let taken = self
                .working
                .slots
                .iter()
                .any(|slot| slot.match_id == new.match_id && slot.slot_type == new.slot_type);
            if taken {
                return Err(TournamentError::SlotConflict {
                    match_id: new.match_id,
                    slot: new.slot_type,
                });
            }

            let slot = BracketSlot {
                id: self.working.allocate_id(),
                tournament_id: new.tournament_id,
                match_id: new.match_id,
                slot_type: new.slot_type,
                source_match_id: new.source_match_id,
                source_outcome: new.source_outcome,
            };
            self.working.slots.push(slot.clone());
            created.push(slot);
        }
        Ok(created)
    }

    async fn list_bracket_slots(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketSlot>> {
        Ok(self
            .working
            .slots
            .iter()
            .filter(|slot| slot.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn list_distinct_group_names(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<String>> {
        let names: BTreeSet<String> = self
            .working
            .matches
            .values()
            .filter(|record| record.tournament_id == tournament_id)
            .filter_map(|record| record.group_name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn commit(self: Box<Self>) -> TournamentResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
