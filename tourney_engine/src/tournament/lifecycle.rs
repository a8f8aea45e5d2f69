//! Tournament lifecycle: registration, start, results and standings.

use serde::Serialize;
use std::sync::Arc;

use super::config::EngineConfig;
use super::errors::{TournamentError, TournamentResult};
use super::generator::MatchScheduleGenerator;
use super::models::{
    BracketSlot, Match, MatchFilter, MatchId, NewTournament, Team, TeamId, TeamScore,
    Tournament, TournamentId, TournamentStatus, TournamentWithTeams, WinnerSide,
};
use super::progression::{MatchProgressionEngine, ProgressionReport};
use super::ranking;
use crate::db::repository::{StoreTransaction, TournamentStore};

/// Outcome of starting a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartSummary {
    pub tournament_id: TournamentId,
    pub matches_created: usize,
}

/// Entry point for everything that happens to a tournament.
///
/// Each operation runs in its own transaction, committed only on success.
pub struct TournamentLifecycle<S: TournamentStore> {
    store: Arc<S>,
    generator: MatchScheduleGenerator,
    engine: MatchProgressionEngine,
    config: EngineConfig,
}

impl<S: TournamentStore> Clone for TournamentLifecycle<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            generator: self.generator.clone(),
            engine: self.engine.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: TournamentStore> TournamentLifecycle<S> {
    /// Create a lifecycle shuffling entrants with the configured seed
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let generator = MatchScheduleGenerator::from_config(&config);
        Self::with_generator(store, config, generator)
    }

    pub fn with_generator(
        store: Arc<S>,
        config: EngineConfig,
        generator: MatchScheduleGenerator,
    ) -> Self {
        let engine = MatchProgressionEngine::new(generator.clone(), config.clone());
        Self {
            store,
            generator,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a tournament accepting registrations
    pub async fn create_tournament(&self, new: NewTournament) -> TournamentResult<Tournament> {
        if new.name.trim().is_empty() {
            return Err(TournamentError::InvalidConfiguration(
                "tournament name must not be empty".to_string(),
            ));
        }
        if new.max_teams < 2 {
            return Err(TournamentError::InvalidConfiguration(format!(
                "max_teams must be at least 2, got {}",
                new.max_teams
            )));
        }

        let mut tx = self.store.begin().await?;
        let tournament = tx.create_tournament(&new).await?;
        tx.commit().await?;

        log::info!(
            "Created {} tournament {} '{}' for up to {} teams",
            tournament.format,
            tournament.id,
            tournament.name,
            tournament.max_teams
        );
        Ok(tournament)
    }

    pub async fn create_team(&self, name: &str, tag: Option<&str>) -> TournamentResult<Team> {
        if name.trim().is_empty() {
            return Err(TournamentError::InvalidConfiguration(
                "team name must not be empty".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let team = tx.create_team(name, tag).await?;
        tx.commit().await?;
        Ok(team)
    }

    /// Register a team for a pending tournament.
    ///
    /// The tournament stays locked while the roster is counted, so
    /// concurrent registrations cannot exceed `max_teams`.
    pub async fn register_team(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        let mut tx = self.store.begin().await?;
        let loaded = load_tournament(tx.as_mut(), tournament_id, true).await?;
        if tx.get_team(team_id).await?.is_none() {
            return Err(TournamentError::TeamNotFound(team_id));
        }
        if loaded.tournament.status != TournamentStatus::Pending {
            return Err(TournamentError::TournamentAlreadyStarted(tournament_id));
        }
        if loaded.teams.len() >= loaded.tournament.max_teams as usize {
            return Err(TournamentError::TournamentFull {
                max_teams: loaded.tournament.max_teams,
            });
        }
        if loaded.is_registered(team_id) {
            return Err(TournamentError::AlreadyRegistered { team_id });
        }

        tx.register_team(tournament_id, team_id).await?;
        tx.commit().await?;

        log::info!(
            "Team {} registered for tournament {} ({}/{})",
            team_id,
            tournament_id,
            loaded.teams.len() + 1,
            loaded.tournament.max_teams
        );
        Ok(())
    }

    /// Withdraw a team before the tournament starts
    pub async fn unregister_team(
        &self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        let mut tx = self.store.begin().await?;
        let loaded = load_tournament(tx.as_mut(), tournament_id, true).await?;
        if loaded.tournament.status != TournamentStatus::Pending {
            return Err(TournamentError::TournamentAlreadyStarted(tournament_id));
        }
        if !tx.unregister_team(tournament_id, team_id).await? {
            return Err(TournamentError::NotRegistered { team_id });
        }
        tx.commit().await?;

        log::info!("Team {team_id} unregistered from tournament {tournament_id}");
        Ok(())
    }

    /// Generate the schedule and put the tournament in progress
    pub async fn start_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<StartSummary> {
        let mut tx = self.store.begin().await?;
        let loaded = load_tournament(tx.as_mut(), tournament_id, true).await?;
        let mut tournament = loaded.tournament.clone();
        if tournament.status != TournamentStatus::Pending {
            return Err(TournamentError::TournamentAlreadyStarted(tournament_id));
        }

        let matches_created = self
            .generator
            .generate(tx.as_mut(), &tournament, &loaded.team_ids(), &self.config)
            .await?;
        tournament.mark_started()?;
        tx.update_tournament(&tournament).await?;
        tx.commit().await?;

        log::info!(
            "Tournament {} started with {} teams and {} matches",
            tournament_id,
            loaded.teams.len(),
            matches_created
        );
        Ok(StartSummary {
            tournament_id,
            matches_created,
        })
    }

    /// Record a match result and everything that follows from it
    pub async fn submit_match_result(
        &self,
        match_id: MatchId,
        score_a: i32,
        score_b: i32,
        winner_side: WinnerSide,
    ) -> TournamentResult<ProgressionReport> {
        let mut tx = self.store.begin().await?;
        let report = self
            .engine
            .submit_result(tx.as_mut(), match_id, score_a, score_b, winner_side)
            .await?;
        tx.commit().await?;
        Ok(report)
    }

    /// Declare the champion of a tournament the engine cannot finish on its
    /// own, such as Swiss or double elimination
    pub async fn finalize_tournament(
        &self,
        tournament_id: TournamentId,
        champion_id: TeamId,
    ) -> TournamentResult<Tournament> {
        let mut tx = self.store.begin().await?;
        let loaded = load_tournament(tx.as_mut(), tournament_id, true).await?;
        if !loaded.is_registered(champion_id) {
            return Err(TournamentError::NotRegistered {
                team_id: champion_id,
            });
        }

        let mut tournament = loaded.tournament;
        tournament.crown(champion_id)?;
        tx.update_tournament(&tournament).await?;
        tx.commit().await?;

        log::info!("Tournament {tournament_id} finalized with team {champion_id} as champion");
        Ok(tournament)
    }

    /// Standings of the whole tournament or of one group
    pub async fn get_ranking(
        &self,
        tournament_id: TournamentId,
        group_name: Option<&str>,
    ) -> TournamentResult<Vec<TeamScore>> {
        let mut tx = self.store.begin().await?;
        let scores = ranking::ranking(tx.as_mut(), tournament_id, group_name).await?;
        tx.commit().await?;
        Ok(scores)
    }

    /// Standings of every group, in group name order
    pub async fn get_group_rankings(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<(String, Vec<TeamScore>)>> {
        let mut tx = self.store.begin().await?;
        load_tournament(tx.as_mut(), tournament_id, false).await?;
        let standings = ranking::group_rankings(tx.as_mut(), tournament_id).await?;
        tx.commit().await?;
        Ok(standings)
    }

    /// Top `per_group` teams of every group
    pub async fn get_qualified_teams(
        &self,
        tournament_id: TournamentId,
        per_group: usize,
    ) -> TournamentResult<Vec<TeamId>> {
        let mut tx = self.store.begin().await?;
        load_tournament(tx.as_mut(), tournament_id, false).await?;
        let qualified = ranking::qualified_teams(tx.as_mut(), tournament_id, per_group).await?;
        tx.commit().await?;
        Ok(qualified)
    }

    pub async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<TournamentWithTeams> {
        let mut tx = self.store.begin().await?;
        let loaded = load_tournament(tx.as_mut(), tournament_id, false).await?;
        tx.commit().await?;
        Ok(loaded)
    }

    /// All matches of a tournament, ordered by ID
    pub async fn list_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        self.matches_where(MatchFilter::new(tournament_id)).await
    }

    /// Unplayed matches with both teams seated
    pub async fn ready_matches(&self, tournament_id: TournamentId) -> TournamentResult<Vec<Match>> {
        let pending = self
            .matches_where(MatchFilter::new(tournament_id).played(false))
            .await?;
        Ok(pending.into_iter().filter(Match::is_ready).collect())
    }

    pub async fn bracket_slots(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketSlot>> {
        let mut tx = self.store.begin().await?;
        load_tournament(tx.as_mut(), tournament_id, false).await?;
        let slots = tx.list_bracket_slots(tournament_id).await?;
        tx.commit().await?;
        Ok(slots)
    }

    async fn matches_where(&self, filter: MatchFilter) -> TournamentResult<Vec<Match>> {
        let mut tx = self.store.begin().await?;
        load_tournament(tx.as_mut(), filter.tournament_id, false).await?;
        let matches = tx.list_matches(&filter).await?;
        tx.commit().await?;
        Ok(matches)
    }
}

async fn load_tournament(
    tx: &mut dyn StoreTransaction,
    tournament_id: TournamentId,
    for_update: bool,
) -> TournamentResult<TournamentWithTeams> {
    tx.get_tournament_with_teams(tournament_id, for_update)
        .await?
        .ok_or(TournamentError::TournamentNotFound(tournament_id))
}
