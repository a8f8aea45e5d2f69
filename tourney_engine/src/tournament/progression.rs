//! Match result processing.
//!
//! Recording a result can fill later bracket slots, finish a group stage and
//! seed its playoffs, or end the tournament. All of it happens inside the
//! caller's transaction.

use serde::Serialize;

use super::config::EngineConfig;
use super::errors::{TournamentError, TournamentResult};
use super::generator::MatchScheduleGenerator;
use super::models::{
    BracketTag, Match, MatchFilter, MatchId, SlotType, SourceOutcome, Stage, TeamId,
    Tournament, TournamentFormat, TournamentStatus, WinnerSide,
};
use super::ranking;
use crate::db::repository::StoreTransaction;

/// A team written into a later match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotFill {
    pub match_id: MatchId,
    pub slot: SlotType,
    pub team_id: TeamId,
    /// Whether both teams of the target match are now known
    pub ready: bool,
}

/// Everything a single result set in motion
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionReport {
    pub updated: Match,
    pub fills: Vec<SlotFill>,
    pub champion: Option<TeamId>,
    /// Matches created for the playoffs, 0 unless this result closed the
    /// group stage
    pub playoff_matches: usize,
}

/// Applies match results to a tournament
#[derive(Clone)]
pub struct MatchProgressionEngine {
    generator: MatchScheduleGenerator,
    config: EngineConfig,
}

impl MatchProgressionEngine {
    pub fn new(generator: MatchScheduleGenerator, config: EngineConfig) -> Self {
        Self { generator, config }
    }

    /// Record a result and propagate it.
    ///
    /// # Errors
    ///
    /// - `MatchNotFound` / `MatchAlreadyPlayed` for a missing or finished match
    /// - `InvalidState` when the tournament is not in progress
    /// - `InvalidResult` for negative scores or an empty winner side
    ///
    /// On error the transaction must be dropped, not committed.
    pub async fn submit_result(
        &self,
        tx: &mut dyn StoreTransaction,
        match_id: MatchId,
        score_a: i32,
        score_b: i32,
        winner_side: WinnerSide,
    ) -> TournamentResult<ProgressionReport> {
        let loaded = tx
            .get_match_with_edges(match_id)
            .await?
            .ok_or(TournamentError::MatchNotFound(match_id))?;
        let mut record = loaded.record;
        let mut tournament = loaded.tournament;

        if record.played {
            return Err(TournamentError::MatchAlreadyPlayed(match_id));
        }
        if tournament.status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: tournament.status,
            });
        }

        let (winner, loser) = record.record_result(score_a, score_b, winner_side)?;
        tx.update_match(&record).await?;
        log::info!(
            "Tournament {}: match {} won by team {} ({}-{})",
            tournament.id,
            match_id,
            winner,
            score_a,
            score_b
        );

        let mut report = ProgressionReport {
            updated: record,
            fills: Vec::new(),
            champion: None,
            playoff_matches: 0,
        };

        if tournament.format == TournamentFormat::RoundRobin {
            self.close_round_robin(tx, &mut tournament, &mut report)
                .await?;
            return Ok(report);
        }

        for edge in &loaded.outgoing {
            let team_id = match edge.source_outcome {
                SourceOutcome::Winner => winner,
                SourceOutcome::Loser => loser,
            };
            report
                .fills
                .push(advance(tx, edge.match_id, edge.slot_type, team_id).await?);
        }

        if loaded.outgoing.is_empty() {
            self.crown_bracket_winner(tx, &mut tournament, &mut report, winner)
                .await?;
        }

        if tournament.format == TournamentFormat::GroupStageElimination
            && report.updated.stage == Stage::GroupStage
        {
            report.playoff_matches = self.seed_playoffs(tx, &tournament).await?;
        }

        Ok(report)
    }

    /// End the tournament when the final of a terminal stage is decided
    async fn crown_bracket_winner(
        &self,
        tx: &mut dyn StoreTransaction,
        tournament: &mut Tournament,
        report: &mut ProgressionReport,
        winner: TeamId,
    ) -> TournamentResult<()> {
        let stage = report.updated.stage;
        if !stage.is_terminal() {
            return Ok(());
        }
        if stage == Stage::DoubleElimination {
            log::warn!(
                "Tournament {}: losers bracket is not generated, finalize manually",
                tournament.id
            );
            return Ok(());
        }
        if tx.count_bracket_roots(tournament.id, stage).await? != 1 {
            return Ok(());
        }

        tournament.crown(winner)?;
        tx.update_tournament(tournament).await?;
        report.champion = Some(winner);
        log::info!("Tournament {}: team {} is champion", tournament.id, winner);
        Ok(())
    }

    /// Crown the leader once every round-robin match is played
    async fn close_round_robin(
        &self,
        tx: &mut dyn StoreTransaction,
        tournament: &mut Tournament,
        report: &mut ProgressionReport,
    ) -> TournamentResult<()> {
        let unplayed = MatchFilter::new(tournament.id).played(false);
        if tx.count_matches(&unplayed).await? > 0 {
            return Ok(());
        }

        let standings = ranking::ranking(tx, tournament.id, None).await?;
        let Some(leader) = standings.first() else {
            return Ok(());
        };

        tournament.crown(leader.team_id)?;
        tx.update_tournament(tournament).await?;
        report.champion = Some(leader.team_id);
        log::info!(
            "Tournament {}: round robin complete, team {} is champion with {} points",
            tournament.id,
            leader.team_id,
            leader.points
        );
        Ok(())
    }

    /// Generate the playoff bracket once the last group match is played.
    ///
    /// Returns the number of playoff matches created.
    async fn seed_playoffs(
        &self,
        tx: &mut dyn StoreTransaction,
        tournament: &Tournament,
    ) -> TournamentResult<usize> {
        let group_stage = MatchFilter::new(tournament.id).stage(Stage::GroupStage);
        if tx.count_matches(&group_stage.played(false)).await? > 0 {
            return Ok(0);
        }
        let playoffs = MatchFilter::new(tournament.id).stage(Stage::Playoffs);
        if tx.count_matches(&playoffs).await? > 0 {
            return Ok(0);
        }

        let standings = ranking::group_rankings(tx, tournament.id).await?;
        let qualifiers: Vec<TeamId> = standings
            .into_iter()
            .flat_map(|(_, scores)| {
                let per_group = self.qualifiers_per_group(scores.len());
                scores.into_iter().take(per_group).map(|score| score.team_id)
            })
            .collect();

        log::info!(
            "Tournament {}: group stage complete, {} teams qualified",
            tournament.id,
            qualifiers.len()
        );
        if qualifiers.len() < 2 {
            log::warn!(
                "Tournament {}: not enough qualifiers for playoffs",
                tournament.id
            );
            return Ok(0);
        }

        self.generator
            .generate_elimination_phase(
                tx,
                tournament.id,
                &qualifiers,
                1,
                Stage::Playoffs,
                BracketTag::Main,
            )
            .await
    }

    /// Teams advancing from a group of `group_size`: the configured count,
    /// but at least one and never the whole group
    pub fn qualifiers_per_group(&self, group_size: usize) -> usize {
        self.config
            .qualifiers_per_group
            .min(group_size.saturating_sub(1))
            .max(1)
    }
}

/// Seat `team_id` in `slot` of `match_id`
async fn advance(
    tx: &mut dyn StoreTransaction,
    match_id: MatchId,
    slot: SlotType,
    team_id: TeamId,
) -> TournamentResult<SlotFill> {
    let mut target = tx
        .get_match_for_update(match_id)
        .await?
        .ok_or(TournamentError::MatchNotFound(match_id))?;
    target.seat(slot, team_id)?;
    tx.update_match(&target).await?;

    let ready = target.is_ready();
    log::debug!("Team {team_id} advances to {slot} of match {match_id}");
    if ready {
        log::info!(
            "Match {} (round {}) is ready: team {:?} vs team {:?}",
            match_id,
            target.round,
            target.team_a_id,
            target.team_b_id
        );
    }

    Ok(SlotFill {
        match_id,
        slot,
        team_id,
        ready,
    })
}
