//! Plays a whole tournament with random results.

use rand::Rng;
use rand::rngs::StdRng;
use serde::Serialize;
use tourney_engine::db::TournamentStore;
use tourney_engine::tournament::{
    NewTournament, Stage, TeamId, TeamScore, Tournament, TournamentFormat, TournamentLifecycle,
    TournamentResult, TournamentStatus, WinnerSide,
};

/// Summary of one played match
#[derive(Debug, Clone, Serialize)]
pub struct PlayedMatch {
    pub match_id: i64,
    pub stage: Stage,
    pub round: i32,
    pub group_name: Option<String>,
    pub team_a: String,
    pub team_b: String,
    pub score_a: i32,
    pub score_b: i32,
    pub winner: String,
}

/// Everything a finished simulation reports
#[derive(Debug, Clone, Serialize)]
pub struct SimulationOutcome {
    pub tournament: Tournament,
    pub champion: Option<String>,
    /// Champion picked from the standings rather than by the bracket
    pub finalized_by_ranking: bool,
    pub matches: Vec<PlayedMatch>,
    pub standings: Vec<TeamScore>,
}

/// Drives a tournament from creation to its champion
pub struct Simulation<S: TournamentStore> {
    lifecycle: TournamentLifecycle<S>,
    rng: StdRng,
    max_score: i32,
}

impl<S: TournamentStore> Simulation<S> {
    pub fn new(lifecycle: TournamentLifecycle<S>, rng: StdRng, max_score: i32) -> Self {
        Self {
            lifecycle,
            rng,
            max_score: max_score.max(1),
        }
    }

    /// Register `team_count` teams, start and play until nothing is ready
    pub async fn run(
        &mut self,
        format: TournamentFormat,
        team_count: usize,
    ) -> TournamentResult<SimulationOutcome> {
        let max_teams = u32::try_from(team_count).unwrap_or(u32::MAX);
        let tournament = self
            .lifecycle
            .create_tournament(NewTournament::new(
                format!("Simulated {format}"),
                format,
                max_teams,
            ))
            .await?;

        for i in 1..=team_count {
            let team = self
                .lifecycle
                .create_team(&format!("Team {i:02}"), Some(&format!("T{i:02}")))
                .await?;
            self.lifecycle.register_team(tournament.id, team.id).await?;
        }

        let summary = self.lifecycle.start_tournament(tournament.id).await?;
        log::info!(
            "Started {} with {} teams and {} matches",
            tournament.name,
            team_count,
            summary.matches_created
        );

        let loaded = self.lifecycle.get_tournament(tournament.id).await?;
        let name_of = |team_id: TeamId| {
            loaded
                .teams
                .iter()
                .find(|team| team.id == team_id)
                .map(|team| team.name.clone())
                .unwrap_or_else(|| format!("#{team_id}"))
        };

        let mut played = Vec::new();
        loop {
            let ready = self.lifecycle.ready_matches(tournament.id).await?;
            if ready.is_empty() {
                break;
            }

            for record in ready {
                let (score_a, score_b, side) = self.random_result();
                let report = self
                    .lifecycle
                    .submit_match_result(record.id, score_a, score_b, side)
                    .await?;
                let updated = report.updated;

                if report.playoff_matches > 0 {
                    log::info!(
                        "Group stage complete, {} playoff matches created",
                        report.playoff_matches
                    );
                }

                played.push(PlayedMatch {
                    match_id: updated.id,
                    stage: updated.stage,
                    round: updated.round,
                    group_name: updated.group_name.clone(),
                    team_a: updated.team_a_id.map(name_of).unwrap_or_default(),
                    team_b: updated.team_b_id.map(name_of).unwrap_or_default(),
                    score_a,
                    score_b,
                    winner: updated.winner_id.map(name_of).unwrap_or_default(),
                });
            }
        }

        let standings = self.lifecycle.get_ranking(tournament.id, None).await?;
        let mut tournament = self.lifecycle.get_tournament(tournament.id).await?.tournament;
        let mut finalized_by_ranking = false;

        if tournament.status != TournamentStatus::Ended {
            if let Some(leader) = standings.first() {
                log::warn!(
                    "{} did not produce a champion on its own, crowning ranking leader {}",
                    tournament.format,
                    leader.name
                );
                tournament = self
                    .lifecycle
                    .finalize_tournament(tournament.id, leader.team_id)
                    .await?;
                finalized_by_ranking = true;
            }
        }

        Ok(SimulationOutcome {
            champion: tournament.champion_id.map(name_of),
            tournament,
            finalized_by_ranking,
            matches: played,
            standings,
        })
    }

    /// Scores with a clear winner
    fn random_result(&mut self) -> (i32, i32, WinnerSide) {
        let winning = self.rng.random_range(1..=self.max_score);
        let losing = self.rng.random_range(0..winning);
        if self.rng.random_bool(0.5) {
            (winning, losing, WinnerSide::A)
        } else {
            (losing, winning, WinnerSide::B)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::Arc;
    use tourney_engine::db::MemoryTournamentStore;
    use tourney_engine::tournament::EngineConfig;

    fn simulation(config: EngineConfig) -> Simulation<MemoryTournamentStore> {
        let lifecycle = TournamentLifecycle::new(Arc::new(MemoryTournamentStore::new()), config);
        Simulation::new(lifecycle, StdRng::seed_from_u64(5), 16)
    }

    #[test]
    fn test_random_result_has_winner() {
        let mut sim = simulation(EngineConfig::default());
        for _ in 0..200 {
            let (a, b, side) = sim.random_result();
            match side {
                WinnerSide::A => assert!(a > b),
                WinnerSide::B => assert!(b > a),
            }
            assert!(a >= 0 && b >= 0 && a.max(b) <= 16);
        }
    }

    #[tokio::test]
    async fn test_single_elimination_crowns_bracket_winner() {
        let mut sim = simulation(EngineConfig::default().with_seed(1));
        let outcome = sim
            .run(TournamentFormat::SingleElimination, 6)
            .await
            .unwrap();

        assert_eq!(outcome.tournament.status, TournamentStatus::Ended);
        assert!(!outcome.finalized_by_ranking);
        assert_eq!(outcome.matches.len(), 5);
        assert!(outcome.champion.is_some());
    }

    #[tokio::test]
    async fn test_round_robin_plays_every_pairing() {
        let mut sim = simulation(EngineConfig::default().with_seed(2));
        let outcome = sim.run(TournamentFormat::RoundRobin, 5).await.unwrap();

        assert_eq!(outcome.tournament.status, TournamentStatus::Ended);
        assert_eq!(outcome.matches.len(), 10);
        assert_eq!(outcome.standings.len(), 5);
        assert_eq!(outcome.champion.as_deref(), Some(outcome.standings[0].name.as_str()));
    }

    #[tokio::test]
    async fn test_swiss_is_finalized_from_ranking() {
        let mut sim = simulation(EngineConfig::default().with_seed(3));
        let outcome = sim.run(TournamentFormat::Swiss, 8).await.unwrap();

        assert_eq!(outcome.tournament.status, TournamentStatus::Ended);
        assert!(outcome.finalized_by_ranking);
        assert_eq!(outcome.matches.len(), 4);
    }

    #[tokio::test]
    async fn test_group_stage_reaches_playoffs() {
        let mut config = EngineConfig::default().with_seed(4);
        config.group_count = 2;
        let mut sim = simulation(config);
        let outcome = sim
            .run(TournamentFormat::GroupStageElimination, 8)
            .await
            .unwrap();

        assert_eq!(outcome.tournament.status, TournamentStatus::Ended);
        assert!(!outcome.finalized_by_ranking);
        // two groups of four, then a four-team bracket
        let groups = outcome
            .matches
            .iter()
            .filter(|played| played.stage == Stage::GroupStage)
            .count();
        assert_eq!(groups, 12);
        assert_eq!(outcome.matches.len(), 15);
    }
}
