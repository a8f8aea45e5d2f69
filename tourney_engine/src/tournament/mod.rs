//! Tournament module for bracket generation and result progression.
//!
//! This module provides:
//! - Schedule generation for single and double elimination, round robin,
//!   Swiss and group stage tournaments
//! - Bracket advancement as results are submitted
//! - Standings, group qualification and automatic playoffs
//! - Champion detection
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tourney_engine::db::MemoryTournamentStore;
//! use tourney_engine::tournament::{
//!     EngineConfig, NewTournament, TournamentFormat, TournamentLifecycle, WinnerSide,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryTournamentStore::new());
//!     let lifecycle = TournamentLifecycle::new(store, EngineConfig::default());
//!
//!     let cup = lifecycle
//!         .create_tournament(NewTournament::new("Spring Cup", TournamentFormat::SingleElimination, 8))
//!         .await?;
//!     for name in ["Falcons", "Vipers", "Wolves", "Herons"] {
//!         let team = lifecycle.create_team(name, None).await?;
//!         lifecycle.register_team(cup.id, team.id).await?;
//!     }
//!
//!     lifecycle.start_tournament(cup.id).await?;
//!     for ready in lifecycle.ready_matches(cup.id).await? {
//!         lifecycle.submit_match_result(ready.id, 2, 1, WinnerSide::A).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod errors;
pub mod generator;
pub mod lifecycle;
pub mod models;
pub mod progression;
pub mod ranking;
pub mod topology;

pub use config::{ConfigError, EngineConfig};
pub use errors::{TournamentError, TournamentResult};
pub use generator::{MatchScheduleGenerator, PlannedLink, SchedulePlan};
pub use lifecycle::{StartSummary, TournamentLifecycle};
pub use models::{
    BracketSlot, BracketSlotId, BracketTag, Match, MatchFilter, MatchId, MatchState,
    MatchWithEdges, NewBracketSlot, NewMatch, NewTournament, SlotType, SourceOutcome, Stage,
    Team, TeamId, TeamScore, Tournament, TournamentFormat, TournamentId, TournamentStatus,
    TournamentWithTeams, WinnerSide,
};
pub use progression::{MatchProgressionEngine, ProgressionReport, SlotFill};
