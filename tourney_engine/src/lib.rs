//! # Tourney Engine
//!
//! Bracket generation and result progression for eSports tournaments.
//!
//! A tournament collects registered teams, then generates its full match
//! schedule for the chosen format. Each submitted result is propagated
//! through the bracket: winners (and, where wired, losers) are seated in
//! later matches, finished group stages seed their playoffs, and a champion
//! is declared once the deciding match is played.
//!
//! ## Formats
//!
//! - **Single elimination**: power-of-two bracket, byes for missing entrants
//! - **Double elimination**: winners-bracket opening round
//! - **Round robin**: circle method, champion on points
//! - **Swiss**: random opening round
//! - **Group stage elimination**: equal groups, top teams enter a playoff bracket
//!
//! ## Core Modules
//!
//! - [`tournament`]: models, topology, generation, progression and ranking
//! - [`db`]: transactional storage (PostgreSQL and in-memory)

/// Transactional storage for tournaments.
pub mod db;

/// Tournament models and engine.
pub mod tournament;

pub use tournament::{
    EngineConfig, ProgressionReport, TournamentError, TournamentLifecycle, TournamentResult,
};
