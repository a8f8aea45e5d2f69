//! Tournament error types.

use super::models::{MatchId, SlotType, TeamId, TournamentId, TournamentStatus};
use thiserror::Error;

/// Tournament errors
///
/// Every variant except `Database` describes a caller or input mistake and is
/// never worth retrying.
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Entrant count does not fit the tournament format
    #[error("Invalid tournament configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Matches were already generated for this tournament
    #[error("Tournament already started: {0}")]
    TournamentAlreadyStarted(TournamentId),

    #[error("Tournament not in correct state: expected {expected}, got {actual}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("Match already played: {0}")]
    MatchAlreadyPlayed(MatchId),

    /// Winner side does not map to a seated team, or a score is negative
    #[error("Invalid result: {0}")]
    InvalidResult(String),

    #[error("Team not found: {0}")]
    TeamNotFound(TeamId),

    #[error("Tournament is full ({max_teams} teams)")]
    TournamentFull { max_teams: u32 },

    #[error("Team {team_id} already registered")]
    AlreadyRegistered { team_id: TeamId },

    #[error("Team {team_id} is not registered")]
    NotRegistered { team_id: TeamId },

    /// A bracket slot is already occupied by another team
    #[error("Slot {slot} of match {match_id} is already taken")]
    SlotConflict { match_id: MatchId, slot: SlotType },

    /// Stored data could not be interpreted
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl TournamentError {
    /// Get a client-safe error message
    ///
    /// Database and corruption details are replaced with a generic message.
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Database(_) | TournamentError::Corrupted(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
