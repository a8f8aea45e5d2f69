//! Tournament data models: tournaments, teams, matches and bracket slots.

use super::errors::{TournamentError, TournamentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;
/// Team ID type
pub type TeamId = i64;
/// Match ID type
pub type MatchId = i64;
/// Bracket slot ID type
pub type BracketSlotId = i64;

/// Implements `as_str`, `Display` and `FromStr` for enums stored as text.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Canonical text form, as stored in the database
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TournamentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(TournamentError::Corrupted(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

/// Tournament format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentFormat {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    Swiss,
    GroupStageElimination,
}

text_enum!(TournamentFormat {
    SingleElimination => "SINGLE_ELIMINATION",
    DoubleElimination => "DOUBLE_ELIMINATION",
    RoundRobin => "ROUND_ROBIN",
    Swiss => "SWISS",
    GroupStageElimination => "GROUP_STAGE_ELIMINATION",
});

/// Tournament status. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TournamentStatus {
    /// Accepting registrations
    Pending,
    /// Matches generated, results coming in
    InProgress,
    /// Champion declared
    Ended,
}

text_enum!(TournamentStatus {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Ended => "ENDED",
});

/// Named phase of a tournament
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
    SwissStage,
    GroupStage,
    Playoffs,
}

text_enum!(Stage {
    SingleElimination => "SINGLE_ELIMINATION",
    DoubleElimination => "DOUBLE_ELIMINATION",
    RoundRobin => "ROUND_ROBIN",
    SwissStage => "SWISS_STAGE",
    GroupStage => "GROUP_STAGE",
    Playoffs => "PLAYOFFS",
});

impl Stage {
    /// Whether the root match of this stage decides the tournament
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::SingleElimination | Stage::DoubleElimination | Stage::Playoffs
        )
    }
}

/// Which side of a bracket a match belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BracketTag {
    Winners,
    Losers,
    Main,
}

text_enum!(BracketTag {
    Winners => "WINNERS",
    Losers => "LOSERS",
    Main => "MAIN",
});

/// Side of a match a bracket slot fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotType {
    TeamA,
    TeamB,
}

text_enum!(SlotType {
    TeamA => "TEAM_A_SLOT",
    TeamB => "TEAM_B_SLOT",
});

impl SlotType {
    /// Slot fed by the match at `position` within its round: even positions
    /// feed side A, odd positions side B.
    pub fn for_position(position: usize) -> Self {
        if position % 2 == 0 {
            SlotType::TeamA
        } else {
            SlotType::TeamB
        }
    }
}

/// Which team of the source match advances through a bracket slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceOutcome {
    Winner,
    Loser,
}

text_enum!(SourceOutcome {
    Winner => "WINNER",
    Loser => "LOSER",
});

/// Side declared as winner when submitting a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinnerSide {
    A,
    B,
}

impl WinnerSide {
    /// Slot holding the winning team
    pub fn slot(&self) -> SlotType {
        match self {
            WinnerSide::A => SlotType::TeamA,
            WinnerSide::B => SlotType::TeamB,
        }
    }
}

impl FromStr for WinnerSide {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(WinnerSide::A),
            "B" | "b" => Ok(WinnerSide::B),
            other => Err(TournamentError::InvalidResult(format!(
                "winner side must be A or B, got '{other}'"
            ))),
        }
    }
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    /// Registration cap
    pub max_teams: u32,
    pub champion_id: Option<TeamId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Move a pending tournament into play
    pub fn mark_started(&mut self) -> TournamentResult<()> {
        if self.status != TournamentStatus::Pending {
            return Err(TournamentError::TournamentAlreadyStarted(self.id));
        }
        self.status = TournamentStatus::InProgress;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Declare the champion and end the tournament
    pub fn crown(&mut self, champion_id: TeamId) -> TournamentResult<()> {
        if self.status != TournamentStatus::InProgress {
            return Err(TournamentError::InvalidState {
                expected: TournamentStatus::InProgress,
                actual: self.status,
            });
        }
        self.champion_id = Some(champion_id);
        self.status = TournamentStatus::Ended;
        self.ended_at = Some(Utc::now());
        Ok(())
    }
}

/// Input for creating a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub format: TournamentFormat,
    pub max_teams: u32,
}

impl NewTournament {
    pub fn new(name: impl Into<String>, format: TournamentFormat, max_teams: u32) -> Self {
        Self {
            name: name.into(),
            format,
            max_teams,
        }
    }
}

/// Team record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub tag: Option<String>,
}

/// Tournament together with its registered teams, in registration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentWithTeams {
    pub tournament: Tournament,
    pub teams: Vec<Team>,
}

impl TournamentWithTeams {
    pub fn team_ids(&self) -> Vec<TeamId> {
        self.teams.iter().map(|team| team.id).collect()
    }

    pub fn is_registered(&self, team_id: TeamId) -> bool {
        self.teams.iter().any(|team| team.id == team_id)
    }
}

/// Progress of a match towards being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchState {
    /// Placeholder waiting for both teams
    EmptySlots,
    /// One team seated
    PartiallyFilled,
    /// Both teams seated, awaiting a result
    Ready,
    Played,
}

/// Match record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: i32,
    pub stage: Stage,
    pub group_name: Option<String>,
    pub bracket: Option<BracketTag>,
    pub team_a_id: Option<TeamId>,
    pub team_b_id: Option<TeamId>,
    pub score_a: i32,
    pub score_b: i32,
    pub winner_id: Option<TeamId>,
    pub played: bool,
}

impl Match {
    pub fn state(&self) -> MatchState {
        if self.played {
            return MatchState::Played;
        }
        match (self.team_a_id, self.team_b_id) {
            (Some(_), Some(_)) => MatchState::Ready,
            (None, None) => MatchState::EmptySlots,
            _ => MatchState::PartiallyFilled,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == MatchState::Ready
    }

    /// Team seated in the given slot
    pub fn team_in(&self, slot: SlotType) -> Option<TeamId> {
        match slot {
            SlotType::TeamA => self.team_a_id,
            SlotType::TeamB => self.team_b_id,
        }
    }

    /// Whether the team is seated on either side
    pub fn involves(&self, team_id: TeamId) -> bool {
        self.team_a_id == Some(team_id) || self.team_b_id == Some(team_id)
    }

    /// The other seated team
    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        if self.team_a_id == Some(team_id) {
            self.team_b_id
        } else if self.team_b_id == Some(team_id) {
            self.team_a_id
        } else {
            None
        }
    }

    /// Seat a team in a slot. Re-seating the same team is a no-op.
    pub fn seat(&mut self, slot: SlotType, team_id: TeamId) -> TournamentResult<()> {
        let seat = match slot {
            SlotType::TeamA => &mut self.team_a_id,
            SlotType::TeamB => &mut self.team_b_id,
        };
        match *seat {
            Some(existing) if existing != team_id => Err(TournamentError::SlotConflict {
                match_id: self.id,
                slot,
            }),
            _ => {
                *seat = Some(team_id);
                Ok(())
            }
        }
    }

    /// Record a result, returning `(winner, loser)`.
    ///
    /// Nothing is modified when validation fails.
    pub fn record_result(
        &mut self,
        score_a: i32,
        score_b: i32,
        side: WinnerSide,
    ) -> TournamentResult<(TeamId, TeamId)> {
        if self.played {
            return Err(TournamentError::MatchAlreadyPlayed(self.id));
        }
        if score_a < 0 || score_b < 0 {
            return Err(TournamentError::InvalidResult(format!(
                "scores must not be negative ({score_a}-{score_b})"
            )));
        }
        let winner = self.team_in(side.slot()).ok_or_else(|| {
            TournamentError::InvalidResult(format!(
                "no team seated on side {:?} of match {}",
                side, self.id
            ))
        })?;
        let loser = self.opponent_of(winner).ok_or_else(|| {
            TournamentError::InvalidResult(format!("match {} is missing an opponent", self.id))
        })?;

        self.score_a = score_a;
        self.score_b = score_b;
        self.winner_id = Some(winner);
        self.played = true;
        Ok((winner, loser))
    }
}

/// Match to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMatch {
    pub tournament_id: TournamentId,
    pub round: i32,
    pub stage: Stage,
    pub group_name: Option<String>,
    pub bracket: Option<BracketTag>,
    pub team_a_id: Option<TeamId>,
    pub team_b_id: Option<TeamId>,
}

impl NewMatch {
    /// Empty placeholder match
    pub fn new(tournament_id: TournamentId, stage: Stage, round: i32) -> Self {
        Self {
            tournament_id,
            round,
            stage,
            group_name: None,
            bracket: None,
            team_a_id: None,
            team_b_id: None,
        }
    }

    pub fn teams(mut self, team_a_id: TeamId, team_b_id: TeamId) -> Self {
        self.team_a_id = Some(team_a_id);
        self.team_b_id = Some(team_b_id);
        self
    }

    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn bracket(mut self, bracket: BracketTag) -> Self {
        self.bracket = Some(bracket);
        self
    }

    /// Turn into a persisted match with the given ID
    pub fn into_match(self, id: MatchId) -> Match {
        Match {
            id,
            tournament_id: self.tournament_id,
            round: self.round,
            stage: self.stage,
            group_name: self.group_name,
            bracket: self.bracket,
            team_a_id: self.team_a_id,
            team_b_id: self.team_b_id,
            score_a: 0,
            score_b: 0,
            winner_id: None,
            played: false,
        }
    }
}

/// Directed bracket edge: the outcome of `source_match_id` fills
/// `slot_type` of `match_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSlot {
    pub id: BracketSlotId,
    pub tournament_id: TournamentId,
    pub match_id: MatchId,
    pub slot_type: SlotType,
    pub source_match_id: MatchId,
    pub source_outcome: SourceOutcome,
}

/// Bracket slot to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBracketSlot {
    pub tournament_id: TournamentId,
    pub match_id: MatchId,
    pub slot_type: SlotType,
    pub source_match_id: MatchId,
    pub source_outcome: SourceOutcome,
}

/// Match loaded with its tournament and the edges it feeds
#[derive(Debug, Clone)]
pub struct MatchWithEdges {
    pub tournament: Tournament,
    pub record: Match,
    /// Bracket slots whose source is this match
    pub outgoing: Vec<BracketSlot>,
}

/// Query filter for matches of one tournament
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub tournament_id: TournamentId,
    pub stage: Option<Stage>,
    pub played: Option<bool>,
    pub group_name: Option<String>,
}

impl MatchFilter {
    pub fn new(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id,
            ..Default::default()
        }
    }

    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn played(mut self, played: bool) -> Self {
        self.played = Some(played);
        self
    }

    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    /// Whether a match satisfies every set criterion
    pub fn accepts(&self, record: &Match) -> bool {
        record.tournament_id == self.tournament_id
            && self.stage.is_none_or(|stage| record.stage == stage)
            && self.played.is_none_or(|played| record.played == played)
            && self
                .group_name
                .as_deref()
                .is_none_or(|group| record.group_name.as_deref() == Some(group))
    }
}

/// Standing of one team, computed from played matches and never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScore {
    pub team_id: TeamId,
    pub name: String,
    pub tag: String,
    pub victories: u32,
    pub defeats: u32,
    pub draws: u32,
    pub points: u32,
    pub score_difference: i64,
}

impl TeamScore {
    /// Zeroed standing for a team
    pub fn new(team: &Team) -> Self {
        Self {
            team_id: team.id,
            name: team.name.clone(),
            tag: team.tag.clone().unwrap_or_default(),
            victories: 0,
            defeats: 0,
            draws: 0,
            points: 0,
            score_difference: 0,
        }
    }
}
