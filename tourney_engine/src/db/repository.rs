//! Repository trait definitions for testability and dependency injection.
//!
//! All reads and writes go through a [`StoreTransaction`] opened with
//! [`TournamentStore::begin`]. Writes become visible to other transactions
//! only after [`StoreTransaction::commit`]; dropping a transaction rolls it
//! back. Reads inside a transaction see that transaction's own writes.

use async_trait::async_trait;

use crate::tournament::{
    BracketSlot, Match, MatchFilter, MatchId, MatchWithEdges, NewBracketSlot, NewMatch,
    NewTournament, Stage, Team, TeamId, Tournament, TournamentId, TournamentResult,
    TournamentWithTeams,
};

/// Source of transactions over tournament data
#[async_trait]
pub trait TournamentStore: Send + Sync {
    /// Open a transaction
    async fn begin(&self) -> TournamentResult<Box<dyn StoreTransaction>>;
}

/// Unit of work over tournaments, teams, matches and bracket slots
#[async_trait]
pub trait StoreTransaction: Send {
    /// Create a tournament in `Pending` status
    async fn create_tournament(&mut self, new: &NewTournament) -> TournamentResult<Tournament>;

    /// Create a team
    async fn create_team(&mut self, name: &str, tag: Option<&str>) -> TournamentResult<Team>;

    /// Find a team by ID
    async fn get_team(&mut self, team_id: TeamId) -> TournamentResult<Option<Team>>;

    /// Load a tournament with its teams in registration order.
    ///
    /// With `for_update` the tournament row stays locked until the
    /// transaction ends, serializing registrations.
    async fn get_tournament_with_teams(
        &mut self,
        tournament_id: TournamentId,
        for_update: bool,
    ) -> TournamentResult<Option<TournamentWithTeams>>;

    /// Persist status, champion and timestamps of a tournament
    async fn update_tournament(&mut self, tournament: &Tournament) -> TournamentResult<()>;

    /// Register a team
    async fn register_team(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()>;

    /// Remove a registration, returning whether one existed
    async fn unregister_team(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<bool>;

    /// Create one match
    async fn create_match(&mut self, new: &NewMatch) -> TournamentResult<Match>;

    /// Create matches in order, returning them with their assigned IDs
    async fn create_matches_batch(&mut self, batch: &[NewMatch]) -> TournamentResult<Vec<Match>> {
        let mut created = Vec::with_capacity(batch.len());
        for new in batch {
            created.push(self.create_match(new).await?);
        }
        Ok(created)
    }

    /// Find a match by ID
    async fn get_match(&mut self, match_id: MatchId) -> TournamentResult<Option<Match>>;

    /// Find a match by ID and lock it until the transaction ends
    async fn get_match_for_update(&mut self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        self.get_match(match_id).await
    }

    /// Load a match with its tournament and the bracket slots it feeds.
    ///
    /// The tournament row and then the match row stay locked until the
    /// transaction ends. Submissions within one tournament are therefore
    /// serialized, and each one sees every result committed before it.
    async fn get_match_with_edges(
        &mut self,
        match_id: MatchId,
    ) -> TournamentResult<Option<MatchWithEdges>>;

    /// Persist teams, scores, winner and played flag of a match
    async fn update_match(&mut self, record: &Match) -> TournamentResult<()>;

    /// Matches accepted by the filter, ordered by ID
    async fn list_matches(&mut self, filter: &MatchFilter) -> TournamentResult<Vec<Match>>;

    /// Number of matches accepted by the filter
    async fn count_matches(&mut self, filter: &MatchFilter) -> TournamentResult<usize>;

    /// Number of matches in a stage that feed no bracket slot
    async fn count_bracket_roots(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
    ) -> TournamentResult<usize>;

    /// Create bracket slots. At most one slot may exist per
    /// `(match_id, slot_type)`.
    async fn create_bracket_slots_batch(
        &mut self,
        slots: &[NewBracketSlot],
    ) -> TournamentResult<Vec<BracketSlot>>;

    /// All bracket slots of a tournament, ordered by ID
    async fn list_bracket_slots(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketSlot>>;

    /// Distinct non-null group names of a tournament's matches, sorted
    async fn list_distinct_group_names(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<String>>;

    /// Make every write of this transaction visible
    async fn commit(self: Box<Self>) -> TournamentResult<()>;
}
