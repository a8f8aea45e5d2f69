//! PostgreSQL tournament store.
//!
//! Enum columns are stored as their text form and parsed back on read; an
//! unknown value surfaces as `TournamentError::Corrupted`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};

use super::repository::{StoreTransaction, TournamentStore};
use crate::tournament::{
    BracketSlot, Match, MatchFilter, MatchId, MatchWithEdges, NewBracketSlot, NewMatch,
    NewTournament, Stage, Team, TeamId, Tournament, TournamentError, TournamentId,
    TournamentResult, TournamentWithTeams,
};

const TOURNAMENT_COLUMNS: &str =
    "id, name, format, status, max_teams, champion_id, created_at, started_at, ended_at";

const MATCH_COLUMNS: &str = "id, tournament_id, round, stage, group_name, bracket, \
     team_a_id, team_b_id, score_a, score_b, winner_id, played";

/// Rows per multi-row INSERT, well under the 65535 bind parameter limit
const MATCH_BATCH_ROWS: usize = 1000;

const SLOT_COLUMNS: &str =
    "id, tournament_id, match_id, slot_type, source_match_id, source_outcome";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: PgPool,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn begin(&self) -> TournamentResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx }))
    }
}

/// Transaction over a [`PgTournamentStore`]. Rolled back when dropped.
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

fn parse_text<T>(row: &PgRow, column: &str) -> TournamentResult<T>
where
    T: std::str::FromStr<Err = TournamentError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
}

fn parse_optional_text<T>(row: &PgRow, column: &str) -> TournamentResult<Option<T>>
where
    T: std::str::FromStr<Err = TournamentError>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|text| text.parse()).transpose()
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let max_teams: i32 = row.try_get("max_teams")?;
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        format: parse_text(row, "format")?,
        status: parse_text(row, "status")?,
        max_teams: u32::try_from(max_teams)
            .map_err(|_| TournamentError::Corrupted(format!("max_teams {max_teams}")))?,
        champion_id: row.try_get("champion_id")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
    })
}

fn team_from_row(row: &PgRow) -> TournamentResult<Team> {
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        tag: row.try_get("tag")?,
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    Ok(Match {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        round: row.try_get("round")?,
        stage: parse_text(row, "stage")?,
        group_name: row.try_get("group_name")?,
        bracket: parse_optional_text(row, "bracket")?,
        team_a_id: row.try_get("team_a_id")?,
        team_b_id: row.try_get("team_b_id")?,
        score_a: row.try_get("score_a")?,
        score_b: row.try_get("score_b")?,
        winner_id: row.try_get("winner_id")?,
        played: row.try_get("played")?,
    })
}

fn slot_from_row(row: &PgRow) -> TournamentResult<BracketSlot> {
    Ok(BracketSlot {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        match_id: row.try_get("match_id")?,
        slot_type: parse_text(row, "slot_type")?,
        source_match_id: row.try_get("source_match_id")?,
        source_outcome: parse_text(row, "source_outcome")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn count_from_row(row: &PgRow) -> TournamentResult<usize> {
    let count: i64 = row.try_get("count")?;
    usize::try_from(count).map_err(|_| TournamentError::Corrupted(format!("count {count}")))
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn create_tournament(&mut self, new: &NewTournament) -> TournamentResult<Tournament> {
        let max_teams = i32::try_from(new.max_teams).map_err(|_| {
            TournamentError::InvalidConfiguration(format!("max_teams {} too large", new.max_teams))
        })?;
        let row = sqlx::query(&format!(
            "INSERT INTO tournaments (name, format, status, max_teams)
             VALUES ($1, $2, 'PENDING', $3)
             RETURNING {TOURNAMENT_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.format.as_str())
        .bind(max_teams)
        .fetch_one(&mut *self.tx)
        .await?;

        tournament_from_row(&row)
    }

    async fn create_team(&mut self, name: &str, tag: Option<&str>) -> TournamentResult<Team> {
        let row = sqlx::query("INSERT INTO teams (name, tag) VALUES ($1, $2) RETURNING id, name, tag")
            .bind(name)
            .bind(tag)
            .fetch_one(&mut *self.tx)
            .await?;

        team_from_row(&row)
    }

    async fn get_team(&mut self, team_id: TeamId) -> TournamentResult<Option<Team>> {
        let row = sqlx::query("SELECT id, name, tag FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(team_from_row).transpose()
    }

    async fn get_tournament_with_teams(
        &mut self,
        tournament_id: TournamentId,
        for_update: bool,
    ) -> TournamentResult<Option<TournamentWithTeams>> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1{lock}"
        ))
        .bind(tournament_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let tournament = tournament_from_row(&row)?;

        let rows = sqlx::query(
            "SELECT t.id, t.name, t.tag
             FROM tournament_teams r
             JOIN teams t ON t.id = r.team_id
             WHERE r.tournament_id = $1
             ORDER BY r.id",
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        let teams = rows.iter().map(team_from_row).collect::<TournamentResult<_>>()?;
        Ok(Some(TournamentWithTeams { tournament, teams }))
    }

    async fn update_tournament(&mut self, tournament: &Tournament) -> TournamentResult<()> {
        let result = sqlx::query(
            "UPDATE tournaments
             SET status = $2, champion_id = $3, started_at = $4, ended_at = $5
             WHERE id = $1",
        )
        .bind(tournament.id)
        .bind(tournament.status.as_str())
        .bind(tournament.champion_id)
        .bind(tournament.started_at)
        .bind(tournament.ended_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::TournamentNotFound(tournament.id));
        }
        Ok(())
    }

    async fn register_team(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<()> {
        sqlx::query("INSERT INTO tournament_teams (tournament_id, team_id) VALUES ($1, $2)")
            .bind(tournament_id)
            .bind(team_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    TournamentError::AlreadyRegistered { team_id }
                } else {
                    TournamentError::Database(err)
                }
            })?;
        Ok(())
    }

    async fn unregister_team(
        &mut self,
        tournament_id: TournamentId,
        team_id: TeamId,
    ) -> TournamentResult<bool> {
        let result =
            sqlx::query("DELETE FROM tournament_teams WHERE tournament_id = $1 AND team_id = $2")
                .bind(tournament_id)
                .bind(team_id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_match(&mut self, new: &NewMatch) -> TournamentResult<Match> {
        let row = sqlx::query(&format!(
            "INSERT INTO matches (tournament_id, round, stage, group_name, bracket, team_a_id, team_b_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {MATCH_COLUMNS}"
        ))
        .bind(new.tournament_id)
        .bind(new.round)
        .bind(new.stage.as_str())
        .bind(new.group_name.as_deref())
        .bind(new.bracket.map(|tag| tag.as_str()))
        .bind(new.team_a_id)
        .bind(new.team_b_id)
        .fetch_one(&mut *self.tx)
        .await?;

        match_from_row(&row)
    }

    async fn create_matches_batch(&mut self, batch: &[NewMatch]) -> TournamentResult<Vec<Match>> {
        let mut created = Vec::with_capacity(batch.len());
        for chunk in batch.chunks(MATCH_BATCH_ROWS) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
                "WITH inserted AS (INSERT INTO matches \
                 (tournament_id, round, stage, group_name, bracket, team_a_id, team_b_id) ",
            );
            builder.push_values(chunk, |mut values, new| {
                values
                    .push_bind(new.tournament_id)
                    .push_bind(new.round)
                    .push_bind(new.stage.as_str())
                    .push_bind(new.group_name.as_deref())
                    .push_bind(new.bracket.map(|tag| tag.as_str()))
                    .push_bind(new.team_a_id)
                    .push_bind(new.team_b_id);
            });
            builder.push(format!(
                " RETURNING {MATCH_COLUMNS}) SELECT {MATCH_COLUMNS} FROM inserted ORDER BY id"
            ));

            let rows = builder.build().fetch_all(&mut *self.tx).await?;
            if rows.len() != chunk.len() {
                return Err(TournamentError::Corrupted(format!(
                    "inserted {} matches, expected {}",
                    rows.len(),
                    chunk.len()
                )));
            }
            for row in &rows {
                created.push(match_from_row(row)?);
            }
        }
        Ok(created)
    }

    async fn get_match(&mut self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
            .bind(match_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn get_match_for_update(&mut self, match_id: MatchId) -> TournamentResult<Option<Match>> {
        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
        ))
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn get_match_with_edges(
        &mut self,
        match_id: MatchId,
    ) -> TournamentResult<Option<MatchWithEdges>> {
        // lock order: tournament, then match
        let row = sqlx::query(&format!(
            "SELECT {TOURNAMENT_COLUMNS} FROM tournaments
             WHERE id = (SELECT tournament_id FROM matches WHERE id = $1)
             FOR UPDATE"
        ))
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let tournament = tournament_from_row(&row)?;

        let row = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1 FOR UPDATE"
        ))
        .bind(match_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let record = match_from_row(&row)?;

        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE source_match_id = $1 ORDER BY id"
        ))
        .bind(match_id)
        .fetch_all(&mut *self.tx)
        .await?;
        let outgoing = rows.iter().map(slot_from_row).collect::<TournamentResult<_>>()?;

        Ok(Some(MatchWithEdges {
            tournament,
            record,
            outgoing,
        }))
    }

    async fn update_match(&mut self, record: &Match) -> TournamentResult<()> {
        let result = sqlx::query(
            "UPDATE matches
             SET team_a_id = $2, team_b_id = $3, score_a = $4, score_b = $5,
                 winner_id = $6, played = $7
             WHERE id = $1",
        )
        .bind(record.id)
        .bind(record.team_a_id)
        .bind(record.team_b_id)
        .bind(record.score_a)
        .bind(record.score_b)
        .bind(record.winner_id)
        .bind(record.played)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TournamentError::MatchNotFound(record.id));
        }
        Ok(())
    }

    async fn list_matches(&mut self, filter: &MatchFilter) -> TournamentResult<Vec<Match>> {
        let rows = sqlx::query(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches
             WHERE tournament_id = $1
               AND ($2::TEXT IS NULL OR stage = $2)
               AND ($3::BOOLEAN IS NULL OR played = $3)
               AND ($4::TEXT IS NULL OR group_name = $4)
             ORDER BY id"
        ))
        .bind(filter.tournament_id)
        .bind(filter.stage.map(|stage| stage.as_str()))
        .bind(filter.played)
        .bind(filter.group_name.as_deref())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn count_matches(&mut self, filter: &MatchFilter) -> TournamentResult<usize> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM matches
             WHERE tournament_id = $1
               AND ($2::TEXT IS NULL OR stage = $2)
               AND ($3::BOOLEAN IS NULL OR played = $3)
               AND ($4::TEXT IS NULL OR group_name = $4)",
        )
        .bind(filter.tournament_id)
        .bind(filter.stage.map(|stage| stage.as_str()))
        .bind(filter.played)
        .bind(filter.group_name.as_deref())
        .fetch_one(&mut *self.tx)
        .await?;

        count_from_row(&row)
    }

    async fn count_bracket_roots(
        &mut self,
        tournament_id: TournamentId,
        stage: Stage,
    ) -> TournamentResult<usize> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM matches m
             WHERE m.tournament_id = $1
               AND m.stage = $2
               AND NOT EXISTS (SELECT 1 FROM bracket_slots s WHERE s.source_match_id = m.id)",
        )
        .bind(tournament_id)
        .bind(stage.as_str())
        .fetch_one(&mut *self.tx)
        .await?;

        count_from_row(&row)
    }

    async fn create_bracket_slots_batch(
        &mut self,
        slots: &[NewBracketSlot],
    ) -> TournamentResult<Vec<BracketSlot>> {
        let mut created = Vec::with_capacity(slots.len());
        for new in slots {
            let row = sqlx::query(&format!(
                "INSERT INTO bracket_slots (tournament_id, match_id, slot_type, source_match_id, source_outcome)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING {SLOT_COLUMNS}"
            ))
            .bind(new.tournament_id)
            .bind(new.match_id)
            .bind(new.slot_type.as_str())
            .bind(new.source_match_id)
            .bind(new.source_outcome.as_str())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    TournamentError::SlotConflict {
                        match_id: new.match_id,
                        slot: new.slot_type,
                    }
                } else {
                    TournamentError::Database(err)
                }
            })?;
            created.push(slot_from_row(&row)?);
        }
        Ok(created)
    }

    async fn list_bracket_slots(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<BracketSlot>> {
        let rows = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM bracket_slots WHERE tournament_id = $1 ORDER BY id"
        ))
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(slot_from_row).collect()
    }

    async fn list_distinct_group_names(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT group_name FROM matches
             WHERE tournament_id = $1 AND group_name IS NOT NULL
             ORDER BY group_name",
        )
        .bind(tournament_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| row.try_get("group_name").map_err(TournamentError::from))
            .collect()
    }

    async fn commit(self: Box<Self>) -> TournamentResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
