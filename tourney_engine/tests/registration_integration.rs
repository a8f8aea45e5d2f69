//! Integration tests for tournament creation and team registration.

use std::sync::Arc;

use tourney_engine::db::MemoryTournamentStore;
use tourney_engine::tournament::{
    EngineConfig, NewTournament, TournamentError, TournamentFormat, TournamentLifecycle,
    TournamentStatus,
};

type Lifecycle = TournamentLifecycle<MemoryTournamentStore>;

fn lifecycle() -> Lifecycle {
    TournamentLifecycle::new(Arc::new(MemoryTournamentStore::new()), EngineConfig::default())
}

#[tokio::test]
async fn test_create_tournament_validation() {
    let lifecycle = lifecycle();

    let err = lifecycle
        .create_tournament(NewTournament::new("Tiny", TournamentFormat::RoundRobin, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidConfiguration(_)));

    let err = lifecycle
        .create_tournament(NewTournament::new("  ", TournamentFormat::RoundRobin, 8))
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidConfiguration(_)));

    let tournament = lifecycle
        .create_tournament(NewTournament::new("Open", TournamentFormat::RoundRobin, 8))
        .await
        .unwrap();
    assert_eq!(tournament.status, TournamentStatus::Pending);
    assert_eq!(tournament.champion_id, None);
    assert!(tournament.started_at.is_none());
}

#[tokio::test]
async fn test_registration_errors() {
    let lifecycle = lifecycle();
    let tournament = lifecycle
        .create_tournament(NewTournament::new("Duo", TournamentFormat::SingleElimination, 2))
        .await
        .unwrap();
    let first = lifecycle.create_team("Falcons", Some("FLC")).await.unwrap();
    let second = lifecycle.create_team("Vipers", None).await.unwrap();
    let third = lifecycle.create_team("Wolves", None).await.unwrap();

    assert!(matches!(
        lifecycle.register_team(999, first.id).await,
        Err(TournamentError::TournamentNotFound(999))
    ));
    assert!(matches!(
        lifecycle.register_team(tournament.id, 999).await,
        Err(TournamentError::TeamNotFound(999))
    ));

    lifecycle.register_team(tournament.id, first.id).await.unwrap();
    assert!(matches!(
        lifecycle.register_team(tournament.id, first.id).await,
        Err(TournamentError::AlreadyRegistered { team_id }) if team_id == first.id
    ));

    lifecycle.register_team(tournament.id, second.id).await.unwrap();
    assert!(matches!(
        lifecycle.register_team(tournament.id, third.id).await,
        Err(TournamentError::TournamentFull { max_teams: 2 })
    ));

    let loaded = lifecycle.get_tournament(tournament.id).await.unwrap();
    assert_eq!(loaded.team_ids(), vec![first.id, second.id]);
}

#[tokio::test]
async fn test_unregister_before_start_only() {
    let lifecycle = lifecycle();
    let tournament = lifecycle
        .create_tournament(NewTournament::new("Trio", TournamentFormat::RoundRobin, 3))
        .await
        .unwrap();
    let mut teams = Vec::new();
    for name in ["Alpha", "Bravo", "Charlie"] {
        let team = lifecycle.create_team(name, None).await.unwrap();
        lifecycle.register_team(tournament.id, team.id).await.unwrap();
        teams.push(team.id);
    }

    lifecycle.unregister_team(tournament.id, teams[1]).await.unwrap();
    assert!(matches!(
        lifecycle.unregister_team(tournament.id, teams[1]).await,
        Err(TournamentError::NotRegistered { .. })
    ));
    // the freed place can be taken again
    lifecycle.register_team(tournament.id, teams[1]).await.unwrap();

    lifecycle.start_tournament(tournament.id).await.unwrap();
    assert!(matches!(
        lifecycle.unregister_team(tournament.id, teams[0]).await,
        Err(TournamentError::TournamentAlreadyStarted(_))
    ));

    let late = lifecycle.create_team("Delta", None).await.unwrap();
    assert!(matches!(
        lifecycle.register_team(tournament.id, late.id).await,
        Err(TournamentError::TournamentAlreadyStarted(_))
    ));
}

#[tokio::test]
async fn test_concurrent_registrations_respect_capacity() {
    let lifecycle = lifecycle();
    let tournament = lifecycle
        .create_tournament(NewTournament::new("Rush", TournamentFormat::SingleElimination, 4))
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..10 {
        let lifecycle = lifecycle.clone();
        let tournament_id = tournament.id;
        tasks.spawn(async move {
            let team = lifecycle.create_team(&format!("Team {i}"), None).await?;
            lifecycle.register_team(tournament_id, team.id).await
        });
    }

    let mut registered = 0;
    let mut full = 0;
    while let Some(outcome) = tasks.join_next().await {
        match outcome.unwrap() {
            Ok(()) => registered += 1,
            Err(TournamentError::TournamentFull { .. }) => full += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((registered, full), (4, 6));

    let loaded = lifecycle.get_tournament(tournament.id).await.unwrap();
    assert_eq!(loaded.teams.len(), 4);
}

#[tokio::test]
async fn test_reads_of_unknown_tournament() {
    let lifecycle = lifecycle();
    assert!(matches!(
        lifecycle.get_tournament(7).await,
        Err(TournamentError::TournamentNotFound(7))
    ));
    assert!(matches!(
        lifecycle.list_matches(7).await,
        Err(TournamentError::TournamentNotFound(7))
    ));
    assert!(matches!(
        lifecycle.get_ranking(7, None).await,
        Err(TournamentError::TournamentNotFound(7))
    ));
    assert!(matches!(
        lifecycle.finalize_tournament(7, 1).await,
        Err(TournamentError::TournamentNotFound(7))
    ));
}
