use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;
use std::sync::Arc;
use tourney_engine::db::MemoryTournamentStore;
use tourney_engine::tournament::{
    EngineConfig, MatchScheduleGenerator, NewTournament, TeamId, TournamentFormat,
    TournamentLifecycle, WinnerSide, topology,
};

fn entrants(n: usize) -> Vec<TeamId> {
    (1..=n as i64).collect()
}

/// Benchmark elimination topology for different field sizes
fn bench_elimination_topology(c: &mut Criterion) {
    let mut group = c.benchmark_group("elimination_topology");

    for n_teams in [8, 37, 128, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_teams", n_teams)),
            n_teams,
            |b, &n| {
                let teams = entrants(n);
                b.iter(|| topology::elimination_bracket(black_box(&teams), 1));
            },
        );
    }

    group.finish();
}

/// Benchmark the circle method
fn bench_round_robin(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_robin_rounds");

    for n_teams in [6, 21, 64].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_teams", n_teams)),
            n_teams,
            |b, &n| {
                let teams = entrants(n);
                b.iter(|| topology::round_robin_rounds(black_box(&teams)));
            },
        );
    }

    group.finish();
}

/// Benchmark planning a shuffled single elimination
fn bench_plan_single_elimination(c: &mut Criterion) {
    let generator = MatchScheduleGenerator::new(StdRng::seed_from_u64(1));
    let teams = entrants(256);
    c.bench_function("plan_single_elimination_256", |b| {
        b.iter(|| generator.plan_single_elimination(1, black_box(&teams)));
    });
}

/// Benchmark a full 64-team single elimination on the in-memory store
fn bench_play_single_elimination(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to build runtime");

    c.bench_function("play_single_elimination_64", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let lifecycle = TournamentLifecycle::new(
                    Arc::new(MemoryTournamentStore::new()),
                    EngineConfig::default().with_seed(3),
                );
                let cup = lifecycle
                    .create_tournament(NewTournament::new(
                        "Bench",
                        TournamentFormat::SingleElimination,
                        64,
                    ))
                    .await
                    .unwrap();
                for i in 0..64 {
                    let team = lifecycle.create_team(&format!("team{i}"), None).await.unwrap();
                    lifecycle.register_team(cup.id, team.id).await.unwrap();
                }
                lifecycle.start_tournament(cup.id).await.unwrap();

                loop {
                    let ready = lifecycle.ready_matches(cup.id).await.unwrap();
                    if ready.is_empty() {
                        break;
                    }
                    for record in ready {
                        lifecycle
                            .submit_match_result(record.id, 1, 0, WinnerSide::A)
                            .await
                            .unwrap();
                    }
                }
            })
        });
    });
}

criterion_group!(
    topology_benches,
    bench_elimination_topology,
    bench_round_robin,
    bench_plan_single_elimination,
);

criterion_group!(progression_benches, bench_play_single_elimination);

criterion_main!(topology_benches, progression_benches);
