//! Benchmarks for the pairwise judging tournament and preference scoring.
//!
//! Run with: `cargo bench -p ranksight-core --bench tournament`
//!
//! The judge here answers instantly, so these numbers measure tournament
//! bookkeeping (pair generation, verdict remapping, canonicalisation) and
//! preference computation, not model latency.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ranksight_core::config::{judge_calls_for, TOP_K_JUDGE};
use ranksight_core::error::JudgeError;
use ranksight_core::judge::{
    Comparison, Judge, PairwiseTournament, ProjectProfile, TournamentConfig, Verdict,
};
use ranksight_core::preference::compute_preferences;
use ranksight_core::search::{ProjectId, QueryId};

/// Judge that prefers the lower project id, independent of position.
struct LowerIdJudge;

#[async_trait(?Send)]
impl Judge for LowerIdJudge {
    fn model_id(&self) -> &str {
        "bench"
    }

    async fn compare(
        &self,
        _query_text: &str,
        left: &ProjectProfile,
        right: &ProjectProfile,
    ) -> Result<Comparison, JudgeError> {
        let verdict = if left.id < right.id {
            Verdict::Left
        } else {
            Verdict::Right
        };
        Ok(Comparison::new(verdict, "lower id"))
    }
}

fn candidates(n: usize) -> Vec<ProjectProfile> {
    (0..n as u64)
        .map(|i| {
            let mut p = ProjectProfile::new(ProjectId::from_u64(i));
            p.industry = Some("Fintech".to_string());
            p.skills = vec!["Rust".to_string(), "React".to_string()];
            p
        })
        .collect()
}

/// Benchmark: full tournament at varying candidate counts
fn bench_tournament(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let judge = LowerIdJudge;

    let mut group = c.benchmark_group("tournament/run");
    group.sample_size(50);

    for n in [5, TOP_K_JUDGE, 20] {
        let profiles = candidates(n);
        group.throughput(Throughput::Elements(judge_calls_for(n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &profiles, |b, profiles| {
            b.iter(|| {
                rt.block_on(async {
                    PairwiseTournament::new(&judge)
                        .run(QueryId::from_u64(1), black_box("rust fintech"), profiles)
                        .await
                })
            });
        });
    }
    group.finish();
}

/// Benchmark: tournament with buffered concurrency
fn bench_tournament_concurrency(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let judge = LowerIdJudge;
    let profiles = candidates(TOP_K_JUDGE);

    let mut group = c.benchmark_group("tournament/concurrency");
    group.sample_size(50);

    for concurrency in [1, 4, 16] {
        let config = TournamentConfig { concurrency };
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &config,
            |b, config| {
                b.iter(|| {
                    rt.block_on(async {
                        PairwiseTournament::with_config(&judge, *config)
                            .run(QueryId::from_u64(1), "rust fintech", &profiles)
                            .await
                    })
                });
            },
        );
    }
    group.finish();
}

/// Benchmark: preference scores from a complete set of judgments
fn bench_preferences(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let judge = LowerIdJudge;

    let mut group = c.benchmark_group("preference/compute");

    for n in [5, TOP_K_JUDGE, 20] {
        let profiles = candidates(n);
        let report = rt.block_on(
            PairwiseTournament::new(&judge).run(QueryId::from_u64(1), "q", &profiles),
        );
        // Retrieval order is the reverse of the judge's preference
        let order: Vec<ProjectId> = profiles.iter().rev().map(|p| p.id).collect();

        group.bench_with_input(BenchmarkId::from_parameter(n), &report, |b, report| {
            b.iter(|| {
                compute_preferences(
                    QueryId::from_u64(1),
                    black_box(&report.judgments),
                    black_box(&order),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_tournament,
    bench_tournament_concurrency,
    bench_preferences,
);
criterion_main!(benches);
