//! Criterion benchmarks for the scoring hot paths.
//!
//! Benchmarks:
//! 1. Ranking pass over universes of increasing size
//! 2. Full evaluation of every built-in profile on one ticker
//! 3. Trend template alone

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use leadscan_core::domain::Bar;
use leadscan_core::fixtures::{bars_from_closes, leader_bars};
use leadscan_core::ranking::RsRanker;
use leadscan_core::strategy::{presets, EvalContext};
use leadscan_core::template::{evaluate_template, TemplateVariant};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_universe(tickers: usize, n: usize) -> Vec<(String, Vec<Bar>)> {
    (0..tickers)
        .map(|t| {
            let closes: Vec<f64> = (0..n)
                .map(|i| 100.0 + t as f64 + (i as f64 * 0.05 + t as f64).sin() * 10.0 + i as f64 * 0.01 * t as f64)
                .collect();
            (format!("SYM{t}"), bars_from_closes(&closes))
        })
        .collect()
}

// ── 1. Ranking ───────────────────────────────────────────────────────

fn bench_ranking(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    for size in [50, 500, 2_000] {
        let universe = make_universe(size, 300);
        group.bench_with_input(BenchmarkId::from_parameter(size), &universe, |b, u| {
            b.iter(|| {
                RsRanker::new().rank(black_box(u).iter().map(|(t, bars)| (t.as_str(), bars.as_slice())))
            })
        });
    }
    group.finish();
}

// ── 2. Profiles ──────────────────────────────────────────────────────

fn bench_profiles(c: &mut Criterion) {
    let bars = leader_bars();
    let as_of = bars[bars.len() - 1].date;
    let ctx = EvalContext::with_rs(Some(97));
    let mut group = c.benchmark_group("evaluate");
    for profile in presets::all() {
        group.bench_function(profile.id.clone(), |b| {
            b.iter(|| profile.evaluate("LEAD", as_of, black_box(&bars), &ctx))
        });
    }
    group.finish();
}

// ── 3. Template ──────────────────────────────────────────────────────

fn bench_template(c: &mut Criterion) {
    let bars = leader_bars();
    c.bench_function("template_classic", |b| {
        b.iter(|| evaluate_template(black_box(&bars), TemplateVariant::Classic))
    });
}

criterion_group!(benches, bench_ranking, bench_profiles, bench_template);
criterion_main!(benches);
