//! Criterion benchmarks for motif enumeration and null-model generation.
//!
//! Run with:
//! ```bash
//! cargo bench --bench motif_enumeration
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use food_web_cascades::motifs::{count_shared_prey, enumerate_chains, null_model};
use food_web_cascades::utils::seeding::unit_rng;
use food_web_cascades::{simulate_extinctions, FoodWeb, Species, Taxon};
use rand::seq::SliceRandom;

/// Random web of `n` species with about `3n` links
fn random_web(n: usize, seed: u64) -> FoodWeb {
    let taxa = [Taxon::Bird, Taxon::Mammal, Taxon::Reptile, Taxon::Other];
    let mut reference = FoodWeb::new();
    for i in 0..n {
        reference.add_species(Species::new(format!("sp{}", i), taxa[i % taxa.len()])).unwrap();
    }
    for i in 0..n {
        for j in 1..=3 {
            let target = (i + j * 7) % n;
            if target != i {
                reference.add_interaction(&format!("sp{}", i), &format!("sp{}", target), 1.0).unwrap();
            }
        }
    }
    let mut rng = unit_rng(seed, &[]);
    null_model(&reference, &mut rng).unwrap()
}

fn bench_shared_prey(c: &mut Criterion) {
    let mut group = c.benchmark_group("motifs/shared_prey");
    for &n in &[50usize, 100, 200] {
        let web = random_web(n, 1);
        group.bench_with_input(BenchmarkId::from_parameter(n), &web, |b, web| {
            b.iter(|| count_shared_prey(web))
        });
    }
    group.finish();
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("motifs/chain");
    for &n in &[50usize, 100, 200] {
        let web = random_web(n, 2);
        group.bench_with_input(BenchmarkId::from_parameter(n), &web, |b, web| {
            b.iter(|| enumerate_chains(web))
        });
    }
    group.finish();
}

fn bench_null_model(c: &mut Criterion) {
    let web = random_web(200, 3);
    c.bench_function("motifs/null_model/200", |b| {
        let mut rng = unit_rng(4, &[]);
        b.iter(|| null_model(&web, &mut rng).unwrap())
    });
}

fn bench_cascade(c: &mut Criterion) {
    let web = random_web(200, 5);
    let mut order: Vec<_> = web.node_indices().collect();
    order.shuffle(&mut unit_rng(6, &[]));
    c.bench_function("cascade/simulate/200", |b| {
        b.iter(|| simulate_extinctions(&web, &order, 0.7).unwrap())
    });
}

criterion_group!(benches, bench_shared_prey, bench_chain, bench_null_model, bench_cascade);
criterion_main!(benches);
