//! Performance benchmarks for STRAINLAB

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strainlab::genetics::diversity::calculate_metrics;
use strainlab::genetics::{CannabisGenotype, GeneCatalog, PhenotypeEngine};
use strainlab::{BreedingMethod, Config, EnvironmentalConditions, GeneticsEngine, StrainProfile};

fn engine_with_population(size: usize) -> (GeneticsEngine, String, String) {
    let mut engine = GeneticsEngine::new_with_seed(Config::default(), 42);
    let strains = [
        StrainProfile::strain_a(),
        StrainProfile::strain_b(),
        StrainProfile::ruderalis_line(),
    ];
    for i in 0..size.max(2) {
        engine.create_founder(&strains[i % strains.len()]).unwrap();
    }
    let ids = engine.repository().genotype_ids();
    (engine, ids[0].clone(), ids[1].clone())
}

fn benchmark_perform_breeding(c: &mut Criterion) {
    let mut group = c.benchmark_group("perform_breeding");

    for population in [10, 100, 500].iter() {
        let (mut engine, p1, p2) = engine_with_population(*population);

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                b.iter(|| {
                    engine
                        .perform_breeding(&p1, &p2, BreedingMethod::StandardCross)
                        .unwrap()
                });
            },
        );
    }

    group.finish();
}

fn benchmark_phenotype(c: &mut Criterion) {
    let catalog = GeneCatalog::fully_unlocked();
    let config = Config::default();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let genotype =
        CannabisGenotype::founder(&StrainProfile::strain_a(), &catalog, 0.05, &mut rng);
    let engine = PhenotypeEngine::new(config.adaptation);
    let heat = EnvironmentalConditions::new(34.0, 45.0, 1300.0, 400.0);

    c.bench_function("express_phenotype", |b| {
        b.iter(|| engine.express(black_box(&genotype), &catalog, None));
    });

    c.bench_function("express_phenotype_stressed", |b| {
        b.iter(|| engine.express(black_box(&genotype), &catalog, Some(&heat)));
    });
}

fn benchmark_diversity(c: &mut Criterion) {
    let mut group = c.benchmark_group("diversity");
    let config = Config::default();

    for population in [100, 1000].iter() {
        let (engine, _, _) = engine_with_population(*population);
        let genotypes: Vec<&CannabisGenotype> = engine.repository().genotypes().collect();

        group.bench_with_input(
            BenchmarkId::new("population", population),
            population,
            |b, _| {
                b.iter(|| calculate_metrics(black_box(&genotypes), &config.diversity));
            },
        );
    }

    group.finish();
}

fn benchmark_adaptation_tick(c: &mut Criterion) {
    let (mut engine, _, _) = engine_with_population(200);
    let heat = EnvironmentalConditions::new(34.0, 45.0, 1300.0, 400.0);

    c.bench_function("adaptation_tick_200", |b| {
        b.iter(|| engine.process_adaptation_tick(black_box(&heat), 1.0));
    });
}

criterion_group!(
    benches,
    benchmark_perform_breeding,
    benchmark_phenotype,
    benchmark_diversity,
    benchmark_adaptation_tick,
);
criterion_main!(benches);
