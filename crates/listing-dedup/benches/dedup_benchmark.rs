//! Normalization, scoring and full-pass benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use listing_dedup::normalization::{normalize_address, normalize_name};
use listing_dedup::{
    normalize, score_pair, BlockingStrategy, DeduplicationConfig, DeduplicationEngine,
    FieldWeights, Record,
};

const NAMES: [&str; 6] = [
    "Kingston Hardware",
    "Blue Mountain Coffee",
    "Island Grill",
    "Juici Patties",
    "Devon House Bakery",
    "Coronation Market Stall",
];
const CITIES: [&str; 4] = ["Kingston", "Montego Bay", "Ocho Rios", "Mandeville"];

/// Listings where roughly every fifth record repeats an earlier one with
/// formatting noise
fn generate_listings(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let base = if i % 5 == 4 { i - 1 } else { i };
            let name = format!("{} {}", NAMES[base % NAMES.len()], base / NAMES.len());
            let street = if i % 5 == 4 { "St." } else { "Street" };
            Record::new(i as u64 + 1, name)
                .with_address(format!(
                    "{} Main {}, {}",
                    base % 97,
                    street,
                    CITIES[base % CITIES.len()]
                ))
                .with_phone(format!("876-555-{:04}", base))
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.bench_function("name", |b| {
        b.iter(|| normalize_name(black_box("Crème Brûlée Café & Bakery Ltd.")))
    });
    group.bench_function("address", |b| {
        b.iter(|| normalize_address(black_box("Shop 3, 22 Constant Spring Rd., Kingston 10")))
    });
    group.finish();
}

fn bench_score_pair(c: &mut Criterion) {
    let a = normalize(
        &Record::new(1u64, "Kingston Hardware Ltd")
            .with_address("12 Main St, Kingston")
            .with_phone("876-555-0101"),
    );
    let b = normalize(
        &Record::new(2u64, "Hardware Kingston Limited")
            .with_address("12 Main Street, Kingston")
            .with_phone("876-555-0101"),
    );
    let weights = FieldWeights::default();

    c.bench_function("score_pair", |bench| {
        bench.iter(|| score_pair(black_box(&a), black_box(&b), &weights))
    });
}

fn bench_deduplicate(c: &mut Criterion) {
    let mut group = c.benchmark_group("deduplicate");
    group.sample_size(10);

    for blocking in [BlockingStrategy::None, BlockingStrategy::SameCity] {
        let config = DeduplicationConfig {
            blocking,
            ..Default::default()
        };
        let engine = DeduplicationEngine::new(config).unwrap();

        for count in [100, 500] {
            let records = generate_listings(count);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", blocking), count),
                &records,
                |b, records| b.iter(|| engine.deduplicate(black_box(records.clone()))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_score_pair, bench_deduplicate);
criterion_main!(benches);
