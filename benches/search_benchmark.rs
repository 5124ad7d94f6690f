use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quarry::core::cancel::CancelToken;
use quarry::core::config::Config;
use quarry::core::index::Index;
use quarry::search::executor::{SearchMode, SearchRequest};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WORDS: &[&str] = &[
    "the", "quick", "brown", "fox", "jumps", "over", "lazy", "dog", "search", "engine",
    "block", "max", "wand", "segment", "posting", "score", "query", "index", "token", "rust",
];

/// Helper to create a skewed random corpus
fn corpus(docs: usize, seed: u64) -> Vec<(String, String)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..docs)
        .map(|i| {
            let len = rng.gen_range(20..120);
            let text = (0..len)
                .map(|_| {
                    let x: f64 = rng.gen_range(0.0..1.0);
                    WORDS[((x * x) * WORDS.len() as f64) as usize]
                })
                .collect::<Vec<_>>()
                .join(" ");
            (format!("doc{}", i), text)
        })
        .collect()
}

fn build_index(dir: &std::path::Path, options: &[(&str, &str)]) -> Index {
    let mut config = Config::new(dir, "en").unwrap();
    for (key, value) in options {
        config = config.with_option(key, value).unwrap();
    }
    let index = Index::create(config).unwrap();
    index
        .import(corpus(50_000, 42).into_iter().map(Ok), |_| {}, &CancelToken::new())
        .unwrap();
    index
}

/// Benchmark top-10 queries across store profiles
fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_top10");
    let profiles: &[(&str, &[(&str, &str)])] = &[
        ("heap", &[]),
        ("mmap", &[("store", "mmap")]),
        ("pipeline", &[("store", "mmap"), ("ingest", "pipeline"), ("batch_docs", "5000")]),
    ];

    for (name, options) in profiles {
        let dir = tempfile::tempdir().unwrap();
        let index = build_index(dir.path(), options);
        for query in ["wand", "fox dog", "rust index token segment"] {
            group.bench_with_input(BenchmarkId::new(*name, query), &query, |b, &query| {
                b.iter(|| black_box(index.search(query, 10, 0).unwrap()));
            });
        }
        index.close().unwrap();
    }
    group.finish();
}

/// Benchmark disjunctive vs conjunctive evaluation
fn bench_modes(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let index = build_index(dir.path(), &[("bitmaps", "true")]);
    let mut group = c.benchmark_group("search_mode");

    for mode in [SearchMode::Any, SearchMode::All] {
        let request = SearchRequest::new("quick brown fox").limit(10).mode(mode);
        group.bench_function(format!("{:?}", mode), |b| {
            b.iter(|| black_box(index.search_with(&request).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queries, bench_modes);
criterion_main!(benches);
