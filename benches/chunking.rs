use chunk_index::embeddings::chunking::{ChunkingConfig, chunk_text};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn sample_text() -> String {
    let sentences = [
        "Dr. Rivera led the storage team for four years.",
        "She rewrote the write-ahead log, cutting recovery time in half!",
        "Was the migration painless?",
        "Mostly, though the e.g. clause in the contract caused delays.",
        "The team shipped three major releases and a dozen point releases.",
    ];
    sentences.iter().cycle().take(400).copied().collect::<Vec<_>>().join(" ")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_text();
    let config = ChunkingConfig::default();

    c.bench_function("chunking", |b| {
        b.iter(|| config.chunk(black_box(&text)))
    });
    c.bench_function("chunking_small_chunks", |b| {
        b.iter(|| chunk_text(black_box(&text), black_box(20)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
