use criterion::{criterion_group, criterion_main, Criterion};
use searchlite_core::tokenizer::{Analyzer, EnglishAnalyzer};

static PARAGRAPH: &str = "Information retrieval systems rank documents against \
queries using statistics gathered at indexing time. Term frequencies, document \
frequencies, and document lengths feed scoring functions such as TF-IDF and \
BM25, which trade precision against recall in different ways. Stemming and \
stop-word removal shrink the vocabulary before any counting happens.";

fn bench_tokenize(c: &mut Criterion) {
    let analyzer = EnglishAnalyzer::new();
    let text = PARAGRAPH.repeat(50);
    c.bench_function("tokenize_paragraphs", |b| {
        b.iter(|| analyzer.tokenize(&text).unwrap())
    });
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
