use searchlite_core::index::Indexer;
use searchlite_core::similarity::{Bm25Params, Similarity, SimilarityKind};
use searchlite_core::tokenizer::WhitespaceAnalyzer;
use searchlite_core::InvertedIndex;
use std::sync::Arc;

fn build(docs: &[(&str, &str)]) -> Arc<InvertedIndex> {
    let mut indexer = Indexer::new(Arc::new(WhitespaceAnalyzer));
    for (id, text) in docs {
        indexer.add_document(id, text).unwrap();
    }
    Arc::new(indexer.into_index())
}

fn score_of(index: &Arc<InvertedIndex>, measure: &dyn Similarity, query: &str, doc: &str) -> Option<f32> {
    let tokens: Vec<String> = query.split_whitespace().map(str::to_string).collect();
    let vector = index.query_vector(&tokens);
    let scores = measure.score(&vector);
    scores.get(&index.doc_id(doc).unwrap()).copied()
}

fn assert_close(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn tf_worked_example() {
    // doc1 {cat:1, sat:1}, norm sqrt(2); doc2 {cat:1, hat:1, sat:1}, norm sqrt(3).
    let index = build(&[("doc1", "cat sat"), ("doc2", "cat hat sat")]);
    let measure = SimilarityKind::TermFrequency.bind(Arc::clone(&index), Bm25Params::default());

    let d1 = score_of(&index, measure.as_ref(), "cat sat", "doc1").unwrap();
    let d2 = score_of(&index, measure.as_ref(), "cat sat", "doc2").unwrap();
    assert_close(d1, 2.0_f32.sqrt());
    assert_close(d2, 2.0 / 3.0_f32.sqrt());
    assert!(d1 > d2);
}

#[test]
fn tf_weights_repeated_query_terms() {
    let index = build(&[("d1", "cat sat")]);
    let measure = SimilarityKind::TermFrequency.bind(Arc::clone(&index), Bm25Params::default());

    let single = score_of(&index, measure.as_ref(), "cat", "d1").unwrap();
    let double = score_of(&index, measure.as_ref(), "cat cat", "d1").unwrap();
    assert_close(double, 2.0 * single);
}

#[test]
fn tfidf_squared_idf_numerator() {
    // N = 3; df(apple) = 2, every other term df = 1.
    let index = build(&[
        ("d0", "apple banana"),
        ("d1", "apple apple cherry"),
        ("d2", "durian"),
    ]);
    let measure = SimilarityKind::TfIdf.bind(Arc::clone(&index), Bm25Params::default());

    // idf(apple) = ln(3/2); norms:
    //   d0: sqrt(ln(1.5)^2 + ln(3)^2), d1: sqrt((2 ln(1.5))^2 + ln(3)^2)
    let d0 = score_of(&index, measure.as_ref(), "apple", "d0").unwrap();
    let d1 = score_of(&index, measure.as_ref(), "apple", "d1").unwrap();
    assert_close(d0, 0.140388);
    assert_close(d1, 0.240796);

    // durian never overlaps the query.
    assert!(score_of(&index, measure.as_ref(), "apple", "d2").is_none());
}

#[test]
fn tfidf_ubiquitous_term_scores_zero_not_nan() {
    // Both documents consist solely of a term with idf 0, so both norms are 0.
    let index = build(&[("d0", "x"), ("d1", "x x")]);
    let measure = SimilarityKind::TfIdf.bind(Arc::clone(&index), Bm25Params::default());

    let d0 = score_of(&index, measure.as_ref(), "x", "d0").unwrap();
    let d1 = score_of(&index, measure.as_ref(), "x", "d1").unwrap();
    assert_eq!(d0, 0.0);
    assert_eq!(d1, 0.0);
}

#[test]
fn bm25_hand_computed_scores() {
    // N = 2, df(a) = 2 so idf(a) = ln(0.5/2.5) < 0; dl = [2, 1], avgdl = 1.5.
    let index = build(&[("d0", "a b"), ("d1", "a")]);
    let measure = SimilarityKind::Bm25.bind(Arc::clone(&index), Bm25Params::default());

    let idf = (0.5_f32 / 2.5).ln();
    // d0: 1 + 4 * (0.25 + 0.75 * 2 / 1.5) = 6; d1: 1 + 4 * (0.25 + 0.75 / 1.5) = 4.
    let d0 = score_of(&index, measure.as_ref(), "a", "d0").unwrap();
    let d1 = score_of(&index, measure.as_ref(), "a", "d1").unwrap();
    assert_close(d0, idf * 5.0 / 6.0);
    assert_close(d1, idf * 5.0 / 4.0);
    // Negative idf is expected for a term in every document; the shorter
    // document is penalized harder.
    assert!(d0 < 0.0 && d1 < 0.0);
    assert!(d0 > d1);
}

#[test]
fn bm25_zero_idf_term() {
    // df(b) = 1 of N = 2: idf = ln(1.5/1.5) = 0, so the score is exactly 0.
    let index = build(&[("d0", "a b"), ("d1", "a")]);
    let measure = SimilarityKind::Bm25.bind(Arc::clone(&index), Bm25Params::default());
    assert_eq!(score_of(&index, measure.as_ref(), "b", "d0"), Some(0.0));
}

#[test]
fn bm25_ignores_query_term_multiplicity() {
    let index = build(&[("d0", "cat sat"), ("d1", "cat cat cat")]);
    let measure = SimilarityKind::Bm25.bind(Arc::clone(&index), Bm25Params::default());

    let once = score_of(&index, measure.as_ref(), "cat", "d1").unwrap();
    let thrice = score_of(&index, measure.as_ref(), "cat cat cat", "d1").unwrap();
    assert_close(once, thrice);
}

#[test]
fn bm25_zero_length_document_is_harmless() {
    let index = build(&[("empty", ""), ("d1", "cat sat"), ("d2", "cat")]);
    let measure = SimilarityKind::Bm25.bind(Arc::clone(&index), Bm25Params::default());

    let tokens = vec!["cat".to_string()];
    let scores = measure.score(&index.query_vector(&tokens));
    assert_eq!(scores.len(), 2);
    assert!(scores.values().all(|s| s.is_finite()));
    assert!(index.doc_id("empty").is_some());
}

#[test]
fn bm25_all_empty_collection() {
    let index = build(&[("e0", ""), ("e1", "")]);
    let measure = SimilarityKind::Bm25.bind(Arc::clone(&index), Bm25Params::default());
    let scores = measure.score(&index.query_vector(&["cat".to_string()]));
    assert!(scores.is_empty());
}

#[test]
fn bm25_parameters_change_length_normalization() {
    // With b = 0 document length stops mattering; equal tf gives equal score.
    let index = build(&[("short", "cat"), ("long", "cat filler words here")]);
    let flat = SimilarityKind::Bm25.bind(
        Arc::clone(&index),
        Bm25Params { k1: 4.0, b: 0.0 },
    );
    let s = score_of(&index, flat.as_ref(), "cat", "short").unwrap();
    let l = score_of(&index, flat.as_ref(), "cat", "long").unwrap();
    assert_close(s, l);

    // With the default b the shorter document wins.
    let default = SimilarityKind::Bm25.bind(Arc::clone(&index), Bm25Params::default());
    let s = score_of(&index, default.as_ref(), "cat", "short").unwrap();
    let l = score_of(&index, default.as_ref(), "cat", "long").unwrap();
    assert!(s > l);
}

#[test]
fn measures_skip_non_overlapping_documents() {
    let index = build(&[("d0", "cat"), ("d1", "dog")]);
    for kind in [
        SimilarityKind::TermFrequency,
        SimilarityKind::TfIdf,
        SimilarityKind::Bm25,
    ] {
        let measure = kind.bind(Arc::clone(&index), Bm25Params::default());
        let scores = measure.score(&index.query_vector(&["cat".to_string()]));
        assert_eq!(scores.len(), 1, "{kind} scored a non-overlapping document");
        assert!(scores.contains_key(&index.doc_id("d0").unwrap()));
    }
}
