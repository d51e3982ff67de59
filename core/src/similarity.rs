use crate::index::InvertedIndex;
use crate::{DocId, TermId};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// Term-count vector for one query, keyed by interned term id.
pub type QueryVector = HashMap<TermId, u32>;

/// Per-document scores for one query. Documents sharing no term with the
/// query are absent, not present with score zero.
pub type ScoreVector = HashMap<DocId, f32>;

/// BM25 free parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 4.0, b: 0.75 }
    }
}

/// A ranking function bound to one immutable index snapshot.
///
/// Binding precomputes whatever per-document statistics the variant needs,
/// exactly once; `score` then only touches the postings of the query's terms.
pub trait Similarity: Send + Sync {
    fn score(&self, query: &QueryVector) -> ScoreVector;
}

/// Selects one of the ranking functions by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityKind {
    TermFrequency,
    TfIdf,
    Bm25,
}

impl SimilarityKind {
    /// Constructs the chosen measure bound to `index`. `params` only affects
    /// the BM25 variant.
    pub fn bind(self, index: Arc<InvertedIndex>, params: Bm25Params) -> Box<dyn Similarity> {
        match self {
            SimilarityKind::TermFrequency => Box::new(TfSimilarity::bind(index)),
            SimilarityKind::TfIdf => Box::new(TfIdfSimilarity::bind(index)),
            SimilarityKind::Bm25 => Box::new(Bm25Similarity::bind(index, params)),
        }
    }
}

impl FromStr for SimilarityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tf" => Ok(SimilarityKind::TermFrequency),
            "tfidf" => Ok(SimilarityKind::TfIdf),
            "bm25" => Ok(SimilarityKind::Bm25),
            other => Err(format!(
                "unknown similarity {other:?}, expected tf, tfidf, or bm25"
            )),
        }
    }
}

impl std::fmt::Display for SimilarityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SimilarityKind::TermFrequency => "tf",
            SimilarityKind::TfIdf => "tfidf",
            SimilarityKind::Bm25 => "bm25",
        };
        f.write_str(name)
    }
}

/// Float accumulation is order-sensitive, and map iteration order is not
/// stable across instances. Summing in term-id order keeps every score
/// bit-identical across repeated queries and across snapshot reloads.
fn in_term_order(counts: &HashMap<TermId, u32>) -> Vec<(TermId, u32)> {
    let mut entries: Vec<(TermId, u32)> = counts.iter().map(|(&t, &c)| (t, c)).collect();
    entries.sort_unstable_by_key(|&(term, _)| term);
    entries
}

/// Cosine similarity over raw term frequencies.
pub struct TfSimilarity {
    index: Arc<InvertedIndex>,
    doc_norms: HashMap<DocId, f32>,
}

impl TfSimilarity {
    pub fn bind(index: Arc<InvertedIndex>) -> Self {
        let mut doc_norms = HashMap::new();
        for (doc, term_counts) in index.doc_term_counts() {
            let norm = in_term_order(term_counts)
                .into_iter()
                .map(|(_, count)| (count as f32).powi(2))
                .sum::<f32>()
                .sqrt();
            doc_norms.insert(doc, norm);
        }
        Self { index, doc_norms }
    }
}

impl Similarity for TfSimilarity {
    fn score(&self, query: &QueryVector) -> ScoreVector {
        let mut scores = ScoreVector::new();
        for (term, query_tf) in in_term_order(query) {
            for (&doc, &tf) in self.index.documents_containing(term) {
                // A posted document has at least one occurrence, so its norm
                // is at least 1.
                let norm = self.doc_norms.get(&doc).copied().unwrap_or(1.0);
                *scores.entry(doc).or_insert(0.0) += query_tf as f32 * tf as f32 / norm;
            }
        }
        scores
    }
}

/// Cosine similarity over tf-idf weights, with the idf factor squared in the
/// numerator. The square is deliberate, not a typo; see DESIGN.md.
pub struct TfIdfSimilarity {
    index: Arc<InvertedIndex>,
    doc_norms: HashMap<DocId, f32>,
}

impl TfIdfSimilarity {
    pub fn bind(index: Arc<InvertedIndex>) -> Self {
        let n = index.num_docs() as f32;
        let mut doc_norms = HashMap::new();
        for (doc, term_counts) in index.doc_term_counts() {
            let mut sum = 0.0f32;
            for (term, count) in in_term_order(term_counts) {
                // df >= 1 for any term occurring in a document.
                let df = index.document_frequency(term) as f32;
                let idf = (n / df).ln();
                sum += (count as f32 * idf).powi(2);
            }
            doc_norms.insert(doc, sum.sqrt());
        }
        Self { index, doc_norms }
    }
}

impl Similarity for TfIdfSimilarity {
    fn score(&self, query: &QueryVector) -> ScoreVector {
        let n = self.index.num_docs() as f32;
        let mut scores = ScoreVector::new();
        for (term, query_tf) in in_term_order(query) {
            let df = self.index.document_frequency(term);
            if df == 0 {
                // Query vectors built through the index never hold unknown
                // terms, but score() accepts any vector.
                continue;
            }
            let idf = (n / df as f32).ln();
            let idf_squared = idf * idf;
            for (&doc, &tf) in self.index.documents_containing(term) {
                let norm = self.doc_norms.get(&doc).copied().unwrap_or(0.0);
                let entry = scores.entry(doc).or_insert(0.0);
                // norm is 0 only when every term of the document occurs in
                // every document (idf 0 across the board); the document then
                // scores 0 instead of dividing by zero.
                if norm > 0.0 {
                    *entry += query_tf as f32 * tf as f32 * idf_squared / norm;
                }
            }
        }
        scores
    }
}

/// Okapi BM25. Query term multiplicity is ignored: each distinct query term
/// contributes once.
pub struct Bm25Similarity {
    index: Arc<InvertedIndex>,
    params: Bm25Params,
    doc_lengths: HashMap<DocId, u32>,
    avgdl: f32,
}

impl Bm25Similarity {
    pub fn bind(index: Arc<InvertedIndex>, params: Bm25Params) -> Self {
        let mut doc_lengths = HashMap::new();
        let mut total_length: u64 = 0;
        for (doc, term_counts) in index.doc_term_counts() {
            let length: u32 = term_counts.values().sum();
            total_length += u64::from(length);
            doc_lengths.insert(doc, length);
        }
        let n = index.num_docs();
        let mut avgdl = if n == 0 {
            0.0
        } else {
            total_length as f32 / n as f32
        };
        if avgdl <= 0.0 {
            // Empty or all-empty collection; any value works since no
            // postings exist, but keep the formula free of division by zero.
            avgdl = 1.0;
        }
        Self {
            index,
            params,
            doc_lengths,
            avgdl,
        }
    }
}

impl Similarity for Bm25Similarity {
    fn score(&self, query: &QueryVector) -> ScoreVector {
        let n = self.index.num_docs() as f32;
        let Bm25Params { k1, b } = self.params;
        let mut scores = ScoreVector::new();
        for (term, _) in in_term_order(query) {
            let df = self.index.document_frequency(term) as f32;
            // Negative for terms in more than half the collection; that is
            // expected BM25 behavior.
            let idf = ((n - df + 0.5) / (df + 0.5)).ln();
            for (&doc, &tf) in self.index.documents_containing(term) {
                let tf = tf as f32;
                let dl = self.doc_lengths.get(&doc).copied().unwrap_or(0) as f32;
                let length_norm = k1 * (1.0 - b + b * dl / self.avgdl);
                *scores.entry(doc).or_insert(0.0) += idf * tf * (k1 + 1.0) / (tf + length_norm);
            }
        }
        scores
    }
}
