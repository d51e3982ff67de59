use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::similarity::{Bm25Params, ScoreVector, Similarity, SimilarityKind};
use crate::tokenizer::Analyzer;
use crate::DocId;
use ordered_float::OrderedFloat;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// One ranked query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub external_id: String,
    pub score: f32,
}

/// Runs ranked queries against one immutable index snapshot.
pub struct QueryEngine {
    analyzer: Arc<dyn Analyzer>,
    index: Arc<InvertedIndex>,
    similarity: Option<Box<dyn Similarity>>,
}

impl QueryEngine {
    /// A fresh engine has no similarity measure; queries fail with
    /// [`SearchError::UnboundSimilarity`] until one is bound.
    pub fn new(analyzer: Arc<dyn Analyzer>, index: Arc<InvertedIndex>) -> Self {
        Self {
            analyzer,
            index,
            similarity: None,
        }
    }

    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.index
    }

    /// Attaches the ranking function used by subsequent queries, replacing
    /// any previous one. `params` only affects BM25.
    pub fn bind_similarity(&mut self, kind: SimilarityKind, params: Bm25Params) {
        self.similarity = Some(kind.bind(Arc::clone(&self.index), params));
    }

    /// Tokenizes `text`, scores it under the bound measure, and returns the
    /// `k` best documents, score descending with ties broken by document id
    /// ascending. Queries sharing no term with the collection return an
    /// empty result, never an error.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let similarity = self
            .similarity
            .as_ref()
            .ok_or(SearchError::UnboundSimilarity)?;
        let tokens = self.analyzer.tokenize(text)?;
        let vector = self.index.query_vector(&tokens);
        if vector.is_empty() {
            return Ok(Vec::new());
        }
        let scores = similarity.score(&vector);
        let ranked = top_k(scores, k);
        Ok(ranked
            .into_iter()
            .map(|(score, doc_id)| SearchHit {
                doc_id,
                external_id: self
                    .index
                    .external_id(doc_id)
                    .unwrap_or_default()
                    .to_string(),
                score,
            })
            .collect())
    }
}

type RankKey = (OrderedFloat<f32>, Reverse<DocId>);

/// Selects the `k` best entries of a score vector without sorting all of it.
///
/// A min-heap bounded at `k` entries keeps the selection O(D log k); the heap
/// root is always the current worst survivor. The ordering is total: score
/// descending, then document id ascending, so equal-scored runs come out in a
/// reproducible order regardless of map iteration.
pub fn top_k(scores: ScoreVector, k: usize) -> Vec<(f32, DocId)> {
    if k == 0 || scores.is_empty() {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<RankKey>> = BinaryHeap::with_capacity(k + 1);
    for (doc, score) in scores {
        heap.push(Reverse((OrderedFloat(score), Reverse(doc))));
        if heap.len() > k {
            heap.pop();
        }
    }
    let mut ranked: Vec<(f32, DocId)> = heap
        .into_iter()
        .map(|Reverse((score, Reverse(doc)))| (score.into_inner(), doc))
        .collect();
    ranked.sort_by_key(|&(score, doc)| (Reverse(OrderedFloat(score)), doc));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_ranking(scores: &ScoreVector) -> Vec<(f32, DocId)> {
        let mut all: Vec<(f32, DocId)> = scores.iter().map(|(&d, &s)| (s, d)).collect();
        all.sort_by_key(|&(score, doc)| (Reverse(OrderedFloat(score)), doc));
        all
    }

    #[test]
    fn matches_full_sort_for_every_k() {
        let scores: ScoreVector = [
            (0, 0.5),
            (1, 2.0),
            (2, 0.5),
            (3, 1.25),
            (4, 2.0),
            (5, 0.0),
            (6, -1.5),
        ]
        .into_iter()
        .collect();
        let reference = reference_ranking(&scores);

        for k in 0..=scores.len() + 1 {
            let selected = top_k(scores.clone(), k);
            assert_eq!(
                selected,
                reference[..k.min(reference.len())],
                "k = {k}"
            );
        }
    }

    #[test]
    fn equal_scores_order_by_doc_id() {
        let scores: ScoreVector = [(9, 1.0), (3, 1.0), (7, 1.0), (1, 1.0)].into_iter().collect();
        let ranked = top_k(scores, 3);
        assert_eq!(ranked, vec![(1.0, 1), (1.0, 3), (1.0, 7)]);
    }

    #[test]
    fn zero_k_and_empty_input() {
        assert!(top_k(ScoreVector::new(), 5).is_empty());
        let scores: ScoreVector = [(0, 1.0)].into_iter().collect();
        assert!(top_k(scores, 0).is_empty());
    }

    #[test]
    fn negative_scores_rank_below_positive() {
        let scores: ScoreVector = [(0, -0.3), (1, 0.3), (2, -2.0)].into_iter().collect();
        assert_eq!(top_k(scores, 3), vec![(0.3, 1), (-0.3, 0), (-2.0, 2)]);
    }
}
