use crate::error::{Result, SearchError};
use crate::tokenizer::Analyzer;
use crate::{DocId, TermId};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref NO_POSTINGS: HashMap<DocId, u32> = HashMap::new();
    static ref NO_TERMS: HashMap<TermId, u32> = HashMap::new();
}

/// Metadata kept per ingested document for result rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocMeta {
    pub external_id: String,
}

/// Dual-indexed sparse term/document frequency matrix.
///
/// `term_docs` and `doc_terms` hold the same counts viewed row-wise and
/// column-wise. Every mutation goes through [`InvertedIndex::record_occurrence`],
/// which updates both views together, so they cannot drift apart. Zero counts
/// are never materialized.
///
/// Terms and documents are interned to dense `u32` ids in first-seen order;
/// `dictionary` and `doc_id_map` hold the string-to-id mappings.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    dictionary: HashMap<String, TermId>,
    term_docs: HashMap<TermId, HashMap<DocId, u32>>,
    doc_terms: HashMap<DocId, HashMap<TermId, u32>>,
    doc_id_map: HashMap<String, DocId>,
    docs: HashMap<DocId, DocMeta>,
    num_docs: u32,
    next_term_id: TermId,
    next_doc_id: DocId,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `add_document` calls, not distinct documents. The two only
    /// differ when a caller re-indexes an external id, which merges counts
    /// under the existing internal id but still bumps this counter.
    pub fn num_docs(&self) -> u32 {
        self.num_docs
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.dictionary.get(term).copied()
    }

    pub fn doc_id(&self, external_id: &str) -> Option<DocId> {
        self.doc_id_map.get(external_id).copied()
    }

    pub fn doc_meta(&self, doc: DocId) -> Option<&DocMeta> {
        self.docs.get(&doc)
    }

    pub fn external_id(&self, doc: DocId) -> Option<&str> {
        self.docs.get(&doc).map(|meta| meta.external_id.as_str())
    }

    /// Every document containing `term`, with occurrence counts. Unknown
    /// terms yield an empty map.
    pub fn documents_containing(&self, term: TermId) -> &HashMap<DocId, u32> {
        self.term_docs.get(&term).unwrap_or(&NO_POSTINGS)
    }

    /// Every term occurring in `doc`, with occurrence counts. Unknown
    /// documents yield an empty map.
    pub fn tokens_of(&self, doc: DocId) -> &HashMap<TermId, u32> {
        self.doc_terms.get(&doc).unwrap_or(&NO_TERMS)
    }

    /// Number of documents containing `term`. Derived from the postings map
    /// rather than stored, so there is no second counter to keep in sync.
    pub fn document_frequency(&self, term: TermId) -> u32 {
        self.term_docs.get(&term).map_or(0, |postings| postings.len() as u32)
    }

    /// Total token occurrences in `doc`.
    pub fn document_length(&self, doc: DocId) -> u32 {
        self.tokens_of(doc).values().sum()
    }

    /// Column-wise iteration: every indexed document with its term counts.
    pub fn doc_term_counts(&self) -> impl Iterator<Item = (DocId, &HashMap<TermId, u32>)> + '_ {
        self.doc_terms.iter().map(|(&doc, counts)| (doc, counts))
    }

    /// Builds a term-count vector for a query's tokens. Tokens absent from
    /// the dictionary are dropped here: they occur in no document, so no
    /// measure can give them a non-zero contribution, and dropping them up
    /// front keeps every df seen by the measures at least 1.
    pub fn query_vector(&self, tokens: &[String]) -> HashMap<TermId, u32> {
        let mut vector = HashMap::new();
        for token in tokens {
            if let Some(&term) = self.dictionary.get(token) {
                *vector.entry(term).or_insert(0) += 1;
            }
        }
        vector
    }

    fn intern_term(&mut self, term: String) -> TermId {
        if let Some(&id) = self.dictionary.get(&term) {
            return id;
        }
        let id = self.next_term_id;
        self.next_term_id += 1;
        self.dictionary.insert(term, id);
        id
    }

    fn intern_doc(&mut self, external_id: &str) -> DocId {
        if let Some(&id) = self.doc_id_map.get(external_id) {
            return id;
        }
        let id = self.next_doc_id;
        self.next_doc_id += 1;
        self.doc_id_map.insert(external_id.to_string(), id);
        self.docs.insert(
            id,
            DocMeta {
                external_id: external_id.to_string(),
            },
        );
        id
    }

    /// The single mutation path: bumps the count for (term, doc) in both
    /// views, creating entries as needed.
    fn record_occurrence(&mut self, term: TermId, doc: DocId) {
        *self
            .term_docs
            .entry(term)
            .or_default()
            .entry(doc)
            .or_insert(0) += 1;
        *self
            .doc_terms
            .entry(doc)
            .or_default()
            .entry(term)
            .or_insert(0) += 1;
    }

    /// Checks the structural invariants a well-formed index upholds. Run on
    /// every loaded snapshot; a freshly built index always passes.
    pub fn validate(&self) -> Result<()> {
        for (&term, postings) in &self.term_docs {
            if postings.is_empty() {
                return Err(SearchError::MalformedSnapshot(format!(
                    "term {term} has an empty postings map"
                )));
            }
            for (&doc, &count) in postings {
                if count == 0 {
                    return Err(SearchError::MalformedSnapshot(format!(
                        "zero count persisted for term {term} in document {doc}"
                    )));
                }
                if self.doc_terms.get(&doc).and_then(|terms| terms.get(&term)) != Some(&count) {
                    return Err(SearchError::MalformedSnapshot(format!(
                        "term and document views disagree on (term {term}, document {doc})"
                    )));
                }
                if !self.docs.contains_key(&doc) {
                    return Err(SearchError::MalformedSnapshot(format!(
                        "posting references unknown document {doc}"
                    )));
                }
            }
        }
        for (&doc, terms) in &self.doc_terms {
            for (&term, &count) in terms {
                if self.term_docs.get(&term).and_then(|postings| postings.get(&doc))
                    != Some(&count)
                {
                    return Err(SearchError::MalformedSnapshot(format!(
                        "document view holds (document {doc}, term {term}) missing from term view"
                    )));
                }
            }
        }
        let known_terms: std::collections::HashSet<TermId> =
            self.dictionary.values().copied().collect();
        if known_terms.len() != self.dictionary.len() {
            return Err(SearchError::MalformedSnapshot(
                "dictionary assigns one term id to several terms".to_string(),
            ));
        }
        for &term in self.term_docs.keys() {
            if !known_terms.contains(&term) {
                return Err(SearchError::MalformedSnapshot(format!(
                    "postings exist for term {term} absent from the dictionary"
                )));
            }
        }
        if self.doc_id_map.len() != self.docs.len() {
            return Err(SearchError::MalformedSnapshot(format!(
                "{} external ids map to {} documents",
                self.doc_id_map.len(),
                self.docs.len()
            )));
        }
        for (external_id, &doc) in &self.doc_id_map {
            match self.docs.get(&doc) {
                Some(meta) if meta.external_id == *external_id => {}
                _ => {
                    return Err(SearchError::MalformedSnapshot(format!(
                        "external id {external_id:?} and document {doc} do not map back to each other"
                    )));
                }
            }
        }
        if self.num_docs < self.docs.len() as u32 {
            return Err(SearchError::MalformedSnapshot(format!(
                "document counter {} is below the {} distinct documents held",
                self.num_docs,
                self.docs.len()
            )));
        }
        Ok(())
    }
}

/// Builds an [`InvertedIndex`] from raw documents through an [`Analyzer`].
///
/// The index is exclusively owned while building; [`Indexer::into_index`]
/// hands it over once indexing completes, after which it is treated as
/// read-only by everything that binds to it.
pub struct Indexer {
    analyzer: Arc<dyn Analyzer>,
    index: InvertedIndex,
}

impl Indexer {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            index: InvertedIndex::new(),
        }
    }

    /// Tokenizes `text` and records every token occurrence against
    /// `external_id`, then bumps the document counter exactly once.
    /// Preprocessing failures propagate; counts recorded before the failure
    /// are not rolled back, so callers should rebuild on error.
    pub fn add_document(&mut self, external_id: &str, text: &str) -> Result<DocId> {
        let tokens = self.analyzer.tokenize(text)?;
        let doc = self.index.intern_doc(external_id);
        let token_count = tokens.len();
        for token in tokens {
            let term = self.index.intern_term(token);
            self.index.record_occurrence(term, doc);
        }
        self.index.num_docs += 1;
        tracing::debug!(external_id, token_count, "indexed document");
        Ok(doc)
    }

    /// Indexes every supplied document in order, aborting on the first
    /// failure. Callers wanting skip-and-continue semantics drive
    /// [`Indexer::add_document`] themselves and decide per document.
    pub fn index_collection<I, S, T>(&mut self, documents: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        for (external_id, text) in documents {
            self.add_document(external_id.as_ref(), text.as_ref())?;
        }
        Ok(())
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    /// Finishes the build and transfers ownership of the index.
    pub fn into_index(self) -> InvertedIndex {
        self.index
    }
}
