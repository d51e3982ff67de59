pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod similarity;
pub mod tokenizer;

pub use error::{Result, SearchError};
pub use index::{DocMeta, Indexer, InvertedIndex};
pub use query::{QueryEngine, SearchHit};
pub use similarity::{Bm25Params, QueryVector, ScoreVector, Similarity, SimilarityKind};
pub use tokenizer::{Analyzer, EnglishAnalyzer};

pub type TermId = u32;
pub type DocId = u32;
