use crate::error::Result;
use lazy_static::lazy_static;
use parking_lot::Mutex;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
            "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers",
            "herself", "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
            "what", "which", "who", "whom", "this", "that", "these", "those", "am", "is", "are",
            "was", "were", "be", "been", "being", "have", "has", "had", "having", "do", "does",
            "did", "doing", "a", "an", "the", "and", "but", "if", "or", "because", "as", "until",
            "while", "of", "at", "by", "for", "with", "about", "against", "between", "into",
            "through", "during", "before", "after", "above", "below", "to", "from", "up", "down",
            "in", "out", "on", "off", "over", "under", "again", "further", "then", "once", "here",
            "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
            "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so",
            "than", "too", "very", "can", "will", "just", "should", "now",
        ];
        words.iter().copied().collect()
    };
}

/// Text preprocessing capability consumed by the indexer and the query
/// engine. Implementations must be deterministic for identical input; the
/// rest of the engine treats each produced token as an opaque string.
pub trait Analyzer: Send + Sync {
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;
}

/// Default English analyzer: NFKC normalization, lowercasing, word extraction,
/// stop-word removal, Snowball stemming.
///
/// Stemming dominates indexing time, so stemmed forms are memoized in a
/// size-bounded cache owned by this instance. Once the cache is full, new
/// forms are computed but not stored.
pub struct EnglishAnalyzer {
    stemmer: Stemmer,
    stem_cache: Mutex<HashMap<String, String>>,
    cache_capacity: usize,
}

const DEFAULT_STEM_CACHE_CAPACITY: usize = 10_000;

impl EnglishAnalyzer {
    pub fn new() -> Self {
        Self::with_cache_capacity(DEFAULT_STEM_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(cache_capacity: usize) -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
            stem_cache: Mutex::new(HashMap::new()),
            cache_capacity,
        }
    }

    fn stem(&self, token: &str) -> String {
        let mut cache = self.stem_cache.lock();
        if let Some(stemmed) = cache.get(token) {
            return stemmed.clone();
        }
        let stemmed = self.stemmer.stem(token).to_string();
        if cache.len() < self.cache_capacity {
            cache.insert(token.to_string(), stemmed.clone());
        }
        stemmed
    }
}

impl Default for EnglishAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for EnglishAnalyzer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut tokens = Vec::new();
        for mat in WORD.find_iter(&normalized) {
            let token = mat.as_str();
            if STOPWORDS.contains(token) {
                continue;
            }
            tokens.push(self.stem(token));
        }
        Ok(tokens)
    }
}

/// Splits on whitespace with no normalization. Useful when the caller has
/// already prepared its tokens and wants the engine to take them verbatim.
pub struct WhitespaceAnalyzer;

impl Analyzer for WhitespaceAnalyzer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}
