use thiserror::Error;

/// Error type shared by indexing, querying, and snapshot handling.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("no similarity measure bound to the query engine")]
    UnboundSimilarity,

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    #[error("incompatible snapshot version {actual}, expected <= {expected}")]
    IncompatibleSnapshot { expected: u32, actual: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SearchError>;
