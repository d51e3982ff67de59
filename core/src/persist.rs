use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Highest snapshot layout version this build can read.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub num_docs: u32,
    pub created_at: String,
    pub version: u32,
}

/// File layout of one index snapshot directory.
pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn index(&self) -> PathBuf {
        self.root.join("index.bin")
    }

    fn meta(&self) -> PathBuf {
        self.root.join("meta.json")
    }

    pub fn exists(&self) -> bool {
        self.index().exists() && self.meta().exists()
    }
}

/// Writes the full index plus a metadata sidecar under `paths.root`.
/// `created_at` is an opaque timestamp string supplied by the caller.
pub fn save_snapshot(paths: &SnapshotPaths, index: &InvertedIndex, created_at: &str) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(index)?;
    let mut f = File::create(paths.index())?;
    f.write_all(&bytes)?;

    let meta = SnapshotMeta {
        num_docs: index.num_docs(),
        created_at: created_at.to_string(),
        version: SNAPSHOT_VERSION,
    };
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(&meta)?;
    f.write_all(json.as_bytes())?;
    tracing::debug!(root = %paths.root.display(), num_docs = meta.num_docs, "snapshot saved");
    Ok(())
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<SnapshotMeta> {
    let mut buf = String::new();
    File::open(paths.meta())?.read_to_string(&mut buf)?;
    let meta: SnapshotMeta = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Reads a snapshot back and refuses to return one that fails the index
/// invariants. Recovery from a malformed snapshot is a rebuild from the
/// source documents; that choice belongs to the caller.
pub fn load_snapshot(paths: &SnapshotPaths) -> Result<InvertedIndex> {
    let meta = load_meta(paths)?;
    if meta.version > SNAPSHOT_VERSION {
        return Err(SearchError::IncompatibleSnapshot {
            expected: SNAPSHOT_VERSION,
            actual: meta.version,
        });
    }

    let mut buf = Vec::new();
    File::open(paths.index())?.read_to_end(&mut buf)?;
    let index: InvertedIndex = bincode::deserialize(&buf)?;
    index.validate()?;
    if index.num_docs() != meta.num_docs {
        return Err(SearchError::MalformedSnapshot(format!(
            "metadata claims {} documents, index holds {}",
            meta.num_docs,
            index.num_docs()
        )));
    }
    tracing::debug!(root = %paths.root.display(), num_docs = meta.num_docs, "snapshot loaded");
    Ok(index)
}
