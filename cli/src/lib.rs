use anyhow::{Context, Result};
use searchlite_core::persist::{load_snapshot, save_snapshot, SnapshotPaths};
use searchlite_core::similarity::{Bm25Params, SimilarityKind};
use searchlite_core::tokenizer::{Analyzer, EnglishAnalyzer};
use searchlite_core::{Indexer, InvertedIndex, QueryEngine};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

pub fn default_analyzer() -> Arc<dyn Analyzer> {
    Arc::new(EnglishAnalyzer::new())
}

/// Every file under `input`, in sorted order so document ids come out the
/// same on every build of the same tree. The file name is the external
/// document id, matching the collection's naming convention.
pub fn collect_documents(input: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let external_id = entry.file_name().to_string_lossy().into_owned();
        documents.push((external_id, entry.path().to_path_buf()));
    }
    Ok(documents)
}

/// Builds a fresh index over every document under `input`. The batch aborts
/// on the first unreadable or unprocessable document; skip-and-continue is
/// deliberately not offered here.
pub fn build_index(input: &Path, analyzer: Arc<dyn Analyzer>) -> Result<InvertedIndex> {
    let documents = collect_documents(input)?;
    let mut indexer = Indexer::new(analyzer);
    for (external_id, path) in &documents {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        indexer
            .add_document(external_id, &text)
            .with_context(|| format!("indexing {}", path.display()))?;
    }
    let index = indexer.into_index();
    tracing::info!(
        num_docs = index.num_docs(),
        num_terms = index.num_terms(),
        input = %input.display(),
        "index built"
    );
    Ok(index)
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| String::new())
}

/// Builds the index and writes it as a snapshot under `index_dir`.
pub fn build_and_save(input: &Path, index_dir: &Path, analyzer: Arc<dyn Analyzer>) -> Result<InvertedIndex> {
    let index = build_index(input, analyzer)?;
    let paths = SnapshotPaths::new(index_dir);
    save_snapshot(&paths, &index, &now_rfc3339())?;
    tracing::info!(index_dir = %index_dir.display(), "snapshot written");
    Ok(index)
}

/// Reuses the snapshot under `index_dir` when one is present and loads
/// cleanly; otherwise (or when `force` is set) rebuilds from `input` and
/// replaces the snapshot. A snapshot that fails its invariant checks is
/// logged and rebuilt rather than trusted.
pub fn load_or_build(
    input: &Path,
    index_dir: &Path,
    force: bool,
    analyzer: Arc<dyn Analyzer>,
) -> Result<InvertedIndex> {
    let paths = SnapshotPaths::new(index_dir);
    if !force && paths.exists() {
        match load_snapshot(&paths) {
            Ok(index) => {
                tracing::info!(index_dir = %index_dir.display(), "reusing stored index");
                return Ok(index);
            }
            Err(err) => {
                tracing::warn!(%err, "stored index unusable, rebuilding");
            }
        }
    }
    build_and_save(input, index_dir, analyzer)
}

/// One parsed topics-file line: `<query-id> <query text>`. Lines without a
/// leading numeric id (or without text) are skipped by the caller.
pub fn parse_topic(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    let digits_end = line
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(line.len());
    if digits_end == 0 {
        return None;
    }
    let (query_id, rest) = line.split_at(digits_end);
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }
    Some((query_id.to_string(), text.to_string()))
}

/// One retrieval-evaluation output line:
/// `query_id Q0 document_id rank score tag`. Ranks start at 0.
pub fn format_run_line(
    query_id: &str,
    external_id: &str,
    rank: usize,
    score: f32,
    tag: &str,
) -> String {
    format!("{query_id} Q0 {external_id} {rank} {score} {tag}")
}

/// Runs every topic through `engine` and writes the ranked results to
/// `runs`, replacing any previous run file.
pub fn run_topics(
    engine: &QueryEngine,
    topics: &Path,
    runs: &Path,
    k: usize,
    tag: &str,
) -> Result<()> {
    let reader = BufReader::new(
        File::open(topics).with_context(|| format!("opening topics file {}", topics.display()))?,
    );
    if let Some(parent) = runs.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(
        File::create(runs).with_context(|| format!("creating runs file {}", runs.display()))?,
    );

    let mut num_topics = 0usize;
    let mut num_results = 0usize;
    for line in reader.lines() {
        let line = line?;
        let Some((query_id, text)) = parse_topic(&line) else {
            continue;
        };
        num_topics += 1;
        let hits = engine.query(&text, k)?;
        tracing::debug!(query_id, hits = hits.len(), "ran topic");
        for (rank, hit) in hits.iter().enumerate() {
            writeln!(
                writer,
                "{}",
                format_run_line(&query_id, &hit.external_id, rank, hit.score, tag)
            )?;
            num_results += 1;
        }
    }
    writer.flush()?;
    tracing::info!(num_topics, num_results, runs = %runs.display(), "run file written");
    Ok(())
}

/// Everything the `run` subcommand does: obtain an index (cached or fresh),
/// bind the requested measure, and batch-run the topics file.
#[allow(clippy::too_many_arguments)]
pub fn run_batch(
    input: &Path,
    index_dir: &Path,
    topics: &Path,
    runs: &Path,
    kind: SimilarityKind,
    params: Bm25Params,
    k: usize,
    tag: &str,
    rebuild: bool,
) -> Result<()> {
    let analyzer = default_analyzer();
    let index = Arc::new(load_or_build(input, index_dir, rebuild, Arc::clone(&analyzer))?);
    let mut engine = QueryEngine::new(analyzer, index);
    engine.bind_similarity(kind, params);
    tracing::info!(similarity = %kind, k, "similarity bound");
    run_topics(&engine, topics, runs, k, tag)
}

/// One-off query against an existing snapshot, printed to stdout.
pub fn run_single_query(
    index_dir: &Path,
    query: &str,
    kind: SimilarityKind,
    params: Bm25Params,
    k: usize,
) -> Result<()> {
    let analyzer = default_analyzer();
    let index = Arc::new(load_snapshot(&SnapshotPaths::new(index_dir))?);
    let mut engine = QueryEngine::new(analyzer, index);
    engine.bind_similarity(kind, params);
    let hits = engine.query(query, k)?;
    if hits.is_empty() {
        println!("no matching documents");
        return Ok(());
    }
    for (rank, hit) in hits.iter().enumerate() {
        println!("{:>3}. {} {}", rank, hit.external_id, hit.score);
    }
    Ok(())
}
