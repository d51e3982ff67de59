use anyhow::Result;
use clap::{Parser, Subcommand};
use searchlite_core::similarity::{Bm25Params, SimilarityKind};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searchlite")]
#[command(about = "Build a term-frequency index and run ranked queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a document directory and store it as a snapshot
    Index {
        /// Directory holding the raw document files
        #[arg(long)]
        input: PathBuf,
        /// Output snapshot directory
        #[arg(long)]
        output: PathBuf,
    },
    /// Run every query in a topics file and write a retrieval run file
    Run {
        /// Directory holding the raw document files
        #[arg(long)]
        input: PathBuf,
        /// Snapshot directory (reused when present, created otherwise)
        #[arg(long)]
        index: PathBuf,
        /// Topics file: one `<query-id> <query text>` per line
        #[arg(long)]
        topics: PathBuf,
        /// Output run file
        #[arg(long)]
        runs: PathBuf,
        /// Similarity measure: tf, tfidf, or bm25
        #[arg(long, default_value = "bm25")]
        sim: SimilarityKind,
        /// Results returned per query
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// BM25 k1 parameter
        #[arg(long, default_value_t = 4.0)]
        k1: f32,
        /// BM25 b parameter
        #[arg(long, default_value_t = 0.75)]
        b: f32,
        /// System tag written in the run file
        #[arg(long, default_value = "searchlite")]
        tag: String,
        /// Ignore any stored snapshot and rebuild from the documents
        #[arg(long, default_value_t = false)]
        rebuild: bool,
    },
    /// Run one query against an existing snapshot and print the results
    Query {
        /// Snapshot directory
        #[arg(long)]
        index: PathBuf,
        /// Query text
        query: String,
        /// Similarity measure: tf, tfidf, or bm25
        #[arg(long, default_value = "bm25")]
        sim: SimilarityKind,
        /// Results returned
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// BM25 k1 parameter
        #[arg(long, default_value_t = 4.0)]
        k1: f32,
        /// BM25 b parameter
        #[arg(long, default_value_t = 0.75)]
        b: f32,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Index { input, output } => {
            searchlite_cli::build_and_save(&input, &output, searchlite_cli::default_analyzer())?;
            Ok(())
        }
        Commands::Run {
            input,
            index,
            topics,
            runs,
            sim,
            k,
            k1,
            b,
            tag,
            rebuild,
        } => searchlite_cli::run_batch(
            &input,
            &index,
            &topics,
            &runs,
            sim,
            Bm25Params { k1, b },
            k,
            &tag,
            rebuild,
        ),
        Commands::Query {
            index,
            query,
            sim,
            k,
            k1,
            b,
        } => searchlite_cli::run_single_query(&index, &query, sim, Bm25Params { k1, b }, k),
    }
}
