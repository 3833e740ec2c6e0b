use anyhow::Result;
use clap::{Parser, Subcommand};
use newsrec_core::persist::{save_index, IndexPaths};
use newsrec_core::{build_index, RawArticle, VectorizerConfig};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Precompute the article similarity index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Drop terms found in fewer documents than this
        #[arg(long, default_value_t = 2)]
        min_df: usize,
        /// Drop terms found in more than this fraction of documents
        #[arg(long, default_value_t = 0.8)]
        max_df: f32,
        /// Shortest n-gram
        #[arg(long, default_value_t = 1)]
        ngram_min: usize,
        /// Longest n-gram
        #[arg(long, default_value_t = 3)]
        ngram_max: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, min_df, max_df, ngram_min, ngram_max } => {
            let config = VectorizerConfig::default()
                .with_min_df(min_df)
                .with_max_df(max_df)
                .with_ngram_range(ngram_min, ngram_max);
            run_build(Path::new(&input), Path::new(&output), config)
        }
    }
}

fn run_build(input: &Path, output: &Path, config: VectorizerConfig) -> Result<()> {
    let rows = read_corpus(input)?;
    tracing::info!(rows = rows.len(), input = %input.display(), "read corpus");

    // Nothing is written unless the whole pipeline succeeds.
    let built = build_index(rows, config)?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)?;
    save_index(&IndexPaths::new(output), &built, created_at)?;

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

/// Collect rows from a single file or every `.json`/`.jsonl` file below a directory, in path order.
fn read_corpus(input: &Path) -> Result<Vec<RawArticle>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(extension(p), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input {} does not exist", input.display());
    }

    let mut rows = Vec::new();
    for file in files {
        if extension(&file) == Some("jsonl") {
            read_jsonl(&file, &mut rows)?;
        } else {
            read_json(&file, &mut rows)?;
        }
    }
    Ok(rows)
}

fn extension(p: &Path) -> Option<&str> {
    p.extension().and_then(|s| s.to_str())
}

fn read_jsonl(file: &Path, rows: &mut Vec<RawArticle>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        rows.push(serde_json::from_str(&line)?);
    }
    Ok(())
}

fn read_json(file: &Path, rows: &mut Vec<RawArticle>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                rows.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => rows.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping non-object JSON input"),
    }
    Ok(())
}
