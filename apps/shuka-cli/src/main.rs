//! Shuka operator CLI.
//!
//! ```bash
//! shuka search "what is the soul" -l en -n 5
//! shuka search "bg 2.13" -l ru
//! shuka keyword "Кришна" -l ru --case-sensitive
//! shuka health
//! shuka build-keyword -l en
//! shuka import-vectors -l en vectors_en.json
//! ```
//!
//! Results are printed as pretty JSON; logs go to stderr (`RUST_LOG`).
mod artifacts;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use shuka_core::config::{Config, Settings};
use shuka_core::{Language, SearchRequest};
use shuka_hybrid::{Engine, FailureResponse};

#[derive(Parser)]
#[command(name = "shuka", version, about = "Hybrid scripture search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hybrid search: citation shortcut, vector + keyword retrieval, fusion, rerank
    Search {
        query: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Number of results (defaults to search.default_top_k)
        #[arg(short = 'n', long, default_value_t = 0)]
        top_k: usize,
        #[arg(long)]
        no_rerank: bool,
        #[arg(long)]
        no_expand: bool,
        /// Drop vector hits farther than this squared L2 distance
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Literal substring search over every chunk
    Keyword {
        query: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        #[arg(long)]
        case_sensitive: bool,
    },
    /// Loaded languages, row counts and reranker mode
    Health,
    /// Rebuild a language's keyword index from its metadata and corpus files
    BuildKeyword {
        #[arg(short, long)]
        language: Language,
    },
    /// Write precomputed vectors (JSON array, one per row) into the vector table
    ImportVectors {
        #[arg(short, long)]
        language: Language,
        input: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the failure envelope and map the error to an exit code.
fn fail(e: &shuka_core::Error) -> Result<ExitCode> {
    print_json(&FailureResponse::from(e))?;
    Ok(if e.is_client_error() { ExitCode::from(2) } else { ExitCode::FAILURE })
}

async fn run(command: Command, settings: Settings) -> Result<ExitCode> {
    match command {
        Command::Search { query, language, top_k, no_rerank, no_expand, threshold } => {
            let engine = match Engine::load(&settings).await {
                Ok(engine) => engine,
                Err(e) => return fail(&e),
            };
            let request = SearchRequest {
                query,
                language,
                top_k,
                use_reranking: !no_rerank,
                expand_query: !no_expand,
                distance_threshold: threshold,
            };
            match engine.search(&request).await {
                Ok(response) => print_json(&response)?,
                Err(e) => return fail(&e),
            }
        }
        Command::Keyword { query, language, case_sensitive } => {
            let engine = match Engine::load(&settings).await {
                Ok(engine) => engine,
                Err(e) => return fail(&e),
            };
            match engine.keyword_search(&query, &language, case_sensitive) {
                Ok(response) => print_json(&response)?,
                Err(e) => return fail(&e),
            }
        }
        Command::Health => match Engine::load(&settings).await {
            Ok(engine) => print_json(&engine.health())?,
            Err(e) => return fail(&e),
        },
        Command::BuildKeyword { language } => print_json(&artifacts::build_keyword(&settings, language)?)?,
        Command::ImportVectors { language, input } => {
            print_json(&artifacts::import_vectors(&settings, language, &input).await?)?
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    run(cli.command, settings).await
}
