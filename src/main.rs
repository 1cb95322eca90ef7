use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// Import from our modular crates
use rab_backends::{HttpEmbeddingBackend, HttpGenerationBackend, HttpTraceSink};
use rab_core::{DocumentUnit, RagConfig};
use rab_index::Retriever;
use rab_serve::{AnswerOptions, AnswerService, Embedder, PipelineOrchestrator};

#[derive(Parser)]
#[command(name = "rab")]
#[command(about = "Retrieval-augmented answer backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and publish the vector index from cleaned document units
    Build {
        /// Path to the cleaner's output, one JSON document unit per line
        #[arg(short, long)]
        units: PathBuf,
    },
    /// Answer a single question against the published index
    Ask {
        /// The question text
        question: String,
    },
    /// Report whether the index is built and loadable
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Configuration problems fail fast, before any build work or traffic.
    let config = RagConfig::from_env()?;

    match cli.command {
        Commands::Build { units } => run_build(&config, &units).await,
        Commands::Ask { question } => run_ask(&config, &question).await,
        Commands::Status => run_status(&config),
    }
}

async fn run_build(config: &RagConfig, units_path: &Path) -> Result<()> {
    let units = read_units(units_path)?;
    println!(
        "{} {} document units from {}",
        "→".blue(),
        units.len(),
        units_path.display()
    );

    let backend = Arc::new(HttpEmbeddingBackend::new(
        &config.embedding,
        config.embedding_dimension,
        config.backend_timeout,
    )?);
    let embedder = Embedder::new(backend, config.embed_batch_size, config.retry.clone());
    let orchestrator = PipelineOrchestrator::new(
        embedder,
        &config.index_path,
        config.embedding.model_id.clone(),
        config.embedding_dimension,
    );

    let report = orchestrator.run_build(units).await?;

    println!(
        "{} index built: {} entries ({} units skipped), published to {}",
        "✅".green(),
        report.entries,
        report.units_skipped,
        report.artifact_path.display()
    );
    Ok(())
}

async fn run_ask(config: &RagConfig, question: &str) -> Result<()> {
    let embedding = Arc::new(HttpEmbeddingBackend::new(
        &config.embedding,
        config.embedding_dimension,
        config.backend_timeout,
    )?);
    let generation = Arc::new(HttpGenerationBackend::new(
        &config.generation,
        config.backend_timeout,
    )?);
    let trace = Arc::new(HttpTraceSink::new(&config.trace_url, config.backend_timeout)?);

    // A missing or corrupt index is not fatal for a single question: the
    // service degrades to answering without retrieved context.
    let retriever = match Retriever::load(&config.index_path) {
        Ok(retriever) => Some(Arc::new(retriever)),
        Err(e) => {
            println!(
                "{} {}; answering without retrieved context",
                "⚠️".yellow(),
                e
            );
            None
        }
    };

    let service = AnswerService::new(
        Embedder::new(embedding, config.embed_batch_size, config.retry.clone()),
        retriever,
        generation,
        trace,
        AnswerOptions::from_config(config),
    );

    let response =
        match tokio::time::timeout(config.request_timeout, service.handle(question)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let payload = e.to_payload();
                tracing::error!(error = %e, kind = %payload.kind, "request failed");
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }
            Err(_) => {
                // The request budget cancels all outstanding backend calls by
                // dropping the in-flight future; emitted trace events stand.
                let payload = rab_core::Error::Timeout("request exceeded its budget".to_string())
                    .to_payload();
                println!("{}", serde_json::to_string_pretty(&payload)?);
                return Ok(());
            }
        };

    if response.degraded {
        println!("{} degraded answer (no retrieved context)", "⚠️".yellow());
    }
    println!("{}", response.answer.bold());

    if !response.citations.is_empty() {
        println!("\n{}", "Citations:".cyan());
        for citation in &response.citations {
            println!(
                "  {}. {} ({:.3})",
                citation.rank, citation.source, citation.score
            );
        }
    }
    println!("\n{} {}", "trace:".dimmed(), response.trace_id);
    Ok(())
}

fn run_status(config: &RagConfig) -> Result<()> {
    if !rab_index::probe_ready(&config.index_path) {
        println!(
            "{} not ready: no published index at {}",
            "●".red(),
            config.index_path.display()
        );
        return Ok(());
    }

    match Retriever::load(&config.index_path) {
        Ok(retriever) => println!(
            "{} ready: {} entries, dimension {}, model {}",
            "●".green(),
            retriever.len(),
            retriever.dimension(),
            retriever.model_id()
        ),
        Err(e) => println!("{} not ready: {}", "●".red(), e),
    }
    Ok(())
}

fn read_units(path: &Path) -> Result<Vec<DocumentUnit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let mut units = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let unit: DocumentUnit = serde_json::from_str(line)
            .with_context(|| format!("invalid document unit on line {}", lineno + 1))?;
        units.push(unit);
    }
    Ok(units)
}
