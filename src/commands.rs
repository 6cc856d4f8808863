use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::embeddings::ollama::OllamaEmbedder;
use crate::index::VectorIndex;
use crate::pipeline::{Level, Pipeline, PipelineRequest, SourceDocument, SourceKind, Style};

pub struct RunArgs {
    pub input: PathBuf,
    pub plan: String,
    pub level: Level,
    pub style: Style,
    pub language: String,
    pub mcq_count: usize,
    pub reingest: bool,
}

/// Run the full pipeline over a plain-text source file and print the
/// generated content as JSON on stdout.
#[inline]
pub async fn run_pipeline(args: RunArgs) -> Result<()> {
    let config = load_config()?;
    let pipeline = Pipeline::new(config).await?;

    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file: {}", args.input.display()))?;

    let label = args
        .input
        .file_stem()
        .map_or_else(|| "source".to_string(), |s| s.to_string_lossy().to_string());
    let identity = args.input.display().to_string();

    let source = SourceDocument {
        kind: SourceKind::File,
        label,
        identity,
        title: None,
        text,
    };

    let request = PipelineRequest {
        sources: vec![source],
        plan: args.plan,
        level: args.level,
        style: args.style,
        language: args.language,
        mcq_count: args.mcq_count,
        reingest: args.reingest,
    };

    let bar = progress_spinner("Running pipeline...");
    let result = pipeline.run(&request).await;
    bar.finish_and_clear();
    let result = result?;

    info!("Pipeline finished for namespace {}", result.namespace);

    eprintln!("{}", style("Pipeline complete").green().bold());
    eprintln!("  Namespace: {}", result.namespace);
    eprintln!("  Chunks: {}", result.chunk_count);
    eprintln!("  Vectors upserted: {}", result.vector_count);
    eprintln!("  Queries: {}", result.queries.len());
    eprintln!("  Fused hits: {}", result.hit_count);

    let json =
        serde_json::to_string_pretty(&result.content).context("Failed to serialize result")?;
    println!("{json}");

    Ok(())
}

/// Embed a single query and search one namespace directly
#[inline]
pub async fn search(namespace: &str, query: &str, limit: usize) -> Result<()> {
    let config = load_config()?;
    let embedder = OllamaEmbedder::new(&config)?;
    let index = VectorIndex::open(
        &config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await?;

    let vectors = embedder.embed_texts(&[query.to_string()])?;
    let vector = vectors
        .first()
        .context("Embedder returned no vector for the query")?;

    let hits = index.query(vector, namespace, limit, true).await?;

    if hits.is_empty() {
        println!("No results in namespace {namespace}");
        return Ok(());
    }

    for (rank, hit) in hits.iter().enumerate() {
        let preview = hit
            .text
            .as_deref()
            .map_or_else(String::new, |t| t.chars().take(120).collect());
        println!(
            "{:2}. {} (score {:.4})",
            rank + 1,
            style(&hit.id).cyan(),
            hit.score
        );
        if !preview.is_empty() {
            println!("     {preview}");
        }
    }

    Ok(())
}

/// Print the active configuration as TOML
#[inline]
pub fn show_config() -> Result<()> {
    let config = load_config()?;

    println!("Configuration directory: {}", config.base_dir.display());
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;
    println!("{rendered}");

    Ok(())
}

/// Delete all vectors stored under one namespace
#[inline]
pub async fn delete_namespace(namespace: &str) -> Result<()> {
    let config = load_config()?;
    let index = VectorIndex::open(
        &config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await?;

    index.delete_namespace(namespace).await?;
    println!("Deleted namespace {namespace}");

    Ok(())
}

/// Check Ollama health and report the index size
#[inline]
pub async fn show_status() -> Result<()> {
    let config = load_config()?;

    let embedder = OllamaEmbedder::new(&config)?;
    match embedder.health_check() {
        Ok(()) => println!(
            "{} Ollama reachable, model {} available",
            style("ok").green(),
            config.ollama.embedding_model
        ),
        Err(e) => println!("{} Ollama check failed: {e}", style("!!").red()),
    }

    let index = VectorIndex::open(
        &config.index_path(),
        config.ollama.embedding_dimension as usize,
    )
    .await?;
    let rows = index.count_rows().await?;
    println!("Vector index: {rows} vectors at {}", config.index_path().display());

    Ok(())
}

fn load_config() -> Result<Config> {
    let dir = Config::default_dir().context("Failed to resolve configuration directory")?;
    Config::load(dir)
}

fn progress_spinner(message: &'static str) -> ProgressBar {
    if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .expect("static template is valid"),
        );
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    } else {
        ProgressBar::hidden()
    }
}
