use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lessonkit::Result;
use lessonkit::commands::{RunArgs, delete_namespace, run_pipeline, search, show_config, show_status};
use lessonkit::pipeline::{Level, Style};

#[derive(Parser)]
#[command(name = "lessonkit")]
#[command(about = "Turns source documents into teaching content (notes, summaries, MCQs) via RAG")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline over a plain-text source file
    Run {
        /// Path to the source text file
        #[arg(long)]
        input: PathBuf,
        /// Teaching plan: topics and notes driving retrieval and generation
        #[arg(long)]
        plan: String,
        /// Target audience: beginner, intermediate or advanced
        #[arg(long, default_value = "beginner")]
        level: String,
        /// Presentation style: concise, detailed or exam-prep
        #[arg(long, default_value = "concise")]
        style: String,
        /// Output language code
        #[arg(long, default_value = "en")]
        language: String,
        /// Approximate number of multiple-choice questions to request
        #[arg(long, default_value_t = 8)]
        mcq_count: usize,
        /// Reuse previously ingested vectors instead of re-ingesting
        #[arg(long)]
        no_reingest: bool,
    },
    /// Search one namespace with a single query
    Search {
        /// Namespace to search, e.g. "file:notes:abcd1234"
        #[arg(long)]
        namespace: String,
        /// Query text
        #[arg(long)]
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 8)]
        limit: usize,
    },
    /// Show the active configuration
    Config,
    /// Delete all vectors stored under a namespace
    Delete {
        /// Namespace to delete
        #[arg(long)]
        namespace: String,
    },
    /// Check backend health and index size
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            plan,
            level,
            style,
            language,
            mcq_count,
            no_reingest,
        } => {
            let args = RunArgs {
                input,
                plan,
                level: level.parse::<Level>()?,
                style: style.parse::<Style>()?,
                language,
                mcq_count,
                reingest: !no_reingest,
            };
            run_pipeline(args).await?;
        }
        Commands::Search {
            namespace,
            query,
            limit,
        } => {
            search(&namespace, &query, limit).await?;
        }
        Commands::Config => {
            show_config()?;
        }
        Commands::Delete { namespace } => {
            delete_namespace(&namespace).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
