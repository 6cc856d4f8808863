use thiserror::Error;

pub type Result<T> = std::result::Result<T, LessonError>;

#[derive(Error, Debug)]
pub enum LessonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No usable input text: {0}")]
    EmptyInput(String),

    #[error("Embedding backend error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Upsert aborted at batch {batch}: {committed} vectors committed ({reason})")]
    PartialUpsert {
        committed: usize,
        batch: usize,
        reason: String,
    },

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Model output for objective '{objective}' was not valid JSON")]
    GenerationParse { objective: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod llm;
mod ollama;
pub mod pipeline;
pub mod retrieval;
