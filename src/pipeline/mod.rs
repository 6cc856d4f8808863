#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::embeddings::chunking::{Chunk, ChunkingConfig, make_chunks};
use crate::embeddings::ollama::OllamaEmbedder;
use crate::generation::{ContentGenerator, GenerationParams, GenerationResult};
use crate::index::VectorIndex;
use crate::llm::{OllamaGenerator, TextGenerator};
use crate::retrieval::{MultiQueryRetriever, QueryExpander};
use crate::{LessonError, Result};

/// Vectors written to the index per request, sized for backend payload limits
const UPSERT_BATCH_SIZE: usize = 100;

/// Presentation style of the generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Style {
    Concise,
    Detailed,
    ExamPrep,
}

impl Style {
    /// Fixed policy mapping style to retrieval depth after fusion
    #[inline]
    pub fn final_k(self) -> usize {
        match self {
            Style::Concise => 3,
            Style::Detailed => 8,
            Style::ExamPrep => 5,
        }
    }
}

impl fmt::Display for Style {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Style::Concise => "concise",
            Style::Detailed => "detailed",
            Style::ExamPrep => "exam-prep",
        };
        f.write_str(name)
    }
}

impl FromStr for Style {
    type Err = LessonError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "concise" => Ok(Style::Concise),
            "detailed" => Ok(Style::Detailed),
            "exam-prep" => Ok(Style::ExamPrep),
            other => Err(LessonError::Config(format!(
                "unknown style '{}' (expected concise, detailed or exam-prep)",
                other
            ))),
        }
    }
}

/// Target audience level of the generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Level {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        };
        f.write_str(name)
    }
}

impl FromStr for Level {
    type Err = LessonError;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            other => Err(LessonError::Config(format!(
                "unknown level '{}' (expected beginner, intermediate or advanced)",
                other
            ))),
        }
    }
}

/// Kind of ingested source, the first namespace component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Video,
    Article,
    File,
    Combined,
}

impl fmt::Display for SourceKind {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Video => "video",
            SourceKind::Article => "article",
            SourceKind::File => "file",
            SourceKind::Combined => "combined",
        };
        f.write_str(name)
    }
}

/// One extracted source ready for ingestion.
///
/// Extraction itself (transcripts, scraping, file parsing) happens outside
/// the pipeline; only non-empty text matters here.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub kind: SourceKind,
    /// Human-readable namespace component, e.g. a domain or file stem
    pub label: String,
    /// Stable identity hashed into the namespace, e.g. a URL or path
    pub identity: String,
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub sources: Vec<SourceDocument>,
    /// Free-form teaching plan driving query expansion and topic inference
    pub plan: String,
    pub level: Level,
    pub style: Style,
    pub language: String,
    pub mcq_count: usize,
    /// When false, skip ingestion and retrieve against the existing namespace
    pub reingest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub namespace: String,
    pub chunk_count: usize,
    pub vector_count: usize,
    pub queries: Vec<String>,
    pub hit_count: usize,
    pub content: GenerationResult,
}

/// End-to-end orchestrator: chunk, embed, upsert, expand, retrieve, pack
/// and generate for one source batch and plan.
///
/// Owns all per-run state; only the vector index persists across runs, and
/// namespace partitioning keeps concurrent runs from interfering.
pub struct Pipeline {
    config: Config,
    embedder: OllamaEmbedder,
    index: VectorIndex,
    llm: Box<dyn TextGenerator>,
}

impl Pipeline {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let embedder = OllamaEmbedder::new(&config)?;
        let index = VectorIndex::open(
            &config.index_path(),
            config.ollama.embedding_dimension as usize,
        )
        .await?;
        let llm: Box<dyn TextGenerator> = Box::new(OllamaGenerator::new(&config)?);

        Ok(Self {
            config,
            embedder,
            index,
            llm,
        })
    }

    /// Swap the generation backend for an alternative implementation
    #[inline]
    pub fn with_generator(mut self, llm: Box<dyn TextGenerator>) -> Self {
        self.llm = llm;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn embedder(&self) -> &OllamaEmbedder {
        &self.embedder
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Run the full pipeline for one request.
    ///
    /// Ingestion-stage failures abort before any generation is attempted;
    /// empty retrieval is not a failure and yields the scaffold result.
    #[inline]
    pub async fn run(&self, request: &PipelineRequest) -> Result<PipelineResult> {
        let namespace = derive_namespace(&request.sources)?;
        info!("Running pipeline for namespace {}", namespace);

        let mut chunk_count = 0;
        let mut vector_count = 0;

        if request.reingest {
            let chunks = collect_chunks(&request.sources, &self.config.chunking)?;
            chunk_count = chunks.len();
            debug!("Collected {} chunks from {} sources", chunk_count, request.sources.len());

            let embedded = self.embedder.embed_chunks(&namespace, &chunks)?;

            self.index.ensure_index().await?;
            vector_count = self
                .index
                .upsert(&namespace, &embedded, UPSERT_BATCH_SIZE)
                .await?;
        } else {
            info!("Skipping re-ingest for namespace {}", namespace);
        }

        let expander = QueryExpander::new(self.llm.as_ref());
        let queries = expander.expand(&request.plan, self.config.retrieval.queries_per_plan)?;
        info!("Expanded plan into {} retrieval queries", queries.len());

        let final_k = request.style.final_k();
        let retriever = MultiQueryRetriever::new(&self.embedder, &self.index);
        let hits = retriever
            .retrieve(
                &namespace,
                &queries,
                self.config.retrieval.per_query_k,
                final_k,
                true,
            )
            .await?;
        info!("Retrieved {} fused hits (final_k {})", hits.len(), final_k);

        let params = GenerationParams {
            topic: infer_topic(&request.plan),
            level: request.level.to_string(),
            style: request.style.to_string(),
            language: request.language.clone(),
            mcq_count: request.mcq_count,
        };
        let generator = ContentGenerator::new(self.llm.as_ref(), self.config.generation.clone());
        let content = generator.generate_all(&params, &hits);

        Ok(PipelineResult {
            namespace,
            chunk_count,
            vector_count,
            queries,
            hit_count: hits.len(),
            content,
        })
    }
}

/// Derive the namespace for a source batch.
///
/// A single source keeps its own kind and label; several sources share one
/// combined namespace hashed over all their identities.
#[inline]
pub fn derive_namespace(sources: &[SourceDocument]) -> Result<String> {
    match sources {
        [] => Err(LessonError::EmptyInput(
            "pipeline request has no sources".to_string(),
        )),
        [single] => Ok(namespace_for(single.kind, &single.label, &single.identity)),
        many => {
            let identity = many.iter().map(|s| s.identity.as_str()).join("|");
            Ok(namespace_for(SourceKind::Combined, "session", &identity))
        }
    }
}

/// Deterministic namespace key: `<kind>:<label>:<digest8>` where the digest
/// is the UUIDv5 of the source identity.
#[inline]
pub fn namespace_for(kind: SourceKind, label: &str, identity: &str) -> String {
    let digest = Uuid::new_v5(&Uuid::NAMESPACE_URL, identity.as_bytes())
        .simple()
        .to_string();
    format!("{}:{}:{:.8}", kind, label, digest)
}

/// Chunk every source, skipping sources with no usable text; globally
/// re-indexes chunks so ids stay unique across the batch.
fn collect_chunks(sources: &[SourceDocument], config: &ChunkingConfig) -> Result<Vec<Chunk>> {
    let mut all = Vec::new();

    for source in sources {
        match make_chunks(&source.text, config) {
            Ok(chunks) => {
                for mut chunk in chunks {
                    chunk.index = all.len();
                    all.push(chunk);
                }
            }
            Err(LessonError::EmptyInput(_)) => {
                warn!("Skipping source '{}' with no usable text", source.label);
            }
            Err(e) => return Err(e),
        }
    }

    if all.is_empty() {
        return Err(LessonError::EmptyInput(
            "no source produced any chunks".to_string(),
        ));
    }

    Ok(all)
}

/// Infer a human-friendly topic label from the plan text: the first
/// non-empty line trimmed to 80 characters, else the first few words.
fn infer_topic(plan: &str) -> String {
    for line in plan.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            return trimmed.chars().take(80).collect::<String>().trim().to_string();
        }
    }

    let words: Vec<&str> = plan.split_whitespace().collect();
    if words.is_empty() {
        return "Untitled Topic".to_string();
    }
    words.iter().take(8).join(" ")
}
