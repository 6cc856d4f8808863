pub mod packing;
mod prompts;


use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::index::RetrievalHit;
use crate::llm::TextGenerator;
use crate::{LessonError, Result};

pub use packing::pack_context;

/// Sentinel text used when the retrieved context cannot support an objective
pub const INSUFFICIENT_INFORMATION: &str = "insufficient information";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Character budget for the packed context block
    pub max_context_chars: usize,
    /// Approximate number of questions requested from the MCQ objective
    pub mcq_count: usize,
}

impl Default for GenerationConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_context_chars: 6000,
            mcq_count: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    Notes,
    Summary,
    Mcqs,
}

impl Objective {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Objective::Notes => "notes",
            Objective::Summary => "summary",
            Objective::Mcqs => "mcqs",
        }
    }
}

/// Inputs shared by all three objectives
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub topic: String,
    pub level: String,
    pub style: String,
    pub language: String,
    pub mcq_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NoteSection {
    pub title: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlossaryEntry {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Misconception {
    pub statement: String,
    pub correction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct McqQuestion {
    pub stem: String,
    pub options: Vec<String>,
    pub answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NotesBlock {
    pub topic: String,
    pub objective: String,
    pub level: String,
    pub language: String,
    pub style: String,
    pub summary: String,
    pub key_points: Vec<String>,
    pub sections: Vec<NoteSection>,
    pub glossary: Vec<GlossaryEntry>,
    pub misconceptions: Vec<Misconception>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SummaryBlock {
    pub topic: String,
    pub objective: String,
    pub level: String,
    pub language: String,
    pub style: String,
    pub summary: String,
    pub key_points: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct McqBlock {
    pub topic: String,
    pub objective: String,
    pub level: String,
    pub language: String,
    pub style: String,
    pub questions: Vec<McqQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_error: Option<String>,
}

/// Result of one generation run.
///
/// Every block is always present; when an objective cannot be generated it
/// carries the scaffold with `generation_error` set instead of being
/// omitted, so callers never need to null-check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationResult {
    pub topic: String,
    pub level: String,
    pub language: String,
    pub style: String,
    pub notes: NotesBlock,
    pub summary: SummaryBlock,
    pub mcqs: McqBlock,
}

/// Every block denormalizes the run parameters so it stays self-describing
/// regardless of model compliance.
trait SelfDescribing {
    fn stamp(&mut self, objective: Objective, params: &GenerationParams);
}

impl SelfDescribing for NotesBlock {
    fn stamp(&mut self, objective: Objective, params: &GenerationParams) {
        self.topic = params.topic.clone();
        self.objective = objective.as_str().to_string();
        self.level = params.level.clone();
        self.language = params.language.clone();
        self.style = params.style.clone();
    }
}

impl SelfDescribing for SummaryBlock {
    fn stamp(&mut self, objective: Objective, params: &GenerationParams) {
        self.topic = params.topic.clone();
        self.objective = objective.as_str().to_string();
        self.level = params.level.clone();
        self.language = params.language.clone();
        self.style = params.style.clone();
    }
}

impl SelfDescribing for McqBlock {
    fn stamp(&mut self, objective: Objective, params: &GenerationParams) {
        self.topic = params.topic.clone();
        self.objective = objective.as_str().to_string();
        self.level = params.level.clone();
        self.language = params.language.clone();
        self.style = params.style.clone();
    }
}

/// Drives the three generation objectives (notes, summary, MCQs) against
/// packed retrieval context via a [`TextGenerator`] backend.
pub struct ContentGenerator<'a> {
    llm: &'a dyn TextGenerator,
    config: GenerationConfig,
}

impl<'a> ContentGenerator<'a> {
    #[inline]
    pub fn new(llm: &'a dyn TextGenerator, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    /// Produce all three objectives for the given hits.
    ///
    /// Zero hits short-circuits to the full scaffold without calling the
    /// backend. Objectives are isolated from each other: a backend or
    /// parse failure in one fills that block's scaffold and records the
    /// error, leaving the remaining objectives to run normally.
    #[inline]
    pub fn generate_all(
        &self,
        params: &GenerationParams,
        hits: &[RetrievalHit],
    ) -> GenerationResult {
        if hits.is_empty() {
            info!(
                "No context retrieved for topic '{}', returning scaffold",
                params.topic
            );
            return self.scaffold(params);
        }

        let context_block = pack_context(hits, self.config.max_context_chars);
        debug!(
            "Packed {} hits into a {}-character context block",
            hits.len(),
            context_block.len()
        );

        let notes = match self.generate_block::<NotesBlock>(Objective::Notes, params, &context_block)
        {
            Ok(block) => block,
            Err(e) => {
                warn!("Notes generation failed: {}", e);
                let mut block = scaffold_notes(params);
                block.generation_error = Some(e.to_string());
                block
            }
        };

        let summary =
            match self.generate_block::<SummaryBlock>(Objective::Summary, params, &context_block) {
                Ok(block) => block,
                Err(e) => {
                    warn!("Summary generation failed: {}", e);
                    let mut block = scaffold_summary(params);
                    block.generation_error = Some(e.to_string());
                    block
                }
            };

        let mcqs = match self.generate_block::<McqBlock>(Objective::Mcqs, params, &context_block) {
            Ok(block) => block,
            Err(e) => {
                warn!("MCQ generation failed: {}", e);
                let mut block = scaffold_mcqs(params);
                block.generation_error = Some(e.to_string());
                block
            }
        };

        GenerationResult {
            topic: params.topic.clone(),
            level: params.level.clone(),
            language: params.language.clone(),
            style: params.style.clone(),
            notes,
            summary,
            mcqs,
        }
    }

    /// The deterministic all-scaffold result used when nothing was retrieved
    #[inline]
    pub fn scaffold(&self, params: &GenerationParams) -> GenerationResult {
        GenerationResult {
            topic: params.topic.clone(),
            level: params.level.clone(),
            language: params.language.clone(),
            style: params.style.clone(),
            notes: scaffold_notes(params),
            summary: scaffold_summary(params),
            mcqs: scaffold_mcqs(params),
        }
    }

    fn generate_block<T>(
        &self,
        objective: Objective,
        params: &GenerationParams,
        context_block: &str,
    ) -> Result<T>
    where
        T: DeserializeOwned + SelfDescribing,
    {
        let mut prompt = prompts::build_prompt(objective, params, context_block);
        if objective == Objective::Mcqs {
            prompt = format!(
                "{prompt}\n\nAdditional requirement: generate approximately {} questions.",
                params.mcq_count
            );
        }

        let raw = self.llm.generate(&prompt)?;
        let value = sanitize_json(&raw, objective)?;

        let mut block: T = serde_json::from_value(value).map_err(|e| {
            warn!(
                "Model output for '{}' did not match the schema: {}",
                objective.as_str(),
                e
            );
            LessonError::GenerationParse {
                objective: objective.as_str().to_string(),
            }
        })?;

        block.stamp(objective, params);
        Ok(block)
    }
}

fn scaffold_notes(params: &GenerationParams) -> NotesBlock {
    let mut block = NotesBlock {
        summary: INSUFFICIENT_INFORMATION.to_string(),
        ..NotesBlock::default()
    };
    block.stamp(Objective::Notes, params);
    block
}

fn scaffold_summary(params: &GenerationParams) -> SummaryBlock {
    let mut block = SummaryBlock {
        summary: INSUFFICIENT_INFORMATION.to_string(),
        ..SummaryBlock::default()
    };
    block.stamp(Objective::Summary, params);
    block
}

fn scaffold_mcqs(params: &GenerationParams) -> McqBlock {
    let mut block = McqBlock::default();
    block.stamp(Objective::Mcqs, params);
    block
}

/// Parse raw model output as JSON, recovering the first `{`..last `}`
/// span when the strict parse fails.
fn sanitize_json(raw: &str, objective: Objective) -> Result<Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            if let Some(span) = raw.get(start..=end) {
                if let Ok(value) = serde_json::from_str(span) {
                    return Ok(value);
                }
            }
        }
    }

    Err(LessonError::GenerationParse {
        objective: objective.as_str().to_string(),
    })
}
