// Prompt surfaces for the three generation objectives

use super::{GenerationParams, Objective};

pub(super) const SYSTEM_PROMPT: &str = r#"You are "Classroom Coach", a patient pedagogue who explains clearly and accurately.

PRINCIPLES:
- Write as a supportive teacher: clear, structured, and concise.
- Use only the Context Snippets given; do not assume outside knowledge.
- If something is not in the context, avoid making it up; say "insufficient information."
- Do NOT include any citations, IDs, or references in the output.
- Output MUST be valid JSON that matches the requested schema exactly, with no extra text."#;

const SCHEMA_NOTES: &str = r#"Return JSON ONLY with this schema:
{
  "topic": "string",
  "objective": "notes",
  "level": "string",
  "language": "string",
  "style": "string",
  "summary": "string",                         // 3-6 sentences
  "key_points": ["string", "..."],             // 5-10 concise bullets
  "sections": [
    {"title": "string", "bullets": ["string", "..."]}  // 3-6 bullets
  ],
  "glossary": [
    {"term": "string", "definition": "string"}         // 5-10 entries
  ],
  "misconceptions": [
    {"statement": "string", "correction": "string"}    // 3-5 entries
  ]
}"#;

const SCHEMA_SUMMARY: &str = r#"Return JSON ONLY with this schema:
{
  "topic": "string",
  "objective": "summary",
  "level": "string",
  "language": "string",
  "style": "string",
  "summary": "string",                      // 5-8 tight sentences
  "key_points": ["string", "..."]           // 5-10 bullets
}"#;

const SCHEMA_MCQS: &str = r#"Return JSON ONLY with this schema:
{
  "topic": "string",
  "objective": "mcqs",
  "level": "string",
  "language": "string",
  "style": "string",
  "questions": [
    {
      "stem": "string",
      "options": ["A) ...", "B) ...", "C) ...", "D) ..."],
      "answer": "A",
      "explanation": "string"
    }
  ]
}"#;

fn task_block(params: &GenerationParams) -> String {
    format!(
        "TOPIC: {}\nLEVEL: {}\nSTYLE: {}\nLANGUAGE: {}\n\n\
INSTRUCTIONS:\n\
- Produce high-quality content tailored to LEVEL and STYLE.\n\
- Rely on Context Snippets. If information is missing, write \"insufficient information.\"\n\
- No citations or chunk IDs in the output.",
        params.topic, params.level, params.style, params.language
    )
}

fn schema_for(objective: Objective) -> &'static str {
    match objective {
        Objective::Notes => SCHEMA_NOTES,
        Objective::Summary => SCHEMA_SUMMARY,
        Objective::Mcqs => SCHEMA_MCQS,
    }
}

pub(super) fn build_prompt(
    objective: Objective,
    params: &GenerationParams,
    context_block: &str,
) -> String {
    format!(
        "{}\n\nOBJECTIVE: {}\n\n{}\n\n{}\n\n{}",
        SYSTEM_PROMPT,
        objective.as_str(),
        task_block(params),
        context_block,
        schema_for(objective)
    )
}
