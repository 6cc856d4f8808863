
use itertools::Itertools;
use std::collections::HashSet;
use tracing::debug;

use crate::Result;
use crate::llm::TextGenerator;

const MIN_QUERIES: usize = 3;
const MAX_QUERIES: usize = 12;
const MAX_QUERY_WORDS: usize = 9;
const MAX_PLAN_CHARS: usize = 6000;

/// Derives a diverse set of short retrieval queries from a free-form
/// teaching plan, improving recall over querying with the plan verbatim.
pub struct QueryExpander<'a> {
    llm: &'a dyn TextGenerator,
}

impl<'a> QueryExpander<'a> {
    #[inline]
    pub fn new(llm: &'a dyn TextGenerator) -> Self {
        Self { llm }
    }

    /// Generate about `n` short diverse queries (clamped to 3..=12) from
    /// the plan text. One query per output line is expected; malformed
    /// lines are dropped rather than failing the run.
    #[inline]
    pub fn expand(&self, plan: &str, n: usize) -> Result<Vec<String>> {
        let n = n.clamp(MIN_QUERIES, MAX_QUERIES);

        let plan_excerpt: String = plan.chars().take(MAX_PLAN_CHARS).collect();
        let prompt = build_prompt(&plan_excerpt, n);

        let raw = self.llm.generate(&prompt)?;
        let queries = parse_query_lines(&raw, n);

        debug!(
            "Expanded plan ({} chars) into {} retrieval queries",
            plan.len(),
            queries.len()
        );

        Ok(queries)
    }
}

fn build_prompt(plan: &str, n_total: usize) -> String {
    format!(
        "You are an expert assistant that helps a teacher prepare retrieval queries \
for ingested course material.

Given the teacher's topic or short plan, produce {n_total} short, diverse search queries
(no more than 15 words each) that would best retrieve relevant content chunks for
retrieval-augmented generation.

Mix styles:
- key concept phrases
- \"what is ...\" questions
- \"how does ... work\" questions
- comparison or example-based questions

Each query must stand alone, be natural English, and stay within 15 words.

Output: plain text only, ONE query per line. No numbering, no quotes, no extra text.

Content Plan:
\"\"\"{plan}\"\"\""
    )
}

/// Normalize raw LLM output into clean queries: strip bullets and quotes,
/// collapse whitespace, lowercase, truncate to 9 words, dedupe, cap at
/// `limit`.
pub(crate) fn parse_query_lines(text: &str, limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut queries = Vec::new();

    for line in text.lines() {
        let stripped = line.trim().trim_matches(['-', '•', '*']).trim();
        if stripped.is_empty() {
            continue;
        }

        let collapsed = stripped.split_whitespace().join(" ");
        let lowered = collapsed
            .trim_matches('"')
            .trim_matches('\'')
            .to_lowercase();

        let words: Vec<&str> = lowered.split_whitespace().collect();
        let query = if words.len() > MAX_QUERY_WORDS {
            words.iter().take(MAX_QUERY_WORDS).join(" ")
        } else {
            lowered
        };

        if query.is_empty() || seen.contains(&query) {
            continue;
        }

        seen.insert(query.clone());
        queries.push(query);

        if queries.len() == limit {
            break;
        }
    }

    queries
}
