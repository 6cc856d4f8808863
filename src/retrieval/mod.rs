pub mod expand;


use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::Result;
use crate::embeddings::ollama::OllamaEmbedder;
use crate::index::{RetrievalHit, VectorIndex};

pub use expand::QueryExpander;

/// Smoothing constant for reciprocal rank fusion. Lower values overweight
/// top ranks, higher values flatten the fusion.
const RRF_K: usize = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default retrieval depth after fusion
    pub top_k: usize,
    /// Neighbors fetched per expanded query before fusion
    pub per_query_k: usize,
    /// Queries derived from one teaching plan
    pub queries_per_plan: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 8,
            per_query_k: 5,
            queries_per_plan: 8,
        }
    }
}

/// Dense retrieval over a set of expanded queries, fused into one ranking
pub struct MultiQueryRetriever<'a> {
    embedder: &'a OllamaEmbedder,
    index: &'a VectorIndex,
}

impl<'a> MultiQueryRetriever<'a> {
    #[inline]
    pub fn new(embedder: &'a OllamaEmbedder, index: &'a VectorIndex) -> Self {
        Self { embedder, index }
    }

    /// Embed every query, search the namespace once per query, fuse the
    /// ranked lists with reciprocal rank fusion and return the top
    /// `final_k` hits. Empty queries yield empty output.
    #[inline]
    pub async fn retrieve(
        &self,
        namespace: &str,
        queries: &[String],
        per_query_k: usize,
        final_k: usize,
        include_text: bool,
    ) -> Result<Vec<RetrievalHit>> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vectors = self.embedder.embed_texts(queries)?;

        let mut ranked_lists = Vec::with_capacity(query_vectors.len());
        for vector in &query_vectors {
            let hits = self
                .index
                .query(vector, namespace, per_query_k, include_text)
                .await?;
            ranked_lists.push(hits);
        }

        let mut fused = rrf_fuse(&ranked_lists);
        fused.truncate(final_k);

        debug!(
            "Fused {} ranked lists into {} hits for namespace {}",
            ranked_lists.len(),
            fused.len(),
            namespace
        );

        Ok(fused)
    }
}

struct FusedEntry {
    ranks: Vec<usize>,
    best_rank: usize,
    text: Option<String>,
}

/// Reciprocal rank fusion.
///
/// Each item at 1-based rank `r` in a list contributes `1 / (RRF_K + r)`
/// to its total. Per-item contributions are summed in sorted rank order,
/// so the fused scores are bit-identical no matter which list is processed
/// first. Ties are broken by best single rank, then id, keeping the final
/// ordering commutative as well. The first non-empty text seen for an id
/// is retained.
#[inline]
pub fn rrf_fuse(ranked_lists: &[Vec<RetrievalHit>]) -> Vec<RetrievalHit> {
    let mut table: HashMap<String, FusedEntry> = HashMap::new();

    for ranked in ranked_lists {
        for (i, hit) in ranked.iter().enumerate() {
            let rank = i + 1;
            let entry = table.entry(hit.id.clone()).or_insert_with(|| FusedEntry {
                ranks: Vec::new(),
                best_rank: usize::MAX,
                text: None,
            });

            entry.ranks.push(rank);
            if rank < entry.best_rank {
                entry.best_rank = rank;
            }
            if entry.text.is_none() && hit.text.is_some() {
                entry.text = hit.text.clone();
            }
        }
    }

    let mut fused: Vec<(String, f32, usize, Option<String>)> = table
        .into_iter()
        .map(|(id, mut entry)| {
            entry.ranks.sort_unstable();
            let score: f64 = entry
                .ranks
                .iter()
                .map(|rank| 1.0 / (RRF_K + rank) as f64)
                .sum();
            (id, score as f32, entry.best_rank, entry.text)
        })
        .collect();

    fused.sort_by(|a, b| {
        b.1.total_cmp(&a.1)
            .then(a.2.cmp(&b.2))
            .then_with(|| a.0.cmp(&b.0))
    });

    fused
        .into_iter()
        .map(|(id, score, _, text)| RetrievalHit { id, score, text })
        .collect()
}
