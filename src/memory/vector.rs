use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::EmbeddingProvider;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub id: String,
    pub content: String,
    #[serde(skip)]
    pub embedding: Vec<f32>,
    pub metadata: Map<String, Value>,
    pub tags: Vec<String>,
    pub importance: f64,
    pub access_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entry: MemoryEntry,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub total_memories: usize,
    pub avg_importance: f64,
    pub avg_access_count: f64,
}

/// Embedded snippets with brute-force cosine search.
pub struct VectorMemorySystem {
    embedder: Arc<dyn EmbeddingProvider>,
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl VectorMemorySystem {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Embeds and stores `content`. An embedding failure is logged and
    /// nothing is stored.
    pub async fn store(
        &self,
        content: &str,
        metadata: Map<String, Value>,
        tags: Vec<String>,
    ) -> Option<String> {
        let embedding = match self.embedder.embed(content).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "wpo::memory", error = %e, "embedding failed; memory not stored");
                return None;
            }
        };
        let now = Utc::now();
        let entry = MemoryEntry {
            id: format!("mem_{}", Uuid::new_v4().simple()),
            content: content.to_string(),
            embedding,
            importance: importance(content, &metadata),
            metadata,
            tags,
            access_count: 0,
            created_at: now,
            last_accessed: now,
        };
        let id = entry.id.clone();
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), entry);
        tracing::debug!(target: "wpo::memory", %id, "memory stored");
        Some(id)
    }

    /// Top `top_k` entries by similarity to `query`. Returned entries have
    /// their access statistics bumped.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let vector = match self.embedder.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "wpo::memory", error = %e, "query embedding failed");
                return Vec::new();
            }
        };
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<(String, f64)> = guard
            .values()
            .map(|e| (e.id.clone(), cosine_similarity(&vector, &e.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        let now = Utc::now();
        scored
            .into_iter()
            .filter_map(|(id, score)| {
                let entry = guard.get_mut(&id)?;
                entry.access_count += 1;
                entry.last_accessed = now;
                Some(SearchHit {
                    entry: entry.clone(),
                    score,
                })
            })
            .collect()
    }

    /// Nearest neighbours of a stored entry, excluding the entry itself.
    pub fn find_similar(&self, id: &str, top_k: usize) -> Vec<SearchHit> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let Some(origin) = guard.get(id) else {
            return Vec::new();
        };
        let mut hits: Vec<SearchHit> = guard
            .values()
            .filter(|e| e.id != id)
            .map(|e| SearchHit {
                score: cosine_similarity(&origin.embedding, &e.embedding),
                entry: e.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        hits
    }

    pub fn get(&self, id: &str) -> Option<MemoryEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> MemoryStats {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        if guard.is_empty() {
            return MemoryStats::default();
        }
        let n = guard.len() as f64;
        MemoryStats {
            total_memories: guard.len(),
            avg_importance: guard.values().map(|e| e.importance).sum::<f64>() / n,
            avg_access_count: guard.values().map(|e| f64::from(e.access_count)).sum::<f64>() / n,
        }
    }

    /// Drops entries idle for longer than `max_age` whose importance is
    /// below 0.5. Returns how many were removed.
    pub fn prune(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, e| !(e.last_accessed < cutoff && e.importance < 0.5));
        let removed = before - guard.len();
        if removed > 0 {
            tracing::info!(target: "wpo::memory", removed, "pruned stale memories");
        }
        removed
    }
}

/// 0 when lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

fn importance(content: &str, metadata: &Map<String, Value>) -> f64 {
    let mut score = 0.5;
    let len = content.chars().count();
    if len > 500 {
        score += 0.1;
    }
    if len > 1000 {
        score += 0.1;
    }
    score += (metadata.len() as f64 * 0.05).min(0.2);
    if metadata.get("priority").and_then(Value::as_str) == Some("high") {
        score += 0.2;
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    /// Maps text onto letter-frequency buckets so similar words land close.
    struct LetterEmbeddings;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbeddings {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            if text.is_empty() {
                return Err(LlmError::EmptyResponse);
            }
            let mut v = vec![0f32; 26];
            for c in text.to_ascii_lowercase().bytes().filter(u8::is_ascii_lowercase) {
                v[(c - b'a') as usize] += 1.0;
            }
            Ok(v)
        }
    }

    fn system() -> VectorMemorySystem {
        VectorMemorySystem::new(Arc::new(LetterEmbeddings))
    }

    #[test]
    fn cosine_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }

    #[test]
    fn importance_weights() {
        let mut meta = Map::new();
        assert!((importance("short", &meta) - 0.5).abs() < 1e-9);
        assert!((importance(&"x".repeat(1001), &meta) - 0.7).abs() < 1e-9);
        meta.insert("priority".into(), Value::from("high"));
        meta.insert("kind".into(), Value::from("serp"));
        assert!((importance("short", &meta) - 0.8).abs() < 1e-9);
        for i in 0..10 {
            meta.insert(format!("k{i}"), Value::from(i));
        }
        assert!((importance(&"x".repeat(1001), &meta) - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn search_ranks_and_counts_access() {
        let mem = system();
        let a = mem.store("aaaa", Map::new(), vec![]).await.unwrap();
        mem.store("zzzz", Map::new(), vec![]).await.unwrap();
        let hits = mem.search("aaab", 1).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, a);
        assert_eq!(mem.get(&a).unwrap().access_count, 1);
        assert_eq!(mem.stats().total_memories, 2);
    }

    #[tokio::test]
    async fn failed_embedding_stores_nothing() {
        let mem = system();
        assert!(mem.store("", Map::new(), vec![]).await.is_none());
        assert!(mem.is_empty());
        assert!(mem.search("", 5).await.is_empty());
    }

    #[tokio::test]
    async fn find_similar_excludes_self_and_prune_keeps_important() {
        let mem = system();
        let a = mem.store("abc", Map::new(), vec![]).await.unwrap();
        mem.store("abd", Map::new(), vec![]).await.unwrap();
        let hits = mem.find_similar(&a, 5);
        assert_eq!(hits.len(), 1);
        assert_ne!(hits[0].entry.id, a);

        let mut meta = Map::new();
        meta.insert("priority".into(), Value::from("low"));
        // Importance 0.55 survives; plain entries (0.5) are kept too.
        mem.store("keep", meta, vec![]).await.unwrap();
        assert_eq!(mem.prune(Duration::zero() - Duration::seconds(1)), 0);
        assert_eq!(mem.prune(Duration::days(7)), 0);
        assert_eq!(mem.len(), 3);
    }
}
