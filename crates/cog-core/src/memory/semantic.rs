//! Semantic Index
//!
//! Approximate nearest-neighbor search over concept and myth embeddings.
//! Embeddings are deterministic hashed bag-of-token vectors; recall is
//! approximate by contract, but results are fully reproducible: ties are
//! broken by entry id.

use std::collections::BTreeMap;

/// Embedding dimensionality.
pub const EMBED_DIM: usize = 32;

/// Prevents division by zero in cosine similarity calculation.
pub const COSINE_EPSILON: f32 = 1e-8;

/// One indexed entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticEntry {
    pub id: String,
    pub text: String,
    pub vector: [f32; EMBED_DIM],
}

/// The semantic vector index.
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    entries: BTreeMap<String, SemanticEntry>,
}

/// Embeds text as a signed hashed bag of tokens, L2-normalized.
pub fn embed(text: &str) -> [f32; EMBED_DIM] {
    let mut vector = [0.0f32; EMBED_DIM];
    for token in text.split_whitespace() {
        let hash = fnv1a(token.as_bytes());
        let bucket = (hash % EMBED_DIM as u64) as usize;
        let sign = if hash & (1u64 << 32) == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > COSINE_EPSILON {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xCBF2_9CE4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Cosine similarity between two embeddings.
pub fn cosine(a: &[f32; EMBED_DIM], b: &[f32; EMBED_DIM]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    dot / (norm_a * norm_b + COSINE_EPSILON)
}

impl SemanticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry, embedding its text.
    pub fn upsert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let text = text.into();
        let vector = embed(&text);
        self.entries.insert(
            id.clone(),
            SemanticEntry { id, text, vector },
        );
    }

    pub fn get(&self, id: &str) -> Option<&SemanticEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// K nearest entries to the query vector by cosine similarity.
    /// Equal similarities are ordered by id so results are reproducible.
    pub fn search(&self, query: &[f32; EMBED_DIM], k: usize) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = self
            .entries
            .values()
            .map(|entry| (entry.id.clone(), cosine(query, &entry.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }

    /// Convenience: embed a text query and search.
    pub fn search_text(&self, text: &str, k: usize) -> Vec<(String, f32)> {
        self.search(&embed(text), k)
    }

    /// Rebuilds the index from (id, text) pairs (restore path only).
    pub fn replace(&mut self, entries: impl IntoIterator<Item = (String, String)>) {
        self.entries.clear();
        for (id, text) in entries {
            self.upsert(id, text);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SemanticEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        assert_eq!(embed("the flood split the sky"), embed("the flood split the sky"));
    }

    #[test]
    fn identical_text_is_most_similar() {
        let mut index = SemanticIndex::new();
        index.upsert("myth_0000", "the flood split the sky");
        index.upsert("myth_0001", "ore hunger in the deep vale");
        let results = index.search_text("the flood split the sky", 2);
        assert_eq!(results[0].0, "myth_0000");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn search_truncates_to_k() {
        let mut index = SemanticIndex::new();
        for i in 0..10 {
            index.upsert(format!("concept_{:02}", i), format!("token{}", i));
        }
        assert_eq!(index.search_text("token3", 4).len(), 4);
    }

    #[test]
    fn ties_break_by_id() {
        let mut index = SemanticIndex::new();
        index.upsert("b_entry", "same text");
        index.upsert("a_entry", "same text");
        let results = index.search_text("same text", 2);
        assert_eq!(results[0].0, "a_entry");
        assert_eq!(results[1].0, "b_entry");
    }
}
