//! Hashed text embeddings
//!
//! A deterministic, dependency-free embedder for the in-memory index and for
//! tests. Words and their character trigrams are hashed into a fixed number
//! of buckets and the vector is L2-normalized, so cosine similarity reduces
//! to a dot product. Not a semantic model; production deployments plug a
//! real `VectorSearch` instead.

/// Trigram features count for less than whole words
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    /// Normalized embedding; all zeros for text without word characters
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dim];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            embedding[self.bucket(word)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let trigram: String = window.iter().collect();
                    embedding[self.bucket(&trigram)] += TRIGRAM_WEIGHT;
                }
            }
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dim as u64) as usize
    }
}

/// Dot product of two normalized vectors, clamped to [0, 1]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| x * y)
        .sum::<f32>()
        .clamp(0.0, 1.0)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_normalized() {
        let embedder = HashEmbedder::new(128);
        let embedding = embedder.embed("Orion routes requests");
        assert_eq!(embedding.len(), 128);

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed("spline"), embedder.embed("spline"));
    }

    #[test]
    fn test_similarity_orders_by_overlap() {
        let embedder = HashEmbedder::new(384);
        let query = embedder.embed("orion architecture");
        let close = embedder.embed("The Orion architecture overview");
        let far = embedder.embed("quarterly marketing budget");

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
        assert!((cosine_similarity(&query, &query) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed("!!!").iter().all(|v| *v == 0.0));
    }
}
