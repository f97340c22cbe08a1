use async_trait::async_trait;

use super::Embedder;
use crate::error::{FeedloopError, Result};
use crate::feedback::lexical::tokenize;

/// Model-free embedder: bag of hashed word tokens, L2-normalised.
///
/// Selected with `EMBEDDING_MODEL=hashing`. Useful offline and in tests; it
/// only captures lexical overlap.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(FeedloopError::Embedding(
                "Hashing embedder needs at least one dimension".to_string(),
            ));
        }
        Ok(Self { dimensions })
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens: Vec<String> = tokenize(text).into_iter().collect();
        tokens.sort();
        for token in &tokens {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(query))
    }

    async fn embed_passages(&self, passages: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(passages.iter().map(|p| self.embed_text(p)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
