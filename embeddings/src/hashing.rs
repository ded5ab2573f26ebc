//! Offline feature-hashing provider.
//!
//! Maps each lowercased word onto one of `dimension` buckets. Identical texts
//! always produce identical vectors and texts sharing words overlap, which is
//! enough for local experiments and deterministic tests without a network.

use async_trait::async_trait;

use crate::Embedding;
use crate::error::Result;
use crate::provider::EmbeddingProvider;

/// Deterministic bag-of-words provider.
#[derive(Debug, Clone)]
pub struct HashingProvider {
    dimension: usize,
}

impl HashingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed synchronously.
    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (fnv1a(&word.to_lowercase()) % self.dimension as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingProvider {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        "fnv1a-bag-of-words"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::cosine_similarity;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_identical_text_identical_vector() {
        let provider = HashingProvider::new(64);
        assert_eq!(
            provider.embed_text("Cats are great"),
            provider.embed_text("cats  are GREAT")
        );
    }

    #[test]
    fn test_shared_words_overlap() {
        let provider = HashingProvider::new(256);
        let a = provider.embed_text("renew the k3s certificate");
        let b = provider.embed_text("k3s certificate");
        let c = provider.embed_text("banana bread recipe");
        assert!(cosine_similarity(&a, &b).unwrap() > cosine_similarity(&a, &c).unwrap());
    }
}
