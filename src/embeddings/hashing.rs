// Offline feature-hashing embedder
// Each lowercase token is hashed with SHA-256 into a signed bucket; the bag is L2-normalized

use sha2::{Digest, Sha256};

use super::Embedder;
use crate::Result;
use crate::vector::Vector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn bucket_and_sign(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);

        let bucket = (u64::from_le_bytes(raw) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

impl Embedder for HashingEmbedder {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut values = vec![0.0_f32; self.dimension];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let (bucket, sign) = self.bucket_and_sign(&token.to_lowercase());
            values[bucket] += sign;
        }

        Ok(Vector::from(values).normalized().into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_text_same_vector() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Rust systems engineer").expect("should embed");
        let b = embedder.embed("rust SYSTEMS engineer!").expect("should embed");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn output_is_unit_length() {
        let embedder = HashingEmbedder::new(32);
        let vector = Vector::from(embedder.embed("payments platform latency").expect("should embed"));
        assert!(vector.is_unit());
    }

    #[test]
    fn shared_words_score_higher() {
        let embedder = HashingEmbedder::new(384);
        let query = Vector::from(embedder.embed("kubernetes cluster migration").expect("embed"));
        let related =
            Vector::from(embedder.embed("led the kubernetes cluster migration").expect("embed"));
        let unrelated = Vector::from(embedder.embed("watercolor painting class").expect("embed"));
        assert!(query.dot(&related) > query.dot(&unrelated));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(16);
        let vector = embedder.embed("  ...  ").expect("should embed");
        assert!(vector.iter().all(|v| *v == 0.0));
    }
}
