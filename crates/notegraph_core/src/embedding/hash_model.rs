//! Deterministic token-hash embedding model.
//!
//! Each lowercase word is hashed onto a handful of signed buckets, so texts
//! sharing vocabulary land close together under cosine similarity. Vectors
//! are L2-normalized. The model needs no download and is stable across runs,
//! which makes it the backend for tests and offline development.

use crate::embedding::model::{EmbeddingError, EmbeddingModel};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const BUCKETS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    dimensions: usize,
}

impl HashEmbeddingModel {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let mut tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .peekable();

        if tokens.peek().is_none() {
            // No words: spread the raw text hash so the vector is still non-zero.
            scatter(&mut vector, hash_of(text), self.dimensions);
        } else {
            for token in tokens {
                scatter(&mut vector, hash_of(&token), BUCKETS_PER_TOKEN);
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl EmbeddingModel for HashEmbeddingModel {
    fn name(&self) -> &str {
        "token-hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

fn scatter(vector: &mut [f32], seed: u64, rounds: usize) {
    let mut hash = seed;
    for _ in 0..rounds {
        let bucket = (hash % vector.len() as u64) as usize;
        let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * (1.0 + ((hash >> 32) & 0xff) as f32 / 255.0);
        hash = hash_of(&hash);
    }
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn same_text_same_vector() {
        let model = HashEmbeddingModel::new(384);
        let batch = model
            .embed(&["Buy milk".to_string(), "buy MILK".to_string()])
            .unwrap();
        assert_eq!(batch[0], batch[1]);
        assert_eq!(batch[0].len(), 384);
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let model = HashEmbeddingModel::new(384);
        let batch = model
            .embed(&[
                "rust borrow checker lifetimes".to_string(),
                "rust lifetimes and the borrow checker".to_string(),
                "grocery list: apples, bread".to_string(),
            ])
            .unwrap();
        assert!(cosine(&batch[0], &batch[1]) > cosine(&batch[0], &batch[2]));
    }

    #[test]
    fn punctuation_only_text_is_not_zero() {
        let model = HashEmbeddingModel::new(64);
        let vector = model.embed(&["?!".to_string()]).unwrap().remove(0);
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
