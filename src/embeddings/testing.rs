// testing.rs — Deterministic stand-in for the BERT engine.
//
// Bag of lowercase words hashed (FNV-1a) into `dims` buckets, then L2-normalized.
// Texts sharing words land close together, which is all scoring tests need.

use std::sync::Arc;

use super::{Embedder, EmbeddingProvider};

pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Embedder for HashingEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0f32; self.dims];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = fnv1a(&word.to_lowercase()) as usize % self.dims;
            v[bucket] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}

fn fnv1a(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Provider wired to a `HashingEmbedder`, never touching the network.
pub fn hashing_provider(dims: usize) -> EmbeddingProvider {
    EmbeddingProvider::new(
        dims,
        Box::new(move || -> anyhow::Result<Arc<dyn Embedder>> { Ok(Arc::new(HashingEmbedder::new(dims))) }),
    )
}
