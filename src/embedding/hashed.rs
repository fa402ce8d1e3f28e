//! Hashed bag-of-words embedder.
//!
//! Each lowercase alphanumeric token is hashed (FNV-1a) into one of
//! [`EMBEDDING_DIM`] buckets and the counts are L2-normalized. Similarity is
//! lexical overlap only, but it is deterministic, needs no model files, and
//! keeps the note store usable offline.

use anyhow::Result;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};

/// Identity recorded in the note store for hashed vectors.
pub const MODEL_ID: &str = "hashed/fnv-bow-384";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

#[derive(Debug, Clone, Copy, Default)]
pub struct HashedEmbeddingProvider;

impl EmbeddingProvider for HashedEmbeddingProvider {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut buckets = vec![0.0f32; EMBEDDING_DIM];
        for token in tokens(text) {
            buckets[bucket(&token)] += 1.0;
        }
        Ok(l2_normalize(&buckets))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn bucket(token: &str) -> usize {
    let hash = token
        .bytes()
        .fold(FNV_OFFSET, |h, b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    (hash % EMBEDDING_DIM as u64) as usize
}
