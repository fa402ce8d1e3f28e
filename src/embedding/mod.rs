//! Text-to-vector embedding used by the note store.
//!
//! Provides the [`EmbeddingProvider`] trait with two implementations: a
//! local ONNX sentence-transformers model ([`local`]) and a dependency-free
//! hashed bag-of-words embedder ([`hashed`]) for offline runs. Both produce
//! L2-normalized vectors of [`EMBEDDING_DIM`] dimensions.

pub mod hashed;
pub mod local;

use anyhow::Result;

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous. Callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// `provider/model` identity stored alongside the vectors this produces.
    fn model_id(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }
}

/// Create an embedding provider from config.
///
/// `"local"` needs the model files on disk; run `studymate model download` first.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)?;
            Ok(Box::new(provider))
        }
        "hashed" => Ok(Box::new(hashed::HashedEmbeddingProvider)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: local, hashed"),
    }
}

/// The identity a provider built from `config` reports, without loading it.
pub fn configured_model_id(config: &crate::config::EmbeddingConfig) -> String {
    match config.provider.as_str() {
        "hashed" => hashed::MODEL_ID.to_string(),
        provider => format!("{provider}/{}", config.model),
    }
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub(crate) fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = crate::config::EmbeddingConfig {
            provider: "remote".into(),
            ..Default::default()
        };
        let err = create_provider(&config).err().unwrap();
        assert!(err.to_string().contains("unknown embedding provider: remote"));
    }

    #[test]
    fn hashed_provider_needs_no_files() {
        let config = crate::config::EmbeddingConfig {
            provider: "hashed".into(),
            cache_dir: "/nonexistent".into(),
            ..Default::default()
        };
        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.embed("limits").unwrap().len(), EMBEDDING_DIM);
        assert_eq!(provider.model_id(), configured_model_id(&config));
    }

    #[test]
    fn configured_id_names_provider_and_model() {
        let config = crate::config::EmbeddingConfig {
            model: "paraphrase-MiniLM-L6-v2".into(),
            ..Default::default()
        };
        assert_eq!(configured_model_id(&config), "local/paraphrase-MiniLM-L6-v2");

        let hashed = crate::config::EmbeddingConfig {
            provider: "hashed".into(),
            model: "ignored".into(),
            ..Default::default()
        };
        assert_eq!(configured_model_id(&hashed), hashed::MODEL_ID);
    }
}
