//! Local ONNX Runtime embedding provider.
//!
//! Runs a 384-dimension sentence-transformers model (all-MiniLM-L6-v2 by
//! default) via `ort`: tokenize, infer, mean-pool over the attention mask,
//! L2-normalize. Each model's files live in `<cache_dir>/<model id>/`.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Where a supported model's ONNX export and tokenizer are downloaded from.
#[derive(Debug)]
pub struct ModelSource {
    pub id: &'static str,
    pub model_url: &'static str,
    pub tokenizer_url: &'static str,
}

/// Models whose output matches the `FLOAT[384]` vector column.
pub const SUPPORTED_MODELS: &[ModelSource] = &[
    ModelSource {
        id: "all-MiniLM-L6-v2",
        model_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
    },
    ModelSource {
        id: "paraphrase-MiniLM-L6-v2",
        model_url: "https://huggingface.co/sentence-transformers/paraphrase-MiniLM-L6-v2/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/sentence-transformers/paraphrase-MiniLM-L6-v2/resolve/main/tokenizer.json",
    },
];

/// Look up a supported model by id.
pub fn model_source(id: &str) -> Result<&'static ModelSource> {
    SUPPORTED_MODELS.iter().find(|m| m.id == id).with_context(|| {
        let supported: Vec<&str> = SUPPORTED_MODELS.iter().map(|m| m.id).collect();
        format!(
            "unsupported local embedding model: {id}. Supported: {}",
            supported.join(", ")
        )
    })
}

/// Directory holding the configured model's files.
pub fn model_dir(config: &EmbeddingConfig) -> Result<PathBuf> {
    let source = model_source(&config.model)?;
    Ok(crate::config::expand_tilde(&config.cache_dir).join(source.id))
}

pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
}

// Safety: Tokenizer is Send+Sync. Session is only touched behind the Mutex.
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dir = model_dir(config)?;
        let model_path = dir.join(MODEL_FILE);
        let tokenizer_path = dir.join(TOKENIZER_FILE);

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `studymate model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `studymate model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;
        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tracing::info!(tokenizer = %tokenizer_path.display(), "tokenizer loaded");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: super::configured_model_id(config),
        })
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .context("embedding batch returned no vectors")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend(encoding.get_ids().iter().map(|&id| i64::from(id)));
            attention_mask.extend(encoding.get_attention_mask().iter().map(|&m| i64::from(m)));
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))?;
        // Single-segment input: token_type_ids are all zero.
        let token_type_ids_tensor =
            Tensor::from_array((shape, vec![0i64; batch_size * seq_len].into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor,
            "token_type_ids" => token_type_ids_tensor,
        })?;

        // Output name varies by ONNX export.
        let token_embeddings = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (out_shape, data) = token_embeddings
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings tensor")?;

        let dims: &[i64] = &out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected token embeddings shape: {dims:?}, expected [batch, seq, {EMBEDDING_DIM}]"
        );

        let pooled = mean_pool(data, &attention_mask, batch_size, dims[1] as usize, seq_len);
        Ok(pooled.iter().map(|v| l2_normalize(v)).collect())
    }
}

/// Average token vectors per batch row, weighting by the attention mask.
///
/// `data` is `[batch, out_seq_len, EMBEDDING_DIM]` row-major; `mask` is
/// `[batch, mask_seq_len]`.
fn mean_pool(
    data: &[f32],
    mask: &[i64],
    batch_size: usize,
    out_seq_len: usize,
    mask_seq_len: usize,
) -> Vec<Vec<f32>> {
    (0..batch_size)
        .map(|b| {
            let mut sum = vec![0.0f32; EMBEDDING_DIM];
            let mut count = 0.0f32;
            for s in 0..out_seq_len {
                let weight = mask[b * mask_seq_len + s] as f32;
                if weight <= 0.0 {
                    continue;
                }
                let offset = (b * out_seq_len + s) * EMBEDDING_DIM;
                for (acc, value) in sum.iter_mut().zip(&data[offset..offset + EMBEDDING_DIM]) {
                    *acc += value * weight;
                }
                count += weight;
            }
            if count > 0.0 {
                sum.iter_mut().for_each(|x| *x /= count);
            }
            sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pool_skips_padding() {
        // batch 1, seq 2: first token real, second padded
        let mut data = vec![0.0f32; 2 * EMBEDDING_DIM];
        data[0] = 2.0;
        data[EMBEDDING_DIM] = 100.0;
        let pooled = mean_pool(&data, &[1, 0], 1, 2, 2);
        assert_eq!(pooled.len(), 1);
        assert_eq!(pooled[0][0], 2.0);
    }

    #[test]
    fn mean_pool_averages_real_tokens() {
        let mut data = vec![0.0f32; 2 * EMBEDDING_DIM];
        data[0] = 1.0;
        data[EMBEDDING_DIM] = 3.0;
        let pooled = mean_pool(&data, &[1, 1], 1, 2, 2);
        assert!((pooled[0][0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn unsupported_model_is_rejected_before_loading() {
        let config = EmbeddingConfig {
            model: "bge-large-en".into(),
            cache_dir: "/nonexistent".into(),
            ..Default::default()
        };
        let err = LocalEmbeddingProvider::new(&config).err().unwrap();
        assert!(err
            .to_string()
            .contains("unsupported local embedding model: bge-large-en"));
    }

    #[test]
    fn model_files_live_under_the_model_id() {
        let config = EmbeddingConfig {
            model: "paraphrase-MiniLM-L6-v2".into(),
            cache_dir: "/models".into(),
            ..Default::default()
        };
        assert_eq!(
            model_dir(&config).unwrap(),
            PathBuf::from("/models/paraphrase-MiniLM-L6-v2")
        );
        assert!(model_source("paraphrase-MiniLM-L6-v2")
            .unwrap()
            .model_url
            .contains("/paraphrase-MiniLM-L6-v2/"));
    }

    fn test_config() -> EmbeddingConfig {
        EmbeddingConfig::default()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (norm_a * norm_b)
    }

    #[test]
    #[ignore] // Requires model files; run with: cargo test -- --ignored
    fn test_embed_produces_384_dims() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let embedding = provider.embed("What is a derivative?").unwrap();
        assert_eq!(embedding.len(), EMBEDDING_DIM);
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "L2 norm should be ~1.0, got {norm}");
    }

    #[test]
    #[ignore]
    fn test_related_questions_are_closer() {
        let provider = LocalEmbeddingProvider::new(&test_config()).unwrap();
        let q = provider.embed("What is a derivative?").unwrap();
        let related = provider.embed("The derivative is the rate of change of a function").unwrap();
        let unrelated = provider.embed("Mitochondria produce ATP in cells").unwrap();
        assert!(cosine_similarity(&q, &related) > cosine_similarity(&q, &unrelated));
    }
}
