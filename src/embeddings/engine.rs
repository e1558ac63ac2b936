// engine.rs — all-MiniLM-L6-v2 on candle, CPU only.
//
// A field becomes one 384-dim unit vector: BERT token states averaged over the
// attention mask, then L2-normalized, matching sentence-transformers' output
// for this model.

use std::path::Path;

use anyhow::{anyhow, bail, Context};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use super::Embedder;
use crate::config;

pub struct EmbeddingEngine {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl EmbeddingEngine {
    /// Load from a directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`. Refuses models whose width is not `EMBEDDING_DIMS`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let device = Device::Cpu;

        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path)
                .with_context(|| format!("read {}", config_path.display()))?,
        )
        .with_context(|| format!("parse {}", config_path.display()))?;

        let dims = config::embedding::EMBEDDING_DIMS;
        if bert_config.hidden_size != dims {
            bail!(
                "{} produces {}-dim vectors but profiles are stored with {}",
                config_path.display(),
                bert_config.hidden_size,
                dims
            );
        }

        let weights_path = model_dir.join("model.safetensors");
        // SAFETY: the downloader only ever replaces this file by rename, never in place.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DType::F32, &device)
                .with_context(|| format!("map {}", weights_path.display()))?
        };
        let model = BertModel::load(vb, &bert_config).context("build BERT model")?;

        let tokenizer = Tokenizer::from_file(model_dir.join("tokenizer.json"))
            .map_err(|e| anyhow!("load tokenizer: {e}"))?;

        log::info!(
            "{} loaded ({} layers, {} dims)",
            config::embedding::EMBEDDING_MODEL_NAME,
            bert_config.num_hidden_layers,
            dims
        );
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    fn row(&self, values: &[u32]) -> anyhow::Result<Tensor> {
        let values: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
        Ok(Tensor::new(values.as_slice(), &self.device)?.unsqueeze(0)?)
    }
}

impl Embedder for EmbeddingEngine {
    fn dims(&self) -> usize {
        config::embedding::EMBEDDING_DIMS
    }

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("tokenize: {e}"))?;

        // Anything past the model window is dropped, as sentence-transformers does.
        let len = encoding.get_ids().len().min(config::embedding::MAX_TOKENS);
        let ids = self.row(&encoding.get_ids()[..len])?;
        let mask = self.row(&encoding.get_attention_mask()[..len])?;
        let type_ids = ids.zeros_like()?;

        let states = self.model.forward(&ids, &type_ids, Some(&mask))?;
        let pooled = l2_normalize(&mean_pooling(&states, &mask)?)?;
        Ok(pooled.squeeze(0)?.to_vec1()?)
    }
}

/// Average token states `[batch, seq, hidden]` over positions where `mask` is 1.
fn mean_pooling(states: &Tensor, mask: &Tensor) -> anyhow::Result<Tensor> {
    let weights = mask.to_dtype(DType::F32)?.unsqueeze(2)?.broadcast_as(states.shape())?;
    let summed = (states * &weights)?.sum(1)?;
    let counts = weights.sum(1)?.clamp(1e-9, f64::MAX)?;
    Ok((summed / counts)?)
}

/// Scale each row of a `[batch, hidden]` tensor to unit length.
fn l2_normalize(t: &Tensor) -> anyhow::Result<Tensor> {
    let norm = t.sqr()?.sum_keepdim(1)?.sqrt()?.clamp(1e-12, f64::MAX)?;
    Ok(t.broadcast_div(&norm)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pooling_ignores_padding() {
        let states = Tensor::new(&[[[1f32, 2.0], [100.0, 100.0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1i64, 0]], &Device::Cpu).unwrap();
        let pooled: Vec<f32> = mean_pooling(&states, &mask).unwrap().squeeze(0).unwrap().to_vec1().unwrap();
        assert_eq!(pooled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_mean_pooling_averages_real_tokens() {
        let states = Tensor::new(&[[[1f32, 3.0], [3.0, 5.0], [9.0, 9.0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[1i64, 1, 0]], &Device::Cpu).unwrap();
        let pooled: Vec<f32> = mean_pooling(&states, &mask).unwrap().squeeze(0).unwrap().to_vec1().unwrap();
        assert_eq!(pooled, vec![2.0, 4.0]);
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let t = Tensor::new(&[[3f32, 4.0]], &Device::Cpu).unwrap();
        let v: Vec<f32> = l2_normalize(&t).unwrap().squeeze(0).unwrap().to_vec1().unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_load_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EmbeddingEngine::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_wrong_width_model() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = serde_json::json!({
            "vocab_size": 10, "hidden_size": 8, "num_hidden_layers": 1,
            "num_attention_heads": 1, "intermediate_size": 16, "hidden_act": "gelu",
            "hidden_dropout_prob": 0.0, "max_position_embeddings": 16,
            "type_vocab_size": 2, "initializer_range": 0.02, "layer_norm_eps": 1e-12,
            "pad_token_id": 0
        });
        std::fs::write(dir.path().join("config.json"), cfg.to_string()).unwrap();
        let err = EmbeddingEngine::load(dir.path()).err().unwrap();
        assert!(format!("{err:#}").contains("8-dim"));
    }
}
