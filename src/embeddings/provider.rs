// provider.rs — Process-wide access to the embedding model.
//
// The model is loaded lazily, at most once, behind a mutex. Blank text never
// reaches the model: it maps to the zero vector so that empty fields carry no
// similarity signal. A failed load is not remembered; the next call retries.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::bail;

use super::engine::EmbeddingEngine;
use super::{download, text_prep, Embedder};
use crate::config;

pub type Loader = Box<dyn Fn() -> anyhow::Result<Arc<dyn Embedder>> + Send + Sync>;

pub struct EmbeddingProvider {
    dims: usize,
    loader: Loader,
    handle: Mutex<Option<Arc<dyn Embedder>>>,
}

impl EmbeddingProvider {
    pub fn new(dims: usize, loader: Loader) -> Self {
        Self {
            dims,
            loader,
            handle: Mutex::new(None),
        }
    }

    /// Provider backed by the local all-MiniLM-L6-v2 engine, downloaded on first use.
    pub fn local() -> Self {
        Self::new(
            config::embedding::EMBEDDING_DIMS,
            Box::new(|| -> anyhow::Result<Arc<dyn Embedder>> {
                let model_dir = download::ensure_model_files()?;
                let engine = EmbeddingEngine::load(&model_dir)?;
                Ok(Arc::new(engine))
            }),
        )
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Load the model now instead of on the first non-blank `embed`.
    pub fn warm_up(&self) -> anyhow::Result<()> {
        self.model().map(|_| ())
    }

    /// Embed `text` into a vector of exactly `dims()` values.
    ///
    /// Empty or whitespace-only input returns zeros without touching the model.
    pub fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let prepared = text_prep::prepare_field_text(text);
        if prepared.is_empty() {
            return Ok(vec![0.0; self.dims]);
        }

        let model = self.model()?;
        let vector = model.embed(&prepared)?;
        if vector.len() != self.dims {
            bail!(
                "embedding has {} dims, expected {}",
                vector.len(),
                self.dims
            );
        }
        Ok(vector)
    }

    fn model(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        // The lock is held across the load so concurrent cold starts load once.
        let mut guard = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }

        log::info!("Loading embedding model ({})", config::embedding::EMBEDDING_MODEL_NAME);
        let model = match (self.loader)() {
            Ok(m) => m,
            Err(e) => {
                log::error!("Embedding model load failed: {:?}", e);
                return Err(e);
            }
        };
        if model.dims() != self.dims {
            bail!("embedder reports {} dims, provider expects {}", model.dims(), self.dims);
        }
        *guard = Some(Arc::clone(&model));
        log::info!("Embedding model ready");
        Ok(model)
    }
}
