//! Lazily loaded, process-shared embedding generator.
//!
//! # Invariants
//! - The model loader runs at most once per successful load, even when many
//!   threads issue their first request at the same time.
//! - A failed load leaves the generator unloaded; the next call retries.
//! - Every returned vector has exactly `dimensions()` components.

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::embedding::hash_model::HashEmbeddingModel;
use crate::embedding::model::{EmbeddingError, EmbeddingModel};
use crate::model::EMBEDDING_DIM;
use log::{error, info, warn};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Instant;

type ModelLoader = Box<dyn Fn() -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> + Send + Sync>;

/// Owned embedding service handed to every component that needs vectors.
///
/// Construct one per process (or per test) and share it by reference or
/// `Arc`; the model itself is loaded on first use.
pub struct EmbeddingGenerator {
    dimensions: usize,
    loader: ModelLoader,
    model: OnceCell<Arc<dyn EmbeddingModel>>,
}

impl EmbeddingGenerator {
    /// Creates a generator that loads its model with `loader` on first use.
    pub fn new<F>(dimensions: usize, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EmbeddingModel>, EmbeddingError> + Send + Sync + 'static,
    {
        Self {
            dimensions,
            loader: Box::new(loader),
            model: OnceCell::new(),
        }
    }

    /// Creates a generator around an already constructed model.
    pub fn with_model(model: Arc<dyn EmbeddingModel>) -> Self {
        let dimensions = model.dimensions();
        let reload = Arc::clone(&model);
        Self {
            dimensions,
            loader: Box::new(move || Ok(Arc::clone(&reload))),
            model: OnceCell::with_value(model),
        }
    }

    /// Builds the generator described by configuration.
    ///
    /// The fastembed backend is only compiled with the `fastembed` feature;
    /// without it every call reports `ModelUnavailable`.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        match config.backend {
            EmbeddingBackend::Hash => {
                Self::with_model(Arc::new(HashEmbeddingModel::new(EMBEDDING_DIM)))
            }
            EmbeddingBackend::Fastembed => {
                fastembed_generator(config.model.clone(), config.cache_dir.clone())
            }
        }
    }

    /// Vector length produced by this generator.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns whether the model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }

    /// Embeds one text.
    ///
    /// # Errors
    /// - `ModelUnavailable` when the model cannot be loaded or invoked.
    /// - `DimensionMismatch` when the model output has the wrong length.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.embed_batch(&[text.to_string()])?;
        vectors.pop().ok_or_else(|| {
            EmbeddingError::ModelUnavailable("model returned no vector".to_string())
        })
    }

    /// Embeds `texts` in order, one vector per input.
    ///
    /// An empty batch returns immediately without loading the model.
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.model()?;
        let vectors = model.embed(texts)?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "model returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|vector| vector.len() != self.dimensions) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: bad.len(),
            });
        }

        Ok(vectors)
    }

    /// Best-effort single embedding: failures are logged and swallowed.
    pub fn try_embed_one(&self, text: &str) -> Option<Vec<f32>> {
        match self.embed_one(text) {
            Ok(vector) => Some(vector),
            Err(err) => {
                warn!("event=embed_skip module=embedding status=degraded error={err}");
                None
            }
        }
    }

    fn model(&self) -> Result<&Arc<dyn EmbeddingModel>, EmbeddingError> {
        self.model.get_or_try_init(|| {
            let started_at = Instant::now();
            info!("event=model_load module=embedding status=start");

            let model = (self.loader)().map_err(|err| {
                error!(
                    "event=model_load module=embedding status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                err
            })?;

            if model.dimensions() != self.dimensions {
                error!(
                    "event=model_load module=embedding status=error model={} expected_dim={} actual_dim={}",
                    model.name(),
                    self.dimensions,
                    model.dimensions()
                );
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: model.dimensions(),
                });
            }

            info!(
                "event=model_load module=embedding status=ok model={} dim={} duration_ms={}",
                model.name(),
                model.dimensions(),
                started_at.elapsed().as_millis()
            );
            Ok(model)
        })
    }
}

#[cfg(feature = "fastembed")]
fn fastembed_generator(model_name: String, cache_dir: Option<String>) -> EmbeddingGenerator {
    use crate::embedding::fastembed::FastEmbedModel;

    EmbeddingGenerator::new(EMBEDDING_DIM, move || {
        let model = FastEmbedModel::load(&model_name, cache_dir.as_deref())?;
        Ok(Arc::new(model) as Arc<dyn EmbeddingModel>)
    })
}

#[cfg(not(feature = "fastembed"))]
fn fastembed_generator(model_name: String, _cache_dir: Option<String>) -> EmbeddingGenerator {
    EmbeddingGenerator::new(EMBEDDING_DIM, move || {
        Err(EmbeddingError::ModelUnavailable(format!(
            "model `{model_name}` needs a build with the `fastembed` feature"
        )))
    })
}
