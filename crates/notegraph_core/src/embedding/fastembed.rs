//! Local embedding model backed by fastembed (ONNX Runtime).
//!
//! Default model: `all-minilm-l6-v2` (384 dimensions). Only 384-dimension
//! models are accepted because stored vectors have a fixed length.

use crate::embedding::model::{EmbeddingError, EmbeddingModel};
use crate::model::EMBEDDING_DIM;
use fastembed::{EmbeddingModel as FastModel, TextEmbedding, TextInitOptions};
use log::warn;
use std::path::PathBuf;
use std::sync::Mutex;

/// Maps a configured model name to a fastembed variant.
///
/// Unknown names fall back to `AllMiniLML6V2` with a warning.
fn parse_model_name(name: &str) -> FastModel {
    match name.trim().to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => FastModel::AllMiniLML6V2,
        "all-minilm-l12-v2" | "sentence-transformers/all-minilm-l12-v2" => {
            FastModel::AllMiniLML12V2
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => FastModel::BGESmallENV15,
        "multilingual-e5-small" | "intfloat/multilingual-e5-small" => {
            FastModel::MultilingualE5Small
        }
        other => {
            warn!(
                "event=model_resolve module=embedding status=fallback requested={other} model=all-minilm-l6-v2"
            );
            FastModel::AllMiniLML6V2
        }
    }
}

fn model_dimensions(model: &FastModel) -> usize {
    TextEmbedding::get_model_info(model)
        .map(|info| info.dim)
        .unwrap_or(0)
}

/// fastembed text model; inference needs `&mut`, so calls are serialized.
pub struct FastEmbedModel {
    model: Mutex<TextEmbedding>,
    name: String,
    dimensions: usize,
}

impl FastEmbedModel {
    /// Loads (downloading on first use) the named model.
    ///
    /// # Errors
    /// - `ModelUnavailable` when the ONNX model cannot be initialized.
    /// - `DimensionMismatch` when the model does not produce 384-d vectors.
    pub fn load(model_name: &str, cache_dir: Option<&str>) -> Result<Self, EmbeddingError> {
        let variant = parse_model_name(model_name);
        let dimensions = model_dimensions(&variant);
        if dimensions != EMBEDDING_DIM {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIM,
                actual: dimensions,
            });
        }
        let name = format!("{variant:?}");

        let mut options = TextInitOptions::new(variant).with_show_download_progress(false);
        if let Some(dir) = cache_dir.filter(|dir| !dir.trim().is_empty()) {
            options = options.with_cache_dir(PathBuf::from(dir));
        }

        let embedding = TextEmbedding::try_new(options)
            .map_err(|err| EmbeddingError::ModelUnavailable(format!("{err:#}")))?;

        Ok(Self {
            model: Mutex::new(embedding),
            name,
            dimensions,
        })
    }
}

impl EmbeddingModel for FastEmbedModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut model = self.model.lock().map_err(|_| {
            EmbeddingError::ModelUnavailable("fastembed model lock poisoned".to_string())
        })?;
        model
            .embed(texts.to_vec(), None)
            .map_err(|err| EmbeddingError::ModelUnavailable(format!("{err:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_model_name_known_and_fallback() {
        assert_eq!(parse_model_name("all-MiniLM-L6-v2"), FastModel::AllMiniLML6V2);
        assert_eq!(parse_model_name("bge-small-en-v1.5"), FastModel::BGESmallENV15);
        assert_eq!(parse_model_name("no-such-model"), FastModel::AllMiniLML6V2);
    }

    #[test]
    fn accepted_models_are_384_dimensional() {
        for name in ["all-minilm-l6-v2", "all-minilm-l12-v2", "bge-small-en-v1.5"] {
            assert_eq!(model_dimensions(&parse_model_name(name)), EMBEDDING_DIM);
        }
    }

    #[test]
    #[ignore = "downloads the ONNX model on first run"]
    fn embeds_text_with_expected_dimensions() {
        let model = FastEmbedModel::load("all-minilm-l6-v2", None).unwrap();
        let vectors = model.embed(&["hello world".to_string()]).unwrap();
        assert_eq!(vectors[0].len(), EMBEDDING_DIM);
    }
}
