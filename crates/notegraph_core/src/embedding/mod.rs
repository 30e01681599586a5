//! Text embedding generation and vector wire format.
//!
//! # Responsibility
//! - Turn note text into fixed-length vectors through a pluggable model.
//! - Load the model lazily, exactly once per generator, behind a barrier.
//! - Encode vectors and coordinate tuples for TEXT storage columns.
//!
//! Model implementations:
//! - `FastEmbedModel` (feature `fastembed`): local ONNX inference.
//! - `HashEmbeddingModel`: deterministic token-hash vectors for tests and
//!   offline development.

pub mod codec;
#[cfg(feature = "fastembed")]
pub mod fastembed;
pub mod generator;
pub mod hash_model;
pub mod model;

#[cfg(feature = "fastembed")]
pub use self::fastembed::FastEmbedModel;
pub use codec::CodecError;
pub use generator::EmbeddingGenerator;
pub use hash_model::HashEmbeddingModel;
pub use model::{EmbeddingError, EmbeddingModel};
