//! TEXT column encoding for vectors and coordinate tuples.
//!
//! Values are stored as a flat JSON array of numbers. Decoding checks the
//! array length against the expected arity so a truncated or foreign blob is
//! rejected instead of flowing into similarity math.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Text is not a JSON array of numbers.
    Malformed(String),
    /// NaN or infinity cannot be represented in the stored format.
    NonFinite,
    DimensionMismatch { expected: usize, actual: usize },
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(details) => write!(f, "malformed numeric array: {details}"),
            Self::NonFinite => write!(f, "numeric array contains a non-finite value"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "expected {expected} values, found {actual}")
            }
        }
    }
}

impl Error for CodecError {}

/// Encodes an embedding vector.
pub fn encode_vector(vector: &[f32]) -> Result<String, CodecError> {
    if vector.iter().any(|value| !value.is_finite()) {
        return Err(CodecError::NonFinite);
    }
    encode(vector)
}

/// Decodes an embedding vector of exactly `expected_dim` values.
pub fn decode_vector(text: &str, expected_dim: usize) -> Result<Vec<f32>, CodecError> {
    let values: Vec<f32> = decode_array(text, expected_dim)?;
    if values.iter().any(|value| !value.is_finite()) {
        return Err(CodecError::NonFinite);
    }
    Ok(values)
}

pub fn encode_coords3(coords: &[f64; 3]) -> Result<String, CodecError> {
    encode_coords(coords)
}

pub fn encode_coords2(coords: &[f64; 2]) -> Result<String, CodecError> {
    encode_coords(coords)
}

pub fn decode_coords3(text: &str) -> Result<[f64; 3], CodecError> {
    let values: Vec<f64> = decode_array(text, 3)?;
    <[f64; 3]>::try_from(values).map_err(|values| CodecError::DimensionMismatch {
        expected: 3,
        actual: values.len(),
    })
}

pub fn decode_coords2(text: &str) -> Result<[f64; 2], CodecError> {
    let values: Vec<f64> = decode_array(text, 2)?;
    <[f64; 2]>::try_from(values).map_err(|values| CodecError::DimensionMismatch {
        expected: 2,
        actual: values.len(),
    })
}

fn encode_coords(coords: &[f64]) -> Result<String, CodecError> {
    if coords.iter().any(|value| !value.is_finite()) {
        return Err(CodecError::NonFinite);
    }
    encode(coords)
}

fn encode<T: Serialize + ?Sized>(values: &T) -> Result<String, CodecError> {
    serde_json::to_string(values).map_err(|err| CodecError::Malformed(err.to_string()))
}

fn decode_array<T: DeserializeOwned>(text: &str, expected: usize) -> Result<Vec<T>, CodecError> {
    let values: Vec<T> =
        serde_json::from_str(text).map_err(|err| CodecError::Malformed(err.to_string()))?;
    if values.len() != expected {
        return Err(CodecError::DimensionMismatch {
            expected,
            actual: values.len(),
        });
    }
    Ok(values)
}
