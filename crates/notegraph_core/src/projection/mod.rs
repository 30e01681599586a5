//! Low-dimensional projections of embedding sets for visualization.

pub mod builtin;
pub mod provider;
pub mod reducer;

pub use builtin::BuiltinProjector;
pub use provider::{
    Initialization, Metric, ProjectionError, ProjectionParams, ProjectionProvider,
    ProjectionRequest,
};
pub use reducer::{CoordinateReducer, DEFAULT_SEED};
