//! Scope-level coordinate reduction.
//!
//! # Responsibility
//! - Derive method parameters from the set size.
//! - Enforce the determinism policy before calling the provider.
//! - Validate provider output and scale it into `[-1, 1]`.
//!
//! # Invariants
//! - Fewer than two inputs yield all-zero tuples without calling the provider.
//! - Every output value lies in `[-1, 1]`; when any value is non-zero the
//!   largest magnitude is exactly `1.0`.

use crate::config::ProjectionConfig;
use crate::projection::builtin::BuiltinProjector;
use crate::projection::provider::{
    Initialization, Metric, ProjectionError, ProjectionParams, ProjectionProvider,
    ProjectionRequest,
};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Instant;

pub const DEFAULT_SEED: u64 = 42;

const MAX_NEIGHBORS: usize = 15;
const MIN_PERPLEXITY: f64 = 5.0;
const MAX_PERPLEXITY: f64 = 30.0;

pub struct CoordinateReducer {
    provider: Arc<dyn ProjectionProvider>,
    seed: u64,
    min_dist: f64,
    require_deterministic: bool,
}

impl CoordinateReducer {
    pub fn new(provider: Arc<dyn ProjectionProvider>, config: &ProjectionConfig) -> Self {
        Self {
            provider,
            seed: config.seed,
            min_dist: config.min_dist,
            require_deterministic: config.require_deterministic,
        }
    }

    /// Reducer backed by [`BuiltinProjector`].
    pub fn from_config(config: &ProjectionConfig) -> Self {
        Self::new(Arc::new(BuiltinProjector), config)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Distance-emphasis projection for the spatial view.
    pub fn reduce_3d(&self, vectors: &[Vec<f32>]) -> Result<Vec<[f64; 3]>, ProjectionError> {
        let params = ProjectionParams::DistanceEmphasis {
            n_neighbors: MAX_NEIGHBORS.min(vectors.len().saturating_sub(1)),
            min_dist: self.min_dist,
            init: Initialization::Spectral,
        };
        let rows = self.reduce(vectors, 3, params)?;
        Ok(rows.iter().map(|row| [row[0], row[1], row[2]]).collect())
    }

    /// Cluster-emphasis projection for the cluster view.
    pub fn reduce_2d(&self, vectors: &[Vec<f32>]) -> Result<Vec<[f64; 2]>, ProjectionError> {
        let params = ProjectionParams::ClusterEmphasis {
            perplexity: (vectors.len().saturating_sub(1) as f64)
                .clamp(MIN_PERPLEXITY, MAX_PERPLEXITY),
            init: Initialization::Pca,
        };
        let rows = self.reduce(vectors, 2, params)?;
        Ok(rows.iter().map(|row| [row[0], row[1]]).collect())
    }

    fn reduce(
        &self,
        vectors: &[Vec<f32>],
        dimensions: usize,
        params: ProjectionParams,
    ) -> Result<Vec<Vec<f64>>, ProjectionError> {
        let count = vectors.len();
        if count < 2 {
            debug!(
                "event=projection_reduce module=projection status=insufficient_data count={count} dims={dimensions}"
            );
            return Ok(vec![vec![0.0; dimensions]; count]);
        }

        self.check_determinism()?;

        let request = ProjectionRequest {
            dimensions,
            seed: self.seed,
            metric: Metric::Cosine,
            params,
        };
        let started_at = Instant::now();
        let mut rows = self.provider.project(vectors, &request)?;
        validate_output(&rows, count, dimensions)?;
        normalize(&mut rows);

        info!(
            "event=projection_reduce module=projection status=ok provider={} count={count} dims={dimensions} duration_ms={}",
            self.provider.name(),
            started_at.elapsed().as_millis()
        );
        Ok(rows)
    }

    fn check_determinism(&self) -> Result<(), ProjectionError> {
        if self.provider.supports_seed() {
            return Ok(());
        }
        if self.require_deterministic {
            return Err(ProjectionError::Unseeded(self.provider.name().to_string()));
        }
        warn!(
            "event=projection_reduce module=projection status=unseeded provider={}",
            self.provider.name()
        );
        Ok(())
    }
}

fn validate_output(
    rows: &[Vec<f64>],
    expected_rows: usize,
    dimensions: usize,
) -> Result<(), ProjectionError> {
    if rows.len() != expected_rows {
        return Err(ProjectionError::InvalidOutput(format!(
            "expected {expected_rows} rows, got {}",
            rows.len()
        )));
    }
    if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != dimensions) {
        return Err(ProjectionError::InvalidOutput(format!(
            "row {index} has {} values, expected {dimensions}",
            row.len()
        )));
    }
    if rows.iter().flatten().any(|value| !value.is_finite()) {
        return Err(ProjectionError::InvalidOutput("non-finite coordinate".into()));
    }
    Ok(())
}

/// Centers each axis, then divides by the global maximum magnitude.
fn normalize(rows: &mut [Vec<f64>]) {
    let Some(dimensions) = rows.first().map(Vec::len) else {
        return;
    };
    let count = rows.len() as f64;

    for axis in 0..dimensions {
        let mean = rows.iter().map(|row| row[axis]).sum::<f64>() / count;
        rows.iter_mut().for_each(|row| row[axis] -= mean);
    }

    let max_abs = rows
        .iter()
        .flatten()
        .fold(0.0_f64, |max, value| max.max(value.abs()));
    if max_abs > 0.0 {
        rows.iter_mut()
            .flatten()
            .for_each(|value| *value = (*value / max_abs).clamp(-1.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider {
        rows: Vec<Vec<f64>>,
        seeded: bool,
    }

    impl ProjectionProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn supports_seed(&self) -> bool {
            self.seeded
        }

        fn project(
            &self,
            _data: &[Vec<f32>],
            _request: &ProjectionRequest,
        ) -> Result<Vec<Vec<f64>>, ProjectionError> {
            Ok(self.rows.clone())
        }
    }

    fn reducer(rows: Vec<Vec<f64>>, seeded: bool, require_deterministic: bool) -> CoordinateReducer {
        let config = ProjectionConfig {
            require_deterministic,
            ..ProjectionConfig::default()
        };
        CoordinateReducer::new(Arc::new(FixedProvider { rows, seeded }), &config)
    }

    #[test]
    fn normalize_centers_and_scales() {
        let mut rows = vec![vec![1.0, 10.0], vec![3.0, 14.0]];
        normalize(&mut rows);
        assert_eq!(rows, vec![vec![-0.5, -1.0], vec![0.5, 1.0]]);
    }

    #[test]
    fn normalize_leaves_zero_spread_untouched() {
        let mut rows = vec![vec![2.0, 2.0], vec![2.0, 2.0]];
        normalize(&mut rows);
        assert_eq!(rows, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn fewer_than_two_inputs_skip_the_provider() {
        let reducer = reducer(Vec::new(), false, true);
        assert_eq!(reducer.reduce_3d(&[vec![0.5; 4]]).unwrap(), vec![[0.0; 3]]);
        assert!(reducer.reduce_2d(&[]).unwrap().is_empty());
    }

    #[test]
    fn unseeded_provider_is_rejected_when_determinism_required() {
        let reducer = reducer(vec![vec![0.0, 1.0], vec![1.0, 0.0]], false, true);
        let err = reducer.reduce_2d(&[vec![1.0], vec![2.0]]).unwrap_err();
        assert_eq!(err, ProjectionError::Unseeded("fixed".into()));
    }

    #[test]
    fn unseeded_provider_is_allowed_when_opted_out() {
        let reducer = reducer(vec![vec![0.0, 1.0], vec![1.0, 0.0]], false, false);
        let rows = reducer.reduce_2d(&[vec![1.0], vec![2.0]]).unwrap();
        assert_eq!(rows, vec![[-1.0, 1.0], [1.0, -1.0]]);
    }

    #[test]
    fn malformed_provider_output_is_rejected() {
        let short = reducer(vec![vec![0.0, 1.0, 2.0]], true, true);
        assert!(matches!(
            short.reduce_3d(&[vec![1.0], vec![2.0]]),
            Err(ProjectionError::InvalidOutput(_))
        ));

        let narrow = reducer(vec![vec![0.0, 1.0], vec![1.0, 0.0]], true, true);
        assert!(matches!(
            narrow.reduce_3d(&[vec![1.0], vec![2.0]]),
            Err(ProjectionError::InvalidOutput(_))
        ));

        let nan = reducer(vec![vec![f64::NAN, 1.0], vec![1.0, 0.0]], true, true);
        assert!(matches!(
            nan.reduce_2d(&[vec![1.0], vec![2.0]]),
            Err(ProjectionError::InvalidOutput(_))
        ));
    }
}
