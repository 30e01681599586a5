use notegraph_core::config::ProjectionConfig;
use notegraph_core::projection::{
    Initialization, Metric, ProjectionParams, ProjectionRequest, DEFAULT_SEED,
};
use notegraph_core::{CoordinateReducer, ProjectionError, ProjectionProvider};
use std::sync::{Arc, Mutex};

fn corpus() -> Vec<Vec<f32>> {
    vec![
        vec![1.0, 0.0, 0.0, 0.2],
        vec![0.9, 0.1, 0.0, 0.2],
        vec![0.0, 1.0, 0.1, 0.0],
        vec![0.1, 0.9, 0.0, 0.1],
        vec![0.0, 0.0, 1.0, 0.3],
        vec![0.2, 0.1, 0.9, 0.0],
        vec![0.5, 0.5, 0.5, 0.5],
    ]
}

fn assert_unit_range_reached(values: impl Iterator<Item = f64>) {
    let values: Vec<f64> = values.collect();
    assert!(values
        .iter()
        .all(|value| value.is_finite() && (-1.0..=1.0).contains(value)));
    let max_abs = values.iter().fold(0.0_f64, |max, value| max.max(value.abs()));
    assert_eq!(max_abs, 1.0);
}

#[test]
fn default_seed_is_42() {
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    assert_eq!(reducer.seed(), DEFAULT_SEED);
    assert_eq!(DEFAULT_SEED, 42);
    assert_eq!(reducer.provider_name(), "builtin");
}

#[test]
fn single_input_yields_zero_tuples() {
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let single = vec![vec![0.3_f32; 8]];

    assert_eq!(reducer.reduce_3d(&single).unwrap(), vec![[0.0, 0.0, 0.0]]);
    assert_eq!(reducer.reduce_2d(&single).unwrap(), vec![[0.0, 0.0]]);
    assert!(reducer.reduce_3d(&[]).unwrap().is_empty());
}

#[test]
fn spatial_projection_is_centered_and_scaled() {
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let points = reducer.reduce_3d(&corpus()).unwrap();

    assert_eq!(points.len(), 7);
    assert_unit_range_reached(points.iter().flatten().copied());
    for axis in 0..3 {
        let mean = points.iter().map(|point| point[axis]).sum::<f64>() / points.len() as f64;
        assert!(mean.abs() < 1e-9, "axis {axis} mean {mean}");
    }
}

#[test]
fn cluster_projection_is_scaled() {
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let points = reducer.reduce_2d(&corpus()).unwrap();

    assert_eq!(points.len(), 7);
    assert_unit_range_reached(points.iter().flatten().copied());
}

#[test]
fn two_inputs_are_projected() {
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let pair = vec![vec![1.0_f32, 0.0], vec![0.0, 1.0]];

    assert_unit_range_reached(reducer.reduce_3d(&pair).unwrap().iter().flatten().copied());
    assert_unit_range_reached(reducer.reduce_2d(&pair).unwrap().iter().flatten().copied());
}

#[test]
fn same_seed_gives_identical_coordinates() {
    let config = ProjectionConfig::default();
    let first = CoordinateReducer::from_config(&config);
    let second = CoordinateReducer::from_config(&config);

    assert_eq!(
        first.reduce_3d(&corpus()).unwrap(),
        second.reduce_3d(&corpus()).unwrap()
    );
    assert_eq!(
        first.reduce_2d(&corpus()).unwrap(),
        second.reduce_2d(&corpus()).unwrap()
    );
}

#[test]
fn identical_inputs_collapse_to_origin() {
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let same = vec![vec![0.5_f32, 0.5, 0.0]; 4];

    for point in reducer.reduce_3d(&same).unwrap() {
        assert!(point.iter().all(|value| value.abs() < 1e-9));
    }
}

struct UnseededProvider;

impl ProjectionProvider for UnseededProvider {
    fn name(&self) -> &str {
        "unseeded"
    }

    fn supports_seed(&self) -> bool {
        false
    }

    fn project(
        &self,
        data: &[Vec<f32>],
        request: &ProjectionRequest,
    ) -> Result<Vec<Vec<f64>>, ProjectionError> {
        Ok((0..data.len())
            .map(|row| vec![row as f64; request.dimensions])
            .collect())
    }
}

#[test]
fn unseeded_provider_requires_explicit_opt_out() {
    let strict = CoordinateReducer::new(Arc::new(UnseededProvider), &ProjectionConfig::default());
    assert!(matches!(
        strict.reduce_3d(&corpus()),
        Err(ProjectionError::Unseeded(name)) if name == "unseeded"
    ));

    let relaxed_config = ProjectionConfig {
        require_deterministic: false,
        ..ProjectionConfig::default()
    };
    let relaxed = CoordinateReducer::new(Arc::new(UnseededProvider), &relaxed_config);
    let points = relaxed.reduce_2d(&corpus()).unwrap();
    assert_eq!(points.first(), Some(&[-1.0, -1.0]));
    assert_eq!(points.last(), Some(&[1.0, 1.0]));
}

#[derive(Default)]
struct RecordingProvider {
    requests: Mutex<Vec<(usize, ProjectionRequest)>>,
}

impl RecordingProvider {
    fn take(&self) -> Vec<(usize, ProjectionRequest)> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

impl ProjectionProvider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn supports_seed(&self) -> bool {
        true
    }

    fn project(
        &self,
        data: &[Vec<f32>],
        request: &ProjectionRequest,
    ) -> Result<Vec<Vec<f64>>, ProjectionError> {
        self.requests.lock().unwrap().push((data.len(), *request));
        Ok((0..data.len())
            .map(|row| vec![row as f64; request.dimensions])
            .collect())
    }
}

#[test]
fn requests_carry_size_derived_parameters() {
    let provider = Arc::new(RecordingProvider::default());
    let config = ProjectionConfig {
        seed: 7,
        ..ProjectionConfig::default()
    };
    let reducer = CoordinateReducer::new(provider.clone(), &config);

    for (count, n_neighbors, perplexity) in [(2, 1, 5.0), (6, 5, 5.0), (40, 15, 30.0)] {
        let vectors: Vec<Vec<f32>> = (0..count)
            .map(|index| vec![1.0, index as f32, 0.5])
            .collect();
        reducer.reduce_3d(&vectors).unwrap();
        reducer.reduce_2d(&vectors).unwrap();

        let requests = provider.take();
        assert_eq!(
            requests,
            vec![
                (
                    count,
                    ProjectionRequest {
                        dimensions: 3,
                        seed: 7,
                        metric: Metric::Cosine,
                        params: ProjectionParams::DistanceEmphasis {
                            n_neighbors,
                            min_dist: 0.1,
                            init: Initialization::Spectral,
                        },
                    },
                ),
                (
                    count,
                    ProjectionRequest {
                        dimensions: 2,
                        seed: 7,
                        metric: Metric::Cosine,
                        params: ProjectionParams::ClusterEmphasis {
                            perplexity,
                            init: Initialization::Pca,
                        },
                    },
                ),
            ],
            "count {count}"
        );
    }
}

#[test]
fn configured_min_dist_reaches_the_provider() {
    let provider = Arc::new(RecordingProvider::default());
    let config = ProjectionConfig {
        min_dist: 0.35,
        ..ProjectionConfig::default()
    };
    let reducer = CoordinateReducer::new(provider.clone(), &config);
    reducer.reduce_3d(&corpus()).unwrap();

    let requests = provider.take();
    assert_eq!(requests.len(), 1);
    assert!(matches!(
        requests[0].1.params,
        ProjectionParams::DistanceEmphasis { min_dist, .. } if min_dist == 0.35
    ));
    assert_eq!(requests[0].1.seed, DEFAULT_SEED);
}
