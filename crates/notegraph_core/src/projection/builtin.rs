//! In-process seeded projector.
//!
//! Distance emphasis is UMAP: a fuzzy `n_neighbors` graph over cosine
//! distances, laid out by stochastic gradient descent with negative sampling
//! and an attraction curve fitted to `min_dist`. Cluster emphasis is exact
//! t-SNE with perplexity calibration. Both start from the requested
//! initialization, computed by power iteration. Every random draw comes from
//! one `StdRng` seeded from the request, so output is a pure function of
//! input and seed.
//!
//! # Scalability
//! - Cosine distances are held as a dense `n x n` matrix.
//! - t-SNE adds dense `n x n` affinity and kernel buffers and runs 1000
//!   full O(n²) gradient iterations on the calling thread.
//! - UMAP keeps its neighbor graph sparse, but neighbor search sorts every
//!   distance row and the optimizer runs 500 epochs (200 above 10 000
//!   points) on the calling thread.
//!
//! Sized for per-owner note sets of a few thousand notes. Larger sets belong
//! behind another [`ProjectionProvider`].

use crate::graph::cosine_similarity;
use crate::projection::provider::{
    Initialization, Metric, ProjectionError, ProjectionParams, ProjectionProvider,
    ProjectionRequest,
};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

const POWER_ITERATIONS: usize = 1000;
const POWER_TOLERANCE: f64 = 1e-10;

const TSNE_ITERATIONS: usize = 1000;
const EXAGGERATION_ITERATIONS: usize = 250;
const EARLY_EXAGGERATION: f64 = 12.0;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;
const TSNE_INIT_SCALE: f64 = 1e-4;

const CALIBRATION_STEPS: usize = 100;
const ENTROPY_TOLERANCE: f64 = 1e-5;

const UMAP_EPOCHS: usize = 500;
const UMAP_LARGE_EPOCHS: usize = 200;
const UMAP_LARGE_INPUT: usize = 10_000;
const UMAP_SPREAD: f64 = 1.0;
const UMAP_INIT_EXTENT: f64 = 10.0;
const UMAP_INIT_NOISE: f64 = 1e-4;
const NEGATIVE_SAMPLE_RATE: f64 = 5.0;
const GRADIENT_CLIP: f64 = 4.0;
const REPULSION_EPSILON: f64 = 1e-3;
const SIGMA_TOLERANCE: f64 = 1e-5;
const MIN_SIGMA_SCALE: f64 = 1e-3;

const CURVE_SAMPLES: usize = 300;
const CURVE_A_RANGE: (f64, f64) = (0.1, 10.0);
const CURVE_B_RANGE: (f64, f64) = (0.3, 2.0);
const CURVE_GRID_STEPS: usize = 100;
const CURVE_REFINE_STEPS: i32 = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinProjector;

impl ProjectionProvider for BuiltinProjector {
    fn name(&self) -> &str {
        "builtin"
    }

    fn supports_seed(&self) -> bool {
        true
    }

    fn project(
        &self,
        data: &[Vec<f32>],
        request: &ProjectionRequest,
    ) -> Result<Vec<Vec<f64>>, ProjectionError> {
        let k = request.dimensions;
        if k == 0 {
            return Err(ProjectionError::Provider(
                "output dimensionality must be positive".into(),
            ));
        }
        if data.len() < 2 {
            return Ok(vec![vec![0.0; k]; data.len()]);
        }

        let distances = match request.metric {
            Metric::Cosine => cosine_distances(data)?,
        };
        let mut rng = StdRng::seed_from_u64(request.seed);

        let embedding = match request.params {
            ProjectionParams::DistanceEmphasis {
                n_neighbors,
                min_dist,
                init,
            } => {
                if !min_dist.is_finite() || min_dist < 0.0 {
                    return Err(ProjectionError::Provider(format!(
                        "min_dist must be a non-negative number, got {min_dist}"
                    )));
                }
                let layout = UmapLayout {
                    n_neighbors,
                    min_dist,
                    init,
                };
                layout.fit(data, &distances, k, &mut rng)
            }
            ProjectionParams::ClusterEmphasis { perplexity, init } => {
                tsne(data, &distances, k, perplexity, init, &mut rng)
            }
        };

        Ok(embedding.outer_iter().map(|row| row.to_vec()).collect())
    }
}

/// Pairwise `1 - cos` distances. Zero-norm rows are treated as orthogonal to
/// everything else.
fn cosine_distances(data: &[Vec<f32>]) -> Result<Array2<f64>, ProjectionError> {
    let n = data.len();
    let width = data[0].len();
    if let Some(row) = data.iter().find(|row| row.len() != width) {
        return Err(ProjectionError::Provider(format!(
            "ragged input: expected {width} columns, found {}",
            row.len()
        )));
    }

    let mut distances = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let distance = 1.0 - cosine_similarity(&data[i], &data[j]).unwrap_or(0.0);
            distances[[i, j]] = distance;
            distances[[j, i]] = distance;
        }
    }
    Ok(distances)
}

fn initial_layout(
    data: &[Vec<f32>],
    distances: &Array2<f64>,
    k: usize,
    init: Initialization,
    rng: &mut StdRng,
) -> Array2<f64> {
    match init {
        Initialization::Spectral => classical_scaling(distances, k, rng),
        Initialization::Pca => principal_components(data, k, rng),
    }
}

struct UmapLayout {
    n_neighbors: usize,
    min_dist: f64,
    init: Initialization,
}

impl UmapLayout {
    fn fit(
        &self,
        data: &[Vec<f32>],
        distances: &Array2<f64>,
        k: usize,
        rng: &mut StdRng,
    ) -> Array2<f64> {
        let n = distances.nrows();
        if distances.iter().all(|d| *d <= f64::EPSILON) {
            return Array2::zeros((n, k));
        }

        let edges = fuzzy_graph(distances, self.n_neighbors.clamp(1, n - 1));
        let (a, b) = fit_curve(self.min_dist, UMAP_SPREAD);

        let start = initial_layout(data, distances, k, self.init, rng);
        let max_abs = start.iter().fold(0.0_f64, |max, value| max.max(value.abs()));
        let mut embedding = if max_abs <= f64::EPSILON {
            Array2::from_shape_fn((n, k), |_| rng.gen_range(-UMAP_INIT_EXTENT..UMAP_INIT_EXTENT))
        } else {
            let factor = UMAP_INIT_EXTENT / max_abs;
            start.mapv(|x| x * factor + rng.gen_range(-UMAP_INIT_NOISE..UMAP_INIT_NOISE))
        };

        let epochs = if n > UMAP_LARGE_INPUT {
            UMAP_LARGE_EPOCHS
        } else {
            UMAP_EPOCHS
        };
        optimize_layout(&mut embedding, &edges, a, b, epochs, rng);
        embedding
    }
}

/// Symmetric fuzzy neighbor graph as directed `(i, j, weight)` edges, each
/// undirected edge listed once per direction in a stable order.
fn fuzzy_graph(distances: &Array2<f64>, k: usize) -> Vec<(usize, usize, f64)> {
    let n = distances.nrows();
    let target = (k as f64).log2();

    let mut directed: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for i in 0..n {
        let mut neighbors: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        neighbors.sort_by(|&x, &y| {
            distances[[i, x]]
                .total_cmp(&distances[[i, y]])
                .then(x.cmp(&y))
        });
        neighbors.truncate(k);

        let rho = neighbors
            .iter()
            .map(|&j| distances[[i, j]])
            .find(|d| *d > 0.0)
            .unwrap_or(0.0);
        let sigma = calibrate_sigma(distances, i, &neighbors, rho, target);
        for &j in &neighbors {
            let weight = (-(distances[[i, j]] - rho).max(0.0) / sigma).exp();
            directed.insert((i, j), weight);
        }
    }

    // Fuzzy union: w(i,j) + w(j,i) - w(i,j) * w(j,i).
    let mut undirected: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (&(i, j), &forward) in &directed {
        let key = (i.min(j), i.max(j));
        if undirected.contains_key(&key) {
            continue;
        }
        let backward = directed.get(&(j, i)).copied().unwrap_or(0.0);
        undirected.insert(key, forward + backward - forward * backward);
    }

    undirected
        .into_iter()
        .flat_map(|((i, j), weight)| [(i, j, weight), (j, i, weight)])
        .collect()
}

/// Bandwidth whose kernel mass over the neighbors equals `log2(k)`.
fn calibrate_sigma(
    distances: &Array2<f64>,
    i: usize,
    neighbors: &[usize],
    rho: f64,
    target: f64,
) -> f64 {
    let (mut sigma, mut low, mut high) = (1.0_f64, 0.0_f64, f64::INFINITY);
    for _ in 0..CALIBRATION_STEPS {
        let mass: f64 = neighbors
            .iter()
            .map(|&j| (-(distances[[i, j]] - rho).max(0.0) / sigma).exp())
            .sum();
        if (mass - target).abs() < SIGMA_TOLERANCE {
            break;
        }
        if mass > target {
            high = sigma;
            sigma = (low + high) / 2.0;
        } else {
            low = sigma;
            sigma = if high.is_infinite() {
                sigma * 2.0
            } else {
                (low + high) / 2.0
            };
        }
    }

    let mean = neighbors.iter().map(|&j| distances[[i, j]]).sum::<f64>() / neighbors.len() as f64;
    sigma.max(MIN_SIGMA_SCALE * mean).max(f64::MIN_POSITIVE)
}

/// Least-squares fit of `1 / (1 + a * x^(2b))` to the offset exponential
/// that is flat up to `min_dist` and decays with `spread` after it.
fn fit_curve(min_dist: f64, spread: f64) -> (f64, f64) {
    let xs: Vec<f64> = (1..=CURVE_SAMPLES)
        .map(|step| step as f64 * 3.0 * spread / CURVE_SAMPLES as f64)
        .collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect();
    let error = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| (1.0 / (1.0 + a * x.powf(2.0 * b)) - y).powi(2))
            .sum()
    };

    let (a_low, a_high) = (CURVE_A_RANGE.0.ln(), CURVE_A_RANGE.1.ln());
    let b_step = (CURVE_B_RANGE.1 - CURVE_B_RANGE.0) / CURVE_GRID_STEPS as f64;
    let mut best = (1.0, 1.0, f64::INFINITY);
    for a_index in 0..=CURVE_GRID_STEPS {
        let a = (a_low + (a_high - a_low) * a_index as f64 / CURVE_GRID_STEPS as f64).exp();
        for b_index in 0..=CURVE_GRID_STEPS {
            let b = CURVE_B_RANGE.0 + b_step * b_index as f64;
            let value = error(a, b);
            if value < best.2 {
                best = (a, b, value);
            }
        }
    }

    // Refine within one coarse cell at a tenth of the resolution.
    let a_step = best.0 * ((a_high - a_low) / CURVE_GRID_STEPS as f64);
    let (a_center, b_center) = (best.0, best.1);
    for a_offset in -CURVE_REFINE_STEPS..=CURVE_REFINE_STEPS {
        for b_offset in -CURVE_REFINE_STEPS..=CURVE_REFINE_STEPS {
            let a = a_center + a_step * f64::from(a_offset) / 10.0;
            let b = b_center + b_step * f64::from(b_offset) / 10.0;
            if a <= 0.0 || b <= 0.0 {
                continue;
            }
            let value = error(a, b);
            if value < best.2 {
                best = (a, b, value);
            }
        }
    }
    (best.0, best.1)
}

fn optimize_layout(
    embedding: &mut Array2<f64>,
    edges: &[(usize, usize, f64)],
    a: f64,
    b: f64,
    epochs: usize,
    rng: &mut StdRng,
) {
    let n = embedding.nrows();
    let max_weight = edges.iter().fold(0.0_f64, |max, edge| max.max(edge.2));
    if max_weight <= 0.0 {
        return;
    }

    // Each edge is sampled every `max_weight / weight` epochs; edges too weak
    // to be sampled once are dropped.
    let schedule: Vec<(usize, usize, f64)> = edges
        .iter()
        .filter(|edge| edge.2 >= max_weight / epochs as f64)
        .map(|&(i, j, weight)| (i, j, max_weight / weight))
        .collect();
    let mut next_sample: Vec<f64> = schedule.iter().map(|edge| edge.2).collect();
    let mut next_negative: Vec<f64> = schedule
        .iter()
        .map(|edge| edge.2 / NEGATIVE_SAMPLE_RATE)
        .collect();

    for epoch in 0..epochs {
        let now = epoch as f64;
        let alpha = 1.0 - now / epochs as f64;
        for (index, &(i, j, period)) in schedule.iter().enumerate() {
            if next_sample[index] > now {
                continue;
            }
            attract(embedding, i, j, a, b, alpha);
            next_sample[index] += period;

            let negative_period = period / NEGATIVE_SAMPLE_RATE;
            let negatives = ((now - next_negative[index]) / negative_period).max(0.0) as usize;
            for _ in 0..negatives {
                let other = rng.gen_range(0..n);
                if other != i {
                    repel(embedding, i, other, a, b, alpha);
                }
            }
            next_negative[index] += negatives as f64 * negative_period;
        }
    }
}

fn squared_distance(embedding: &Array2<f64>, i: usize, j: usize) -> f64 {
    embedding
        .row(i)
        .iter()
        .zip(embedding.row(j).iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum()
}

fn attract(embedding: &mut Array2<f64>, i: usize, j: usize, a: f64, b: f64, alpha: f64) {
    let squared = squared_distance(embedding, i, j);
    if squared <= 0.0 {
        return;
    }
    let coefficient = -2.0 * a * b * squared.powf(b - 1.0) / (1.0 + a * squared.powf(b));
    for axis in 0..embedding.ncols() {
        let delta = embedding[[i, axis]] - embedding[[j, axis]];
        let step = (coefficient * delta).clamp(-GRADIENT_CLIP, GRADIENT_CLIP) * alpha;
        embedding[[i, axis]] += step;
        embedding[[j, axis]] -= step;
    }
}

fn repel(embedding: &mut Array2<f64>, i: usize, other: usize, a: f64, b: f64, alpha: f64) {
    let squared = squared_distance(embedding, i, other);
    let coefficient = if squared > 0.0 {
        2.0 * b / ((REPULSION_EPSILON + squared) * (1.0 + a * squared.powf(b)))
    } else {
        0.0
    };
    for axis in 0..embedding.ncols() {
        let step = if coefficient > 0.0 {
            let delta = embedding[[i, axis]] - embedding[[other, axis]];
            (coefficient * delta).clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
        } else {
            GRADIENT_CLIP
        };
        embedding[[i, axis]] += step * alpha;
    }
}

/// Spectral layout: principal coordinates of the double-centered squared
/// distance matrix.
fn classical_scaling(distances: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = distances.nrows();
    let squared = distances.mapv(|d| d * d);
    let means = squared.sum_axis(Axis(1)) / n as f64;
    let grand_mean = means.sum() / n as f64;

    let gram = Array2::from_shape_fn((n, n), |(i, j)| {
        -0.5 * (squared[[i, j]] - means[i] - means[j] + grand_mean)
    });
    scores_from_gram(&gram, k, rng)
}

/// Principal coordinates: top-`k` eigenvectors scaled by `sqrt(max(λ, 0))`.
fn scores_from_gram(gram: &Array2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = gram.nrows();
    let mut scores = Array2::<f64>::zeros((n, k));
    for (axis, (value, vector)) in top_eigenpairs(gram, k, rng).into_iter().enumerate() {
        let scale = value.max(0.0).sqrt();
        scores.column_mut(axis).assign(&(vector * scale));
    }
    scores
}

/// Largest algebraic eigenpairs of a symmetric matrix by shifted power
/// iteration with deflation. Eigenvectors are sign-normalized so their
/// largest-magnitude component is positive.
fn top_eigenpairs(matrix: &Array2<f64>, k: usize, rng: &mut StdRng) -> Vec<(f64, Array1<f64>)> {
    let n = matrix.nrows();
    let mut residual = matrix.clone();
    let mut pairs = Vec::with_capacity(k);

    for _ in 0..k {
        // Gershgorin bound keeps the shifted spectrum non-negative.
        let shift = residual
            .outer_iter()
            .map(|row| row.iter().map(|value| value.abs()).sum::<f64>())
            .fold(0.0_f64, f64::max);
        let mut shifted = residual.clone();
        for i in 0..n {
            shifted[[i, i]] += shift;
        }

        let start: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let Some(mut vector) = unit(Array1::from_vec(start)) else {
            pairs.push((0.0, Array1::zeros(n)));
            continue;
        };

        for _ in 0..POWER_ITERATIONS {
            let Some(next) = unit(shifted.dot(&vector)) else {
                break;
            };
            let delta: f64 = (&next - &vector).iter().map(|value| value.abs()).sum();
            vector = next;
            if delta < POWER_TOLERANCE {
                break;
            }
        }

        let value = vector.dot(&residual.dot(&vector));
        let pivot = vector
            .iter()
            .copied()
            .fold(0.0_f64, |best, x| if x.abs() > best.abs() { x } else { best });
        if pivot < 0.0 {
            vector.mapv_inplace(|x| -x);
        }

        let column = vector.view().insert_axis(Axis(1));
        let row = vector.view().insert_axis(Axis(0));
        residual = residual - column.dot(&row) * value;
        pairs.push((value, vector));
    }

    pairs
}

fn unit(vector: Array1<f64>) -> Option<Array1<f64>> {
    let norm = vector.dot(&vector).sqrt();
    if norm <= f64::EPSILON || !norm.is_finite() {
        return None;
    }
    Some(vector / norm)
}

fn tsne(
    data: &[Vec<f32>],
    distances: &Array2<f64>,
    k: usize,
    perplexity: f64,
    init: Initialization,
    rng: &mut StdRng,
) -> Array2<f64> {
    let n = distances.nrows();
    let affinities = joint_probabilities(distances, perplexity);
    let mut embedding = tsne_start(initial_layout(data, distances, k, init, rng), rng);

    let learning_rate = (n as f64 / EARLY_EXAGGERATION / 4.0).max(50.0);
    let mut update = Array2::<f64>::zeros((n, k));
    let mut gains = Array2::<f64>::ones((n, k));

    for iteration in 0..TSNE_ITERATIONS {
        let (exaggeration, momentum) = if iteration < EXAGGERATION_ITERATIONS {
            (EARLY_EXAGGERATION, INITIAL_MOMENTUM)
        } else {
            (1.0, FINAL_MOMENTUM)
        };
        let gradient = kl_gradient(&affinities, &embedding, exaggeration);

        for ((step, gain), grad) in update.iter_mut().zip(gains.iter_mut()).zip(gradient.iter()) {
            if (*grad > 0.0) != (*step > 0.0) {
                *gain += 0.2;
            } else {
                *gain = (*gain * 0.8).max(MIN_GAIN);
            }
            *step = momentum * *step - learning_rate * *gain * grad;
        }
        embedding += &update;
    }

    embedding
}

/// Rescales the first axis to a standard deviation of `1e-4`; a flat layout
/// is replaced by small uniform noise.
fn tsne_start(mut layout: Array2<f64>, rng: &mut StdRng) -> Array2<f64> {
    let (n, k) = layout.dim();
    let first = layout.column(0);
    let center = first.sum() / n as f64;
    let spread = (first.iter().map(|x| (x - center).powi(2)).sum::<f64>() / n as f64).sqrt();
    if spread <= f64::EPSILON {
        return Array2::from_shape_fn((n, k), |_| {
            rng.gen_range(-TSNE_INIT_SCALE..TSNE_INIT_SCALE)
        });
    }
    let factor = TSNE_INIT_SCALE / spread;
    layout.mapv_inplace(|x| x * factor);
    layout
}

/// Symmetrized input affinities `P`, each conditional row calibrated to the
/// target perplexity by bisection on the Gaussian precision.
fn joint_probabilities(distances: &Array2<f64>, perplexity: f64) -> Array2<f64> {
    let n = distances.nrows();
    let target_entropy = perplexity.min((n - 1) as f64).max(1.0).ln();

    let mut conditional = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for (j, value) in calibrate_row(distances, i, target_entropy)
            .into_iter()
            .enumerate()
        {
            conditional[[i, j]] = value;
        }
    }

    let denominator = 2.0 * n as f64;
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            0.0
        } else {
            ((conditional[[i, j]] + conditional[[j, i]]) / denominator).max(MIN_PROBABILITY)
        }
    })
}

fn calibrate_row(distances: &Array2<f64>, i: usize, target_entropy: f64) -> Vec<f64> {
    let n = distances.nrows();
    let nearest = (0..n)
        .filter(|&j| j != i)
        .map(|j| distances[[i, j]])
        .fold(f64::INFINITY, f64::min);

    let mut probabilities = vec![0.0; n];
    let (mut beta, mut low, mut high) = (1.0_f64, 0.0_f64, f64::INFINITY);

    for _ in 0..CALIBRATION_STEPS {
        let mut total = 0.0;
        let mut weighted = 0.0;
        for j in 0..n {
            if j == i {
                probabilities[j] = 0.0;
                continue;
            }
            let shifted = distances[[i, j]] - nearest;
            let value = (-beta * shifted).exp();
            probabilities[j] = value;
            total += value;
            weighted += value * shifted;
        }
        let entropy = total.ln() + beta * weighted / total;
        let gap = entropy - target_entropy;
        if gap.abs() < ENTROPY_TOLERANCE {
            break;
        }
        if gap > 0.0 {
            low = beta;
            beta = if high.is_infinite() {
                beta * 2.0
            } else {
                (beta + high) / 2.0
            };
        } else {
            high = beta;
            beta = (beta + low) / 2.0;
        }
    }

    let total: f64 = probabilities.iter().sum();
    if total > 0.0 {
        probabilities.iter_mut().for_each(|p| *p /= total);
    }
    probabilities
}

fn kl_gradient(affinities: &Array2<f64>, embedding: &Array2<f64>, exaggeration: f64) -> Array2<f64> {
    let (n, k) = embedding.dim();
    let mut kernel = Array2::<f64>::zeros((n, n));
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let squared: f64 = (0..k)
                .map(|axis| (embedding[[i, axis]] - embedding[[j, axis]]).powi(2))
                .sum();
            let value = 1.0 / (1.0 + squared);
            kernel[[i, j]] = value;
            kernel[[j, i]] = value;
            total += 2.0 * value;
        }
    }
    let total = total.max(f64::MIN_POSITIVE);

    let mut gradient = Array2::<f64>::zeros((n, k));
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let q = (kernel[[i, j]] / total).max(MIN_PROBABILITY);
            let coefficient = 4.0 * (exaggeration * affinities[[i, j]] - q) * kernel[[i, j]];
            for axis in 0..k {
                gradient[[i, axis]] +=
                    coefficient * (embedding[[i, axis]] - embedding[[j, axis]]);
            }
        }
    }
    gradient
}

/// Principal component scores of the centered input vectors.
fn principal_components(data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.len();
    let width = data[0].len();
    let mut centered = Array2::from_shape_fn((n, width), |(i, j)| f64::from(data[i][j]));
    let mean = centered.sum_axis(Axis(0)) / n as f64;
    centered -= &mean;

    let gram = centered.dot(&centered.t());
    scores_from_gram(&gram, k, rng)
}
