//! Seeded K-Means clustering (Lloyd's algorithm)

use crate::error::{SegmentError, SegmentResult};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default iteration cap
pub const DEFAULT_MAX_ITERS: usize = 300;
/// Default centroid-movement tolerance, in standardized units
pub const DEFAULT_TOLERANCE: f64 = 1e-4;
/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// Strategy for choosing the initial centroids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitMethod {
    /// D²-weighted sampling
    #[default]
    #[serde(rename = "kmeans++")]
    KMeansPlusPlus,
    /// K distinct points drawn uniformly
    #[serde(rename = "random")]
    Random,
}

impl fmt::Display for InitMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitMethod::KMeansPlusPlus => f.write_str("kmeans++"),
            InitMethod::Random => f.write_str("random"),
        }
    }
}

impl FromStr for InitMethod {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kmeans++" | "k-means++" | "kmeanspp" => Ok(InitMethod::KMeansPlusPlus),
            "random" => Ok(InitMethod::Random),
            other => Err(SegmentError::invalid_parameter(format!(
                "unknown init method '{other}', expected 'kmeans++' or 'random'"
            ))),
        }
    }
}

/// K-Means hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub n_clusters: usize,
    pub seed: u64,
    pub max_iters: usize,
    pub tolerance: f64,
    pub init: InitMethod,
}

impl KMeansParams {
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            seed,
            max_iters: DEFAULT_MAX_ITERS,
            tolerance: DEFAULT_TOLERANCE,
            init: InitMethod::default(),
        }
    }

    pub fn max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn init(mut self, init: InitMethod) -> Self {
        self.init = init;
        self
    }

    /// Check the parameters against a data set of `n_samples` points
    pub fn validate(&self, n_samples: usize) -> SegmentResult<()> {
        if n_samples < 2 {
            return Err(SegmentError::invalid_parameter(format!(
                "at least 2 customers are needed to form clusters, got {n_samples}"
            )));
        }
        if self.n_clusters < 2 || self.n_clusters > n_samples {
            return Err(SegmentError::invalid_parameter(format!(
                "number of clusters must be between 2 and {n_samples}, got {}",
                self.n_clusters
            )));
        }
        if self.max_iters == 0 {
            return Err(SegmentError::invalid_parameter("max_iters must be > 0"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SegmentError::invalid_parameter(
                "tolerance must be a finite non-negative number",
            ));
        }
        Ok(())
    }
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self::new(4, DEFAULT_SEED)
    }
}

/// Fitted K-Means result
#[derive(Debug, Clone, Serialize)]
pub struct KMeansModel {
    /// Number of clusters
    pub n_clusters: usize,
    /// Cluster assignment per input row
    pub labels: Vec<usize>,
    /// Cluster centroids in standardized space (n_clusters, n_features)
    pub centroids: Array2<f64>,
    /// Within-cluster sum of squares of the final assignment
    pub inertia: f64,
    /// Lloyd iterations performed
    pub n_iter: usize,
    /// False when the iteration cap was hit first
    pub converged: bool,
    /// Inertia after each assignment step
    pub inertia_history: Vec<f64>,
}

impl KMeansModel {
    /// Nearest centroid for a point in standardized space
    pub fn predict(&self, features: &ArrayView1<f64>) -> SegmentResult<usize> {
        if features.len() != self.centroids.ncols() {
            return Err(SegmentError::invalid_parameter(format!(
                "feature vector must have exactly {} dimensions",
                self.centroids.ncols()
            )));
        }
        Ok(nearest_centroid(features, &self.centroids.view()).0)
    }

    /// Member count per cluster label
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Cluster the rows of `data` into `k` groups, returning one label per row
pub fn cluster(data: &ArrayView2<f64>, k: usize, seed: u64) -> SegmentResult<Vec<usize>> {
    fit_kmeans(data, &KMeansParams::new(k, seed)).map(|model| model.labels)
}

/// Fit K-Means on a standardized feature matrix
///
/// Identical `(data, params)` always produce identical models: the only
/// randomness comes from a ChaCha8 stream seeded with `params.seed`.
pub fn fit_kmeans(data: &ArrayView2<f64>, params: &KMeansParams) -> SegmentResult<KMeansModel> {
    let n_samples = data.nrows();
    params.validate(n_samples)?;
    if data.iter().any(|v| !v.is_finite()) {
        return Err(SegmentError::invalid_parameter(
            "feature matrix contains non-finite values",
        ));
    }

    let k = params.n_clusters;
    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut centroids = match params.init {
        InitMethod::KMeansPlusPlus => kmeans_plus_plus_init(data, k, &mut rng),
        InitMethod::Random => random_init(data, k, &mut rng),
    };

    let mut labels: Vec<usize> = Vec::new();
    let mut inertia_history = Vec::new();
    let mut converged = false;
    let mut n_iter = 0;

    while n_iter < params.max_iters {
        n_iter += 1;

        let (new_labels, inertia) = assign(data, &centroids.view());
        inertia_history.push(inertia);
        if new_labels == labels {
            converged = true;
            tracing::debug!(iteration = n_iter, inertia, "assignments stable");
            break;
        }
        labels = new_labels;

        let mut updated = compute_centroids(data, &labels, k);
        let reseeded = reseed_empty_clusters(data, &mut labels, &mut updated, k);
        if reseeded > 0 {
            tracing::debug!(iteration = n_iter, reseeded, "reseeded empty clusters");
        }

        let shift = max_centroid_shift(&centroids.view(), &updated.view());
        centroids = updated;
        tracing::trace!(iteration = n_iter, inertia, shift, "lloyd step");
        if shift < params.tolerance {
            converged = true;
            tracing::debug!(iteration = n_iter, shift, "centroid movement below tolerance");
            break;
        }
    }

    if !converged {
        tracing::warn!(
            max_iters = params.max_iters,
            "k-means reached the iteration cap before converging"
        );
    }

    let inertia = compute_inertia(data, &labels, &centroids.view());

    Ok(KMeansModel {
        n_clusters: k,
        labels,
        centroids,
        inertia,
        n_iter,
        converged,
        inertia_history,
    })
}

/// k-means++ seeding: the first centroid is drawn uniformly, each further one
/// with probability proportional to its squared distance from the nearest
/// centroid chosen so far.
fn kmeans_plus_plus_init(data: &ArrayView2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n = data.nrows();
    let mut chosen = Vec::with_capacity(k);
    chosen.push(rng.gen_range(0..n));

    let mut min_distances = vec![f64::INFINITY; n];
    while chosen.len() < k {
        let last = data.row(chosen[chosen.len() - 1]);
        for (i, point) in data.outer_iter().enumerate() {
            let dist = squared_distance(&point, &last);
            if dist < min_distances[i] {
                min_distances[i] = dist;
            }
        }

        let total: f64 = min_distances.iter().sum();
        let next = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut cumulative = 0.0;
            let mut pick = None;
            for (i, &w) in min_distances.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                cumulative += w;
                if cumulative > target {
                    pick = Some(i);
                    break;
                }
            }
            // rounding can leave the target just past the final bucket
            pick.or_else(|| min_distances.iter().rposition(|&w| w > 0.0))
        } else {
            None
        };

        // every point already sits on a centroid: take the lowest unused index
        let next = next.unwrap_or_else(|| (0..n).find(|i| !chosen.contains(i)).unwrap_or(0));
        chosen.push(next);
    }

    data.select(Axis(0), &chosen)
}

fn random_init(data: &ArrayView2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let chosen = index::sample(rng, data.nrows(), k).into_vec();
    data.select(Axis(0), &chosen)
}

/// Assign each point to its nearest centroid, returning labels and inertia
fn assign(data: &ArrayView2<f64>, centroids: &ArrayView2<f64>) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = data
        .outer_iter()
        .map(|point| {
            let (label, dist) = nearest_centroid(&point, centroids);
            inertia += dist;
            label
        })
        .collect();
    (labels, inertia)
}

/// Nearest centroid by squared Euclidean distance; ties go to the lowest index
fn nearest_centroid(point: &ArrayView1<f64>, centroids: &ArrayView2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (idx, centroid) in centroids.outer_iter().enumerate() {
        let dist = squared_distance(point, &centroid);
        if dist < best.1 {
            best = (idx, dist);
        }
    }
    best
}

/// Centroids as the mean of their members; empty clusters are left at zero
fn compute_centroids(data: &ArrayView2<f64>, labels: &[usize], k: usize) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros((k, data.ncols()));
    let mut counts = vec![0usize; k];

    for (point, &label) in data.outer_iter().zip(labels) {
        let mut row = sums.row_mut(label);
        row += &point;
        counts[label] += 1;
    }

    for (mut row, &count) in sums.outer_iter_mut().zip(&counts) {
        if count > 0 {
            row /= count as f64;
        }
    }
    sums
}

/// Give every empty cluster a member
///
/// The point farthest from its own centroid, taken from a cluster that keeps
/// at least one member, moves into the empty cluster; centroids are then
/// recomputed from the new labels. Returns the number of clusters reseeded.
fn reseed_empty_clusters(
    data: &ArrayView2<f64>,
    labels: &mut [usize],
    centroids: &mut Array2<f64>,
    k: usize,
) -> usize {
    let mut counts = vec![0usize; k];
    for &label in labels.iter() {
        counts[label] += 1;
    }
    let empty: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return 0;
    }

    let mut distances: Vec<f64> = data
        .outer_iter()
        .zip(labels.iter())
        .map(|(point, &label)| squared_distance(&point, &centroids.row(label)))
        .collect();

    for &target in &empty {
        let donor = distances
            .iter()
            .enumerate()
            .filter(|&(i, _)| counts[labels[i]] > 1)
            .fold(None, |best: Option<(usize, f64)>, (i, &d)| match best {
                Some((_, best_d)) if best_d >= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i);

        let Some(point_idx) = donor else {
            // unreachable while k <= n_samples
            break;
        };
        counts[labels[point_idx]] -= 1;
        counts[target] += 1;
        labels[point_idx] = target;
        distances[point_idx] = 0.0;
    }

    *centroids = compute_centroids(data, labels, k);
    empty.len()
}

fn max_centroid_shift(old: &ArrayView2<f64>, new: &ArrayView2<f64>) -> f64 {
    old.outer_iter()
        .zip(new.outer_iter())
        .map(|(a, b)| squared_distance(&a, &b).sqrt())
        .fold(0.0, f64::max)
}

/// Within-cluster sum of squares
pub fn compute_inertia(data: &ArrayView2<f64>, labels: &[usize], centroids: &ArrayView2<f64>) -> f64 {
    data.outer_iter()
        .zip(labels)
        .map(|(point, &label)| squared_distance(&point, &centroids.row(label)))
        .sum()
}

fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
