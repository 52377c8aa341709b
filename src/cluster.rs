//! Document Clustering Benchmark
//!
//! Partitions document vectors into K clusters and scores the partition
//! against ground-truth labels with four external metrics:
//! mutual information, normalized mutual information, adjusted Rand index
//! and purity.
//!
//! Two strategies share one `fit(vectors, k)` contract:
//! - [`KMeans`]: Lloyd's algorithm in Euclidean space
//! - [`SphericalKMeans`]: the same on unit-normalized vectors, assigning by
//!   cosine similarity and re-normalizing centroids
//!
//! Both run a single k-means++ initialization and iterate until the
//! assignment stops changing (or `max_iter` is reached).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{EvalError, Result};
use crate::vectors::ensure_finite;

pub const DEFAULT_MAX_ITER: usize = 300;

/// A clustering algorithm producing one cluster id per vector
pub trait ClusteringStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Partition `vectors` into `k` clusters
    fn fit(&self, vectors: &[Vec<f64>], k: usize) -> Result<Vec<usize>>;
}

/// Euclidean k-means
#[derive(Debug, Clone)]
pub struct KMeans {
    pub max_iter: usize,
    seed: Option<u64>,
}

/// Spherical k-means (cosine geometry)
#[derive(Debug, Clone)]
pub struct SphericalKMeans {
    pub max_iter: usize,
    seed: Option<u64>,
}

macro_rules! lloyd_strategy {
    ($ty:ident, $geometry:expr, $name:literal) => {
        impl $ty {
            pub fn new() -> Self {
                Self {
                    max_iter: DEFAULT_MAX_ITER,
                    seed: None,
                }
            }

            /// Deterministic initialization; repeated fits on the same input agree.
            #[must_use]
            pub fn with_seed(mut self, seed: u64) -> Self {
                self.seed = Some(seed);
                self
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl ClusteringStrategy for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn fit(&self, vectors: &[Vec<f64>], k: usize) -> Result<Vec<usize>> {
                Lloyd {
                    geometry: $geometry,
                    max_iter: self.max_iter,
                    seed: self.seed,
                }
                .run(vectors, k)
            }
        }
    };
}

lloyd_strategy!(KMeans, Geometry::Euclidean, "kmeans");
lloyd_strategy!(SphericalKMeans, Geometry::Spherical, "skmeans");

/// Strategy names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterMethod {
    KMeans,
    SphericalKMeans,
}

impl ClusterMethod {
    pub fn strategy(self, seed: Option<u64>) -> Box<dyn ClusteringStrategy> {
        match (self, seed) {
            (ClusterMethod::KMeans, Some(s)) => Box::new(KMeans::new().with_seed(s)),
            (ClusterMethod::KMeans, None) => Box::new(KMeans::new()),
            (ClusterMethod::SphericalKMeans, Some(s)) => Box::new(SphericalKMeans::new().with_seed(s)),
            (ClusterMethod::SphericalKMeans, None) => Box::new(SphericalKMeans::new()),
        }
    }
}

impl FromStr for ClusterMethod {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kmeans" => Ok(ClusterMethod::KMeans),
            "skmeans" => Ok(ClusterMethod::SphericalKMeans),
            other => Err(EvalError::InvalidParameter(format!(
                "unknown clustering method {:?} (expected kmeans or skmeans)",
                other
            ))),
        }
    }
}

impl fmt::Display for ClusterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterMethod::KMeans => f.write_str("K-Means"),
            ClusterMethod::SphericalKMeans => f.write_str("Spherical K-Means"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Geometry {
    Euclidean,
    Spherical,
}

impl Geometry {
    /// Non-negative dissimilarity used for seeding and assignment
    fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Geometry::Euclidean => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            Geometry::Spherical => {
                let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
                (1.0 - dot).max(0.0)
            }
        }
    }
}

struct Lloyd {
    geometry: Geometry,
    max_iter: usize,
    seed: Option<u64>,
}

impl Lloyd {
    fn run(&self, vectors: &[Vec<f64>], k: usize) -> Result<Vec<usize>> {
        if k == 0 {
            return Err(EvalError::InvalidParameter("cluster count must be greater than 0".to_string()));
        }
        if k > vectors.len() {
            return Err(EvalError::InvalidParameter(format!(
                "cannot form {} clusters from {} documents",
                k,
                vectors.len()
            )));
        }
        let dimension = vectors[0].len();
        if let Some(i) = vectors.iter().position(|v| v.len() != dimension) {
            return Err(EvalError::InvalidInput(format!(
                "vector {} has {} components, expected {}",
                i,
                vectors[i].len(),
                dimension
            )));
        }
        ensure_finite(vectors)?;

        let points: Vec<Vec<f64>> = match self.geometry {
            Geometry::Euclidean => vectors.to_vec(),
            Geometry::Spherical => vectors.iter().map(|v| unit(v)).collect(),
        };

        let mut centroids = self.kmeans_plus_plus(&points, k);
        let mut assignments = self.assign(&points, &centroids);

        // Stop at a Lloyd fixed point: re-assigning to the updated centroids
        // changes nothing.
        let mut converged = false;
        for iteration in 0..self.max_iter {
            centroids = self.update_centroids(&points, &assignments, &centroids);
            let next = self.assign(&points, &centroids);
            if next == assignments {
                debug!(iteration, "k-means converged");
                converged = true;
                break;
            }
            assignments = next;
        }
        if !converged {
            warn!(max_iter = self.max_iter, "k-means stopped before convergence");
        }

        Ok(assignments)
    }

    fn kmeans_plus_plus(&self, points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
        let seed = self.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let mut rng = Pcg64::seed_from_u64(seed);

        let mut centroids = Vec::with_capacity(k);
        centroids.push(points[rng.gen_range(0..points.len())].clone());

        let mut nearest: Vec<f64> = points
            .iter()
            .map(|p| self.geometry.distance(p, &centroids[0]))
            .collect();

        while centroids.len() < k {
            let total: f64 = nearest.iter().sum();
            let chosen = if total > 0.0 {
                let threshold = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                nearest
                    .iter()
                    .position(|&d| {
                        cumulative += d;
                        cumulative >= threshold && d > 0.0
                    })
                    .unwrap_or(points.len() - 1)
            } else {
                // Every point sits on a centroid already.
                rng.gen_range(0..points.len())
            };

            let centroid = points[chosen].clone();
            for (d, p) in nearest.iter_mut().zip(points) {
                *d = d.min(self.geometry.distance(p, &centroid));
            }
            centroids.push(centroid);
        }

        centroids
    }

    fn assign(&self, points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
        points
            .iter()
            .map(|p| {
                let mut best = 0;
                let mut best_dist = f64::INFINITY;
                for (c, centroid) in centroids.iter().enumerate() {
                    let dist = self.geometry.distance(p, centroid);
                    if dist < best_dist {
                        best_dist = dist;
                        best = c;
                    }
                }
                best
            })
            .collect()
    }

    fn update_centroids(
        &self,
        points: &[Vec<f64>],
        assignments: &[usize],
        previous: &[Vec<f64>],
    ) -> Vec<Vec<f64>> {
        let dimension = previous[0].len();
        let mut sums = vec![vec![0.0f64; dimension]; previous.len()];
        let mut counts = vec![0usize; previous.len()];

        for (p, &c) in points.iter().zip(assignments) {
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p) {
                *s += v;
            }
        }

        sums.into_iter()
            .zip(counts)
            .zip(previous)
            .map(|((sum, count), old)| {
                if count == 0 {
                    // Empty cluster keeps its previous centroid.
                    return old.clone();
                }
                let mean: Vec<f64> = sum.iter().map(|s| s / count as f64).collect();
                match self.geometry {
                    Geometry::Euclidean => mean,
                    Geometry::Spherical => unit(&mean),
                }
            })
            .collect()
    }
}

/// L2-normalize; zero vectors are returned unchanged
fn unit(v: &[f64]) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

// ============ External validity metrics ============

/// Agreement between a clustering and the ground truth
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterScores {
    pub mutual_info: f64,
    pub normalized_mutual_info: f64,
    pub adjusted_rand: f64,
    pub purity: f64,
}

impl ClusterScores {
    /// Fixed order: (mutual_info, normalized_mutual_info, adjusted_rand, purity)
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (
            self.mutual_info,
            self.normalized_mutual_info,
            self.adjusted_rand,
            self.purity,
        )
    }

    pub fn values(&self) -> [f64; 4] {
        [
            self.mutual_info,
            self.normalized_mutual_info,
            self.adjusted_rand,
            self.purity,
        ]
    }
}

/// Contingency table: rows are truth classes, columns predicted clusters
pub struct Contingency {
    counts: Vec<Vec<usize>>,
    total: usize,
}

impl Contingency {
    pub fn new(truth: &[usize], predicted: &[usize]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(EvalError::Alignment {
                expected: truth.len(),
                actual: predicted.len(),
            });
        }
        if truth.is_empty() {
            return Err(EvalError::InvalidInput("no documents to score".to_string()));
        }

        let rows = compact(truth);
        let cols = compact(predicted);
        let mut counts = vec![vec![0usize; cols.len()]; rows.len()];
        for (t, p) in truth.iter().zip(predicted) {
            counts[rows[t]][cols[p]] += 1;
        }

        Ok(Self {
            counts,
            total: truth.len(),
        })
    }

    fn row_sums(&self) -> Vec<usize> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    fn col_sums(&self) -> Vec<usize> {
        let mut sums = vec![0usize; self.counts[0].len()];
        for row in &self.counts {
            for (s, &c) in sums.iter_mut().zip(row) {
                *s += c;
            }
        }
        sums
    }

    /// Mutual information in nats
    pub fn mutual_info(&self) -> f64 {
        let n = self.total as f64;
        let rows = self.row_sums();
        let cols = self.col_sums();
        let mut mi = 0.0;

        for (i, row) in self.counts.iter().enumerate() {
            for (j, &nij) in row.iter().enumerate() {
                if nij == 0 {
                    continue;
                }
                let nij = nij as f64;
                mi += nij / n * (n * nij / (rows[i] as f64 * cols[j] as f64)).ln();
            }
        }
        mi.max(0.0)
    }

    /// MI normalized by the arithmetic mean of both entropies
    pub fn normalized_mutual_info(&self) -> f64 {
        let rows = self.row_sums();
        let cols = self.col_sums();
        if rows.len() == 1 && cols.len() == 1 {
            return 1.0;
        }

        let mi = self.mutual_info();
        if mi == 0.0 {
            return 0.0;
        }
        let normalizer = (entropy(&rows, self.total) + entropy(&cols, self.total)) / 2.0;
        mi / normalizer.max(f64::EPSILON)
    }

    /// Rand index adjusted for chance
    pub fn adjusted_rand(&self) -> f64 {
        let pairs = |n: usize| (n * n.saturating_sub(1) / 2) as f64;

        let index: f64 = self.counts.iter().flatten().map(|&c| pairs(c)).sum();
        let sum_rows: f64 = self.row_sums().into_iter().map(pairs).sum();
        let sum_cols: f64 = self.col_sums().into_iter().map(pairs).sum();
        let total_pairs = pairs(self.total);

        let expected = if total_pairs > 0.0 {
            sum_rows * sum_cols / total_pairs
        } else {
            0.0
        };
        let max_index = (sum_rows + sum_cols) / 2.0;

        if max_index == expected {
            // Both partitions trivial in the same way: perfect agreement.
            return 1.0;
        }
        (index - expected) / (max_index - expected)
    }

    /// Share of documents carrying their cluster's dominant truth label
    pub fn purity(&self) -> f64 {
        let dominant: usize = (0..self.counts[0].len())
            .map(|j| self.counts.iter().map(|row| row[j]).max().unwrap_or(0))
            .sum();
        dominant as f64 / self.total as f64
    }
}

fn compact(labels: &[usize]) -> BTreeMap<usize, usize> {
    let mut ids = BTreeMap::new();
    for &l in labels {
        let next = ids.len();
        ids.entry(l).or_insert(next);
    }
    ids
}

fn entropy(counts: &[usize], total: usize) -> f64 {
    let n = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

/// Compute all four scores
pub fn score_clustering(truth: &[usize], predicted: &[usize]) -> Result<ClusterScores> {
    let table = Contingency::new(truth, predicted)?;
    Ok(ClusterScores {
        mutual_info: table.mutual_info(),
        normalized_mutual_info: table.normalized_mutual_info(),
        adjusted_rand: table.adjusted_rand(),
        purity: table.purity(),
    })
}

/// Purity alone
pub fn purity(truth: &[usize], predicted: &[usize]) -> Result<f64> {
    Ok(Contingency::new(truth, predicted)?.purity())
}
