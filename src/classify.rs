//! Document Classification Benchmark
//!
//! k-nearest-neighbour classification (Euclidean distance) of document
//! vectors, scored with macro- and micro-averaged F1.
//!
//! The train/test split is a single positional cut, so the run is fully
//! deterministic.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EvalError, Result};
use crate::vectors::ensure_finite;

pub const DEFAULT_K: usize = 3;

/// Brute-force k-NN classifier
pub struct KnnClassifier {
    k: usize,
    workers: usize,
    train: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl KnnClassifier {
    pub fn new(k: usize, workers: usize) -> Result<Self> {
        if k == 0 {
            return Err(EvalError::InvalidParameter("k must be greater than 0".to_string()));
        }
        Ok(Self {
            k,
            workers: workers.max(1),
            train: Vec::new(),
            labels: Vec::new(),
        })
    }

    /// Memorise the training split
    pub fn fit(&mut self, train: &[Vec<f64>], labels: &[usize]) -> Result<()> {
        if train.len() != labels.len() {
            return Err(EvalError::Alignment {
                expected: train.len(),
                actual: labels.len(),
            });
        }
        if train.len() < self.k {
            return Err(EvalError::InvalidParameter(format!(
                "k = {} exceeds the {} training documents",
                self.k,
                train.len()
            )));
        }
        ensure_finite(train)?;

        self.train = train.to_vec();
        self.labels = labels.to_vec();
        Ok(())
    }

    /// Predict a label for every test vector
    pub fn predict(&self, test: &[Vec<f64>]) -> Result<Vec<usize>> {
        if self.train.is_empty() {
            return Err(EvalError::InvalidInput("classifier has not been fitted".to_string()));
        }
        ensure_finite(test)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| EvalError::InvalidParameter(format!("worker pool: {}", e)))?;

        Ok(pool.install(|| test.par_iter().map(|q| self.predict_one(q)).collect()))
    }

    fn predict_one(&self, query: &[f64]) -> usize {
        let mut neighbours: Vec<(f64, usize)> = self
            .train
            .iter()
            .enumerate()
            .map(|(i, t)| (squared_euclidean(query, t), i))
            .collect();
        neighbours.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes: HashMap<usize, usize> = HashMap::new();
        for &(_, i) in neighbours.iter().take(self.k) {
            *votes.entry(self.labels[i]).or_insert(0) += 1;
        }

        // Most votes wins; ties go to the smallest label.
        votes
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(label, _)| label)
            .unwrap_or(0)
    }
}

fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Macro- and micro-averaged F1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct F1Scores {
    pub macro_f1: f64,
    pub micro_f1: f64,
}

/// Score predictions against ground truth
///
/// Classes are the union of labels in truth and prediction. A class with
/// zero precision and recall contributes an F1 of 0 to the macro average.
pub fn f1_scores(y_true: &[usize], y_pred: &[usize]) -> Result<F1Scores> {
    if y_true.len() != y_pred.len() {
        return Err(EvalError::Alignment {
            expected: y_true.len(),
            actual: y_pred.len(),
        });
    }
    if y_true.is_empty() {
        return Err(EvalError::InvalidInput("no predictions to score".to_string()));
    }

    let classes: BTreeSet<usize> = y_true.iter().chain(y_pred).copied().collect();
    let mut per_class = Vec::with_capacity(classes.len());
    let (mut tp_all, mut fp_all, mut fn_all) = (0usize, 0usize, 0usize);

    for &c in &classes {
        let mut tp = 0;
        let mut fp = 0;
        let mut fn_ = 0;
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == c, p == c) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        per_class.push(f1_from_counts(tp, fp, fn_));
        tp_all += tp;
        fp_all += fp;
        fn_all += fn_;
    }

    Ok(F1Scores {
        macro_f1: per_class.iter().sum::<f64>() / per_class.len() as f64,
        micro_f1: f1_from_counts(tp_all, fp_all, fn_all),
    })
}

fn f1_from_counts(tp: usize, fp: usize, fn_: usize) -> f64 {
    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        0.0
    } else {
        2.0 * tp as f64 / denom as f64
    }
}

/// Resolve a split point the way sequence slicing does: negative counts
/// from the end, anything out of range is clamped.
pub fn split_point(len: usize, train_num: i64) -> usize {
    if train_num < 0 {
        len.saturating_sub(train_num.unsigned_abs() as usize)
    } else {
        (train_num as usize).min(len)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub k: usize,
    pub train_size: usize,
    pub test_size: usize,
    pub f1: F1Scores,
}

/// Split, fit, predict and score
pub fn evaluate(
    docs: &[Vec<f64>],
    labels: &[usize],
    train_num: i64,
    k: usize,
    workers: usize,
) -> Result<ClassificationReport> {
    if docs.len() != labels.len() {
        return Err(EvalError::Alignment {
            expected: labels.len(),
            actual: docs.len(),
        });
    }

    let cut = split_point(docs.len(), train_num);
    let (train, test) = docs.split_at(cut);
    let (train_label, test_label) = labels.split_at(cut);
    debug!(train = train.len(), test = test.len(), "split documents");

    info!(k, "classifying with KNN");
    let mut knn = KnnClassifier::new(k, workers)?;
    knn.fit(train, train_label)?;
    let predicted = knn.predict(test)?;
    let f1 = f1_scores(test_label, &predicted)?;

    Ok(ClassificationReport {
        k,
        train_size: train.len(),
        test_size: test.len(),
        f1,
    })
}
