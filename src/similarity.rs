//! Word Similarity Benchmark
//!
//! Correlates cosine similarity of word vectors with human similarity
//! judgments (Spearman's rho). Supported test sets:
//! - WordSim-353 (comma-separated, header row)
//! - MEN (space-separated triples)
//! - SimLex-999 (tab-separated, header row, 10 columns)

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TestSetPaths;
use crate::error::{EvalError, Result};
use crate::vectors::VectorSpace;

/// Known word-similarity test sets, each with its own file grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestSetKind {
    #[serde(rename = "wordsim353")]
    WordSim353,
    #[serde(rename = "men")]
    Men,
    #[serde(rename = "simlex")]
    SimLex,
}

impl TestSetKind {
    pub const ALL: [TestSetKind; 3] = [TestSetKind::WordSim353, TestSetKind::Men, TestSetKind::SimLex];

    pub fn name(&self) -> &'static str {
        match self {
            TestSetKind::WordSim353 => "wordsim353",
            TestSetKind::Men => "men",
            TestSetKind::SimLex => "simlex",
        }
    }

    /// Parse one raw line (0-based `idx`).
    ///
    /// `Ok(None)` means the line is skipped by this format's grammar.
    fn parse_line(&self, idx: usize, line: &str) -> std::result::Result<Option<(String, String, f64)>, String> {
        let (w1, w2, score) = match self {
            TestSetKind::WordSim353 => {
                if idx == 0 || line.trim().is_empty() {
                    return Ok(None);
                }
                let cols: Vec<&str> = line.split(',').collect();
                if cols.len() < 3 {
                    return Err(format!("expected 3 columns, found {}", cols.len()));
                }
                (cols[0], cols[1], cols[2])
            }
            TestSetKind::Men => {
                let cols: Vec<&str> = line.split(' ').collect();
                if cols.len() != 3 {
                    return Ok(None);
                }
                (cols[0], cols[1], cols[2])
            }
            TestSetKind::SimLex => {
                if idx == 0 {
                    return Ok(None);
                }
                let cols: Vec<&str> = line.split('\t').collect();
                if cols.len() != 10 {
                    return Ok(None);
                }
                (cols[0], cols[1], cols[3])
            }
        };

        let score: f64 = score
            .trim()
            .parse()
            .map_err(|_| format!("invalid score {:?}", score))?;
        Ok(Some((w1.to_lowercase(), w2.to_lowercase(), score)))
    }
}

impl fmt::Display for TestSetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TestSetKind {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self> {
        TestSetKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| EvalError::InvalidParameter(format!("unknown test set {:?}", s)))
    }
}

/// A human-judged word pair
#[derive(Debug, Clone, PartialEq)]
pub struct WordPair {
    pub first: String,
    pub second: String,
    pub score: f64,
}

/// Word pairs in first-seen order; a repeated pair keeps its slot and takes the later score
#[derive(Debug, Clone)]
pub struct SimilarityTestSet {
    pub kind: TestSetKind,
    pairs: Vec<WordPair>,
}

impl SimilarityTestSet {
    /// Read the configured file for `kind`
    pub fn load(kind: TestSetKind, paths: &TestSetPaths) -> Result<Self> {
        let path = paths.get(kind).ok_or_else(|| {
            EvalError::InvalidParameter(format!("no file configured for test set {}", kind))
        })?;
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_reader(kind, BufReader::new(file), path)
    }

    pub fn from_reader<R: BufRead>(kind: TestSetKind, reader: R, source: &Path) -> Result<Self> {
        let mut pairs: Vec<WordPair> = Vec::new();
        let mut slots: HashMap<(String, String), usize> = HashMap::new();

        for (idx, raw) in reader.split(b'\n').enumerate() {
            let raw = raw.map_err(|e| EvalError::io(source, e))?;
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(['\r', '\n']);

            let parsed = kind
                .parse_line(idx, line)
                .map_err(|msg| EvalError::format(source, idx + 1, msg))?;
            let Some((first, second, score)) = parsed else {
                continue;
            };

            // Pairs are unordered: (a, b) and (b, a) share a slot.
            let key = if first <= second {
                (first.clone(), second.clone())
            } else {
                (second.clone(), first.clone())
            };
            match slots.get(&key) {
                Some(&slot) => pairs[slot].score = score,
                None => {
                    slots.insert(key, pairs.len());
                    pairs.push(WordPair { first, second, score });
                }
            }
        }

        debug!(test = kind.name(), pairs = pairs.len(), "parsed test set");
        Ok(Self { kind, pairs })
    }

    pub fn from_pairs(kind: TestSetKind, pairs: Vec<WordPair>) -> Self {
        Self { kind, pairs }
    }

    pub fn pairs(&self) -> &[WordPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Outcome of one similarity benchmark
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityReport {
    pub test: TestSetKind,
    /// Pairs with both words in the vector space
    pub retained: usize,
    pub total: usize,
    pub spearman: f64,
}

/// Cosine-vs-human correlation evaluator
pub struct SimilarityEvaluator {
    workers: usize,
}

impl SimilarityEvaluator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Filter to covered pairs, score them in parallel and correlate
    pub fn evaluate(&self, words: &VectorSpace, tests: &SimilarityTestSet) -> Result<SimilarityReport> {
        let retained: Vec<(&[f64], &[f64], f64)> = tests
            .pairs()
            .iter()
            .filter_map(|p| Some((words.get(&p.first)?, words.get(&p.second)?, p.score)))
            .collect();

        info!(
            test = tests.kind.name(),
            retained = retained.len(),
            total = tests.len(),
            "actual test cases"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| EvalError::InvalidParameter(format!("worker pool: {}", e)))?;

        // Indexed collect keeps predictions aligned with truth.
        let predicted: Vec<f64> =
            pool.install(|| retained.par_iter().map(|(a, b, _)| cosine_similarity(a, b)).collect());
        let truth: Vec<f64> = retained.iter().map(|(_, _, s)| *s).collect();

        Ok(SimilarityReport {
            test: tests.kind,
            retained: retained.len(),
            total: tests.len(),
            spearman: spearman(&truth, &predicted),
        })
    }
}

impl Default for SimilarityEvaluator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_WORKERS)
    }
}

/// dot(a, b) / (|a| |b|); NaN when either vector is all zeros
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    dot / (norm_a * norm_b)
}

/// Spearman rank correlation with average ranks for ties.
///
/// NaN for fewer than two points, a constant input, or any NaN value.
pub fn spearman(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 || a.iter().chain(b).any(|v| v.is_nan()) {
        return f64::NAN;
    }
    pearson(&average_ranks(a), &average_ranks(b))
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; a tie group [start, end) shares their mean.
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return f64::NAN;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(kind: TestSetKind, text: &str) -> SimilarityTestSet {
        SimilarityTestSet::from_reader(kind, text.as_bytes(), Path::new("test")).unwrap()
    }

    #[test]
    fn test_cosine_known_values() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        let sim = cosine_similarity(&[1.0, 0.0], &[1.0, 1.0]);
        assert!((sim - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).is_nan());
    }

    #[test]
    fn test_spearman_identity_and_reverse() {
        let x = [0.3, 1.2, 5.0, 2.2, 9.1];
        let rev: Vec<f64> = x.iter().map(|v| -v).collect();
        assert!((spearman(&x, &x) - 1.0).abs() < 1e-12);
        assert!((spearman(&x, &rev) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_ties_use_average_rank() {
        assert_eq!(average_ranks(&[10.0, 20.0, 10.0, 30.0]), vec![1.5, 3.0, 1.5, 4.0]);
        // scipy.stats.spearmanr([1, 2, 2, 3], [1, 3, 2, 4]) == 0.9486832980505138
        let rho = spearman(&[1.0, 2.0, 2.0, 3.0], &[1.0, 3.0, 2.0, 4.0]);
        assert!((rho - 0.9486832980505138).abs() < 1e-12);
    }

    #[test]
    fn test_spearman_degenerate_is_nan() {
        assert!(spearman(&[1.0], &[2.0]).is_nan());
        assert!(spearman(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
    }

    #[test]
    fn test_wordsim_skips_header_and_lowercases() {
        let set = parse(
            TestSetKind::WordSim353,
            "Word 1,Word 2,Human (mean)\nLove,sex,6.77\ntiger,cat,7.35\n",
        );
        assert_eq!(set.len(), 2);
        assert_eq!(set.pairs()[0].first, "love");
        assert_eq!(set.pairs()[1].score, 7.35);
    }

    #[test]
    fn test_men_skips_malformed_lines() {
        let set = parse(TestSetKind::Men, "sun sunlight 50.000000\nonly two\nbeach sand 46.0\n");
        assert_eq!(set.len(), 2);
        assert_eq!(set.pairs()[1].second, "sand");
    }

    #[test]
    fn test_simlex_uses_fourth_column() {
        let header = "word1\tword2\tPOS\tSimLex999\tconc(w1)\tconc(w2)\tconcQ\tAssoc(USF)\tSimAssoc333\tSD(SimLex)\n";
        let row = "old\tnew\tA\t1.58\t2.72\t2.81\t2\t7.25\t1\t0.41\n";
        let short = "bad\trow\tA\t2.0\n";
        let set = parse(TestSetKind::SimLex, &format!("{header}{row}{short}"));
        assert_eq!(set.pairs(), &[WordPair { first: "old".into(), second: "new".into(), score: 1.58 }]);
    }

    #[test]
    fn test_duplicate_pair_keeps_slot_takes_last_score() {
        let set = parse(TestSetKind::Men, "a b 1\nc d 2\nb a 3\n");
        assert_eq!(set.len(), 2);
        assert_eq!(set.pairs()[0].score, 3.0);
    }

    #[test]
    fn test_bad_score_is_format_error() {
        let err = SimilarityTestSet::from_reader(TestSetKind::Men, "a b x\n".as_bytes(), Path::new("t"))
            .unwrap_err();
        assert!(matches!(err, EvalError::Format { line: 1, .. }));
    }

    #[test]
    fn test_test_set_names_round_trip() {
        for kind in TestSetKind::ALL {
            assert_eq!(kind.name().parse::<TestSetKind>().unwrap(), kind);
        }
        assert!("rw".parse::<TestSetKind>().is_err());
    }

    #[test]
    fn test_evaluate_filters_uncovered_pairs() {
        let words = VectorSpace::from_rows(
            2,
            vec![
                ("a".to_string(), vec![1.0, 0.0]),
                ("b".to_string(), vec![0.0, 1.0]),
                ("c".to_string(), vec![1.0, 1.0]),
            ],
        )
        .unwrap();
        let set = parse(TestSetKind::Men, "a b 1\na c 5\nb c 4\nx y 9\n");

        let report = SimilarityEvaluator::new(2).evaluate(&words, &set).unwrap();
        assert_eq!(report.retained, 3);
        assert_eq!(report.total, 4);
        assert!((report.spearman - 3f64.sqrt() / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_from_in_memory_pairs_serializes() {
        let words = VectorSpace::from_rows(
            2,
            vec![("a".to_string(), vec![1.0, 0.0]), ("b".to_string(), vec![0.0, 1.0])],
        )
        .unwrap();
        let pair = |first: &str, second: &str, score| WordPair {
            first: first.to_string(),
            second: second.to_string(),
            score,
        };
        let set = SimilarityTestSet::from_pairs(
            TestSetKind::SimLex,
            vec![pair("a", "b", 2.0), pair("a", "zebra", 9.0)],
        );
        assert_eq!(set.len(), 2);

        let report = SimilarityEvaluator::new(1).evaluate(&words, &set).unwrap();
        assert_eq!((report.retained, report.total), (1, 2));

        // A single pair has no correlation; NaN serializes as null.
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["test"], "simlex");
        assert_eq!(json["retained"], 1);
        assert!(json["spearman"].is_null());
    }

    proptest! {
        #[test]
        fn prop_cosine_is_symmetric(
            a in proptest::collection::vec(-10.0f64..10.0, 8),
            b in proptest::collection::vec(-10.0f64..10.0, 8),
        ) {
            let ab = cosine_similarity(&a, &b);
            let ba = cosine_similarity(&b, &a);
            prop_assert!(ab == ba || (ab.is_nan() && ba.is_nan()));
        }

        #[test]
        fn prop_self_cosine_is_one(a in proptest::collection::vec(0.1f64..10.0, 1..16)) {
            prop_assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-9);
        }
    }
}
