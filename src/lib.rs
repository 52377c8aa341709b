//! # Embed Eval
//!
//! Benchmark evaluation of pre-trained word and document embeddings.
//!
//! ## Benchmarks
//! - **Word similarity**: Spearman correlation between cosine similarity and
//!   human judgments (WordSim-353, MEN, SimLex-999)
//! - **Document classification**: k-NN on document vectors, macro/micro F1
//! - **Document clustering**: k-means / spherical k-means, scored with MI,
//!   NMI, adjusted Rand index and purity
//!
//! ## Pipeline
//! Vector files and label files are parsed once per run into read-only
//! structures; each benchmark consumes them independently. Document vectors
//! can also be built by averaging word vectors over a tokenised corpus.

pub mod classify;
pub mod cluster;
pub mod config;
pub mod docrep;
pub mod error;
pub mod labels;
pub mod results;
pub mod similarity;
pub mod vectors;

pub use classify::{f1_scores, split_point, ClassificationReport, F1Scores, KnnClassifier};
pub use cluster::{
    purity, score_clustering, ClusterMethod, ClusterScores, ClusteringStrategy, KMeans,
    SphericalKMeans,
};
pub use config::{Settings, TestSetPaths};
pub use docrep::{average_documents, read_corpus, DocumentVectors};
pub use error::{EvalError, Result};
pub use labels::read_labels;
pub use results::append_result;
pub use similarity::{
    cosine_similarity, spearman, SimilarityEvaluator, SimilarityReport, SimilarityTestSet,
    TestSetKind,
};
pub use vectors::{NanPolicy, VectorSpace};

use std::path::Path;

use tracing::info;

/// Run the word-similarity benchmark for each requested test set, in order
pub fn evaluate_similarity(
    words: &VectorSpace,
    test_sets: &TestSetPaths,
    kinds: &[TestSetKind],
    workers: usize,
) -> Result<Vec<SimilarityReport>> {
    let evaluator = SimilarityEvaluator::new(workers);
    kinds
        .iter()
        .map(|&kind| {
            let tests = SimilarityTestSet::load(kind, test_sets)?;
            evaluator.evaluate(words, &tests)
        })
        .collect()
}

/// Load pre-embedded documents; rows must stay aligned with labels, so NaN fails the load
pub fn load_document_vectors<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<f64>>> {
    Ok(VectorSpace::load(path, NanPolicy::Fail)?.into_vectors())
}

/// Build document vectors by averaging word vectors over a corpus file
pub fn load_averaged_documents<P: AsRef<Path>, Q: AsRef<Path>>(
    word_file: P,
    corpus: Q,
) -> Result<DocumentVectors> {
    let words = VectorSpace::load(word_file, NanPolicy::Skip)?;
    let docs = read_corpus(corpus)?;
    let averaged = average_documents(&docs, &words);
    info!(
        documents = averaged.vectors.len(),
        dropped_tokens = averaged.dropped_tokens,
        empty = averaged.empty_documents.len(),
        "averaged document vectors"
    );
    Ok(averaged)
}

/// Cluster documents and score against labels
pub fn evaluate_clustering(
    docs: &[Vec<f64>],
    labels: &[usize],
    k: usize,
    strategy: &dyn ClusteringStrategy,
) -> Result<ClusterScores> {
    if docs.len() != labels.len() {
        return Err(EvalError::Alignment {
            expected: labels.len(),
            actual: docs.len(),
        });
    }
    info!(method = strategy.name(), k, documents = docs.len(), "clustering");
    let assignment = strategy.fit(docs, k)?;
    score_clustering(labels, &assignment)
}
