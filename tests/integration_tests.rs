//! Integration tests for Embed Eval

use embed_eval::{
    evaluate_clustering, evaluate_similarity, load_averaged_documents, load_document_vectors,
    read_labels, score_clustering, ClusterMethod, EvalError, NanPolicy, Settings, TestSetKind,
    VectorSpace,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Test context that keeps a dataset directory alive
struct TestContext {
    dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn write(&self, rel: &str, contents: &str) -> std::path::PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn settings(&self) -> Settings {
        Settings {
            data_dir: self.dir.path().to_path_buf(),
            workers: 2,
            seed: Some(42),
            ..Settings::default()
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn words_file() -> &'static str {
    "3 2\na 1.0 0.0\nb 0.0 1.0\nc 1.0 1.0\n"
}

#[test]
fn test_load_scenario_vectors() {
    let ctx = TestContext::new();
    let path = ctx.write("wiki/jose.txt", words_file());

    let space = VectorSpace::load(&path, NanPolicy::Skip).unwrap();
    assert_eq!(space.len(), 3);
    assert!(space.vectors().iter().all(|v| v.len() == space.dimension()));

    let a = space.get("a").unwrap();
    let b = space.get("b").unwrap();
    let c = space.get("c").unwrap();
    assert_eq!(embed_eval::cosine_similarity(a, b), 0.0);
    assert!((embed_eval::cosine_similarity(a, c) - 0.7071).abs() < 1e-4);
}

#[test]
fn test_labels_and_cluster_scores() {
    let ctx = TestContext::new();
    ctx.write("toy/label.txt", "1\n1\n2\n2\n");

    let labels = read_labels(ctx.root().join("toy")).unwrap();
    assert_eq!(labels, vec![0, 0, 1, 1]);

    let scores = score_clustering(&labels, &[0, 0, 1, 1]).unwrap();
    assert_eq!(scores.purity, 1.0);
    assert!((scores.adjusted_rand - 1.0).abs() < 1e-12);
}

#[test]
fn test_similarity_across_test_sets() {
    let ctx = TestContext::new();
    ctx.write("wiki/jose.txt", words_file());
    ctx.write(
        "wordsim353/combined.csv",
        "Word 1,Word 2,Human (mean)\nA,B,1.0\na,c,5.0\nx,y,3.0\nb,c,4.0\n",
    );
    ctx.write(
        "MEN/MEN_dataset_natural_form_full",
        "a b 10\nbroken line\nc a 40\nb c 30\n",
    );
    ctx.write(
        "SimLex-999/SimLex-999.txt",
        "word1\tword2\tPOS\tSimLex999\tc1\tc2\tcq\tassoc\tsa\tsd\n\
         a\tb\tN\t0.5\t1\t1\t1\t1\t0\t0.1\n",
    );

    let settings = ctx.settings();
    let words = VectorSpace::load(ctx.root().join("wiki/jose.txt"), NanPolicy::Skip).unwrap();
    let reports = evaluate_similarity(
        &words,
        &settings.test_set_paths(),
        &TestSetKind::ALL,
        settings.workers,
    )
    .unwrap();

    assert_eq!(reports.len(), 3);

    // The (x, y) row is excluded and not counted as retained.
    assert_eq!(reports[0].test, TestSetKind::WordSim353);
    assert_eq!((reports[0].retained, reports[0].total), (3, 4));
    assert!(reports[0].spearman > 0.0);

    // The two-token MEN line is skipped silently.
    assert_eq!((reports[1].retained, reports[1].total), (3, 3));

    // A single pair cannot be correlated.
    assert_eq!(reports[2].retained, 1);
    assert!(reports[2].spearman.is_nan());
}

#[test]
fn test_missing_test_file_is_io_error() {
    let ctx = TestContext::new();
    ctx.write("wiki/jose.txt", words_file());
    let settings = ctx.settings();
    let words = VectorSpace::load(ctx.root().join("wiki/jose.txt"), NanPolicy::Skip).unwrap();

    let err = evaluate_similarity(&words, &settings.test_set_paths(), &[TestSetKind::Men], 1)
        .unwrap_err();
    assert!(matches!(err, EvalError::Io { .. }));
}

#[test]
fn test_classification_pipeline() {
    let ctx = TestContext::new();
    ctx.write(
        "toy/jose.txt",
        "6 2\nd0 0.0 0.0\nd1 0.1 0.1\nd2 5.0 5.0\nd3 5.1 4.9\nd4 0.05 0.0\nd5 4.95 5.0\n",
    );
    ctx.write("toy/label.txt", "1\n1\n2\n2\n1\n2\n");

    let docs = load_document_vectors(ctx.root().join("toy/jose.txt")).unwrap();
    let labels = read_labels(ctx.root().join("toy")).unwrap();

    let report = embed_eval::classify::evaluate(&docs, &labels, 4, 1, 2).unwrap();
    assert_eq!(report.train_size + report.test_size, labels.len());
    assert_eq!(report.f1.micro_f1, 1.0);
    assert_eq!(report.f1.macro_f1, 1.0);
}

#[test]
fn test_document_nan_row_fails_positional_load() {
    let ctx = TestContext::new();
    let path = ctx.write("toy/jose.txt", "2 1\nd0 nan\nd1 1.0\n");
    assert!(matches!(
        load_document_vectors(&path),
        Err(EvalError::Format { line: 2, .. })
    ));
}

#[test]
fn test_clustering_from_averaged_corpus() {
    let ctx = TestContext::new();
    ctx.write(
        "toy/words.txt",
        "4 2\nrust 1.0 0.0\ncargo 0.9 0.1\nsoup 0.0 1.0\nbroth 0.1 0.9\n",
    );
    ctx.write(
        "toy/text.txt",
        "rust cargo\ncargo unknown rust\nsoup broth\nbroth soup soup\n",
    );
    ctx.write("toy/label.txt", "1\n1\n2\n2\n");

    let averaged =
        load_averaged_documents(ctx.root().join("toy/words.txt"), ctx.root().join("toy/text.txt"))
            .unwrap();
    assert_eq!(averaged.dropped_tokens, 1);
    assert!(averaged.empty_documents.is_empty());

    let labels = read_labels(ctx.root().join("toy")).unwrap();
    for method in [ClusterMethod::KMeans, ClusterMethod::SphericalKMeans] {
        let strategy = method.strategy(Some(3));
        let scores = evaluate_clustering(&averaged.vectors, &labels, 2, strategy.as_ref()).unwrap();
        assert_eq!(scores.purity, 1.0);
    }
}

#[test]
fn test_empty_document_blocks_clustering() {
    let ctx = TestContext::new();
    ctx.write("toy/words.txt", "1 2\nrust 1.0 0.0\n");
    ctx.write("toy/text.txt", "rust\nnothing known\n");

    let averaged =
        load_averaged_documents(ctx.root().join("toy/words.txt"), ctx.root().join("toy/text.txt"))
            .unwrap();
    assert_eq!(averaged.empty_documents, vec![1]);

    let strategy = ClusterMethod::KMeans.strategy(Some(1));
    let err = evaluate_clustering(&averaged.vectors, &[0, 1], 2, strategy.as_ref()).unwrap_err();
    assert!(matches!(err, EvalError::InvalidInput(_)));
}

#[test]
fn test_cli_json_report_keeps_stdout_clean() {
    let ctx = TestContext::new();
    ctx.write("wiki/jose.txt", words_file());
    ctx.write("MEN/MEN_dataset_natural_form_full", "a b 10\nc a 40\nb c 30\nx y 5\n");

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_embed-eval"))
        .args(["sim", "--test", "men", "--json", "--data_dir"])
        .arg(ctx.root())
        .output()
        .unwrap();
    assert!(output.status.success());

    // Log lines go to stderr; stdout is exactly one JSON document.
    let reports: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(reports[0]["test"], "men");
    assert_eq!(reports[0]["retained"], 3);
    assert_eq!(reports[0]["total"], 4);
    assert!(String::from_utf8_lossy(&output.stderr).contains("actual test cases"));
}
