//! Evaluation settings.
//!
//! Defaults follow the published benchmark layout under `datasets/`. A JSON
//! file can override any field; command-line flags override the file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::similarity::TestSetKind;

pub const DEFAULT_WORKERS: usize = 20;

/// Location of each word-similarity test file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestSetPaths {
    paths: HashMap<TestSetKind, PathBuf>,
}

impl TestSetPaths {
    /// Published layout relative to `data_dir`
    pub fn under<P: AsRef<Path>>(data_dir: P) -> Self {
        let root = data_dir.as_ref();
        let paths = TestSetKind::ALL
            .into_iter()
            .map(|kind| {
                let rel = match kind {
                    TestSetKind::WordSim353 => "wordsim353/combined.csv",
                    TestSetKind::Men => "MEN/MEN_dataset_natural_form_full",
                    TestSetKind::SimLex => "SimLex-999/SimLex-999.txt",
                };
                (kind, root.join(rel))
            })
            .collect();
        Self { paths }
    }

    pub fn get(&self, kind: TestSetKind) -> Option<&Path> {
        self.paths.get(&kind).map(PathBuf::as_path)
    }

    pub fn set(&mut self, kind: TestSetKind, path: impl Into<PathBuf>) {
        self.paths.insert(kind, path.into());
    }
}

/// Settings shared by every command
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root holding `<dataset>/<emb_file>` and `<dataset>/label.txt`
    pub data_dir: PathBuf,
    /// Worker threads for similarity scoring and k-NN prediction
    pub workers: usize,
    /// Seed for clustering initialisation (entropy when unset)
    pub seed: Option<u64>,
    /// Per-test-set overrides of the layout under `data_dir`
    pub test_sets: TestSetPaths,
}

impl Settings {
    pub const DEFAULT_DATA_DIR: &'static str = "datasets";

    /// Load settings from a JSON file; missing fields take defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| EvalError::format(path, e.line(), e.to_string()))
    }

    /// Full test-set table: overrides on top of the layout under `data_dir`
    pub fn test_set_paths(&self) -> TestSetPaths {
        let mut table = TestSetPaths::under(&self.data_dir);
        for (kind, path) in &self.test_sets.paths {
            table.set(*kind, path.clone());
        }
        table
    }

    /// Directory of one dataset
    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.data_dir.join(dataset)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(Self::DEFAULT_DATA_DIR),
            workers: DEFAULT_WORKERS,
            seed: None,
            test_sets: TestSetPaths::default(),
        }
    }
}
