//! Vector File Loader
//!
//! Parses the word2vec-style text format into an in-memory vector space:
//!
//! ```text
//! <N> <D>
//! <key> <v1> <v2> ... <vD>
//! ```
//!
//! Rows keep their file order so document vectors stay aligned with labels.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{EvalError, Result};

/// What to do with a row whose vector contains a NaN component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NanPolicy {
    /// Drop the row and omit its key (word-similarity loading)
    Skip,
    /// Fail the load (positional document loading)
    Fail,
}

/// Mapping from key to fixed-dimension vector, in file order
#[derive(Debug, Clone)]
pub struct VectorSpace {
    dimension: usize,
    keys: Vec<String>,
    vectors: Vec<Vec<f64>>,
    index: HashMap<String, usize>,
    skipped_nan: usize,
}

impl VectorSpace {
    /// Load a vector file from disk
    ///
    /// # Example
    /// ```ignore
    /// let docs = VectorSpace::load("datasets/20news/jose.txt", NanPolicy::Fail)?;
    /// ```
    pub fn load<P: AsRef<Path>>(path: P, policy: NanPolicy) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
        let space = Self::from_reader(BufReader::new(file), path, policy)?;

        info!(
            path = %path.display(),
            vectors = space.len(),
            dimension = space.dimension,
            skipped_nan = space.skipped_nan,
            "loaded vector file"
        );
        Ok(space)
    }

    /// Parse from any buffered reader; `source` is only used in diagnostics.
    ///
    /// Bytes that are not valid UTF-8 are decoded lossily.
    pub fn from_reader<R: BufRead>(reader: R, source: &Path, policy: NanPolicy) -> Result<Self> {
        let mut lines = reader.split(b'\n').enumerate();

        let (declared, dimension) = match lines.next() {
            Some((_, raw)) => {
                let raw = raw.map_err(|e| EvalError::io(source, e))?;
                parse_header(&decode(&raw), source)?
            }
            None => return Err(EvalError::format(source, 1, "missing header line")),
        };

        let mut space = Self {
            dimension,
            keys: Vec::with_capacity(declared),
            vectors: Vec::with_capacity(declared),
            index: HashMap::with_capacity(declared),
            skipped_nan: 0,
        };
        let mut consumed = 0usize;

        for (i, raw) in lines {
            let line_no = i + 1;
            let raw = raw.map_err(|e| EvalError::io(source, e))?;
            let line = decode(&raw);
            let parts: Vec<&str> = line.split_whitespace().collect();

            if parts.is_empty() {
                continue;
            }

            consumed += 1;
            if consumed > declared {
                return Err(EvalError::format(
                    source,
                    line_no,
                    format!("header declares {} vectors but more rows follow", declared),
                ));
            }

            if parts.len() != dimension + 1 {
                return Err(EvalError::format(
                    source,
                    line_no,
                    format!("expected {} fields, found {}", dimension + 1, parts.len()),
                ));
            }

            let mut values = Vec::with_capacity(dimension);
            for token in &parts[1..] {
                let v: f64 = token.parse().map_err(|_| {
                    EvalError::format(source, line_no, format!("invalid number {:?}", token))
                })?;
                values.push(v);
            }

            if values.iter().any(|v| v.is_nan()) {
                match policy {
                    NanPolicy::Skip => {
                        debug!(key = parts[0], line = line_no, "skipping NaN vector");
                        space.skipped_nan += 1;
                        continue;
                    }
                    NanPolicy::Fail => {
                        return Err(EvalError::format(
                            source,
                            line_no,
                            format!("vector for {:?} contains NaN", parts[0]),
                        ));
                    }
                }
            }

            space.push(parts[0].to_string(), values);
        }

        if consumed != declared {
            return Err(EvalError::format(
                source,
                1,
                format!("header declares {} vectors, file has {}", declared, consumed),
            ));
        }

        if space.skipped_nan > 0 {
            warn!(skipped = space.skipped_nan, "omitted NaN-bearing vectors");
        }

        Ok(space)
    }

    /// Build a space directly from rows (all rows must share one dimension)
    pub fn from_rows<I>(dimension: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f64>)>,
    {
        let mut space = Self {
            dimension,
            keys: Vec::new(),
            vectors: Vec::new(),
            index: HashMap::new(),
            skipped_nan: 0,
        };
        for (key, values) in rows {
            if values.len() != dimension {
                return Err(EvalError::InvalidInput(format!(
                    "vector for {:?} has {} components, expected {}",
                    key,
                    values.len(),
                    dimension
                )));
            }
            space.push(key, values);
        }
        Ok(space)
    }

    fn push(&mut self, key: String, values: Vec<f64>) {
        // A repeated key resolves to its last row; positional access still sees both.
        self.index.insert(key.clone(), self.vectors.len());
        self.keys.push(key);
        self.vectors.push(values);
    }

    /// Get the vector for a key
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.index.get(key).map(|&i| self.vectors[i].as_slice())
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of stored rows
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Rows omitted under [`NanPolicy::Skip`]
    pub fn skipped_nan(&self) -> usize {
        self.skipped_nan
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// All vectors in file order
    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    /// Consume the space, keeping only the positional rows
    pub fn into_vectors(self) -> Vec<Vec<f64>> {
        self.vectors
    }
}

/// Reject rows carrying NaN (e.g. averaged documents with no known token)
pub fn ensure_finite(rows: &[Vec<f64>]) -> Result<()> {
    match rows.iter().position(|row| row.iter().any(|v| v.is_nan())) {
        Some(i) => Err(EvalError::InvalidInput(format!("vector {} contains NaN", i))),
        None => Ok(()),
    }
}

fn decode(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches('\r').to_string()
}

fn parse_header(line: &str, source: &Path) -> Result<(usize, usize)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(EvalError::format(
            source,
            1,
            format!("header must be \"<count> <dimension>\", got {:?}", line),
        ));
    }

    let parse = |s: &str| {
        s.parse::<usize>()
            .map_err(|_| EvalError::format(source, 1, format!("invalid header integer {:?}", s)))
    };
    Ok((parse(fields[0])?, parse(fields[1])?))
}
