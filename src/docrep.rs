//! Document Representation
//!
//! Builds one vector per document by averaging the vectors of its tokens.
//! Tokens missing from the word space are dropped from the average, not
//! zero-filled.
//!
//! A document with no known tokens has no defined average. It comes out as an
//! all-NaN vector and its index is listed in [`DocumentVectors::empty_documents`];
//! the classification and clustering evaluators reject such rows.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::{EvalError, Result};
use crate::vectors::VectorSpace;

/// Averaged document vectors plus omission accounting
#[derive(Debug, Clone)]
pub struct DocumentVectors {
    pub vectors: Vec<Vec<f64>>,
    /// Indices of documents with zero known tokens (NaN rows)
    pub empty_documents: Vec<usize>,
    /// Tokens dropped because the word space lacked them
    pub dropped_tokens: usize,
}

/// Average word vectors per document
pub fn average_documents<D, T>(docs: &[D], words: &VectorSpace) -> DocumentVectors
where
    D: AsRef<[T]>,
    T: AsRef<str>,
{
    let dimension = words.dimension();
    let mut vectors = Vec::with_capacity(docs.len());
    let mut empty_documents = Vec::new();
    let mut dropped_tokens = 0;

    for (doc_idx, doc) in docs.iter().enumerate() {
        let mut sum = vec![0.0f64; dimension];
        let mut count = 0usize;

        for token in doc.as_ref() {
            match words.get(token.as_ref()) {
                Some(emb) => {
                    for (s, v) in sum.iter_mut().zip(emb) {
                        *s += v;
                    }
                    count += 1;
                }
                None => dropped_tokens += 1,
            }
        }

        if count == 0 {
            debug!(document = doc_idx, "no known tokens");
            empty_documents.push(doc_idx);
            vectors.push(vec![f64::NAN; dimension]);
            continue;
        }

        for s in sum.iter_mut() {
            *s /= count as f64;
        }
        vectors.push(sum);
    }

    if !empty_documents.is_empty() {
        warn!(
            count = empty_documents.len(),
            "documents without any known token produce NaN vectors"
        );
    }

    DocumentVectors {
        vectors,
        empty_documents,
        dropped_tokens,
    }
}

/// Read a corpus file: one document per line, tokens separated by spaces
pub fn read_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| EvalError::io(path, e))?;
    let mut docs = Vec::new();

    for line in BufReader::new(file).split(b'\n') {
        let line = line.map_err(|e| EvalError::io(path, e))?;
        let text = String::from_utf8_lossy(&line);
        docs.push(
            text.trim()
                .split(' ')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        );
    }

    info!(path = %path.display(), documents = docs.len(), "loaded corpus");
    Ok(docs)
}
