//! Ground-truth label loading.
//!
//! `label.txt` holds one 1-indexed class id per document; ids are shifted to
//! 0-indexed on load.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{EvalError, Result};

pub const LABEL_FILE: &str = "label.txt";

/// Read `<dir>/label.txt`
pub fn read_labels<P: AsRef<Path>>(dir: P) -> Result<Vec<usize>> {
    let path = dir.as_ref().join(LABEL_FILE);
    let file = File::open(&path).map_err(|e| EvalError::io(&path, e))?;
    let labels = parse_labels(BufReader::new(file), &path)?;
    info!(path = %path.display(), documents = labels.len(), "loaded labels");
    Ok(labels)
}

/// Parse one positive integer per line, returning them decremented by one
pub fn parse_labels<R: BufRead>(reader: R, source: &Path) -> Result<Vec<usize>> {
    let mut labels = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| EvalError::io(source, e))?;
        let token = line.trim();

        let value: i64 = token.parse().map_err(|_| {
            EvalError::format(source, i + 1, format!("invalid label {:?}", token))
        })?;
        if value < 1 {
            return Err(EvalError::format(
                source,
                i + 1,
                format!("label must be a positive integer, got {}", value),
            ));
        }

        labels.push((value - 1) as usize);
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_zero_indexed() {
        let labels = parse_labels("1\n1\n2\n2\n".as_bytes(), Path::new("label.txt")).unwrap();
        assert_eq!(labels, vec![0, 0, 1, 1]);
    }

    #[test]
    fn test_sparse_label_space_is_kept() {
        let labels = parse_labels("7\n3\n".as_bytes(), Path::new("label.txt")).unwrap();
        assert_eq!(labels, vec![6, 2]);
    }

    #[test]
    fn test_rejects_zero_and_garbage() {
        let err = parse_labels("1\n0\n".as_bytes(), Path::new("label.txt")).unwrap_err();
        assert!(matches!(err, EvalError::Format { line: 2, .. }));

        let err = parse_labels("a\n".as_bytes(), Path::new("label.txt")).unwrap_err();
        assert!(matches!(err, EvalError::Format { line: 1, .. }));
    }
}
