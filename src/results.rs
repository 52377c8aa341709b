//! Result log: one comma-joined line of metric values per run, appended.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{EvalError, Result};

/// Format metric values as a single comma-joined line (no newline)
pub fn format_line(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Append `values` as one line, creating the file (and parent directory) if needed
pub fn append_result<P: AsRef<Path>>(path: P, values: &[f64]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| EvalError::io(path, e))?;

    let line = format_line(values);
    writeln!(file, "{}", line).map_err(|e| EvalError::io(path, e))?;
    info!(path = %path.display(), "appended {}", line);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line(&[0.5, 1.0, 0.25]), "0.5,1,0.25");
        assert_eq!(format_line(&[]), "");
    }

    #[test]
    fn test_append_accumulates_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("cluster.txt");

        append_result(&path, &[0.1, 0.2]).unwrap();
        append_result(&path, &[0.3]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0.1,0.2\n0.3\n");
    }
}
