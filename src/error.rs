// ============================================================
// Error taxonomy
// ============================================================
// Typed errors for the two layers that can fail in a way the
// caller may want to inspect: the model (shape / config) and
// the data pipeline (CSV ingestion, partitioning).
//
// Application, CLI and infra code wrap these in anyhow::Error
// with context, exactly like the rest of the crate does.

use thiserror::Error;

/// Failures raised by the tensor blocks in `ml`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A block received a tensor whose dimensions do not match
    /// its configured width, step count or batch size.
    #[error("shape mismatch in {block}: expected {expected}, got {actual:?}")]
    ShapeMismatch {
        block:    &'static str,
        expected: String,
        actual:   Vec<usize>,
    },

    /// The configuration cannot describe a consistent network.
    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    /// Tensor data could not be read back to host memory.
    #[error("tensor readback failed: {0}")]
    Readback(String),
}

impl ModelError {
    pub fn shape(block: &'static str, expected: impl Into<String>, actual: &[usize]) -> Self {
        ModelError::ShapeMismatch {
            block,
            expected: expected.into(),
            actual:   actual.to_vec(),
        }
    }
}

/// Failures raised while loading and partitioning raw series.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("cannot open '{path}': {source}")]
    Io {
        path:   String,
        source: std::io::Error,
    },

    #[error("CSV parse error in '{path}' at line {line}: {source}")]
    CsvParse {
        path:   String,
        line:   usize,
        source: csv::Error,
    },

    #[error("series '{0}' contains no rows")]
    EmptySeries(String),

    #[error("series '{name}' has {rows} rows, too few to leave a training partition with test fraction {test_fraction}")]
    TooFewRows {
        name:          String,
        rows:          usize,
        test_fraction: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_block() {
        let e = ModelError::shape("time2vec", "[_, _, 1]", &[2, 7, 3]);
        let msg = e.to_string();
        assert!(msg.contains("time2vec"));
        assert!(msg.contains("[2, 7, 3]"));
    }
}
