use thiserror::Error;

/// Errors surfaced by the clustering core.
///
/// Small or degenerate batches are never an error here: reduction stages skip
/// themselves and the density clusterers fall back to an all-noise (or
/// all-singleton) labeling instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// The batch contained no vectors.
    #[error("empty input: at least one vector is required")]
    EmptyInput,

    /// Vectors inside one batch disagree on their length.
    #[error("dimension mismatch at index {index}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Position of the first offending vector.
        index: usize,
        /// Length of the first vector in the batch.
        expected: usize,
        /// Length of the offending vector.
        found: usize,
    },

    /// A vector carried NaN or an infinity.
    #[error("non-finite value in vector {index}")]
    NonFiniteValue {
        /// Position of the offending vector.
        index: usize,
    },

    /// The grouper received a different number of labels than documents.
    #[error("length mismatch: {documents} documents but {labels} labels")]
    LengthMismatch { documents: usize, labels: usize },

    /// A configuration value is out of range.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },
}

impl ClusterError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        ClusterError::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_message() {
        let err = ClusterError::DimensionMismatch {
            index: 3,
            expected: 384,
            found: 383,
        };
        let msg = err.to_string();
        assert!(msg.contains("index 3"));
        assert!(msg.contains("384"));
        assert!(msg.contains("383"));
    }

    #[test]
    fn invalid_parameter_message() {
        let err = ClusterError::invalid("eps", "must be positive");
        assert_eq!(err.to_string(), "invalid parameter eps: must be positive");
    }
}
