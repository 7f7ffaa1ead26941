//! Error taxonomy for family bookkeeping and the detection-record codec

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FamilyError>;

/// Failures raised by [`Family`](super::Family) operations and the record codec.
///
/// Every variant is a caller-side logic or data-integrity fault. Nothing here is
/// retried.
#[derive(Debug, Error)]
pub enum FamilyError {
    #[error("Templates do not match: family template is '{expected}', got '{found}'")]
    TemplateMismatch { expected: String, found: String },

    #[error("Can only extend a family with a Detection or Family, not {0}")]
    UnsupportedCombination(&'static str),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Malformed detection record ({reason}): {line}")]
    MalformedRecord { line: String, reason: String },

    #[error("No event with resource id '{0}' in the supplied catalog")]
    LookupFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FamilyError {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        FamilyError::MalformedRecord {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_names_the_line() {
        let err = FamilyError::malformed("no_chans: eight; ", "bad integer");
        let msg = err.to_string();
        assert!(msg.contains("no_chans: eight"));
        assert!(msg.contains("bad integer"));
    }

    #[test]
    fn test_mismatch_message() {
        let err = FamilyError::TemplateMismatch {
            expected: "a".to_string(),
            found: "b".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Templates do not match: family template is 'a', got 'b'"
        );
    }
}
