//! Error types for the tempering engine.
//!
//! Only two situations are surfaced as errors: invalid configuration, which is
//! rejected before any sampling starts, and a broken temperature ladder, which
//! is fatal because every acceptance ratio computed from it would be wrong.
//! Out-of-support or non-finite proposals are *not* errors; they evaluate to a
//! log-density of negative infinity and get rejected like any other bad move.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected before sampling starts: bad rung count, non-positive proposal
    /// scale, malformed explicit ladder, zero iterations and similar.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The temperature ladder lost its ordering. Adaptation clamps gaps so
    /// this should never happen during a run; explicit ladders are checked
    /// up front.
    #[error("temperature ladder violation: {0}")]
    Ladder(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("need at least 2 rungs, got 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: need at least 2 rungs, got 1"
        );

        let err = Error::Ladder("rung 2 not hotter than rung 1".to_string());
        assert!(err.to_string().contains("temperature ladder"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
