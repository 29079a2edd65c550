//! Typed errors which callers may need to distinguish.
//!
//! Most functions in this crate return [`anyhow::Result`]. Errors which are part of the public
//! contract are raised as an [`OffGridError`] inside the `anyhow` chain, so they can be recovered
//! with `downcast_ref::<OffGridError>()`.
use thiserror::Error;

/// The error categories of the optimiser
#[derive(Debug, Error, PartialEq)]
pub enum OffGridError {
    /// The inputs (product catalog, hour sample etc.) are malformed
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The solver found that no assignment satisfies the constraints
    #[error("Model is infeasible: {0}")]
    InfeasibleModel(String),
    /// An operation was invoked in the wrong project state
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// A big-M value is invalid or too small for the quantity it is linked to
    #[error("Numeric configuration error: {0}")]
    NumericConfiguration(String),
}

/// Get the [`OffGridError`] at the root of an [`anyhow::Error`], if there is one
pub fn find_offgrid_error(err: &anyhow::Error) -> Option<&OffGridError> {
    err.chain().find_map(|cause| cause.downcast_ref::<OffGridError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_find_offgrid_error() {
        let result: anyhow::Result<()> =
            Err(OffGridError::InvalidState("not optimised".into())).context("Outer context");
        let err = result.unwrap_err();
        assert_eq!(
            find_offgrid_error(&err),
            Some(&OffGridError::InvalidState("not optimised".into()))
        );

        let other = anyhow::anyhow!("Something else");
        assert!(find_offgrid_error(&other).is_none());
    }
}
