//! # Error types of the splitting core
//!
//! Three failure classes are kept apart so that the orchestrator can react to
//! each one differently:
//!
//! | Class | Variant(s) | Typical recovery (outside this crate) |
//! |-------|------------|----------------------------------------|
//! | chemistry evaluation failure | `Chemistry` | reject the split step, reduce the global step |
//! | factorization failure | `SingularMatrix` | change the implicit step size or the operator |
//! | precondition violation | `DimensionMismatch`, `NotInitialized`, `InvalidStepSize`, `TimeOrder`, `SplitConstantsNotReset`, `PhaseOrder` | fix the calling code |
//!
//! `QssStepFailure` and `PointFailure` come from the quasi-steady-state
//! stepper and from the parallel point map respectively. `Io` wraps failed
//! writes of the diagnostic tables.
use crate::Chemistry::chemistry_api::ChemistryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    #[error("chemistry evaluation failed: {0}")]
    Chemistry(#[from] ChemistryError),
    #[error("banded matrix is singular: zero pivot in column {column}")]
    SingularMatrix { column: usize },
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        got: usize,
    },
    #[error("not initialized: {0}")]
    NotInitialized(String),
    #[error("invalid step size h = {0}")]
    InvalidStepSize(f64),
    #[error("end time {t_end:e} lies before the current time {t:e}")]
    TimeOrder { t: f64, t_end: f64 },
    #[error("split constants were not reset before the first evaluation of the cycle")]
    SplitConstantsNotReset,
    #[error("corrector evaluation requested before a predictor evaluation")]
    PhaseOrder,
    #[error("QSS step failed to converge at t = {t:e} with dt = {dt:e}")]
    QssStepFailure { t: f64, dt: f64 },
    #[error("reaction sub-step failed at grid point {point}: {source}")]
    PointFailure {
        point: usize,
        #[source]
        source: Box<SplitError>,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitError {
    /// shortcut for the most common precondition check
    pub fn dimension(context: &str, expected: usize, got: usize) -> Self {
        SplitError::DimensionMismatch {
            context: context.to_string(),
            expected,
            got,
        }
    }
}

/// returns an error if `got != expected`
pub fn check_len(context: &str, expected: usize, got: usize) -> Result<(), SplitError> {
    if expected != got {
        return Err(SplitError::dimension(context, expected, got));
    }
    Ok(())
}
