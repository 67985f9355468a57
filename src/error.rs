//! Error taxonomy for the decimation core.
//!
//! Errors come in two severities. Point-local errors abort a single sweep
//! point; the sweep logs them and continues with the next target rate. Fatal
//! errors abort the whole run, because nothing useful can be reported.

use thiserror::Error;

/// Errors produced by the decimation core.
#[derive(Debug, Error)]
pub enum Error {
    /// The oversampling ratio is below the minimum of 2.
    #[error("invalid OSR {0}: must be at least 2")]
    InvalidOsr(usize),
    /// The planner produced factors whose product does not equal the OSR.
    ///
    /// This indicates a logic defect in the planner and is unreachable by
    /// construction. It is treated as fatal.
    #[error("decimation plan mismatch: {cic_r} * 2^{hb_count} * {fir_r} != {osr}")]
    DecimationMismatch {
        /// CIC decimation factor of the bad plan.
        cic_r: usize,
        /// Halfband stage count of the bad plan.
        hb_count: usize,
        /// Final FIR decimation factor of the bad plan.
        fir_r: usize,
        /// OSR the plan was built for.
        osr: usize,
    },
    /// No design method converged for a filter stage.
    #[error("filter design failed for {stage}: {reason}")]
    FilterDesignFailed {
        /// Stage that could not be designed.
        stage: String,
        /// Why the design failed.
        reason: String,
    },
    /// The filtered signal is degenerate or too short to analyze.
    #[error("invalid filtered output: {0}")]
    InvalidOutput(String),
    /// No usable samples remain after input filtering.
    #[error("bitstream contains no usable samples")]
    EmptyBitstream,
    /// Every sweep point failed.
    #[error("no sweep point succeeded")]
    EmptySweepResult,
}

impl Error {
    /// Returns true if this error aborts only the current sweep point.
    ///
    /// Point-local errors are caught by the sweep controller, logged, and the
    /// sweep continues. All other errors abort the run.
    pub fn is_point_local(&self) -> bool {
        matches!(
            self,
            Error::InvalidOsr(_) | Error::FilterDesignFailed { .. } | Error::InvalidOutput(_)
        )
    }
}
