//! Output-rate sweep control.
//!
//! Drives the planner, chain builder, processor and analyzer over a set of
//! target output rates sharing one prepared bitstream. Point-local failures
//! are logged and skipped; the sweep only fails as a whole when the
//! bitstream is unusable or no point succeeds.

use crate::bitstream;
use crate::chain::{build_chain, FilterChain};
use crate::error::Error;
use crate::planner::{plan_decimation, DecimationPlan};
use crate::process::process_bitstream;
use crate::spectrum::{analyze, ResolutionMetrics};

/// One successful sweep point.
///
/// A point is created, computed and either kept or discarded; failed points
/// never appear in the result set.
#[derive(Debug, Clone)]
pub struct SweepPoint {
    /// Requested output rate in samples per second.
    pub target_rate: f64,
    /// Oversampling ratio used for this point.
    pub osr: usize,
    /// Stage factorization used for this point.
    pub plan: DecimationPlan,
    /// Concrete filter chain used for this point.
    pub chain: FilterChain,
    /// Measured resolution metrics.
    pub metrics: ResolutionMetrics,
}

/// A target rate that was skipped, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedPoint {
    /// Requested output rate in samples per second.
    pub target_rate: f64,
    /// Why the point was skipped.
    pub reason: String,
}

/// Aggregated result of a sweep.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// Successful points, in requested order.
    pub points: Vec<SweepPoint>,
    /// Skipped rates with reasons. A requested rate is never silently
    /// dropped: it lands either in `points` or here.
    pub skipped: Vec<SkippedPoint>,
}

impl SweepResult {
    /// The point with the highest ENOB.
    pub fn peak_enob(&self) -> &SweepPoint {
        self.points
            .iter()
            .max_by(|a, b| a.metrics.enob.total_cmp(&b.metrics.enob))
            .expect("sweep result contains at least one point")
    }

    /// The most tap-efficient point (highest ENOB per design-order tap).
    pub fn most_efficient(&self) -> &SweepPoint {
        self.points
            .iter()
            .max_by(|a, b| {
                (a.metrics.enob / a.chain.total_taps as f64)
                    .total_cmp(&(b.metrics.enob / b.chain.total_taps as f64))
            })
            .expect("sweep result contains at least one point")
    }
}

/// Sweeps the target output rates against one raw bitstream.
///
/// The bitstream is normalized once and shared read-only across all points;
/// each point pads its own copy to its own plan's total decimation. Any
/// point-local failure (invalid OSR, filter design failure, degenerate
/// output) is logged and skips only that point. Returns
/// [`Error::EmptyBitstream`] if the input has no usable samples and
/// [`Error::EmptySweepResult`] if no point succeeds.
#[tracing::instrument(skip(raw, target_rates), fields(num_rates = target_rates.len()))]
pub fn run_sweep(
    raw: &[f64],
    modulator_rate: f64,
    target_rates: &[f64],
    output_fraction: u32,
) -> Result<SweepResult, Error> {
    let prepared = bitstream::normalize(raw)?;

    let mut points = Vec::new();
    let mut skipped = Vec::new();
    for &target_rate in target_rates {
        match run_point(&prepared, modulator_rate, target_rate, output_fraction) {
            Ok(point) => {
                tracing::info!(
                    target_rate,
                    osr = point.osr,
                    sndr_db = point.metrics.sndr_db,
                    enob = point.metrics.enob,
                    chain = %point.plan.description,
                    "sweep point complete"
                );
                points.push(point);
            }
            Err(e) if e.is_point_local() => {
                tracing::warn!(target_rate, reason = %e, "skipping sweep point");
                skipped.push(SkippedPoint {
                    target_rate,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    if points.is_empty() {
        return Err(Error::EmptySweepResult);
    }
    Ok(SweepResult { points, skipped })
}

/// Computes one sweep point on the shared prepared bitstream.
fn run_point(
    prepared: &[f64],
    modulator_rate: f64,
    target_rate: f64,
    output_fraction: u32,
) -> Result<SweepPoint, Error> {
    let osr = (modulator_rate / target_rate).round() as usize;
    let plan = plan_decimation(osr)?;
    let chain = build_chain(&plan, output_fraction)?;
    let padded = bitstream::pad_to_multiple(prepared, plan.total_decimation);
    let output = process_bitstream(&padded, &chain)?;
    let metrics = analyze(&output, target_rate);
    Ok(SweepPoint {
        target_rate,
        osr,
        plan,
        chain,
        metrics,
    })
}
