//! sigdec-json contains the JSON schemas used by the sigdec report output.
//!
//! The sweep report is the contract between the sigdec core and downstream
//! reporting and export tooling (tables, CSV, plots, HDL generation). The
//! schemas here carry no behavior; they are plain serde types.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Sweep report JSON schema.
///
/// This is the top-level document written by the sigdec CLI. It contains one
/// entry per successful sweep point, the list of skipped target rates with
/// their reasons, and summary statistics over the successful points.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SweepReport {
    /// Modulator sampling rate in samples per second.
    pub modulator_rate: f64,
    /// Successful sweep points, in the order the target rates were requested.
    pub points: Vec<SweepPoint>,
    /// Target rates that were skipped, with the reason for each.
    pub skipped: Vec<SkippedRate>,
    /// Summary statistics over the successful points.
    pub summary: SweepSummary,
}

/// Result of one successful sweep point.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SweepPoint {
    /// Requested output rate in samples per second.
    pub target_rate: f64,
    /// Oversampling ratio used for this point.
    pub osr: u64,
    /// CIC stage decimation factor.
    pub cic_r: u64,
    /// Number of halfband stages.
    pub hb_count: u32,
    /// Final FIR stage decimation factor.
    pub fir_r: u64,
    /// Total decimation of the chain. Always equals `osr`.
    pub total_decimation: u64,
    /// Human-readable chain description, e.g. `CIC(256)→4xHB→FIR(1)`.
    pub description: String,
    /// Sum of the design-order tap counts of all non-CIC stages.
    pub total_taps: u64,
    /// Signal-to-noise-and-distortion ratio in dB.
    pub sndr_db: f64,
    /// Effective number of bits derived from the SNDR.
    pub enob: f64,
    /// Spurious-free dynamic range in dB.
    pub sfdr_db: f64,
    /// Mean noise bin power in dB.
    pub noise_floor_db: f64,
    /// Concrete stage coefficients and fixed-point formats.
    ///
    /// Only present when chain dumping is requested. This is the data a
    /// downstream HDL generator needs to synthesize the same design.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<FilterChain>,
}

/// A target rate that was skipped, and why.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SkippedRate {
    /// Requested output rate in samples per second.
    pub target_rate: f64,
    /// Reason the point was skipped.
    pub reason: String,
}

/// Summary statistics over the successful sweep points.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SweepSummary {
    /// Target rate of the point with the highest ENOB.
    pub peak_enob_rate: f64,
    /// ENOB of that point.
    pub peak_enob: f64,
    /// Target rate of the most tap-efficient point (highest ENOB per tap).
    pub most_efficient_rate: f64,
    /// ENOB per tap of that point.
    pub enob_per_tap: f64,
}

/// Filter chain JSON schema.
///
/// Stages are listed in processing order: one CIC stage, zero or more
/// halfband stages, one final FIR stage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FilterChain {
    /// Stages in processing order.
    pub stages: Vec<FilterStage>,
    /// Sum of the design-order tap counts of all non-CIC stages.
    pub total_taps: u64,
}

/// One stage of a filter chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FilterStage {
    /// Stage kind.
    pub kind: FilterStageKind,
    /// Decimation factor of this stage.
    pub decimation: u64,
    /// Quantized coefficients. Empty for CIC stages, whose response is
    /// structural rather than coefficient-driven.
    pub coefficients: Vec<i32>,
    /// Fixed-point format of the coefficients. `None` for CIC stages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient_format: Option<FixedPointFormat>,
    /// Fixed-point format of the stage output.
    pub output_format: FixedPointFormat,
}

/// Filter stage kinds.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FilterStageKind {
    /// Cascaded integrator-comb stage.
    Cic,
    /// Halfband decimate-by-2 stage.
    Halfband,
    /// Final FIR stage.
    FinalFir,
}

/// Fixed-point format JSON schema.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FixedPointFormat {
    /// Total word length in bits, including the sign bit.
    pub word_length: u32,
    /// Number of fractional bits.
    pub fraction_length: u32,
    /// Whether the format is signed.
    pub signed: bool,
}
