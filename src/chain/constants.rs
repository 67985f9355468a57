//! Filter chain implementation constants.
//!
//! This module contains the constants that define the stage structure and
//! fixed-point characteristics of the decimation chain.

use crate::fixedpoint::FixedPointFormat;

/// Number of integrator/comb sections in the CIC stage.
pub const CIC_SECTIONS: usize = 6;

/// Differential delay of the CIC comb sections.
pub const CIC_DIFF_DELAY: usize = 1;

/// Word length of the CIC accumulators and output.
///
/// Wide enough that no intermediate overflow occurs for any CIC decimation
/// factor up to [`MAX_CIC_DECIMATION`]: the DC gain is `R^6`, so 256^6 needs
/// 48 magnitude bits.
pub const CIC_OUTPUT_BITS: u32 = 58;

/// Maximum CIC decimation factor the 58-bit accumulators support.
pub const MAX_CIC_DECIMATION: usize = 256;

/// Headroom factor applied when compensating the CIC gain.
///
/// Kept below unity so modulator-signal peaking cannot saturate the first
/// FIR stage input.
pub const CIC_HEADROOM: f64 = 0.85;

/// Fixed-point format of all FIR coefficients (1 sign + 15 fractional bits).
pub const COEFFICIENT_FORMAT: FixedPointFormat = FixedPointFormat::signed(16, 15);

/// Fixed-point format of FIR products (1 sign + 4 integer + 33 fractional).
pub const PRODUCT_FORMAT: FixedPointFormat = FixedPointFormat::signed(38, 33);

/// Fixed-point format of FIR accumulators, sharing the product scale.
pub const ACCUMULATOR_FORMAT: FixedPointFormat = FixedPointFormat::signed(54, 33);

/// Word length of every FIR stage output.
pub const OUTPUT_WORD_LENGTH: u32 = 22;

/// Default fraction length of the FIR stage outputs (Q4.18-class format).
pub const DEFAULT_OUTPUT_FRACTION: u32 = 18;

/// Halfband design ladder: `(filter order, transition width)` per stage.
///
/// Stages run from widest to narrowest transition band; stages beyond the
/// fourth reuse the last entry. Transition widths are full widths in cycles
/// per sample, centered on 0.25.
pub const HALFBAND_LADDER: [(usize, f64); 4] = [(10, 0.15), (14, 0.10), (18, 0.08), (22, 0.06)];

/// Final FIR passband edge, normalized to the output Nyquist frequency.
pub const FIR_PASSBAND: f64 = 0.35;

/// Final FIR stopband edge, normalized to the output Nyquist frequency.
pub const FIR_STOPBAND: f64 = 0.65;

/// Final FIR stopband attenuation requirement in dB.
pub const FIR_STOPBAND_ATTENUATION_DB: f64 = 80.0;

/// Final FIR passband ripple requirement.
pub const FIR_PASSBAND_RIPPLE: f64 = 0.01;

/// Tap count of the non-decimating spectral shaping FIR used when the final
/// stage factor is 1.
pub const SHAPING_FIR_TAPS: usize = 27;

/// Largest tap count the equiripple search will attempt before the windowed
/// fallback takes over.
pub const MAX_EQUIRIPPLE_TAPS: usize = 512;

/// Windowed fallback tap budget: `min(CAP, BASE + round(PER_OCTAVE * log2(R)))`.
pub const WINDOWED_TAPS_CAP: usize = 51;

/// Base tap count of the windowed fallback design.
pub const WINDOWED_TAPS_BASE: usize = 15;

/// Additional windowed fallback taps per octave of decimation.
pub const WINDOWED_TAPS_PER_OCTAVE: f64 = 8.0;
