//! Multirate fixed-point processing.
//!
//! Runs a prepared bitstream through a [`FilterChain`] under the fixed-point
//! arithmetic the stages declare. Processing is purely functional: identical
//! input and chain always produce bit-identical output, and no stage carries
//! state beyond its own delay line within a single run.

use crate::chain::{constants, CicStage, FilterChain, FilterStage, FirStage};
use crate::error::Error;
use crate::fixedpoint::{rescale_round, FixedPointFormat};

/// Minimal signed format that exactly holds the bipolar alphabet {-1, 0, +1}.
const INPUT_FORMAT: FixedPointFormat = FixedPointFormat::signed(2, 0);

/// Shortest output that is still meaningful to analyze.
const MIN_OUTPUT_SAMPLES: usize = 100;

/// Runs `bitstream` through `chain`, producing samples at the decimated rate.
///
/// The input must already be bipolar and padded to a multiple of the chain's
/// total decimation. Each stage output has `ceil(len / decimation)` samples.
/// The CIC output is rescaled by `2^(-gain_bits) * 0.85` and requantized
/// (round-to-nearest-even) into the working FIR format before the first FIR
/// stage consumes it.
///
/// Fails with [`Error::InvalidOutput`] if the result is empty, entirely
/// non-finite, or shorter than 100 samples.
pub fn process_bitstream(bitstream: &[f64], chain: &FilterChain) -> Result<Vec<f64>, Error> {
    let working_format = chain
        .stages
        .iter()
        .find_map(|s| match s {
            FilterStage::Halfband(f) | FilterStage::FinalFir(f) => Some(f.output_format),
            FilterStage::Cic(_) => None,
        })
        .unwrap_or(FixedPointFormat::signed(
            constants::OUTPUT_WORD_LENGTH,
            constants::DEFAULT_OUTPUT_FRACTION,
        ));

    let mut samples: Vec<i64> = bitstream.iter().map(|&v| INPUT_FORMAT.quantize(v)).collect();
    for stage in &chain.stages {
        samples = match stage {
            FilterStage::Cic(cic) => {
                let raw = apply_cic(&samples, cic);
                compensate_cic_gain(&raw, cic, working_format)
            }
            FilterStage::Halfband(fir) | FilterStage::FinalFir(fir) => apply_fir(&samples, fir),
        };
    }

    let output: Vec<f64> = samples.iter().map(|&v| working_format.to_float(v)).collect();
    if output.is_empty() {
        return Err(Error::InvalidOutput("empty output".to_string()));
    }
    if output.len() < MIN_OUTPUT_SAMPLES {
        return Err(Error::InvalidOutput(format!(
            "only {} samples, need at least {MIN_OUTPUT_SAMPLES}",
            output.len()
        )));
    }
    if !output.iter().any(|v| v.is_finite()) {
        return Err(Error::InvalidOutput("no finite samples".to_string()));
    }
    Ok(output)
}

/// Applies the CIC stage in pure integer arithmetic.
///
/// Integrators run at the input rate and combs at the output rate. The
/// arithmetic wraps modulo two's complement, which is exact as long as the
/// true output magnitude fits the stage's 58-bit word.
fn apply_cic(input: &[i64], stage: &CicStage) -> Vec<i64> {
    let r = stage.decimation;
    let mut integrators = vec![0i64; stage.sections];
    let mut combs = vec![0i64; stage.sections * stage.diff_delay];
    let mut output = Vec::with_capacity(input.len().div_ceil(r));

    for (i, &x) in input.iter().enumerate() {
        let mut v = x;
        for acc in integrators.iter_mut() {
            *acc = acc.wrapping_add(v);
            v = *acc;
        }
        if i % r == 0 {
            for delay in combs.iter_mut() {
                let delayed = *delay;
                *delay = v;
                v = v.wrapping_sub(delayed);
            }
            output.push(v);
        }
    }
    output
}

/// Rescales CIC output into the working FIR format.
///
/// The scale is `2^(-gain_bits) * 0.85`: unity gain compensation with
/// deliberate headroom below full scale, so modulator-signal peaking cannot
/// saturate the first FIR stage.
fn compensate_cic_gain(input: &[i64], stage: &CicStage, format: FixedPointFormat) -> Vec<i64> {
    let scale = constants::CIC_HEADROOM * (-stage.gain_bits).exp2();
    input.iter().map(|&v| format.quantize(v as f64 * scale)).collect()
}

/// Applies one FIR stage (halfband or final FIR) in fixed point.
///
/// Products carry the coefficient and sample fractional scales combined;
/// the accumulator shares the product scale and saturates at the 54-bit
/// accumulator bounds. Each decimated output is requantized back to the
/// stage output format with round-to-nearest-even.
fn apply_fir(input: &[i64], stage: &FirStage) -> Vec<i64> {
    let r = stage.decimation;
    let taps = stage.quantized.len();
    let shift = stage.coefficient_format.fraction_length;
    let out_len = input.len().div_ceil(r);
    let mut output = Vec::with_capacity(out_len);

    for m in 0..out_len {
        let n = m * r;
        let mut acc = 0i64;
        for (k, &c) in stage.quantized.iter().enumerate().take(taps.min(n + 1)) {
            if c == 0 {
                continue;
            }
            let x = input[n - k];
            acc = constants::ACCUMULATOR_FORMAT.saturate(acc + c as i64 * x);
        }
        output.push(stage.output_format.saturate(rescale_round(acc, shift)));
    }
    output
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chain::build_chain;
    use crate::planner::plan_decimation;

    fn chain_for(osr: usize) -> FilterChain {
        let plan = plan_decimation(osr).unwrap();
        build_chain(&plan, constants::DEFAULT_OUTPUT_FRACTION).unwrap()
    }

    /// Deterministic ±1 sequence from a linear congruential generator.
    fn pseudo_random_bits(len: usize, mut state: u64) -> Vec<f64> {
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                if state >> 63 == 0 {
                    1.0
                } else {
                    -1.0
                }
            })
            .collect()
    }

    #[test]
    fn zero_input_gives_zero_output() {
        let chain = chain_for(64);
        let output = process_bitstream(&vec![0.0; 32768], &chain).unwrap();
        assert_eq!(output.len(), 512);
        assert!(output.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn repeat_runs_are_bit_identical() {
        let chain = chain_for(128);
        let input = pseudo_random_bits(65536, 42);
        let a = process_bitstream(&input, &chain).unwrap();
        let b = process_bitstream(&input, &chain).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn dc_input_settles_near_headroom() {
        // constant +1 input: CIC gain fully compensated leaves 0.85, and the
        // FIR stages are unity at DC
        let chain = chain_for(64);
        let output = process_bitstream(&vec![1.0; 32768], &chain).unwrap();
        let tail = &output[output.len() - 10..];
        for &v in tail {
            assert!((v - 0.85).abs() < 0.02, "steady state {v}");
        }
    }

    #[test]
    fn output_length_matches_total_decimation() {
        let chain = chain_for(512);
        let input = pseudo_random_bits(1 << 17, 7);
        let output = process_bitstream(&input, &chain).unwrap();
        assert_eq!(output.len(), (1 << 17) / 512);
    }

    #[test]
    fn short_output_rejected() {
        let chain = chain_for(64);
        let err = process_bitstream(&vec![1.0; 640], &chain).unwrap_err();
        assert!(matches!(err, Error::InvalidOutput(_)));
    }

    #[test]
    fn empty_input_rejected() {
        let chain = chain_for(64);
        let err = process_bitstream(&[], &chain).unwrap_err();
        assert!(matches!(err, Error::InvalidOutput(_)));
    }
}
