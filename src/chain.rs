//! Filter chain construction.
//!
//! This module turns a [`DecimationPlan`](crate::planner::DecimationPlan)
//! into concrete filter stages with fixed-point formats. Equiripple designs
//! use the Parks-McClellan algorithm via the [pm-remez](mod@pm_remez) crate;
//! a windowed-sinc routine serves as the fallback when equiripple design
//! does not converge.

use crate::error::Error;
use crate::fixedpoint::FixedPointFormat;
use crate::planner::DecimationPlan;
use pm_remez::{constant, order_estimates::ichige, pm_parameters, pm_remez, BandSetting};
use std::f64::consts::PI;

pub mod constants;

/// The CIC stage of a chain.
///
/// CIC stages are multiplier-free; their response is determined entirely by
/// the section count and decimation factor. The internal gain is
/// `decimation^sections`, recorded as `gain_bits` for downstream
/// compensation.
#[derive(Debug, Clone, PartialEq)]
pub struct CicStage {
    /// Decimation factor.
    pub decimation: usize,
    /// Number of integrator/comb sections.
    pub sections: usize,
    /// Differential delay of the comb sections.
    pub diff_delay: usize,
    /// `sections * log2(decimation)`, the gain in bits to compensate.
    pub gain_bits: f64,
    /// Output format: pure integer accumulation.
    pub output_format: FixedPointFormat,
}

/// A coefficient-driven FIR stage (halfband or final FIR).
#[derive(Debug, Clone, PartialEq)]
pub struct FirStage {
    /// Decimation factor.
    pub decimation: usize,
    /// Designed coefficients, before quantization.
    pub coefficients: Vec<f64>,
    /// Coefficients quantized into [`constants::COEFFICIENT_FORMAT`].
    pub quantized: Vec<i16>,
    /// Format of the quantized coefficients.
    pub coefficient_format: FixedPointFormat,
    /// Format of the stage output.
    pub output_format: FixedPointFormat,
}

/// One stage of a decimation chain.
///
/// Stages share no mutable state and differ only in their transfer function
/// and fixed-point format, so they are modeled as a tagged variant rather
/// than a trait hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterStage {
    /// Cascaded integrator-comb stage.
    Cic(CicStage),
    /// Halfband decimate-by-2 stage with structural zeros.
    Halfband(FirStage),
    /// Final FIR stage.
    FinalFir(FirStage),
}

impl FilterStage {
    /// Decimation factor of this stage.
    pub fn decimation(&self) -> usize {
        match self {
            FilterStage::Cic(s) => s.decimation,
            FilterStage::Halfband(s) | FilterStage::FinalFir(s) => s.decimation,
        }
    }

    /// Design-order tap count. Zero for CIC stages.
    pub fn taps(&self) -> usize {
        match self {
            FilterStage::Cic(_) => 0,
            FilterStage::Halfband(s) | FilterStage::FinalFir(s) => s.coefficients.len(),
        }
    }
}

/// An ordered cascade of filter stages.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    /// Stages in processing order.
    pub stages: Vec<FilterStage>,
    /// Sum of the design-order tap counts of all non-CIC stages.
    pub total_taps: usize,
    /// Human-readable description of the cascade.
    pub description: String,
}

impl From<&FilterStage> for sigdec_json::FilterStage {
    fn from(stage: &FilterStage) -> sigdec_json::FilterStage {
        match stage {
            FilterStage::Cic(cic) => sigdec_json::FilterStage {
                kind: sigdec_json::FilterStageKind::Cic,
                decimation: cic.decimation as u64,
                coefficients: Vec::new(),
                coefficient_format: None,
                output_format: cic.output_format.into(),
            },
            FilterStage::Halfband(fir) | FilterStage::FinalFir(fir) => sigdec_json::FilterStage {
                kind: if matches!(stage, FilterStage::Halfband(_)) {
                    sigdec_json::FilterStageKind::Halfband
                } else {
                    sigdec_json::FilterStageKind::FinalFir
                },
                decimation: fir.decimation as u64,
                coefficients: fir.quantized.iter().map(|&c| c as i32).collect(),
                coefficient_format: Some(fir.coefficient_format.into()),
                output_format: fir.output_format.into(),
            },
        }
    }
}

impl From<&FilterChain> for sigdec_json::FilterChain {
    fn from(chain: &FilterChain) -> sigdec_json::FilterChain {
        sigdec_json::FilterChain {
            stages: chain.stages.iter().map(|s| s.into()).collect(),
            total_taps: chain.total_taps as u64,
        }
    }
}

/// Builds the filter stages for a decimation plan.
///
/// The chain is one CIC stage, `hb_count` halfband stages ordered from
/// widest to narrowest transition band, and one final FIR stage. Every FIR
/// output uses a 22-bit word with `output_fraction` fractional bits.
///
/// Fails with [`Error::FilterDesignFailed`] if the CIC factor exceeds what
/// the 58-bit accumulators support, or if a stage converges under neither
/// the equiripple nor the windowed design method.
pub fn build_chain(plan: &DecimationPlan, output_fraction: u32) -> Result<FilterChain, Error> {
    if plan.cic_r > constants::MAX_CIC_DECIMATION {
        return Err(Error::FilterDesignFailed {
            stage: format!("CIC({})", plan.cic_r),
            reason: format!(
                "decimation exceeds the {} supported by {}-bit accumulation",
                constants::MAX_CIC_DECIMATION,
                constants::CIC_OUTPUT_BITS
            ),
        });
    }
    let output_format = FixedPointFormat::signed(constants::OUTPUT_WORD_LENGTH, output_fraction);

    let mut stages = Vec::with_capacity(plan.hb_count + 2);
    let mut parts = Vec::with_capacity(plan.hb_count + 2);

    let cic = CicStage {
        decimation: plan.cic_r,
        sections: constants::CIC_SECTIONS,
        diff_delay: constants::CIC_DIFF_DELAY,
        gain_bits: constants::CIC_SECTIONS as f64 * (plan.cic_r as f64).log2(),
        output_format: FixedPointFormat::signed(constants::CIC_OUTPUT_BITS, 0),
    };
    parts.push(format!("CIC({})", cic.decimation));
    stages.push(FilterStage::Cic(cic));

    for k in 0..plan.hb_count {
        let (order, transition) =
            constants::HALFBAND_LADDER[k.min(constants::HALFBAND_LADDER.len() - 1)];
        let coefficients = design_halfband(order, transition)?;
        parts.push(format!("HB{}", coefficients.len()));
        stages.push(FilterStage::Halfband(fir_stage(
            2,
            coefficients,
            output_format,
        )));
    }

    let coefficients = design_final_fir(plan.fir_r)?;
    parts.push(format!("FIR{}", coefficients.len()));
    stages.push(FilterStage::FinalFir(fir_stage(
        plan.fir_r,
        coefficients,
        output_format,
    )));

    let total_taps = stages.iter().map(FilterStage::taps).sum();
    Ok(FilterChain {
        stages,
        total_taps,
        description: parts.join("→"),
    })
}

fn fir_stage(decimation: usize, coefficients: Vec<f64>, output_format: FixedPointFormat) -> FirStage {
    let quantized = coefficients
        .iter()
        .map(|&c| constants::COEFFICIENT_FORMAT.quantize(c) as i16)
        .collect();
    FirStage {
        decimation,
        coefficients,
        quantized,
        coefficient_format: constants::COEFFICIENT_FORMAT,
        output_format,
    }
}

/// Designs a linear-phase equiripple halfband low-pass of the given order.
///
/// The transition band is centered on 0.25 cycles/sample with the given full
/// width. The halfband structure is enforced exactly afterwards: the center
/// tap is 0.5, every other even-offset tap is zero, and the odd-offset taps
/// are scaled to unity DC gain.
fn design_halfband(order: usize, transition_width: f64) -> Result<Vec<f64>, Error> {
    let num_taps = order + 1;
    let passband_end = 0.25 - transition_width / 2.0;
    let stopband_start = 0.25 + transition_width / 2.0;
    let mut h = equiripple_lowpass_fixed(num_taps, passband_end, stopband_start, 1.0)
        .map_err(|reason| Error::FilterDesignFailed {
            stage: format!("HB{num_taps}"),
            reason,
        })?;

    let center = order / 2;
    for k in 0..=center {
        let mirrored = (h[k] + h[num_taps - 1 - k]) / 2.0;
        h[k] = mirrored;
        h[num_taps - 1 - k] = mirrored;
    }
    for (k, tap) in h.iter_mut().enumerate() {
        let offset = k as isize - center as isize;
        if offset != 0 && offset % 2 == 0 {
            *tap = 0.0;
        }
    }
    h[center] = 0.5;
    let odd_sum: f64 = h
        .iter()
        .enumerate()
        .filter(|(k, _)| (*k as isize - center as isize) % 2 != 0)
        .map(|(_, &tap)| tap)
        .sum();
    let scale = 0.5 / odd_sum;
    for (k, tap) in h.iter_mut().enumerate() {
        if (k as isize - center as isize) % 2 != 0 {
            *tap *= scale;
        }
    }
    Ok(h)
}

/// Designs the final FIR stage for a decimation factor of `fir_r`.
///
/// For `fir_r > 1` this is a decimating low-pass with relaxed edges
/// (passband 0.35 and stopband 0.65 of the output Nyquist, stopband
/// attenuation at least 80 dB), designed by equiripple search and falling
/// back to a windowed-sinc design of `min(51, 15 + round(8*log2(fir_r)))`
/// taps when the search does not converge. For `fir_r == 1` it is a fixed
/// 27-tap low-pass used purely for spectral shaping.
fn design_final_fir(fir_r: usize) -> Result<Vec<f64>, Error> {
    let passband_end = constants::FIR_PASSBAND * 0.5 / fir_r as f64;
    let stopband_start = constants::FIR_STOPBAND * 0.5 / fir_r as f64;
    let delta_p = constants::FIR_PASSBAND_RIPPLE;
    let delta_s = 10.0f64.powf(-constants::FIR_STOPBAND_ATTENUATION_DB / 20.0);
    let cutoff = (passband_end + stopband_start) / 2.0;

    if fir_r == 1 {
        let num_taps = constants::SHAPING_FIR_TAPS;
        return match equiripple_lowpass_fixed(num_taps, passband_end, stopband_start, 1.0) {
            Ok(h) => Ok(h),
            Err(reason) => {
                tracing::debug!(%reason, "shaping FIR equiripple design failed, using window");
                Ok(windowed_sinc_lowpass(
                    num_taps,
                    cutoff,
                    constants::FIR_STOPBAND_ATTENUATION_DB,
                ))
            }
        };
    }

    match equiripple_lowpass(
        passband_end,
        stopband_start,
        delta_p,
        delta_s,
        constants::MAX_EQUIRIPPLE_TAPS,
    ) {
        Ok(h) => Ok(h),
        Err(reason) => {
            let num_taps = constants::WINDOWED_TAPS_CAP.min(
                constants::WINDOWED_TAPS_BASE
                    + (constants::WINDOWED_TAPS_PER_OCTAVE * (fir_r as f64).log2()).round()
                        as usize,
            );
            tracing::debug!(
                fir_r,
                num_taps,
                %reason,
                "final FIR equiripple design failed, using window"
            );
            Ok(windowed_sinc_lowpass(
                num_taps,
                cutoff,
                constants::FIR_STOPBAND_ATTENUATION_DB,
            ))
        }
    }
}

/// Equiripple low-pass with a fixed tap count. Band edges in cycles/sample.
fn equiripple_lowpass_fixed(
    num_taps: usize,
    passband_end: f64,
    stopband_start: f64,
    stopband_weight: f64,
) -> Result<Vec<f64>, String> {
    let bands = [
        BandSetting::new(0.0, passband_end, constant(1.0)).unwrap(),
        BandSetting::with_weight(
            stopband_start,
            0.5,
            constant(0.0),
            constant(stopband_weight),
        )
        .unwrap(),
    ];
    let parameters = pm_parameters(num_taps, &bands).unwrap();
    let design = pm_remez(&parameters).map_err(|e| e.to_string())?;
    Ok(design.impulse_response)
}

/// Equiripple low-pass meeting given ripple requirements.
///
/// Starts from the Ichige tap-count estimate and adjusts: if the estimate
/// overshoots, taps are removed until the requirement is no longer met; if
/// it undershoots, taps are added until it is met or `max_taps` is reached.
fn equiripple_lowpass(
    passband_end: f64,
    stopband_start: f64,
    delta_p: f64,
    delta_s: f64,
    max_taps: usize,
) -> Result<Vec<f64>, String> {
    let bands = [
        BandSetting::new(0.0, passband_end, constant(1.0)).unwrap(),
        BandSetting::with_weight(
            stopband_start,
            0.5,
            constant(0.0),
            constant(delta_p / delta_s),
        )
        .unwrap(),
    ];

    let mut num_taps = ichige(
        passband_end,
        stopband_start - passband_end,
        delta_p,
        delta_s,
    );
    if num_taps > max_taps {
        return Err(format!(
            "estimated {num_taps} taps, more than the {max_taps} supported"
        ));
    }

    let parameters = pm_parameters(num_taps, &bands).unwrap();
    let mut design = pm_remez(&parameters).map_err(|e| e.to_string())?;

    if design.weighted_error < delta_p {
        // Initial estimate was an overestimate. Back off the number of taps
        // until we no longer meet the requirement.
        loop {
            num_taps -= 1;
            let parameters = pm_parameters(num_taps, &bands).unwrap();
            let new_design = pm_remez(&parameters).map_err(|e| e.to_string())?;
            if new_design.weighted_error > delta_p {
                return Ok(design.impulse_response);
            }
            design = new_design;
        }
    } else {
        // Initial estimate was an underestimate. Increase the number of taps
        // until the requirement is met.
        while design.weighted_error > delta_p {
            num_taps += 1;
            if num_taps > max_taps {
                return Err(format!("did not converge within {max_taps} taps"));
            }
            let parameters = pm_parameters(num_taps, &bands).unwrap();
            design = pm_remez(&parameters).map_err(|e| e.to_string())?;
        }
        Ok(design.impulse_response)
    }
}

/// Kaiser-windowed sinc low-pass with unity DC gain.
///
/// `cutoff` is in cycles/sample. The Kaiser shape parameter is derived from
/// the requested stopband attenuation.
fn windowed_sinc_lowpass(num_taps: usize, cutoff: f64, attenuation_db: f64) -> Vec<f64> {
    let beta = if attenuation_db > 50.0 {
        0.1102 * (attenuation_db - 8.7)
    } else if attenuation_db >= 21.0 {
        0.5842 * (attenuation_db - 21.0).powf(0.4) + 0.07886 * (attenuation_db - 21.0)
    } else {
        0.0
    };
    let m = (num_taps - 1) as f64;
    let i0_beta = bessel_i0(beta);

    let mut taps: Vec<f64> = (0..num_taps)
        .map(|i| {
            let n = i as f64 - m / 2.0;
            let sinc = if n.abs() < 1e-12 {
                2.0 * cutoff
            } else {
                (2.0 * PI * cutoff * n).sin() / (PI * n)
            };
            let x = 2.0 * i as f64 / m - 1.0;
            sinc * bessel_i0(beta * (1.0 - x * x).sqrt()) / i0_beta
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    for tap in &mut taps {
        *tap /= sum;
    }
    taps
}

/// Modified Bessel function of the first kind, order zero.
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..50 {
        term *= (x / (2.0 * k as f64)).powi(2);
        sum += term;
        if term < 1e-20 {
            break;
        }
    }
    sum
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::planner::plan_decimation;

    #[test]
    fn chain_for_4096() {
        let plan = plan_decimation(4096).unwrap();
        let chain = build_chain(&plan, constants::DEFAULT_OUTPUT_FRACTION).unwrap();
        assert_eq!(chain.stages.len(), 6); // CIC + 4 HB + FIR
        assert!(matches!(chain.stages[0], FilterStage::Cic(_)));
        assert!(matches!(chain.stages[5], FilterStage::FinalFir(_)));
        // halfband orders 10, 14, 18, 22 and the 27-tap shaping FIR
        assert_eq!(chain.total_taps, 11 + 15 + 19 + 23 + 27);
        assert_eq!(chain.description, "CIC(256)→HB11→HB15→HB19→HB23→FIR27");
    }

    #[test]
    fn deep_chains_reuse_last_halfband() {
        let plan = plan_decimation(16384).unwrap();
        let chain = build_chain(&plan, constants::DEFAULT_OUTPUT_FRACTION).unwrap();
        let hb_taps: Vec<usize> = chain
            .stages
            .iter()
            .filter(|s| matches!(s, FilterStage::Halfband(_)))
            .map(FilterStage::taps)
            .collect();
        assert_eq!(hb_taps, vec![11, 15, 19, 23, 23, 23]);
    }

    #[test]
    fn cic_gain_bits() {
        let plan = plan_decimation(4096).unwrap();
        let chain = build_chain(&plan, constants::DEFAULT_OUTPUT_FRACTION).unwrap();
        let FilterStage::Cic(cic) = &chain.stages[0] else {
            panic!("first stage must be CIC");
        };
        assert_eq!(cic.sections, 6);
        assert_eq!(cic.diff_delay, 1);
        assert!((cic.gain_bits - 48.0).abs() < 1e-12); // 6 * log2(256)
    }

    #[test]
    fn oversized_cic_rejected() {
        let plan = plan_decimation(999983).unwrap();
        let err = build_chain(&plan, constants::DEFAULT_OUTPUT_FRACTION).unwrap_err();
        assert!(matches!(err, Error::FilterDesignFailed { .. }));
    }

    #[test]
    fn halfband_structure() {
        let h = design_halfband(10, 0.15).unwrap();
        assert_eq!(h.len(), 11);
        let center = 5;
        assert_eq!(h[center], 0.5);
        for offset in [2isize, 4] {
            assert_eq!(h[(center as isize - offset) as usize], 0.0);
            assert_eq!(h[(center as isize + offset) as usize], 0.0);
        }
        for k in 0..h.len() {
            assert_eq!(h[k], h[h.len() - 1 - k], "asymmetric tap {k}");
        }
        let dc: f64 = h.iter().sum();
        assert!((dc - 1.0).abs() < 1e-9, "DC gain {dc}");
        // side taps carry real weight
        assert!(h[center - 1] > 0.1);
    }

    #[test]
    fn halfband_quantized_center() {
        let plan = plan_decimation(512).unwrap();
        let chain = build_chain(&plan, constants::DEFAULT_OUTPUT_FRACTION).unwrap();
        let FilterStage::Halfband(hb) = &chain.stages[1] else {
            panic!("second stage must be halfband");
        };
        assert_eq!(hb.quantized[hb.quantized.len() / 2], 16384); // 0.5 in Q1.15
        assert_eq!(hb.coefficient_format, constants::COEFFICIENT_FORMAT);
    }

    #[test]
    fn shaping_fir_has_fixed_taps() {
        let h = design_final_fir(1).unwrap();
        assert_eq!(h.len(), constants::SHAPING_FIR_TAPS);
        let dc: f64 = h.iter().sum();
        assert!((dc - 1.0).abs() < 0.02, "DC gain {dc}");
    }

    #[test]
    fn huge_fir_factor_falls_back_to_window() {
        // 1025 is far beyond what the equiripple search supports
        let h = design_final_fir(1025).unwrap();
        assert_eq!(h.len(), constants::WINDOWED_TAPS_CAP);
        let dc: f64 = h.iter().sum();
        assert!((dc - 1.0).abs() < 1e-9);
    }

    #[test]
    fn moderate_fir_factor_converges_equiripple() {
        let h = design_final_fir(3).unwrap();
        assert!(h.len() > constants::SHAPING_FIR_TAPS);
        assert!(h.len() <= constants::MAX_EQUIRIPPLE_TAPS);
        let dc: f64 = h.iter().sum();
        assert!((dc - 1.0).abs() < 0.02, "DC gain {dc}");
    }

    #[test]
    fn windowed_design_unity_dc() {
        let h = windowed_sinc_lowpass(51, 0.1, 80.0);
        let dc: f64 = h.iter().sum();
        assert!((dc - 1.0).abs() < 1e-12);
        for k in 0..h.len() {
            assert!((h[k] - h[h.len() - 1 - k]).abs() < 1e-15);
        }
    }
}
