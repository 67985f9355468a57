//! Bitstream preparation.
//!
//! The modulator bitstream arrives as an arbitrary numeric sequence, in
//! either unipolar `[0, 1]` or quasi-bipolar `[-1, 1]` encoding, possibly
//! containing invalid values. This module normalizes it into a bipolar
//! sequence centered on ±1 and pads it for a given decimation factor.

use crate::error::Error;

/// Normalizes a raw bitstream into a bipolar sequence.
///
/// Non-finite samples are dropped. If all remaining values lie in `[0, 1]`,
/// the sequence is treated as unipolar and mapped to bipolar via `v*2 - 1`.
/// Otherwise, if the maximum absolute value exceeds 1.5, the sequence is
/// rescaled by that maximum. Anything else passes through unchanged.
///
/// Returns [`Error::EmptyBitstream`] if nothing remains after filtering.
pub fn normalize(raw: &[f64]) -> Result<Vec<f64>, Error> {
    let mut samples: Vec<f64> = raw.iter().copied().filter(|v| v.is_finite()).collect();
    if samples.is_empty() {
        return Err(Error::EmptyBitstream);
    }
    let dropped = raw.len() - samples.len();
    if dropped > 0 {
        tracing::warn!(dropped, "dropped non-finite bitstream samples");
    }

    let unipolar = samples.iter().all(|&v| (0.0..=1.0).contains(&v));
    if unipolar {
        for v in &mut samples {
            *v = *v * 2.0 - 1.0;
        }
        return Ok(samples);
    }

    let max_abs = samples.iter().fold(0.0f64, |m, &v| m.max(v.abs()));
    if max_abs > 1.5 {
        tracing::debug!(max_abs, "rescaling out-of-range bitstream");
        for v in &mut samples {
            *v /= max_abs;
        }
    }
    Ok(samples)
}

/// Pads a prepared bitstream with trailing zeros to a multiple of `factor`.
///
/// Padding happens after normalization, so the zeros are true bipolar
/// midscale. The trailing pad only affects a tail that the analyzer never
/// relies on, since analysis always uses a leading window after transient
/// removal.
pub fn pad_to_multiple(samples: &[f64], factor: usize) -> Vec<f64> {
    let mut padded = samples.to_vec();
    let rem = padded.len() % factor;
    if rem != 0 {
        padded.resize(padded.len() + factor - rem, 0.0);
    }
    padded
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unipolar_maps_to_bipolar() {
        let out = normalize(&[0.0, 1.0, 0.5, 1.0]).unwrap();
        assert_eq!(out, vec![-1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn bipolar_passes_through() {
        let input = vec![-1.0, 1.0, -1.0, 0.25];
        let out = normalize(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn large_values_rescale_by_max() {
        let out = normalize(&[-4.0, 2.0, 4.0]).unwrap();
        assert_eq!(out, vec![-1.0, 0.5, 1.0]);
    }

    #[test]
    fn slightly_out_of_range_passes_through() {
        // max abs 1.2 is below the 1.5 rescale threshold
        let input = vec![-1.2, 1.1, 0.0];
        let out = normalize(&input).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn non_finite_samples_dropped() {
        let out = normalize(&[f64::NAN, -1.0, f64::INFINITY, 1.0]).unwrap();
        assert_eq!(out, vec![-1.0, 1.0]);
    }

    #[test]
    fn empty_after_filtering_fails() {
        assert!(matches!(normalize(&[]), Err(Error::EmptyBitstream)));
        assert!(matches!(
            normalize(&[f64::NAN, f64::NEG_INFINITY]),
            Err(Error::EmptyBitstream)
        ));
    }

    #[test]
    fn padding_reaches_exact_multiple() {
        let samples = vec![1.0; 10];
        let padded = pad_to_multiple(&samples, 8);
        assert_eq!(padded.len(), 16);
        assert!(padded[10..].iter().all(|&v| v == 0.0));
        // already a multiple: unchanged
        assert_eq!(pad_to_multiple(&samples, 5).len(), 10);
    }
}
