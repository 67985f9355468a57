//! Built-in test bitstream source.
//!
//! A minimal second-order delta-sigma modulator used by the CLI when no
//! capture file is given, so the tool runs end-to-end out of the box. The
//! decimation core never depends on this module; it treats every bitstream
//! as an opaque upstream signal.

use std::f64::consts::PI;

/// Second-order delta-sigma modulator with error feedback.
///
/// Two cascaded integrators and a 1-bit quantizer, noise transfer function
/// `(1 - z^-1)^2`. Inputs should stay within roughly ±0.8 of full scale to
/// keep the loop stable.
#[derive(Debug, Clone, Default)]
pub struct TestModulator {
    s1: f64,
    s2: f64,
}

impl TestModulator {
    /// Creates a modulator with zeroed integrators.
    pub fn new() -> TestModulator {
        TestModulator::default()
    }

    /// Modulates input samples into a ±1 bitstream.
    pub fn modulate(&mut self, input: &[f64]) -> Vec<f64> {
        input.iter().map(|&x| self.process_one(x)).collect()
    }

    fn process_one(&mut self, x: f64) -> f64 {
        self.s1 += x;
        self.s2 += self.s1;
        let y = if self.s2 >= 0.0 { 1.0 } else { -1.0 };
        self.s1 -= y;
        self.s2 -= y;
        y
    }
}

/// Generates a modulated sine tone bitstream.
///
/// `frequency` and `sample_rate` are in Hz; `amplitude` is relative to full
/// scale. Returns `len` samples of ±1.
pub fn tone_bitstream(len: usize, frequency: f64, amplitude: f64, sample_rate: f64) -> Vec<f64> {
    let tone: Vec<f64> = (0..len)
        .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / sample_rate).sin())
        .collect();
    TestModulator::new().modulate(&tone)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn output_is_bipolar() {
        let bits = tone_bitstream(4096, 1000.0, 0.5, 1.0e6);
        assert_eq!(bits.len(), 4096);
        assert!(bits.iter().all(|&b| b == 1.0 || b == -1.0));
    }

    #[test]
    fn tracks_dc_on_average() {
        let mut modulator = TestModulator::new();
        let bits = modulator.modulate(&vec![0.25; 65536]);
        let mean = bits.iter().sum::<f64>() / bits.len() as f64;
        assert!((mean - 0.25).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn zero_input_is_dc_balanced() {
        let mut modulator = TestModulator::new();
        let bits = modulator.modulate(&vec![0.0; 65536]);
        let mean = bits.iter().sum::<f64>() / bits.len() as f64;
        assert!(mean.abs() < 0.01, "mean {mean}");
    }
}
