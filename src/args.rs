//! sigdec CLI arguments.
//!
//! This module contains the definition of the CLI arguments for the sigdec
//! application.

use clap::Parser;
use std::path::PathBuf;

/// sigdec CLI arguments.
#[derive(Parser, Debug, Clone, PartialEq)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Modulator sampling rate in samples per second
    #[clap(long, default_value_t = 6.144e6)]
    pub modulator_rate: f64,

    /// Target output rates in samples per second, comma separated
    #[clap(
        long,
        value_delimiter = ',',
        default_value = "24000,48000,96000,192000"
    )]
    pub target_rates: Vec<f64>,

    /// Bitstream capture file (text, whitespace-separated samples). The
    /// built-in test modulator is used when this is not given
    #[clap(long)]
    pub input: Option<PathBuf>,

    /// Test tone frequency in Hz for the built-in source
    #[clap(long, default_value_t = 1000.0)]
    pub tone_frequency: f64,

    /// Test tone amplitude relative to full scale
    #[clap(long, default_value_t = 0.5)]
    pub tone_amplitude: f64,

    /// Bitstream length in samples for the built-in source
    #[clap(long, default_value_t = 1 << 22)]
    pub num_samples: usize,

    /// Fraction length of the FIR stage outputs
    #[clap(long, default_value_t = 18)]
    pub output_fraction: u32,

    /// Write the JSON report to this file instead of stdout
    #[clap(long)]
    pub output: Option<PathBuf>,

    /// Include per-stage quantized coefficients and formats in the report
    #[clap(long)]
    pub dump_chains: bool,
}
