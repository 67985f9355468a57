//! sigdec application.
//!
//! This module contains a top-level structure [`App`] that represents the
//! whole sigdec run: it acquires the bitstream, drives the sweep, and writes
//! the JSON report consumed by downstream reporting and export tooling.

use crate::args::Args;
use crate::modulator::tone_bitstream;
use crate::sweep::{run_sweep, SweepResult};
use anyhow::{Context, Result};
use std::path::Path;

/// sigdec application.
///
/// Owns the parsed arguments and runs the whole batch job: one bitstream
/// acquisition, one sweep over the requested target rates, one report.
#[derive(Debug, Clone)]
pub struct App {
    args: Args,
}

impl App {
    /// Creates a new application, validating the configuration.
    pub fn new(args: &Args) -> Result<App> {
        if !args.modulator_rate.is_finite() || args.modulator_rate <= 0.0 {
            anyhow::bail!("modulator rate must be positive");
        }
        if args.target_rates.is_empty() {
            anyhow::bail!("at least one target rate is required");
        }
        for &rate in &args.target_rates {
            if !rate.is_finite() || rate <= 0.0 {
                anyhow::bail!("target rate {rate} must be positive");
            }
            if rate >= args.modulator_rate {
                tracing::warn!(rate, "target rate is not below the modulator rate");
            }
        }
        Ok(App { args: args.clone() })
    }

    /// Runs the application.
    #[tracing::instrument(name = "App::run", level = "debug", skip_all)]
    pub fn run(self) -> Result<()> {
        let raw = match &self.args.input {
            Some(path) => {
                tracing::info!(path = %path.display(), "reading bitstream capture");
                read_bitstream(path)?
            }
            None => {
                tracing::info!(
                    frequency = self.args.tone_frequency,
                    amplitude = self.args.tone_amplitude,
                    num_samples = self.args.num_samples,
                    "synthesizing test bitstream"
                );
                tone_bitstream(
                    self.args.num_samples,
                    self.args.tone_frequency,
                    self.args.tone_amplitude,
                    self.args.modulator_rate,
                )
            }
        };

        let result = run_sweep(
            &raw,
            self.args.modulator_rate,
            &self.args.target_rates,
            self.args.output_fraction,
        )?;
        let report = build_report(self.args.modulator_rate, &result, self.args.dump_chains);
        let json = serde_json::to_string_pretty(&report)?;
        match &self.args.output {
            Some(path) => {
                std::fs::write(path, json)
                    .with_context(|| format!("writing report to {}", path.display()))?;
                tracing::info!(path = %path.display(), "report written");
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

/// Reads a whitespace-separated text capture file.
fn read_bitstream(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading bitstream from {}", path.display()))?;
    text.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .with_context(|| format!("invalid sample {token:?}"))
        })
        .collect()
}

/// Assembles the JSON report from a sweep result.
pub fn build_report(
    modulator_rate: f64,
    result: &SweepResult,
    dump_chains: bool,
) -> sigdec_json::SweepReport {
    let peak = result.peak_enob();
    let efficient = result.most_efficient();
    sigdec_json::SweepReport {
        modulator_rate,
        points: result
            .points
            .iter()
            .map(|point| sigdec_json::SweepPoint {
                target_rate: point.target_rate,
                osr: point.osr as u64,
                cic_r: point.plan.cic_r as u64,
                hb_count: point.plan.hb_count as u32,
                fir_r: point.plan.fir_r as u64,
                total_decimation: point.plan.total_decimation as u64,
                description: point.plan.description.clone(),
                total_taps: point.chain.total_taps as u64,
                sndr_db: point.metrics.sndr_db,
                enob: point.metrics.enob,
                sfdr_db: point.metrics.sfdr_db,
                noise_floor_db: point.metrics.noise_floor_db,
                chain: dump_chains.then(|| (&point.chain).into()),
            })
            .collect(),
        skipped: result
            .skipped
            .iter()
            .map(|s| sigdec_json::SkippedRate {
                target_rate: s.target_rate,
                reason: s.reason.clone(),
            })
            .collect(),
        summary: sigdec_json::SweepSummary {
            peak_enob_rate: peak.target_rate,
            peak_enob: peak.metrics.enob,
            most_efficient_rate: efficient.target_rate,
            enob_per_tap: efficient.metrics.enob / efficient.chain.total_taps as f64,
        },
    }
}
