//! sigdec designs, applies and evaluates multistage decimation filter chains
//! for 1-bit delta-sigma ADC pipelines. Given a modulator sampling rate and a
//! set of desired output rates, it factors each decimation ratio into a
//! CIC/halfband/FIR cascade, simulates the cascade against a modulator
//! bitstream under fixed-point arithmetic, and measures the resulting
//! resolution (SNDR, ENOB, SFDR, noise floor) from the decimated spectrum.

#![warn(missing_docs)]

pub mod app;
pub mod args;
pub mod bitstream;
pub mod chain;
pub mod error;
pub mod fixedpoint;
pub mod modulator;
pub mod planner;
pub mod process;
pub mod spectrum;
pub mod sweep;
