//! Dataset fetching, tabular loading and plot-oriented reduction for the
//! browser API usage study.
//!
//! The centrepiece is [`sample::sample`], a boundary-point downsampler that
//! keeps the shape of step curves while dropping flat interior points.

pub mod cdf;
pub mod color;
pub mod config;
pub mod data;
pub mod sample;
pub mod stats;
