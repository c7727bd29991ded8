//! # Spectrum Module
//!
//! Spectral band definitions and the wavelength to color mapping.
//!
//! This module handles:
//! - Band configuration (numeric wavelengths and tags such as "clear")
//! - Mapping a band to the RGBA color of the light it measures
//! - Building the static per-band color table for the chart

pub mod band;
pub mod color;

pub use band::{Band, BandSet, BandSpec};
pub use color::{color_for, wavelength_to_rgba, ColorTable, Rgba};
