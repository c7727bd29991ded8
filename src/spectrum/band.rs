//! # Spectral Bands
//!
//! Band definitions as configured for the spectrometer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One spectral channel of the sensor
///
/// Configured either as a numeric center wavelength in nanometers or as a
/// free-form tag for channels without one (the AS7341 "clear" channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Band {
    /// Center wavelength in nm
    Wavelength(f64),
    /// Non-numeric channel name
    Tag(String),
}

impl From<f64> for Band {
    fn from(nm: f64) -> Self {
        Band::Wavelength(nm)
    }
}

impl From<&str> for Band {
    fn from(tag: &str) -> Self {
        Band::Tag(tag.to_string())
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Wavelength(nm) => write!(f, "{}", nm),
            Band::Tag(tag) => f.write_str(tag),
        }
    }
}

/// A band together with its position in the wire frame
#[derive(Debug, Clone, PartialEq)]
pub struct BandSpec {
    pub index: usize,
    pub band: Band,
}

/// The ordered, immutable set of configured bands
///
/// Indices are assigned from the configuration order, so they are always
/// contiguous (`0..len`) and unique.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSet {
    specs: Vec<BandSpec>,
}

impl BandSet {
    /// Build a band set from bands in wire order
    pub fn new<I>(bands: I) -> Self
    where
        I: IntoIterator<Item = Band>,
    {
        let specs = bands
            .into_iter()
            .enumerate()
            .map(|(index, band)| BandSpec { index, band })
            .collect();
        Self { specs }
    }

    /// Number of bands (the expected token count of a frame)
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BandSpec> {
        self.specs.iter()
    }

    /// Chart labels, one per band
    pub fn labels(&self) -> Vec<String> {
        self.specs.iter().map(|spec| spec.band.to_string()).collect()
    }
}

impl<'a> IntoIterator for &'a BandSet {
    type Item = &'a BandSpec;
    type IntoIter = std::slice::Iter<'a, BandSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
