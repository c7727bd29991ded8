//! # Wavelength to Color Mapping
//!
//! Converts a spectral band into the color of the light it measures.
//!
//! Visible wavelengths (380-780nm) follow a piecewise linear ramp through six
//! ranges (violet, blue, cyan, green, yellow, red). Intensity falls off at both
//! edges of the visible spectrum and is carried in the alpha channel.
//! Near-infrared bands are drawn deep red and tagged bands (e.g. "clear") black.

use serde::{Serialize, Serializer};
use std::fmt;

use super::band::{Band, BandSet};

/// Lower edge of the visible spectrum in nm
pub const VISIBLE_MIN_NM: f64 = 380.0;

/// Upper edge of the visible spectrum in nm
pub const VISIBLE_MAX_NM: f64 = 780.0;

/// Wavelengths above this are treated as near-infrared
pub const NEAR_IR_THRESHOLD_NM: f64 = 900.0;

/// Alpha ramps up from 0 at 380nm to 1 at this wavelength
const FADE_IN_END_NM: f64 = 420.0;

/// Alpha ramps down from 1 at this wavelength to 0 at 780nm
const FADE_OUT_START_NM: f64 = 700.0;

/// Color with channels as fractions in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub alpha: f64,
}

impl Rgba {
    /// Color for tagged (non-wavelength) bands: opaque black
    pub const NEUTRAL: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);

    /// Color for near-infrared bands: opaque `#770000`
    pub const NEAR_INFRARED: Rgba = Rgba::new(119.0 / 255.0, 0.0, 0.0, 1.0);

    /// Fully transparent black, used outside the visible spectrum
    pub const INVISIBLE: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64, alpha: f64) -> Self {
        Self { r, g, b, alpha }
    }

    pub fn red_percent(&self) -> f64 {
        self.r * 100.0
    }

    pub fn green_percent(&self) -> f64 {
        self.g * 100.0
    }

    pub fn blue_percent(&self) -> f64 {
        self.b * 100.0
    }

    /// Composite this color over an opaque 8-bit background
    ///
    /// Renderers without an alpha channel (terminals) use this to show the
    /// intensity falloff at the spectrum edges.
    pub fn blend_over(&self, background: (u8, u8, u8)) -> (u8, u8, u8) {
        let alpha = self.alpha.clamp(0.0, 1.0);
        let mix = |fg: f64, bg: u8| to_u8(fg * alpha + (bg as f64 / 255.0) * (1.0 - alpha));
        (
            mix(self.r, background.0),
            mix(self.g, background.1),
            mix(self.b, background.2),
        )
    }
}

fn to_u8(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Round to a fixed number of decimals for display, dropping trailing zeros
fn display_number(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let rounded = (value * scale).round() / scale;
    // Avoid printing "-0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

impl fmt::Display for Rgba {
    /// CSS syntax, e.g. `rgba(100%, 33.3%, 0%, 0.5)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba({}%, {}%, {}%, {})",
            display_number(self.red_percent(), 1),
            display_number(self.green_percent(), 1),
            display_number(self.blue_percent(), 1),
            display_number(self.alpha, 3),
        )
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Color for a configured band
///
/// # Arguments
///
/// * `band` - Numeric wavelength or tag
///
/// # Returns
///
/// * `Rgba::NEUTRAL` for tags
/// * `Rgba::NEAR_INFRARED` above 900nm
/// * [`wavelength_to_rgba`] otherwise
///
/// # Examples
///
/// ```
/// use spectro_viewer::spectrum::{color_for, Band, Rgba};
///
/// assert_eq!(color_for(&Band::from("clear")), Rgba::NEUTRAL);
/// assert_eq!(color_for(&Band::from(910.0)), Rgba::NEAR_INFRARED);
/// ```
pub fn color_for(band: &Band) -> Rgba {
    match band {
        Band::Tag(_) => Rgba::NEUTRAL,
        Band::Wavelength(nm) if *nm > NEAR_IR_THRESHOLD_NM => Rgba::NEAR_INFRARED,
        Band::Wavelength(nm) => wavelength_to_rgba(*nm),
    }
}

/// Piecewise visible-spectrum color for a wavelength in nm
///
/// Outside 380-780nm every channel, alpha included, is 0.
pub fn wavelength_to_rgba(wl: f64) -> Rgba {
    if !wl.is_finite() {
        return Rgba::INVISIBLE;
    }

    let (r, g, b) = if (380.0..440.0).contains(&wl) {
        // violet to indigo
        (-(wl - 440.0) / (440.0 - 380.0), 0.0, 1.0)
    } else if (440.0..490.0).contains(&wl) {
        // indigo to blue
        (0.0, (wl - 440.0) / (490.0 - 440.0), 1.0)
    } else if (490.0..510.0).contains(&wl) {
        // blue to green
        (0.0, 1.0, -(wl - 510.0) / (510.0 - 490.0))
    } else if (510.0..580.0).contains(&wl) {
        // green to yellow
        ((wl - 510.0) / (580.0 - 510.0), 1.0, 0.0)
    } else if (580.0..645.0).contains(&wl) {
        // yellow to orange
        (1.0, -(wl - 645.0) / (645.0 - 580.0), 0.0)
    } else if (645.0..=VISIBLE_MAX_NM).contains(&wl) {
        // orange to red
        (1.0, 0.0, 0.0)
    } else {
        (0.0, 0.0, 0.0)
    };

    Rgba::new(r, g, b, edge_alpha(wl))
}

/// Intensity falloff at the edges of the visible spectrum
fn edge_alpha(wl: f64) -> f64 {
    if wl > VISIBLE_MAX_NM || wl < VISIBLE_MIN_NM {
        0.0
    } else if wl > FADE_OUT_START_NM {
        (VISIBLE_MAX_NM - wl) / (VISIBLE_MAX_NM - FADE_OUT_START_NM)
    } else if wl < FADE_IN_END_NM {
        (wl - VISIBLE_MIN_NM) / (FADE_IN_END_NM - VISIBLE_MIN_NM)
    } else {
        1.0
    }
}

/// Static per-band colors, computed once when the chart is built
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ColorTable(Vec<Rgba>);

impl ColorTable {
    pub fn from_bands(bands: &BandSet) -> Self {
        Self(bands.iter().map(|spec| color_for(&spec.band)).collect())
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
