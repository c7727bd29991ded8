//! # Spectro Viewer Library
//!
//! Live bar chart for a spectrometer publishing over MQTT.
//!
//! This library provides the ingestion and rendering pipeline: the MQTT
//! connection lifecycle, comma-separated frame decoding, the wavelength to
//! color mapping used for the bars, and a render loop that redraws on a fixed
//! timer independent of message arrival.

pub mod config;
pub mod error;
pub mod frame;
pub mod logging;
pub mod mqtt;
pub mod render;
pub mod spectrum;
pub mod status;
pub mod viewer;
