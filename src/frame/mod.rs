//! # Frame Module
//!
//! Wire frame decoding and the latest-frame store.
//!
//! A frame on the wire is a comma-separated text line with one token per
//! configured band: `v1,v2,...,vN[,extra...]`. There is no length prefix and
//! no checksum, so a frame is only rejected for having too few tokens.

pub mod decoder;
pub mod store;

pub use decoder::{DecodeError, Frame, FrameDecoder, Reading, TokenPolicy};
pub use store::TelemetryStore;
