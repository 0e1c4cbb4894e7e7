//! A baseline JPEG coefficient-level transcoder.
//!
//! Parses a restricted subset of ISO/IEC 10918-1 (single-scan, baseline
//! sequential DCT, one or three components, no restart markers), decodes
//! its entropy-coded bitstream into per-component coefficient blocks,
//! lets a caller requantize those blocks against a region-of-interest map,
//! and re-encodes and re-serializes the result into a syntactically valid
//! JPEG. It never performs the inverse DCT or colour-space conversion --
//! everything stays at the coefficient level.
//!
//! ```no_run
//! use jpeg_roi_transcode::{JpegImage, RoiMap, DecoderOptions};
//!
//! # fn run(bytes: &[u8], roi_values: Vec<u8>) -> Result<Vec<u8>, jpeg_roi_transcode::JpegError> {
//! let image = JpegImage::parse(bytes, &DecoderOptions::default())?;
//! let mut scan = image.decode(&DecoderOptions::default())?;
//! let frame = image.frame().unwrap();
//! let roi = RoiMap::new(frame.width as usize, frame.height as usize, roi_values)?;
//! image.apply_roi(&mut scan, &roi)?;
//! image.encode(&scan, &DecoderOptions::default())
//! # }
//! ```

#![warn(clippy::correctness, clippy::perf, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc, clippy::similar_names)]
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

mod bitreader;
mod bitwriter;
mod cursor;
mod error;
mod headers;
mod huffman;
mod marker;
mod misc;
mod options;
mod roi;
mod scan;
mod segments;
mod serialize;

pub use crate::error::{BlockCoordinate, JpegError};
pub use crate::options::{BlockCountFormula, DcPredictorMode, DecoderOptions};
pub use crate::roi::RoiMap;
pub use crate::scan::{DecodedBlock, DecodedComponent, DecodedScan};
pub use crate::segments::{
    ComponentGeometry, FrameComponent, FrameHeader, Geometry, QuantTable, ScanComponent, ScanHeader
};

use crate::segments::JpegImage as RawJpegImage;

/// A fully parsed baseline JPEG: segment tables, frame/scan headers, and the
/// unstuffed entropy-coded segment. The library surface callers actually
/// use; `segments::JpegImage` stays the internal data model.
pub struct JpegImage {
    inner: RawJpegImage
}

impl JpegImage {
    /// Parse a complete baseline JPEG byte stream.
    pub fn parse(data: &[u8], options: &DecoderOptions) -> Result<JpegImage, JpegError> {
        let inner = headers::parse(data, options)?;
        Ok(JpegImage { inner })
    }

    #[must_use]
    pub fn frame(&self) -> Option<&FrameHeader> {
        self.inner.frame.as_ref()
    }

    #[must_use]
    pub fn scan_header(&self) -> Option<&ScanHeader> {
        self.inner.scan.as_ref()
    }

    /// Decode the single scan into a dense per-component coefficient grid.
    pub fn decode(&self, options: &DecoderOptions) -> Result<DecodedScan, JpegError> {
        scan::decode_scan(&self.inner, options)
    }

    /// Requantize every block of `scan_data` in place against `roi` (see
    /// `roi.rs`). The declared quantization tables are left untouched; only
    /// coefficient levels move.
    pub fn apply_roi(&self, scan_data: &mut DecodedScan, roi: &RoiMap) -> Result<(), JpegError> {
        roi::apply_roi(&self.inner, scan_data, roi)
    }

    /// Re-encode a (possibly requantized) decoded scan and serialize it back
    /// into a complete JPEG byte stream, reusing this image's tables and
    /// headers.
    pub fn encode(&self, scan_data: &DecodedScan, options: &DecoderOptions) -> Result<Vec<u8>, JpegError> {
        let ecs = scan::encode_scan(&self.inner, scan_data, options)?;
        serialize::serialize(&self.inner, &ecs)
    }

    /// An explicit deep copy: every owned buffer is duplicated, never
    /// shared, matching the ownership design of the underlying record.
    #[must_use]
    pub fn deep_clone(&self) -> JpegImage {
        JpegImage { inner: self.inner.deep_clone() }
    }
}
