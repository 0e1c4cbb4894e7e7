//! The ROI-driven requantizer.
//!
//! The scaling curve and per-entry rounding/clamping formula implement the
//! standard IJG quality-to-scale-factor convention that libjpeg and mozjpeg
//! both use.

use crate::error::JpegError;
use crate::misc::{ANNEX_K_CHROMA, ANNEX_K_LUMA};
use crate::scan::{DecodedBlock, DecodedScan};
use crate::segments::JpegImage;

/// A caller-supplied region-of-interest map: one quality value in `1..=100`
/// per full-resolution pixel. Conflicts within an 8x8 block's pixel
/// footprint are resolved by taking the maximum.
pub struct RoiMap {
    width:  usize,
    height: usize,
    values: Vec<u8>
}

impl RoiMap {
    pub fn new(width: usize, height: usize, values: Vec<u8>) -> Result<RoiMap, JpegError> {
        if values.len() != width * height {
            return Err(JpegError::MalformedStatic("ROI map length does not match width*height"));
        }
        if values.iter().any(|&q| q == 0 || q > 100) {
            return Err(JpegError::MalformedStatic("ROI map quality values must be in 1..=100"));
        }
        Ok(RoiMap { width, height, values })
    }

    #[must_use]
    pub fn quality_at(&self, x: usize, y: usize) -> u8 {
        let x = x.min(self.width.saturating_sub(1));
        let y = y.min(self.height.saturating_sub(1));
        self.values[y * self.width + x]
    }

    /// Maximum quality value over a half-open pixel rectangle, clamped to
    /// the map's own bounds (a block's footprint may run past the image
    /// edge when the image isn't a multiple of the MCU size).
    fn max_quality_in(&self, x0: usize, y0: usize, x1: usize, y1: usize) -> u8 {
        let x1 = x1.min(self.width).max(x0);
        let y1 = y1.min(self.height).max(y0);
        let mut best = 1u8;
        for y in y0..y1 {
            for x in x0..x1 {
                best = best.max(self.values[y * self.width + x]);
            }
        }
        best
    }
}

/// IJG's standard quality-to-scale-factor curve.
fn scale_factor(quality: u8) -> u32 {
    let quality = u32::from(quality.clamp(1, 100));
    if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    }
}

/// Scale a base table to `quality` per entry, clamped to the legal DQT
/// range `1..=255` (this requantizer only ever emits 8-bit precision
/// tables).
fn scaled_table(base: &[u16; 64], quality: u8) -> [u16; 64] {
    let scale = scale_factor(quality);
    let mut out = [0u16; 64];
    for (o, &b) in out.iter_mut().zip(base.iter()) {
        let v = (u32::from(b) * scale + 50) / 100;
        *o = v.clamp(1, 255) as u16;
    }
    out
}

fn default_base_table(component_index: usize) -> [u16; 64] {
    if component_index == 0 {
        ANNEX_K_LUMA
    } else {
        ANNEX_K_CHROMA
    }
}

/// Round-to-nearest-integer division, ties away from zero.
fn div_round(numerator: i32, denominator: i32) -> i32 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}

/// Re-express one coefficient level, measured in `base_step` units, as a
/// level in `target_step` units, saturating at the Huffman size category's
/// magnitude limit rather than overflowing it.
fn rescale(level: i32, base_step: u16, target_step: u16, limit: i32) -> i32 {
    if level == 0 {
        return 0;
    }
    let real = level * i32::from(base_step);
    div_round(real, i32::from(target_step)).clamp(-limit, limit)
}

fn requantize_block(block: &mut DecodedBlock, base: &[u16; 64], target: &[u16; 64]) {
    block.dc = rescale(i32::from(block.dc), base[0], target[0], 2047) as i16;
    for k in 0..63 {
        block.ac[k] = rescale(i32::from(block.ac[k]), base[k + 1], target[k + 1], 1023) as i16;
    }
}

/// Requantize every block of `scan` against `roi`, in place.
///
/// The declared quantization tables in `image` are left untouched -- only
/// block coefficient levels are rewritten, each re-expressed as though its
/// own block had been quantized by a quality-scaled table derived from the
/// component's base table, then re-measured in that shared base table's
/// units. A decoder using the unmodified declared table therefore
/// reconstructs high-ROI blocks close to their original values and
/// low-ROI blocks coarsened in proportion to how far their effective
/// quality sits below the base table's own quality. See DESIGN.md for why
/// this crate keeps one declared table per destination instead of trying to
/// vary it per block, which baseline JPEG does not allow.
pub fn apply_roi(image: &JpegImage, scan: &mut DecodedScan, roi: &RoiMap) -> Result<(), JpegError> {
    for (comp_idx, comp) in scan.components.iter_mut().enumerate() {
        if scan.h_max % usize::from(comp.h) != 0 || scan.v_max % usize::from(comp.v) != 0 {
            return Err(JpegError::Unsupported(
                "sampling factors that do not evenly divide Hmax/Vmax"
            ));
        }
        let scale_x = scan.h_max / usize::from(comp.h);
        let scale_y = scan.v_max / usize::from(comp.v);

        let base = image.quant_tables[comp.quant_sel as usize]
            .map(|t| t.values)
            .unwrap_or_else(|| default_base_table(comp_idx));

        for row in 0..comp.blocks_high {
            for col in 0..comp.blocks_wide {
                let x0 = col * 8 * scale_x;
                let y0 = row * 8 * scale_y;
                let quality = roi.max_quality_in(x0, y0, x0 + 8 * scale_x, y0 + 8 * scale_y);
                let target = scaled_table(&base, quality);
                requantize_block(comp.block_mut(row, col), &base, &target);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::{FrameComponent, FrameHeader, QuantTable, ScanComponent, ScanHeader};

    fn flat_roi(width: usize, height: usize, quality: u8) -> RoiMap {
        RoiMap::new(width, height, vec![quality; width * height]).unwrap()
    }

    fn single_component_scan(dc: i16, ac_value: i16) -> (JpegImage, DecodedScan) {
        let mut image = JpegImage::new();
        image.quant_tables[0] = Some(QuantTable { destination: 0, values: ANNEX_K_LUMA });
        image.frame = Some(FrameHeader {
            precision: 8,
            width: 8,
            height: 8,
            components: vec![FrameComponent { id: 1, horizontal_sample: 1, vertical_sample: 1, quant_table_selector: 0 }]
        });
        image.scan = Some(ScanHeader {
            components: vec![ScanComponent { selector: 1, dc_table: 0, ac_table: 0 }],
            spectral_start: 0,
            spectral_end: 63,
            approximation: 0
        });

        let mut block = DecodedBlock::default();
        block.dc = dc;
        block.ac[0] = ac_value;
        let comp = crate::scan::DecodedComponent {
            id: 1,
            h: 1,
            v: 1,
            quant_sel: 0,
            blocks_wide: 1,
            blocks_high: 1,
            blocks: vec![block]
        };
        let scan = DecodedScan { h_max: 1, v_max: 1, mcu_x: 1, mcu_y: 1, components: vec![comp] };
        (image, scan)
    }

    #[test]
    fn low_quality_coarsens_coefficients_more_than_high_quality() {
        let (image, mut scan_low) = single_component_scan(40, 20);
        let (_, mut scan_high) = single_component_scan(40, 20);

        apply_roi(&image, &mut scan_low, &flat_roi(8, 8, 5)).unwrap();
        apply_roi(&image, &mut scan_high, &flat_roi(8, 8, 95)).unwrap();

        let low_ac = scan_low.components[0].block(0, 0).ac[0].unsigned_abs();
        let high_ac = scan_high.components[0].block(0, 0).ac[0].unsigned_abs();
        assert!(low_ac <= high_ac, "low quality ({low_ac}) should coarsen at least as much as high quality ({high_ac})");
    }

    #[test]
    fn zero_coefficients_stay_zero() {
        let (image, mut scan) = single_component_scan(0, 0);
        apply_roi(&image, &mut scan, &flat_roi(8, 8, 50)).unwrap();
        let block = scan.components[0].block(0, 0);
        assert_eq!(block.dc, 0);
        assert!(block.ac.iter().all(|&v| v == 0));
    }

    #[test]
    fn rescale_saturates_instead_of_overflowing() {
        assert_eq!(rescale(2047, 1, 1, 2047), 2047);
        assert_eq!(rescale(2047, 255, 1, 2047), 2047);
    }
}
