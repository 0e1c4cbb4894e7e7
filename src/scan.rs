//! The scan (de)coder.
//!
//! Walks the MCU/block grid described by the frame header, driving the bit
//! reader/writer through the Huffman engine one symbol at a time, in the
//! same component-major, row-major traversal order a baseline decoder's MCU
//! loop uses. Unlike a full decoder this stops at the decoded coefficient
//! and never reaches pixel space -- no IDCT, no colour conversion.

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::error::{BlockCoordinate, JpegError};
use crate::options::{DcPredictorMode, DecoderOptions};
use crate::segments::{EntropyCodedSegment, JpegImage, ScanComponent};

const ZRL: u8 = 0xF0;
const EOB: u8 = 0x00;

/// One decoded 8x8 block: a DC value and 63 AC values in zigzag order, as
/// transmitted. Positions past EOB are left at zero.
#[derive(Copy, Clone, Default, Debug)]
pub struct DecodedBlock {
    pub dc: i16,
    pub ac: [i16; 63]
}

/// One component's dense block grid, sized to the full MCU grid (including
/// any right/bottom edge blocks the image dimensions don't fully cover --
/// those are coded and decoded like any other block, never cropped).
pub struct DecodedComponent {
    pub id:          u8,
    pub h:           u8,
    pub v:           u8,
    pub quant_sel:   u8,
    pub blocks_wide: usize,
    pub blocks_high: usize,
    pub(crate) blocks: Vec<DecodedBlock>
}

impl DecodedComponent {
    #[must_use]
    pub fn block(&self, row: usize, col: usize) -> &DecodedBlock {
        &self.blocks[row * self.blocks_wide + col]
    }

    pub fn block_mut(&mut self, row: usize, col: usize) -> &mut DecodedBlock {
        &mut self.blocks[row * self.blocks_wide + col]
    }

    #[must_use]
    pub fn blocks(&self) -> &[DecodedBlock] {
        &self.blocks
    }
}

/// A fully decoded scan: every component's block grid, plus the Hmax/Vmax
/// and MCU-grid dimensions that produced it.
pub struct DecodedScan {
    pub h_max:      usize,
    pub v_max:      usize,
    pub mcu_x:      usize,
    pub mcu_y:      usize,
    pub components: Vec<DecodedComponent>
}

fn find_scan_component(scan_components: &[ScanComponent], id: u8) -> Result<ScanComponent, JpegError> {
    scan_components
        .iter()
        .find(|sc| sc.selector == id)
        .copied()
        .ok_or_else(|| JpegError::Malformed(format!("no scan component selects frame component {id}")))
}

/// JPEG's "extend" operation (ITU-T.81 section F.2.2.1): map an `size`-bit
/// unsigned magnitude to its signed coefficient.
fn extend(x: u32, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }
    let half = 1i32 << (size - 1);
    let x = x as i32;
    if x < half {
        x + 1 - (1i32 << size)
    } else {
        x
    }
}

/// Minimum number of bits to represent `value`'s magnitude (0 for zero).
fn size_category(value: i32) -> u8 {
    let mut v = value.unsigned_abs();
    let mut size = 0u8;
    while v > 0 {
        size += 1;
        v >>= 1;
    }
    size
}

/// Inverse of `extend`: the `size`-bit coded magnitude for `value`.
fn coded_magnitude(value: i32, size: u8) -> u32 {
    if value >= 0 {
        value as u32
    } else {
        (value + (1i32 << size) - 1) as u32
    }
}

/// Decode the image's single scan into a dense per-component block grid.
pub fn decode_scan(image: &JpegImage, options: &DecoderOptions) -> Result<DecodedScan, JpegError> {
    let frame = image
        .frame
        .as_ref()
        .ok_or(JpegError::MalformedStatic("no frame header to decode against"))?;
    let scan = image
        .scan
        .as_ref()
        .ok_or(JpegError::MalformedStatic("no scan header to decode against"))?;
    let ecs = image
        .ecs
        .as_ref()
        .ok_or(JpegError::MalformedStatic("no entropy-coded segment to decode"))?;

    let geometry = frame.geometry(options.block_count_formula)?;

    let mut components = Vec::with_capacity(geometry.components.len());
    let mut scan_components = Vec::with_capacity(geometry.components.len());
    for comp in &geometry.components {
        let sc = find_scan_component(&scan.components, comp.id)?;
        // The MCU grid always covers `mcu_x*h` by `mcu_y*v` blocks per
        // component, regardless of which block-count formula is configured --
        // that count only matters for the property check in tests, not for
        // how many blocks the bitstream actually carries.
        let blocks_wide = geometry.mcu_x * comp.h as usize;
        let blocks_high = geometry.mcu_y * comp.v as usize;
        components.push(DecodedComponent {
            id: comp.id,
            h: comp.h,
            v: comp.v,
            quant_sel: comp.quant_sel,
            blocks_wide,
            blocks_high,
            blocks: vec![DecodedBlock::default(); blocks_wide * blocks_high]
        });
        scan_components.push(sc);
    }

    let mut reader = BitReader::new(&ecs.0);
    let mut dc_pred = vec![0i32; components.len()];

    for mcu_y in 0..geometry.mcu_y {
        for mcu_x in 0..geometry.mcu_x {
            let mcu_index = mcu_y * geometry.mcu_x + mcu_x;
            for (comp_idx, comp) in components.iter_mut().enumerate() {
                let sc = scan_components[comp_idx];
                let dc_table = image.dc_tables[sc.dc_table as usize].as_ref().ok_or_else(|| {
                    JpegError::HuffmanDecode {
                        reason: format!("no DC huffman table at destination {}", sc.dc_table),
                        at: BlockCoordinate { mcu_index, component: comp_idx, block_in_mcu: 0 }
                    }
                })?;
                let ac_table = image.ac_tables[sc.ac_table as usize].as_ref().ok_or_else(|| {
                    JpegError::HuffmanDecode {
                        reason: format!("no AC huffman table at destination {}", sc.ac_table),
                        at: BlockCoordinate { mcu_index, component: comp_idx, block_in_mcu: 0 }
                    }
                })?;

                let h = comp.h as usize;
                let blocks_per_mcu = h * comp.v as usize;
                for block_in_mcu in 0..blocks_per_mcu {
                    let bx = block_in_mcu % h;
                    let by = block_in_mcu / h;
                    let col = mcu_x * h + bx;
                    let row = mcu_y * comp.v as usize + by;
                    let at = BlockCoordinate { mcu_index, component: comp_idx, block_in_mcu };

                    let dc_size = dc_table.decode_symbol(&mut reader, at)?;
                    if dc_size > 11 {
                        return Err(JpegError::HuffmanDecode {
                            reason: format!("DC size category {dc_size} exceeds the 11-bit limit"),
                            at
                        });
                    }
                    let diff = if dc_size == 0 { 0 } else { extend(reader.read_bits(dc_size), dc_size) };

                    let dc_value = match options.dc_predictor {
                        DcPredictorMode::Standard => {
                            let value = dc_pred[comp_idx] + diff;
                            dc_pred[comp_idx] = value;
                            value
                        }
                        DcPredictorMode::Raw => diff
                    };

                    let block = comp.block_mut(row, col);
                    block.dc = dc_value as i16;

                    let mut ac_index = 0usize;
                    while ac_index < 63 {
                        let rs = ac_table.decode_symbol(&mut reader, at)?;
                        if rs == EOB {
                            break;
                        }
                        if rs == ZRL {
                            ac_index += 16;
                            continue;
                        }
                        let run = (rs >> 4) as usize;
                        let size = rs & 0x0F;
                        if size > 10 {
                            return Err(JpegError::HuffmanDecode {
                                reason: format!("AC size category {size} exceeds the 10-bit limit"),
                                at
                            });
                        }
                        ac_index += run;
                        if ac_index >= 63 {
                            return Err(JpegError::HuffmanDecode {
                                reason: format!("AC run of {run} zeros overruns the block at index {ac_index}"),
                                at
                            });
                        }
                        let value = extend(reader.read_bits(size), size);
                        block.ac[ac_index] = value as i16;
                        ac_index += 1;
                    }
                }
            }
        }
    }

    if reader.is_exhausted() {
        return Err(JpegError::UnexpectedEof { context: "decoding the entropy-coded segment" });
    }

    Ok(DecodedScan {
        h_max: geometry.h_max,
        v_max: geometry.v_max,
        mcu_x: geometry.mcu_x,
        mcu_y: geometry.mcu_y,
        components
    })
}

/// Re-encode a decoded scan back into a fresh entropy-coded segment, using
/// the Huffman tables recorded in `image` (the caller is expected to have
/// kept them, or substituted new ones before calling this).
pub fn encode_scan(
    image: &JpegImage, scan_data: &DecodedScan, options: &DecoderOptions
) -> Result<EntropyCodedSegment, JpegError> {
    let scan = image
        .scan
        .as_ref()
        .ok_or(JpegError::MalformedStatic("no scan header to encode against"))?;

    let mut writer = BitWriter::new();
    let mut dc_pred = vec![0i32; scan_data.components.len()];

    for mcu_y in 0..scan_data.mcu_y {
        for mcu_x in 0..scan_data.mcu_x {
            for (comp_idx, comp) in scan_data.components.iter().enumerate() {
                let sc = find_scan_component(&scan.components, comp.id)?;
                let dc_table = image.dc_tables[sc.dc_table as usize].as_ref().ok_or_else(|| {
                    JpegError::HuffmanEncode(format!("no DC huffman table at destination {}", sc.dc_table))
                })?;
                let ac_table = image.ac_tables[sc.ac_table as usize].as_ref().ok_or_else(|| {
                    JpegError::HuffmanEncode(format!("no AC huffman table at destination {}", sc.ac_table))
                })?;

                let h = comp.h as usize;
                let blocks_per_mcu = h * comp.v as usize;
                for block_in_mcu in 0..blocks_per_mcu {
                    let bx = block_in_mcu % h;
                    let by = block_in_mcu / h;
                    let col = mcu_x * h + bx;
                    let row = mcu_y * comp.v as usize + by;
                    let block = comp.block(row, col);

                    let diff = match options.dc_predictor {
                        DcPredictorMode::Standard => {
                            let diff = i32::from(block.dc) - dc_pred[comp_idx];
                            dc_pred[comp_idx] = i32::from(block.dc);
                            diff
                        }
                        DcPredictorMode::Raw => i32::from(block.dc)
                    };

                    let dc_size = size_category(diff);
                    if dc_size > 11 {
                        return Err(JpegError::HuffmanEncode(format!(
                            "DC coefficient magnitude needs {dc_size} bits, exceeding the 11-bit limit"
                        )));
                    }
                    dc_table.encode_symbol(&mut writer, dc_size)?;
                    if dc_size > 0 {
                        writer.write_bits(coded_magnitude(diff, dc_size), dc_size);
                    }

                    let mut pos = 0usize;
                    loop {
                        if pos >= 63 {
                            break;
                        }
                        match (pos..63).find(|&i| block.ac[i] != 0) {
                            Some(idx) => {
                                let mut zeros = idx - pos;
                                while zeros >= 16 {
                                    ac_table.encode_symbol(&mut writer, ZRL)?;
                                    zeros -= 16;
                                }
                                let value = i32::from(block.ac[idx]);
                                let size = size_category(value);
                                if size == 0 || size > 10 {
                                    return Err(JpegError::HuffmanEncode(format!(
                                        "AC coefficient magnitude needs {size} bits, outside 1..=10"
                                    )));
                                }
                                let symbol = ((zeros as u8) << 4) | size;
                                ac_table.encode_symbol(&mut writer, symbol)?;
                                writer.write_bits(coded_magnitude(value, size), size);
                                pos = idx + 1;
                            }
                            None => {
                                ac_table.encode_symbol(&mut writer, EOB)?;
                                break;
                            }
                        }
                    }
                }
            }
        }
    }

    Ok(EntropyCodedSegment(writer.finalize()))
}
