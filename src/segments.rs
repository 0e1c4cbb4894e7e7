//! The segment parser's data model: the typed segment records that make up
//! an in-memory JPEG image, plus the geometry derived from the frame header.
//!
//! `JpegImage` is a closed, tagged-variant-friendly shape: it owns each
//! segment kind as a plain field rather than a polymorphic `Segment` trait
//! object.

use crate::error::JpegError;
use crate::huffman::HuffmanTable;
use crate::options::BlockCountFormula;

pub const MAX_COMPONENTS: usize = 4;

/// Any segment this crate does not need to interpret, retained verbatim so
/// it can be written back out unchanged (APPn, COM, DRI, ...).
#[derive(Clone)]
pub struct GenericSegment {
    pub marker:  u8,
    pub payload: Vec<u8>
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FrameComponent {
    pub id:                    u8,
    pub horizontal_sample:     u8,
    pub vertical_sample:       u8,
    pub quant_table_selector:  u8
}

#[derive(Clone, Debug)]
pub struct FrameHeader {
    pub precision:  u8,
    pub width:      u16,
    pub height:     u16,
    pub components: Vec<FrameComponent>
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ScanComponent {
    pub selector:  u8,
    pub dc_table:  u8,
    pub ac_table:  u8
}

#[derive(Clone, Debug)]
pub struct ScanHeader {
    pub components:     Vec<ScanComponent>,
    pub spectral_start:  u8,
    pub spectral_end:    u8,
    pub approximation:   u8
}

/// A quantization table as transmitted: 64 entries in zigzag order.
#[derive(Copy, Clone)]
pub struct QuantTable {
    pub destination: u8,
    pub values:       [u16; 64]
}

/// The unstuffed entropy-coded bitstream between SOS and the next marker.
#[derive(Clone, Default)]
pub struct EntropyCodedSegment(pub Vec<u8>);

/// A fully parsed baseline JPEG. Owns every buffer exclusively; cloning it
/// is an explicit `deep_clone`, never an implicit shared reference.
#[derive(Default)]
pub struct JpegImage {
    pub misc_segments: Vec<GenericSegment>,
    pub dc_tables:     [Option<HuffmanTable>; MAX_COMPONENTS],
    pub ac_tables:     [Option<HuffmanTable>; MAX_COMPONENTS],
    pub quant_tables:  [Option<QuantTable>; MAX_COMPONENTS],
    pub frame:         Option<FrameHeader>,
    pub scan:          Option<ScanHeader>,
    pub ecs:           Option<EntropyCodedSegment>
}

impl JpegImage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An explicit deep copy: every owned buffer is duplicated rather than
    /// shared, so mutating the clone (e.g. via the requantizer's re-encode
    /// path) never aliases the original.
    #[must_use]
    pub fn deep_clone(&self) -> JpegImage {
        JpegImage {
            misc_segments: self.misc_segments.clone(),
            dc_tables: self.dc_tables.clone(),
            ac_tables: self.ac_tables.clone(),
            quant_tables: self.quant_tables,
            frame: self.frame.clone(),
            scan: self.scan.clone(),
            ecs: self.ecs.clone()
        }
    }
}

/// Per-component dimensions derived from the frame header's sampling
/// factors.
#[derive(Copy, Clone, Debug)]
pub struct ComponentGeometry {
    pub id:           u8,
    pub h:            u8,
    pub v:            u8,
    pub quant_sel:    u8,
    pub blocks_wide:  usize,
    pub blocks_high:  usize
}

/// MCU/block grid geometry for a whole scan, computed once and reused by
/// both the decoder and the encoder (component E).
#[derive(Clone, Debug)]
pub struct Geometry {
    pub h_max:      usize,
    pub v_max:      usize,
    pub mcu_x:      usize,
    pub mcu_y:      usize,
    pub components: Vec<ComponentGeometry>
}

impl Geometry {
    #[must_use]
    pub fn mcu_count(&self) -> usize {
        self.mcu_x * self.mcu_y
    }
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

impl FrameHeader {
    /// Compute MCU/block-grid geometry. `formula` selects between the
    /// standard block-count formula and an alternate one seen in at least
    /// one reference decoder; they agree except when an axis is not a
    /// multiple of `8*Hmax`/`8*Vmax`.
    pub fn geometry(&self, formula: BlockCountFormula) -> Result<Geometry, JpegError> {
        if self.components.is_empty() {
            return Err(JpegError::MalformedStatic(
                "frame header has no components"
            ));
        }
        let h_max = self.components.iter().map(|c| c.horizontal_sample).max().unwrap() as usize;
        let v_max = self.components.iter().map(|c| c.vertical_sample).max().unwrap() as usize;

        let w = self.width as usize;
        let h = self.height as usize;
        let mcu_x = div_ceil(w, 8 * h_max);
        let mcu_y = div_ceil(h, 8 * v_max);

        let components = self
            .components
            .iter()
            .map(|c| {
                let hi = c.horizontal_sample as usize;
                let vi = c.vertical_sample as usize;
                let (blocks_wide, blocks_high) = match formula {
                    BlockCountFormula::Standard => (mcu_x * hi, mcu_y * vi),
                    BlockCountFormula::Reference => (
                        div_ceil(div_ceil(w * hi, h_max), 8),
                        div_ceil(div_ceil(h * vi, v_max), 8)
                    )
                };
                ComponentGeometry {
                    id: c.id,
                    h: c.horizontal_sample,
                    v: c.vertical_sample,
                    quant_sel: c.quant_table_selector,
                    blocks_wide,
                    blocks_high
                }
            })
            .collect();

        Ok(Geometry { h_max, v_max, mcu_x, mcu_y, components })
    }
}
