//! JPEG marker byte constants and the `Marker` enum.
//!
//! A marker is the second byte of a `0xFF xx` pair. `0xFF 0x00` and runs of
//! `0xFF` fill bytes never reach this type; those are filtered out by the
//! segment parser and the entropy-coded-segment collector respectively.

pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOS: u8 = 0xDA;
pub const DHT: u8 = 0xC4;
pub const DQT: u8 = 0xDB;
pub const DRI: u8 = 0xDD;
pub const DAC: u8 = 0xCC;
pub const DNL: u8 = 0xDC;
pub const COM: u8 = 0xFE;

/// SOF0/SOF1 are baseline/extended-sequential Huffman, both handled the same
/// way by this crate. SOF2..SOF15 (minus the two reserved/DNL values) are all
/// progressive, lossless or arithmetic variants, none of which this crate
/// decodes.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[allow(clippy::upper_case_acronyms)]
pub enum Marker {
    SOF(u8),
    DHT,
    DQT,
    DRI,
    SOS,
    RST(u8),
    APP(u8),
    COM,
    DAC,
    DNL,
    EOI
}

impl Marker {
    /// Map a marker byte (the byte following `0xFF`) to a `Marker`.
    ///
    /// Returns `None` for bytes that are not markers at all (`0x00`, `0xFF`
    /// fill bytes, reserved `0x01`/`0xD0`..`0xD7` are handled by the caller
    /// since RST markers are a parsed-but-rejected `Unsupported` case here).
    #[must_use]
    pub fn from_u8(byte: u8) -> Option<Marker> {
        match byte {
            0xC0..=0xCF if byte != 0xC4 && byte != 0xC8 && byte != 0xCC => {
                Some(Marker::SOF(byte - 0xC0))
            }
            0xC4 => Some(Marker::DHT),
            0xCC => Some(Marker::DAC),
            0xD0..=0xD7 => Some(Marker::RST(byte - 0xD0)),
            0xD8 => None, // SOI is handled specially by the top-level parser
            0xD9 => Some(Marker::EOI),
            0xDA => Some(Marker::SOS),
            0xDB => Some(Marker::DQT),
            0xDC => Some(Marker::DNL),
            0xDD => Some(Marker::DRI),
            0xE0..=0xEF => Some(Marker::APP(byte - 0xE0)),
            0xFE => Some(Marker::COM),
            _ => None
        }
    }
}
