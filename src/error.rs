//! Error kinds produced by parsing, decoding, requantizing and encoding.
use std::fmt::{Debug, Display, Formatter};

/// Coordinates of the MCU/block a decode failure happened in, for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct BlockCoordinate {
    pub mcu_index: usize,
    pub component: usize,
    pub block_in_mcu: usize,
}

impl Display for BlockCoordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mcu {} component {} block {}",
            self.mcu_index, self.component, self.block_in_mcu
        )
    }
}

/// All errors this crate can return.
///
/// Grouped by the kinds a caller needs to branch on: `Io`, `Malformed`,
/// `Unsupported`, `HuffmanDecodeError` and `HuffmanEncodeError`.
#[non_exhaustive]
pub enum JpegError {
    /// Ran out of bytes before a read completed.
    UnexpectedEof { context: &'static str },
    /// Bitstream/segment structure violates baseline syntax.
    Malformed(String),
    /// Same as `Malformed` but for messages known at compile time.
    MalformedStatic(&'static str),
    /// A syntactically valid but out-of-core-scope feature was encountered.
    Unsupported(&'static str),
    /// No Huffman prefix matched within 16 bits, or a destination table was
    /// never defined.
    HuffmanDecode { reason: String, at: BlockCoordinate },
    /// A symbol had no assigned code, or a coefficient exceeded its category.
    HuffmanEncode(String)
}

impl Debug for JpegError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof { context } => {
                write!(f, "unexpected end of input while {context}")
            }
            Self::Malformed(msg) => write!(f, "malformed jpeg: {msg}"),
            Self::MalformedStatic(msg) => write!(f, "malformed jpeg: {msg}"),
            Self::Unsupported(feature) => write!(f, "unsupported: {feature}"),
            Self::HuffmanDecode { reason, at } => {
                write!(f, "huffman decode error at {at}: {reason}")
            }
            Self::HuffmanEncode(msg) => write!(f, "huffman encode error: {msg}")
        }
    }
}

impl Display for JpegError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl std::error::Error for JpegError {}
