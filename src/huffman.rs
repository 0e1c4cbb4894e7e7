//! Canonical Huffman table construction, a streaming decoder that never
//! materializes a decode tree, and a reverse-lookup encoder.
//!
//! Tables are built in `headers.rs`'s `parse_huffman` from exactly the
//! class/destination/counts/values fields `build` takes here, and stored in
//! the same `[Option<HuffmanTable>; MAX_COMPONENTS]` shape `JpegImage`'s
//! `dc_tables`/`ac_tables` use. The canonical assignment follows ITU-T.81
//! figures C.1/C.2 directly, and decodes by the incremental `maxcode`/
//! `offset` walk those figures describe, so no decode tree is ever
//! materialized -- a construction whose correctness is directly checkable:
//! a complete table decodes and re-encodes every one of its own symbols.

use crate::bitreader::BitReader;
use crate::bitwriter::BitWriter;
use crate::error::{BlockCoordinate, JpegError};

/// A canonical Huffman table built from the standard 16-length-count DHT
/// form, usable for both decoding and encoding.
#[derive(Clone)]
pub struct HuffmanTable {
    /// `bits[l]` (`l` in 1..=16) is the count of codes of that length.
    bits:   [u8; 17],
    /// Symbols in order of increasing code length, concatenated.
    values: Vec<u8>,
    /// Largest code of length `l`, or -1 if no code has that length.
    maxcode: [i32; 17],
    /// `offset[l]` such that `values[code + offset[l]]` is the symbol for
    /// `code` once it is known to be `l` bits long.
    offset: [i32; 17],
    /// Reverse lookup for encoding: `encode[symbol] = Some((code, length))`.
    encode: [Option<(u16, u8)>; 256]
}

impl HuffmanTable {
    /// Build a canonical table from the 16 length counts and the
    /// concatenated value list, validating that the value list's length
    /// matches the declared counts.
    pub fn build(counts: [u8; 16], values: Vec<u8>) -> Result<HuffmanTable, JpegError> {
        let total: usize = counts.iter().map(|&c| c as usize).sum();
        if total > 256 {
            return Err(JpegError::MalformedStatic(
                "huffman table has more than 256 codes"
            ));
        }
        if values.len() != total {
            return Err(JpegError::MalformedStatic(
                "huffman value list length does not match code-length counts"
            ));
        }

        let mut bits = [0u8; 17];
        bits[1..=16].copy_from_slice(&counts);

        // Figure C.1/C.2 (ITU-T.81): assign canonical codes in order of
        // increasing length, left-shifting the running code before moving to
        // the next length.
        let mut huff_code = vec![0u32; total];
        let mut code: u32 = 0;
        let mut p = 0usize;
        for l in 1..=16usize {
            for _ in 0..bits[l] {
                huff_code[p] = code;
                p += 1;
                code += 1;
            }
            code <<= 1;
        }

        let mut maxcode = [-1i32; 17];
        let mut offset = [0i32; 17];
        let mut p = 0usize;
        for l in 1..=16usize {
            if bits[l] == 0 {
                continue;
            }
            offset[l] = p as i32 - huff_code[p] as i32;
            p += bits[l] as usize;
            maxcode[l] = huff_code[p - 1] as i32;

            // "No code of all-1s at its length" -- the standard Huffman
            // validity check from ITU-T.81 figure C.2, also present in the
            // `make_derived_table` routine of a sibling example decoder.
            if huff_code[p - 1] >= (1u32 << l) {
                return Err(JpegError::MalformedStatic(
                    "huffman code of all 1-bits at its own length, invalid table"
                ));
            }
        }

        let mut encode: [Option<(u16, u8)>; 256] = [None; 256];
        for (i, &value) in values.iter().enumerate() {
            let length = (1..=16u8)
                .find(|&l| {
                    let lo = offset[l as usize];
                    let count = bits[l as usize] as i32;
                    (i as i32) >= lo && (i as i32) < lo + count
                })
                .expect("every value index has a length bucket by construction");
            encode[value as usize] = Some((huff_code[i] as u16, length));
        }

        Ok(HuffmanTable { bits, values, maxcode, offset, encode })
    }

    #[must_use]
    pub fn code_counts(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out.copy_from_slice(&self.bits[1..=16]);
        out
    }

    #[must_use]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    /// Decode one symbol by incremental prefix tracking: shift in one bit at
    /// a time, and as soon as the accumulated code is within the valid range
    /// for its current length, the symbol is resolved. Bails after 16 bits.
    pub fn decode_symbol(
        &self, reader: &mut BitReader, at: BlockCoordinate
    ) -> Result<u8, JpegError> {
        let mut code: i32 = 0;
        for length in 1..=16usize {
            code = (code << 1) | reader.read_bits(1) as i32;
            if self.maxcode[length] != -1 && code <= self.maxcode[length] {
                let index = code + self.offset[length];
                if index >= 0 && (index as usize) < self.values.len() {
                    return Ok(self.values[index as usize]);
                }
            }
        }
        Err(JpegError::HuffmanDecode {
            reason: format!("no huffman prefix matched within 16 bits (code=0x{code:X})"),
            at
        })
    }

    /// Encode one symbol: two table lookups (code, length) and a bit-write.
    pub fn encode_symbol(&self, writer: &mut BitWriter, symbol: u8) -> Result<(), JpegError> {
        match self.encode[symbol as usize] {
            Some((code, length)) => {
                writer.write_bits(u32::from(code), length);
                Ok(())
            }
            None => Err(JpegError::HuffmanEncode(format!(
                "symbol 0x{symbol:X} has no assigned huffman code in this table"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HuffmanTable;
    use crate::bitreader::BitReader;
    use crate::bitwriter::BitWriter;
    use crate::error::BlockCoordinate;

    /// A tiny table: two 2-bit codes and one 1-bit code, a standard complete
    /// canonical assignment (1 code of length 1, two codes of length 2).
    fn tiny_table() -> HuffmanTable {
        let mut counts = [0u8; 16];
        counts[0] = 1; // length 1: one code
        counts[1] = 2; // length 2: two codes
        HuffmanTable::build(counts, vec![0xAA, 0xBB, 0xCC]).unwrap()
    }

    #[test]
    fn decode_round_trips_every_symbol() {
        let table = tiny_table();
        for &symbol in table.values() {
            let mut w = BitWriter::new();
            table.encode_symbol(&mut w, symbol).unwrap();
            let bytes = w.finalize();
            let mut r = BitReader::new(&bytes);
            let decoded = table
                .decode_symbol(&mut r, BlockCoordinate::default())
                .unwrap();
            assert_eq!(decoded, symbol);
        }
    }

    #[test]
    fn rejects_incomplete_value_list() {
        let mut counts = [0u8; 16];
        counts[0] = 1;
        assert!(HuffmanTable::build(counts, vec![]).is_err());
    }

    #[test]
    fn encode_unknown_symbol_fails() {
        let table = tiny_table();
        let mut w = BitWriter::new();
        assert!(table.encode_symbol(&mut w, 0xFF).is_err());
    }
}
