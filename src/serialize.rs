//! The serializer: turns a [`JpegImage`] plus a freshly encoded
//! [`EntropyCodedSegment`] back into a byte stream a standard JPEG decoder
//! can read.
//!
//! A decoder and requantizer that could never emit bytes wouldn't be usable
//! on its own; this module closes the loop.

use crate::error::JpegError;
use crate::huffman::HuffmanTable;
use crate::marker;
use crate::segments::{EntropyCodedSegment, JpegImage, QuantTable};

fn push_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_marker(out: &mut Vec<u8>, marker: u8) {
    out.push(0xFF);
    out.push(marker);
}

fn write_generic_segments(out: &mut Vec<u8>, image: &JpegImage) {
    for seg in &image.misc_segments {
        push_marker(out, seg.marker);
        push_u16_be(out, (seg.payload.len() + 2) as u16);
        out.extend_from_slice(&seg.payload);
    }
}

fn write_quant_table(out: &mut Vec<u8>, table: &QuantTable) {
    let needs_16_bit = table.values.iter().any(|&v| v > 0xFF);
    push_marker(out, marker::DQT);
    let len = if needs_16_bit { 2 + 1 + 128 } else { 2 + 1 + 64 };
    push_u16_be(out, len as u16);
    let precision = u8::from(needs_16_bit);
    out.push((precision << 4) | table.destination);
    if needs_16_bit {
        for &v in &table.values {
            push_u16_be(out, v);
        }
    } else {
        for &v in &table.values {
            out.push(v as u8);
        }
    }
}

fn write_huffman_table(out: &mut Vec<u8>, class: u8, destination: u8, table: &HuffmanTable) {
    push_marker(out, marker::DHT);
    let counts = table.code_counts();
    let values = table.values();
    let len = 2 + 1 + 16 + values.len();
    push_u16_be(out, len as u16);
    out.push((class << 4) | destination);
    out.extend_from_slice(&counts);
    out.extend_from_slice(values);
}

fn write_frame_header(out: &mut Vec<u8>, image: &JpegImage) -> Result<(), JpegError> {
    let frame = image
        .frame
        .as_ref()
        .ok_or(JpegError::MalformedStatic("cannot serialize an image with no frame header"))?;

    push_marker(out, 0xC0); // SOF0, baseline sequential DCT -- the only kind this crate parses
    let len = 8 + 3 * frame.components.len();
    push_u16_be(out, len as u16);
    out.push(frame.precision);
    push_u16_be(out, frame.height);
    push_u16_be(out, frame.width);
    out.push(frame.components.len() as u8);
    for c in &frame.components {
        out.push(c.id);
        out.push((c.horizontal_sample << 4) | c.vertical_sample);
        out.push(c.quant_table_selector);
    }
    Ok(())
}

fn write_scan_header(out: &mut Vec<u8>, image: &JpegImage) -> Result<(), JpegError> {
    let scan = image
        .scan
        .as_ref()
        .ok_or(JpegError::MalformedStatic("cannot serialize an image with no scan header"))?;
    push_marker(out, marker::SOS);
    let len = 6 + 2 * scan.components.len();
    push_u16_be(out, len as u16);
    out.push(scan.components.len() as u8);
    for c in &scan.components {
        out.push(c.selector);
        out.push((c.dc_table << 4) | c.ac_table);
    }
    out.push(scan.spectral_start);
    out.push(scan.spectral_end);
    out.push(scan.approximation);
    Ok(())
}

/// Insert a `0x00` after every `0xFF` byte of an unstuffed entropy-coded
/// payload -- the inverse of the ECS collector in `headers.rs`.
fn stuff(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        out.push(b);
        if b == 0xFF {
            out.push(0x00);
        }
    }
    out
}

/// Serialize `image`, substituting `ecs` for its entropy-coded segment.
/// Misc segments are written back in original order, every retained
/// quantization/Huffman table destination gets its own DQT/DHT segment, and
/// the ECS is re-stuffed before being written.
pub fn serialize(image: &JpegImage, ecs: &EntropyCodedSegment) -> Result<Vec<u8>, JpegError> {
    let mut out = Vec::new();
    push_marker(&mut out, marker::SOI);

    write_generic_segments(&mut out, image);

    for table in image.quant_tables.iter().flatten() {
        write_quant_table(&mut out, table);
    }
    for (destination, table) in image.dc_tables.iter().enumerate() {
        if let Some(table) = table {
            write_huffman_table(&mut out, 0, destination as u8, table);
        }
    }
    for (destination, table) in image.ac_tables.iter().enumerate() {
        if let Some(table) = table {
            write_huffman_table(&mut out, 1, destination as u8, table);
        }
    }

    write_frame_header(&mut out, image)?;
    write_scan_header(&mut out, image)?;
    out.extend_from_slice(&stuff(&ecs.0));

    push_marker(&mut out, marker::EOI);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuffing_escapes_every_ff_byte() {
        let data = [0x00, 0xFF, 0x01, 0xFF, 0xFF];
        let stuffed = stuff(&data);
        assert_eq!(stuffed, [0x00, 0xFF, 0x00, 0x01, 0xFF, 0x00, 0xFF, 0x00]);
    }
}
