//! The segment parser.
//!
//! Demultiplexes the marker-segment stream into a [`JpegImage`], reading
//! against a plain byte slice (via [`ByteCursor`]) rather than a generic
//! `Read`, since this crate never reads from a file itself.

use log::{info, warn};

use crate::cursor::ByteCursor;
use crate::error::JpegError;
use crate::huffman::HuffmanTable;
use crate::marker::{self, Marker};
use crate::options::DecoderOptions;
use crate::segments::{
    EntropyCodedSegment, FrameComponent, FrameHeader, GenericSegment, JpegImage, QuantTable,
    ScanComponent, ScanHeader, MAX_COMPONENTS
};

/// Parse a complete baseline JPEG byte stream into a [`JpegImage`].
pub fn parse(data: &[u8], options: &DecoderOptions) -> Result<JpegImage, JpegError> {
    let mut c = ByteCursor::new(data);

    if c.read_u16_be()? != 0xFFD8 {
        return Err(JpegError::MalformedStatic(
            "file does not start with the SOI marker (0xFFD8)"
        ));
    }

    let mut image = JpegImage::new();
    let mut seen_sof = false;

    loop {
        let m_byte = next_marker_byte(&mut c, options.strict_mode)?;

        if m_byte == marker::EOI {
            info!("EOI reached, parse complete");
            // a trailing byte after EOI is tolerated with a warning, per
            // section 4.C; we simply stop reading, any remainder is ignored.
            return Ok(image);
        }

        let marker = Marker::from_u8(m_byte).ok_or_else(|| {
            JpegError::Malformed(format!("0xFF{m_byte:02X} is not a recognised marker"))
        })?;

        match marker {
            Marker::SOF(0 | 1) => {
                if seen_sof {
                    return Err(JpegError::MalformedStatic(
                        "multiple frame headers; multi-scan images are not supported"
                    ));
                }
                let frame = parse_sof(&mut c)?;
                if frame.width > options.max_dimension || frame.height > options.max_dimension {
                    return Err(JpegError::Malformed(format!(
                        "image {}x{} exceeds the configured maximum dimension {}",
                        frame.width, frame.height, options.max_dimension
                    )));
                }
                image.frame = Some(frame);
                seen_sof = true;
            }
            Marker::SOF(_) => {
                return Err(JpegError::Unsupported(
                    "non-baseline SOF marker (progressive/lossless/hierarchical)"
                ));
            }
            Marker::DHT => parse_dht(&mut c, &mut image)?,
            Marker::DQT => parse_dqt(&mut c, &mut image)?,
            Marker::SOS => {
                if !seen_sof {
                    return Err(JpegError::MalformedStatic(
                        "SOS marker seen before any SOF"
                    ));
                }
                if image.scan.is_some() {
                    return Err(JpegError::Unsupported(
                        "a second SOS marker; multi-scan images are not supported"
                    ));
                }
                let frame = image.frame.as_ref().unwrap();
                image.scan = Some(parse_sos(&mut c, frame)?);
                image.ecs = Some(collect_ecs(&mut c, options.strict_mode)?);
            }
            Marker::RST(_) => {
                return Err(JpegError::Unsupported(
                    "restart markers (DRI/RSTn); not part of this baseline subset"
                ));
            }
            Marker::DRI => {
                return Err(JpegError::Unsupported(
                    "DRI (restart interval); restart markers are not supported"
                ));
            }
            Marker::DAC => {
                return Err(JpegError::Unsupported(
                    "arithmetic coding conditioning table (DAC)"
                ));
            }
            Marker::APP(_) | Marker::COM | Marker::DNL => {
                image.misc_segments.push(parse_generic_segment(&mut c, m_byte)?);
            }
            Marker::EOI => unreachable!("EOI is handled before classification")
        }
    }
}

/// Find the next marker byte: one or more `0xFF` fill bytes terminated by a
/// non-zero, non-`0xFF` byte. Fill-byte runs are only tolerated here,
/// between segments -- never inside an entropy-coded segment, which has its
/// own state machine below.
fn next_marker_byte(c: &mut ByteCursor, strict: bool) -> Result<u8, JpegError> {
    let mut extra = 0u32;
    let mut b = c.read_u8()?;
    while b != 0xFF {
        extra += 1;
        b = c.read_u8()?;
    }
    if extra > 0 {
        if strict {
            return Err(JpegError::MalformedStatic(
                "[strict-mode]: extra bytes found before a marker"
            ));
        }
        warn!("{extra} extra byte(s) found before a marker");
    }
    let mut m = c.read_u8()?;
    while m == 0xFF {
        m = c.read_u8()?;
    }
    if m == 0x00 {
        return Err(JpegError::MalformedStatic(
            "found a stuffed 0xFF 0x00 outside of an entropy-coded segment"
        ));
    }
    Ok(m)
}

fn parse_generic_segment(c: &mut ByteCursor, marker: u8) -> Result<GenericSegment, JpegError> {
    let ls = c.read_u16_be()?;
    let len = ls.checked_sub(2).ok_or(JpegError::MalformedStatic(
        "segment length Ls is less than 2"
    ))?;
    let payload = c.read_exact(len as usize)?.to_vec();
    Ok(GenericSegment { marker, payload })
}

fn parse_dqt(c: &mut ByteCursor, image: &mut JpegImage) -> Result<(), JpegError> {
    let ls = c.read_u16_be()?;
    let mut remaining = ls
        .checked_sub(2)
        .ok_or(JpegError::MalformedStatic("DQT length Ls is less than 2"))?
        as i32;

    while remaining > 0 {
        let pq_tq = c.read_u8()?;
        let precision = pq_tq >> 4;
        let destination = (pq_tq & 0x0F) as usize;
        if destination >= MAX_COMPONENTS {
            return Err(JpegError::Malformed(format!(
                "quantization table destination {destination} out of range 0..=3"
            )));
        }

        let mut values = [0u16; 64];
        remaining -= 1;
        match precision {
            0 => {
                let bytes = c.read_exact(64)?;
                for (dst, &src) in values.iter_mut().zip(bytes) {
                    *dst = u16::from(src);
                }
                remaining -= 64;
            }
            1 => {
                let bytes = c.read_exact(128)?;
                for (dst, chunk) in values.iter_mut().zip(bytes.chunks_exact(2)) {
                    *dst = u16::from_be_bytes([chunk[0], chunk[1]]);
                }
                remaining -= 128;
            }
            _ => {
                return Err(JpegError::Malformed(format!(
                    "invalid quantization table precision {precision}, expected 0 or 1"
                )));
            }
        }

        image.quant_tables[destination] = Some(QuantTable { destination: destination as u8, values });
    }

    if remaining != 0 {
        return Err(JpegError::MalformedStatic("DQT segment length does not match its contents"));
    }
    Ok(())
}

fn parse_dht(c: &mut ByteCursor, image: &mut JpegImage) -> Result<(), JpegError> {
    let ls = c.read_u16_be()?;
    let mut remaining = ls
        .checked_sub(2)
        .ok_or(JpegError::MalformedStatic("DHT length Ls is less than 2"))?
        as i32;

    while remaining > 16 {
        let tc_th = c.read_u8()?;
        let class_ac = (tc_th >> 4) & 0xF;
        let destination = (tc_th & 0xF) as usize;
        if destination >= MAX_COMPONENTS {
            return Err(JpegError::Malformed(format!(
                "huffman table destination {destination} out of range 0..=3"
            )));
        }
        if class_ac > 1 {
            return Err(JpegError::Malformed(format!(
                "huffman table class {class_ac} must be 0 (DC) or 1 (AC)"
            )));
        }
        remaining -= 1;

        let counts_bytes = c.read_exact(16)?;
        let mut counts = [0u8; 16];
        counts.copy_from_slice(counts_bytes);
        remaining -= 16;

        let total: i32 = counts.iter().map(|&v| i32::from(v)).sum();
        if total > remaining {
            return Err(JpegError::Malformed(format!(
                "huffman table declares {total} symbols but only {remaining} bytes remain"
            )));
        }

        let values = c.read_exact(total as usize)?.to_vec();
        remaining -= total;

        let table = HuffmanTable::build(counts, values)?;
        // "Replace" semantics: a later DHT with the same (class, destination)
        // supersedes an earlier one.
        if class_ac == 0 {
            image.dc_tables[destination] = Some(table);
        } else {
            image.ac_tables[destination] = Some(table);
        }
    }

    if remaining != 0 {
        return Err(JpegError::MalformedStatic("DHT segment length does not match its contents"));
    }
    Ok(())
}

fn parse_sof(c: &mut ByteCursor) -> Result<FrameHeader, JpegError> {
    let length = c.read_u16_be()?;
    let precision = c.read_u8()?;
    if precision != 8 {
        return Err(JpegError::Unsupported("sample precision other than 8 bits"));
    }
    let height = c.read_u16_be()?;
    let width = c.read_u16_be()?;
    if width == 0 || height == 0 {
        return Err(JpegError::MalformedStatic("image width or height is zero"));
    }

    let num_components = c.read_u8()?;
    if num_components != 1 && num_components != 3 {
        return Err(JpegError::Unsupported(
            "component count other than 1 (grayscale) or 3 (YCbCr)"
        ));
    }

    let expected_length = 8 + 3 * u16::from(num_components);
    if length != expected_length {
        return Err(JpegError::Malformed(format!(
            "SOF length {length} does not match {num_components} components (expected {expected_length})"
        )));
    }

    let mut components = Vec::with_capacity(num_components as usize);
    for _ in 0..num_components {
        let id = c.read_u8()?;
        let hv = c.read_u8()?;
        let h = hv >> 4;
        let v = hv & 0x0F;
        let quant_table_selector = c.read_u8()?;
        if !(1..=4).contains(&h) || !(1..=4).contains(&v) {
            return Err(JpegError::Malformed(format!(
                "component {id} has sampling factors ({h},{v}) outside 1..=4"
            )));
        }
        if quant_table_selector as usize >= MAX_COMPONENTS {
            return Err(JpegError::Malformed(format!(
                "component {id} selects quantization table {quant_table_selector}, out of range"
            )));
        }
        components.push(FrameComponent { id, horizontal_sample: h, vertical_sample: v, quant_table_selector });
    }

    Ok(FrameHeader { precision, width, height, components })
}

fn parse_sos(c: &mut ByteCursor, frame: &FrameHeader) -> Result<ScanHeader, JpegError> {
    let ls = c.read_u16_be()?;
    let ns = c.read_u8()?;
    if ls != 6 + 2 * u16::from(ns) {
        return Err(JpegError::MalformedStatic("SOS length does not match its component count"));
    }
    if usize::from(ns) != frame.components.len() {
        return Err(JpegError::Unsupported(
            "scan with a different component count than the frame; this crate only supports a single fully-interleaved scan"
        ));
    }

    let mut components = Vec::with_capacity(ns as usize);
    let mut seen = [false; MAX_COMPONENTS + 1];
    for (expected_index, frame_component) in frame.components.iter().enumerate() {
        let selector = c.read_u8()?;
        if selector != frame_component.id {
            return Err(JpegError::Malformed(format!(
                "scan component order differs from frame component order at index {expected_index}"
            )));
        }
        let table_sel = c.read_u8()?;
        let dc_table = table_sel >> 4;
        let ac_table = table_sel & 0x0F;
        if dc_table as usize >= MAX_COMPONENTS || ac_table as usize >= MAX_COMPONENTS {
            return Err(JpegError::MalformedStatic("huffman table selector out of range 0..=3"));
        }
        if let Some(slot) = seen.get_mut(selector as usize) {
            if *slot {
                return Err(JpegError::Malformed(format!("duplicate scan component id {selector}")));
            }
            *slot = true;
        }
        components.push(ScanComponent { selector, dc_table, ac_table });
    }

    let spectral_start = c.read_u8()?;
    let spectral_end = c.read_u8()?;
    let approx = c.read_u8()?;

    if spectral_start != 0 || spectral_end != 63 || approx != 0 {
        return Err(JpegError::Unsupported(
            "non-baseline spectral selection/successive approximation parameters"
        ));
    }

    Ok(ScanHeader { components, spectral_start, spectral_end, approximation: approx })
}

/// Collect the entropy-coded segment: read bytes until an unstuffed marker
/// is found, collapsing every `0xFF 0x00` to a literal `0xFF`.
fn collect_ecs(c: &mut ByteCursor, strict: bool) -> Result<EntropyCodedSegment, JpegError> {
    let _ = strict; // `0xFF 0xFF` mid-ECS is always treated as malformed, not a lenient fill byte.
    let mut out = Vec::new();
    loop {
        let b = c.read_u8()?;
        if b != 0xFF {
            out.push(b);
            continue;
        }
        let next = c.read_u8()?;
        if next == 0x00 {
            out.push(0xFF);
            continue;
        }
        if next == 0xFF {
            return Err(JpegError::MalformedStatic(
                "0xFF 0xFF found inside the entropy-coded segment"
            ));
        }
        // A real marker: un-consume both the 0xFF and the marker byte so the
        // main loop's `next_marker_byte` sees a clean `0xFF xx` pair.
        c.unread_u8();
        c.unread_u8();
        return Ok(EntropyCodedSegment(out));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u16_be(out: &mut Vec<u8>, value: u16) {
        out.extend_from_slice(&value.to_be_bytes());
    }

    fn push_marker(out: &mut Vec<u8>, marker: u8) {
        out.push(0xFF);
        out.push(marker);
    }

    /// Minimal 8x8 one-component baseline header stream, SOI through SOF0,
    /// with a caller-supplied closure to inject extra segments (e.g. a
    /// second DHT for the same destination) before the DC/AC tables this
    /// helper always writes.
    fn base_headers(extra: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
        let mut out = Vec::new();
        push_marker(&mut out, marker::SOI);
        extra(&mut out);

        // DC table, destination 0: one length-1 code, symbol 0.
        push_marker(&mut out, marker::DHT);
        push_u16_be(&mut out, 2 + 1 + 16 + 1);
        out.push(0x00);
        let mut counts = [0u8; 16];
        counts[0] = 1;
        out.extend_from_slice(&counts);
        out.push(0x00);

        // AC table, destination 0: one length-1 code, EOB.
        push_marker(&mut out, marker::DHT);
        push_u16_be(&mut out, 2 + 1 + 16 + 1);
        out.push(0x10);
        out.extend_from_slice(&counts);
        out.push(0x00);

        push_marker(&mut out, 0xC0);
        push_u16_be(&mut out, 8 + 3);
        out.push(8);
        push_u16_be(&mut out, 8);
        push_u16_be(&mut out, 8);
        out.push(1);
        out.push(1);
        out.push(0x11);
        out.push(0);

        push_marker(&mut out, marker::SOS);
        push_u16_be(&mut out, 6 + 2);
        out.push(1);
        out.push(1);
        out.push(0x00);
        out.push(0);
        out.push(63);
        out.push(0);
        out.push(0x00); // one filler ECS byte, decode correctness is not under test here
        push_marker(&mut out, marker::EOI);
        out
    }

    #[test]
    fn rejects_missing_soi() {
        let data = [0x00, 0x01, 0x02];
        let err = parse(&data, &DecoderOptions::default()).unwrap_err();
        assert!(matches!(err, JpegError::MalformedStatic(_)));
    }

    #[test]
    fn a_second_dht_at_the_same_destination_replaces_the_first() {
        let bytes = base_headers(|out| {
            // An earlier DC table at destination 0 with a different value;
            // `base_headers`'s own DHT for destination 0 must supersede it.
            push_marker(out, marker::DHT);
            push_u16_be(out, 2 + 1 + 16 + 1);
            out.push(0x00);
            let mut counts = [0u8; 16];
            counts[0] = 1;
            out.extend_from_slice(&counts);
            out.push(0xAA);
        });

        let image = parse(&bytes, &DecoderOptions::default()).unwrap();
        let dc_table = image.dc_tables[0].as_ref().unwrap();
        assert_eq!(dc_table.values(), &[0x00]);
    }

    #[test]
    fn extra_fill_bytes_before_a_marker_are_tolerated_unless_strict() {
        let bytes = base_headers(|out| {
            out.push(0x00); // a stray byte before the next marker
        });
        assert!(parse(&bytes, &DecoderOptions::default()).is_ok());
        assert!(parse(&bytes, &DecoderOptions::default().set_strict_mode(true)).is_err());
    }

    #[test]
    fn collect_ecs_unstuffs_a_stuffed_0xff_byte_and_stops_at_the_real_marker() {
        // 0xFF 0x00 (a stuffed literal 0xFF), then a plain 0x01, then the
        // real terminating marker 0xFF 0xD9 (EOI).
        let data = [0xFF, 0x00, 0x01, 0xFF, 0xD9];
        let mut c = ByteCursor::new(&data);
        let ecs = collect_ecs(&mut c, false).unwrap();
        assert_eq!(ecs.0, vec![0xFF, 0x01]);
        // the cursor must have rewound exactly onto the 0xFF of the EOI marker
        assert_eq!(c.read_u16_be().unwrap(), 0xFFD9);
    }

    #[test]
    fn collect_ecs_rejects_0xff_0xff_inside_the_segment() {
        let data = [0x01, 0xFF, 0xFF, 0xFF, 0xD9];
        let mut c = ByteCursor::new(&data);
        assert!(collect_ecs(&mut c, false).is_err());
    }

    #[test]
    fn generic_segments_are_retained_verbatim_in_original_order() {
        let bytes = base_headers(|out| {
            push_marker(out, marker::COM);
            push_u16_be(out, 2 + 5);
            out.extend_from_slice(b"hello");
        });
        let image = parse(&bytes, &DecoderOptions::default()).unwrap();
        assert_eq!(image.misc_segments.len(), 1);
        assert_eq!(image.misc_segments[0].marker, marker::COM);
        assert_eq!(image.misc_segments[0].payload, b"hello");
    }
}
