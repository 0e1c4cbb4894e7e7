//! Integration tests exercising the public API end to end against
//! hand-built minimal baseline JPEG byte streams. This crate ships no binary
//! test fixtures, so each test constructs its own bytes directly from the
//! marker-segment layout this crate parses.

use jpeg_roi_transcode::{DecoderOptions, JpegError, JpegImage, RoiMap};

fn push_u16_be(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn push_marker(out: &mut Vec<u8>, marker: u8) {
    out.push(0xFF);
    out.push(marker);
}

/// A single 8x8 grayscale baseline JPEG: one MCU, one block, DC value 5, all
/// zero AC -- the smallest possible valid image this crate can parse.
///
/// The Huffman tables are the minimal two/three-symbol tables this crate's
/// own unit tests use (`src/scan.rs`): DC carries symbols `{0, 3}` at length
/// 2, AC carries `{EOB, ZRL, run0/size1}` at lengths `{1, 2, 3}`. Canonical
/// assignment (ITU-T.81 figure C.2) gives DC symbol 3 the code `01` and AC's
/// EOB the code `0`, so the coded block is the five bits `01` (DC size 3) +
/// `101` (magnitude 5) + the one bit `0` (EOB) = `011010`, padded with two
/// trailing 1-bits to the byte `0x6B`.
///
/// When `with_ecs` is false the single ECS byte is omitted entirely -- SOS
/// is immediately followed by EOI -- to exercise the truncated-stream path.
fn smallest_block_jpeg(with_ecs: bool) -> Vec<u8> {
    let mut out = Vec::new();
    push_marker(&mut out, 0xD8); // SOI

    // DQT: one flat 8-bit luma table, destination 0. The values are
    // irrelevant except to the requantization test below.
    push_marker(&mut out, 0xDB);
    push_u16_be(&mut out, 2 + 1 + 64);
    out.push(0x00); // precision 0 (8-bit), destination 0
    out.extend(std::iter::repeat(16u8).take(64));

    // DHT, DC class, destination 0: two length-2 codes, symbols 0 and 3.
    push_marker(&mut out, 0xC4);
    push_u16_be(&mut out, 2 + 1 + 16 + 2);
    out.push(0x00); // class 0 (DC), destination 0
    let mut dc_counts = [0u8; 16];
    dc_counts[1] = 2;
    out.extend_from_slice(&dc_counts);
    out.extend_from_slice(&[0x00, 0x03]);

    // DHT, AC class, destination 0: EOB (length 1), ZRL (length 2), run
    // 0/size 1 (length 3).
    push_marker(&mut out, 0xC4);
    push_u16_be(&mut out, 2 + 1 + 16 + 3);
    out.push(0x10); // class 1 (AC), destination 0
    let mut ac_counts = [0u8; 16];
    ac_counts[0] = 1;
    ac_counts[1] = 1;
    ac_counts[2] = 1;
    out.extend_from_slice(&ac_counts);
    out.extend_from_slice(&[0x00, 0xF0, 0x01]);

    // SOF0: 8x8, one component, H=V=1, quant table 0.
    push_marker(&mut out, 0xC0);
    push_u16_be(&mut out, 8 + 3);
    out.push(8); // sample precision
    push_u16_be(&mut out, 8); // number of lines
    push_u16_be(&mut out, 8); // samples per line
    out.push(1); // one component
    out.push(1); // component id
    out.push(0x11); // H=1, V=1
    out.push(0); // quant table selector

    // SOS: one scan component, DC table 0 / AC table 0.
    push_marker(&mut out, 0xDA);
    push_u16_be(&mut out, 6 + 2);
    out.push(1); // Ns
    out.push(1); // component selector
    out.push(0x00); // DC table 0, AC table 0
    out.push(0); // spectral start
    out.push(63); // spectral end
    out.push(0); // approximation

    if with_ecs {
        out.push(0x6B);
    }

    push_marker(&mut out, 0xD9); // EOI
    out
}

/// Install the `log` facade's env-configured logger so `cargo test --
/// --nocapture` shows the crate's own `trace!`/`warn!`/`error!` output.
/// Safe to call from every test: `try_init` is a no-op once a logger is
/// already installed in this process.
fn init_logging() {
    let _ = env_logger::try_init();
}

#[test]
fn smallest_block_decodes_to_expected_coefficients() {
    init_logging();
    let bytes = smallest_block_jpeg(true);
    let image = JpegImage::parse(&bytes, &DecoderOptions::default()).unwrap();
    let frame = image.frame().unwrap();
    assert_eq!((frame.width, frame.height), (8, 8));
    assert_eq!(frame.components.len(), 1);

    let scan = image.decode(&DecoderOptions::default()).unwrap();
    assert_eq!(scan.components.len(), 1);
    let block = scan.components[0].block(0, 0);
    assert_eq!(block.dc, 5);
    assert!(block.ac.iter().all(|&v| v == 0));
}

#[test]
fn image_round_trip_reproduces_original_bytes() {
    init_logging();
    // parse -> decode -> encode (same tables, no requantization) -> serialize
    // must reproduce the original byte stream exactly, since nothing about
    // the coefficients or tables changed.
    let bytes = smallest_block_jpeg(true);
    let image = JpegImage::parse(&bytes, &DecoderOptions::default()).unwrap();
    let scan = image.decode(&DecoderOptions::default()).unwrap();
    let reencoded = image.encode(&scan, &DecoderOptions::default()).unwrap();
    assert_eq!(reencoded, bytes);

    let reparsed = JpegImage::parse(&reencoded, &DecoderOptions::default()).unwrap();
    let frame = reparsed.frame().unwrap();
    assert_eq!((frame.width, frame.height), (8, 8));
}

#[test]
fn truncated_entropy_coded_segment_is_rejected() {
    init_logging();
    // Drop the single ECS byte entirely: SOS is immediately followed by
    // EOI. The bit reader starts exhausted, so decode_scan must fail
    // rather than silently returning an all-zero block.
    let truncated = smallest_block_jpeg(false);
    let image = JpegImage::parse(&truncated, &DecoderOptions::default()).unwrap();
    let err = image.decode(&DecoderOptions::default()).unwrap_err();
    assert!(matches!(err, JpegError::UnexpectedEof { .. } | JpegError::HuffmanDecode { .. }));
}

#[test]
fn roi_requantization_coarsens_low_quality_regions_more() {
    init_logging();
    let bytes = smallest_block_jpeg(true);
    let image = JpegImage::parse(&bytes, &DecoderOptions::default()).unwrap();

    let mut low = image.decode(&DecoderOptions::default()).unwrap();
    let mut high = image.decode(&DecoderOptions::default()).unwrap();

    let roi_low = RoiMap::new(8, 8, vec![5; 64]).unwrap();
    let roi_high = RoiMap::new(8, 8, vec![95; 64]).unwrap();
    image.apply_roi(&mut low, &roi_low).unwrap();
    image.apply_roi(&mut high, &roi_high).unwrap();

    let low_dc = low.components[0].block(0, 0).dc.unsigned_abs();
    let high_dc = high.components[0].block(0, 0).dc.unsigned_abs();
    assert!(low_dc <= high_dc);

    // Requantized coefficients must still re-encode into a valid bitstream.
    image.encode(&low, &DecoderOptions::default()).unwrap();
    image.encode(&high, &DecoderOptions::default()).unwrap();
}

#[test]
fn roi_map_rejects_mismatched_length_and_out_of_range_quality() {
    init_logging();
    assert!(RoiMap::new(8, 8, vec![50; 63]).is_err());
    assert!(RoiMap::new(8, 8, vec![0; 64]).is_err());
    assert!(RoiMap::new(8, 8, vec![101; 64]).is_err());
}

#[test]
fn non_baseline_frame_marker_is_unsupported() {
    init_logging();
    // A progressive-DCT SOF2 header is structurally identical to SOF0 but
    // must be rejected as Unsupported rather than misparsed as baseline.
    let mut bytes = smallest_block_jpeg(true);
    let sof0_marker_index = bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xC0])
        .expect("smallest_block_jpeg always contains an SOF0 marker");
    bytes[sof0_marker_index + 1] = 0xC2; // SOF2: progressive DCT
    let err = JpegImage::parse(&bytes, &DecoderOptions::default()).unwrap_err();
    assert!(matches!(err, JpegError::Unsupported(_)));
}
