//! Small shared tables: the Annex K default quantization tables used by the
//! requantizer when the caller does not supply its own base tables. Both the
//! transmitted DQT tables and every decoded block's AC array stay in zigzag
//! order throughout this crate (it never materializes natural 8x8 order,
//! since that only matters for the IDCT this crate doesn't perform), so no
//! zigzag permutation table is needed here.

/// ITU-T.81 Annex K.1 luminance quantization table, quality 50 baseline,
/// permuted into zigzag order (the order every transmitted DQT table and
/// every decoded block's AC array use throughout this crate) -- the IJG
/// `std_luminance_quant_tbl` constant, which libjpeg/mozjpeg both ship
/// pre-permuted the same way.
#[rustfmt::skip]
pub const ANNEX_K_LUMA: [u16; 64] = [
    16,  11,  12,  14,  12,  10,  16,  14,
    13,  14,  18,  17,  16,  19,  24,  40,
    26,  24,  22,  22,  24,  49,  35,  37,
    29,  40,  58,  51,  61,  60,  57,  51,
    56,  55,  64,  72,  92,  78,  64,  68,
    87,  69,  55,  56,  80, 109,  81,  87,
    95,  98, 103, 104, 103,  62,  77, 113,
    121, 112, 100, 120,  92, 101, 103,  99
];

/// ITU-T.81 Annex K.2 chrominance quantization table, quality 50 baseline,
/// permuted into zigzag order, matching the IJG `std_chrominance_quant_tbl`
/// constant.
#[rustfmt::skip]
pub const ANNEX_K_CHROMA: [u16; 64] = [
    17,  18,  18,  24,  21,  24,  47,  26,
    26,  47,  99,  66,  56,  66,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99,
    99,  99,  99,  99,  99,  99,  99,  99
];
