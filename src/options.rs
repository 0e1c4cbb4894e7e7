//! Small configuration knobs, mirroring the shape of `zune-core`'s
//! `DecoderOptions` but scoped to what this coefficient-level transcoder
//! actually needs.

/// The two DC-prediction behaviours this crate supports: the
/// standards-conforming Annex F predictor, and a raw (non-accumulating)
/// storage mode kept so both can be tested against each other.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DcPredictorMode {
    /// Accumulate DC differences per component (standard behaviour).
    Standard,
    /// Store DC values exactly as transmitted, with no accumulation.
    Raw
}

impl Default for DcPredictorMode {
    fn default() -> Self {
        DcPredictorMode::Standard
    }
}

/// The two per-component block-count formulas this crate supports.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BlockCountFormula {
    /// `ceil(W/(8*Hmax)) * H_i` -- the standard formulation.
    Standard,
    /// `ceil(ceil(W*H_i/Hmax)/8)` -- an alternate formulation, which differs
    /// by one block along an axis when that axis isn't a multiple of
    /// `8*Hmax`/`8*Vmax`.
    Reference
}

impl Default for BlockCountFormula {
    fn default() -> Self {
        BlockCountFormula::Standard
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DecoderOptions {
    /// Reject any anomaly (extra bytes before a marker, `0xFF 0xFF` in an
    /// ECS) instead of warning and continuing.
    pub strict_mode: bool,
    /// Images wider or taller than this are rejected before any allocation.
    pub max_dimension: u16,
    pub dc_predictor: DcPredictorMode,
    pub block_count_formula: BlockCountFormula
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            strict_mode: false,
            max_dimension: u16::MAX,
            dc_predictor: DcPredictorMode::default(),
            block_count_formula: BlockCountFormula::default()
        }
    }
}

impl DecoderOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn set_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    #[must_use]
    pub fn set_dc_predictor(mut self, mode: DcPredictorMode) -> Self {
        self.dc_predictor = mode;
        self
    }

    #[must_use]
    pub fn set_block_count_formula(mut self, formula: BlockCountFormula) -> Self {
        self.block_count_formula = formula;
        self
    }
}
