//! Encoder tuning knobs and the built-in compression presets.

use serde::{Deserialize, Serialize};

/// Encoder tuning knobs.
///
/// None of these change the decoder; they only steer which of the
/// format's options the encoder picks. The four presets trade encode
/// time for ratio:
///
/// - 0 "Faster": L1-norm filter choice only, no custom taps
/// - 1 "Better": entropy trials over the top 64 candidates
/// - 2 "Harder": custom tap design plus 256-candidate trials
/// - 3 "Stronger": adds revisit passes over early tiles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Knobs {
	/// Minimum mask LZ byte count before Huffman coding the payload
	pub mask_huff_thresh: usize,
	/// Minimum covered-bits to stream-bits ratio to keep the mask on
	pub mask_min_ratio: u32,
	/// Minimum zone count before Huffman coding the zone list
	pub lz_huff_thresh: usize,
	/// Minimum weighted score to accept an LZ match
	pub lz_min_score: u32,
	/// Weight of a nonzero pixel relative to a zero pixel in LZ scores
	pub lz_nonzero_coeff: u32,
	/// log2 of the LZ hash table size
	pub lz_table_bits: u32,
	/// log2 of the CM tile size (2 means 4x4 tiles)
	pub cm_tile_bits: u32,
	/// Try custom tapped filters and replace weak defaults
	pub cm_design_filters: bool,
	/// Skip entropy trials and keep the L1-norm best filter per tile
	pub cm_disable_entropy: bool,
	/// L1 score at or below which the entropy trial is skipped
	pub cm_max_entropy_skip: u32,
	/// Number of top L1 candidates given an exact entropy trial
	pub cm_filter_select_fuzz: usize,
	/// Tile-revisit budget after global statistics exist
	pub cm_revisit_count: usize,
	/// Minimum improvement ratio to adopt a tapped filter
	pub cm_min_tap_quality: f32,
	/// Reserved: per-scanline filter experiment, not encoded
	pub cm_scanline_filters: bool,
	/// Allow the small-palette mode
	pub pal_enable: bool,
	/// Transparent-pixel fraction above which the palette mode defers
	/// to the mask pipeline
	pub pal_transparent_cutoff: f32,
}

impl Default for Knobs {
	fn default() -> Self {
		Self::preset(2)
	}
}

impl Knobs {
	/// Number of built-in presets
	pub const LEVELS: u32 = 4;

	/// Returns the preset for a compression level, clamping to the
	/// strongest
	pub fn preset(level: u32) -> Self {
		let level = level.min(Self::LEVELS - 1);

		let mut knobs = Self {
			mask_huff_thresh: 40,
			mask_min_ratio: 2,
			lz_huff_thresh: 15,
			lz_min_score: 12,
			lz_nonzero_coeff: 4,
			lz_table_bits: 18,
			cm_tile_bits: 2,
			cm_design_filters: false,
			cm_disable_entropy: false,
			cm_max_entropy_skip: 4,
			cm_filter_select_fuzz: 64,
			cm_revisit_count: 0,
			cm_min_tap_quality: 1.3,
			cm_scanline_filters: false,
			pal_enable: true,
			pal_transparent_cutoff: 0.25,
		};

		match level {
			0 => {
				knobs.cm_disable_entropy = true;
				knobs.cm_filter_select_fuzz = 0;
			}
			1 => {}
			2 => {
				knobs.cm_design_filters = true;
				knobs.cm_max_entropy_skip = 0;
				knobs.cm_filter_select_fuzz = 256;
			}
			_ => {
				knobs.cm_design_filters = true;
				knobs.cm_max_entropy_skip = 0;
				knobs.cm_filter_select_fuzz = 272;
				knobs.cm_revisit_count = 4096;
			}
		}

		knobs
	}
}
