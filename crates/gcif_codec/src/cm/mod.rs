//! Context-modeling layer: the main coder for pixels the mask and LZ
//! layers left unclaimed.
//!
//! The image is cut into aligned tiles; each tile that owns at least
//! one unclaimed pixel carries a spatial-filter and color-filter pair.
//! Residuals run through per-channel entropy coders conditioned on
//! chaos bins. Tile filter codes interleave with pixel codes in raster
//! order: a tile's pair appears immediately before its first unclaimed
//! pixel, so fully-covered tiles cost nothing.

mod decode;
mod encode;

pub use decode::read_pixels;
pub use encode::CmEncoder;

/// Tile code marking a tile with no unclaimed pixels
const UNUSED_TILE: u16 = 0xFFFF;

/// Placeholder tile code before assignment
const TODO_TILE: u16 = 0xFFFE;

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bits::{BitReader, BitWriter};
	use crate::header::Header;
	use crate::knobs::Knobs;
	use crate::lz::{LzDecoder, LzEncoder};
	use crate::mask::{MaskDecoder, MaskEncoder};

	fn roundtrip_with_knobs(rgba: &[u8], width: usize, height: usize, knobs: &Knobs) -> Vec<u8> {
		let mask = MaskEncoder::analyze(rgba, width, height, knobs);
		let lz = LzEncoder::analyze(rgba, width, height, knobs);
		let mut cm = CmEncoder::analyze(rgba, width, height, &mask, &lz, knobs);

		let mut writer = BitWriter::new();
		mask.write(&mut writer);
		lz.write(&mut writer);
		cm.write(&mut writer);

		let bytes = writer.finalize(width as u16, height as u16);
		let words: Vec<u32> = bytes[Header::SIZE..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let mask = MaskDecoder::read(&mut reader, width, height).unwrap();
		let mut lz = LzDecoder::read(&mut reader, width, height).unwrap();
		let decoded = read_pixels(&mut reader, width, height, &mask, &mut lz).unwrap();
		assert!(!reader.eof());
		decoded
	}

	fn roundtrip(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
		roundtrip_with_knobs(rgba, width, height, &Knobs::default())
	}

	fn gradient(width: usize, height: usize) -> Vec<u8> {
		let mut rgba = Vec::with_capacity(width * height * 4);
		for y in 0..height {
			for x in 0..width {
				rgba.extend_from_slice(&[
					(x * 255 / width.max(1)) as u8,
					(y * 255 / height.max(1)) as u8,
					((x + y) % 256) as u8,
					255,
				]);
			}
		}
		rgba
	}

	#[test_log::test]
	fn test_gradient_roundtrip() {
		let rgba = gradient(24, 24);
		assert_eq!(roundtrip(&rgba, 24, 24), rgba);
	}

	#[test]
	fn test_non_tile_aligned_dimensions() {
		for (w, h) in [(5, 7), (13, 3), (17, 17), (1, 9), (9, 1)] {
			let rgba = gradient(w, h);
			assert_eq!(roundtrip(&rgba, w, h), rgba, "{w}x{h}");
		}
	}

	#[test]
	fn test_single_pixel() {
		let rgba = vec![12, 34, 56, 78];
		assert_eq!(roundtrip(&rgba, 1, 1), rgba);
	}

	#[test]
	fn test_transparent_background_sprite() {
		// Scenario: one opaque region on a transparent field
		let mut rgba = vec![0u8; 16 * 16 * 4];
		for y in 0..15 {
			for x in 0..15 {
				let idx = (y * 16 + x) * 4;
				rgba[idx..idx + 4].copy_from_slice(&[90, 140, 30, 255]);
			}
		}
		assert_eq!(roundtrip(&rgba, 16, 16), rgba);
	}

	#[test]
	fn test_entropy_disabled_matches_enabled_output_pixels() {
		let rgba = gradient(20, 20);

		let mut fast = Knobs::preset(0);
		fast.pal_enable = false;
		let mut strong = Knobs::preset(3);
		strong.pal_enable = false;

		assert_eq!(roundtrip_with_knobs(&rgba, 20, 20, &fast), rgba);
		assert_eq!(roundtrip_with_knobs(&rgba, 20, 20, &strong), rgba);
	}

	#[test]
	fn test_noise_roundtrip() {
		// Worst case input: nothing predicts, nothing matches
		let mut state = 0x1234_5678u32;
		let mut rgba = Vec::with_capacity(48 * 48 * 4);
		for _ in 0..48 * 48 * 4 {
			state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
			rgba.push((state >> 24) as u8);
		}
		assert_eq!(roundtrip(&rgba, 48, 48), rgba);
	}

	#[test]
	fn test_repeated_blocks_use_lz() {
		let mut rgba = vec![0u8; 32 * 8 * 4];
		for y in 0..8 {
			for x in 0..8 {
				let noise = ((x * 37 + y * 101) % 253) as u8;
				for copy in 0..4 {
					let idx = (y * 32 + x + copy * 8) * 4;
					rgba[idx..idx + 4].copy_from_slice(&[noise, noise ^ 0x33, 77, 255]);
				}
			}
		}
		assert_eq!(roundtrip(&rgba, 32, 8), rgba);
	}
}
