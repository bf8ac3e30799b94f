//! Small-palette mode: whole-image coding for rasters with at most 16
//! distinct colors.
//!
//! The palette is sorted by a luminance+alpha key so neighboring
//! indices tend to be visually close, indices are packed 4, 2, or 1
//! bits per pixel into a byte plane, and the plane rides the
//! monochrome codec. Selected by a single header bit in place of the
//! mask/LZ/CM pipeline.

mod decode;
mod encode;

pub use decode::read_image;
pub use encode::PaletteEncoder;

/// Largest palette this mode can express
pub const PALETTE_MAX: usize = 16;

/// Index packing layout, derived from the palette size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Packing {
	/// One color: no plane at all
	Trivial,
	/// 2 colors: 4x2 pixel blocks, one bit each, MSB first
	Bits1,
	/// 3-4 colors: 2x2 pixel blocks, two bits each, low bits first
	Bits2,
	/// 5-16 colors: horizontal pairs, high nibble first; a final odd
	/// pixel sits in the low nibble
	Bits4,
}

impl Packing {
	fn for_palette(size: usize) -> Self {
		match size {
			0 | 1 => Self::Trivial,
			2 => Self::Bits1,
			3 | 4 => Self::Bits2,
			_ => Self::Bits4,
		}
	}

	/// Packed plane dimensions for an image
	fn packed_dims(self, width: usize, height: usize) -> (usize, usize) {
		match self {
			Self::Trivial => (0, 0),
			Self::Bits1 => (width.div_ceil(4), height.div_ceil(2)),
			Self::Bits2 => (width.div_ceil(2), height.div_ceil(2)),
			Self::Bits4 => (width.div_ceil(2), height),
		}
	}
}

/// Sort key grouping visually similar colors: integer luminance plus a
/// strong alpha term
fn palette_key(color: u32) -> u64 {
	let [r, g, b, a] = color.to_le_bytes();
	2126 * u64::from(r) + 7152 * u64::from(g) + 722 * u64::from(b) + 10000 * u64::from(a)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bits::{BitReader, BitWriter};
	use crate::header::Header;
	use crate::knobs::Knobs;

	fn roundtrip(rgba: &[u8], width: usize, height: usize) -> Option<Vec<u8>> {
		let knobs = Knobs::default();
		let encoder = PaletteEncoder::try_analyze(rgba, width, height, &knobs)?;

		let mut writer = BitWriter::new();
		encoder.write(&mut writer);
		let bytes = writer.finalize(width as u16, height as u16);
		let words: Vec<u32> = bytes[Header::SIZE..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let decoded = read_image(&mut reader, width, height).unwrap();
		assert!(!reader.eof());
		Some(decoded)
	}

	#[test]
	fn test_two_color_stripes() {
		let mut rgba = Vec::new();
		for i in 0..5 {
			if i % 2 == 0 {
				rgba.extend_from_slice(&[1, 2, 3, 255]);
			} else {
				rgba.extend_from_slice(&[4, 5, 6, 255]);
			}
		}
		let decoded = roundtrip(&rgba, 5, 1).expect("palette mode applies");
		assert_eq!(decoded, rgba);
	}

	#[test]
	fn test_sixteen_colors() {
		let width = 16;
		let height = 16;
		let mut rgba = Vec::new();
		for y in 0..height {
			for x in 0..width {
				let c = ((x / 4) + (y / 4) * 4) as u8;
				rgba.extend_from_slice(&[c * 16, 255 - c * 8, c, 255]);
			}
		}
		let decoded = roundtrip(&rgba, width, height).expect("palette mode applies");
		assert_eq!(decoded, rgba);
	}

	#[test]
	fn test_four_colors_odd_dims() {
		let width = 7;
		let height = 5;
		let mut rgba = Vec::new();
		for y in 0..height {
			for x in 0..width {
				let c = ((x + y) % 4) as u8;
				rgba.extend_from_slice(&[c * 60, c * 30, 255 - c * 40, 255]);
			}
		}
		let decoded = roundtrip(&rgba, width, height).expect("palette mode applies");
		assert_eq!(decoded, rgba);
	}

	#[test]
	fn test_transparent_heavy_image_defers_to_mask() {
		// Two colors but 75% transparent: the mask pipeline wins
		let mut rgba = vec![0u8; 8 * 8 * 4];
		for x in 0..16 {
			rgba[x * 4..x * 4 + 4].copy_from_slice(&[9, 9, 9, 255]);
		}
		assert!(roundtrip(&rgba, 8, 8).is_none());
	}

	#[test]
	fn test_single_color_defers_to_mask() {
		let rgba = [[7u8, 7, 7, 255]; 16].concat();
		assert!(roundtrip(&rgba, 4, 4).is_none());
	}

	#[test]
	fn test_seventeen_colors_rejected() {
		let mut rgba = Vec::new();
		for i in 0..17u8 {
			rgba.extend_from_slice(&[i, 0, 0, 255]);
		}
		rgba.extend_from_slice(&[0, 0, 0, 255]); // 18th pixel, repeat color
		assert!(roundtrip(&rgba, 18, 1).is_none());
	}

	#[test]
	fn test_palette_sorted_by_luminance() {
		assert!(palette_key(u32::from_le_bytes([1, 2, 3, 255]))
			< palette_key(u32::from_le_bytes([4, 5, 6, 255])));
		// Alpha dominates luminance
		assert!(palette_key(u32::from_le_bytes([255, 255, 255, 0]))
			< palette_key(u32::from_le_bytes([0, 0, 0, 255])));
	}
}
