//! General-purpose coder for a single-channel byte plane.
//!
//! Shares the CM layer's shape without the color machinery: a tile grid
//! of predictor choices, chaos-binned zRLE residual coding, and filter
//! symbols interleaved at each tile's first coded pixel. Tiles that are
//! entirely one of up to four popular constants code through "sympal"
//! filter symbols and carry no residuals at all. The small-palette mode
//! runs its packed index raster through this codec.

mod decode;
mod encode;

pub use decode::{read_plane, read_plane_masked};
pub use encode::{MonoEncoder, MonoParams};

/// Number of predictor filters in the library
pub const MONO_FILTERS: usize = 8;

/// Most sympal (constant-tile) filter slots a stream may carry
pub const MAX_SYMPAL: usize = 4;

/// Byte predictor over the plane decoded so far.
///
/// Index order: Z, A, B, C, D, AB, CLAMP_GRAD, PAETH. Edge fallbacks
/// run A, then B, then zero.
#[inline]
fn predict(filter: usize, plane: &[u8], x: usize, y: usize, width: usize) -> u8 {
	let a = || plane[y * width + x - 1];
	let b = || plane[(y - 1) * width + x];
	let c = || plane[(y - 1) * width + x - 1];
	let d = || plane[(y - 1) * width + x + 1];

	let interior = x > 0 && y > 0;
	match filter {
		0 => 0,
		1 if x > 0 => a(),
		2 if y > 0 => b(),
		3 if interior => c(),
		4 if y > 0 && x + 1 < width => d(),
		5 if interior => ((u16::from(a()) + u16::from(b())) >> 1) as u8,
		6 if interior => {
			let (a, b, c) = (i32::from(a()), i32::from(b()), i32::from(c()));
			let grad = b + a - c;
			grad.clamp(b.min(a).min(c), b.max(a).max(c)) as u8
		}
		7 if interior => {
			let (a, b, c) = (i32::from(a()), i32::from(b()), i32::from(c()));
			let pabc = a + b - c;
			let (pa, pb, pc) = ((pabc - a).abs(), (pabc - b).abs(), (pabc - c).abs());
			if pa <= pb && pa <= pc {
				a as u8
			} else if pb <= pc {
				b as u8
			} else {
				c as u8
			}
		}
		_ if x > 0 => a(),
		_ if y > 0 => b(),
		_ => 0,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bits::{BitReader, BitWriter};
	use crate::header::Header;

	fn roundtrip(plane: &[u8], width: usize, height: usize, params: &MonoParams) {
		let mut encoder = MonoEncoder::analyze(plane, width, height, params);
		let mut writer = BitWriter::new();
		encoder.write(&mut writer);

		let bytes = writer.finalize(width.max(1) as u16, height.max(1) as u16);
		let words: Vec<u32> = bytes[Header::SIZE..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let decoded = read_plane(&mut reader, width, height, params.num_syms).unwrap();
		assert_eq!(decoded, plane);
		assert!(!reader.eof());
	}

	#[test]
	fn test_gradient_plane() {
		let width = 20;
		let height = 12;
		let plane: Vec<u8> =
			(0..width * height).map(|i| ((i % width) * 3 + (i / width) * 5) as u8).collect();
		roundtrip(&plane, width, height, &MonoParams::default());
	}

	#[test]
	fn test_constant_plane_uses_sympal() {
		let plane = vec![42u8; 16 * 16];
		let params = MonoParams::default();
		let encoder = MonoEncoder::analyze(&plane, 16, 16, &params);
		assert!(encoder.sympal().contains(&42));
		roundtrip(&plane, 16, 16, &params);
	}

	#[test]
	fn test_two_value_blocks() {
		// Alternating constant tiles exercise two sympal slots
		let width = 32;
		let height = 32;
		let mut plane = vec![0u8; width * height];
		for y in 0..height {
			for x in 0..width {
				plane[y * width + x] = if (x / 8 + y / 8) % 2 == 0 { 7 } else { 200 };
			}
		}
		roundtrip(&plane, width, height, &MonoParams::default());
	}

	#[test]
	fn test_noise_plane() {
		let mut state = 99u32;
		let plane: Vec<u8> = (0..37 * 23)
			.map(|_| {
				state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
				(state >> 24) as u8
			})
			.collect();
		roundtrip(&plane, 37, 23, &MonoParams::default());
	}

	#[test]
	fn test_masked_plane_roundtrip() {
		// Masked pixels carry no symbols and stay zero on both sides
		let width = 16;
		let height = 16;
		let masked = |x: usize, y: usize| (x + y) % 5 == 0;

		let mut plane = vec![0u8; width * height];
		for y in 0..height {
			for x in 0..width {
				if !masked(x, y) {
					plane[y * width + x] = (x * 3 + y * 7) as u8;
				}
			}
		}

		let params = MonoParams::default();
		let mut encoder = MonoEncoder::analyze_masked(&plane, width, height, &params, masked);
		let mut writer = BitWriter::new();
		encoder.write(&mut writer);

		let bytes = writer.finalize(width as u16, height as u16);
		let words: Vec<u32> = bytes[Header::SIZE..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let decoded =
			read_plane_masked(&mut reader, width, height, params.num_syms, masked).unwrap();
		assert_eq!(decoded, plane);
	}

	#[test]
	fn test_odd_dimensions() {
		for (w, h) in [(1, 1), (3, 1), (1, 7), (5, 5)] {
			let plane: Vec<u8> = (0..w * h).map(|i| (i * 11) as u8).collect();
			roundtrip(&plane, w, h, &MonoParams::default());
		}
	}

	#[test]
	fn test_predict_edges_fall_back() {
		let plane = [10u8, 20, 30, 40];
		// Every filter at the origin predicts zero
		for f in 0..MONO_FILTERS {
			assert_eq!(predict(f, &plane, 0, 0, 2), 0, "filter {f}");
		}
		// At (1, 0) everything without a row above falls back to A
		for f in [2, 3, 4, 5, 6, 7] {
			assert_eq!(predict(f, &plane, 1, 0, 2), 10, "filter {f}");
		}
	}
}
