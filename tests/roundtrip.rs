//! End-to-end round-trip tests over the public API.

use gcif_rs::{Knobs, WriteError, compress, compress_ex, decompress};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn assert_roundtrip(rgba: &[u8], width: u32, height: u32, level: u32) -> Vec<u8> {
	let encoded = compress(rgba, width, height, level).expect("encode");
	let decoded = decompress(&encoded).expect("decode");
	assert_eq!(decoded.width as u32, width);
	assert_eq!(decoded.height as u32, height);
	assert_eq!(decoded.rgba, rgba, "pixels diverged at {width}x{height} level {level}");
	encoded
}

/// Scenario: a fully transparent 4x4 sprite costs almost nothing
#[test]
fn test_fully_transparent_tiny() {
	let rgba = vec![0u8; 4 * 4 * 4];
	let encoded = assert_roundtrip(&rgba, 4, 4, 2);
	// Header plus a handful of words for the mask layer
	assert!(encoded.len() < 120, "transparent 4x4 took {} bytes", encoded.len());
}

/// Scenario: one opaque region on a transparent field
#[test]
fn test_sprite_on_transparent_field() {
	let mut rgba = vec![0u8; 16 * 16 * 4];
	for y in 0..15 {
		for x in 0..15 {
			let idx = (y * 16 + x) * 4;
			rgba[idx..idx + 4].copy_from_slice(&[120, 200, 40, 255]);
		}
	}
	assert_roundtrip(&rgba, 16, 16, 2);
}

/// Scenario: horizontally repeated random block rides the LZ layer
#[test]
fn test_repeated_block() {
	let mut rng = SmallRng::seed_from_u64(7);
	let mut block = vec![0u8; 8 * 8 * 4];
	for pixel in block.chunks_exact_mut(4) {
		pixel.copy_from_slice(&[rng.random(), rng.random(), rng.random(), 255]);
	}

	let width = 16usize;
	let mut rgba = vec![0u8; width * 8 * 4];
	for y in 0..8 {
		for x in 0..width {
			let src = (y * 8 + (x % 8)) * 4;
			let dst = (y * width + x) * 4;
			rgba[dst..dst + 4].copy_from_slice(&block[src..src + 4]);
		}
	}
	assert_roundtrip(&rgba, width as u32, 8, 2);
}

/// Scenario: a two-color opaque image takes the small-palette path
#[test]
fn test_two_color_palette_image() {
	let mut rgba = Vec::new();
	for i in 0..5 {
		if i % 2 == 0 {
			rgba.extend_from_slice(&[1, 2, 3, 255]);
		} else {
			rgba.extend_from_slice(&[4, 5, 6, 255]);
		}
	}
	let encoded = assert_roundtrip(&rgba, 5, 1, 2);
	assert!(encoded.len() < 100);
}

/// Scenario: entropy-disabled and entropy-enabled encodes both
/// round-trip the same pixels
#[test]
fn test_entropy_knob_is_lossless_both_ways() {
	let mut rng = SmallRng::seed_from_u64(42);
	let mut rgba = vec![0u8; 20 * 20 * 4];
	for pixel in rgba.chunks_exact_mut(4) {
		let base: u8 = rng.random_range(0..8);
		pixel.copy_from_slice(&[base * 30, base * 20, 255 - base * 25, 255]);
	}

	for level in [0, 1, 2, 3] {
		assert_roundtrip(&rgba, 20, 20, level);
	}

	let mut knobs = Knobs::preset(2);
	knobs.cm_disable_entropy = true;
	let encoded = compress_ex(&rgba, 20, 20, &knobs).expect("encode");
	assert_eq!(decompress(&encoded).expect("decode").rgba, rgba);
}

/// Scenario: uniform noise terminates and validates
#[test_log::test]
fn test_random_noise() {
	let mut rng = SmallRng::seed_from_u64(0xDEAD_BEEF);
	let mut rgba = vec![0u8; 128 * 128 * 4];
	rng.fill(rgba.as_mut_slice());
	assert_roundtrip(&rgba, 128, 128, 1);
}

/// Scenario 6 at full scale; slow in debug builds
#[test]
#[ignore = "megapixel noise sweep; run with --ignored"]
fn test_random_noise_megapixel() {
	let mut rng = SmallRng::seed_from_u64(1);
	let mut rgba = vec![0u8; 1024 * 1024 * 4];
	rng.fill(rgba.as_mut_slice());
	assert_roundtrip(&rgba, 1024, 1024, 0);
}

#[test]
fn test_gradients_all_levels() {
	let width = 33u32;
	let height = 21u32;
	let mut rgba = Vec::new();
	for y in 0..height {
		for x in 0..width {
			rgba.extend_from_slice(&[
				(x * 7) as u8,
				(y * 11) as u8,
				((x + y) * 3) as u8,
				200u8.wrapping_add((x * y) as u8),
			]);
		}
	}
	for level in 0..4 {
		assert_roundtrip(&rgba, width, height, level);
	}
}

#[test]
fn test_identical_runs_produce_identical_files() {
	let mut rng = SmallRng::seed_from_u64(5);
	let mut rgba = vec![0u8; 24 * 24 * 4];
	for pixel in rgba.chunks_exact_mut(4) {
		let v: u8 = rng.random_range(0..4);
		pixel.copy_from_slice(&[v * 60, v * 60, v * 60, 255]);
	}

	let a = compress(&rgba, 24, 24, 3).expect("encode");
	let b = compress(&rgba, 24, 24, 3).expect("encode");
	assert_eq!(a, b);
}

#[test]
fn test_extreme_aspect_ratios() {
	let row: Vec<u8> = (0..256u32).flat_map(|x| [(x % 256) as u8, 0, 0, 255]).collect();
	assert_roundtrip(&row, 256, 1, 2);

	let column: Vec<u8> = (0..256u32).flat_map(|y| [0, (y % 256) as u8, 0, 255]).collect();
	assert_roundtrip(&column, 1, 256, 2);
}

#[test]
fn test_bad_dimensions_rejected() {
	assert!(matches!(compress(&[], 0, 4, 2), Err(WriteError::BadDims { .. })));
	assert!(matches!(compress(&[], 4, 0, 2), Err(WriteError::BadDims { .. })));
	assert!(matches!(compress(&[], 70000, 4, 2), Err(WriteError::BadDims { .. })));
}

#[test]
fn test_short_buffer_rejected() {
	let rgba = vec![0u8; 15];
	assert!(matches!(compress(&rgba, 2, 2, 2), Err(WriteError::BadParams(_))));
}

/// Property: no single-bit corruption of the data region decodes as a
/// clean success
#[test]
fn test_single_bit_corruption_detected() {
	let mut rgba = vec![0u8; 8 * 8 * 4];
	for (i, pixel) in rgba.chunks_exact_mut(4).enumerate() {
		let v = (i * 37 % 251) as u8;
		pixel.copy_from_slice(&[v, v.wrapping_mul(3), v ^ 0x55, 255]);
	}
	let encoded = compress(&rgba, 8, 8, 1).expect("encode");

	// Skip the 20-byte header; its own hash covers it
	for byte in 20..encoded.len() {
		for bit in 0..8 {
			let mut corrupt = encoded.clone();
			corrupt[byte] ^= 1 << bit;
			if let Ok(image) = decompress(&corrupt) {
				panic!(
					"flip at byte {byte} bit {bit} decoded cleanly ({} bytes)",
					image.rgba.len()
				);
			}
		}
	}
}

#[test]
fn test_truncated_file_rejected() {
	let rgba = vec![0u8; 8 * 8 * 4];
	let encoded = compress(&rgba, 8, 8, 2).expect("encode");
	for cut in [0, 4, 19, 20, encoded.len() - 4] {
		assert!(decompress(&encoded[..cut]).is_err(), "truncation at {cut} accepted");
	}
}
