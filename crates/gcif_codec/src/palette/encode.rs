//! Small-palette encoder.

use std::collections::HashMap;

use log::debug;

use crate::bits::BitWriter;
use crate::knobs::Knobs;
use crate::mono::{MonoEncoder, MonoParams};

use super::{PALETTE_MAX, Packing, palette_key};

/// Builds and writes the small-palette layer.
#[derive(Debug)]
pub struct PaletteEncoder {
	palette: Vec<u32>,
	packed: Vec<u8>,
	pack_w: usize,
	pack_h: usize,
}

impl PaletteEncoder {
	/// Probes the raster for palette-mode eligibility.
	///
	/// Applies when the image holds 2..=16 distinct colors and is not
	/// dominated by fully-transparent pixels (those compress better
	/// through the mask pipeline).
	pub fn try_analyze(
		rgba: &[u8],
		width: usize,
		height: usize,
		knobs: &Knobs,
	) -> Option<Self> {
		if !knobs.pal_enable {
			return None;
		}

		let mut palette: Vec<u32> = Vec::new();
		let mut transparent = 0usize;
		for pixel in rgba.chunks_exact(4) {
			let color = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
			if pixel[3] == 0 {
				transparent += 1;
			}
			if !palette.contains(&color) {
				if palette.len() >= PALETTE_MAX {
					return None;
				}
				palette.push(color);
			}
		}

		if palette.len() < 2 {
			return None;
		}

		let pixel_count = width * height;
		if transparent as f32 >= knobs.pal_transparent_cutoff * pixel_count as f32 {
			debug!("palette: {transparent} transparent pixels, deferring to mask pipeline");
			return None;
		}

		palette.sort_by_key(|&color| (palette_key(color), color));

		let index_of: HashMap<u32, u8> =
			palette.iter().enumerate().map(|(i, &color)| (color, i as u8)).collect();
		let index_at = |x: usize, y: usize| {
			let idx = (y * width + x) * 4;
			let color =
				u32::from_le_bytes([rgba[idx], rgba[idx + 1], rgba[idx + 2], rgba[idx + 3]]);
			index_of[&color]
		};

		let packing = Packing::for_palette(palette.len());
		let (pack_w, pack_h) = packing.packed_dims(width, height);
		let mut packed = Vec::with_capacity(pack_w * pack_h);

		match packing {
			Packing::Trivial => {}
			Packing::Bits4 => {
				for y in 0..height {
					let mut byte = 0u8;
					let mut pending = 0;
					for x in 0..width {
						byte = (byte << 4) | index_at(x, y);
						pending += 1;
						if pending == 2 {
							packed.push(byte);
							byte = 0;
							pending = 0;
						}
					}
					if pending > 0 {
						// Final odd pixel sits in the low nibble
						packed.push(byte);
					}
				}
			}
			Packing::Bits2 => {
				for y in (0..height).step_by(2) {
					for x in (0..width).step_by(2) {
						let mut byte = index_at(x, y);
						if x + 1 < width {
							byte |= index_at(x + 1, y) << 2;
						}
						if y + 1 < height {
							byte |= index_at(x, y + 1) << 4;
							if x + 1 < width {
								byte |= index_at(x + 1, y + 1) << 6;
							}
						}
						packed.push(byte);
					}
				}
			}
			Packing::Bits1 => {
				for y in (0..height).step_by(2) {
					for x in (0..width).step_by(4) {
						let mut byte = 0u8;
						for jj in 0..2 {
							for ii in 0..4 {
								byte <<= 1;
								if x + ii < width && y + jj < height {
									byte |= index_at(x + ii, y + jj);
								}
							}
						}
						packed.push(byte);
					}
				}
			}
		}

		debug_assert_eq!(packed.len(), pack_w * pack_h);
		debug!("palette: {} colors, {:?} packing", palette.len(), packing);

		Some(Self {
			palette,
			packed,
			pack_w,
			pack_h,
		})
	}

	/// The sorted palette
	pub fn palette(&self) -> &[u32] {
		&self.palette
	}

	/// Writes the palette layer (the caller has already written the
	/// mode bit)
	pub fn write(&self, writer: &mut BitWriter) {
		writer.write_bits(self.palette.len() as u32 - 1, 4);
		for &color in &self.palette {
			writer.write_word(color);
		}

		let mut mono =
			MonoEncoder::analyze(&self.packed, self.pack_w, self.pack_h, &MonoParams::default());
		mono.write(writer);
	}
}
