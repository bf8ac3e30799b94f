//! Small-palette decoder.

use crate::bits::BitReader;
use crate::error::ReadError;
use crate::mono::read_plane;

use super::Packing;

/// Decodes a palette-mode image into an RGBA raster.
///
/// Called after the top-level mode bit selected this path.
pub fn read_image(
	reader: &mut BitReader<'_>,
	width: usize,
	height: usize,
) -> Result<Vec<u8>, ReadError> {
	let palette_size = reader.read_bits(4) as usize + 1;
	let palette: Vec<[u8; 4]> =
		(0..palette_size).map(|_| reader.read_word().to_le_bytes()).collect();
	if reader.eof() {
		return Err(ReadError::BadPalette);
	}

	let mut rgba = vec![0u8; width * height * 4];

	let packing = Packing::for_palette(palette_size);
	if packing == Packing::Trivial {
		for pixel in rgba.chunks_exact_mut(4) {
			pixel.copy_from_slice(&palette[0]);
		}
		return Ok(rgba);
	}

	let (pack_w, pack_h) = packing.packed_dims(width, height);
	let packed =
		read_plane(reader, pack_w, pack_h, 256).ok_or(ReadError::BadPalette)?;

	let mut set_pixel = |x: usize, y: usize, index: u8| -> Result<(), ReadError> {
		let color = palette.get(usize::from(index)).ok_or(ReadError::BadPalette)?;
		let idx = (y * width + x) * 4;
		rgba[idx..idx + 4].copy_from_slice(color);
		Ok(())
	};

	match packing {
		Packing::Trivial => unreachable!("handled above"),
		Packing::Bits4 => {
			for y in 0..height {
				let row = &packed[y * pack_w..(y + 1) * pack_w];
				for x in (0..width).step_by(2) {
					let byte = row[x / 2];
					if x + 1 < width {
						set_pixel(x, y, byte >> 4)?;
						set_pixel(x + 1, y, byte & 0xF)?;
					} else {
						// Final odd pixel travels in the low nibble
						set_pixel(x, y, byte & 0xF)?;
					}
				}
			}
		}
		Packing::Bits2 => {
			for y in (0..height).step_by(2) {
				for x in (0..width).step_by(2) {
					let byte = packed[(y / 2) * pack_w + x / 2];
					set_pixel(x, y, byte & 3)?;
					if x + 1 < width {
						set_pixel(x + 1, y, (byte >> 2) & 3)?;
					}
					if y + 1 < height {
						set_pixel(x, y + 1, (byte >> 4) & 3)?;
						if x + 1 < width {
							set_pixel(x + 1, y + 1, (byte >> 6) & 3)?;
						}
					}
				}
			}
		}
		Packing::Bits1 => {
			for y in (0..height).step_by(2) {
				for x in (0..width).step_by(4) {
					let byte = packed[(y / 2) * pack_w + x / 4];
					for jj in 0..2 {
						for ii in 0..4 {
							let bit = (byte >> (7 - (jj * 4 + ii))) & 1;
							if x + ii < width && y + jj < height {
								set_pixel(x + ii, y + jj, bit)?;
							}
						}
					}
				}
			}
		}
	}

	Ok(rgba)
}
