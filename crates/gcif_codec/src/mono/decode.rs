//! Monochrome plane decoder.

use crate::bits::BitReader;
use crate::entropy::EntropyDecoder;
use crate::filters::chaos::{ChaosTable, MonoChaosRow};
use crate::huffman::{HuffmanDecoder, TABLE_BITS};

use super::{MAX_SYMPAL, MONO_FILTERS, predict};

/// Decodes one monochrome stream into a byte plane.
///
/// Masked pixels (none for the palette path) stay zero. Returns `None`
/// on structurally bad input.
pub fn read_plane(
	reader: &mut BitReader<'_>,
	width: usize,
	height: usize,
	num_syms: u16,
) -> Option<Vec<u8>> {
	read_plane_masked(reader, width, height, num_syms, |_, _| false)
}

/// [`read_plane`] with a mask predicate mirroring the encoder's
pub fn read_plane_masked(
	reader: &mut BitReader<'_>,
	width: usize,
	height: usize,
	num_syms: u16,
	masked: impl Fn(usize, usize) -> bool,
) -> Option<Vec<u8>> {
	let tile_bits = reader.read_bits(3);
	if tile_bits == 0 || tile_bits > 7 {
		return None;
	}
	let tile_size = 1usize << tile_bits;

	let sympal_count = reader.read_bits(3) as usize;
	if sympal_count > MAX_SYMPAL {
		return None;
	}
	let sympal: Vec<u8> = (0..sympal_count).map(|_| reader.read_bits(8) as u8).collect();

	let filter_decoder =
		HuffmanDecoder::read(MONO_FILTERS + sympal_count, reader, TABLE_BITS)?;

	let chaos_levels = reader.read_bits(3) + 1;
	let mut entropy: Vec<EntropyDecoder> = Vec::with_capacity(chaos_levels as usize);
	for _ in 0..chaos_levels {
		entropy.push(EntropyDecoder::read(usize::from(num_syms), reader)?);
	}
	if reader.eof() {
		return None;
	}

	let mut plane = vec![0u8; width * height];
	let tiles_x = width.div_ceil(tile_size);
	let mut tile_filters: Vec<Option<u8>> = vec![None; tiles_x];
	let mut chaos = MonoChaosRow::new(ChaosTable::new(chaos_levels), width, num_syms);
	chaos.start();

	for y in 0..height {
		if y & (tile_size - 1) == 0 {
			tile_filters.fill(None);
		}
		chaos.start_row();

		for x in 0..width {
			if masked(x, y) {
				chaos.zero(x);
				continue;
			}

			let filter = match tile_filters[x >> tile_bits] {
				Some(filter) => filter,
				None => {
					let filter = filter_decoder.next(reader) as u8;
					tile_filters[x >> tile_bits] = Some(filter);
					filter
				}
			};

			if usize::from(filter) >= MONO_FILTERS {
				let value = sympal[usize::from(filter) - MONO_FILTERS];
				plane[y * width + x] = value;
				chaos.zero(x);
				continue;
			}

			let residual = entropy[chaos.bin(x)].next(reader);
			if residual >= num_syms {
				return None;
			}

			let pred = predict(usize::from(filter), &plane, x, y, width);
			let value = (residual + u16::from(pred)) % num_syms;
			plane[y * width + x] = value as u8;
			chaos.store(x, residual);
		}
	}

	Some(plane)
}
