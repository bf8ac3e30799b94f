//! CM layer decoder: tile filter tables plus the raster pixel loop.

use crate::bits::BitReader;
use crate::entropy::EntropyDecoder;
use crate::error::ReadError;
use crate::filters::{
	CF_COUNT, ChaosRow, ChaosTable, PixelCtx, SF_COUNT, SpatialFilterSet, TAPPED_COUNT,
	yuv_to_rgb,
};
use crate::huffman::{HuffmanDecoder, TABLE_BITS};
use crate::lz::LzDecoder;
use crate::mask::MaskDecoder;

/// Per-level entropy decoders for the four channels
struct ChannelDecoders {
	y: Vec<EntropyDecoder>,
	u: Vec<EntropyDecoder>,
	v: Vec<EntropyDecoder>,
	a: Vec<EntropyDecoder>,
}

fn read_channel_decoders(
	reader: &mut BitReader<'_>,
	levels: usize,
) -> Result<ChannelDecoders, ReadError> {
	let mut decoders = ChannelDecoders {
		y: Vec::with_capacity(levels),
		u: Vec::with_capacity(levels),
		v: Vec::with_capacity(levels),
		a: Vec::with_capacity(levels),
	};

	for _ in 0..levels {
		decoders.y.push(EntropyDecoder::read(256, reader).ok_or(ReadError::CmCodes)?);
		decoders.u.push(EntropyDecoder::read(256, reader).ok_or(ReadError::CmCodes)?);
		decoders.v.push(EntropyDecoder::read(256, reader).ok_or(ReadError::CmCodes)?);
		decoders.a.push(EntropyDecoder::read(256, reader).ok_or(ReadError::CmCodes)?);
	}

	Ok(decoders)
}

/// Decodes the CM layer and reconstructs the full RGBA raster.
///
/// The mask and LZ layers must already be decoded; they assert pixel
/// ownership ahead of the entropy stream, LZ first.
pub fn read_pixels(
	reader: &mut BitReader<'_>,
	width: usize,
	height: usize,
	mask: &MaskDecoder,
	lz: &mut LzDecoder,
) -> Result<Vec<u8>, ReadError> {
	// Tile geometry
	let tile_bits = reader.read_bits(3);
	if tile_bits == 0 || tile_bits > 7 {
		return Err(ReadError::CmCodes);
	}
	let tile_size = 1usize << tile_bits;

	// Spatial filter replacements
	let mut sf_set = SpatialFilterSet::new();
	let rep_count = reader.read_bits(5) as usize;
	if rep_count > SF_COUNT {
		return Err(ReadError::CmCodes);
	}
	for _ in 0..rep_count {
		let default_index = reader.read_bits(5) as usize;
		let tap_index = reader.read_bits(7) as usize;
		if default_index >= SF_COUNT || tap_index >= TAPPED_COUNT {
			return Err(ReadError::CmCodes);
		}
		sf_set.replace(default_index, tap_index);
	}

	let cf_decoder = HuffmanDecoder::read(CF_COUNT, reader, TABLE_BITS)
		.ok_or(ReadError::CmCodes)?;
	let sf_decoder = HuffmanDecoder::read(SF_COUNT, reader, TABLE_BITS)
		.ok_or(ReadError::CmCodes)?;
	if reader.eof() {
		return Err(ReadError::CmCodes);
	}

	let chaos_levels = reader.read_bits(3) as usize + 1;
	let mut decoders = read_channel_decoders(reader, chaos_levels)?;

	// Raster reconstruction
	let mut rgba = vec![0u8; width * height * 4];
	let tiles_x = width.div_ceil(tile_size);
	let mut tile_filters: Vec<Option<(u8, u8)>> = vec![None; tiles_x];
	let mut chaos = ChaosRow::new(ChaosTable::new(chaos_levels as u32), width);
	chaos.start();

	let color_bytes = mask.color().to_le_bytes();

	for y in 0..height {
		if y as u32 == lz.trigger_y() {
			lz.trigger_row();
		}

		// New tile row band: filters are re-read on first use
		if y & (tile_size - 1) == 0 {
			tile_filters.fill(None);
		}

		chaos.start_row();
		let mut lz_skip = 0usize;

		for x in 0..width {
			if x as u32 == lz.trigger_x() {
				lz_skip = lz.trigger_col(&mut rgba, x, y);
			}

			if lz_skip > 0 {
				lz_skip -= 1;
				chaos.zero(x);
				continue;
			}

			if mask.masked(x, y) {
				let idx = (y * width + x) * 4;
				rgba[idx..idx + 4].copy_from_slice(&color_bytes);
				chaos.zero(x);
				continue;
			}

			// First unclaimed pixel of the tile carries its filters
			let (cf, sf) = match tile_filters[x >> tile_bits] {
				Some(pair) => pair,
				None => {
					let cf = cf_decoder.next(reader) as u8;
					let sf = sf_decoder.next(reader) as u8;
					tile_filters[x >> tile_bits] = Some((cf, sf));
					(cf, sf)
				}
			};

			let yuv = [
				decoders.y[chaos.bin(x, 0)].next(reader) as u8,
				decoders.u[chaos.bin(x, 1)].next(reader) as u8,
				decoders.v[chaos.bin(x, 2)].next(reader) as u8,
			];
			let a_bin = chaos.bin(x, 3);

			let rgb_residual = yuv_to_rgb(cf as usize, yuv);

			let ctx = PixelCtx::new(&rgba, x, y, width);
			let interior = x > 0 && y > 0 && x < width - 1;
			let pred = if interior {
				sf_set.predict_fast(sf as usize, &ctx)
			} else {
				sf_set.predict_safe(sf as usize, &ctx)
			};

			let idx = (y * width + x) * 4;
			rgba[idx] = rgb_residual[0].wrapping_add(pred[0]);
			rgba[idx + 1] = rgb_residual[1].wrapping_add(pred[1]);
			rgba[idx + 2] = rgb_residual[2].wrapping_add(pred[2]);

			let a_residual = decoders.a[a_bin].next(reader) as u8;
			let left_alpha = if x > 0 { rgba[idx - 1] } else { 255 };
			rgba[idx + 3] = left_alpha.wrapping_sub(a_residual);

			chaos.store(x, [yuv[0], yuv[1], yuv[2], a_residual]);
		}
	}

	Ok(rgba)
}
