//! Mask layer decoder.

use crate::bits::BitReader;
use crate::error::ReadError;
use crate::huffman::{HuffmanDecoder, TABLE_BITS};

use super::{row_bit, stride_words};

/// Decoded dominant-color mask.
///
/// The bitplane is rebuilt in full before later layers run; the pixel
/// loop then only tests bits.
#[derive(Debug)]
pub struct MaskDecoder {
	enabled: bool,
	color: u32,
	stride: usize,
	bitplane: Vec<u32>,
}

impl MaskDecoder {
	/// A permanently-disabled mask (palette mode)
	pub fn disabled(width: usize, height: usize) -> Self {
		let stride = stride_words(width);
		Self {
			enabled: false,
			color: 0,
			stride,
			bitplane: vec![0; stride * height],
		}
	}

	/// Reads the mask layer and rebuilds the bitplane
	pub fn read(
		reader: &mut BitReader<'_>,
		width: usize,
		height: usize,
	) -> Result<Self, ReadError> {
		let mut this = Self::disabled(width, height);

		this.enabled = reader.read_bit() != 0;
		if !this.enabled {
			return Ok(this);
		}

		this.color = reader.read_word();

		let rle_size = reader.read9() as usize;
		let lz_size = reader.read9() as usize;

		let lz = if reader.read_bit() != 0 {
			let decoder = HuffmanDecoder::read(256, reader, TABLE_BITS)
				.ok_or(ReadError::MaskDecodeInit)?;
			(0..lz_size).map(|_| decoder.next(reader) as u8).collect::<Vec<u8>>()
		} else {
			(0..lz_size).map(|_| reader.read_bits(8) as u8).collect::<Vec<u8>>()
		};

		if reader.eof() {
			return Err(ReadError::MaskLz);
		}

		let rle = lz4_flex::block::decompress(&lz, rle_size).map_err(|_| ReadError::MaskLz)?;
		if rle.len() != rle_size {
			return Err(ReadError::MaskLz);
		}

		this.rebuild_bitplane(&rle, height)?;
		Ok(this)
	}

	/// Parses the per-row RLE into the filtered plane, then inverts the
	/// horizontal and vertical XOR predictors
	fn rebuild_bitplane(&mut self, rle: &[u8], height: usize) -> Result<(), ReadError> {
		let stride = self.stride;
		let row_bits = stride * 32;
		let mut pos = 0usize;

		let mut next_chained = |pos: &mut usize| -> Result<u32, ReadError> {
			let mut value = 0u32;
			loop {
				let byte = *rle.get(*pos).ok_or(ReadError::MaskLz)?;
				*pos += 1;
				value += u32::from(byte);
				if byte < 255 {
					return Ok(value);
				}
			}
		};

		for y in 0..height {
			let count = next_chained(&mut pos)?;
			let row = &mut self.bitplane[y * stride..(y + 1) * stride];

			let mut bit = -1i64;
			for _ in 0..count {
				let delta = next_chained(&mut pos)?;
				bit += i64::from(delta) + 1;
				if bit >= row_bits as i64 {
					return Err(ReadError::MaskLz);
				}
				let x = bit as usize;
				row[x >> 5] |= 1 << (31 - (x & 31));
			}
		}

		// Undo the horizontal predictor: prefix-XOR along each row
		for y in 0..height {
			let row = &mut self.bitplane[y * stride..(y + 1) * stride];
			let mut carry = 0u32;
			for word in row.iter_mut() {
				let mut w = *word;
				w ^= w >> 1;
				w ^= w >> 2;
				w ^= w >> 4;
				w ^= w >> 8;
				w ^= w >> 16;
				w ^= carry;
				carry = if w & 1 != 0 { u32::MAX } else { 0 };
				*word = w;
			}
		}

		// Undo the vertical predictor: accumulate rows top-down
		for y in 1..height {
			for i in 0..stride {
				let above = self.bitplane[(y - 1) * stride + i];
				self.bitplane[y * stride + i] ^= above;
			}
		}

		Ok(())
	}

	/// True when the layer was present in the stream
	pub fn enabled(&self) -> bool {
		self.enabled
	}

	/// The dominant color to emit for masked pixels
	pub fn color(&self) -> u32 {
		self.color
	}

	/// True when (x, y) belongs to the mask
	#[inline]
	pub fn masked(&self, x: usize, y: usize) -> bool {
		self.enabled && row_bit(&self.bitplane[y * self.stride..], x)
	}
}
