//! Mask layer encoder.

use std::collections::HashMap;

use log::debug;

use crate::bits::{BitWriter, simulate9};
use crate::huffman::{HuffmanEncoder, collect_freqs};
use crate::knobs::Knobs;

use super::{byte_encode, row_bit, stride_words};

/// Builds and writes the dominant-color mask layer.
///
/// `analyze` runs the whole pipeline up front and decides whether the
/// layer pays for itself; `write` then emits either a 1-bit disable or
/// the full payload.
#[derive(Debug)]
pub struct MaskEncoder {
	enabled: bool,
	color: u32,
	width: usize,
	stride: usize,
	bitplane: Vec<u32>,
	covered: u32,
	rle: Vec<u8>,
	lz: Vec<u8>,
	use_huffman: bool,
	huffman: Option<HuffmanEncoder>,
}

impl MaskEncoder {
	/// Scans the raster, builds the compressed mask, and evaluates it
	pub fn analyze(rgba: &[u8], width: usize, height: usize, knobs: &Knobs) -> Self {
		let stride = stride_words(width);
		let (color, covered) = dominant_color(rgba);

		let mut this = Self {
			enabled: false,
			color,
			width,
			stride,
			bitplane: vec![0; stride * height],
			covered,
			rle: Vec::new(),
			lz: Vec::new(),
			use_huffman: false,
			huffman: None,
		};

		if covered == 0 {
			return this;
		}

		this.build_bitplane(rgba, height);

		let filtered = this.filtered_plane(height);
		this.rle = rle_encode(&filtered, stride, height);
		this.lz = lz4_flex::block::compress(&this.rle);

		if this.rle.len() > 65535 || this.lz.len() > 65535 {
			debug!("mask: stream too large ({} RLE bytes), disabling", this.rle.len());
			return this;
		}

		this.use_huffman = this.lz.len() >= knobs.mask_huff_thresh;
		if this.use_huffman {
			this.huffman = Some(HuffmanEncoder::from_freqs(&collect_freqs(256, &this.lz)));
		}

		// Keep the layer only when it beats raw storage of the covered
		// pixels by the configured ratio
		let estimated = this.estimate_bits();
		let ratio = u64::from(covered) * 32 / u64::from(estimated.max(1));
		this.enabled = ratio >= u64::from(knobs.mask_min_ratio);

		debug!(
			"mask: color {:08X}, {} covered, {} RLE / {} LZ bytes, ratio {} -> {}",
			color,
			covered,
			this.rle.len(),
			this.lz.len(),
			ratio,
			if this.enabled { "enabled" } else { "disabled" },
		);

		this
	}

	fn build_bitplane(&mut self, rgba: &[u8], height: usize) {
		for y in 0..height {
			let row = &mut self.bitplane[y * self.stride..(y + 1) * self.stride];
			for (x, pixel) in rgba[y * self.width * 4..(y + 1) * self.width * 4]
				.chunks_exact(4)
				.enumerate()
			{
				let value = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
				if value == self.color {
					row[x >> 5] |= 1 << (31 - (x & 31));
				}
			}
		}
	}

	/// Vertical then horizontal XOR prediction over the bitplane
	fn filtered_plane(&self, height: usize) -> Vec<u32> {
		let stride = self.stride;
		let mut filtered = self.bitplane.clone();

		for y in (1..height).rev() {
			for i in 0..stride {
				let above = filtered[(y - 1) * stride + i];
				filtered[y * stride + i] ^= above;
			}
		}

		for y in 0..height {
			let row = &mut filtered[y * stride..(y + 1) * stride];
			let mut carry = 0u32;
			for word in row.iter_mut() {
				let original = *word;
				*word ^= (original >> 1) | (carry << 31);
				carry = original & 1;
			}
		}

		filtered
	}

	fn estimate_bits(&self) -> u32 {
		let mut bits =
			32 + 1 + simulate9(self.rle.len() as u32) + simulate9(self.lz.len() as u32);
		if self.use_huffman {
			let huffman = self.huffman.as_ref().expect("built with use_huffman");
			for &byte in &self.lz {
				bits += huffman.simulate_write(u16::from(byte));
			}
		} else {
			bits += self.lz.len() as u32 * 8;
		}
		bits
	}

	/// True when the layer will be emitted
	pub fn enabled(&self) -> bool {
		self.enabled
	}

	/// The chosen dominant color (RGBA, little-endian byte order)
	pub fn color(&self) -> u32 {
		self.color
	}

	/// True when (x, y) is claimed by the mask
	#[inline]
	pub fn masked(&self, x: usize, y: usize) -> bool {
		self.enabled && row_bit(&self.bitplane[y * self.stride..], x)
	}

	/// Writes the layer
	pub fn write(&self, writer: &mut BitWriter) {
		writer.write_bit(u32::from(self.enabled));
		if !self.enabled {
			return;
		}

		writer.write_word(self.color);
		writer.write9(self.rle.len() as u32);
		writer.write9(self.lz.len() as u32);
		writer.write_bit(u32::from(self.use_huffman));

		if self.use_huffman {
			let huffman = self.huffman.as_ref().expect("built with use_huffman");
			huffman.write_table(writer);
			for &byte in &self.lz {
				huffman.write_symbol(u16::from(byte), writer);
			}
		} else {
			for &byte in &self.lz {
				writer.write_bits(u32::from(byte), 8);
			}
		}
	}
}

/// Most frequent exact RGBA value and its population.
///
/// Ties break toward the numerically smaller color so encodes stay
/// deterministic.
fn dominant_color(rgba: &[u8]) -> (u32, u32) {
	let mut counts: HashMap<u32, u32> = HashMap::new();
	for pixel in rgba.chunks_exact(4) {
		let value = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
		*counts.entry(value).or_insert(0) += 1;
	}

	let mut best = (0u32, 0u32);
	for (&color, &count) in &counts {
		if count > best.1 || (count == best.1 && color < best.0) {
			best = (color, count);
		}
	}

	// A dominant color that covers a single pixel is never worth a layer
	if best.1 <= 1 { (best.0, 0) } else { best }
}

/// Per-row RLE of the filtered plane: a delta count then the zero gaps
/// before each set bit, all 255-chained
fn rle_encode(filtered: &[u32], stride: usize, height: usize) -> Vec<u8> {
	let mut rle = Vec::new();
	let mut deltas: Vec<u32> = Vec::new();

	for y in 0..height {
		let row = &filtered[y * stride..(y + 1) * stride];
		deltas.clear();

		let mut zeroes = 0u32;
		for i in 0..stride {
			let mut word = row[i];
			if word == 0 {
				zeroes += 32;
				continue;
			}

			let mut last_bit = 31i32;
			loop {
				let bit = 31 - word.leading_zeros() as i32;
				zeroes += (last_bit - bit) as u32;
				deltas.push(zeroes);
				zeroes = 0;
				last_bit = bit - 1;
				word ^= 1 << bit;
				if word == 0 {
					break;
				}
			}
			zeroes += (last_bit + 1) as u32;
		}

		byte_encode(&mut rle, deltas.len() as u32);
		for &delta in &deltas {
			byte_encode(&mut rle, delta);
		}
	}

	rle
}
