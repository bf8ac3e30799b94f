//! Monochrome plane encoder.

use log::debug;

use crate::bits::BitWriter;
use crate::entropy::EntropyEncoder;
use crate::filters::chaos::{ChaosTable, MonoChaosRow, residual_score_n};
use crate::huffman::{FreqHistogram, HuffmanEncoder};

use super::{MAX_SYMPAL, MONO_FILTERS, predict};

/// Tuning parameters for one monochrome stream
#[derive(Debug, Clone)]
pub struct MonoParams {
	/// Alphabet size of the plane (2..=256)
	pub num_syms: u16,
	/// Smallest tile-size exponent tried
	pub min_bits: u32,
	/// Largest tile-size exponent tried
	pub max_bits: u32,
	/// Minimum constant-tile population for a sympal slot
	pub sympal_thresh: u32,
	/// Number of library predictors tiles may choose from
	pub max_filters: usize,
	/// Award weights for the per-tile filter ranking
	pub awards: [u32; 4],
}

impl Default for MonoParams {
	fn default() -> Self {
		Self {
			num_syms: 256,
			min_bits: 2,
			max_bits: 4,
			sympal_thresh: 2,
			max_filters: MONO_FILTERS,
			awards: [4, 1, 1, 1],
		}
	}
}

/// Builds and writes one monochrome stream.
///
/// Pixels for which `masked` returns true are skipped entirely; the
/// caller's plane must hold zero at those positions so predictions stay
/// in sync with the decoder.
pub struct MonoEncoder<'a> {
	plane: &'a [u8],
	width: usize,
	height: usize,
	params: MonoParams,
	masked: Box<dyn Fn(usize, usize) -> bool + 'a>,
	tile_bits: u32,
	tile_size: usize,
	tiles_x: usize,
	tiles_y: usize,
	sympal: Vec<u8>,
	tile_filters: Vec<u8>,
	residuals: Vec<u16>,
	filter_encoder: HuffmanEncoder,
	chaos_levels: u32,
	encoders: Vec<EntropyEncoder>,
}

impl<'a> MonoEncoder<'a> {
	/// Analyzes an unmasked plane
	pub fn analyze(plane: &'a [u8], width: usize, height: usize, params: &MonoParams) -> Self {
		Self::analyze_masked(plane, width, height, params, |_, _| false)
	}

	/// Analyzes a plane with a mask predicate
	pub fn analyze_masked(
		plane: &'a [u8],
		width: usize,
		height: usize,
		params: &MonoParams,
		masked: impl Fn(usize, usize) -> bool + 'a,
	) -> Self {
		let mut this = Self {
			plane,
			width,
			height,
			params: params.clone(),
			masked: Box::new(masked),
			tile_bits: params.min_bits.clamp(1, 7),
			tile_size: 0,
			tiles_x: 0,
			tiles_y: 0,
			sympal: Vec::new(),
			tile_filters: Vec::new(),
			residuals: vec![0; width * height],
			filter_encoder: HuffmanEncoder::from_freqs(&[0; MONO_FILTERS]),
			chaos_levels: 1,
			encoders: Vec::new(),
		};

		this.choose_tile_size();
		this.choose_sympal();
		this.assign_filters();
		this.build_residuals();
		this.choose_chaos();
		this.build_filter_table();
		this
	}

	/// Sympal constants carried by this stream
	pub fn sympal(&self) -> &[u8] {
		&self.sympal
	}

	fn set_tile_bits(&mut self, tile_bits: u32) {
		self.tile_bits = tile_bits;
		self.tile_size = 1 << tile_bits;
		self.tiles_x = self.width.div_ceil(self.tile_size);
		self.tiles_y = self.height.div_ceil(self.tile_size);
	}

	fn for_tile_pixels(&self, tx: usize, ty: usize, mut body: impl FnMut(usize, usize)) {
		let x0 = tx * self.tile_size;
		let y0 = ty * self.tile_size;
		for y in y0..(y0 + self.tile_size).min(self.height) {
			for x in x0..(x0 + self.tile_size).min(self.width) {
				if !(self.masked)(x, y) {
					body(x, y);
				}
			}
		}
	}

	/// Residual-score sum of one tile under one filter
	fn tile_score(&self, tx: usize, ty: usize, filter: usize) -> u64 {
		let mut sum = 0u64;
		self.for_tile_pixels(tx, ty, |x, y| {
			let pred = predict(filter, self.plane, x, y, self.width);
			let residual = self.residual_of(self.plane[y * self.width + x], pred);
			sum += u64::from(residual_score_n(residual, self.params.num_syms));
		});
		sum
	}

	#[inline]
	fn residual_of(&self, value: u8, pred: u8) -> u16 {
		let n = self.params.num_syms;
		(u16::from(value) + n - u16::from(pred)) % n
	}

	/// Picks the tile-size exponent with the cheapest rough cost: best
	/// per-tile residual scores plus a nominal per-tile overhead
	fn choose_tile_size(&mut self) {
		let min_bits = self.params.min_bits.clamp(1, 7);
		let max_bits = self.params.max_bits.clamp(min_bits, 7);

		let mut best = (u64::MAX, min_bits);
		for bits in min_bits..=max_bits {
			self.set_tile_bits(bits);

			let mut cost = 0u64;
			for ty in 0..self.tiles_y {
				for tx in 0..self.tiles_x {
					let tile_best = (0..MONO_FILTERS)
						.map(|f| self.tile_score(tx, ty, f))
						.min()
						.unwrap_or(0);
					cost += tile_best + 16;
				}
			}

			if cost < best.0 {
				best = (cost, bits);
			}
		}

		self.set_tile_bits(best.1);
		debug!("mono: tile bits {} chosen", best.1);
	}

	/// Constant value of a tile, when it has one (masked pixels aside)
	fn tile_constant(&self, tx: usize, ty: usize) -> Option<u8> {
		let mut value: Option<u8> = None;
		let mut mixed = false;
		self.for_tile_pixels(tx, ty, |x, y| {
			let pixel = self.plane[y * self.width + x];
			match value {
				None => value = Some(pixel),
				Some(v) if v != pixel => mixed = true,
				_ => {}
			}
		});
		if mixed { None } else { value }
	}

	fn choose_sympal(&mut self) {
		let mut counts: Vec<(u8, u32)> = Vec::new();
		for ty in 0..self.tiles_y {
			for tx in 0..self.tiles_x {
				if let Some(value) = self.tile_constant(tx, ty) {
					match counts.iter_mut().find(|(v, _)| *v == value) {
						Some(entry) => entry.1 += 1,
						None => counts.push((value, 1)),
					}
				}
			}
		}

		counts.retain(|&(_, count)| count >= self.params.sympal_thresh);
		counts.sort_by_key(|&(value, count)| (std::cmp::Reverse(count), value));
		counts.truncate(MAX_SYMPAL);

		self.sympal = counts.into_iter().map(|(value, _)| value).collect();
	}

	/// Ranks the library by award votes, keeps the best `max_filters`,
	/// then assigns each tile its cheapest allowed filter (or a sympal
	/// slot when the tile is constant)
	fn assign_filters(&mut self) {
		let mut awards = [0u64; MONO_FILTERS];
		let mut tile_scores = vec![[0u64; MONO_FILTERS]; self.tiles_x * self.tiles_y];

		for ty in 0..self.tiles_y {
			for tx in 0..self.tiles_x {
				let scores = &mut tile_scores[ty * self.tiles_x + tx];
				for (filter, score) in scores.iter_mut().enumerate() {
					*score = self.tile_score(tx, ty, filter);
				}

				let mut order: [usize; MONO_FILTERS] = std::array::from_fn(|i| i);
				order.sort_by_key(|&f| scores[f]);
				for (rank, &award) in self.params.awards.iter().enumerate() {
					awards[order[rank]] += u64::from(award);
				}
			}
		}

		let mut allowed: Vec<usize> = (0..MONO_FILTERS).collect();
		allowed.sort_by_key(|&f| std::cmp::Reverse(awards[f]));
		allowed.truncate(self.params.max_filters.clamp(1, MONO_FILTERS));

		self.tile_filters = vec![0; self.tiles_x * self.tiles_y];
		for ty in 0..self.tiles_y {
			for tx in 0..self.tiles_x {
				let slot = ty * self.tiles_x + tx;

				if let Some(value) = self.tile_constant(tx, ty) {
					if let Some(k) = self.sympal.iter().position(|&v| v == value) {
						self.tile_filters[slot] = (MONO_FILTERS + k) as u8;
						continue;
					}
				}

				let scores = &tile_scores[slot];
				let best = allowed
					.iter()
					.copied()
					.min_by_key(|&f| scores[f])
					.expect("allowed set nonempty");
				self.tile_filters[slot] = best as u8;
			}
		}
	}

	fn build_residuals(&mut self) {
		for y in 0..self.height {
			for x in 0..self.width {
				if (self.masked)(x, y) {
					continue;
				}

				let slot = (y >> self.tile_bits) * self.tiles_x + (x >> self.tile_bits);
				let filter = usize::from(self.tile_filters[slot]);
				if filter >= MONO_FILTERS {
					continue;
				}

				let pred = predict(filter, self.plane, x, y, self.width);
				self.residuals[y * self.width + x] =
					self.residual_of(self.plane[y * self.width + x], pred);
			}
		}
	}

	/// Statistics pass over the residual plane at a given level count;
	/// must enumerate pixels exactly as [`write`](Self::write) does
	fn build_encoders(&self, levels: u32) -> Vec<EntropyEncoder> {
		let mut encoders: Vec<EntropyEncoder> = (0..levels as usize)
			.map(|_| EntropyEncoder::new(usize::from(self.params.num_syms)))
			.collect();
		let mut chaos =
			MonoChaosRow::new(ChaosTable::new(levels), self.width, self.params.num_syms);
		chaos.start();

		for y in 0..self.height {
			chaos.start_row();
			for x in 0..self.width {
				if (self.masked)(x, y) {
					chaos.zero(x);
					continue;
				}

				let slot = (y >> self.tile_bits) * self.tiles_x + (x >> self.tile_bits);
				if usize::from(self.tile_filters[slot]) >= MONO_FILTERS {
					chaos.zero(x);
					continue;
				}

				let residual = self.residuals[y * self.width + x];
				encoders[chaos.bin(x)].add(residual);
				chaos.store(x, residual);
			}
		}

		for encoder in &mut encoders {
			encoder.finalize();
		}
		encoders
	}

	fn choose_chaos(&mut self) {
		let mut best: Option<(u32, u64, Vec<EntropyEncoder>)> = None;
		let mut worse_streak = 0;

		for levels in 1..=8u32 {
			let encoders = self.build_encoders(levels);
			let mut bits = 0u64;
			for encoder in &encoders {
				bits += encoder.simulate_all();
				bits += 8 + u64::from(encoder.used_symbols()) * 6;
			}

			let improved = best.as_ref().is_none_or(|(_, b, _)| bits < *b);
			if improved {
				best = Some((levels, bits, encoders));
				worse_streak = 0;
			} else {
				worse_streak += 1;
				if worse_streak >= 2 {
					break;
				}
			}
		}

		let (levels, _, encoders) = best.expect("at least one level tried");
		self.chaos_levels = levels;
		self.encoders = encoders;
	}

	fn build_filter_table(&mut self) {
		let alphabet = MONO_FILTERS + self.sympal.len();
		let mut hist = FreqHistogram::new(alphabet);

		// Only tiles that actually emit a symbol count
		for ty in 0..self.tiles_y {
			for tx in 0..self.tiles_x {
				let mut any = false;
				self.for_tile_pixels(tx, ty, |_, _| any = true);
				if any {
					hist.add(u16::from(self.tile_filters[ty * self.tiles_x + tx]));
				}
			}
		}

		self.filter_encoder = HuffmanEncoder::from_histogram(&hist);
	}

	/// Writes the stream
	pub fn write(&mut self, writer: &mut BitWriter) {
		writer.write_bits(self.tile_bits, 3);

		writer.write_bits(self.sympal.len() as u32, 3);
		for &value in &self.sympal {
			writer.write_bits(u32::from(value), 8);
		}

		self.filter_encoder.write_table(writer);

		writer.write_bits(self.chaos_levels - 1, 3);
		for encoder in &self.encoders {
			encoder.write_tables(writer);
		}

		let mut chaos =
			MonoChaosRow::new(ChaosTable::new(self.chaos_levels), self.width, self.params.num_syms);
		chaos.start();
		let mut tile_written = vec![false; self.tiles_x];

		for y in 0..self.height {
			if y & (self.tile_size - 1) == 0 {
				tile_written.fill(false);
			}
			chaos.start_row();

			for x in 0..self.width {
				if (self.masked)(x, y) {
					chaos.zero(x);
					continue;
				}

				let tx = x >> self.tile_bits;
				let slot = (y >> self.tile_bits) * self.tiles_x + tx;
				let filter = self.tile_filters[slot];

				if !tile_written[tx] {
					tile_written[tx] = true;
					self.filter_encoder.write_symbol(u16::from(filter), writer);
				}

				if usize::from(filter) >= MONO_FILTERS {
					// Sympal tile: the constant is implied, no residual
					chaos.zero(x);
					continue;
				}

				let residual = self.residuals[y * self.width + x];
				let bin = chaos.bin(x);
				self.encoders[bin].write(residual, writer);
				chaos.store(x, residual);
			}
		}
	}
}
