//! CM layer encoder: tile filter selection and the chaos-coded
//! residual stream.

use log::debug;

use crate::bits::BitWriter;
use crate::entropy::{EntropyEncoder, EntropyEstimator};
use crate::filters::{
	CF_COUNT, ChaosRow, ChaosTable, PixelCtx, SF_COUNT, SpatialFilterSet, TAPPED_COUNT,
	rgb_to_yuv, residual_score,
};
use crate::filters::spatial::{FILTER_TAPS, tap_predict};
use crate::huffman::{FreqHistogram, HuffmanEncoder};
use crate::knobs::Knobs;
use crate::lz::LzEncoder;
use crate::mask::MaskEncoder;

use super::{TODO_TILE, UNUSED_TILE};

/// Builds and writes the CM layer.
pub struct CmEncoder<'a> {
	rgba: &'a [u8],
	width: usize,
	height: usize,
	mask: &'a MaskEncoder,
	lz: &'a LzEncoder,
	knobs: &'a Knobs,
	tile_bits: u32,
	tile_size: usize,
	tiles_x: usize,
	tiles_y: usize,
	tile_codes: Vec<u16>,
	sf_set: SpatialFilterSet,
	replacements: Vec<(u8, u8)>,
	residuals: Vec<u8>,
	chaos_levels: u32,
	channel_encoders: Vec<EntropyEncoder>,
	cf_encoder: HuffmanEncoder,
	sf_encoder: HuffmanEncoder,
}

impl<'a> CmEncoder<'a> {
	/// Runs the full encoder pipeline: tile masking, filter design,
	/// tile assignment, residual generation, chaos-level selection.
	pub fn analyze(
		rgba: &'a [u8],
		width: usize,
		height: usize,
		mask: &'a MaskEncoder,
		lz: &'a LzEncoder,
		knobs: &'a Knobs,
	) -> Self {
		let tile_bits = knobs.cm_tile_bits.clamp(1, 7);
		let tile_size = 1usize << tile_bits;
		let tiles_x = width.div_ceil(tile_size);
		let tiles_y = height.div_ceil(tile_size);

		let mut this = Self {
			rgba,
			width,
			height,
			mask,
			lz,
			knobs,
			tile_bits,
			tile_size,
			tiles_x,
			tiles_y,
			tile_codes: vec![TODO_TILE; tiles_x * tiles_y],
			sf_set: SpatialFilterSet::new(),
			replacements: Vec::new(),
			residuals: vec![0; width * height * 4],
			chaos_levels: 1,
			channel_encoders: Vec::new(),
			cf_encoder: HuffmanEncoder::from_freqs(&[0; CF_COUNT]),
			sf_encoder: HuffmanEncoder::from_freqs(&[0; SF_COUNT]),
		};

		this.mask_tiles();
		if knobs.cm_design_filters {
			this.design_filters();
		}
		this.decide_filters();
		this.build_filter_tables();
		this.build_residuals();
		this.choose_chaos();
		this
	}

	/// True when the pixel still needs CM coding
	#[inline]
	fn active(&self, x: usize, y: usize) -> bool {
		!self.lz.visited(x, y) && !self.mask.masked(x, y)
	}

	fn tile_index(&self, x: usize, y: usize) -> usize {
		(y >> self.tile_bits) * self.tiles_x + (x >> self.tile_bits)
	}

	/// Calls `body` for every active pixel of tile (tx, ty)
	fn for_tile_pixels(&self, tx: usize, ty: usize, mut body: impl FnMut(usize, usize)) {
		let x0 = tx * self.tile_size;
		let y0 = ty * self.tile_size;
		let x1 = (x0 + self.tile_size).min(self.width);
		let y1 = (y0 + self.tile_size).min(self.height);

		for y in y0..y1 {
			for x in x0..x1 {
				if self.active(x, y) {
					body(x, y);
				}
			}
		}
	}

	/// Marks tiles with no active pixel as unused
	fn mask_tiles(&mut self) {
		for ty in 0..self.tiles_y {
			for tx in 0..self.tiles_x {
				let mut any_active = false;
				self.for_tile_pixels(tx, ty, |_, _| any_active = true);

				self.tile_codes[ty * self.tiles_x + tx] =
					if any_active { TODO_TILE } else { UNUSED_TILE };
			}
		}
	}

	#[inline]
	fn pixel_rgb(&self, x: usize, y: usize) -> [u8; 3] {
		let idx = (y * self.width + x) * 4;
		[self.rgba[idx], self.rgba[idx + 1], self.rgba[idx + 2]]
	}

	/// Scores every default and tapped filter per tile and replaces the
	/// weakest defaults with clearly better taps
	fn design_filters(&mut self) {
		const CANDIDATES: usize = SF_COUNT + TAPPED_COUNT;
		let mut award_hist = [0i64; CANDIDATES];
		let mut scores = [0u64; CANDIDATES];

		for ty in 0..self.tiles_y {
			for tx in 0..self.tiles_x {
				if self.tile_codes[ty * self.tiles_x + tx] == UNUSED_TILE {
					continue;
				}

				scores.fill(0);
				self.for_tile_pixels(tx, ty, |x, y| {
					let pixel = self.pixel_rgb(x, y);
					let ctx = PixelCtx::new(self.rgba, x, y, self.width);

					for (sf, score) in scores.iter_mut().enumerate().take(SF_COUNT) {
						let pred = self.sf_set.predict_safe(sf, &ctx);
						*score += l1(pixel, pred);
					}

					// Taps score against zero-filled missing neighbors
					let a = if x > 0 { self.pixel_rgb(x - 1, y) } else { [0; 3] };
					let b = if y > 0 { self.pixel_rgb(x, y - 1) } else { [0; 3] };
					let c =
						if x > 0 && y > 0 { self.pixel_rgb(x - 1, y - 1) } else { [0; 3] };
					let d = if y > 0 && x < self.width - 1 {
						self.pixel_rgb(x + 1, y - 1)
					} else {
						[0; 3]
					};

					for tap in 0..TAPPED_COUNT {
						let pred = tap_predict(tap, a, b, c, d);
						scores[SF_COUNT + tap] += l1(pixel, pred);
					}
				});

				// Award 4 to the winner and 1 to each of the top four
				let mut order: Vec<usize> = (0..CANDIDATES).collect();
				order.sort_by_key(|&i| scores[i]);
				award_hist[order[0]] += 4;
				for &i in order.iter().take(4) {
					award_hist[i] += 1;
				}
			}
		}

		for _ in 0..SF_COUNT {
			let (worst_default, worst_awards) = (0..SF_COUNT)
				.map(|i| (i, award_hist[i]))
				.min_by_key(|&(_, awards)| awards)
				.expect("nonempty");

			let (best_tap, tap_awards) = (0..TAPPED_COUNT)
				.map(|i| (i, award_hist[SF_COUNT + i]))
				.max_by_key(|&(_, awards)| awards)
				.expect("nonempty");

			if tap_awards <= worst_awards {
				break;
			}
			let ratio = tap_awards as f64 / worst_awards as f64;
			if ratio < f64::from(self.knobs.cm_min_tap_quality) {
				break;
			}

			let taps = FILTER_TAPS[best_tap];
			debug!(
				"cm: replacing default filter {worst_default} with tap {best_tap} \
				 ({}A {}B {}C {}D)/2, {ratio:.2}x preferred",
				taps[0], taps[1], taps[2], taps[3],
			);

			self.replacements.push((worst_default as u8, best_tap as u8));
			self.sf_set.replace(worst_default, best_tap);

			award_hist[worst_default] = i64::MAX;
			award_hist[SF_COUNT + best_tap] = 0;
		}
	}

	/// YUV residual streams of a tile under a candidate (sf, cf)
	fn tile_residuals(&self, tx: usize, ty: usize, sf: usize, cf: usize) -> [Vec<u8>; 3] {
		let mut channels: [Vec<u8>; 3] = Default::default();

		self.for_tile_pixels(tx, ty, |x, y| {
			let ctx = PixelCtx::new(self.rgba, x, y, self.width);
			let pred = self.sf_set.predict_safe(sf, &ctx);
			let pixel = self.pixel_rgb(x, y);
			let residual = [
				pixel[0].wrapping_sub(pred[0]),
				pixel[1].wrapping_sub(pred[1]),
				pixel[2].wrapping_sub(pred[2]),
			];
			let yuv = rgb_to_yuv(cf, residual);
			channels[0].push(yuv[0]);
			channels[1].push(yuv[1]);
			channels[2].push(yuv[2]);
		});

		channels
	}

	/// Assigns an (sf, cf) pair to every used tile: L1-norm seeding,
	/// optional exact-entropy trials over the best candidates, and
	/// revisit passes once global statistics exist
	fn decide_filters(&mut self) {
		const COMBOS: usize = SF_COUNT * CF_COUNT;
		let knobs = self.knobs;

		if !self.tile_codes.iter().any(|&code| code == TODO_TILE) {
			return;
		}

		let mut estimators: [EntropyEstimator; 3] = Default::default();
		let mut scores = vec![0u64; COMBOS];
		let mut revisit = knobs.cm_revisit_count;
		let mut passes = 0usize;

		loop {
			for ty in 0..self.tiles_y {
				for tx in 0..self.tiles_x {
					let slot = ty * self.tiles_x + tx;
					if self.tile_codes[slot] == UNUSED_TILE {
						continue;
					}

					if passes > 0 {
						if revisit == 0 {
							return;
						}
						revisit -= 1;

						// Pull the tile's current choice back out of
						// the global statistics before re-deciding
						let code = self.tile_codes[slot];
						let (sf, cf) = (usize::from(code >> 8), usize::from(code & 0xFF));
						let old = self.tile_residuals(tx, ty, sf, cf);
						for ch in 0..3 {
							estimators[ch].subtract(&old[ch]);
						}
					}

					scores.fill(0);
					self.for_tile_pixels(tx, ty, |x, y| {
						let ctx = PixelCtx::new(self.rgba, x, y, self.width);
						let pixel = self.pixel_rgb(x, y);

						for sf in 0..SF_COUNT {
							let pred = self.sf_set.predict_safe(sf, &ctx);
							let residual = [
								pixel[0].wrapping_sub(pred[0]),
								pixel[1].wrapping_sub(pred[1]),
								pixel[2].wrapping_sub(pred[2]),
							];
							for cf in 0..CF_COUNT {
								let yuv = rgb_to_yuv(cf, residual);
								let err = u64::from(residual_score(yuv[0]))
									+ u64::from(residual_score(yuv[1]))
									+ u64::from(residual_score(yuv[2]));
								scores[sf + SF_COUNT * cf] += err;
							}
						}
					});

					let lowest = (0..COMBOS)
						.min_by_key(|&i| scores[i])
						.expect("nonempty score table");

					let (best_sf, best_cf);
					if knobs.cm_disable_entropy
						|| scores[lowest] <= u64::from(knobs.cm_max_entropy_skip)
					{
						best_sf = lowest % SF_COUNT;
						best_cf = lowest / SF_COUNT;

						if !knobs.cm_disable_entropy {
							let codes = self.tile_residuals(tx, ty, best_sf, best_cf);
							for ch in 0..3 {
								estimators[ch].add(&codes[ch]);
							}
						}
					} else {
						let mut order: Vec<usize> = (0..COMBOS).collect();
						order.sort_by_key(|&i| scores[i]);
						let top = &order[..knobs.cm_filter_select_fuzz.clamp(1, COMBOS)];

						let mut best: (u32, usize, usize, [Vec<u8>; 3]) =
							(u32::MAX, 0, 0, Default::default());
						for &index in top {
							let sf = index % SF_COUNT;
							let cf = index / SF_COUNT;
							let codes = self.tile_residuals(tx, ty, sf, cf);
							let entropy = estimators[0].entropy(&codes[0])
								+ estimators[1].entropy(&codes[1])
								+ estimators[2].entropy(&codes[2]);
							if entropy < best.0 {
								best = (entropy, sf, cf, codes);
							}
						}

						best_sf = best.1;
						best_cf = best.2;
						for ch in 0..3 {
							estimators[ch].add(&best.3[ch]);
						}
					}

					self.tile_codes[slot] = ((best_sf as u16) << 8) | best_cf as u16;
				}
			}

			if revisit == 0 {
				return;
			}
			passes += 1;
		}
	}

	/// Huffman tables over the tile filter symbols
	fn build_filter_tables(&mut self) {
		let mut sf_hist = FreqHistogram::new(SF_COUNT);
		let mut cf_hist = FreqHistogram::new(CF_COUNT);

		for &code in &self.tile_codes {
			if code != UNUSED_TILE {
				sf_hist.add(code >> 8);
				cf_hist.add(code & 0xFF);
			}
		}

		self.sf_encoder = HuffmanEncoder::from_histogram(&sf_hist);
		self.cf_encoder = HuffmanEncoder::from_histogram(&cf_hist);
	}

	/// Fills the YUVA residual raster for every active pixel
	fn build_residuals(&mut self) {
		for y in 0..self.height {
			for x in 0..self.width {
				if !self.active(x, y) {
					continue;
				}

				let code = self.tile_codes[self.tile_index(x, y)];
				debug_assert!(code != UNUSED_TILE);
				let (sf, cf) = (usize::from(code >> 8), usize::from(code & 0xFF));

				let ctx = PixelCtx::new(self.rgba, x, y, self.width);
				let pred = self.sf_set.predict_safe(sf, &ctx);
				let pixel = self.pixel_rgb(x, y);
				let yuv = rgb_to_yuv(
					cf,
					[
						pixel[0].wrapping_sub(pred[0]),
						pixel[1].wrapping_sub(pred[1]),
						pixel[2].wrapping_sub(pred[2]),
					],
				);

				let idx = (y * self.width + x) * 4;
				let alpha = self.rgba[idx + 3];
				let left_alpha = if x > 0 { self.rgba[idx - 1] } else { 255 };

				self.residuals[idx] = yuv[0];
				self.residuals[idx + 1] = yuv[1];
				self.residuals[idx + 2] = yuv[2];
				self.residuals[idx + 3] = left_alpha.wrapping_sub(alpha);
			}
		}
	}

	/// Feeds the residual raster through the chaos model at a given
	/// level count, producing finalized per-bin channel encoders
	fn build_encoders(&self, levels: u32) -> Vec<EntropyEncoder> {
		let mut encoders: Vec<EntropyEncoder> =
			(0..levels as usize * 4).map(|_| EntropyEncoder::new(256)).collect();
		let mut chaos = ChaosRow::new(ChaosTable::new(levels), self.width);
		chaos.start();

		for y in 0..self.height {
			chaos.start_row();
			for x in 0..self.width {
				if !self.active(x, y) {
					chaos.zero(x);
					continue;
				}

				let idx = (y * self.width + x) * 4;
				let yuva = [
					self.residuals[idx],
					self.residuals[idx + 1],
					self.residuals[idx + 2],
					self.residuals[idx + 3],
				];

				for (ch, &sym) in yuva.iter().enumerate() {
					let bin = chaos.bin(x, ch);
					encoders[bin * 4 + ch].add(u16::from(sym));
				}
				chaos.store(x, yuva);
			}
		}

		for encoder in &mut encoders {
			encoder.finalize();
		}
		encoders
	}

	/// Searches upward through level counts, keeping the cheapest and
	/// stopping after two straight regressions
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

			let improved = best.as_ref().is_none_or(|(_, best_bits, _)| bits < *best_bits);
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

		let (levels, bits, encoders) = best.expect("at least one level tried");
		debug!("cm: {levels} chaos levels, ~{bits} residual bits");
		self.chaos_levels = levels;
		self.channel_encoders = encoders;
	}

	/// Writes the CM layer: geometry, filter tables, chaos tables, then
	/// the interleaved tile-filter and residual stream
	pub fn write(&mut self, writer: &mut BitWriter) {
		writer.write_bits(self.tile_bits, 3);

		writer.write_bits(self.replacements.len() as u32, 5);
		for &(default_index, tap_index) in &self.replacements {
			writer.write_bits(u32::from(default_index), 5);
			writer.write_bits(u32::from(tap_index), 7);
		}

		self.cf_encoder.write_table(writer);
		self.sf_encoder.write_table(writer);

		writer.write_bits(self.chaos_levels - 1, 3);
		for encoder in &self.channel_encoders {
			encoder.write_tables(writer);
		}

		let mut chaos = ChaosRow::new(ChaosTable::new(self.chaos_levels), self.width);
		chaos.start();
		let mut tile_written = vec![false; self.tiles_x];

		for y in 0..self.height {
			if y & (self.tile_size - 1) == 0 {
				tile_written.fill(false);
			}
			chaos.start_row();

			for x in 0..self.width {
				if !self.active(x, y) {
					chaos.zero(x);
					continue;
				}

				let tx = x >> self.tile_bits;
				if !tile_written[tx] {
					tile_written[tx] = true;
					let code = self.tile_codes[self.tile_index(x, y)];
					self.cf_encoder.write_symbol(code & 0xFF, writer);
					self.sf_encoder.write_symbol(code >> 8, writer);
				}

				let idx = (y * self.width + x) * 4;
				let yuva = [
					self.residuals[idx],
					self.residuals[idx + 1],
					self.residuals[idx + 2],
					self.residuals[idx + 3],
				];

				let bins =
					[chaos.bin(x, 0), chaos.bin(x, 1), chaos.bin(x, 2), chaos.bin(x, 3)];
				for ch in 0..4 {
					self.channel_encoders[bins[ch] * 4 + ch]
						.write(u16::from(yuva[ch]), writer);
				}
				chaos.store(x, yuva);
			}
		}
	}
}

#[inline]
fn l1(pixel: [u8; 3], pred: [u8; 3]) -> u64 {
	let mut sum = 0u64;
	for ch in 0..3 {
		sum += u64::from((i32::from(pixel[ch]) - i32::from(pred[ch])).unsigned_abs());
	}
	sum
}
