//! Compressed transmission of Huffman codelength tables.
//!
//! Trailing zeros can be shaved behind a 1-bit flag. Alphabets at or
//! below [`TABLE_THRESH`](super::TABLE_THRESH) symbols send raw
//! `write17` codelengths. Larger alphabets model the codelen sequence
//! four ways - raw, smoothed average with a 32-symbol cutoff, smoothed
//! average, floored average - and send the cheapest through a 17-symbol
//! meta table whose zero runs collapse into `write335` counts.

use crate::bits::{BitReader, BitWriter, simulate335};

use super::{HUFF_SYMS, HuffmanDecoder, HuffmanEncoder, TABLE_BITS, TABLE_THRESH};
use crate::huffman::FreqHistogram;

/// Codelen prediction for one model step.
///
/// `lag0`/`lag1` start at 1; model 1 pins the prediction to zero from
/// symbol index 32 onward.
fn predict(model: u32, index: usize, lag0: u32, lag1: u32) -> u32 {
	match model {
		0 => 0,
		1 => {
			if index >= 32 {
				0
			} else {
				(lag0 + lag1 + 1) >> 1
			}
		}
		2 => (lag0 + lag1 + 1) >> 1,
		_ => (lag0 + lag1) >> 1,
	}
}

fn model_symbol(len: u8, pred: u32) -> u16 {
	((u32::from(len) + HUFF_SYMS as u32 - pred) % HUFF_SYMS as u32) as u16
}

fn unmodel_symbol(sym: u32, pred: u32) -> u8 {
	((sym + pred) % HUFF_SYMS as u32) as u8
}

/// Writes a codelength table, compressed. Returns the bit count.
pub fn write_compressed_table(codelens: &[u8], writer: &mut BitWriter) -> u32 {
	let mut num_syms = codelens.len();
	debug_assert!(num_syms >= 2);

	let mut bits = 0;

	// Find the last nonzero codelen
	let mut last_non_zero = 0usize;
	for (sym, &len) in codelens.iter().enumerate() {
		if len > 0 {
			last_non_zero = sym;
		}
	}

	// Shave the zero tail when it pays for the index
	let num_syms_bits = 32 - (num_syms as u32 - 1).leading_zeros();
	if num_syms - last_non_zero - 1 > num_syms_bits as usize / 4 {
		writer.write_bit(1);
		writer.write_bits(last_non_zero as u32, num_syms_bits);
		bits += num_syms_bits;
		num_syms = last_non_zero + 1;
	} else {
		writer.write_bit(0);
	}
	bits += 1;

	let codelens = &codelens[..num_syms];

	// Short alphabets go out raw
	if num_syms <= TABLE_THRESH {
		for &len in codelens {
			bits += writer.write17(u32::from(len));
		}
		return bits;
	}

	// Cost out all four models
	let mut best_model = 0u32;
	let mut best_bits = u32::MAX;
	let mut best_encoder = None;
	for model in 0..4 {
		let mut encoder = TableCodelenEncoder::new();
		run_model(model, codelens, |sym| encoder.add(sym));
		encoder.finalize();

		let mut cost = 0;
		run_model(model, codelens, |sym| cost += encoder.simulate(sym));
		encoder.reset();

		if cost < best_bits {
			best_bits = cost;
			best_model = model;
			best_encoder = Some(encoder);
		}
	}

	let Some(mut encoder) = best_encoder else {
		return bits;
	};

	bits += encoder.write_tables(writer);

	writer.write_bits(best_model, 2);
	bits += 2;

	run_model(best_model, codelens, |sym| bits += encoder.write(sym, writer));
	bits
}

/// Feeds the modeled symbol sequence of `codelens` into `emit`
fn run_model(model: u32, codelens: &[u8], mut emit: impl FnMut(u16)) {
	let (mut lag0, mut lag1) = (1u32, 1u32);
	for (index, &len) in codelens.iter().enumerate() {
		let pred = predict(model, index, lag0, lag1);
		emit(model_symbol(len, pred));
		lag1 = lag0;
		lag0 = u32::from(len);
	}
}

/// Reads a codelength table written by [`write_compressed_table`].
///
/// Returns `None` on structurally bad input.
pub fn read_codelens(num_syms_orig: usize, reader: &mut BitReader<'_>) -> Option<Vec<u8>> {
	debug_assert!(num_syms_orig >= 2);

	let mut codelens = vec![0u8; num_syms_orig];
	let mut num_syms = num_syms_orig;

	if reader.read_bit() != 0 {
		let num_syms_bits = 32 - (num_syms as u32 - 1).leading_zeros();
		let shaved = reader.read_bits(num_syms_bits) as usize + 1;
		if shaved >= num_syms {
			return None;
		}
		num_syms = shaved;
	}

	if num_syms <= TABLE_THRESH {
		for len in codelens.iter_mut().take(num_syms) {
			*len = reader.read17() as u8;
		}
		return Some(codelens);
	}

	let mut table = TableCodelenDecoder::read(reader)?;

	let model = reader.read_bits(2);
	let (mut lag0, mut lag1) = (1u32, 1u32);
	for index in 0..num_syms {
		let sym = u32::from(table.next(reader));
		let pred = predict(model, index, lag0, lag1);
		let len = unmodel_symbol(sym, pred);
		lag1 = lag0;
		lag0 = u32::from(len);
		codelens[index] = len;
	}

	Some(codelens)
}

/// Meta coder for codelen symbols (alphabet 0..=16).
///
/// Zero runs are recorded during the statistics pass and replayed at
/// write time: a run of one emits a single zero symbol; longer runs emit
/// two zero symbols and `write335(run - 2)`.
struct TableCodelenEncoder {
	hist: FreqHistogram,
	bz: Option<HuffmanEncoder>,
	zero_run: u32,
	run_list: Vec<u32>,
	run_read_index: usize,
}

impl TableCodelenEncoder {
	fn new() -> Self {
		Self {
			hist: FreqHistogram::new(HUFF_SYMS),
			bz: None,
			zero_run: 0,
			run_list: Vec::new(),
			run_read_index: 0,
		}
	}

	fn record_zero_run(&mut self) {
		if self.zero_run > 0 {
			self.hist.add_count(0, self.zero_run);
			self.run_list.push(self.zero_run);
			self.zero_run = 0;
		}
	}

	fn add(&mut self, symbol: u16) {
		if symbol == 0 {
			self.zero_run += 1;
		} else {
			self.record_zero_run();
			self.hist.add(symbol);
		}
	}

	fn finalize(&mut self) {
		self.record_zero_run();
		self.bz = Some(HuffmanEncoder::from_histogram(&self.hist));
		self.reset();
	}

	fn reset(&mut self) {
		self.zero_run = 0;
		self.run_read_index = 0;
	}

	fn encoder(&self) -> &HuffmanEncoder {
		self.bz.as_ref().expect("finalize before write")
	}

	fn zero_run_cost(&self, run: u32) -> u32 {
		let zero = self.encoder().simulate_write(0);
		if run <= 1 { zero } else { zero * 2 + simulate335(run - 2) }
	}

	fn simulate(&mut self, symbol: u16) -> u32 {
		if symbol == 0 {
			let mut cost = 0;
			if self.zero_run == 0 {
				let run = self.run_list[self.run_read_index];
				self.run_read_index += 1;
				cost = self.zero_run_cost(run);
			}
			self.zero_run += 1;
			cost
		} else {
			self.zero_run = 0;
			self.encoder().simulate_write(symbol)
		}
	}

	fn write(&mut self, symbol: u16, writer: &mut BitWriter) -> u32 {
		if symbol == 0 {
			let mut cost = 0;
			if self.zero_run == 0 {
				let run = self.run_list[self.run_read_index];
				self.run_read_index += 1;
				cost = self.write_zero_run(run, writer);
			}
			self.zero_run += 1;
			cost
		} else {
			self.zero_run = 0;
			self.encoder().write_symbol(symbol, writer)
		}
	}

	fn write_zero_run(&self, run: u32, writer: &mut BitWriter) -> u32 {
		let encoder = self.encoder();
		if run <= 1 {
			encoder.write_symbol(0, writer)
		} else {
			let mut bits = encoder.write_symbol(0, writer);
			bits += encoder.write_symbol(0, writer);
			bits + writer.write335(run - 2)
		}
	}

	/// Writes the meta table itself: 1-bit shave flag, optional 4-bit
	/// last-nonzero index, then raw codelens.
	fn write_tables(&self, writer: &mut BitWriter) -> u32 {
		let codelens = self.encoder().codelens();

		let mut last_nzt = 0usize;
		for (sym, &len) in codelens.iter().enumerate() {
			if len > 0 {
				last_nzt = sym;
			}
		}

		let mut bits = 1;
		if last_nzt <= 15 {
			writer.write_bit(1);
			writer.write_bits(last_nzt as u32, 4);
			bits += 4;
		} else {
			writer.write_bit(0);
			last_nzt = HUFF_SYMS - 1;
		}

		for &len in &codelens[..=last_nzt] {
			bits += writer.write17(u32::from(len));
		}

		bits
	}
}

/// Decoder half of [`TableCodelenEncoder`]
struct TableCodelenDecoder {
	decoder: HuffmanDecoder,
	zero_run: u32,
	last_zero: bool,
}

impl TableCodelenDecoder {
	fn read(reader: &mut BitReader<'_>) -> Option<Self> {
		let mut codelens = [0u8; HUFF_SYMS];

		let last_nzt =
			if reader.read_bit() != 0 { reader.read_bits(4) as usize + 1 } else { HUFF_SYMS };

		for len in codelens.iter_mut().take(last_nzt) {
			*len = reader.read17() as u8;
		}

		let decoder = HuffmanDecoder::from_codelens(&codelens, TABLE_BITS)?;
		Some(Self {
			decoder,
			zero_run: 0,
			last_zero: false,
		})
	}

	fn next(&mut self, reader: &mut BitReader<'_>) -> u8 {
		if self.zero_run > 0 {
			self.zero_run -= 1;
			return 0;
		}

		let sym = self.decoder.next(reader);
		if sym == 0 {
			if self.last_zero {
				self.zero_run = reader.read335();
			}
			self.last_zero = true;
			0
		} else {
			self.last_zero = false;
			sym as u8
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::header::Header;

	fn roundtrip(codelens: &[u8]) {
		let mut writer = BitWriter::new();
		write_compressed_table(codelens, &mut writer);
		let bytes = writer.finalize(1, 1);
		let words: Vec<u32> = bytes[Header::SIZE..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let decoded = read_codelens(codelens.len(), &mut reader).unwrap();
		assert_eq!(decoded, codelens);
		assert!(!reader.eof());
	}

	#[test]
	fn test_short_table_roundtrip() {
		roundtrip(&[3, 3, 2, 0, 0, 4, 4, 1]);
	}

	#[test]
	fn test_shaved_table_roundtrip() {
		let mut codelens = vec![0u8; 256];
		codelens[0] = 1;
		codelens[1] = 2;
		codelens[2] = 2;
		roundtrip(&codelens);
	}

	#[test]
	fn test_long_table_with_zero_runs() {
		let mut codelens = vec![0u8; 300];
		for i in (0..300).step_by(37) {
			codelens[i] = (3 + i % 11) as u8;
		}
		codelens[299] = 8;
		roundtrip(&codelens);
	}

	#[test]
	fn test_smooth_table_prefers_prediction() {
		// Monotone-ish codelens favor models 2/3; either way it must
		// round-trip
		let codelens: Vec<u8> = (0..64).map(|i| (2 + i / 8) as u8).collect();
		roundtrip(&codelens);
	}

	#[test]
	fn test_all_zero_table() {
		roundtrip(&[0u8; 100]);
	}
}
