//! zRLE entropy encoder.

use crate::bits::BitWriter;
use crate::huffman::{FreqHistogram, HuffmanEncoder};

use super::ZRLE_SYMS;

/// Two-pass zRLE encoder.
///
/// Push every symbol through [`add`](Self::add), call
/// [`finalize`](Self::finalize), then replay the identical sequence
/// through [`write`](Self::write). Zero runs recorded during the first
/// pass are replayed from a run list so both passes stay in lockstep.
#[derive(Debug)]
pub struct EntropyEncoder {
	num_syms: usize,
	bz_hist: FreqHistogram,
	az_hist: FreqHistogram,
	bz: Option<HuffmanEncoder>,
	az: Option<HuffmanEncoder>,
	has_az: bool,
	zero_run: u32,
	run_list: Vec<u32>,
	run_read_index: usize,
}

impl EntropyEncoder {
	/// Creates an encoder over `num_syms` literal symbols
	pub fn new(num_syms: usize) -> Self {
		Self {
			num_syms,
			bz_hist: FreqHistogram::new(num_syms + ZRLE_SYMS as usize),
			az_hist: FreqHistogram::new(num_syms),
			bz: None,
			az: None,
			has_az: false,
			zero_run: 0,
			run_list: Vec::new(),
			run_read_index: 0,
		}
	}

	fn escape_for_run(&self, run: u32) -> u16 {
		if run < ZRLE_SYMS {
			(self.num_syms as u32 + run - 1) as u16
		} else {
			(self.num_syms as u32 + ZRLE_SYMS - 1) as u16
		}
	}

	/// Records one symbol (statistics pass)
	pub fn add(&mut self, symbol: u16) {
		debug_assert!((symbol as usize) < self.num_syms);

		if symbol == 0 {
			self.zero_run += 1;
		} else if self.zero_run > 0 {
			let run = self.zero_run;
			self.zero_run = 0;
			self.bz_hist.add(self.escape_for_run(run));
			self.run_list.push(run);
			self.az_hist.add(symbol);
		} else {
			self.bz_hist.add(symbol);
		}
	}

	/// Closes the statistics pass and builds the Huffman tables
	pub fn finalize(&mut self) {
		if self.zero_run > 0 {
			let run = self.zero_run;
			self.bz_hist.add(self.escape_for_run(run));
			self.run_list.push(run);
		}

		// The after-zero table only earns its keep when some nonzero
		// symbol actually follows a zero run; otherwise zeros go out as
		// plain literals and the escapes are dropped from the alphabet.
		self.has_az = self.az_hist.counts().iter().any(|&f| f > 0);

		if self.has_az {
			self.bz = Some(HuffmanEncoder::from_histogram(&self.bz_hist));
			self.az = Some(HuffmanEncoder::from_histogram(&self.az_hist));
		} else {
			let mut plain = FreqHistogram::new(self.num_syms);
			let zeros: u32 = self.run_list.iter().sum();
			if zeros > 0 {
				plain.add_count(0, zeros);
			}
			for sym in 1..self.num_syms {
				let freq = self.bz_hist.counts()[sym];
				if freq > 0 {
					plain.add_count(sym as u16, freq);
				}
			}
			self.bz = Some(HuffmanEncoder::from_histogram(&plain));
		}

		self.reset();
	}

	/// Rewinds the replay state between simulation and write passes
	pub fn reset(&mut self) {
		self.zero_run = 0;
		self.run_read_index = 0;
	}

	fn bz(&self) -> &HuffmanEncoder {
		self.bz.as_ref().expect("finalize before write")
	}

	/// Writes the stream header and tables. Returns the bit count.
	pub fn write_tables(&self, writer: &mut BitWriter) -> u32 {
		let mut bits = 1;
		if self.has_az {
			writer.write_bit(1);
			bits += self.az.as_ref().expect("finalized").write_table(writer);
			bits += self.bz().write_table(writer);
		} else {
			writer.write_bit(0);
			bits += self.bz().write_table(writer);
		}
		bits
	}

	fn write_zero_run(&self, run: u32, writer: &mut BitWriter) -> u32 {
		let mut bits = self.bz().write_symbol(self.escape_for_run(run), writer);

		if run >= ZRLE_SYMS {
			let mut rem = run - ZRLE_SYMS;
			while rem >= 255 {
				writer.write_bits(255, 8);
				bits += 8;
				rem -= 255;
			}
			writer.write_bits(rem, 8);
			bits += 8;
		}

		bits
	}

	/// Writes one symbol (replay pass). Returns the bit count.
	pub fn write(&mut self, symbol: u16, writer: &mut BitWriter) -> u32 {
		debug_assert!((symbol as usize) < self.num_syms);

		if !self.has_az {
			return self.bz().write_symbol(symbol, writer);
		}

		if symbol == 0 {
			let mut bits = 0;
			if self.zero_run == 0 {
				let run = self.run_list[self.run_read_index];
				self.run_read_index += 1;
				bits = self.write_zero_run(run, writer);
			}
			self.zero_run += 1;
			bits
		} else if self.zero_run > 0 {
			self.zero_run = 0;
			self.az.as_ref().expect("finalized").write_symbol(symbol, writer)
		} else {
			self.bz().write_symbol(symbol, writer)
		}
	}

	/// Number of distinct symbols carrying statistics, a proxy for the
	/// transmitted table size
	pub fn used_symbols(&self) -> u32 {
		let bz = self.bz_hist.counts().iter().filter(|&&f| f > 0).count();
		let az = self.az_hist.counts().iter().filter(|&&f| f > 0).count();
		(bz + az) as u32
	}

	/// Estimated total cost in bits of the recorded stream, tables
	/// excluded. Usable between `finalize` and the write pass.
	pub fn simulate_all(&self) -> u64 {
		let mut bits = 0u64;

		if !self.has_az {
			let bz = self.bz();
			let zeros: u32 = self.run_list.iter().sum();
			bits += u64::from(zeros) * u64::from(bz.simulate_write(0));
			for sym in 1..self.num_syms {
				let freq = self.bz_hist.counts()[sym];
				bits += u64::from(freq) * u64::from(bz.simulate_write(sym as u16));
			}
			return bits;
		}

		for &run in &self.run_list {
			bits += u64::from(self.bz().simulate_write(self.escape_for_run(run)));
			if run >= ZRLE_SYMS {
				bits += u64::from(8 * (1 + (run - ZRLE_SYMS) / 255));
			}
		}

		let az = self.az.as_ref().expect("finalized");
		for sym in 1..self.num_syms as u16 {
			let az_freq = self.az_hist.counts()[sym as usize];
			bits += u64::from(az_freq) * u64::from(az.simulate_write(sym));

			let bz_freq = self.bz_hist.counts()[sym as usize];
			bits += u64::from(bz_freq) * u64::from(self.bz().simulate_write(sym));
		}

		bits
	}
}
