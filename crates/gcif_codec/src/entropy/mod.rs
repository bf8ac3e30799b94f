//! Zero-run-length entropy coding over Huffman tables.
//!
//! Residual streams are dominated by zeros. Statistics before and after
//! zeros are kept separately so the after-zero table can spend shorter
//! codes on a smaller working set, and zero runs collapse into escape
//! symbols appended to the before-zero alphabet.

mod decode;
mod encode;
mod estimator;

pub use decode::EntropyDecoder;
pub use encode::EntropyEncoder;
pub use estimator::EntropyEstimator;

/// Number of zero-run escape symbols appended to the before-zero table
pub const ZRLE_SYMS: u32 = 16;

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bits::{BitReader, BitWriter};
	use crate::header::Header;

	fn roundtrip(num_syms: usize, symbols: &[u16]) {
		let mut encoder = EntropyEncoder::new(num_syms);
		for &sym in symbols {
			encoder.add(sym);
		}
		encoder.finalize();

		let mut writer = BitWriter::new();
		encoder.write_tables(&mut writer);
		for &sym in symbols {
			encoder.write(sym, &mut writer);
		}

		let bytes = writer.finalize(1, 1);
		let words: Vec<u32> = bytes[Header::SIZE..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let mut decoder = EntropyDecoder::read(num_syms, &mut reader).unwrap();
		for (i, &sym) in symbols.iter().enumerate() {
			assert_eq!(decoder.next(&mut reader), sym, "symbol {i} diverged");
		}
		assert!(!reader.eof());
	}

	#[test]
	fn test_mixed_stream() {
		roundtrip(256, &[5, 0, 0, 0, 9, 1, 0, 200, 200, 0, 0, 7]);
	}

	#[test]
	fn test_short_runs_use_escapes() {
		let mut symbols = Vec::new();
		for run in 1..16u16 {
			symbols.push(3);
			symbols.extend(std::iter::repeat_n(0, run as usize));
		}
		symbols.push(4);
		roundtrip(256, &symbols);
	}

	#[test]
	fn test_run_crossing_escape_boundary() {
		// Runs of exactly 15, 16, 17 straddle the extended-run escape
		for run in [15usize, 16, 17, 255 + 16, 255 + 255 + 16 + 3] {
			let mut symbols = vec![9u16];
			symbols.extend(std::iter::repeat_n(0, run));
			symbols.push(9);
			roundtrip(256, &symbols);
		}
	}

	#[test]
	fn test_all_zero_stream() {
		roundtrip(256, &vec![0u16; 1000]);
	}

	#[test]
	fn test_no_zero_stream() {
		roundtrip(256, &[1, 2, 3, 4, 5, 255, 254, 1, 1, 1]);
	}

	#[test]
	fn test_trailing_run_without_after_zero() {
		// A trailing zero run leaves the after-zero table unused
		roundtrip(256, &[7, 7, 7, 0, 0, 0, 0, 0]);
	}

	#[test]
	fn test_small_alphabet() {
		roundtrip(17, &[0, 3, 0, 0, 16, 1, 0, 0, 0, 0, 2]);
	}

	#[test]
	fn test_random_residual_stream() {
		use rand::rngs::SmallRng;
		use rand::{Rng, SeedableRng};

		// Residual-shaped stream: mostly zeros with bursts of noise
		let mut rng = SmallRng::seed_from_u64(31);
		let symbols: Vec<u16> = (0..5000)
			.map(|_| if rng.random_bool(0.7) { 0 } else { rng.random_range(0..256) })
			.collect();
		roundtrip(256, &symbols);
	}
}
