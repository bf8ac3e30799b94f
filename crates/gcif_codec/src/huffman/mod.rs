//! Canonical Huffman codec with compressed table transmission.
//!
//! Codelengths are produced by the Moffat-Katajainen in-place algorithm,
//! limited to 16 bits, and assigned canonical codes in (length, symbol)
//! order. The decoder resolves codes of length <= 8 through a direct
//! lookup table and longer codes through per-length max-code scans.
//!
//! Tables travel compressed: trailing zero codelengths can be shaved,
//! short alphabets send raw codelengths, and longer alphabets choose the
//! cheapest of four codelength prediction models coded through a small
//! meta table (see [`table`]).

mod decode;
mod encode;
pub mod table;

pub use decode::HuffmanDecoder;
pub use encode::{FreqHistogram, HuffmanEncoder, collect_freqs};

/// Largest alphabet any table in the format uses
pub const MAX_SYMS: usize = 512;

/// Longest permitted code, in bits
pub const MAX_CODE_SIZE: u32 = 16;

/// Direct-lookup width of the decoder, in bits
pub const TABLE_BITS: u32 = 8;

/// Alphabets at or below this size transmit raw codelengths
pub const TABLE_THRESH: usize = 20;

/// Number of codelength symbols (0..=16)
pub const HUFF_SYMS: usize = MAX_CODE_SIZE as usize + 1;

#[cfg(test)]
mod tests {
	use super::*;
	use crate::bits::{BitReader, BitWriter};

	fn transmit(freqs: &[u16]) -> (HuffmanEncoder, HuffmanDecoder) {
		let encoder = HuffmanEncoder::from_freqs(freqs);
		let mut writer = BitWriter::new();
		encoder.write_table(&mut writer);

		let bytes = writer.finalize(1, 1);
		let words: Vec<u32> = bytes[20..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let decoder = HuffmanDecoder::read(freqs.len(), &mut reader, TABLE_BITS).unwrap();
		(encoder, decoder)
	}

	fn roundtrip_symbols(freqs: &[u16], symbols: &[u16]) {
		let encoder = HuffmanEncoder::from_freqs(freqs);
		let mut writer = BitWriter::new();
		encoder.write_table(&mut writer);
		for &sym in symbols {
			encoder.write_symbol(sym, &mut writer);
		}

		let bytes = writer.finalize(1, 1);
		let words: Vec<u32> = bytes[20..]
			.chunks_exact(4)
			.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
			.collect();
		let mut reader = BitReader::new(&words);
		let decoder = HuffmanDecoder::read(freqs.len(), &mut reader, TABLE_BITS).unwrap();
		for &sym in symbols {
			assert_eq!(decoder.next(&mut reader), sym);
		}
		assert!(!reader.eof());
	}

	#[test]
	fn test_small_alphabet_roundtrip() {
		let freqs = [10u16, 5, 1, 0, 7];
		roundtrip_symbols(&freqs, &[0, 1, 2, 4, 0, 0, 2, 1, 4, 4]);
	}

	#[test]
	fn test_large_alphabet_roundtrip() {
		// 256 symbols forces the compressed table path
		let mut freqs = [0u16; 256];
		for (i, f) in freqs.iter_mut().enumerate() {
			*f = ((i * 7) % 50) as u16;
		}
		freqs[0] = 1000;
		let symbols: Vec<u16> = (0..256).filter(|&s| freqs[s as usize] > 0).collect();
		roundtrip_symbols(&freqs, &symbols);
	}

	#[test]
	fn test_one_symbol_costs_no_bits() {
		let mut freqs = [0u16; 256];
		freqs[42] = 9;
		let (encoder, decoder) = transmit(&freqs);
		assert_eq!(encoder.simulate_write(42), 0);

		let words = [0u32; 1];
		let mut reader = BitReader::new(&words);
		assert_eq!(decoder.next(&mut reader), 42);
	}

	#[test]
	fn test_empty_histogram_transmits() {
		let freqs = [0u16; 256];
		let (_, decoder) = transmit(&freqs);
		let words = [0u32; 1];
		let mut reader = BitReader::new(&words);
		assert_eq!(decoder.next(&mut reader), 0);
	}

	#[test]
	fn test_skewed_freqs_stay_within_16_bits() {
		// A Fibonacci-ish histogram drives unlimited codelens past 16
		let mut freqs = [0u16; 24];
		let (mut a, mut b) = (1u32, 1u32);
		for f in freqs.iter_mut() {
			*f = a.min(65535) as u16;
			let next = (a + b).min(65535);
			a = b;
			b = next;
		}
		let encoder = HuffmanEncoder::from_freqs(&freqs);
		assert!(encoder.codelens().iter().all(|&len| len <= 16));
		roundtrip_symbols(&freqs, &[0, 5, 23, 1, 22, 11]);
	}

	#[test]
	fn test_long_codes_use_fallback_path() {
		// Lengths beyond TABLE_BITS exercise the max-code scan
		let mut freqs = [1u16; 400];
		freqs[0] = 60000;
		freqs[1] = 20000;
		let symbols: Vec<u16> = (0..400).step_by(7).collect();
		roundtrip_symbols(&freqs, &symbols);
	}
}
