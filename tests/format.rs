//! Container-level format tests: header layout and structural error
//! reporting.

use gcif_rs::{Header, ReadError, compress, decompress};

fn sample_file() -> Vec<u8> {
	let mut rgba = vec![0u8; 12 * 10 * 4];
	for (i, pixel) in rgba.chunks_exact_mut(4).enumerate() {
		let v = (i % 200) as u8;
		pixel.copy_from_slice(&[v, v / 2, 255 - v, 255]);
	}
	compress(&rgba, 12, 10, 2).expect("encode")
}

#[test]
fn test_magic_word_is_gcif() {
	let file = sample_file();
	assert_eq!(&file[0..4], &0x4649_4347u32.to_le_bytes());
	assert_eq!(&file[0..4], b"GCIF");
}

#[test]
fn test_dimensions_packed_in_word_one() {
	let file = sample_file();
	let dims = u32::from_le_bytes([file[4], file[5], file[6], file[7]]);
	assert_eq!(dims >> 16, 12);
	assert_eq!(dims & 0xFFFF, 10);
}

#[test]
fn test_header_parses_standalone() {
	let file = sample_file();
	let header = Header::from_bytes(&file).expect("valid header");
	assert_eq!(header.width, 12);
	assert_eq!(header.height, 10);
}

#[test]
fn test_wrong_magic_reports_bad_head() {
	let mut file = sample_file();
	file[0] = b'X';
	assert!(matches!(decompress(&file), Err(ReadError::BadHead)));
}

#[test]
fn test_hash_field_corruption_reports_bad_head() {
	// Damaging a stored data hash invalidates the header hash first
	let mut file = sample_file();
	file[8] ^= 0xFF;
	assert!(matches!(decompress(&file), Err(ReadError::BadHead)));
}

#[test]
fn test_empty_and_garbage_input() {
	assert!(decompress(&[]).is_err());
	assert!(decompress(&[0u8; 19]).is_err());
	assert!(decompress(&[0xAB; 64]).is_err());
}

#[test]
fn test_misaligned_payload_rejected() {
	let mut file = sample_file();
	file.push(0);
	assert!(matches!(decompress(&file), Err(ReadError::BadData)));
}

#[test]
fn test_appended_words_fail_hash() {
	let mut file = sample_file();
	file.extend_from_slice(&[0u8; 8]);
	assert!(decompress(&file).is_err());
}
