//! Top-level decoder: container validation, layer order, final hash
//! check.

use std::path::Path;

use crate::bits::BitReader;
use crate::cm;
use crate::error::ReadError;
use crate::header::Header;
use crate::lz::LzDecoder;
use crate::mask::MaskDecoder;
use crate::palette;

/// A decoded RGBA image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
	/// Width in pixels
	pub width: u16,
	/// Height in pixels
	pub height: u16,
	/// Row-major RGBA bytes, 4 per pixel
	pub rgba: Vec<u8>,
}

impl Image {
	/// Opens and decodes a `.gci` file
	pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
		let data = std::fs::read(path)?;
		decompress(&data)
	}
}

/// Decodes a `.gci` file image into RGBA pixels.
///
/// Fails fast on the first structural or semantic error; the data hash
/// is verified last so corruption that survives decoding is still
/// reported as [`ReadError::BadHash`].
pub fn decompress(data: &[u8]) -> Result<Image, ReadError> {
	let header = Header::from_bytes(data)?;

	let payload = &data[Header::SIZE..];
	if payload.len() % 4 != 0 {
		return Err(ReadError::BadData);
	}
	let words: Vec<u32> = payload
		.chunks_exact(4)
		.map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
		.collect();

	let width = usize::from(header.width);
	let height = usize::from(header.height);

	let mut reader = BitReader::new(&words);

	let rgba = if reader.read_bit() != 0 {
		palette::read_image(&mut reader, width, height)?
	} else {
		let mask = MaskDecoder::read(&mut reader, width, height)?;
		let mut lz = LzDecoder::read(&mut reader, width, height)?;
		cm::read_pixels(&mut reader, width, height, &mask, &mut lz)?
	};

	let (fast_hash, good_hash) = reader.finalize_hashes();
	if fast_hash != header.fast_hash || good_hash != header.good_hash {
		return Err(ReadError::BadHash);
	}

	Ok(Image {
		width: header.width,
		height: header.height,
		rgba,
	})
}
