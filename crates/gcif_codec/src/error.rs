//! Error types for GCIF encoding and decoding.

use thiserror::Error;

/// Errors that can occur while encoding a `.gci` file
#[derive(Debug, Error)]
pub enum WriteError {
	/// Bad parameters passed to the encoder
	#[error("Bad encoder parameters: {0}")]
	BadParams(&'static str),

	/// Image dimensions are invalid
	#[error("Invalid image dimensions: {width}x{height}")]
	BadDims {
		/// Requested width in pixels
		width: u32,
		/// Requested height in pixels
		height: u32,
	},

	/// IO error
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// Internal error
	#[error("Internal encoder error: {0}")]
	Bug(&'static str),
}

/// Errors that can occur while decoding a `.gci` file
#[derive(Debug, Error)]
pub enum ReadError {
	/// IO error
	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// File header is bad
	#[error("File header is bad")]
	BadHead,

	/// Bad image dimensions
	#[error("Bad image dimensions: {width}x{height}")]
	BadDims {
		/// Width stored in the header
		width: u16,
		/// Height stored in the header
		height: u16,
	},

	/// File data is bad
	#[error("File data is bad")]
	BadData,

	/// Mask codelen read failed
	#[error("Mask codelen read failed")]
	MaskCodes,

	/// Mask decode init failed
	#[error("Mask decode init failed")]
	MaskDecodeInit,

	/// Mask LZ decode failed
	#[error("Mask LZ decode failed")]
	MaskLz,

	/// LZ codelen read failed
	#[error("LZ codelen read failed")]
	LzCodes,

	/// Bad data in LZ section
	#[error("Bad data in LZ section")]
	LzBad,

	/// CM codelen read failed
	#[error("CM codelen read failed")]
	CmCodes,

	/// Image hash does not match
	#[error("Image hash does not match")]
	BadHash,

	/// Bad data in palette section
	#[error("Bad data in palette section")]
	BadPalette,
}
