//! Top-level encoder: parameter validation and layer orchestration.

use std::path::Path;

use log::debug;

use crate::bits::BitWriter;
use crate::cm::CmEncoder;
use crate::error::WriteError;
use crate::knobs::Knobs;
use crate::lz::LzEncoder;
use crate::mask::MaskEncoder;
use crate::palette::PaletteEncoder;

/// Compresses an RGBA raster into a `.gci` file image.
///
/// `level` selects one of the built-in [`Knobs`] presets (0..=3,
/// clamping upward). The raster is row-major, 4 bytes per pixel.
pub fn compress(rgba: &[u8], width: u32, height: u32, level: u32) -> Result<Vec<u8>, WriteError> {
	compress_ex(rgba, width, height, &Knobs::preset(level))
}

/// [`compress`] with full knob control
pub fn compress_ex(
	rgba: &[u8],
	width: u32,
	height: u32,
	knobs: &Knobs,
) -> Result<Vec<u8>, WriteError> {
	if width == 0 || height == 0 || width > 65535 || height > 65535 {
		return Err(WriteError::BadDims {
			width,
			height,
		});
	}

	let (width, height) = (width as usize, height as usize);
	if rgba.len() != width * height * 4 {
		return Err(WriteError::BadParams("RGBA buffer does not match dimensions"));
	}
	if !knobs.cm_disable_entropy && knobs.cm_filter_select_fuzz == 0 {
		return Err(WriteError::BadParams("entropy trials need a nonzero candidate count"));
	}
	if knobs.lz_table_bits == 0 || knobs.lz_table_bits > 24 || knobs.lz_nonzero_coeff == 0 {
		return Err(WriteError::BadParams("bad LZ knobs"));
	}

	let mut writer = BitWriter::new();

	if let Some(palette) = PaletteEncoder::try_analyze(rgba, width, height, knobs) {
		debug!("encode: small-palette mode, {} colors", palette.palette().len());
		writer.write_bit(1);
		palette.write(&mut writer);
	} else {
		writer.write_bit(0);

		let mask = MaskEncoder::analyze(rgba, width, height, knobs);
		mask.write(&mut writer);

		let lz = LzEncoder::analyze(rgba, width, height, knobs);
		lz.write(&mut writer);

		let mut cm = CmEncoder::analyze(rgba, width, height, &mask, &lz, knobs);
		cm.write(&mut writer);
	}

	let bytes = writer.finalize(width as u16, height as u16);
	debug!(
		"encode: {}x{} -> {} bytes ({:.3} bits/pixel)",
		width,
		height,
		bytes.len(),
		bytes.len() as f64 * 8.0 / (width * height) as f64,
	);
	Ok(bytes)
}

/// Compresses and writes straight to a file
pub fn compress_to_file(
	rgba: &[u8],
	width: u32,
	height: u32,
	path: impl AsRef<Path>,
	level: u32,
) -> Result<(), WriteError> {
	let bytes = compress(rgba, width, height, level)?;
	std::fs::write(path, bytes)?;
	Ok(())
}
