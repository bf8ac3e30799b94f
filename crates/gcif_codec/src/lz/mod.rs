//! 2-D LZ layer: exact-match copies of earlier rectangles.
//!
//! Sprite sheets repeat sub-images. The encoder slides a 3x3 rolling
//! hash across the raster, verifies candidate matches pixel-exactly,
//! grows them in all four directions, and transmits the surviving
//! zones sorted by destination. The decoder replays them with two
//! index-linked worklists triggered by raster position, copying one
//! scanline at a time.

mod decode;
mod encode;

pub use decode::LzDecoder;
pub use encode::LzEncoder;

/// Minimum zone width and height; also the match seed size
pub const ZONE_SIZE: usize = 3;

/// Widest/tallest zone a record can express
pub const ZONE_MAX: usize = ZONE_SIZE + 255;

/// Hard cap on transmitted zones (16-bit count)
pub const MAX_ZONES: usize = 65535;

/// Index sentinel for the decoder's linked lists
const ZONE_NULL: u16 = u16::MAX;
