//! GCIF: a lossless RGBA image codec for game sprite sheets.
//!
//! Sprite sheets are dominated by fully-transparent regions, repeated
//! sub-images, and low-entropy palettes. GCIF layers four specialized
//! coders so each claims the pixels it handles best:
//!
//! 1. A **mask** layer captures every pixel equal to a dominant color
//!    (usually transparent black) as a compressed bitplane.
//! 2. A **2-D LZ** layer copies rectangles that exactly repeat earlier
//!    content.
//! 3. A **context-modeling** layer codes the remaining pixels through
//!    per-tile spatial and color filters with chaos-conditioned entropy
//!    coding.
//! 4. A separate **small-palette** mode replaces all of the above for
//!    images with at most 16 distinct colors.
//!
//! The container is a sequence of little-endian 32-bit words carrying
//! an MSB-first bit stream, validated end to end by a pair of hashes.
//!
//! # Examples
//!
//! ```
//! use gcif_codec::{compress, decompress};
//!
//! let rgba = vec![0u8; 8 * 8 * 4]; // 8x8 transparent sprite
//! let encoded = compress(&rgba, 8, 8, 2)?;
//! let decoded = decompress(&encoded)?;
//! assert_eq!(decoded.rgba, rgba);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bits;
mod cm;
mod entropy;
mod error;
mod filters;
mod hash;
mod header;
mod huffman;
mod knobs;
mod lz;
mod mask;
mod mono;
mod palette;

mod decode;
mod encode;

pub use decode::{Image, decompress};
pub use encode::{compress, compress_ex, compress_to_file};
pub use error::{ReadError, WriteError};
pub use header::Header;
pub use knobs::Knobs;
