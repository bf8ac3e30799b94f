//! `gcif-rs` is a lossless RGBA image codec for game sprite sheets,
//! with a CLI for converting between PNG and `.gci`.
//!
//! The codec itself lives in [`gcif_codec`]; this crate re-exports its
//! public surface.

pub use gcif_codec::*;
