//! The fixed filter library: spatial predictors, reversible color
//! transforms, and the chaos model that conditions entropy coding.

pub mod chaos;
pub mod color;
pub mod spatial;

pub use chaos::{ChaosRow, ChaosTable, MonoChaosRow, residual_score, residual_score_n};
pub use color::{CF_COUNT, rgb_to_yuv, yuv_to_rgb};
pub use spatial::{PixelCtx, SF_COUNT, SpatialFilterSet, TAPPED_COUNT};
