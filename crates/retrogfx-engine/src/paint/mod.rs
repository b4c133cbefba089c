//! Color and blend model shared between the batch store and the backends.
//!
//! Scope:
//! - resolved 8-bit straight-alpha colors
//! - blend modes, per-batch overrides and the blend/noise state snapshot
//!
//! Geometry types remain in `coords`.

pub mod blend;
pub mod color;

pub use blend::{BlendMode, BlendOverride, BlendState, NoiseRange, ResolvedBlend};
pub use color::Rgba;

pub(crate) use blend::noise_offset;
