//! Coordinate and geometry types shared by the rasterizers, batches and backends.
//!
//! Canonical CPU space:
//! - Surface pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Integer positions address pixels; the pixel `(x, y)` covers
//! `[x, x + 1) × [y, y + 1)` and its center sits at `(x + 0.5, y + 0.5)`.

mod rect;
mod size;
mod vec2;

pub use rect::PixelRect;
pub use size::SurfaceSize;
pub use vec2::Vec2;
