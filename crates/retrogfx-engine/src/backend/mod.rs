//! GPU seam.
//!
//! The renderer talks to graphics hardware only through [`Backend`]. Two
//! implementations ship with the crate:
//! - [`SoftwareBackend`], an immediate CPU rasterizer used as the reference in
//!   tests and for headless rendering without an adapter
//! - [`WgpuBackend`], render-to-texture on a headless wgpu device
//!
//! Coordinates crossing the seam are surface pixels with a top-left origin,
//! except for [`Backend::read_pixels`], whose rectangle and returned rows use
//! the backend's native [`RowOrder`].

mod software;
mod gpu;

pub use software::{SoftwareBackend, SoftwareStats};
pub use gpu::WgpuBackend;

use core::ops::Range;

use anyhow::Result;

use crate::batch::{BatchKind, BatchView, Topology};
use crate::coords::{PixelRect, SurfaceSize};
use crate::paint::ResolvedBlend;
use crate::texture::{ImageData, TextureKey};

/// Opaque handle to an offscreen render target owned by a backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(pub(crate) u32);

/// Storage order of rows in a backend's framebuffers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RowOrder {
    /// Row 0 is the top of the surface.
    TopDown,
    /// Row 0 is the bottom of the surface (GL-style framebuffers).
    BottomUp,
}

/// One replayed draw-order segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub batch: BatchKind,
    pub topology: Topology,
    /// Vertex range within the uploaded batch.
    pub range: Range<usize>,
    pub blend: ResolvedBlend,
    /// Bound texture, for the image batch.
    pub texture: Option<TextureKey>,
}

/// Graphics-device operations the renderer needs.
///
/// A flush brackets its work between [`begin_flush`](Backend::begin_flush)
/// and [`end_flush`](Backend::end_flush): every non-empty batch is uploaded
/// once, then draws replay in issue order against the uploaded data.
pub trait Backend {
    fn row_order(&self) -> RowOrder;

    /// The device is gone; every target and texture is invalid until the
    /// host restores it and surfaces are reinitialized.
    fn is_context_lost(&self) -> bool;

    /// Allocates a transparent-black target.
    fn create_target(&mut self, size: SurfaceSize) -> Result<TargetId>;

    /// Reallocates `target` at `size`. Prior contents are discarded.
    fn resize_target(&mut self, target: TargetId, size: SurfaceSize) -> Result<()>;

    fn destroy_target(&mut self, target: TargetId);

    /// Fills `target` with transparent black.
    fn clear_target(&mut self, target: TargetId);

    /// Copies `region` of `src` to `(dst_x, dst_y)` in `dst`, clipped to both
    /// targets. Coordinates are top-left based.
    fn copy_region(&mut self, src: TargetId, dst: TargetId, region: PixelRect, dst_x: i32, dst_y: i32);

    fn create_texture(&mut self, key: TextureKey, image: &ImageData) -> Result<()>;

    fn delete_texture(&mut self, key: TextureKey);

    /// Starts drawing into `target`, clearing it first when `clear` is set.
    fn begin_flush(&mut self, target: TargetId, clear: bool);

    /// Uploads the live range of a batch for the current flush.
    fn upload(&mut self, batch: BatchView<'_>);

    fn draw(&mut self, call: &DrawCall);

    fn end_flush(&mut self);

    /// Copies `src` into `dst` as a fullscreen quad with blending disabled.
    fn composite(&mut self, src: TargetId, dst: TargetId);

    /// RGBA8 pixels of `region`, where `region.y` counts native rows.
    /// Rows come back in native order, tightly packed.
    fn read_pixels(&mut self, target: TargetId, region: PixelRect) -> Result<Vec<u8>>;
}
