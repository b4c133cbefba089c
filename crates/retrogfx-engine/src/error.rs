use thiserror::Error;

use crate::geometry_cache::ShapeKind;
use crate::renderer::SurfaceId;
use crate::texture::ImageId;

/// Errors surfaced by the rendering core.
///
/// Capacity overflow never appears here: it is recovered by an early flush.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Render-target (framebuffer) allocation failed; the surface is unusable.
    #[error("failed to create render target {width}x{height}: {reason}")]
    TargetCreation { width: u32, height: u32, reason: String },

    /// Texture upload failed for an image.
    #[error("failed to create texture for {image:?}: {reason}")]
    TextureCreation { image: ImageId, reason: String },

    /// The backend could not copy pixels back to the CPU.
    #[error("pixel readback failed: {0}")]
    Readback(String),

    #[error("unknown surface {0:?}")]
    UnknownSurface(SurfaceId),

    #[error("unknown image {0:?}")]
    UnknownImage(ImageId),

    /// A geometry-cache kind id outside the known set.
    #[error("invalid geometry cache shape kind {0} (known: {known:?})", known = ShapeKind::ALL)]
    InvalidShapeKind(u8),

    /// The graphics context was lost; the surface must be reinitialized.
    #[error("graphics context lost")]
    ContextLost,
}

pub type Result<T, E = RenderError> = std::result::Result<T, E>;
