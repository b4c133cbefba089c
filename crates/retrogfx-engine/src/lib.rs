//! Retrogfx engine crate.
//!
//! A retained-mode 2D rendering core for retro-style graphics. Drawing calls
//! are expanded into vertices, batched per primitive kind and flushed in
//! issue order to an offscreen render target, which is composited onto the
//! visible canvas. GPU access goes through the [`backend::Backend`] seam.

pub mod backend;
pub mod batch;
pub mod config;
pub mod coords;
pub mod device;
pub mod error;
pub mod geometry_cache;
pub mod logging;
pub mod paint;
pub mod raster;
pub mod renderer;
pub mod texture;

mod surface;

pub use backend::{Backend, SoftwareBackend, WgpuBackend};
pub use config::RendererConfig;
pub use error::{RenderError, Result};
pub use geometry_cache::ShapeKind;
pub use paint::{BlendMode, BlendState, NoiseRange, Rgba};
pub use renderer::{Pen, PenShape, Renderer, SurfaceId};
pub use texture::{ImageData, ImageId};
