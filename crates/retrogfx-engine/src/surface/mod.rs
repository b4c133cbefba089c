//! Per-surface state: render targets, batches, draw order and the blend/pen
//! snapshot drawing happens under.
//!
//! Every surface owns three targets of identical size:
//! - `primary`, which all drawing flushes into
//! - `scratch`, staging for resize and scroll copies
//! - `canvas`, the composited output hosts display

mod batching;
mod lifecycle;
mod readback;

use std::collections::HashMap;

use crate::backend::{Backend, TargetId};
use crate::batch::{BatchSet, DrawOrder};
use crate::config::RendererConfig;
use crate::coords::SurfaceSize;
use crate::error::{RenderError, Result};
use crate::paint::BlendState;
use crate::renderer::Pen;
use crate::texture::{ImageId, TextureKey};

#[derive(Debug, Copy, Clone)]
pub(crate) struct Targets {
    pub primary: TargetId,
    pub scratch: TargetId,
    pub canvas: TargetId,
}

impl Targets {
    fn create<B: Backend>(backend: &mut B, size: SurfaceSize) -> Result<Self> {
        let mut made = Vec::with_capacity(3);
        for _ in 0..3 {
            match backend.create_target(size) {
                Ok(id) => made.push(id),
                Err(e) => {
                    for id in made {
                        backend.destroy_target(id);
                    }
                    return Err(target_error(size, e));
                }
            }
        }
        Ok(Self { primary: made[0], scratch: made[1], canvas: made[2] })
    }

    fn destroy<B: Backend>(self, backend: &mut B) {
        backend.destroy_target(self.primary);
        backend.destroy_target(self.scratch);
        backend.destroy_target(self.canvas);
    }
}

pub(crate) fn target_error(size: SurfaceSize, e: anyhow::Error) -> RenderError {
    RenderError::TargetCreation { width: size.width, height: size.height, reason: format!("{e:#}") }
}

#[derive(Debug)]
pub(crate) struct Surface {
    pub size: SurfaceSize,
    pub targets: Targets,

    pub batches: BatchSet,
    pub order: DrawOrder,

    pub blend: BlendState,
    pub pen: Pen,

    /// The next flush with content clears the primary target first.
    pub first_render: bool,
    /// A present task for this surface sits in the microtask queue.
    pub render_scheduled: bool,
    /// Targets died with the graphics context; drawing is discarded until
    /// the surface is reinitialized.
    pub context_lost: bool,

    /// Textures this surface holds a registry reference to.
    pub textures: HashMap<ImageId, TextureKey>,
}

impl Surface {
    pub fn new<B: Backend>(backend: &mut B, size: SurfaceSize, config: &RendererConfig) -> Result<Self> {
        if !size.is_valid() {
            return Err(RenderError::TargetCreation {
                width: size.width,
                height: size.height,
                reason: "surface must be at least 1x1".into(),
            });
        }
        let targets = Targets::create(backend, size)?;
        Ok(Self {
            size,
            targets,
            batches: BatchSet::new(config),
            order: DrawOrder::new(),
            blend: BlendState::default(),
            pen: Pen::default(),
            first_render: true,
            render_scheduled: false,
            context_lost: false,
            textures: HashMap::new(),
        })
    }

    /// Frees the render targets. Texture references are returned to the
    /// caller, which owns the registry.
    pub fn destroy<B: Backend>(mut self, backend: &mut B) -> HashMap<ImageId, TextureKey> {
        self.render_scheduled = false;
        if !backend.is_context_lost() {
            self.targets.destroy(backend);
        }
        self.textures
    }
}
