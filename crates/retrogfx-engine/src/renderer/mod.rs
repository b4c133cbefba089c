//! Public rendering API.
//!
//! [`Renderer`] owns one graphics context (a [`Backend`]), the surfaces drawn
//! through it, the shared texture registry and the geometry cache. Drawing
//! calls only append vertices; they reach the render targets when a surface
//! flushes, which happens on demand (`flush_batches`, reads, blend changes,
//! texture creation, capacity overflow) or from the microtask queue.

mod draw;
mod readback;
mod schedule;

pub use draw::{Pen, PenShape};

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::backend::{Backend, TargetId};
use crate::batch::{Batch, BatchKind};
use crate::config::RendererConfig;
use crate::coords::{SurfaceSize, Vec2};
use crate::error::{RenderError, Result};
use crate::geometry_cache::GeometryCache;
use crate::paint::{BlendMode, BlendState};
use crate::raster::{Pixel, Span};
use crate::surface::Surface;
use crate::texture::{ImageData, ImageId, TextureKey, TextureRegistry};

use schedule::Microtask;

/// Handle to a surface created by a [`Renderer`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u32);

/// Reusable expansion buffers, cleared before each use.
#[derive(Debug, Default)]
struct Scratch {
    pixels: Vec<Pixel>,
    spans: Vec<Span>,
    tris: Vec<Vec2>,
    polyline: Vec<Vec2>,
    textured: Vec<(Vec2, [f32; 2])>,
}

/// Disjoint borrows handed to drawing code for one surface.
struct Parts<'a, B> {
    surface: &'a mut Surface,
    backend: &'a mut B,
    scratch: &'a mut Scratch,
    cache: &'a mut GeometryCache,
    config: &'a RendererConfig,
}

/// Retained-mode 2D renderer over one graphics context.
#[derive(Debug)]
pub struct Renderer<B: Backend> {
    backend: B,
    config: RendererConfig,

    surfaces: HashMap<SurfaceId, Surface>,
    next_surface: u32,

    textures: TextureRegistry,
    cache: GeometryCache,
    microtasks: VecDeque<Microtask>,
    scratch: Scratch,

    /// Context loss already propagated to every surface.
    context_lost: bool,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let mut cache = GeometryCache::new();
        cache.prewarm(config.prewarm_max_size);
        Self {
            backend,
            config,
            surfaces: HashMap::new(),
            next_surface: 0,
            textures: TextureRegistry::new(),
            cache,
            microtasks: VecDeque::new(),
            scratch: Scratch::default(),
            context_lost: false,
        }
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    #[inline]
    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.cache
    }

    #[inline]
    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    fn parts(&mut self, id: SurfaceId) -> Option<Parts<'_, B>> {
        let Some(surface) = self.surfaces.get_mut(&id) else {
            log::debug!("draw on unknown surface {id:?} ignored");
            return None;
        };
        Some(Parts {
            surface,
            backend: &mut self.backend,
            scratch: &mut self.scratch,
            cache: &mut self.cache,
            config: &self.config,
        })
    }

    // ── surfaces ──────────────────────────────────────────────────────────

    /// Allocates a `width × height` surface with its primary, scratch and
    /// canvas targets.
    pub fn create_surface(&mut self, width: u32, height: u32) -> Result<SurfaceId> {
        let surface = Surface::new(&mut self.backend, SurfaceSize::new(width, height), &self.config)?;
        let id = SurfaceId(self.next_surface);
        self.next_surface += 1;
        self.surfaces.insert(id, surface);
        log::debug!("created surface {id:?} ({width}x{height})");
        Ok(id)
    }

    /// Frees the surface's targets and releases its texture references.
    /// A pending present task for it becomes a no-op.
    pub fn destroy_surface(&mut self, id: SurfaceId) -> bool {
        let Some(surface) = self.surfaces.remove(&id) else { return false };
        for (image, _) in surface.destroy(&mut self.backend) {
            if let Some(key) = self.textures.release(image) {
                log::debug!("texture {key:?} of {image:?} unreferenced, deleting");
                self.backend.delete_texture(key);
            }
        }
        log::debug!("destroyed surface {id:?}");
        true
    }

    /// Recreates the surface's targets after a context loss and clears its
    /// lost flag. Contents start transparent.
    pub fn reinitialize_surface(&mut self, id: SurfaceId) -> Result<()> {
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        for (image, _) in surface.textures.drain() {
            if let Some(key) = self.textures.release(image) {
                self.backend.delete_texture(key);
            }
        }
        surface.reinitialize(&mut self.backend)?;
        log::info!("surface {id:?} reinitialized");
        Ok(())
    }

    /// Polls the backend for context loss and propagates it: every surface
    /// is marked lost and every live texture is forgotten. Returns whether
    /// the context is currently lost.
    pub fn check_context(&mut self) -> bool {
        let lost = self.backend.is_context_lost();
        if lost && !self.context_lost {
            log::warn!("graphics context lost; {} surface(s) need reinitializing", self.surfaces.len());
            for surface in self.surfaces.values_mut() {
                surface.context_lost = true;
                surface.reset_batches();
                surface.textures.clear();
            }
            let evicted = self.textures.evict_all();
            log::debug!("{evicted} texture(s) died with the context");
        }
        self.context_lost = lost;
        lost
    }

    #[inline]
    pub fn surface_size(&self, id: SurfaceId) -> Option<SurfaceSize> {
        self.surfaces.get(&id).map(|s| s.size)
    }

    /// Target holding the composited output, for hosts that present it.
    #[inline]
    pub fn canvas_target(&self, id: SurfaceId) -> Option<TargetId> {
        self.surfaces.get(&id).map(|s| s.targets.canvas)
    }

    #[inline]
    pub fn is_surface_lost(&self, id: SurfaceId) -> bool {
        self.surfaces.get(&id).is_some_and(|s| s.context_lost)
    }

    /// Pending vertices in one batch of a surface.
    pub fn batch_count(&self, id: SurfaceId, kind: BatchKind) -> usize {
        self.surfaces.get(&id).map_or(0, |s| s.batches.get(kind).count())
    }

    // ── images ────────────────────────────────────────────────────────────

    pub fn register_image(&mut self, image: ImageData) -> ImageId {
        self.textures.register(image)
    }

    #[inline]
    pub fn image(&self, image: ImageId) -> Option<&ImageData> {
        self.textures.image(image).map(|img| img.as_ref())
    }

    /// Frees the GPU texture of `image` everywhere. Surfaces with pending
    /// draws of it flush first; the image stays registered and is uploaded
    /// again on its next draw.
    pub fn delete_texture(&mut self, image: ImageId) {
        let Some(key) = self.textures.texture_key(image) else { return };
        for surface in self.surfaces.values_mut() {
            if surface.textures.remove(&image).is_some() && surface.order.references(key) {
                surface.flush(&mut self.backend, None);
            }
        }
        if let Some(key) = self.textures.evict(image) {
            log::debug!("deleting texture {key:?} of {image:?}");
            self.backend.delete_texture(key);
        }
    }

    /// Deletes the texture of `image` and forgets the image.
    pub fn unregister_image(&mut self, image: ImageId) -> Option<ImageData> {
        self.delete_texture(image);
        self.textures.unregister(image).map(Arc::unwrap_or_clone)
    }

    /// Key of the surface's texture for `image`, uploading it on first use.
    fn acquire_texture(&mut self, id: SurfaceId, image: ImageId) -> Result<TextureKey> {
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        if let Some(&key) = surface.textures.get(&image) {
            return Ok(key);
        }

        let key = match self.textures.texture_key(image) {
            Some(key) => key,
            None => {
                let data = self.textures.image(image).ok_or(RenderError::UnknownImage(image))?.clone();
                surface.flush(&mut self.backend, None);
                let key = self.textures.allocate_key();
                self.backend.create_texture(key, &data).map_err(|e| RenderError::TextureCreation {
                    image,
                    reason: format!("{e:#}"),
                })?;
                log::debug!("uploaded {image:?} as {key:?} ({}x{})", data.width, data.height);
                key
            }
        };
        let key = self.textures.acquire(image, key);
        surface.textures.insert(image, key);
        Ok(key)
    }

    // ── batches ───────────────────────────────────────────────────────────

    /// Guarantees room for `count` more vertices in `kind` on surface `id`
    /// and returns the batch to append to. `image` binds the image batch to
    /// that image's texture.
    pub fn prepare_batch(
        &mut self,
        id: SurfaceId,
        kind: BatchKind,
        count: usize,
        image: Option<ImageId>,
    ) -> Result<&mut Batch> {
        let texture = match image {
            Some(image) if kind.is_textured() => Some(self.acquire_texture(id, image)?),
            _ => None,
        };
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        Ok(surface.prepare_batch(&mut self.backend, kind, count, texture))
    }

    /// Draws everything pending on the surface. `blend` overrides the
    /// surface blend mode for segments without their own override.
    pub fn flush_batches(&mut self, id: SurfaceId, blend: Option<BlendMode>) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.flush(&mut self.backend, blend);
        }
    }

    /// Discards everything pending on the surface.
    pub fn reset_batches(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.reset_batches();
        }
    }

    /// Flushes, then copies the primary target onto the visible canvas.
    pub fn display_to_canvas(&mut self, id: SurfaceId) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.composite(&mut self.backend);
        }
    }

    /// Commits a new blend/noise state. Geometry already batched is flushed
    /// under the previous state first.
    pub fn set_blend(&mut self, id: SurfaceId, state: BlendState) {
        let Some(surface) = self.surfaces.get_mut(&id) else { return };
        if surface.blend == state {
            return;
        }
        surface.flush(&mut self.backend, None);
        surface.blend = state;
    }

    #[inline]
    pub fn blend(&self, id: SurfaceId) -> Option<BlendState> {
        self.surfaces.get(&id).map(|s| s.blend)
    }

    pub fn set_pen(&mut self, id: SurfaceId, pen: Pen) {
        if let Some(surface) = self.surfaces.get_mut(&id) {
            surface.pen = pen;
        }
    }

    #[inline]
    pub fn pen(&self, id: SurfaceId) -> Option<Pen> {
        self.surfaces.get(&id).map(|s| s.pen)
    }

    // ── render targets ────────────────────────────────────────────────────

    /// Scrolls the surface contents up by `rows`; the bottom rows become
    /// transparent.
    pub fn shift_image_up(&mut self, id: SurfaceId, rows: u32) -> Result<()> {
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        surface.shift_up(&mut self.backend, rows);
        Ok(())
    }

    /// Resizes the surface, keeping the top-left overlap of its contents.
    pub fn resize_screen(&mut self, id: SurfaceId, width: u32, height: u32) -> Result<()> {
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        surface.resize(&mut self.backend, SurfaceSize::new(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::paint::Rgba;

    fn renderer() -> Renderer<SoftwareBackend> {
        Renderer::new(SoftwareBackend::new(), RendererConfig::default())
    }

    fn checker() -> ImageData {
        let mut img = ImageData::filled(2, 2, Rgba::opaque(255, 0, 0));
        img.set_pixel(1, 0, Rgba::opaque(0, 0, 255));
        img.set_pixel(0, 1, Rgba::opaque(0, 0, 255));
        img
    }

    #[test]
    fn create_and_destroy_surface() {
        let mut r = renderer();
        let id = r.create_surface(8, 4).unwrap();
        assert_eq!(r.surface_size(id), Some(SurfaceSize::new(8, 4)));
        assert_eq!(r.backend().target_count(), 3);

        assert!(r.destroy_surface(id));
        assert!(!r.destroy_surface(id));
        assert_eq!(r.backend().target_count(), 0);
        assert_eq!(r.surface_size(id), None);
    }

    #[test]
    fn zero_sized_surface_fails() {
        let mut r = renderer();
        assert!(matches!(r.create_surface(0, 4), Err(RenderError::TargetCreation { .. })));
        assert_eq!(r.backend().target_count(), 0);
    }

    #[test]
    fn renderer_prewarms_pen_dots() {
        let r = renderer();
        assert!(!r.geometry_cache().is_empty());
    }

    #[test]
    fn texture_is_shared_and_refcounted() {
        let mut r = renderer();
        let a = r.create_surface(4, 4).unwrap();
        let b = r.create_surface(4, 4).unwrap();
        let img = r.register_image(checker());

        r.draw_image(a, img, 0.0, 0.0).unwrap();
        r.draw_image(a, img, 2.0, 2.0).unwrap();
        r.draw_image(b, img, 0.0, 0.0).unwrap();
        assert_eq!(r.textures().ref_count(img), 2);
        assert_eq!(r.backend().texture_count(), 1);

        r.destroy_surface(a);
        assert_eq!(r.textures().ref_count(img), 1);
        assert_eq!(r.backend().texture_count(), 1);
        r.destroy_surface(b);
        assert_eq!(r.backend().texture_count(), 0);
    }

    #[test]
    fn delete_texture_flushes_pending_use() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        let img = r.register_image(checker());
        r.draw_image(id, img, 0.0, 0.0).unwrap();
        assert_eq!(r.batch_count(id, BatchKind::Image), 6);

        r.delete_texture(img);
        assert_eq!(r.batch_count(id, BatchKind::Image), 0);
        assert_eq!(r.backend().texture_count(), 0);
        assert_eq!(r.textures().texture_key(img), None);
        assert_eq!(r.read_pixel(id, 1, 0).unwrap(), Some(Rgba::opaque(0, 0, 255)));

        // Drawing again uploads a fresh texture.
        r.draw_image(id, img, 2.0, 2.0).unwrap();
        assert_eq!(r.backend().texture_count(), 1);
    }

    #[test]
    fn unknown_image_is_an_error() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        let img = r.register_image(checker());
        r.unregister_image(img);
        assert!(matches!(r.draw_image(id, img, 0.0, 0.0), Err(RenderError::UnknownImage(_))));
    }

    #[test]
    fn prepare_batch_on_unknown_surface() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        r.destroy_surface(id);
        assert!(matches!(
            r.prepare_batch(id, BatchKind::Points, 1, None),
            Err(RenderError::UnknownSurface(_))
        ));
    }

    #[test]
    fn manual_batch_append() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        let batch = r.prepare_batch(id, BatchKind::Points, 2, None).unwrap();
        batch.push([0.5, 0.5], [1.0; 4]);
        batch.push([3.5, 3.5], [1.0; 4]);
        r.flush_batches(id, None);
        assert_eq!(r.read_pixel(id, 3, 3).unwrap(), Some(Rgba::WHITE));
    }

    #[test]
    fn flush_override_applies_to_plain_segments() {
        let mut r = renderer();
        let id = r.create_surface(2, 1).unwrap();
        r.draw_pixel(id, 0, 0, Rgba::WHITE);
        r.flush_batches(id, None);

        r.draw_pixel(id, 0, 0, Rgba::new(0, 0, 0, 0));
        r.flush_batches(id, Some(BlendMode::Replace));
        assert_eq!(r.read_pixel(id, 0, 0).unwrap(), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn blend_change_flushes_under_previous_state() {
        let mut r = renderer();
        let id = r.create_surface(2, 1).unwrap();
        r.draw_pixel(id, 0, 0, Rgba::WHITE);
        r.draw_pixel(id, 0, 0, Rgba::new(0, 0, 0, 0));
        r.set_blend(id, BlendState::new(BlendMode::Replace));
        assert_eq!(r.batch_count(id, BatchKind::Points), 0);
        assert_eq!(r.read_pixel(id, 0, 0).unwrap(), Some(Rgba::WHITE));

        r.draw_pixel(id, 1, 0, Rgba::WHITE);
        r.draw_pixel(id, 1, 0, Rgba::new(0, 0, 0, 0));
        assert_eq!(r.read_pixel(id, 1, 0).unwrap(), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn display_to_canvas_copies_primary() {
        let mut r = renderer();
        let id = r.create_surface(3, 3).unwrap();
        r.put_pixel(id, 1, 2, Rgba::opaque(9, 8, 7));
        let canvas = r.canvas_target(id).unwrap();
        assert_eq!(r.backend().pixel(canvas, 1, 2), Some(Rgba::TRANSPARENT));

        r.display_to_canvas(id);
        assert_eq!(r.backend().pixel(canvas, 1, 2), Some(Rgba::opaque(9, 8, 7)));
        assert_eq!(r.backend().stats().composites, 1);
    }

    #[test]
    fn context_loss_and_recovery() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        let img = r.register_image(checker());
        r.draw_image(id, img, 0.0, 0.0).unwrap();
        r.flush_batches(id, None);

        r.backend_mut().lose_context();
        assert!(r.check_context());
        assert!(r.is_surface_lost(id));
        assert_eq!(r.textures().texture_key(img), None);
        assert!(matches!(r.read_pixel(id, 0, 0), Err(RenderError::ContextLost)));

        r.draw_pixel(id, 0, 0, Rgba::WHITE);
        r.flush_batches(id, None);
        assert_eq!(r.batch_count(id, BatchKind::Points), 0);

        r.backend_mut().restore_context();
        assert!(!r.check_context());
        r.reinitialize_surface(id).unwrap();
        assert!(!r.is_surface_lost(id));
        assert_eq!(r.read_pixel(id, 0, 0).unwrap(), Some(Rgba::TRANSPARENT));

        r.draw_image(id, img, 0.0, 0.0).unwrap();
        assert_eq!(r.read_pixel(id, 0, 0).unwrap(), Some(Rgba::opaque(255, 0, 0)));
    }

    #[test]
    fn resize_and_scroll_through_renderer() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        r.put_pixel(id, 0, 3, Rgba::WHITE);
        r.shift_image_up(id, 3).unwrap();
        assert_eq!(r.read_pixel(id, 0, 0).unwrap(), Some(Rgba::WHITE));
        assert_eq!(r.read_pixel(id, 0, 3).unwrap(), Some(Rgba::TRANSPARENT));

        r.resize_screen(id, 2, 2).unwrap();
        r.resize_screen(id, 4, 4).unwrap();
        assert_eq!(r.read_pixel(id, 0, 0).unwrap(), Some(Rgba::WHITE));
        assert!(r.resize_screen(id, 0, 4).is_err());
    }
}
