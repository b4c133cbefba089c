use super::Surface;
use crate::backend::{Backend, DrawCall};
use crate::batch::{Batch, BatchKind, Reserve};
use crate::coords::Vec2;
use crate::paint::{BlendMode, ResolvedBlend, Rgba};
use crate::raster::Pixel;
use crate::texture::TextureKey;

impl Surface {
    /// Guarantees room for `count` more vertices in `kind` and an open
    /// segment covering them.
    pub fn prepare_batch<B: Backend>(
        &mut self,
        backend: &mut B,
        kind: BatchKind,
        count: usize,
        texture: Option<TextureKey>,
    ) -> &mut Batch {
        while self.batches.get_mut(kind).reserve(count) == Reserve::NeedsFlush {
            log::debug!("{} batch full, flushing early", kind.label());
            self.flush(backend, None);
        }

        if self.order.needs_switch(kind, texture) {
            if let Some(prev) = self.order.active_batch() {
                self.order.close(self.batches.get(prev).count());
            }
            self.order.open(kind, self.batches.get(kind).count(), texture);
        }
        self.batches.get_mut(kind)
    }

    /// Uploads pending batches and replays segments in issue order.
    pub fn flush<B: Backend>(&mut self, backend: &mut B, flush_override: Option<BlendMode>) {
        if self.order.is_empty() && self.batches.is_empty() {
            return;
        }
        if let Some(active) = self.order.active_batch() {
            self.order.close(self.batches.get(active).count());
        }

        if self.context_lost || backend.is_context_lost() {
            log::debug!("flush on a lost context, pending drawing discarded");
            self.reset_batches();
            return;
        }

        backend.begin_flush(self.targets.primary, self.first_render);
        self.first_render = false;

        for batch in self.batches.iter().filter(|b| !b.is_empty()) {
            backend.upload(batch.view());
        }
        for seg in self.order.segments().iter().filter(|s| !s.is_empty()) {
            backend.draw(&DrawCall {
                batch: seg.batch,
                topology: seg.batch.topology(),
                range: seg.range(),
                blend: ResolvedBlend::resolve(seg.blend_override, flush_override, &self.blend),
                texture: seg.texture,
            });
        }
        backend.end_flush();

        self.reset_batches();
    }

    /// Drops pending vertices without drawing them.
    pub fn reset_batches(&mut self) {
        self.batches.reset();
        self.order.clear();
    }

    /// Single pixels at their centers; off-surface pixels are dropped.
    pub fn emit_points<B: Backend>(&mut self, backend: &mut B, kind: BatchKind, pixels: &[Pixel], color: Rgba) {
        let size = self.size;
        let visible = |&&(x, y): &&Pixel| size.contains(x, y);
        let n = pixels.iter().filter(visible).count();
        if n == 0 {
            return;
        }
        let c = color.to_f32();
        let batch = self.prepare_batch(backend, kind, n, None);
        for &(x, y) in pixels.iter().filter(visible) {
            batch.push([x as f32 + 0.5, y as f32 + 0.5], c);
        }
    }

    /// Solid triangle list into the geometry batch.
    pub fn emit_triangles<B: Backend>(&mut self, backend: &mut B, verts: &[Vec2], color: Rgba) {
        if verts.is_empty() {
            return;
        }
        let c = color.to_f32();
        let batch = self.prepare_batch(backend, BatchKind::Geometry, verts.len(), None);
        for v in verts {
            batch.push(v.to_array(), c);
        }
    }

    /// One copy of `shape` (origin-relative triangles) per pixel in `at`.
    pub fn emit_stamps<B: Backend>(&mut self, backend: &mut B, shape: &[[f32; 2]], at: &[Pixel], color: Rgba) {
        if shape.is_empty() || at.is_empty() {
            return;
        }
        let c = color.to_f32();
        let batch = self.prepare_batch(backend, BatchKind::Geometry, shape.len() * at.len(), None);
        for &(x, y) in at {
            let (dx, dy) = (x as f32, y as f32);
            for v in shape {
                batch.push([v[0] + dx, v[1] + dy], c);
            }
        }
    }

    /// Textured triangles bound to `texture`, tinted by `color`.
    pub fn emit_textured<B: Backend>(
        &mut self,
        backend: &mut B,
        verts: &[(Vec2, [f32; 2])],
        color: Rgba,
        texture: TextureKey,
    ) {
        if verts.is_empty() {
            return;
        }
        let c = color.to_f32();
        let batch = self.prepare_batch(backend, BatchKind::Image, verts.len(), Some(texture));
        for (pos, uv) in verts {
            batch.push_textured(pos.to_array(), *uv, c);
        }
    }
}
