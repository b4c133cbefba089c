use super::{Parts, Renderer, SurfaceId};
use crate::backend::Backend;
use crate::batch::BatchKind;
use crate::coords::{PixelRect, SurfaceSize, Vec2};
use crate::error::{RenderError, Result};
use crate::geometry_cache::ShapeKind;
use crate::paint::Rgba;
use crate::raster::{self, CubicBezier, LineCap, Pixel, QuadTransform};
use crate::texture::ImageId;

/// Tip shape of the pen outlines and lines are drawn with.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum PenShape {
    /// Rasterized 1px strokes, whatever the size.
    #[default]
    Pixel,
    Square,
    Round,
}

/// Stroke settings of a surface.
///
/// Square and round pens wider than one pixel stroke lines and curves as
/// triangle geometry and stamp outlines with cached dots.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pen {
    pub size: u32,
    pub shape: PenShape,
}

impl Default for Pen {
    fn default() -> Self {
        Self::pixel()
    }
}

impl Pen {
    #[inline]
    pub const fn new(size: u32, shape: PenShape) -> Self {
        Self { size, shape }
    }

    #[inline]
    pub const fn pixel() -> Self {
        Self::new(1, PenShape::Pixel)
    }

    #[inline]
    pub const fn square(size: u32) -> Self {
        Self::new(size, PenShape::Square)
    }

    #[inline]
    pub const fn round(size: u32) -> Self {
        Self::new(size, PenShape::Round)
    }

    #[inline]
    fn is_thin(self) -> bool {
        self.shape == PenShape::Pixel || self.size <= 1
    }

    #[inline]
    fn half_width(self) -> f32 {
        self.size as f32 / 2.0
    }

    #[inline]
    fn cap(self) -> LineCap {
        match self.shape {
            PenShape::Round => LineCap::Round,
            _ => LineCap::Square,
        }
    }

    #[inline]
    fn dot(self) -> ShapeKind {
        match self.shape {
            PenShape::Round => ShapeKind::Circle,
            _ => ShapeKind::Square,
        }
    }
}

#[inline]
fn pixel_center(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 + 0.5, y as f32 + 0.5)
}

impl<B: Backend> Parts<'_, B> {
    /// Scratch pixels as single points into `kind`.
    fn plot(&mut self, kind: BatchKind, color: Rgba) {
        self.surface.emit_points(self.backend, kind, &self.scratch.pixels, color);
    }

    /// Scratch pixels stroked with the surface pen.
    fn outline(&mut self, color: Rgba) {
        let pen = self.surface.pen;
        if pen.is_thin() {
            self.plot(BatchKind::Points, color);
            return;
        }
        let dot = self.cache.get(pen.dot(), pen.size);
        self.surface.emit_stamps(self.backend, &dot, &self.scratch.pixels, color);
    }

    /// One pen dot per pixel in `at`.
    fn dots(&mut self, at: &[Pixel], color: Rgba) {
        let pen = self.surface.pen;
        let dot = self.cache.get(pen.dot(), pen.size);
        self.surface.emit_stamps(self.backend, &dot, at, color);
    }

    fn fill(&mut self, color: Rgba) {
        self.surface.emit_triangles(self.backend, &self.scratch.tris, color);
    }

    fn fill_spans(&mut self, color: Rgba) {
        self.scratch.tris.clear();
        raster::push_span_triangles(&mut self.scratch.tris, &self.scratch.spans, 0, 0);
        self.fill(color);
    }
}

impl<B: Backend> Renderer<B> {
    /// Plots one pixel under the surface blend state.
    pub fn draw_pixel(&mut self, id: SurfaceId, x: i32, y: i32, color: Rgba) {
        let Some(p) = self.parts(id) else { return };
        p.surface.emit_points(p.backend, BatchKind::Points, &[(x, y)], color);
    }

    /// Overwrites one pixel, alpha included, regardless of the blend state.
    pub fn put_pixel(&mut self, id: SurfaceId, x: i32, y: i32, color: Rgba) {
        let Some(p) = self.parts(id) else { return };
        p.surface.emit_points(p.backend, BatchKind::ReplacePoints, &[(x, y)], color);
    }

    /// Line between two pixels with the surface pen.
    ///
    /// A zero-length line draws nothing, except with a round pen, which
    /// leaves a single dot.
    pub fn draw_line(&mut self, id: SurfaceId, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgba) {
        let Some(mut p) = self.parts(id) else { return };
        let pen = p.surface.pen;

        if pen.is_thin() {
            if (x0, y0) == (x1, y1) {
                return;
            }
            p.scratch.pixels.clear();
            raster::pixel_line(x0, y0, x1, y1, &mut p.scratch.pixels);
            p.plot(BatchKind::Points, color);
            return;
        }

        p.scratch.tris.clear();
        let drawn = raster::thick_line(
            pixel_center(x0, y0),
            pixel_center(x1, y1),
            pen.half_width(),
            pen.cap(),
            &mut p.scratch.tris,
        );
        match (drawn, pen.shape) {
            (true, PenShape::Round) => {
                p.fill(color);
                p.dots(&[(x0, y0), (x1, y1)], color);
            }
            (true, _) => p.fill(color),
            (false, PenShape::Round) => p.dots(&[(x0, y0)], color),
            (false, _) => {}
        }
    }

    /// Rectangle outline with the surface pen. Non-positive sizes draw nothing.
    pub fn draw_rect(&mut self, id: SurfaceId, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        let Some(mut p) = self.parts(id) else { return };
        p.scratch.pixels.clear();
        raster::rect_outline(x, y, w, h, &mut p.scratch.pixels);
        p.outline(color);
    }

    /// Solid rectangle covering `(x, y)-(x + w, y + h)` as two triangles.
    pub fn draw_rect_filled(&mut self, id: SurfaceId, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        let Some(mut p) = self.parts(id) else { return };
        p.scratch.tris.clear();
        raster::rect_filled(x, y, w, h, &mut p.scratch.tris);
        p.fill(color);
    }

    pub fn draw_circle(&mut self, id: SurfaceId, cx: i32, cy: i32, r: i32, color: Rgba) {
        let Some(mut p) = self.parts(id) else { return };
        p.scratch.pixels.clear();
        raster::circle_outline(cx, cy, r, &mut p.scratch.pixels);
        p.outline(color);
    }

    /// Solid disc: the 1px border in `border`, the inside in `fill`.
    /// Radius 0 draws nothing.
    pub fn draw_circle_filled(&mut self, id: SurfaceId, cx: i32, cy: i32, r: i32, border: Rgba, fill: Rgba) {
        let Some(mut p) = self.parts(id) else { return };
        p.scratch.pixels.clear();
        p.scratch.spans.clear();
        raster::filled_circle(cx, cy, r, &mut p.scratch.pixels, &mut p.scratch.spans);
        p.plot(BatchKind::Points, border);
        p.fill_spans(fill);
    }

    /// Axis-aligned ellipse. With `fill` set the inside is filled and the
    /// 1px border drawn in `color`; otherwise the outline uses the pen.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_ellipse(
        &mut self,
        id: SurfaceId,
        cx: i32,
        cy: i32,
        rx: i32,
        ry: i32,
        color: Rgba,
        fill: Option<Rgba>,
    ) {
        let Some(mut p) = self.parts(id) else { return };
        p.scratch.pixels.clear();
        match fill {
            None => {
                raster::ellipse_outline(cx, cy, rx, ry, &mut p.scratch.pixels);
                p.outline(color);
            }
            Some(fill) => {
                p.scratch.spans.clear();
                raster::filled_ellipse(cx, cy, rx, ry, &mut p.scratch.pixels, &mut p.scratch.spans);
                p.plot(BatchKind::Points, color);
                p.fill_spans(fill);
            }
        }
    }

    /// Circle arc from `start_deg` to `end_deg`, degrees clockwise from +x.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_arc(
        &mut self,
        id: SurfaceId,
        cx: i32,
        cy: i32,
        r: i32,
        start_deg: f32,
        end_deg: f32,
        color: Rgba,
    ) {
        let Some(mut p) = self.parts(id) else { return };
        p.scratch.pixels.clear();
        raster::arc(cx, cy, r, start_deg, end_deg, &mut p.scratch.pixels);
        p.outline(color);
    }

    /// Cubic curve through pixel coordinates, flattened adaptively.
    pub fn draw_bezier(&mut self, id: SurfaceId, curve: &CubicBezier, color: Rgba) {
        let Some(mut p) = self.parts(id) else { return };
        let pen = p.surface.pen;
        let tess = p.config.tessellation;
        p.scratch.polyline.clear();

        if pen.is_thin() {
            if curve.is_degenerate() {
                return;
            }
            raster::tessellate(curve, tess.tolerance, tess.max_depth, &mut p.scratch.polyline);
            p.scratch.pixels.clear();
            raster::polyline_pixels(&p.scratch.polyline, &mut p.scratch.pixels);
            p.plot(BatchKind::Points, color);
            return;
        }

        let c = pixel_center(0, 0);
        let centered = CubicBezier::new(curve.p0 + c, curve.p1 + c, curve.p2 + c, curve.p3 + c);
        raster::tessellate(&centered, tess.tolerance, tess.max_depth, &mut p.scratch.polyline);
        p.scratch.tris.clear();
        let drawn = raster::stroke_polyline(
            &p.scratch.polyline,
            pen.half_width(),
            pen.cap(),
            tess.miter_limit,
            &mut p.scratch.tris,
        );
        if drawn {
            p.fill(color);
        } else if pen.shape == PenShape::Round {
            let at = (curve.p0.x.round() as i32, curve.p0.y.round() as i32);
            p.dots(&[at], color);
        }
    }

    /// Stamps the cached `kind` shape of `size` pixels centered on `(x, y)`.
    pub fn draw_cached_geometry(&mut self, id: SurfaceId, kind: ShapeKind, size: u32, x: i32, y: i32, color: Rgba) {
        let Some(p) = self.parts(id) else { return };
        let shape = p.cache.get(kind, size);
        p.surface.emit_stamps(p.backend, &shape, &[(x, y)], color);
    }

    /// Draws `image` unscaled with its top-left corner at `(x, y)`.
    pub fn draw_image(&mut self, id: SurfaceId, image: ImageId, x: f32, y: f32) -> Result<()> {
        let (w, h) = self.image_size(image)?;
        self.draw_sprite(id, image, None, &QuadTransform::at(x, y, w as f32, h as f32), Rgba::WHITE)
    }

    /// Draws `src` of `image` (the whole image when `None`) into the quad
    /// described by `transform`, multiplied by `tint`. Glyph quads enter
    /// here too.
    pub fn draw_sprite(
        &mut self,
        id: SurfaceId,
        image: ImageId,
        src: Option<PixelRect>,
        transform: &QuadTransform,
        tint: Rgba,
    ) -> Result<()> {
        let (w, h) = self.image_size(image)?;
        if !self.surfaces.contains_key(&id) {
            log::debug!("draw on unknown surface {id:?} ignored");
            return Ok(());
        }
        let src = match src {
            Some(rect) => match rect.clamp_to(SurfaceSize::new(w, h)) {
                Some(rect) => Some(rect),
                None => return Ok(()),
            },
            None => None,
        };

        let key = self.acquire_texture(id, image)?;
        let Some(p) = self.parts(id) else { return Ok(()) };
        p.scratch.textured.clear();
        raster::push_textured_quad(
            &raster::quad_corners(transform),
            &raster::uv_corners(src, w, h),
            &mut p.scratch.textured,
        );
        p.surface.emit_textured(p.backend, &p.scratch.textured, tint, key);
        Ok(())
    }

    fn image_size(&self, image: ImageId) -> Result<(u32, u32)> {
        self.image(image).map(|img| (img.width, img.height)).ok_or(RenderError::UnknownImage(image))
    }
}
