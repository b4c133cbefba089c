//! Rasterization algorithms.
//!
//! Pure shape-to-vertex expanders: every function writes into caller-owned
//! buffers and never touches a batch or a backend. Output comes in three
//! shapes:
//! - [`Pixel`]s, integer pixel addresses for the points batches
//! - [`Span`]s, inclusive horizontal pixel runs turned into quads
//! - triangle lists of [`Vec2`] in pixel-edge coordinates
//!
//! Integer inputs address pixels; triangle output uses pixel-edge space
//! where pixel `(x, y)` covers `[x, x + 1) × [y, y + 1)`.

mod bezier;
mod circle;
mod ellipse;
mod line;
mod quad;
mod spans;

pub use bezier::{CubicBezier, polyline_pixels, stroke_polyline, tessellate};
pub use circle::{ArcSpan, arc, circle_outline, disc_spans, filled_circle};
pub use ellipse::{ellipse_outline, filled_ellipse};
pub use line::{LineCap, pixel_line, rect_filled, rect_outline, thick_line};
pub use quad::{QuadTransform, push_textured_quad, quad_corners, uv_corners};
pub use spans::{ScanlineSpans, Span};

use std::collections::HashSet;

use crate::coords::Vec2;

/// Integer pixel address.
pub type Pixel = (i32, i32);

/// Appends pixels to `out`, dropping any already emitted during this call.
pub(crate) struct PixelSink<'a> {
    seen: HashSet<Pixel>,
    out: &'a mut Vec<Pixel>,
}

impl<'a> PixelSink<'a> {
    #[inline]
    pub(crate) fn new(out: &'a mut Vec<Pixel>) -> Self {
        Self { seen: HashSet::new(), out }
    }

    #[inline]
    pub(crate) fn plot(&mut self, x: i32, y: i32) {
        if self.seen.insert((x, y)) {
            self.out.push((x, y));
        }
    }
}

/// Two triangles covering the axis-aligned box `[x0, x1) × [y0, y1)`.
#[inline]
pub fn push_rect_triangles(out: &mut Vec<Vec2>, x0: f32, y0: f32, x1: f32, y1: f32) {
    out.extend_from_slice(&[
        Vec2::new(x0, y0),
        Vec2::new(x1, y0),
        Vec2::new(x1, y1),
        Vec2::new(x0, y0),
        Vec2::new(x1, y1),
        Vec2::new(x0, y1),
    ]);
}

/// Quads for `spans`, translated by `(dx, dy)`.
pub fn push_span_triangles(out: &mut Vec<Vec2>, spans: &[Span], dx: i32, dy: i32) {
    for s in spans {
        push_rect_triangles(
            out,
            (s.x0 + dx) as f32,
            (s.y + dy) as f32,
            (s.x1 + dx + 1) as f32,
            (s.y + dy + 1) as f32,
        );
    }
}
