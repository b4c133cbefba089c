use std::f32::consts::PI;

use super::line::{LineCap, pixel_line};
use super::{Pixel, PixelSink};
use crate::coords::Vec2;

/// Cubic Bézier curve with two interior control points.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CubicBezier {
    pub p0: Vec2,
    pub p1: Vec2,
    pub p2: Vec2,
    pub p3: Vec2,
}

impl CubicBezier {
    pub const fn new(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// All four control points coincide.
    pub fn is_degenerate(&self) -> bool {
        let eps = f32::EPSILON;
        (self.p1 - self.p0).length_squared() <= eps
            && (self.p2 - self.p0).length_squared() <= eps
            && (self.p3 - self.p0).length_squared() <= eps
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let u = 1.0 - t;
        self.p0 * (u * u * u)
            + self.p1 * (3.0 * u * u * t)
            + self.p2 * (3.0 * u * t * t)
            + self.p3 * (t * t * t)
    }

    /// de Casteljau split at `t = 0.5`.
    pub fn split(&self) -> (CubicBezier, CubicBezier) {
        let p01 = self.p0.lerp(self.p1, 0.5);
        let p12 = self.p1.lerp(self.p2, 0.5);
        let p23 = self.p2.lerp(self.p3, 0.5);
        let p012 = p01.lerp(p12, 0.5);
        let p123 = p12.lerp(p23, 0.5);
        let mid = p012.lerp(p123, 0.5);
        (
            CubicBezier::new(self.p0, p01, p012, mid),
            CubicBezier::new(mid, p123, p23, self.p3),
        )
    }

    /// Both interior control points lie within `sqrt(tolerance)` of the
    /// chord `p0..p3`.
    pub fn is_flat(&self, tolerance: f32) -> bool {
        distance_squared_to_segment(self.p1, self.p0, self.p3) <= tolerance
            && distance_squared_to_segment(self.p2, self.p0, self.p3) <= tolerance
    }
}

fn distance_squared_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 <= f32::EPSILON {
        return (p - a).length_squared();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length_squared()
}

/// Flattens `curve` into a polyline appended to `out`, endpoints included.
///
/// Subdivision stops once a piece is flat within `tolerance` (a squared
/// distance in pixels²) or `max_depth` halvings deep.
pub fn tessellate(curve: &CubicBezier, tolerance: f32, max_depth: u32, out: &mut Vec<Vec2>) {
    out.push(curve.p0);
    subdivide(curve, tolerance.max(0.0), max_depth, out);
}

fn subdivide(curve: &CubicBezier, tolerance: f32, depth_left: u32, out: &mut Vec<Vec2>) {
    if depth_left == 0 || curve.is_flat(tolerance) {
        out.push(curve.p3);
        return;
    }
    let (a, b) = curve.split();
    subdivide(&a, tolerance, depth_left - 1, out);
    subdivide(&b, tolerance, depth_left - 1, out);
}

/// 1px polyline through `points` (pixel addresses, rounded), each pixel once.
pub fn polyline_pixels(points: &[Vec2], out: &mut Vec<Pixel>) {
    let round = |p: Vec2| (p.x.round() as i32, p.y.round() as i32);
    let mut sink = PixelSink::new(out);
    let mut run = Vec::new();
    match points {
        [] => {}
        [only] => {
            let (x, y) = round(*only);
            sink.plot(x, y);
        }
        _ => {
            for w in points.windows(2) {
                let (a, b) = (round(w[0]), round(w[1]));
                run.clear();
                pixel_line(a.0, a.1, b.0, b.1, &mut run);
                for &(x, y) in &run {
                    sink.plot(x, y);
                }
            }
        }
    }
}

/// Thick stroke along `points` as a triangle list.
///
/// Each vertex is offset along its averaged neighbour normal; interior joins
/// are mitered unless the miter would reach past `miter_limit * half_width`,
/// in which case the plain averaged offset is used. Returns `false` when the
/// polyline has no length.
pub fn stroke_polyline(
    points: &[Vec2],
    half_width: f32,
    cap: LineCap,
    miter_limit: f32,
    out: &mut Vec<Vec2>,
) -> bool {
    if half_width <= 0.0 {
        return false;
    }
    let mut pts: Vec<Vec2> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last().is_none_or(|&last: &Vec2| (p - last).length_squared() > 1e-6) {
            pts.push(p);
        }
    }
    if pts.len() < 2 {
        return false;
    }

    let dirs: Vec<Vec2> = pts.windows(2).map(|w| (w[1] - w[0]).normalized()).collect();
    let normals: Vec<Vec2> = dirs.iter().map(|d| d.perp()).collect();
    let last = pts.len() - 1;

    let mut offsets = Vec::with_capacity(pts.len());
    offsets.push(normals[0] * half_width);
    for i in 1..last {
        offsets.push(join_offset(normals[i - 1], normals[i], half_width, miter_limit));
    }
    offsets.push(normals[last - 1] * half_width);

    if cap == LineCap::Square {
        pts[0] = pts[0] - dirs[0] * half_width;
        pts[last] = pts[last] + dirs[last - 1] * half_width;
    }

    for i in 0..last {
        let (l0, r0) = (pts[i] + offsets[i], pts[i] - offsets[i]);
        let (l1, r1) = (pts[i + 1] + offsets[i + 1], pts[i + 1] - offsets[i + 1]);
        out.extend_from_slice(&[l0, l1, r1, l0, r1, r0]);
    }

    if cap == LineCap::Round {
        round_cap(pts[0], normals[0] * half_width, out);
        round_cap(pts[last], -normals[last - 1] * half_width, out);
    }
    true
}

fn join_offset(n_in: Vec2, n_out: Vec2, half_width: f32, miter_limit: f32) -> Vec2 {
    let avg = (n_in + n_out).normalized();
    if avg == Vec2::zero() {
        // Full reversal.
        return n_out * half_width;
    }
    let cos = avg.dot(n_out);
    let miter = if cos > f32::EPSILON { half_width / cos } else { f32::INFINITY };
    if miter > miter_limit * half_width {
        avg * half_width
    } else {
        avg * miter
    }
}

/// Semicircle fan around `center`, sweeping `from` through +π.
fn round_cap(center: Vec2, from: Vec2, out: &mut Vec<Vec2>) {
    let steps = ((PI * from.length()).ceil() as usize).clamp(4, 64);
    let step = PI / steps as f32;
    let mut prev = center + from;
    for k in 1..=steps {
        let next = center + from.rotated(step * k as f32);
        out.extend_from_slice(&[center, prev, next]);
        prev = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s_curve() -> CubicBezier {
        CubicBezier::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(40.0, 80.0),
            Vec2::new(60.0, -40.0),
            Vec2::new(100.0, 30.0),
        )
    }

    fn max_deviation(curve: &CubicBezier, poly: &[Vec2]) -> f32 {
        (0..=400)
            .map(|i| {
                let p = curve.point_at(i as f32 / 400.0);
                poly.windows(2)
                    .map(|w| distance_squared_to_segment(p, w[0], w[1]))
                    .fold(f32::MAX, f32::min)
                    .sqrt()
            })
            .fold(0.0, f32::max)
    }

    #[test]
    fn tessellation_keeps_endpoints() {
        let c = s_curve();
        let mut out = Vec::new();
        tessellate(&c, 0.25, 16, &mut out);
        assert_eq!(out.first(), Some(&c.p0));
        assert_eq!(out.last(), Some(&c.p3));
    }

    #[test]
    fn tighter_tolerance_refines_monotonically() {
        let c = s_curve();
        let mut prev_len = 0;
        for tol in [16.0, 4.0, 1.0, 0.25, 0.01] {
            let mut out = Vec::new();
            tessellate(&c, tol, 24, &mut out);
            let dev = max_deviation(&c, &out);
            assert!(out.len() >= prev_len, "tol {tol}: {} < {prev_len}", out.len());
            assert!(dev <= tol.sqrt() + 1e-3, "tol {tol}: deviation {dev}");
            prev_len = out.len();
        }
    }

    #[test]
    fn depth_ceiling_bounds_output() {
        let c = s_curve();
        for depth in 0..6 {
            let mut out = Vec::new();
            tessellate(&c, 0.0, depth, &mut out);
            assert!(out.len() <= (1 << depth) + 1);
        }
        let mut out = Vec::new();
        tessellate(&c, 0.0, 0, &mut out);
        assert_eq!(out, vec![c.p0, c.p3]);
    }

    #[test]
    fn straight_curve_needs_one_segment() {
        let c = CubicBezier::new(
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(30.0, 0.0),
        );
        let mut out = Vec::new();
        tessellate(&c, 0.25, 16, &mut out);
        assert_eq!(out.len(), 2);

        let mut px = Vec::new();
        polyline_pixels(&out, &mut px);
        assert_eq!(px.len(), 31);
    }

    #[test]
    fn polyline_pixels_do_not_repeat_joints() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0), Vec2::new(5.0, 5.0)];
        let mut px = Vec::new();
        polyline_pixels(&pts, &mut px);
        assert_eq!(px.len(), 11);
    }

    #[test]
    fn straight_stroke_is_a_rectangle() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(20.0, 0.0)];
        let mut tris = Vec::new();
        assert!(stroke_polyline(&pts, 2.0, LineCap::Round, 4.0, &mut tris));
        let body = &tris[..12];
        assert!(body.iter().all(|v| (v.y.abs() - 2.0).abs() < 1e-4));
        // Two fan caps follow the strip.
        assert!(tris.len() > 12);
        assert_eq!((tris.len() - 12) % 3, 0);
    }

    #[test]
    fn square_cap_extends_stroke_ends() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)];
        let mut tris = Vec::new();
        stroke_polyline(&pts, 1.5, LineCap::Square, 4.0, &mut tris);
        let min_x = tris.iter().map(|v| v.x).fold(f32::MAX, f32::min);
        let max_x = tris.iter().map(|v| v.x).fold(f32::MIN, f32::max);
        assert!((min_x + 1.5).abs() < 1e-4 && (max_x - 11.5).abs() < 1e-4);
    }

    #[test]
    fn sharp_join_falls_back_to_unmitered_offset() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0), Vec2::new(0.0, 1.0)];
        let mut tris = Vec::new();
        stroke_polyline(&pts, 1.0, LineCap::Square, 4.0, &mut tris);
        let corner = Vec2::new(20.0, 0.0);
        assert!(tris.iter().all(|v| (*v - corner).length() < 20.0 + 4.0 + 1e-3));
        // Joint vertices sit exactly half a width from the corner.
        let near: Vec<f32> = tris[..6]
            .iter()
            .filter(|v| (v.x - 20.0).abs() < 3.0)
            .map(|v| (*v - corner).length())
            .collect();
        assert!(!near.is_empty());
        assert!(near.iter().all(|d| (d - 1.0).abs() < 1e-3));
    }

    #[test]
    fn right_angle_join_is_mitered() {
        let pts = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0)];
        let mut tris = Vec::new();
        stroke_polyline(&pts, 1.0, LineCap::Square, 4.0, &mut tris);
        let miter = std::f32::consts::SQRT_2;
        let corner = Vec2::new(10.0, 0.0);
        assert!(tris.iter().any(|v| ((*v - corner).length() - miter).abs() < 1e-4));
    }

    #[test]
    fn degenerate_stroke_emits_nothing() {
        let p = Vec2::new(4.0, 4.0);
        let mut tris = Vec::new();
        assert!(!stroke_polyline(&[p, p, p], 2.0, LineCap::Round, 4.0, &mut tris));
        assert!(tris.is_empty());
    }
}
