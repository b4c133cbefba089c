use super::{Pixel, PixelSink, push_rect_triangles};
use crate::coords::Vec2;

/// End treatment for thick strokes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LineCap {
    /// Ends extended by half the stroke width.
    Square,
    /// Ends finished with a disc of radius half the stroke width.
    Round,
}

/// Bresenham line from `(x0, y0)` to `(x1, y1)`, both endpoints included.
pub fn pixel_line(x0: i32, y0: i32, x1: i32, y1: i32, out: &mut Vec<Pixel>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        out.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Perimeter of the `w×h` rectangle at `(x, y)`, each pixel once.
pub fn rect_outline(x: i32, y: i32, w: i32, h: i32, out: &mut Vec<Pixel>) {
    if w <= 0 || h <= 0 {
        return;
    }
    let (x1, y1) = (x + w - 1, y + h - 1);
    let mut sink = PixelSink::new(out);
    for px in x..=x1 {
        sink.plot(px, y);
        sink.plot(px, y1);
    }
    for py in y + 1..y1 {
        sink.plot(x, py);
        sink.plot(x1, py);
    }
}

/// Two triangles spanning `(x, y)-(x + w, y + h)`.
pub fn rect_filled(x: i32, y: i32, w: i32, h: i32, out: &mut Vec<Vec2>) {
    if w <= 0 || h <= 0 {
        return;
    }
    push_rect_triangles(out, x as f32, y as f32, (x + w) as f32, (y + h) as f32);
}

/// Stroke body of a thick segment as two triangles.
///
/// `p0` and `p1` are in pixel-edge space (pass pixel centers for pixel
/// endpoints). Square caps extend both ends by `half_width` along the
/// direction; round caps leave the ends flush for the caller to finish with
/// discs. Returns `false`, emitting nothing, for a zero-length segment.
pub fn thick_line(p0: Vec2, p1: Vec2, half_width: f32, cap: LineCap, out: &mut Vec<Vec2>) -> bool {
    let d = p1 - p0;
    if d.length_squared() <= f32::EPSILON || half_width <= 0.0 {
        return false;
    }
    let dir = d.normalized();
    let (a, b) = match cap {
        LineCap::Square => (p0 - dir * half_width, p1 + dir * half_width),
        LineCap::Round => (p0, p1),
    };
    let n = dir.perp() * half_width;
    let (a0, a1, b0, b1) = (a + n, a - n, b + n, b - n);
    out.extend_from_slice(&[a0, b0, b1, a0, b1, a1]);
    true
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Pixel> {
        let mut out = Vec::new();
        pixel_line(x0, y0, x1, y1, &mut out);
        out
    }

    #[test]
    fn line_includes_both_endpoints() {
        let pts = line(2, 3, 9, 6);
        assert_eq!(pts.first(), Some(&(2, 3)));
        assert_eq!(pts.last(), Some(&(9, 6)));
        assert_eq!(pts.len(), 8);
    }

    #[test]
    fn line_is_eight_connected_in_every_octant() {
        for (x1, y1) in [(7, 2), (2, 7), (-2, 7), (-7, 2), (-7, -2), (-2, -7), (2, -7), (7, -2)] {
            let pts = line(0, 0, x1, y1);
            assert_eq!(pts.len() as i32, x1.abs().max(y1.abs()) + 1);
            for w in pts.windows(2) {
                let (a, b) = (w[0], w[1]);
                assert!((a.0 - b.0).abs() <= 1 && (a.1 - b.1).abs() <= 1);
            }
        }
    }

    #[test]
    fn degenerate_line_is_single_pixel() {
        assert_eq!(line(4, 4, 4, 4), vec![(4, 4)]);
    }

    #[test]
    fn rect_outline_has_no_duplicate_corners() {
        let mut out = Vec::new();
        rect_outline(1, 1, 4, 3, &mut out);
        let set: HashSet<_> = out.iter().copied().collect();
        assert_eq!(set.len(), out.len());
        assert_eq!(out.len(), 2 * 4 + 2 * 3 - 4);
        assert!(set.contains(&(1, 1)) && set.contains(&(4, 3)));
        assert!(!set.contains(&(2, 2)));
    }

    #[test]
    fn thin_rects_and_empty_rects() {
        let mut out = Vec::new();
        rect_outline(0, 0, 5, 1, &mut out);
        assert_eq!(out.len(), 5);

        out.clear();
        rect_outline(0, 0, 0, 3, &mut out);
        rect_outline(0, 0, 3, -1, &mut out);
        assert!(out.is_empty());

        let mut tris = Vec::new();
        rect_filled(0, 0, -2, 3, &mut tris);
        assert!(tris.is_empty());
    }

    #[test]
    fn filled_rect_is_six_vertices() {
        let mut tris = Vec::new();
        rect_filled(0, 0, 4, 4, &mut tris);
        assert_eq!(tris.len(), 6);
        assert!(tris.contains(&Vec2::new(0.0, 0.0)));
        assert!(tris.contains(&Vec2::new(4.0, 4.0)));
    }

    #[test]
    fn thick_line_square_cap_extends_ends() {
        let mut tris = Vec::new();
        let ok = thick_line(Vec2::new(2.0, 5.0), Vec2::new(8.0, 5.0), 1.5, LineCap::Square, &mut tris);
        assert!(ok);
        assert_eq!(tris.len(), 6);
        let min_x = tris.iter().map(|v| v.x).fold(f32::MAX, f32::min);
        let max_x = tris.iter().map(|v| v.x).fold(f32::MIN, f32::max);
        let min_y = tris.iter().map(|v| v.y).fold(f32::MAX, f32::min);
        let max_y = tris.iter().map(|v| v.y).fold(f32::MIN, f32::max);
        assert!((min_x - 0.5).abs() < 1e-5 && (max_x - 9.5).abs() < 1e-5);
        assert!((min_y - 3.5).abs() < 1e-5 && (max_y - 6.5).abs() < 1e-5);
    }

    #[test]
    fn thick_line_round_cap_is_flush() {
        let mut tris = Vec::new();
        thick_line(Vec2::new(2.0, 5.0), Vec2::new(8.0, 5.0), 1.0, LineCap::Round, &mut tris);
        let min_x = tris.iter().map(|v| v.x).fold(f32::MAX, f32::min);
        assert!((min_x - 2.0).abs() < 1e-5);
    }

    #[test]
    fn zero_length_thick_line_emits_nothing() {
        let mut tris = Vec::new();
        let p = Vec2::new(3.0, 3.0);
        assert!(!thick_line(p, p, 2.0, LineCap::Square, &mut tris));
        assert!(tris.is_empty());
    }
}
