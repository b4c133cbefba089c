use super::spans::{ScanlineSpans, Span};
use super::{Pixel, PixelSink};

/// Walks the first octant of a midpoint circle of radius `r`, yielding
/// `(x, y)` with `x >= y >= 0` relative to the center.
fn midpoint_octant(r: i32, mut visit: impl FnMut(i32, i32)) {
    let mut x = r;
    let mut y = 0;
    let mut err = 1 - r;
    while x >= y {
        visit(x, y);
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

#[inline]
fn symmetric8(x: i32, y: i32) -> [(i32, i32); 8] {
    [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)]
}

/// 8-way symmetric midpoint circle outline. Radius 0 yields the center pixel.
pub fn circle_outline(cx: i32, cy: i32, r: i32, out: &mut Vec<Pixel>) {
    if r < 0 {
        return;
    }
    let mut sink = PixelSink::new(out);
    if r == 0 {
        sink.plot(cx, cy);
        return;
    }
    midpoint_octant(r, |x, y| {
        for (dx, dy) in symmetric8(x, y) {
            sink.plot(cx + dx, cy + dy);
        }
    });
}

/// Slack for pixels sitting exactly on an arc endpoint.
const ANGLE_EPS: f32 = 1e-3;

/// Angular range of an arc, in degrees.
///
/// Angles follow screen space: 0° points along +X and angles grow towards
/// +Y (clockwise on screen).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ArcSpan {
    start: f32,
    end: f32,
    /// `start > end` after normalization: the span wraps through 0°.
    winding: bool,
    full: bool,
}

impl ArcSpan {
    pub fn new(start_deg: f32, end_deg: f32) -> Self {
        let full = (end_deg - start_deg).abs() >= 360.0;
        let start = start_deg.rem_euclid(360.0);
        let end = end_deg.rem_euclid(360.0);
        Self { start, end, winding: start > end, full }
    }

    /// Whether the direction `(dx, dy)` from the center lies in the span.
    pub fn contains(&self, dx: i32, dy: i32) -> bool {
        if self.full {
            return true;
        }
        let a = (dy as f32).atan2(dx as f32).to_degrees().rem_euclid(360.0);
        let (lo, hi) = (self.start - ANGLE_EPS, self.end + ANGLE_EPS);
        if self.winding {
            a >= lo || a <= hi
        } else {
            a >= lo && a <= hi
        }
    }
}

/// Midpoint circle arc: each symmetric candidate is kept only when its angle
/// falls inside `[start_deg, end_deg]`.
pub fn arc(cx: i32, cy: i32, r: i32, start_deg: f32, end_deg: f32, out: &mut Vec<Pixel>) {
    if r < 0 {
        return;
    }
    let span = ArcSpan::new(start_deg, end_deg);
    let mut sink = PixelSink::new(out);
    if r == 0 {
        sink.plot(cx, cy);
        return;
    }
    midpoint_octant(r, |x, y| {
        for (dx, dy) in symmetric8(x, y) {
            if span.contains(dx, dy) {
                sink.plot(cx + dx, cy + dy);
            }
        }
    });
}

/// Filled circle as border pixels plus interior spans.
///
/// `border` receives the outline; `interior` receives one span per row
/// strictly inside it. Together they cover the disc exactly once. Radius 0
/// produces nothing.
pub fn filled_circle(cx: i32, cy: i32, r: i32, border: &mut Vec<Pixel>, interior: &mut Vec<Span>) {
    if r <= 0 {
        return;
    }
    let mut rows = ScanlineSpans::new(cx);
    let mut sink = PixelSink::new(border);
    midpoint_octant(r, |x, y| {
        for (dx, dy) in symmetric8(x, y) {
            sink.plot(cx + dx, cy + dy);
            rows.record(cx + dx, cy + dy);
        }
    });
    rows.interior(interior);
}

/// Solid disc of radius `r` around the origin, one span per row.
pub fn disc_spans(r: i32, out: &mut Vec<Span>) {
    if r < 0 {
        return;
    }
    if r == 0 {
        out.push(Span::new(0, 0, 0));
        return;
    }
    let mut rows = ScanlineSpans::new(0);
    midpoint_octant(r, |x, y| {
        for (dx, dy) in symmetric8(x, y) {
            rows.record(dx, dy);
        }
    });
    rows.solid(out);
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    fn outline(r: i32) -> Vec<Pixel> {
        let mut out = Vec::new();
        circle_outline(0, 0, r, &mut out);
        out
    }

    #[test]
    fn zero_radius_outline_is_single_point() {
        assert_eq!(outline(0), vec![(0, 0)]);
    }

    #[test]
    fn outline_has_no_duplicates_and_hits_the_axes() {
        for r in 1..20 {
            let pts = outline(r);
            let set: HashSet<_> = pts.iter().copied().collect();
            assert_eq!(set.len(), pts.len(), "duplicates at r={r}");
            for p in [(r, 0), (-r, 0), (0, r), (0, -r)] {
                assert!(set.contains(&p), "missing {p:?} at r={r}");
            }
        }
    }

    #[test]
    fn outline_is_eightfold_symmetric() {
        let set: HashSet<_> = outline(13).into_iter().collect();
        for &(x, y) in &set {
            assert!(set.contains(&(y, x)));
            assert!(set.contains(&(-x, y)));
            assert!(set.contains(&(x, -y)));
        }
    }

    #[test]
    fn filled_circle_zero_radius_is_noop() {
        let (mut b, mut i) = (Vec::new(), Vec::new());
        filled_circle(5, 5, 0, &mut b, &mut i);
        assert!(b.is_empty() && i.is_empty());
    }

    #[test]
    fn filled_circle_rows_are_gapless_and_single_covered() {
        for r in 1..40 {
            let (mut border, mut interior) = (Vec::new(), Vec::new());
            filled_circle(0, 0, r, &mut border, &mut interior);

            let mut rows: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
            for &(x, y) in &border {
                rows.entry(y).or_default().push(x);
            }
            let mut interior_rows = HashSet::new();
            for s in &interior {
                assert!(s.x0 <= s.x1, "inverted span at r={r}");
                assert!(interior_rows.insert(s.y), "doubled interior row {} at r={r}", s.y);
                rows.entry(s.y).or_default().extend(s.x0..=s.x1);
            }
            assert!(!interior_rows.contains(&r) && !interior_rows.contains(&-r));

            assert_eq!(rows.len() as i32, 2 * r + 1);
            for (y, mut xs) in rows {
                xs.sort_unstable();
                let n = xs.len();
                xs.dedup();
                assert_eq!(xs.len(), n, "pixel covered twice on row {y}, r={r}");
                assert_eq!(xs[n - 1] - xs[0] + 1, n as i32, "gap on row {y}, r={r}");
                // Symmetric about the center column.
                assert_eq!(xs[0], -xs[n - 1], "asymmetric row {y}, r={r}");
            }
        }
    }

    #[test]
    fn filled_circle_is_rotationally_symmetric() {
        let r = 17;
        let (mut border, mut interior) = (Vec::new(), Vec::new());
        filled_circle(0, 0, r, &mut border, &mut interior);
        let mut cover: HashSet<Pixel> = border.into_iter().collect();
        for s in interior {
            cover.extend((s.x0..=s.x1).map(|x| (x, s.y)));
        }
        for &(x, y) in &cover {
            // Quarter turn maps the disc onto itself.
            assert!(cover.contains(&(-y, x)), "({x},{y}) has no rotated twin");
        }
    }

    #[test]
    fn disc_spans_match_filled_circle_coverage() {
        for r in 0..12 {
            let mut spans = Vec::new();
            disc_spans(r, &mut spans);
            let disc: usize = spans.iter().map(|s| s.len() as usize).sum();

            let (mut border, mut interior) = (Vec::new(), Vec::new());
            filled_circle(0, 0, r, &mut border, &mut interior);
            let filled = border.len() + interior.iter().map(|s| s.len() as usize).sum::<usize>();
            assert_eq!(disc, filled.max(1), "r={r}");
        }
    }

    #[test]
    fn arc_quarter_stays_in_quadrant() {
        let mut out = Vec::new();
        arc(0, 0, 10, 0.0, 90.0, &mut out);
        assert!(!out.is_empty());
        assert!(out.iter().all(|&(x, y)| x >= 0 && y >= 0));
        assert!(out.contains(&(10, 0)) && out.contains(&(0, 10)));
    }

    #[test]
    fn winding_arc_wraps_through_zero() {
        let mut out = Vec::new();
        arc(0, 0, 10, 270.0, 90.0, &mut out);
        assert!(out.iter().all(|&(x, _)| x >= 0));
        assert!(out.contains(&(0, -10)) && out.contains(&(0, 10)) && out.contains(&(10, 0)));
    }

    #[test]
    fn full_sweep_arc_equals_outline() {
        let mut a = Vec::new();
        arc(3, 4, 9, 0.0, 360.0, &mut a);
        let mut o = Vec::new();
        circle_outline(3, 4, 9, &mut o);
        let a: HashSet<_> = a.into_iter().collect();
        let o: HashSet<_> = o.into_iter().collect();
        assert_eq!(a, o);
    }
}
