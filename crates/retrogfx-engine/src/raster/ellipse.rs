use super::spans::{ScanlineSpans, Span};
use super::{Pixel, PixelSink};

/// First quadrant of a two-region midpoint ellipse, `(x, y)` with both
/// non-negative, from `(0, ry)` down to `(rx, 0)`.
///
/// Decision variables are scaled by 4 so the half-pixel midpoint terms stay
/// integral.
fn midpoint_quadrant(rx: i32, ry: i32, mut visit: impl FnMut(i32, i32)) {
    let (rx2, ry2) = (i64::from(rx) * i64::from(rx), i64::from(ry) * i64::from(ry));
    let (mut x, mut y) = (0i64, i64::from(ry));
    let mut dx = 0i64;
    let mut dy = 2 * rx2 * y;

    // Region 1: slope magnitude below 1, step in x.
    let mut p = 4 * ry2 - 4 * rx2 * y + rx2;
    while dx < dy {
        visit(x as i32, y as i32);
        x += 1;
        dx += 2 * ry2;
        if p < 0 {
            p += 4 * (dx + ry2);
        } else {
            y -= 1;
            dy -= 2 * rx2;
            p += 4 * (dx - dy + ry2);
        }
    }

    // Region 2: step in y.
    p = ry2 * (2 * x + 1) * (2 * x + 1) + 4 * rx2 * (y - 1) * (y - 1) - 4 * rx2 * ry2;
    let mut last_x = x;
    while y >= 0 {
        visit(x as i32, y as i32);
        last_x = x;
        y -= 1;
        dy -= 2 * rx2;
        if p > 0 {
            p += 4 * (rx2 - dy);
        } else {
            x += 1;
            dx += 2 * ry2;
            p += 4 * (dx - dy + rx2);
        }
    }

    // Very flat ellipses leave region 2 short of the tip.
    for tip in last_x + 1..=i64::from(rx) {
        visit(tip as i32, 0);
    }
}

fn degenerate(cx: i32, cy: i32, rx: i32, ry: i32, sink: &mut PixelSink<'_>) {
    if ry == 0 {
        for x in cx - rx..=cx + rx {
            sink.plot(x, cy);
        }
    } else {
        for y in cy - ry..=cy + ry {
            sink.plot(cx, y);
        }
    }
}

/// Axis-aligned ellipse outline with radii `rx`, `ry`.
///
/// A zero radius collapses the ellipse onto a line along the other axis;
/// both zero yields the center pixel.
pub fn ellipse_outline(cx: i32, cy: i32, rx: i32, ry: i32, out: &mut Vec<Pixel>) {
    if rx < 0 || ry < 0 {
        return;
    }
    let mut sink = PixelSink::new(out);
    if rx == 0 || ry == 0 {
        degenerate(cx, cy, rx, ry, &mut sink);
        return;
    }
    midpoint_quadrant(rx, ry, |x, y| {
        for (dx, dy) in [(x, y), (-x, y), (x, -y), (-x, -y)] {
            sink.plot(cx + dx, cy + dy);
        }
    });
}

/// Filled ellipse as outline pixels plus interior spans, covering each pixel
/// once. Both radii zero produces nothing.
pub fn filled_ellipse(
    cx: i32,
    cy: i32,
    rx: i32,
    ry: i32,
    border: &mut Vec<Pixel>,
    interior: &mut Vec<Span>,
) {
    if rx < 0 || ry < 0 || (rx == 0 && ry == 0) {
        return;
    }
    let mut sink = PixelSink::new(border);
    if rx == 0 || ry == 0 {
        degenerate(cx, cy, rx, ry, &mut sink);
        return;
    }
    let mut rows = ScanlineSpans::new(cx);
    midpoint_quadrant(rx, ry, |x, y| {
        for (dx, dy) in [(x, y), (-x, y), (x, -y), (-x, -y)] {
            sink.plot(cx + dx, cy + dy);
            rows.record(cx + dx, cy + dy);
        }
    });
    rows.interior(interior);
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    fn coverage(rx: i32, ry: i32) -> (BTreeMap<i32, Vec<i32>>, usize) {
        let (mut border, mut interior) = (Vec::new(), Vec::new());
        filled_ellipse(0, 0, rx, ry, &mut border, &mut interior);
        let mut rows: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
        for &(x, y) in &border {
            rows.entry(y).or_default().push(x);
        }
        for s in &interior {
            rows.entry(s.y).or_default().extend(s.x0..=s.x1);
        }
        (rows, interior.len())
    }

    #[test]
    fn outline_reaches_all_four_extremes() {
        for (rx, ry) in [(1, 1), (5, 3), (3, 9), (20, 1), (1, 20), (31, 17)] {
            let mut out = Vec::new();
            ellipse_outline(0, 0, rx, ry, &mut out);
            let set: HashSet<_> = out.iter().copied().collect();
            assert_eq!(set.len(), out.len(), "duplicates at {rx}x{ry}");
            for p in [(rx, 0), (-rx, 0), (0, ry), (0, -ry)] {
                assert!(set.contains(&p), "missing {p:?} at {rx}x{ry}");
            }
            assert!(out.iter().all(|&(x, y)| x.abs() <= rx && y.abs() <= ry));
        }
    }

    #[test]
    fn zero_radii_degrade() {
        let mut out = Vec::new();
        ellipse_outline(2, 2, 0, 0, &mut out);
        assert_eq!(out, vec![(2, 2)]);

        out.clear();
        ellipse_outline(0, 0, 3, 0, &mut out);
        assert_eq!(out.len(), 7);
        assert!(out.iter().all(|&(_, y)| y == 0));

        out.clear();
        ellipse_outline(0, 0, 0, 2, &mut out);
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|&(x, _)| x == 0));

        let (mut b, mut i) = (Vec::new(), Vec::new());
        filled_ellipse(0, 0, 0, 0, &mut b, &mut i);
        assert!(b.is_empty() && i.is_empty());
    }

    #[test]
    fn filled_ellipse_is_gapless_symmetric_and_single_covered() {
        for rx in 1..24 {
            for ry in 1..24 {
                let (rows, _) = coverage(rx, ry);
                assert_eq!(rows.len() as i32, 2 * ry + 1, "{rx}x{ry}");
                for (y, mut xs) in rows.clone() {
                    xs.sort_unstable();
                    let n = xs.len();
                    xs.dedup();
                    assert_eq!(xs.len(), n, "double cover on row {y} of {rx}x{ry}");
                    assert_eq!(xs[n - 1] - xs[0] + 1, n as i32, "gap on row {y} of {rx}x{ry}");
                    assert_eq!(xs[0], -xs[n - 1], "row {y} of {rx}x{ry} not mirrored");
                    let mirrored = &rows[&-y];
                    assert_eq!(mirrored.len(), n, "rows {y} and {} differ in {rx}x{ry}", -y);
                }
            }
        }
    }

    #[test]
    fn equator_row_spans_full_width() {
        let (rows, interior) = coverage(12, 5);
        assert!(interior > 0);
        let equator = &rows[&0];
        assert_eq!(equator.len(), 25);
    }
}
