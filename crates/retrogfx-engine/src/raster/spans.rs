use std::collections::BTreeMap;

/// Inclusive horizontal run of pixels `x0..=x1` on row `y`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub y: i32,
    pub x0: i32,
    pub x1: i32,
}

impl Span {
    #[inline]
    pub const fn new(y: i32, x0: i32, x1: i32) -> Self {
        Self { y, x0, x1 }
    }

    #[inline]
    pub fn len(&self) -> i32 {
        self.x1 - self.x0 + 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x1 < self.x0
    }
}

#[derive(Debug, Copy, Clone)]
struct RowBorder {
    /// Border pixel left of center closest to it.
    inner_left: Option<i32>,
    /// Border pixel right of center closest to it.
    inner_right: Option<i32>,
    outer_left: i32,
    outer_right: i32,
    /// A border pixel sits on the center column (polar rows).
    on_axis: bool,
}

/// Per-scanline border bookkeeping for filled shapes.
///
/// Border pixels are recorded as the outline algorithm emits them. A row may
/// hold several border pixels per side (flat stretches near the poles), so
/// the interior is bounded by the *innermost* border pixel of each side
/// rather than by the row's extremes.
#[derive(Debug)]
pub struct ScanlineSpans {
    cx: i32,
    rows: BTreeMap<i32, RowBorder>,
}

impl ScanlineSpans {
    /// Tracks a shape centered on column `cx`.
    pub fn new(cx: i32) -> Self {
        Self { cx, rows: BTreeMap::new() }
    }

    pub fn record(&mut self, x: i32, y: i32) {
        let cx = self.cx;
        let row = self.rows.entry(y).or_insert(RowBorder {
            inner_left: None,
            inner_right: None,
            outer_left: x,
            outer_right: x,
            on_axis: false,
        });
        row.outer_left = row.outer_left.min(x);
        row.outer_right = row.outer_right.max(x);
        if x < cx {
            row.inner_left = Some(row.inner_left.map_or(x, |l| l.max(x)));
        } else if x > cx {
            row.inner_right = Some(row.inner_right.map_or(x, |r| r.min(x)));
        } else {
            row.on_axis = true;
        }
    }

    /// Runs strictly between the innermost border pixels of each row.
    ///
    /// Rows touching the center column are pure border and produce nothing,
    /// as do rows whose two sides are adjacent.
    pub fn interior(&self, out: &mut Vec<Span>) {
        for (&y, row) in &self.rows {
            if row.on_axis {
                continue;
            }
            let (Some(l), Some(r)) = (row.inner_left, row.inner_right) else { continue };
            let span = Span::new(y, l + 1, r - 1);
            if !span.is_empty() {
                out.push(span);
            }
        }
    }

    /// Full rows from the outermost left to the outermost right border pixel.
    pub fn solid(&self, out: &mut Vec<Span>) {
        out.extend(self.rows.iter().map(|(&y, row)| Span::new(y, row.outer_left, row.outer_right)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_uses_innermost_pixels() {
        let mut s = ScanlineSpans::new(0);
        // Two border pixels on each side of row 3.
        for x in [-6, -5, 5, 6] {
            s.record(x, 3);
        }
        let mut out = Vec::new();
        s.interior(&mut out);
        assert_eq!(out, vec![Span::new(3, -4, 4)]);

        let mut solid = Vec::new();
        s.solid(&mut solid);
        assert_eq!(solid, vec![Span::new(3, -6, 6)]);
    }

    #[test]
    fn polar_and_adjacent_rows_have_no_interior() {
        let mut s = ScanlineSpans::new(0);
        for x in -1..=1 {
            s.record(x, -4);
        }
        s.record(-1, 0);
        s.record(1, 0);
        s.record(-1, 1);
        s.record(0, 1);
        let mut out = Vec::new();
        s.interior(&mut out);
        assert_eq!(out, vec![Span::new(0, 0, 0)]);
    }
}
