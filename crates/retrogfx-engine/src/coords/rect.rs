use super::SurfaceSize;

/// Axis-aligned integer rectangle in surface pixels (top-left origin).
///
/// `w`/`h` may be negative on construction; [`normalized`](Self::normalized)
/// flips such rectangles so the size is non-negative.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(self) -> i32 {
        self.x + self.w
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(self) -> i32 {
        self.y + self.h
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Normalizes the rectangle so width/height are non-negative.
    #[inline]
    pub fn normalized(self) -> Self {
        let mut r = self;
        if r.w < 0 {
            r.x += r.w;
            r.w = -r.w;
        }
        if r.h < 0 {
            r.y += r.h;
            r.h = -r.h;
        }
        r
    }

    /// Half-open containment: [min, max).
    #[inline]
    pub fn contains(self, x: i32, y: i32) -> bool {
        let r = self.normalized();
        x >= r.x && y >= r.y && x < r.right() && y < r.bottom()
    }

    #[inline]
    pub fn intersect(self, other: PixelRect) -> Option<PixelRect> {
        let a = self.normalized();
        let b = other.normalized();

        let x0 = a.x.max(b.x);
        let y0 = a.y.max(b.y);
        let x1 = a.right().min(b.right());
        let y1 = a.bottom().min(b.bottom());

        if x1 <= x0 || y1 <= y0 {
            None
        } else {
            Some(PixelRect::new(x0, y0, x1 - x0, y1 - y0))
        }
    }

    /// Clips the rectangle to `[0, size)`. `None` when nothing remains.
    #[inline]
    pub fn clamp_to(self, size: SurfaceSize) -> Option<PixelRect> {
        self.intersect(size.bounds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: i32, y: i32, w: i32, h: i32) -> PixelRect { PixelRect::new(x, y, w, h) }

    // ── normalized ────────────────────────────────────────────────────────

    #[test]
    fn normalized_positive_is_identity() {
        let rect = r(1, 2, 10, 20);
        assert_eq!(rect.normalized(), rect);
    }

    #[test]
    fn normalized_negative_width() {
        let n = r(10, 0, -4, 5).normalized();
        assert_eq!(n.x, 6);
        assert_eq!(n.w, 4);
    }

    #[test]
    fn normalized_negative_height() {
        let n = r(0, 10, 5, -3).normalized();
        assert_eq!(n.y, 7);
        assert_eq!(n.h, 3);
    }

    // ── contains ──────────────────────────────────────────────────────────

    #[test]
    fn contains_top_left_inclusive_bottom_right_exclusive() {
        assert!(r(0, 0, 10, 10).contains(0, 0));
        assert!(!r(0, 0, 10, 10).contains(10, 10));
        assert!(!r(0, 0, 10, 10).contains(-1, 5));
    }

    // ── intersect / clamp ─────────────────────────────────────────────────

    #[test]
    fn intersect_overlapping() {
        assert_eq!(r(0, 0, 10, 10).intersect(r(5, 5, 10, 10)), Some(r(5, 5, 5, 5)));
    }

    #[test]
    fn intersect_touching_edge_returns_none() {
        assert!(r(0, 0, 10, 10).intersect(r(10, 0, 10, 10)).is_none());
    }

    #[test]
    fn clamp_partially_off_surface() {
        let size = SurfaceSize::new(8, 8);
        assert_eq!(r(-2, 6, 4, 4).clamp_to(size), Some(r(0, 6, 2, 2)));
    }

    #[test]
    fn clamp_fully_off_surface_is_none() {
        let size = SurfaceSize::new(8, 8);
        assert!(r(8, 0, 4, 4).clamp_to(size).is_none());
        assert!(r(-5, -5, 5, 5).clamp_to(size).is_none());
    }
}
