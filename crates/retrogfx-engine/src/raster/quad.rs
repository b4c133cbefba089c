use crate::coords::{PixelRect, Vec2};

/// Placement of a `w×h` image quad on a surface.
///
/// The anchor is a fraction of the quad size (`(0, 0)` top-left,
/// `(0.5, 0.5)` center); scaling and rotation happen about it and the anchor
/// lands on `position`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadTransform {
    pub position: Vec2,
    pub size: Vec2,
    pub anchor: Vec2,
    pub scale: Vec2,
    /// Radians, clockwise on screen.
    pub rotation: f32,
}

impl QuadTransform {
    /// Unscaled, unrotated quad with its top-left corner at `(x, y)`.
    pub fn at(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            position: Vec2::new(x, y),
            size: Vec2::new(w, h),
            anchor: Vec2::zero(),
            scale: Vec2::new(1.0, 1.0),
            rotation: 0.0,
        }
    }

    pub fn with_anchor(mut self, ax: f32, ay: f32) -> Self {
        self.anchor = Vec2::new(ax, ay);
        self
    }

    pub fn with_scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale = Vec2::new(sx, sy);
        self
    }

    pub fn with_rotation(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }
}

/// Corners in order top-left, top-right, bottom-right, bottom-left (before
/// rotation).
pub fn quad_corners(t: &QuadTransform) -> [Vec2; 4] {
    let (w, h) = (t.size.x, t.size.y);
    let origin = Vec2::new(t.anchor.x * w, t.anchor.y * h);
    [Vec2::new(0.0, 0.0), Vec2::new(w, 0.0), Vec2::new(w, h), Vec2::new(0.0, h)].map(|c| {
        let local = c - origin;
        let scaled = Vec2::new(local.x * t.scale.x, local.y * t.scale.y);
        scaled.rotated(t.rotation) + t.position
    })
}

/// Texture coordinates matching [`quad_corners`]: the whole texture, or the
/// `src` pixel rectangle divided by the texture size.
pub fn uv_corners(src: Option<PixelRect>, tex_w: u32, tex_h: u32) -> [[f32; 2]; 4] {
    let Some(src) = src.filter(|_| tex_w > 0 && tex_h > 0) else {
        return [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
    };
    let (tw, th) = (tex_w as f32, tex_h as f32);
    let u0 = src.x as f32 / tw;
    let v0 = src.y as f32 / th;
    let u1 = src.right() as f32 / tw;
    let v1 = src.bottom() as f32 / th;
    [[u0, v0], [u1, v0], [u1, v1], [u0, v1]]
}

/// Appends the two triangles `0,1,2` and `0,2,3` of a textured quad.
pub fn push_textured_quad(corners: &[Vec2; 4], uvs: &[[f32; 2]; 4], out: &mut Vec<(Vec2, [f32; 2])>) {
    for i in [0, 1, 2, 0, 2, 3] {
        out.push((corners[i], uvs[i]));
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn identity_transform_places_top_left() {
        let c = quad_corners(&QuadTransform::at(10.0, 20.0, 4.0, 2.0));
        assert!(close(c[0], Vec2::new(10.0, 20.0)));
        assert!(close(c[2], Vec2::new(14.0, 22.0)));
    }

    #[test]
    fn centered_anchor_scales_about_center() {
        let t = QuadTransform::at(50.0, 50.0, 10.0, 10.0).with_anchor(0.5, 0.5).with_scale(2.0, 2.0);
        let c = quad_corners(&t);
        assert!(close(c[0], Vec2::new(40.0, 40.0)));
        assert!(close(c[2], Vec2::new(60.0, 60.0)));
    }

    #[test]
    fn rotation_turns_about_anchor() {
        let t = QuadTransform::at(0.0, 0.0, 4.0, 2.0).with_rotation(FRAC_PI_2);
        let c = quad_corners(&t);
        assert!(close(c[0], Vec2::zero()));
        // +X edge now points down.
        assert!(close(c[1], Vec2::new(0.0, 4.0)));
    }

    #[test]
    fn sub_region_uvs_divide_by_texture_size() {
        let uv = uv_corners(Some(PixelRect::new(2, 4, 2, 4)), 8, 16);
        assert_eq!(uv[0], [0.25, 0.25]);
        assert_eq!(uv[2], [0.5, 0.5]);
        assert_eq!(uv_corners(None, 8, 8)[2], [1.0, 1.0]);
    }

    #[test]
    fn textured_quad_is_two_triangles() {
        let c = quad_corners(&QuadTransform::at(0.0, 0.0, 1.0, 1.0));
        let mut out = Vec::new();
        push_textured_quad(&c, &uv_corners(None, 1, 1), &mut out);
        assert_eq!(out.len(), 6);
        assert_eq!(out[3].0, out[0].0);
        assert_eq!(out[4].1, [1.0, 1.0]);
    }
}
