/// Resolved straight-alpha RGBA color, 8 bits per channel.
///
/// Every draw entry point takes an already-resolved color; palette lookup and
/// color parsing belong to the caller.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    #[inline]
    pub const fn from_array(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Normalized `[0, 1]` channels, the layout vertex color storage uses.
    #[inline]
    pub fn to_f32(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// Inverse of [`to_f32`](Self::to_f32); channels are clamped then rounded.
    #[inline]
    pub fn from_f32(c: [f32; 4]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(c[0]), q(c[1]), q(c[2]), q(c[3]))
    }

    #[inline]
    pub fn is_opaque(self) -> bool {
        self.a == 255
    }
}

impl From<[u8; 4]> for Rgba {
    #[inline]
    fn from(c: [u8; 4]) -> Self {
        Self::from_array(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f32_round_trip_is_exact_for_every_byte() {
        for v in 0..=255u8 {
            let c = Rgba::new(v, 255 - v, v / 2, 255);
            assert_eq!(Rgba::from_f32(c.to_f32()), c);
        }
    }
}
