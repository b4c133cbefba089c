use std::time::{SystemTime, UNIX_EPOCH};

/// How a source color combines with the render target.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source overwrites destination, alpha included.
    Replace,
    /// Straight-alpha source-over.
    #[default]
    Alpha,
}

/// Per-batch blend override, snapshotted into each draw-order segment.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendOverride {
    #[default]
    None,
    ForceAlpha,
    ForceReplace,
}

impl BlendOverride {
    #[inline]
    pub fn mode(self) -> Option<BlendMode> {
        match self {
            BlendOverride::None => None,
            BlendOverride::ForceAlpha => Some(BlendMode::Alpha),
            BlendOverride::ForceReplace => Some(BlendMode::Replace),
        }
    }
}

/// Inclusive per-channel noise bounds in 8-bit color units (`r, g, b, a`).
///
/// Each rendered fragment gets a pseudo-random offset in `[min, max]` added
/// per channel before blending.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct NoiseRange {
    pub min: [i16; 4],
    pub max: [i16; 4],
}

impl NoiseRange {
    #[inline]
    pub const fn new(min: [i16; 4], max: [i16; 4]) -> Self {
        Self { min, max }
    }

    /// Same `[-amount, amount]` range on the color channels, alpha untouched.
    #[inline]
    pub const fn uniform(amount: i16) -> Self {
        Self { min: [-amount, -amount, -amount, 0], max: [amount, amount, amount, 0] }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.min == [0; 4] && self.max == [0; 4]
    }
}

/// Blend + noise state a surface draws under.
///
/// Geometry already batched keeps the state it was drawn under: the renderer
/// flushes with the previous state before committing a new one.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub mode: BlendMode,
    pub noise: NoiseRange,
    pub seed: u32,
}

impl BlendState {
    #[inline]
    pub const fn new(mode: BlendMode) -> Self {
        Self { mode, noise: NoiseRange { min: [0; 4], max: [0; 4] }, seed: 0 }
    }

    /// Attaches a noise range. `seed = None` picks a fresh time-derived seed.
    pub fn with_noise(mut self, noise: NoiseRange, seed: Option<u32>) -> Self {
        self.noise = noise;
        self.seed = seed.unwrap_or_else(time_seed);
        self
    }
}

/// Blend state resolved for one draw call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ResolvedBlend {
    pub mode: BlendMode,
    pub noise: NoiseRange,
    pub seed: u32,
}

impl ResolvedBlend {
    /// Segment override first, then the flush-wide override, then the surface state.
    pub fn resolve(
        segment: BlendOverride,
        flush_override: Option<BlendMode>,
        state: &BlendState,
    ) -> Self {
        let mode = segment.mode().or(flush_override).unwrap_or(state.mode);
        Self { mode, noise: state.noise, seed: state.seed }
    }
}

fn time_seed() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
        .unwrap_or(0x9e37_79b9)
}

/// PCG-style integer hash. Mirrored bit-for-bit in `shaders/draw.wgsl`.
#[inline]
pub(crate) fn pcg_hash(v: u32) -> u32 {
    let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Noise offset for one channel of the fragment at pixel `(x, y)`.
#[inline]
pub(crate) fn noise_offset(noise: &NoiseRange, seed: u32, x: u32, y: u32, channel: usize) -> i32 {
    let lo = noise.min[channel] as i32;
    let hi = noise.max[channel] as i32;
    if hi <= lo {
        return lo;
    }
    let h = pcg_hash(x ^ pcg_hash(y ^ pcg_hash(seed.wrapping_add(channel as u32))));
    let span = (hi - lo + 1) as u32;
    lo + (h % span) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_override_wins_over_state() {
        let state = BlendState::new(BlendMode::Alpha);
        let r = ResolvedBlend::resolve(BlendOverride::ForceReplace, None, &state);
        assert_eq!(r.mode, BlendMode::Replace);
    }

    #[test]
    fn flush_override_wins_over_state_only() {
        let state = BlendState::new(BlendMode::Replace);
        let r = ResolvedBlend::resolve(BlendOverride::None, Some(BlendMode::Alpha), &state);
        assert_eq!(r.mode, BlendMode::Alpha);
        let r = ResolvedBlend::resolve(BlendOverride::ForceReplace, Some(BlendMode::Alpha), &state);
        assert_eq!(r.mode, BlendMode::Replace);
    }

    #[test]
    fn noise_offset_stays_in_range_and_is_deterministic() {
        let noise = NoiseRange::new([-5, 0, 3, 0], [5, 0, 9, 0]);
        for x in 0..64 {
            for y in 0..8 {
                let r = noise_offset(&noise, 42, x, y, 0);
                assert!((-5..=5).contains(&r));
                assert_eq!(r, noise_offset(&noise, 42, x, y, 0));
                assert_eq!(noise_offset(&noise, 42, x, y, 1), 0);
                assert!((3..=9).contains(&noise_offset(&noise, 42, x, y, 2)));
            }
        }
    }
}
