use std::time::Duration;

/// Capacity bounds for one batch, in vertices.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BatchLimits {
    /// Initial capacity and the floor for shrinking.
    pub min: usize,
    /// Hard maximum; reaching it forces an early flush.
    pub max: usize,
}

impl BatchLimits {
    #[inline]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Adaptive bezier tessellation and stroking parameters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TessellationConfig {
    /// Max squared perpendicular distance (px²) of the interior control
    /// points from the chord before a segment is accepted as flat.
    pub tolerance: f32,
    /// Recursion ceiling for de Casteljau subdivision.
    pub max_depth: u32,
    /// Miter joins longer than `miter_limit * half_width` fall back to the
    /// un-mitered offset.
    pub miter_limit: f32,
}

impl Default for TessellationConfig {
    fn default() -> Self {
        Self { tolerance: 0.25, max_depth: 16, miter_limit: 4.0 }
    }
}

/// Renderer configuration.
///
/// Defaults suit a retro framebuffer up to roughly 1024×1024 px.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    pub points: BatchLimits,
    pub replace_points: BatchLimits,
    pub geometry: BatchLimits,
    pub image: BatchLimits,

    /// Minimum time between two shrink checks of a batch.
    pub shrink_cooldown: Duration,

    pub tessellation: TessellationConfig,

    /// Pen dots of sizes `1..=prewarm_max_size` are cached at startup.
    /// Zero disables pre-warming; values past
    /// [`MAX_CACHED_SIZE`](crate::geometry_cache::MAX_CACHED_SIZE) are capped.
    pub prewarm_max_size: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            points: BatchLimits::new(4_096, 1 << 20),
            replace_points: BatchLimits::new(1_024, 1 << 18),
            geometry: BatchLimits::new(6 * 1_024, 6 * (1 << 17)),
            image: BatchLimits::new(6 * 256, 6 * (1 << 15)),
            shrink_cooldown: Duration::from_secs(5),
            tessellation: TessellationConfig::default(),
            prewarm_max_size: 8,
        }
    }
}
