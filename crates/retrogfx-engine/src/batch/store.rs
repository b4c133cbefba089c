use std::time::{Duration, Instant};

use crate::config::BatchLimits;
use crate::paint::BlendOverride;

/// The typed batches every surface owns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BatchKind {
    /// Single pixels drawn under the surface blend state.
    Points,
    /// Single pixels that always overwrite their destination.
    ReplacePoints,
    /// Solid-colored triangles.
    Geometry,
    /// Textured triangles (images, sprites, glyph quads).
    Image,
}

impl BatchKind {
    pub const ALL: [BatchKind; 4] =
        [BatchKind::Points, BatchKind::ReplacePoints, BatchKind::Geometry, BatchKind::Image];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub const fn topology(self) -> Topology {
        match self {
            BatchKind::Points | BatchKind::ReplacePoints => Topology::Points,
            BatchKind::Geometry | BatchKind::Image => Topology::Triangles,
        }
    }

    #[inline]
    pub const fn is_textured(self) -> bool {
        matches!(self, BatchKind::Image)
    }

    #[inline]
    pub const fn blend_override(self) -> BlendOverride {
        match self {
            BatchKind::ReplacePoints => BlendOverride::ForceReplace,
            _ => BlendOverride::None,
        }
    }

    pub(crate) const fn label(self) -> &'static str {
        match self {
            BatchKind::Points => "points",
            BatchKind::ReplacePoints => "replace-points",
            BatchKind::Geometry => "geometry",
            BatchKind::Image => "image",
        }
    }
}

/// Primitive draw mode of a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Triangles,
}

/// Outcome of [`Batch::reserve`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reserve {
    /// The request fits the current capacity.
    Fits,
    /// Storage was reallocated to fit the request.
    Grew,
    /// The request would pass the hard maximum: flush, then retry.
    NeedsFlush,
}

/// Borrowed view of a batch's live `[0, count)` range, handed to backends for upload.
#[derive(Debug, Copy, Clone)]
pub struct BatchView<'a> {
    pub kind: BatchKind,
    pub positions: &'a [[f32; 2]],
    pub colors: &'a [[f32; 4]],
    /// Present for textured batches only.
    pub uvs: Option<&'a [[f32; 2]]>,
}

impl BatchView<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// CPU-side vertex storage for one batch kind.
///
/// Storage is allocated at exactly `capacity` vertices; `count` of them are
/// live. Invariant: `count <= capacity`.
#[derive(Debug)]
pub struct Batch {
    kind: BatchKind,
    positions: Vec<[f32; 2]>,
    colors: Vec<[f32; 4]>,
    uvs: Option<Vec<[f32; 2]>>,

    count: usize,
    capacity: usize,
    limits: BatchLimits,

    // shrink bookkeeping
    peak: usize,
    cooldown: Duration,
    shrink_deadline: Instant,
}

impl Batch {
    pub fn new(kind: BatchKind, limits: BatchLimits, cooldown: Duration) -> Self {
        let limits = BatchLimits::new(limits.min.max(1), limits.max.max(limits.min.max(1)));
        let capacity = limits.min;
        Self {
            kind,
            positions: vec![[0.0; 2]; capacity],
            colors: vec![[0.0; 4]; capacity],
            uvs: kind.is_textured().then(|| vec![[0.0; 2]; capacity]),
            count: 0,
            capacity,
            limits,
            peak: 0,
            cooldown,
            shrink_deadline: Instant::now() + cooldown,
        }
    }

    #[inline]
    pub fn kind(&self) -> BatchKind {
        self.kind
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub fn view(&self) -> BatchView<'_> {
        BatchView {
            kind: self.kind,
            positions: &self.positions[..self.count],
            colors: &self.colors[..self.count],
            uvs: self.uvs.as_deref().map(|uv| &uv[..self.count]),
        }
    }

    /// Makes room for `additional` more vertices.
    ///
    /// Growth doubles the capacity (capped at the hard maximum) and never
    /// allocates less than the request. A request that passes the maximum
    /// asks the caller to flush, unless the batch is already empty, in which
    /// case the storage is sized to the request itself.
    pub fn reserve(&mut self, additional: usize) -> Reserve {
        let required = self.count + additional;
        if required <= self.capacity {
            return Reserve::Fits;
        }

        if required > self.limits.max {
            if self.count > 0 {
                return Reserve::NeedsFlush;
            }
            log::warn!(
                "{} batch: single request of {} vertices exceeds hard maximum {}",
                self.kind.label(),
                additional,
                self.limits.max
            );
            self.reallocate(required);
            return Reserve::Grew;
        }

        let doubled = self.capacity.saturating_mul(2).min(self.limits.max);
        self.reallocate(required.max(doubled));
        Reserve::Grew
    }

    #[inline]
    pub fn push(&mut self, pos: [f32; 2], color: [f32; 4]) {
        debug_assert!(self.count < self.capacity, "{} batch overflow", self.kind.label());
        self.positions[self.count] = pos;
        self.colors[self.count] = color;
        self.count += 1;
    }

    #[inline]
    pub fn push_textured(&mut self, pos: [f32; 2], uv: [f32; 2], color: [f32; 4]) {
        if let Some(uvs) = self.uvs.as_mut() {
            uvs[self.count] = uv;
        }
        self.push(pos, color);
    }

    /// Logically empties the batch, then runs the shrink check.
    pub fn reset(&mut self, now: Instant) {
        self.peak = self.peak.max(self.count);
        self.count = 0;
        self.maybe_shrink(now);
    }

    fn maybe_shrink(&mut self, now: Instant) {
        if now < self.shrink_deadline {
            return;
        }
        if self.peak < self.capacity / 2 && self.capacity > self.limits.min {
            let target = (self.capacity / 2).max(self.limits.min);
            log::debug!(
                "{} batch: shrinking {} -> {} (peak {})",
                self.kind.label(),
                self.capacity,
                target,
                self.peak
            );
            self.reallocate(target);
        }
        self.peak = 0;
        self.shrink_deadline = now + self.cooldown;
    }

    /// Reallocates storage to `capacity`, keeping the live `[0, count)` region.
    fn reallocate(&mut self, capacity: usize) {
        debug_assert!(capacity >= self.count);
        if capacity > self.capacity {
            log::debug!("{} batch: growing {} -> {}", self.kind.label(), self.capacity, capacity);
        }
        self.positions = copy_live(&self.positions, self.count, capacity);
        self.colors = copy_live(&self.colors, self.count, capacity);
        if let Some(uvs) = self.uvs.as_ref() {
            self.uvs = Some(copy_live(uvs, self.count, capacity));
        }
        self.capacity = capacity;
    }
}

fn copy_live<T: Copy + Default>(old: &[T], live: usize, capacity: usize) -> Vec<T> {
    let mut v = Vec::with_capacity(capacity);
    v.extend_from_slice(&old[..live]);
    v.resize(capacity, T::default());
    v
}
