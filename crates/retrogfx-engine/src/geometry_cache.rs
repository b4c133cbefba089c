use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RenderError;
use crate::raster::{self, Span};

/// Shape of a cached pen dot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShapeKind {
    Circle = 0,
    Square = 1,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 2] = [ShapeKind::Circle, ShapeKind::Square];
}

impl TryFrom<u8> for ShapeKind {
    type Error = RenderError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(ShapeKind::Circle),
            1 => Ok(ShapeKind::Square),
            other => Err(RenderError::InvalidShapeKind(other)),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Square => "square",
        })
    }
}

/// Origin-relative triangle list, shared between draws.
pub type CachedGeometry = Arc<[[f32; 2]]>;

/// Sizes above this are generated per call and never stored.
pub const MAX_CACHED_SIZE: u32 = 64;

/// Memoized triangle lists for pen dots, keyed by shape and pixel size.
///
/// Vertices are relative to the pixel the dot is centered on, in pixel-edge
/// coordinates. Entries are never evicted; only sizes up to
/// [`MAX_CACHED_SIZE`] are kept, so the table stays bounded.
#[derive(Debug, Default)]
pub struct GeometryCache {
    entries: HashMap<(ShapeKind, u32), CachedGeometry>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates every shape for sizes `1..=max_size`, capped at [`MAX_CACHED_SIZE`].
    pub fn prewarm(&mut self, max_size: u32) {
        for size in 1..=max_size.min(MAX_CACHED_SIZE) {
            for kind in ShapeKind::ALL {
                self.get(kind, size);
            }
        }
        log::debug!("geometry cache prewarmed: {} entries", self.entries.len());
    }

    pub fn get(&mut self, kind: ShapeKind, size: u32) -> CachedGeometry {
        if size > MAX_CACHED_SIZE {
            log::debug!("geometry cache: {kind} of size {size} generated uncached");
            return generate(kind, size);
        }
        self.entries
            .entry((kind, size))
            .or_insert_with(|| generate(kind, size))
            .clone()
    }

    pub fn contains(&self, kind: ShapeKind, size: u32) -> bool {
        self.entries.contains_key(&(kind, size))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn generate(kind: ShapeKind, size: u32) -> CachedGeometry {
    if size == 0 {
        return Arc::from(Vec::new());
    }
    let mut tris = Vec::new();
    match kind {
        ShapeKind::Circle => {
            let mut spans: Vec<Span> = Vec::new();
            raster::disc_spans((size / 2) as i32, &mut spans);
            raster::push_span_triangles(&mut tris, &spans, 0, 0);
        }
        ShapeKind::Square => {
            let lo = -((size / 2) as f32);
            let hi = lo + size as f32;
            raster::push_rect_triangles(&mut tris, lo, lo, hi, hi);
        }
    }
    tris.into_iter().map(|v| v.to_array()).collect()
}
