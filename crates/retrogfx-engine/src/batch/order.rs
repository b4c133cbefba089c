use core::ops::Range;

use crate::paint::BlendOverride;
use crate::texture::TextureKey;

use super::BatchKind;

/// One uninterrupted run of same-kind (and, for images, same-texture) drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub batch: BatchKind,
    pub start: usize,
    /// `None` while the segment is still accumulating.
    pub end: Option<usize>,
    pub blend_override: BlendOverride,
    pub texture: Option<TextureKey>,
}

impl Segment {
    /// Vertex range of a closed segment.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end.unwrap_or(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.range().is_empty()
    }
}

/// Records segments in issue order so a flush can replay them faithfully even
/// though vertices are stored grouped by batch kind.
///
/// Invariant: for each batch, the closed segments of that batch partition
/// `[0, count)` in issue order.
#[derive(Debug, Default)]
pub struct DrawOrder {
    segments: Vec<Segment>,
    active: Option<(BatchKind, Option<TextureKey>)>,
}

impl DrawOrder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether appending to `kind` (bound to `texture`) needs a new segment.
    #[inline]
    pub fn needs_switch(&self, kind: BatchKind, texture: Option<TextureKey>) -> bool {
        self.active != Some((kind, texture))
    }

    #[inline]
    pub fn active_batch(&self) -> Option<BatchKind> {
        self.active.map(|(kind, _)| kind)
    }

    /// Closes the open segment (if any) at `end`.
    pub fn close(&mut self, end: usize) {
        if let Some(seg) = self.segments.last_mut()
            && seg.end.is_none()
        {
            debug_assert!(end >= seg.start);
            seg.end = Some(end);
        }
        self.active = None;
    }

    /// Opens a new segment for `kind` starting at vertex `start`.
    pub fn open(&mut self, kind: BatchKind, start: usize, texture: Option<TextureKey>) {
        debug_assert!(
            self.segments.last().is_none_or(|s| s.end.is_some()),
            "open() with a segment still open"
        );
        self.segments.push(Segment {
            batch: kind,
            start,
            end: None,
            blend_override: kind.blend_override(),
            texture,
        });
        self.active = Some((kind, texture));
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Drops every segment and the active-batch tracker.
    #[inline]
    pub fn clear(&mut self) {
        self.segments.clear();
        self.active = None;
    }

    /// Whether any segment references `texture`.
    pub fn references(&self, texture: TextureKey) -> bool {
        self.segments.iter().any(|s| s.texture == Some(texture))
    }
}
