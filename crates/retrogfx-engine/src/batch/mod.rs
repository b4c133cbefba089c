//! Batch Store & Capacity Manager, plus the Draw-Order Tracker.
//!
//! Vertices are grouped by [`BatchKind`] so each kind uploads in one buffer;
//! [`DrawOrder`] keeps enough bookkeeping to replay them in issue order.

mod order;
mod store;

pub use order::{DrawOrder, Segment};
pub use store::{Batch, BatchKind, BatchView, Reserve, Topology};

use std::time::Instant;

use crate::config::RendererConfig;

/// The four batches of one surface, indexed by [`BatchKind`].
#[derive(Debug)]
pub struct BatchSet {
    batches: [Batch; 4],
}

impl BatchSet {
    pub fn new(config: &RendererConfig) -> Self {
        let cooldown = config.shrink_cooldown;
        Self {
            batches: [
                Batch::new(BatchKind::Points, config.points, cooldown),
                Batch::new(BatchKind::ReplacePoints, config.replace_points, cooldown),
                Batch::new(BatchKind::Geometry, config.geometry, cooldown),
                Batch::new(BatchKind::Image, config.image, cooldown),
            ],
        }
    }

    #[inline]
    pub fn get(&self, kind: BatchKind) -> &Batch {
        &self.batches[kind.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, kind: BatchKind) -> &mut Batch {
        &mut self.batches[kind.index()]
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(Batch::is_empty)
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        for batch in &mut self.batches {
            batch.reset(now);
        }
    }
}
