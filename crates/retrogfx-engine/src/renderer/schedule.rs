use super::{Renderer, SurfaceId};
use crate::backend::Backend;

/// Deferred work drained at the host's tick boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum Microtask {
    /// Flush the surface and composite it onto its canvas.
    Present(SurfaceId),
}

impl<B: Backend> Renderer<B> {
    /// Schedules a flush + composite of the surface. Repeated calls before
    /// the queue drains coalesce into one.
    pub fn set_image_dirty(&mut self, id: SurfaceId) {
        let Some(surface) = self.surfaces.get_mut(&id) else { return };
        if surface.render_scheduled {
            return;
        }
        surface.render_scheduled = true;
        self.microtasks.push_back(Microtask::Present(id));
    }

    #[inline]
    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.len()
    }

    /// Runs every queued task, including ones queued while draining.
    /// Returns how many ran.
    pub fn run_microtasks(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.microtasks.pop_front() {
            ran += 1;
            match task {
                Microtask::Present(id) => {
                    // Destroyed surfaces leave their task behind.
                    let Some(surface) = self.surfaces.get_mut(&id) else { continue };
                    if !surface.render_scheduled {
                        continue;
                    }
                    surface.render_scheduled = false;
                    surface.composite(&mut self.backend);
                }
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::config::RendererConfig;
    use crate::paint::Rgba;

    fn renderer() -> Renderer<SoftwareBackend> {
        Renderer::new(SoftwareBackend::new(), RendererConfig::default())
    }

    #[test]
    fn dirty_signals_coalesce() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        r.draw_pixel(id, 0, 0, Rgba::WHITE);
        r.set_image_dirty(id);
        r.set_image_dirty(id);
        r.draw_pixel(id, 1, 0, Rgba::WHITE);
        r.set_image_dirty(id);
        assert_eq!(r.pending_microtasks(), 1);

        assert_eq!(r.run_microtasks(), 1);
        let stats = r.backend().stats();
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.composites, 1);

        let canvas = r.canvas_target(id).unwrap();
        assert_eq!(r.backend().pixel(canvas, 1, 0), Some(Rgba::WHITE));

        r.set_image_dirty(id);
        assert_eq!(r.pending_microtasks(), 1);
    }

    #[test]
    fn destroyed_surface_task_does_nothing() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        r.draw_pixel(id, 0, 0, Rgba::WHITE);
        r.set_image_dirty(id);
        r.destroy_surface(id);

        assert_eq!(r.run_microtasks(), 1);
        assert_eq!(r.backend().stats().composites, 0);
        assert_eq!(r.pending_microtasks(), 0);
    }

    #[test]
    fn surfaces_present_independently() {
        let mut r = renderer();
        let a = r.create_surface(4, 4).unwrap();
        let b = r.create_surface(4, 4).unwrap();
        r.set_image_dirty(a);
        r.set_image_dirty(b);
        r.set_image_dirty(a);
        assert_eq!(r.run_microtasks(), 2);
        assert_eq!(r.backend().stats().composites, 2);
    }
}
