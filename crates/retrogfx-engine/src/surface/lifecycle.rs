use super::{Surface, Targets, target_error};
use crate::backend::Backend;
use crate::coords::{PixelRect, SurfaceSize};
use crate::error::{RenderError, Result};

impl Surface {
    /// Content-preserving resize: the top-left overlap of old and new sizes
    /// survives, everything else is transparent.
    pub fn resize<B: Backend>(&mut self, backend: &mut B, size: SurfaceSize) -> Result<()> {
        if !size.is_valid() {
            return Err(RenderError::TargetCreation {
                width: size.width,
                height: size.height,
                reason: "surface must be at least 1x1".into(),
            });
        }
        if size == self.size {
            return Ok(());
        }
        self.flush(backend, None);

        let keep = self.size.overlap(size).bounds();
        let Targets { primary, scratch, canvas } = self.targets;

        backend.clear_target(scratch);
        backend.copy_region(primary, scratch, keep, 0, 0);
        backend.resize_target(primary, size).map_err(|e| target_error(size, e))?;
        backend.copy_region(scratch, primary, keep, 0, 0);
        backend.resize_target(scratch, size).map_err(|e| target_error(size, e))?;
        backend.resize_target(canvas, size).map_err(|e| target_error(size, e))?;

        log::debug!(
            "surface resized {}x{} -> {}x{}",
            self.size.width,
            self.size.height,
            size.width,
            size.height
        );
        self.size = size;
        Ok(())
    }

    /// Scrolls the primary up by `rows`; the bottom `rows` rows become
    /// transparent.
    pub fn shift_up<B: Backend>(&mut self, backend: &mut B, rows: u32) {
        if rows == 0 {
            return;
        }
        self.flush(backend, None);

        let Targets { primary, scratch, .. } = self.targets;
        if rows >= self.size.height {
            backend.clear_target(primary);
            return;
        }

        let (w, h, n) = (self.size.width as i32, self.size.height as i32, rows as i32);
        backend.clear_target(scratch);
        backend.copy_region(primary, scratch, PixelRect::new(0, n, w, h - n), 0, 0);
        backend.copy_region(scratch, primary, self.size.bounds(), 0, 0);
    }

    /// Flushes, then composites the primary onto the visible canvas.
    pub fn composite<B: Backend>(&mut self, backend: &mut B) {
        self.flush(backend, None);
        if self.context_lost || backend.is_context_lost() {
            return;
        }
        backend.composite(self.targets.primary, self.targets.canvas);
    }

    /// Recreates the render targets after a context loss. Pending drawing and
    /// texture references are dropped; the caller owns the registry.
    pub fn reinitialize<B: Backend>(&mut self, backend: &mut B) -> Result<()> {
        if !backend.is_context_lost() {
            self.targets.destroy(backend);
        }
        self.context_lost = true;
        let targets = Targets::create(backend, self.size)?;
        self.targets = targets;
        self.reset_batches();
        self.textures.clear();
        self.first_render = true;
        self.context_lost = false;
        Ok(())
    }
}
