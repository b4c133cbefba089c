use super::Surface;
use crate::backend::{Backend, RowOrder};
use crate::coords::PixelRect;
use crate::error::{RenderError, Result};
use crate::paint::Rgba;
use crate::texture::ImageData;

impl Surface {
    /// Reads `rect` (clamped to the surface) as top-down RGBA8. `Ok(None)`
    /// when nothing of it is on the surface.
    pub fn read_rect<B: Backend>(&mut self, backend: &mut B, rect: PixelRect) -> Result<Option<ImageData>> {
        self.flush(backend, None);
        if self.context_lost || backend.is_context_lost() {
            return Err(RenderError::ContextLost);
        }
        let Some(rect) = rect.clamp_to(self.size) else { return Ok(None) };

        let order = backend.row_order();
        let native = match order {
            RowOrder::TopDown => rect,
            RowOrder::BottomUp => PixelRect::new(rect.x, self.size.height as i32 - rect.bottom(), rect.w, rect.h),
        };
        let mut bytes = backend
            .read_pixels(self.targets.primary, native)
            .map_err(|e| RenderError::Readback(format!("{e:#}")))?;

        let row_len = rect.w as usize * 4;
        if bytes.len() != row_len * rect.h as usize {
            return Err(RenderError::Readback(format!(
                "expected {} bytes, backend returned {}",
                row_len * rect.h as usize,
                bytes.len()
            )));
        }
        if order == RowOrder::BottomUp {
            bytes = bytes.chunks_exact(row_len).rev().flatten().copied().collect();
        }
        Ok(ImageData::new(rect.w as u32, rect.h as u32, bytes))
    }

    pub fn read_pixel<B: Backend>(&mut self, backend: &mut B, x: i32, y: i32) -> Result<Option<Rgba>> {
        if !self.size.contains(x, y) {
            return Ok(None);
        }
        let image = self.read_rect(backend, PixelRect::new(x, y, 1, 1))?;
        Ok(image.and_then(|img| img.pixel(0, 0)))
    }
}
