use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::{Renderer, SurfaceId};
use crate::backend::Backend;
use crate::coords::PixelRect;
use crate::error::{RenderError, Result};
use crate::paint::Rgba;
use crate::texture::ImageData;

/// Completes on its second poll, handing control back to the executor once.
#[derive(Debug, Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

impl<B: Backend> Renderer<B> {
    /// Color at `(x, y)` after flushing pending drawing. `Ok(None)` off the
    /// surface.
    pub fn read_pixel(&mut self, id: SurfaceId, x: i32, y: i32) -> Result<Option<Rgba>> {
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        surface.read_pixel(&mut self.backend, x, y)
    }

    /// `rect`, clamped to the surface, as top-down RGBA8.
    pub fn read_pixels_raw(&mut self, id: SurfaceId, rect: PixelRect) -> Result<Option<ImageData>> {
        let surface = self.surfaces.get_mut(&id).ok_or(RenderError::UnknownSurface(id))?;
        surface.read_rect(&mut self.backend, rect)
    }

    /// `rect`, clamped to the surface, as rows of colors (top row first).
    pub fn read_pixels(&mut self, id: SurfaceId, rect: PixelRect) -> Result<Option<Vec<Vec<Rgba>>>> {
        let Some(image) = self.read_pixels_raw(id, rect)? else { return Ok(None) };
        let rows = image
            .pixels
            .chunks_exact(image.width as usize * 4)
            .map(|row| row.chunks_exact(4).map(|c| Rgba::new(c[0], c[1], c[2], c[3])).collect())
            .collect();
        Ok(Some(rows))
    }

    /// [`read_pixel`](Self::read_pixel) after yielding to the executor once.
    pub async fn read_pixel_async(&mut self, id: SurfaceId, x: i32, y: i32) -> Result<Option<Rgba>> {
        YieldNow::default().await;
        self.read_pixel(id, x, y)
    }

    /// [`read_pixels`](Self::read_pixels) after yielding to the executor once.
    pub async fn read_pixels_async(&mut self, id: SurfaceId, rect: PixelRect) -> Result<Option<Vec<Vec<Rgba>>>> {
        YieldNow::default().await;
        self.read_pixels(id, rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::config::RendererConfig;

    fn renderer() -> Renderer<SoftwareBackend> {
        Renderer::new(SoftwareBackend::new(), RendererConfig::default())
    }

    #[test]
    fn rows_of_colors() {
        let mut r = renderer();
        let id = r.create_surface(5, 5).unwrap();
        r.put_pixel(id, 2, 1, Rgba::WHITE);
        r.put_pixel(id, 3, 3, Rgba::BLACK);

        let rows = r.read_pixels(id, PixelRect::new(2, 1, 2, 3)).unwrap().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec![Rgba::WHITE, Rgba::TRANSPARENT]);
        assert_eq!(rows[2], vec![Rgba::TRANSPARENT, Rgba::BLACK]);
    }

    #[test]
    fn out_of_bounds_reads() {
        let mut r = renderer();
        let id = r.create_surface(5, 5).unwrap();
        assert_eq!(r.read_pixel(id, 5, 0).unwrap(), None);
        assert!(r.read_pixels(id, PixelRect::new(-4, -4, 3, 3)).unwrap().is_none());
        assert_eq!(r.read_pixels_raw(id, PixelRect::new(3, 3, 9, 9)).unwrap().map(|i| i.size().width), Some(2));
    }

    #[test]
    fn unknown_surface_read_is_an_error() {
        let mut r = renderer();
        let id = r.create_surface(5, 5).unwrap();
        r.destroy_surface(id);
        assert!(matches!(r.read_pixel(id, 0, 0), Err(RenderError::UnknownSurface(_))));
    }

    #[test]
    fn async_reads_see_pending_drawing() {
        let mut r = renderer();
        let id = r.create_surface(4, 4).unwrap();
        r.draw_pixel(id, 1, 2, Rgba::opaque(1, 2, 3));

        let px = pollster::block_on(r.read_pixel_async(id, 1, 2)).unwrap();
        assert_eq!(px, Some(Rgba::opaque(1, 2, 3)));

        let rows = pollster::block_on(r.read_pixels_async(id, PixelRect::new(0, 2, 4, 1))).unwrap().unwrap();
        assert_eq!(rows[0][1], Rgba::opaque(1, 2, 3));
    }

    #[test]
    fn yield_now_pends_once() {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        let mut fut = YieldNow::default();
        assert!(Pin::new(&mut fut).poll(&mut cx).is_pending());
        assert!(Pin::new(&mut fut).poll(&mut cx).is_ready());
    }
}
