//! Source images and the per-context texture registry.
//!
//! GPU textures are created lazily the first time a surface draws an image and
//! shared by every surface of the same renderer. Each surface holding a
//! texture counts as one reference; the texture is freed when the last
//! surface releases it or when it is deleted explicitly.

use std::collections::HashMap;
use std::sync::Arc;

use crate::coords::SurfaceSize;
use crate::paint::Rgba;

/// Handle to an image registered with a renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub(crate) u32);

/// Backend-facing handle for one uploaded texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey(pub(crate) u64);

/// RGBA8 straight-alpha pixels, rows top-down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Wraps raw RGBA bytes. `None` if the length does not match the size.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A `width × height` image filled with one color.
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixels = color.to_array().repeat(width as usize * height as usize);
        Self { width, height, pixels }
    }

    #[inline]
    pub fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some(Rgba::new(self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]))
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, c: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[i..i + 4].copy_from_slice(&c.to_array());
    }
}

#[derive(Debug)]
struct LiveTexture {
    key: TextureKey,
    refs: usize,
}

/// Registered images plus the textures currently alive for them.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    images: HashMap<ImageId, Arc<ImageData>>,
    live: HashMap<ImageId, LiveTexture>,
    next_image: u32,
    next_key: u64,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, image: ImageData) -> ImageId {
        let id = ImageId(self.next_image);
        self.next_image += 1;
        self.images.insert(id, Arc::new(image));
        id
    }

    #[inline]
    pub fn image(&self, id: ImageId) -> Option<&Arc<ImageData>> {
        self.images.get(&id)
    }

    #[inline]
    pub fn texture_key(&self, id: ImageId) -> Option<TextureKey> {
        self.live.get(&id).map(|t| t.key)
    }

    #[inline]
    pub fn ref_count(&self, id: ImageId) -> usize {
        self.live.get(&id).map_or(0, |t| t.refs)
    }

    /// Allocates a key for a texture about to be created for `id`.
    pub(crate) fn allocate_key(&mut self) -> TextureKey {
        let key = TextureKey(self.next_key);
        self.next_key += 1;
        key
    }

    /// Records a surface reference to the texture of `id` (created under `key`
    /// when no texture is alive yet). Returns the live key.
    pub(crate) fn acquire(&mut self, id: ImageId, key: TextureKey) -> TextureKey {
        let entry = self.live.entry(id).or_insert(LiveTexture { key, refs: 0 });
        entry.refs += 1;
        entry.key
    }

    /// Drops one surface reference. Returns the key to delete when it was the last.
    pub(crate) fn release(&mut self, id: ImageId) -> Option<TextureKey> {
        let entry = self.live.get_mut(&id)?;
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            return self.live.remove(&id).map(|t| t.key);
        }
        None
    }

    /// Forgets the live texture of `id` regardless of references.
    pub(crate) fn evict(&mut self, id: ImageId) -> Option<TextureKey> {
        self.live.remove(&id).map(|t| t.key)
    }

    /// Forgets every live texture. Used when the context dies and takes them along.
    pub(crate) fn evict_all(&mut self) -> usize {
        let n = self.live.len();
        self.live.clear();
        n
    }

    pub(crate) fn unregister(&mut self, id: ImageId) -> Option<Arc<ImageData>> {
        self.images.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_data_rejects_wrong_length() {
        assert!(ImageData::new(2, 2, vec![0; 15]).is_none());
        assert!(ImageData::new(2, 2, vec![0; 16]).is_some());
    }

    #[test]
    fn refcount_frees_on_last_release() {
        let mut reg = TextureRegistry::new();
        let id = reg.register(ImageData::filled(1, 1, Rgba::WHITE));
        let key = reg.allocate_key();
        assert_eq!(reg.acquire(id, key), key);
        let again = reg.texture_key(id).unwrap_or(key);
        assert_eq!(reg.acquire(id, again), key);
        assert_eq!(reg.ref_count(id), 2);
        assert_eq!(reg.release(id), None);
        assert_eq!(reg.release(id), Some(key));
        assert_eq!(reg.texture_key(id), None);
    }

    #[test]
    fn pixel_accessors_are_bounds_checked() {
        let mut img = ImageData::filled(2, 2, Rgba::BLACK);
        img.set_pixel(1, 0, Rgba::WHITE);
        img.set_pixel(5, 5, Rgba::WHITE);
        assert_eq!(img.pixel(1, 0), Some(Rgba::WHITE));
        assert_eq!(img.pixel(0, 0), Some(Rgba::BLACK));
        assert_eq!(img.pixel(2, 0), None);
    }
}
