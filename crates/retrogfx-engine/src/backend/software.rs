use std::collections::HashMap;

use anyhow::{Result, bail, ensure};

use super::{Backend, DrawCall, RowOrder, TargetId};
use crate::batch::{BatchKind, BatchView, Topology};
use crate::coords::{PixelRect, SurfaceSize};
use crate::paint::{BlendMode, ResolvedBlend, Rgba, noise_offset};
use crate::texture::{ImageData, TextureKey};

/// Counters for inspecting how the renderer drove the backend.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SoftwareStats {
    pub flushes: usize,
    pub uploads: usize,
    pub draw_calls: usize,
    pub composites: usize,
}

/// Framebuffer stored bottom-up, the way GL-style backends lay rows out.
#[derive(Debug)]
struct Target {
    size: SurfaceSize,
    pixels: Vec<[u8; 4]>,
}

impl Target {
    fn new(size: SurfaceSize) -> Self {
        Self { size, pixels: vec![[0; 4]; size.pixel_count()] }
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        let row = self.size.height as i32 - 1 - y;
        row as usize * self.size.width as usize + x as usize
    }

    #[inline]
    fn get(&self, x: i32, y: i32) -> [u8; 4] {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    fn set(&mut self, x: i32, y: i32, c: [u8; 4]) {
        let i = self.index(x, y);
        self.pixels[i] = c;
    }
}

#[derive(Debug, Default)]
struct Uploaded {
    positions: Vec<[f32; 2]>,
    colors: Vec<[f32; 4]>,
    uvs: Vec<[f32; 2]>,
}

/// Immediate CPU rasterizer.
///
/// Points light the pixel they fall in; triangles cover pixels whose centers
/// are inside under the top-left fill rule, interpolating color and texture
/// coordinates barycentrically. Textures sample nearest. Blending matches
/// the wgpu pipelines: straight-alpha source-over or replace, with per-channel
/// noise applied to the source first.
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    targets: HashMap<TargetId, Target>,
    textures: HashMap<TextureKey, ImageData>,
    next_target: u32,

    current: Option<TargetId>,
    uploaded: [Uploaded; 4],

    stats: SoftwareStats,
    lost: bool,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SoftwareStats {
        self.stats
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn target_size(&self, target: TargetId) -> Option<SurfaceSize> {
        self.targets.get(&target).map(|t| t.size)
    }

    /// Pixel at top-left based `(x, y)`.
    pub fn pixel(&self, target: TargetId, x: i32, y: i32) -> Option<Rgba> {
        let t = self.targets.get(&target)?;
        t.size.contains(x, y).then(|| Rgba::from_array(t.get(x, y)))
    }

    /// Simulates device loss: every target and texture is dropped.
    pub fn lose_context(&mut self) {
        log::warn!("software backend: context lost");
        self.lost = true;
        self.targets.clear();
        self.textures.clear();
        self.current = None;
    }

    pub fn restore_context(&mut self) {
        self.lost = false;
    }

    fn rasterize_points(target: &mut Target, data: &Uploaded, call: &DrawCall) {
        for i in call.range.clone() {
            let [x, y] = data.positions[i];
            let (px, py) = (x.floor() as i32, y.floor() as i32);
            if target.size.contains(px, py) {
                shade(target, px, py, data.colors[i], &call.blend);
            }
        }
    }

    fn rasterize_triangles(
        target: &mut Target,
        data: &Uploaded,
        texture: Option<&ImageData>,
        call: &DrawCall,
    ) {
        let end = call.range.end.min(data.positions.len());
        let mut i = call.range.start;
        while i + 3 <= end {
            let tri = [i, i + 1, i + 2].map(|k| Vertex {
                pos: data.positions[k],
                color: data.colors[k],
                uv: data.uvs.get(k).copied().unwrap_or_default(),
            });
            fill_triangle(target, tri, texture, &call.blend);
            i += 3;
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Vertex {
    pos: [f32; 2],
    color: [f32; 4],
    uv: [f32; 2],
}

#[inline]
fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Top edges run horizontally rightwards, left edges run upwards (y-down,
/// positive-area winding).
#[inline]
fn is_top_left(a: [f32; 2], b: [f32; 2]) -> bool {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    (dy == 0.0 && dx > 0.0) || dy < 0.0
}

#[inline]
fn covers(w: f32, a: [f32; 2], b: [f32; 2]) -> bool {
    w > 0.0 || (w == 0.0 && is_top_left(a, b))
}

fn fill_triangle(target: &mut Target, tri: [Vertex; 3], texture: Option<&ImageData>, blend: &ResolvedBlend) {
    let [a, mut b, mut c] = tri;
    let mut area = edge(a.pos, b.pos, c.pos);
    if area == 0.0 || !area.is_finite() {
        return;
    }
    if area < 0.0 {
        core::mem::swap(&mut b, &mut c);
        area = -area;
    }

    let xs = [a.pos[0], b.pos[0], c.pos[0]];
    let ys = [a.pos[1], b.pos[1], c.pos[1]];
    let (w, h) = (target.size.width as f32, target.size.height as f32);
    let x0 = xs.iter().copied().fold(f32::MAX, f32::min).floor().max(0.0) as i32;
    let x1 = xs.iter().copied().fold(f32::MIN, f32::max).ceil().min(w) as i32;
    let y0 = ys.iter().copied().fold(f32::MAX, f32::min).floor().max(0.0) as i32;
    let y1 = ys.iter().copied().fold(f32::MIN, f32::max).ceil().min(h) as i32;

    for py in y0..y1 {
        for px in x0..x1 {
            let p = [px as f32 + 0.5, py as f32 + 0.5];
            let wa = edge(b.pos, c.pos, p);
            let wb = edge(c.pos, a.pos, p);
            let wc = edge(a.pos, b.pos, p);
            if !(covers(wa, b.pos, c.pos) && covers(wb, c.pos, a.pos) && covers(wc, a.pos, b.pos)) {
                continue;
            }
            let (la, lb, lc) = (wa / area, wb / area, wc / area);
            let mut color = [0.0f32; 4];
            for (ch, out) in color.iter_mut().enumerate() {
                *out = a.color[ch] * la + b.color[ch] * lb + c.color[ch] * lc;
            }
            if let Some(tex) = texture {
                let u = a.uv[0] * la + b.uv[0] * lb + c.uv[0] * lc;
                let v = a.uv[1] * la + b.uv[1] * lb + c.uv[1] * lc;
                let texel = sample_nearest(tex, u, v).to_f32();
                for (out, t) in color.iter_mut().zip(texel) {
                    *out *= t;
                }
            }
            shade(target, px, py, color, blend);
        }
    }
}

fn sample_nearest(tex: &ImageData, u: f32, v: f32) -> Rgba {
    let tx = ((u * tex.width as f32).floor() as i64).clamp(0, tex.width as i64 - 1) as u32;
    let ty = ((v * tex.height as f32).floor() as i64).clamp(0, tex.height as i64 - 1) as u32;
    tex.pixel(tx, ty).unwrap_or(Rgba::TRANSPARENT)
}

fn shade(target: &mut Target, x: i32, y: i32, color: [f32; 4], blend: &ResolvedBlend) {
    let mut src = color;
    if !blend.noise.is_none() {
        for (ch, s) in src.iter_mut().enumerate() {
            *s += noise_offset(&blend.noise, blend.seed, x as u32, y as u32, ch) as f32 / 255.0;
        }
    }
    let src = src.map(|s| s.clamp(0.0, 1.0));

    let out = match blend.mode {
        BlendMode::Replace => src,
        BlendMode::Alpha => {
            let dst = Rgba::from_array(target.get(x, y)).to_f32();
            let sa = src[3];
            let mut out = [0.0; 4];
            for ch in 0..4 {
                out[ch] = src[ch] * sa + dst[ch] * (1.0 - sa);
            }
            out
        }
    };
    target.set(x, y, Rgba::from_f32(out).to_array());
}

impl Backend for SoftwareBackend {
    fn row_order(&self) -> RowOrder {
        RowOrder::BottomUp
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn create_target(&mut self, size: SurfaceSize) -> Result<TargetId> {
        ensure!(!self.lost, "context lost");
        ensure!(size.is_valid(), "invalid target size {}x{}", size.width, size.height);
        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, Target::new(size));
        Ok(id)
    }

    fn resize_target(&mut self, target: TargetId, size: SurfaceSize) -> Result<()> {
        ensure!(!self.lost, "context lost");
        ensure!(size.is_valid(), "invalid target size {}x{}", size.width, size.height);
        let Some(t) = self.targets.get_mut(&target) else { bail!("unknown target {target:?}") };
        *t = Target::new(size);
        Ok(())
    }

    fn destroy_target(&mut self, target: TargetId) {
        self.targets.remove(&target);
    }

    fn clear_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.get_mut(&target) {
            t.pixels.fill([0; 4]);
        }
    }

    fn copy_region(&mut self, src: TargetId, dst: TargetId, region: PixelRect, dst_x: i32, dst_y: i32) {
        let Some(s) = self.targets.get(&src) else { return };
        let Some(dst_size) = self.targets.get(&dst).map(|t| t.size) else { return };

        let region = region.normalized();
        let Some(clipped) = region.clamp_to(s.size) else { return };
        let dx = dst_x + (clipped.x - region.x);
        let dy = dst_y + (clipped.y - region.y);
        let Some(out) = PixelRect::new(dx, dy, clipped.w, clipped.h).clamp_to(dst_size) else { return };
        let (sx, sy) = (clipped.x + (out.x - dx), clipped.y + (out.y - dy));

        let mut block = Vec::with_capacity(out.w as usize * out.h as usize);
        for row in 0..out.h {
            for col in 0..out.w {
                block.push(s.get(sx + col, sy + row));
            }
        }
        let Some(d) = self.targets.get_mut(&dst) else { return };
        let mut texels = block.into_iter();
        for row in 0..out.h {
            for col in 0..out.w {
                if let Some(c) = texels.next() {
                    d.set(out.x + col, out.y + row, c);
                }
            }
        }
    }

    fn create_texture(&mut self, key: TextureKey, image: &ImageData) -> Result<()> {
        ensure!(!self.lost, "context lost");
        ensure!(!image.is_empty(), "empty image");
        self.textures.insert(key, image.clone());
        Ok(())
    }

    fn delete_texture(&mut self, key: TextureKey) {
        self.textures.remove(&key);
    }

    fn begin_flush(&mut self, target: TargetId, clear: bool) {
        if self.lost {
            return;
        }
        if clear {
            self.clear_target(target);
        }
        self.current = Some(target);
        self.stats.flushes += 1;
    }

    fn upload(&mut self, batch: BatchView<'_>) {
        let slot = &mut self.uploaded[batch.kind.index()];
        slot.positions.clear();
        slot.positions.extend_from_slice(batch.positions);
        slot.colors.clear();
        slot.colors.extend_from_slice(batch.colors);
        slot.uvs.clear();
        if let Some(uvs) = batch.uvs {
            slot.uvs.extend_from_slice(uvs);
        }
        self.stats.uploads += 1;
    }

    fn draw(&mut self, call: &DrawCall) {
        let Some(current) = self.current else { return };
        let Some(target) = self.targets.get_mut(&current) else { return };
        let data = &self.uploaded[call.batch.index()];
        if call.range.end > data.positions.len() {
            log::warn!("software backend: draw range {:?} past uploaded {} vertices", call.range, data.positions.len());
            return;
        }
        self.stats.draw_calls += 1;
        match call.topology {
            Topology::Points => Self::rasterize_points(target, data, call),
            Topology::Triangles => {
                let texture = match (call.batch, call.texture) {
                    (BatchKind::Image, Some(key)) => match self.textures.get(&key) {
                        Some(tex) => Some(tex),
                        None => {
                            log::debug!("software backend: texture {key:?} missing, draw skipped");
                            return;
                        }
                    },
                    _ => None,
                };
                Self::rasterize_triangles(target, data, texture, call);
            }
        }
    }

    fn end_flush(&mut self) {
        self.current = None;
    }

    fn composite(&mut self, src: TargetId, dst: TargetId) {
        let Some(size) = self.target_size(src) else { return };
        self.copy_region(src, dst, size.bounds(), 0, 0);
        self.stats.composites += 1;
    }

    fn read_pixels(&mut self, target: TargetId, region: PixelRect) -> Result<Vec<u8>> {
        ensure!(!self.lost, "context lost");
        let Some(t) = self.targets.get(&target) else { bail!("unknown target {target:?}") };
        ensure!(
            region.clamp_to(t.size) == Some(region),
            "region {region:?} outside {}x{} target",
            t.size.width,
            t.size.height
        );
        let width = t.size.width as usize;
        let mut out = Vec::with_capacity(region.w as usize * region.h as usize * 4);
        for row in region.y..region.bottom() {
            let start = row as usize * width + region.x as usize;
            for px in &t.pixels[start..start + region.w as usize] {
                out.extend_from_slice(px);
            }
        }
        Ok(out)
    }
}
