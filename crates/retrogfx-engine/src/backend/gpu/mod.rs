//! wgpu implementation of [`Backend`]: every surface target is an offscreen
//! `Rgba8Unorm` texture.

mod pipelines;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail, ensure};

use self::pipelines::{DrawPipeline, DrawUniform, Pipelines, TARGET_FORMAT, UNIFORM_STRIDE};
use super::{Backend, DrawCall, RowOrder, TargetId};
use crate::batch::{BatchKind, BatchView, Topology};
use crate::coords::{PixelRect, SurfaceSize};
use crate::device::Gpu;
use crate::texture::{ImageData, TextureKey};

const COPY_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

struct GpuTarget {
    size: SurfaceSize,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

struct GpuTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

/// Vertex streams of one batch kind, grown on demand.
#[derive(Default)]
struct BatchBuffers {
    positions: Option<wgpu::Buffer>,
    colors: Option<wgpu::Buffer>,
    uvs: Option<wgpu::Buffer>,
    capacity: usize,
}

struct FlushState {
    target: TargetId,
    clear: bool,
    calls: Vec<DrawCall>,
}

/// Headless wgpu renderer backend.
///
/// Uploads write straight into per-kind vertex buffers; draw calls are
/// recorded and replayed in one render pass at [`end_flush`](Backend::end_flush),
/// each with its own slot in a dynamic-offset uniform buffer.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    lost: Arc<AtomicBool>,

    pipelines: Pipelines,

    targets: HashMap<TargetId, GpuTarget>,
    next_target: u32,
    textures: HashMap<TextureKey, GpuTexture>,

    buffers: [BatchBuffers; 4],

    uniform_buffer: Option<wgpu::Buffer>,
    uniform_bind_group: Option<wgpu::BindGroup>,
    uniform_capacity: usize,

    flush: Option<FlushState>,
}

impl WgpuBackend {
    pub fn new(gpu: &Gpu) -> Self {
        let device = gpu.device().clone();
        let queue = gpu.queue().clone();

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::Release);
        });

        let pipelines = Pipelines::new(&device);

        Self {
            device,
            queue,
            lost,
            pipelines,
            targets: HashMap::new(),
            next_target: 0,
            textures: HashMap::new(),
            buffers: Default::default(),
            uniform_buffer: None,
            uniform_bind_group: None,
            uniform_capacity: 0,
            flush: None,
        }
    }

    /// Texture backing `target`, for hosts that present the canvas themselves.
    pub fn target_texture(&self, target: TargetId) -> Option<&wgpu::Texture> {
        self.targets.get(&target).map(|t| &t.texture)
    }

    fn allocate_target(&self, size: SurfaceSize) -> Result<GpuTarget> {
        let max = self.device.limits().max_texture_dimension_2d;
        ensure!(size.is_valid(), "invalid target size {}x{}", size.width, size.height);
        ensure!(
            size.width <= max && size.height <= max,
            "target {}x{} exceeds the device limit of {max}",
            size.width,
            size.height
        );

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("retrogfx render target"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let target = GpuTarget { size, texture, view };
        self.clear_view(&target.view);
        Ok(target)
    }

    fn clear_view(&self, view: &wgpu::TextureView) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retrogfx clear encoder"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retrogfx clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn ensure_batch_capacity(&mut self, kind: BatchKind, required: usize) {
        let slot = &mut self.buffers[kind.index()];
        if required <= slot.capacity && slot.positions.is_some() {
            return;
        }

        let new_cap = required.next_power_of_two().max(64);
        let make = |what: &str, stride: usize| {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("retrogfx {} {what} vbo", kind.label())),
                size: (new_cap * stride) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        slot.positions = Some(make("position", std::mem::size_of::<[f32; 2]>()));
        slot.colors = Some(make("color", std::mem::size_of::<[f32; 4]>()));
        slot.uvs = kind.is_textured().then(|| make("uv", std::mem::size_of::<[f32; 2]>()));
        slot.capacity = new_cap;
        log::debug!("wgpu backend: {} vertex buffers grown to {new_cap}", kind.label());
    }

    fn ensure_uniform_capacity(&mut self, calls: usize) {
        if calls <= self.uniform_capacity && self.uniform_buffer.is_some() {
            return;
        }

        let new_cap = calls.next_power_of_two().max(64);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("retrogfx draw ubo"),
            size: (new_cap * UNIFORM_STRIDE) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("retrogfx draw uniform bind group"),
            layout: &self.pipelines.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                }),
            }],
        });

        self.uniform_buffer = Some(buffer);
        self.uniform_bind_group = Some(bind_group);
        self.uniform_capacity = new_cap;
    }

    fn submit_flush(&mut self, flush: FlushState) {
        let Some(size) = self.targets.get(&flush.target).map(|t| t.size) else { return };

        // Mutating methods must happen before borrowing pipelines/buffers immutably.
        self.ensure_uniform_capacity(flush.calls.len().max(1));
        let mut uniforms = vec![0u8; flush.calls.len().max(1) * UNIFORM_STRIDE];
        for (slot, call) in uniforms.chunks_exact_mut(UNIFORM_STRIDE).zip(&flush.calls) {
            let u = DrawUniform::new(size, &call.blend);
            slot[..std::mem::size_of::<DrawUniform>()].copy_from_slice(bytemuck::bytes_of(&u));
        }

        let Some(target) = self.targets.get(&flush.target) else { return };
        let Some(uniform_buffer) = self.uniform_buffer.as_ref() else { return };
        let Some(uniform_bind_group) = self.uniform_bind_group.as_ref() else { return };
        self.queue.write_buffer(uniform_buffer, 0, &uniforms);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retrogfx flush encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retrogfx flush pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if flush.clear {
                            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (i, call) in flush.calls.iter().enumerate() {
                let buffers = &self.buffers[call.batch.index()];
                let (Some(positions), Some(colors)) = (buffers.positions.as_ref(), buffers.colors.as_ref()) else {
                    continue;
                };
                let kind = match (call.topology, call.batch.is_textured()) {
                    (Topology::Points, _) => DrawPipeline::Points,
                    (Topology::Triangles, false) => DrawPipeline::Triangles,
                    (Topology::Triangles, true) => DrawPipeline::Textured,
                };

                rpass.set_pipeline(self.pipelines.draw(kind, call.blend.mode));
                rpass.set_bind_group(0, uniform_bind_group, &[(i * UNIFORM_STRIDE) as u32]);
                rpass.set_vertex_buffer(0, positions.slice(..));
                rpass.set_vertex_buffer(1, colors.slice(..));
                if kind == DrawPipeline::Textured {
                    let texture = call.texture.and_then(|key| self.textures.get(&key));
                    let (Some(texture), Some(uvs)) = (texture, buffers.uvs.as_ref()) else {
                        log::debug!("wgpu backend: textured draw without texture, skipped");
                        continue;
                    };
                    rpass.set_bind_group(1, &texture.bind_group, &[]);
                    rpass.set_vertex_buffer(2, uvs.slice(..));
                }
                rpass.draw(call.range.start as u32..call.range.end as u32, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn extent(size: SurfaceSize) -> wgpu::Extent3d {
    wgpu::Extent3d { width: size.width, height: size.height, depth_or_array_layers: 1 }
}

impl Backend for WgpuBackend {
    fn row_order(&self) -> RowOrder {
        RowOrder::TopDown
    }

    fn is_context_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    fn create_target(&mut self, size: SurfaceSize) -> Result<TargetId> {
        ensure!(!self.is_context_lost(), "device lost");
        let target = self.allocate_target(size)?;
        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, target);
        Ok(id)
    }

    fn resize_target(&mut self, target: TargetId, size: SurfaceSize) -> Result<()> {
        ensure!(!self.is_context_lost(), "device lost");
        ensure!(self.targets.contains_key(&target), "unknown target {target:?}");
        let fresh = self.allocate_target(size)?;
        self.targets.insert(target, fresh);
        Ok(())
    }

    fn destroy_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.remove(&target) {
            t.texture.destroy();
        }
    }

    fn clear_target(&mut self, target: TargetId) {
        if let Some(t) = self.targets.get(&target) {
            self.clear_view(&t.view);
        }
    }

    fn copy_region(&mut self, src: TargetId, dst: TargetId, region: PixelRect, dst_x: i32, dst_y: i32) {
        let (Some(s), Some(d)) = (self.targets.get(&src), self.targets.get(&dst)) else { return };

        let region = region.normalized();
        let Some(clipped) = region.clamp_to(s.size) else { return };
        let dx = dst_x + (clipped.x - region.x);
        let dy = dst_y + (clipped.y - region.y);
        let Some(out) = PixelRect::new(dx, dy, clipped.w, clipped.h).clamp_to(d.size) else { return };
        let (sx, sy) = (clipped.x + (out.x - dx), clipped.y + (out.y - dy));

        if src == dst {
            log::debug!("wgpu backend: same-target copy skipped");
            return;
        }

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retrogfx copy encoder"),
        });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &s.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: sx as u32, y: sy as u32, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &d.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: out.x as u32, y: out.y as u32, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d { width: out.w as u32, height: out.h as u32, depth_or_array_layers: 1 },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_texture(&mut self, key: TextureKey, image: &ImageData) -> Result<()> {
        ensure!(!self.is_context_lost(), "device lost");
        ensure!(!image.is_empty(), "empty image");
        let max = self.device.limits().max_texture_dimension_2d;
        ensure!(
            image.width <= max && image.height <= max,
            "image {}x{} exceeds the device limit of {max}",
            image.width,
            image.height
        );

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("retrogfx image texture"),
            size: extent(image.size()),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            extent(image.size()),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.pipelines.texture_bind_group(&self.device, &view, "retrogfx image bind group");
        self.textures.insert(key, GpuTexture { texture, bind_group });
        Ok(())
    }

    fn delete_texture(&mut self, key: TextureKey) {
        if let Some(t) = self.textures.remove(&key) {
            t.texture.destroy();
        }
    }

    fn begin_flush(&mut self, target: TargetId, clear: bool) {
        if self.flush.is_some() {
            log::warn!("wgpu backend: begin_flush while a flush is open; previous flush dropped");
        }
        self.flush = Some(FlushState { target, clear, calls: Vec::new() });
    }

    fn upload(&mut self, batch: BatchView<'_>) {
        if batch.is_empty() {
            return;
        }
        self.ensure_batch_capacity(batch.kind, batch.len());
        let slot = &self.buffers[batch.kind.index()];
        if let Some(buf) = slot.positions.as_ref() {
            self.queue.write_buffer(buf, 0, bytemuck::cast_slice(batch.positions));
        }
        if let Some(buf) = slot.colors.as_ref() {
            self.queue.write_buffer(buf, 0, bytemuck::cast_slice(batch.colors));
        }
        if let (Some(buf), Some(uvs)) = (slot.uvs.as_ref(), batch.uvs) {
            self.queue.write_buffer(buf, 0, bytemuck::cast_slice(uvs));
        }
    }

    fn draw(&mut self, call: &DrawCall) {
        let Some(flush) = self.flush.as_mut() else { return };
        if !call.range.is_empty() {
            flush.calls.push(call.clone());
        }
    }

    fn end_flush(&mut self) {
        let Some(flush) = self.flush.take() else { return };
        if self.is_context_lost() {
            return;
        }
        self.submit_flush(flush);
    }

    fn composite(&mut self, src: TargetId, dst: TargetId) {
        let (Some(s), Some(d)) = (self.targets.get(&src), self.targets.get(&dst)) else { return };
        let bind_group = self.pipelines.texture_bind_group(&self.device, &s.view, "retrogfx composite bind group");

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retrogfx composite encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("retrogfx composite pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &d.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            rpass.set_pipeline(&self.pipelines.composite);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn read_pixels(&mut self, target: TargetId, region: PixelRect) -> Result<Vec<u8>> {
        ensure!(!self.is_context_lost(), "device lost");
        let Some(t) = self.targets.get(&target) else { bail!("unknown target {target:?}") };
        ensure!(
            region.clamp_to(t.size) == Some(region),
            "region {region:?} outside {}x{} target",
            t.size.width,
            t.size.height
        );

        let (w, h) = (region.w as u32, region.h as u32);
        let unpadded = w * 4;
        let padded = unpadded.div_ceil(COPY_ALIGN) * COPY_ALIGN;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("retrogfx readback buffer"),
            size: u64::from(padded) * u64::from(h),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("retrogfx readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &t.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: region.x as u32, y: region.y as u32, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(h),
                },
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
        let submission_index = self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device
            .poll(wgpu::PollType::Wait { submission_index: Some(submission_index), timeout: None })
            .context("device poll failed during readback")?;
        rx.recv()
            .context("readback callback dropped")?
            .context("failed to map readback buffer")?;

        let data = slice.get_mapped_range();
        let mut out = Vec::with_capacity((unpadded * h) as usize);
        for row in data.chunks(padded as usize).take(h as usize) {
            out.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(data);
        staging.unmap();
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SoftwareBackend;
    use crate::device::GpuInit;
    use crate::logging::{LoggingConfig, init_logging};
    use crate::{Renderer, RendererConfig, Rgba};

    fn adapter() -> Option<Gpu> {
        init_logging(LoggingConfig::for_tests());
        match Gpu::new_headless_blocking(GpuInit::fallback()).or_else(|_| Gpu::new_headless_blocking(GpuInit::default())) {
            Ok(gpu) => Some(gpu),
            Err(e) => {
                log::warn!("skipping wgpu test, no adapter: {e:#}");
                None
            }
        }
    }

    /// Translucent draws over transparent and opaque ground.
    fn translucent_scene<B: Backend>(backend: B) -> ImageData {
        let mut r = Renderer::new(backend, RendererConfig::default());
        let id = r.create_surface(24, 16).unwrap();

        r.draw_rect_filled(id, 12, 0, 12, 16, Rgba::opaque(20, 40, 200));
        r.draw_pixel(id, 1, 1, Rgba::new(255, 0, 0, 128));
        r.draw_pixel(id, 14, 1, Rgba::new(255, 0, 0, 128));
        r.draw_rect_filled(id, 2, 4, 18, 4, Rgba::new(0, 255, 0, 90));
        r.draw_circle_filled(id, 12, 11, 3, Rgba::new(255, 255, 255, 200), Rgba::new(255, 128, 0, 60));

        let image = r.register_image(ImageData::filled(3, 3, Rgba::new(200, 0, 200, 100)));
        r.draw_image(id, image, 10.0, 12.0).unwrap();

        r.read_pixels_raw(id, PixelRect::new(0, 0, 24, 16)).unwrap().unwrap()
    }

    #[test]
    fn translucent_draws_match_software_backend() {
        let Some(gpu) = adapter() else { return };

        let expected = translucent_scene(SoftwareBackend::new());
        let actual = translucent_scene(WgpuBackend::new(&gpu));

        assert_eq!((actual.width, actual.height), (expected.width, expected.height));
        for (i, (a, e)) in actual.pixels.chunks(4).zip(expected.pixels.chunks(4)).enumerate() {
            let close = a.iter().zip(e).all(|(a, e)| a.abs_diff(*e) <= 1);
            assert!(close, "pixel ({}, {}): wgpu {a:?} vs software {e:?}", i as u32 % 24, i as u32 / 24);
        }
    }

    #[test]
    fn half_alpha_pixel_on_transparent_target() {
        let Some(gpu) = adapter() else { return };
        let mut r = Renderer::new(WgpuBackend::new(&gpu), RendererConfig::default());
        let id = r.create_surface(4, 4).unwrap();

        r.draw_pixel(id, 1, 1, Rgba::new(255, 0, 0, 128));
        let px = r.read_pixel(id, 1, 1).unwrap().unwrap();
        assert!(px.r.abs_diff(128) <= 1 && px.g == 0 && px.b == 0, "{px:?}");
        assert!(px.a.abs_diff(64) <= 1, "{px:?}");
    }
}
