//! Pipeline objects and GPU-side vertex/uniform layouts.

use bytemuck::{Pod, Zeroable};

use crate::coords::SurfaceSize;
use crate::paint::{BlendMode, ResolvedBlend};

pub(super) const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Dynamic-offset stride; satisfies `min_uniform_buffer_offset_alignment` everywhere.
pub(super) const UNIFORM_STRIDE: usize = 256;

// ── uniforms ──────────────────────────────────────────────────────────────

/// Per-draw-call uniform. Layout mirrors `DrawUniform` in `shaders/draw.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct DrawUniform {
    pub viewport: [f32; 2],
    pub seed: u32,
    pub _pad: u32, // 16-byte alignment for the noise vectors
    pub noise_min: [i32; 4],
    pub noise_max: [i32; 4],
}

impl DrawUniform {
    pub(super) fn new(size: SurfaceSize, blend: &ResolvedBlend) -> Self {
        Self {
            viewport: [size.width as f32, size.height as f32],
            seed: blend.seed,
            _pad: 0,
            noise_min: blend.noise.min.map(i32::from),
            noise_max: blend.noise.max.map(i32::from),
        }
    }
}

// ── vertex layouts ────────────────────────────────────────────────────────

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
const COLOR_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x4];
const UV_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];

fn stream(stride: usize, attributes: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

fn plain_streams() -> [wgpu::VertexBufferLayout<'static>; 2] {
    [
        stream(std::mem::size_of::<[f32; 2]>(), &POSITION_ATTRS),
        stream(std::mem::size_of::<[f32; 4]>(), &COLOR_ATTRS),
    ]
}

fn textured_streams() -> [wgpu::VertexBufferLayout<'static>; 3] {
    let [pos, color] = plain_streams();
    [pos, color, stream(std::mem::size_of::<[f32; 2]>(), &UV_ATTRS)]
}

// ── pipelines ─────────────────────────────────────────────────────────────

/// Which shader path and primitive topology a draw uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) enum DrawPipeline {
    Points,
    Triangles,
    Textured,
}

impl DrawPipeline {
    const ALL: [DrawPipeline; 3] = [DrawPipeline::Points, DrawPipeline::Triangles, DrawPipeline::Textured];

    const fn index(self) -> usize {
        self as usize
    }

    fn label(self) -> &'static str {
        match self {
            DrawPipeline::Points => "retrogfx points pipeline",
            DrawPipeline::Triangles => "retrogfx triangles pipeline",
            DrawPipeline::Textured => "retrogfx textured pipeline",
        }
    }
}

/// `src * sa + dst * (1 - sa)` on all four channels, alpha included, so the
/// stored alpha matches [`SoftwareBackend`](crate::backend::SoftwareBackend).
const SOURCE_OVER: wgpu::BlendComponent = wgpu::BlendComponent {
    src_factor: wgpu::BlendFactor::SrcAlpha,
    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
    operation: wgpu::BlendOperation::Add,
};

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Alpha => wgpu::BlendState { color: SOURCE_OVER, alpha: SOURCE_OVER },
        BlendMode::Replace => wgpu::BlendState::REPLACE,
    }
}

fn blend_index(mode: BlendMode) -> usize {
    match mode {
        BlendMode::Alpha => 0,
        BlendMode::Replace => 1,
    }
}

/// Every pipeline the backend draws with, built once per device.
pub(super) struct Pipelines {
    pub uniform_bgl: wgpu::BindGroupLayout,
    pub texture_bgl: wgpu::BindGroupLayout,
    pub sampler: wgpu::Sampler,
    draw: [[wgpu::RenderPipeline; 2]; 3],
    pub composite: wgpu::RenderPipeline,
}

impl Pipelines {
    pub(super) fn new(device: &wgpu::Device) -> Self {
        let draw_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("retrogfx draw shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/draw.wgsl").into()),
        });
        let composite_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("retrogfx composite shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/composite.wgsl").into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("retrogfx draw uniform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<DrawUniform>() as u64),
                },
                count: None,
            }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("retrogfx texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("retrogfx nearest sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let plain_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("retrogfx plain pipeline layout"),
            bind_group_layouts: &[&uniform_bgl],
            immediate_size: 0,
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("retrogfx textured pipeline layout"),
            bind_group_layouts: &[&uniform_bgl, &texture_bgl],
            immediate_size: 0,
        });
        let composite_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("retrogfx composite pipeline layout"),
            bind_group_layouts: &[&texture_bgl],
            immediate_size: 0,
        });

        let build = |kind: DrawPipeline, mode: BlendMode| {
            let (layout, vs, fs, topology) = match kind {
                DrawPipeline::Points => (&plain_layout, "vs_main", "fs_main", wgpu::PrimitiveTopology::PointList),
                DrawPipeline::Triangles => {
                    (&plain_layout, "vs_main", "fs_main", wgpu::PrimitiveTopology::TriangleList)
                }
                DrawPipeline::Textured => {
                    (&textured_layout, "vs_textured", "fs_textured", wgpu::PrimitiveTopology::TriangleList)
                }
            };
            let plain = plain_streams();
            let textured = textured_streams();
            let buffers: &[wgpu::VertexBufferLayout<'_>] =
                if kind == DrawPipeline::Textured { &textured[..] } else { &plain[..] };
            create_pipeline(device, kind.label(), layout, &draw_shader, (vs, fs), buffers, topology, Some(blend_state(mode)))
        };

        let draw = DrawPipeline::ALL.map(|kind| [build(kind, BlendMode::Alpha), build(kind, BlendMode::Replace)]);

        let composite = create_pipeline(
            device,
            "retrogfx composite pipeline",
            &composite_layout,
            &composite_shader,
            ("vs_main", "fs_main"),
            &[],
            wgpu::PrimitiveTopology::TriangleList,
            None,
        );

        Self { uniform_bgl, texture_bgl, sampler, draw, composite }
    }

    pub(super) fn draw(&self, kind: DrawPipeline, mode: BlendMode) -> &wgpu::RenderPipeline {
        &self.draw[kind.index()][blend_index(mode)]
    }

    pub(super) fn texture_bind_group(&self, device: &wgpu::Device, view: &wgpu::TextureView, label: &str) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            ],
        })
    }
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    label: &str,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    (vs, fs): (&str, &str),
    buffers: &[wgpu::VertexBufferLayout<'_>],
    topology: wgpu::PrimitiveTopology,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vs),
            compilation_options: Default::default(),
            buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(fs),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::{BlendState, NoiseRange};

    #[test]
    fn uniform_matches_shader_layout() {
        assert_eq!(std::mem::size_of::<DrawUniform>(), 48);
        assert!(std::mem::size_of::<DrawUniform>() <= UNIFORM_STRIDE);
    }

    #[test]
    fn alpha_mode_scales_stored_alpha_by_source_alpha() {
        let state = blend_state(BlendMode::Alpha);
        assert_eq!(state.alpha, state.color);
        assert_eq!(state.alpha.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(blend_state(BlendMode::Replace), wgpu::BlendState::REPLACE);
    }

    #[test]
    fn uniform_carries_noise_and_viewport() {
        let state = BlendState::new(BlendMode::Alpha).with_noise(NoiseRange::uniform(4), Some(9));
        let blend = ResolvedBlend::resolve(Default::default(), None, &state);
        let u = DrawUniform::new(SurfaceSize::new(320, 200), &blend);
        assert_eq!(u.viewport, [320.0, 200.0]);
        assert_eq!(u.seed, 9);
        assert_eq!(u.noise_min, [-4, -4, -4, 0]);
        assert_eq!(u.noise_max, [4, 4, 4, 0]);
    }
}
