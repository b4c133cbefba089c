/// Adapter and device request parameters for [`Gpu`](super::Gpu).
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Backends the instance may pick from. Defaults to `WGPU_BACKEND` when
    /// set, otherwise all of them.
    pub backends: wgpu::Backends,

    /// Offscreen pixel work is light; low power keeps integrated GPUs eligible.
    pub power_preference: wgpu::PowerPreference,

    /// Accept a software adapter, e.g. on CI without a GPU.
    pub force_fallback_adapter: bool,

    pub required_features: wgpu::Features,

    /// Downlevel defaults; no compute is used.
    pub required_limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all()),
            power_preference: wgpu::PowerPreference::LowPower,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults(),
        }
    }
}

impl GpuInit {
    /// Software adapter only, for machines without a GPU.
    pub fn fallback() -> Self {
        Self { force_fallback_adapter: true, ..Self::default() }
    }
}
