/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    ///
    /// With an sRGB surface the hardware applies the output transfer curve and
    /// the tonemap shader skips its own gamma step.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features.
    pub required_features: wgpu::Features,

    /// Features enabled only when the adapter has them.
    ///
    /// The default asks for adapter-specific format features, which unlock
    /// MSAA sample counts beyond 4.
    pub optional_features: wgpu::Features,

    /// Baseline limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Compute workgroup invocations the environment passes need.
    ///
    /// Raised on top of `required_limits`, clamped to what the adapter offers.
    pub compute_invocations: u32,

    /// Desired maximum frame latency for the surface.
    ///
    /// This value is a hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            optional_features: wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES,
            required_limits: wgpu::Limits::default(),
            compute_invocations: 1024,
            desired_maximum_frame_latency: 2,
        }
    }
}
