use std::path::Path;

use anyhow::Result;

use crate::gpu::{
    GpuHandle, ProgramKind, ResourceId, ShaderProgram, ShaderStage, Texture, TextureDesc,
    TextureKind, UniformBuffer, Vertex, uniform_layout_entry,
};
use crate::renderer::{BaseInfoUniforms, MaterialUniforms, ShadingUniforms, TransformUniforms};

/// Which of the two scene passes a draw belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassKind {
    /// Depth-writing pass over fully opaque fragments.
    Opaque,
    /// Additive pass over blended fragments, depth-tested but not written.
    Transparent,
}

/// Attachment formats and sample count the pipelines are built for.
#[derive(Debug, Clone)]
pub struct PassFormats {
    pub color: Vec<wgpu::TextureFormat>,
    pub depth: wgpu::TextureFormat,
    pub samples: u32,
}

/// Material texture slots in group 1.
pub const ALBEDO_SLOT: u32 = 0;
pub const NORMAL_SLOT: u32 = 1;
pub const METALNESS_SLOT: u32 = 2;
pub const ROUGHNESS_SLOT: u32 = 3;
pub const SPECULAR_ENV_SLOT: u32 = 4;
pub const IRRADIANCE_SLOT: u32 = 5;
pub const BRDF_LUT_SLOT: u32 = 6;

const MATERIAL_SAMPLER: u32 = 7;
const ENV_SAMPLER: u32 = 8;
const LUT_SAMPLER: u32 = 9;
const MATERIAL_INFO: u32 = 10;

/// The PBR shader program with everything that is shared by all meshes:
/// bind-group layouts, both pass pipelines, samplers and stand-in
/// environment textures.
#[derive(Default)]
pub struct PbrProgram {
    id: ResourceId,
    program: ShaderProgram,
    layouts: Option<Layouts>,
    opaque: Option<wgpu::RenderPipeline>,
    transparent: Option<wgpu::RenderPipeline>,
    samplers: Option<Samplers>,
    placeholder_cube: Texture,
    placeholder_lut: Texture,
}

struct Layouts {
    frame: wgpu::BindGroupLayout,
    material: wgpu::BindGroupLayout,
}

struct Samplers {
    material: wgpu::Sampler,
    environment: wgpu::Sampler,
    lut: wgpu::Sampler,
}

impl PbrProgram {
    /// Compiles `pbr.wgsl` from `shader_dir` and builds both pipelines.
    ///
    /// A program that fails to compile is logged and leaves the pipelines
    /// absent; draws through it are skipped.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shader_dir: &Path,
        formats: &PassFormats,
    ) -> Result<Self> {
        let program = ShaderProgram::from_file(device, ProgramKind::Graphics, &shader_dir.join("pbr.wgsl"));
        let layouts = Layouts::new(device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("lumen pbr pipeline layout"),
            bind_group_layouts: &[&layouts.frame, &layouts.material],
            immediate_size: 0,
        });

        let opaque = build_pipeline(device, &program, &pipeline_layout, formats, PassKind::Opaque);
        let transparent = build_pipeline(device, &program, &pipeline_layout, formats, PassKind::Transparent);

        let placeholder_cube = Texture::new(
            device,
            &TextureDesc::new(
                "lumen placeholder environment",
                TextureKind::Cube,
                1,
                1,
                wgpu::TextureFormat::Rgba16Float,
            )
            .levels(1),
        );
        placeholder_cube.write_level(queue, 0, &[0; 6 * 8])?;

        let placeholder_lut = Texture::solid_color(
            device,
            queue,
            "lumen placeholder brdf lut",
            wgpu::TextureFormat::Rg16Float,
            &[0; 4],
        );

        Ok(Self {
            id: ResourceId::next(),
            program,
            layouts: Some(layouts),
            opaque,
            transparent,
            samplers: Some(Samplers::new(device)),
            placeholder_cube,
            placeholder_lut,
        })
    }

    pub fn label(&self) -> &str {
        self.program.label()
    }

    /// True when both pass pipelines were built.
    pub fn is_complete(&self) -> bool {
        self.opaque.is_some() && self.transparent.is_some()
    }

    pub fn pipeline(&self, kind: PassKind) -> Option<&wgpu::RenderPipeline> {
        match kind {
            PassKind::Opaque => self.opaque.as_ref(),
            PassKind::Transparent => self.transparent.as_ref(),
        }
    }

    /// Group 0: per-frame uniform blocks shared by every mesh.
    pub fn frame_bind_group(
        &self,
        device: &wgpu::Device,
        transform: &UniformBuffer<TransformUniforms>,
        shading: &UniformBuffer<ShadingUniforms>,
        base_info: &UniformBuffer<BaseInfoUniforms>,
    ) -> Option<wgpu::BindGroup> {
        let layouts = self.layouts.as_ref()?;
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen pbr frame bind group"),
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: transform.binding()?,
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: shading.binding()?,
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: base_info.binding()?,
                },
            ],
        }))
    }

    /// Group 1: the mesh's textures followed by the environment set and the
    /// mesh's material block. Absent environment textures are replaced by
    /// black placeholders.
    pub fn material_bind_group(
        &self,
        device: &wgpu::Device,
        material: [&Texture; 4],
        info: &UniformBuffer<MaterialUniforms>,
        environment: Option<[&Texture; 3]>,
    ) -> Option<wgpu::BindGroup> {
        let layouts = self.layouts.as_ref()?;
        let samplers = self.samplers.as_ref()?;

        let [specular, irradiance, lut] = match environment {
            Some([specular, irradiance, lut]) => [specular.view()?, irradiance.view()?, lut.view()?],
            None => [
                self.placeholder_cube.view()?,
                self.placeholder_cube.view()?,
                self.placeholder_lut.view()?,
            ],
        };
        let [albedo, normal, metalness, roughness] = material;

        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen pbr material bind group"),
            layout: &layouts.material,
            entries: &[
                texture_entry(ALBEDO_SLOT, albedo.view()?),
                texture_entry(NORMAL_SLOT, normal.view()?),
                texture_entry(METALNESS_SLOT, metalness.view()?),
                texture_entry(ROUGHNESS_SLOT, roughness.view()?),
                texture_entry(SPECULAR_ENV_SLOT, specular),
                texture_entry(IRRADIANCE_SLOT, irradiance),
                texture_entry(BRDF_LUT_SLOT, lut),
                wgpu::BindGroupEntry {
                    binding: MATERIAL_SAMPLER,
                    resource: wgpu::BindingResource::Sampler(&samplers.material),
                },
                wgpu::BindGroupEntry {
                    binding: ENV_SAMPLER,
                    resource: wgpu::BindingResource::Sampler(&samplers.environment),
                },
                wgpu::BindGroupEntry {
                    binding: LUT_SAMPLER,
                    resource: wgpu::BindingResource::Sampler(&samplers.lut),
                },
                wgpu::BindGroupEntry {
                    binding: MATERIAL_INFO,
                    resource: info.binding()?,
                },
            ],
        }))
    }
}

impl GpuHandle for PbrProgram {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        self.opaque = None;
        self.transparent = None;
        self.layouts = None;
        self.samplers = None;
        self.placeholder_cube.release();
        self.placeholder_lut.release();
        self.program.release();
        self.id = ResourceId::NULL;
    }
}

impl Layouts {
    fn new(device: &wgpu::Device) -> Self {
        let fragment = wgpu::ShaderStages::FRAGMENT;

        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen pbr frame layout"),
            entries: &[
                uniform_layout_entry::<TransformUniforms>(0, wgpu::ShaderStages::VERTEX),
                uniform_layout_entry::<ShadingUniforms>(1, fragment),
                uniform_layout_entry::<BaseInfoUniforms>(2, fragment),
            ],
        });

        let texture = |binding: u32, view_dimension: wgpu::TextureViewDimension| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: fragment,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension,
                multisampled: false,
            },
            count: None,
        };
        let sampler = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: fragment,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        };

        let d2 = wgpu::TextureViewDimension::D2;
        let cube = wgpu::TextureViewDimension::Cube;
        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen pbr material layout"),
            entries: &[
                texture(ALBEDO_SLOT, d2),
                texture(NORMAL_SLOT, d2),
                texture(METALNESS_SLOT, d2),
                texture(ROUGHNESS_SLOT, d2),
                texture(SPECULAR_ENV_SLOT, cube),
                texture(IRRADIANCE_SLOT, cube),
                texture(BRDF_LUT_SLOT, d2),
                sampler(MATERIAL_SAMPLER),
                sampler(ENV_SAMPLER),
                sampler(LUT_SAMPLER),
                uniform_layout_entry::<MaterialUniforms>(MATERIAL_INFO, fragment),
            ],
        });

        Self { frame, material }
    }
}

impl Samplers {
    fn new(device: &wgpu::Device) -> Self {
        let material = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });
        let environment = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen environment sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });
        let lut = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen brdf lut sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            material,
            environment,
            lut,
        }
    }
}

fn texture_entry(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

/// Fixed-function state per pass; everything else is shared.
fn pass_state(kind: PassKind) -> (bool, Option<wgpu::BlendState>) {
    const ADDITIVE: wgpu::BlendComponent = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };

    match kind {
        PassKind::Opaque => (true, None),
        PassKind::Transparent => (
            false,
            Some(wgpu::BlendState {
                color: ADDITIVE,
                alpha: ADDITIVE,
            }),
        ),
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    layout: &wgpu::PipelineLayout,
    formats: &PassFormats,
    kind: PassKind,
) -> Option<wgpu::RenderPipeline> {
    let (vs_module, vs_entry) = program.stage(ShaderStage::Vertex)?;
    let (fs_module, fs_entry) = program.stage(ShaderStage::Fragment)?;
    let (depth_write, blend) = pass_state(kind);

    let targets: Vec<Option<wgpu::ColorTargetState>> = formats
        .color
        .iter()
        .map(|format| {
            Some(wgpu::ColorTargetState {
                format: *format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect();

    let label = match kind {
        PassKind::Opaque => "lumen pbr opaque pipeline",
        PassKind::Transparent => "lumen pbr transparent pipeline",
    };

    Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: vs_module,
            entry_point: Some(vs_entry),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: fs_module,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: formats.depth,
            depth_write_enabled: depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: formats.samples.max(1),
            ..Default::default()
        },
        multiview_mask: None,
        cache: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_writes_depth_without_blending() {
        let (depth_write, blend) = pass_state(PassKind::Opaque);
        assert!(depth_write);
        assert!(blend.is_none());
    }

    #[test]
    fn transparent_is_additive_without_depth_write() {
        let (depth_write, blend) = pass_state(PassKind::Transparent);
        assert!(!depth_write);
        let blend = blend.unwrap();
        assert_eq!(blend.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(blend.alpha.operation, wgpu::BlendOperation::Add);
    }

    #[test]
    fn default_program_is_unusable() {
        let program = PbrProgram::default();
        assert!(!program.is_usable());
        assert!(!program.is_complete());
        assert!(program.pipeline(PassKind::Opaque).is_none());
    }
}
