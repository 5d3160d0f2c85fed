use std::path::Path;

use crate::assets::MeshData;
use crate::gpu::{
    GpuHandle, MeshGeometry, ProgramKind, ShaderProgram, ShaderStage, Texture, UniformBuffer,
    Vertex, uniform_layout_entry,
};
use crate::pbr::PassFormats;

use super::uniforms::SkyboxUniforms;

/// Environment background: the skybox mesh drawn with the environment cube.
#[derive(Default)]
pub(crate) struct SkyboxPass {
    program: ShaderProgram,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<wgpu::BindGroup>,
    geometry: MeshGeometry,
}

impl SkyboxPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        shader_dir: &Path,
        formats: &PassFormats,
        mesh: &MeshData,
        uniforms: &UniformBuffer<SkyboxUniforms>,
        environment: &Texture,
    ) -> Self {
        let program = ShaderProgram::from_file(device, ProgramKind::Graphics, &shader_dir.join("skybox.wgsl"));

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen skybox layout"),
            entries: &[
                uniform_layout_entry::<SkyboxUniforms>(0, wgpu::ShaderStages::VERTEX),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen skybox sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group = match (uniforms.binding(), environment.view()) {
            (Some(ub), Some(view)) => Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lumen skybox bind group"),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: ub },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            })),
            _ => {
                log::warn!("skybox has no environment to show");
                None
            }
        };

        let pipeline = build_pipeline(device, &program, &layout, formats);

        Self {
            program,
            pipeline,
            bind_group,
            geometry: MeshGeometry::new(device, "lumen skybox", mesh),
        }
    }

    pub(crate) fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub(crate) fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let (Some(pipeline), Some(bind_group)) = (self.pipeline.as_ref(), self.bind_group.as_ref()) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        self.geometry.draw(pass);
    }

    pub(crate) fn release(&mut self) {
        self.pipeline = None;
        self.bind_group = None;
        self.geometry.release();
        self.program.release();
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    layout: &wgpu::BindGroupLayout,
    formats: &PassFormats,
) -> Option<wgpu::RenderPipeline> {
    let (vs_module, vs_entry) = program.stage(ShaderStage::Vertex)?;
    let (fs_module, fs_entry) = program.stage(ShaderStage::Fragment)?;

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("lumen skybox pipeline layout"),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    let targets: Vec<Option<wgpu::ColorTargetState>> = formats
        .color
        .iter()
        .map(|format| Some(wgpu::ColorTargetState::from(*format)))
        .collect();

    Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("lumen skybox pipeline"),
        layout: Some(&pipeline_layout),
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
        // Seen from inside, so both windings must survive.
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: formats.depth,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
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
