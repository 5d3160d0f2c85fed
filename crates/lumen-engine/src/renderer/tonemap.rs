use std::path::Path;

use anyhow::Result;

use crate::gpu::{
    Framebuffer, GpuHandle, MeshGeometry, ProgramKind, ResourceId, ShaderProgram, ShaderStage,
    UniformBuffer, uniform_layout_entry,
};

use super::targets::SCENE_COLORS;
use super::uniforms::TonemapUniforms;

/// Full-screen pass that composites the resolved scene onto the surface.
///
/// The bind group references the resolve textures, so it is rebuilt whenever
/// their ids change (after a resize).
#[derive(Default)]
pub(crate) struct TonemapPass {
    program: ShaderProgram,
    layout: Option<wgpu::BindGroupLayout>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group: Option<(Vec<ResourceId>, wgpu::BindGroup)>,
    triangle: MeshGeometry,
}

impl TonemapPass {
    pub(crate) fn new(device: &wgpu::Device, shader_dir: &Path, surface_format: wgpu::TextureFormat) -> Self {
        let program = ShaderProgram::from_file(device, ProgramKind::Graphics, &shader_dir.join("tonemap.wgsl"));

        let texture = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen tonemap layout"),
            entries: &[
                uniform_layout_entry::<TonemapUniforms>(0, wgpu::ShaderStages::FRAGMENT),
                texture(1),
                texture(2),
                texture(3),
            ],
        });

        let pipeline = build_pipeline(device, &program, &layout, surface_format);

        Self {
            program,
            layout: Some(layout),
            pipeline,
            bind_group: None,
            triangle: MeshGeometry::full_screen_triangle(),
        }
    }

    pub(crate) fn program(&self) -> &ShaderProgram {
        &self.program
    }

    /// Records the tone-map pass into `target`, reading the resolved scene.
    pub(crate) fn draw(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        resolved: &Framebuffer,
        uniforms: &UniformBuffer<TonemapUniforms>,
    ) -> Result<()> {
        self.refresh_bind_group(device, resolved, uniforms)?;

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen tonemap pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if let (Some(pipeline), Some((_, bind_group))) = (self.pipeline.as_ref(), self.bind_group.as_ref()) {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            self.triangle.draw(&mut pass);
        }

        Ok(())
    }

    fn refresh_bind_group(
        &mut self,
        device: &wgpu::Device,
        resolved: &Framebuffer,
        uniforms: &UniformBuffer<TonemapUniforms>,
    ) -> Result<()> {
        let Some(layout) = self.layout.as_ref() else {
            return Ok(());
        };

        let textures = SCENE_COLORS
            .iter()
            .map(|point| resolved.texture(*point))
            .collect::<Result<Vec<_>>>()?;
        let ids: Vec<ResourceId> = textures.iter().map(|t| t.id()).collect();

        if matches!(&self.bind_group, Some((current, _)) if *current == ids) {
            return Ok(());
        }

        let views = textures
            .iter()
            .map(|t| t.view())
            .collect::<Option<Vec<_>>>();
        let (Some(views), Some(ub)) = (views, uniforms.binding()) else {
            self.bind_group = None;
            return Ok(());
        };

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("lumen tonemap bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: ub },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(views[0]),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(views[1]),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(views[2]),
                },
            ],
        });
        log::debug!("tonemap inputs rebound to {ids:?}");
        self.bind_group = Some((ids, bind_group));

        Ok(())
    }

    pub(crate) fn release(&mut self) {
        self.bind_group = None;
        self.pipeline = None;
        self.layout = None;
        self.triangle.release();
        self.program.release();
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    program: &ShaderProgram,
    layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
) -> Option<wgpu::RenderPipeline> {
    let (vs_module, vs_entry) = program.stage(ShaderStage::Vertex)?;
    let (fs_module, fs_entry) = program.stage(ShaderStage::Fragment)?;

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("lumen tonemap pipeline layout"),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    Some(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("lumen tonemap pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: vs_module,
            entry_point: Some(vs_entry),
            compilation_options: Default::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: fs_module,
            entry_point: Some(fs_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState::from(surface_format))],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    }))
}
