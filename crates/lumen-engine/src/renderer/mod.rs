//! Frame renderer.
//!
//! Each frame draws the skybox and the opaque meshes into the off-screen
//! scene targets, submits, then records the additive transparent pass, the
//! MSAA resolve and the tone-map pass on the caller's frame encoder.
//!
//! The submit in the middle is what lets the two mesh passes see different
//! `opaque_pass` flags: queue writes land at the next submit, so a single
//! submission would give both passes the last value written.

mod ctx;
mod skybox;
mod targets;
mod tonemap;
mod uniforms;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::assets::{Image, MeshData};
use crate::device::max_sample_count;
use crate::gpu::{Framebuffer, GpuHandle, UniformBuffer};
use crate::ibl::{Environment, EnvironmentConfig};
use crate::pbr::{PassFormats, PassKind, PbrMesh, PbrProgram};
use crate::settings::{SceneSettings, ViewSettings};

use skybox::SkyboxPass;
use tonemap::TonemapPass;

pub use ctx::{FrameTarget, RenderCtx};
pub use targets::{
    ACCUM_FORMAT, COLOR_FORMAT, COVERAGE_FORMAT, DEPTH_FORMAT, FrameTargets, SCENE_COLORS,
    SCENE_FORMATS,
};
pub use uniforms::{
    BaseInfoUniforms, CameraMatrices, LightUniform, MaterialUniforms, ShadingUniforms,
    SkyboxUniforms, TonemapUniforms, TransformUniforms,
};

/// Renderer settings fixed at setup.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Requested MSAA samples; see [`supported_samples`].
    pub samples: u32,
    pub shader_dir: PathBuf,
    pub exposure: f32,
    pub pure_white: f32,
    pub environment: EnvironmentConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            samples: 8,
            shader_dir: PathBuf::from(crate::SHADER_DIR),
            exposure: 1.0,
            pure_white: 1.0,
            environment: EnvironmentConfig::default(),
        }
    }
}

/// Files that make up the scene.
#[derive(Debug, Clone, Default)]
pub struct SceneAssets {
    /// Equirectangular HDR image.
    pub environment: PathBuf,
    pub skybox: PathBuf,
    /// Drawn in order in both passes.
    pub meshes: Vec<PathBuf>,
    /// Directory material texture names are resolved against.
    pub texture_dir: PathBuf,
}

impl SceneAssets {
    /// Decodes every file. Any failure is fatal and names the file.
    pub fn load(&self) -> Result<SceneData> {
        let environment = Image::from_file(&self.environment, 3)?;
        let skybox = MeshData::from_file(&self.skybox)?;
        let meshes = self
            .meshes
            .iter()
            .map(MeshData::from_file)
            .collect::<Result<Vec<_>>>()?;

        Ok(SceneData {
            environment,
            skybox,
            meshes,
            texture_dir: self.texture_dir.clone(),
        })
    }
}

/// Decoded scene, ready for upload.
pub struct SceneData {
    pub environment: Image,
    pub skybox: MeshData,
    pub meshes: Vec<MeshData>,
    pub texture_dir: PathBuf,
}

/// Counters observable from outside the renderer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub frames: u64,
    /// Off-screen attachments reallocated because the drawable size changed.
    pub reallocations: u64,
}

/// Largest usable MSAA sample count `<= requested` for the scene targets.
pub fn supported_samples(adapter: &wgpu::Adapter, device: &wgpu::Device, requested: u32) -> u32 {
    let mut formats = SCENE_FORMATS.to_vec();
    formats.push(DEPTH_FORMAT);
    max_sample_count(adapter, device, &formats, requested)
}

pub struct Renderer {
    config: RendererConfig,
    targets: FrameTargets,

    skybox_uniforms: UniformBuffer<SkyboxUniforms>,
    transform_uniforms: UniformBuffer<TransformUniforms>,
    shading_uniforms: UniformBuffer<ShadingUniforms>,
    base_info_uniforms: UniformBuffer<BaseInfoUniforms>,
    tonemap_uniforms: UniformBuffer<TonemapUniforms>,
    frame_bind_group: Option<wgpu::BindGroup>,

    meshes: Vec<PbrMesh>,
    skybox: SkyboxPass,
    program: PbrProgram,
    tonemap: TonemapPass,
    environment: Environment,

    stats: FrameStats,
}

impl Renderer {
    /// Loads `assets` from disk and builds the renderer.
    pub fn setup(
        ctx: &RenderCtx<'_>,
        config: RendererConfig,
        assets: &SceneAssets,
    ) -> Result<Self> {
        let scene = assets.load()?;
        Self::new(ctx, config, &scene)
    }

    /// Builds every GPU object for `scene`. `config.samples` is used as is.
    pub fn new(ctx: &RenderCtx<'_>, config: RendererConfig, scene: &SceneData) -> Result<Self> {
        let started = Instant::now();
        let (device, queue) = (ctx.device, ctx.queue);
        let (width, height) = ctx.size;

        let env_config = EnvironmentConfig {
            shader_dir: config.shader_dir.clone(),
            ..config.environment.clone()
        };
        let environment = Environment::new(device, queue, &scene.environment, &env_config)
            .context("failed to precompute environment lighting")?;

        let samples = config.samples.max(1);
        let targets = FrameTargets::new(device, width, height, samples)?;
        let formats = PassFormats {
            color: SCENE_FORMATS.to_vec(),
            depth: DEPTH_FORMAT,
            samples,
        };

        let skybox_uniforms = UniformBuffer::new(device, "lumen skybox uniforms");
        let transform_uniforms = UniformBuffer::new(device, "lumen transform uniforms");
        let shading_uniforms = UniformBuffer::new(device, "lumen shading uniforms");
        let base_info_uniforms = UniformBuffer::new(device, "lumen base info uniforms");
        let mut tonemap_uniforms = UniformBuffer::new(device, "lumen tonemap uniforms");
        tonemap_uniforms.set(TonemapUniforms::new(config.exposure, config.pure_white, ctx.surface_format));
        tonemap_uniforms.bind(queue);

        let program = PbrProgram::new(device, queue, &config.shader_dir, &formats)?;
        let frame_bind_group =
            program.frame_bind_group(device, &transform_uniforms, &shading_uniforms, &base_info_uniforms);

        let skybox = SkyboxPass::new(
            device,
            &config.shader_dir,
            &formats,
            &scene.skybox,
            &skybox_uniforms,
            environment.cubemap(),
        );

        let meshes = scene
            .meshes
            .iter()
            .map(|data| PbrMesh::new(device, queue, &program, data, &scene.texture_dir, Some(&environment)))
            .collect::<Result<Vec<_>>>()?;

        let tonemap = TonemapPass::new(device, &config.shader_dir, ctx.surface_format);

        log::info!(
            "renderer ready: {} mesh(es), {samples}x MSAA, {width}x{height} in {:.2?}",
            meshes.len(),
            started.elapsed()
        );

        Ok(Self {
            config,
            targets,
            skybox_uniforms,
            transform_uniforms,
            shading_uniforms,
            base_info_uniforms,
            tonemap_uniforms,
            frame_bind_group,
            meshes,
            skybox,
            program,
            tonemap,
            environment,
            stats: FrameStats::default(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn samples(&self) -> u32 {
        self.targets.samples()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Labels of programs that failed to build. Their draws or precompute
    /// steps are skipped, so a non-empty list means the image is incomplete.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut failed: Vec<String> = self.environment.failed_programs().to_vec();
        if !self.skybox.program().is_usable() {
            failed.push(self.skybox.program().label().to_string());
        }
        if !self.program.is_complete() {
            failed.push(self.program.label().to_string());
        }
        if !self.tonemap.program().is_usable() {
            failed.push(self.tonemap.program().label().to_string());
        }
        failed
    }

    /// Draws one frame into `target`.
    ///
    /// Submits the skybox and opaque pass itself; the rest is recorded on
    /// `target.encoder` and reaches the GPU with the caller's submit.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        target: &mut FrameTarget<'_>,
        view: &ViewSettings,
        scene: &SceneSettings,
    ) -> Result<()> {
        let (width, height) = ctx.size;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let reallocated = self.targets.resize(ctx.device, width, height)?;
        self.stats.reallocations += reallocated as u64;

        let camera = CameraMatrices::new(view, width, height);
        self.skybox_uniforms.set(SkyboxUniforms::new(&camera));
        self.transform_uniforms.set(TransformUniforms::new(&camera, scene));
        self.shading_uniforms.set(ShadingUniforms::new(scene, camera.eye, self.environment.cubemap().levels()));
        self.base_info_uniforms.set(BaseInfoUniforms::new(true));
        self.skybox_uniforms.bind(ctx.queue);
        self.transform_uniforms.bind(ctx.queue);
        self.shading_uniforms.bind(ctx.queue);
        self.base_info_uniforms.bind(ctx.queue);

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen scene encoder"),
        });
        {
            let mut pass = begin_scene_pass(&mut encoder, self.targets.draw(), true, "lumen opaque pass");
            self.skybox.draw(&mut pass);
            self.draw_meshes(&mut pass, PassKind::Opaque);
        }
        ctx.queue.submit(std::iter::once(encoder.finish()));

        self.base_info_uniforms.set(BaseInfoUniforms::new(false));
        self.base_info_uniforms.bind(ctx.queue);
        {
            let mut pass = begin_scene_pass(target.encoder, self.targets.draw(), false, "lumen transparent pass");
            self.draw_meshes(&mut pass, PassKind::Transparent);
        }

        self.targets.resolve(target.encoder)?;
        self.tonemap.draw(
            ctx.device,
            target.encoder,
            target.color_view,
            self.targets.resolved(),
            &self.tonemap_uniforms,
        )?;

        self.stats.frames += 1;
        Ok(())
    }

    fn draw_meshes(&self, pass: &mut wgpu::RenderPass<'_>, kind: PassKind) {
        let Some(frame) = self.frame_bind_group.as_ref() else {
            return;
        };
        pass.set_bind_group(0, frame, &[]);
        for mesh in &self.meshes {
            mesh.draw(pass, &self.program, kind);
        }
    }

    /// Releases every GPU object: framebuffers, uniform buffers, meshes,
    /// programs, then the environment. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.targets.release();

        self.frame_bind_group = None;
        self.skybox_uniforms.release();
        self.transform_uniforms.release();
        self.shading_uniforms.release();
        self.base_info_uniforms.release();
        self.tonemap_uniforms.release();

        for mesh in &mut self.meshes {
            mesh.release();
        }
        self.meshes.clear();

        self.skybox.release();
        self.program.release();
        self.tonemap.release();

        self.environment.release();
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Opens a pass over every attachment of `framebuffer`, clearing colours to
/// zero and depth to one when `clear` is set, loading them otherwise.
fn begin_scene_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    framebuffer: &Framebuffer,
    clear: bool,
    label: &str,
) -> wgpu::RenderPass<'e> {
    let color_load = if clear {
        wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
    } else {
        wgpu::LoadOp::Load
    };
    let depth_load = if clear { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load };

    let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment<'_>>> = framebuffer
        .color_views()
        .into_iter()
        .map(|view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })
        })
        .collect();

    let depth_stencil_attachment = framebuffer
        .depth_view()
        .map(|view| wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: depth_load,
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        });

    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &color_attachments,
        depth_stencil_attachment,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;
    use crate::gpu::{Vertex, read_texture};
    use crate::settings::Light;
    use glam::Vec3;
    use half::f16;

    const SURFACE: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    fn gpu_with_compute() -> Option<(wgpu::Device, wgpu::Queue)> {
        let Some((device, queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return None;
        };
        if device.limits().max_compute_invocations_per_workgroup < 1024 {
            eprintln!("No GPU adapter available, skipping test");
            return None;
        }
        Some((device, queue))
    }

    fn small_config() -> RendererConfig {
        RendererConfig {
            samples: 1,
            environment: EnvironmentConfig {
                env_map_size: 32,
                irradiance_map_size: 8,
                brdf_lut_size: 16,
                specular_samples: 16,
                irradiance_samples: 64,
                brdf_samples: 16,
                ..EnvironmentConfig::default()
            },
            ..RendererConfig::default()
        }
    }

    fn cube() -> MeshData {
        let vertices = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ]
        .into_iter()
        .map(|position| Vertex {
            position,
            ..Vertex::default()
        })
        .collect();
        let indices = vec![
            0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6, 0, 4, 5, 0, 5, 1, //
            3, 2, 6, 3, 6, 7, 0, 3, 7, 0, 7, 4, 1, 5, 6, 1, 6, 2,
        ];
        MeshData {
            vertices,
            indices,
            textures: Default::default(),
        }
    }

    fn scene(meshes: Vec<MeshData>) -> SceneData {
        SceneData {
            environment: Image::from_hdr(8, 4, 3, vec![1.0; 8 * 4 * 3]).unwrap(),
            skybox: cube(),
            meshes,
            texture_dir: PathBuf::from("textures"),
        }
    }

    fn surface(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("test surface"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    fn frame(
        renderer: &mut Renderer,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
    ) {
        lit_frame(renderer, device, queue, texture, &SceneSettings::default());
    }

    fn lit_frame(
        renderer: &mut Renderer,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        scene: &SceneSettings,
    ) {
        let ctx = RenderCtx::new(device, queue, SURFACE, (texture.width(), texture.height()));
        let view = texture.create_view(&Default::default());
        let mut encoder = device.create_command_encoder(&Default::default());
        {
            let mut target = FrameTarget::new(&mut encoder, &view);
            renderer
                .render(&ctx, &mut target, &ViewSettings::default(), scene)
                .unwrap();
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Square facing the default camera at depth `z`, textured with `albedo`
    /// (empty for the fallback).
    fn facing_quad(z: f32, albedo: &str) -> MeshData {
        let vertex = |x: f32, y: f32| Vertex {
            position: [x * 100.0, y * 100.0, z],
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 1.0, 0.0],
            texcoord: [(x + 1.0) * 0.5, (y + 1.0) * 0.5, 0.0],
        };
        let mut data = MeshData {
            vertices: vec![vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(1.0, 1.0), vertex(-1.0, 1.0)],
            indices: vec![0, 1, 2, 0, 2, 3],
            textures: Default::default(),
        };
        data.textures.albedo = albedo.to_string();
        data
    }

    /// Light shining straight at the quads, so they are lit without any
    /// contribution from the environment.
    fn head_on_light() -> SceneSettings {
        let mut scene = SceneSettings::default();
        scene.lights[0] = Light {
            enabled: true,
            ..Light::new(Vec3::NEG_Z, Vec3::ONE)
        };
        scene
    }

    /// Centre texel of scene attachment `index`, decoded from half floats.
    fn centre_texel(renderer: &Renderer, device: &wgpu::Device, queue: &wgpu::Queue, index: usize) -> Vec<f32> {
        let texture = renderer.targets.resolved().texture(SCENE_COLORS[index]).unwrap();
        let channels = texture.format().unwrap().components() as usize;
        let (width, height) = (texture.width() as usize, texture.height() as usize);

        let bytes = read_texture(device, queue, texture.raw().unwrap(), 0, 0).unwrap();
        let offset = ((height / 2) * width + width / 2) * channels * 2;
        bytes[offset..offset + channels * 2]
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect()
    }

    fn render_quads(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_dir: &std::path::Path,
        quads: Vec<MeshData>,
    ) -> Renderer {
        let ctx = RenderCtx::new(device, queue, SURFACE, (16, 16));
        let mut data = scene(quads);
        data.texture_dir = texture_dir.to_path_buf();
        let mut renderer = Renderer::new(&ctx, small_config(), &data).unwrap();
        assert!(renderer.diagnostics().is_empty(), "{:?}", renderer.diagnostics());

        let texture = surface(device, 16, 16);
        lit_frame(&mut renderer, device, queue, &texture, &head_on_light());
        renderer
    }

    // ── config ────────────────────────────────────────────────────────────

    #[test]
    fn default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.samples, 8);
        assert_eq!(config.exposure, 1.0);
        assert_eq!(config.pure_white, 1.0);
        assert!(config.shader_dir.ends_with("shaders"));
    }

    #[test]
    fn missing_asset_is_fatal_and_named() {
        let assets = SceneAssets {
            environment: PathBuf::from("/nonexistent/env.hdr"),
            ..SceneAssets::default()
        };
        let err = assets.load().err().unwrap();
        assert!(format!("{err:#}").contains("/nonexistent/env.hdr"));
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn sky_fills_the_frame() {
        let Some((device, queue)) = gpu_with_compute() else { return };

        let ctx = RenderCtx::new(&device, &queue, SURFACE, (32, 32));
        let mut renderer = Renderer::new(&ctx, small_config(), &scene(Vec::new())).unwrap();
        assert!(renderer.diagnostics().is_empty(), "{:?}", renderer.diagnostics());

        let texture = surface(&device, 32, 32);
        frame(&mut renderer, &device, &queue, &texture);

        let pixels = read_texture(&device, &queue, &texture, 0, 0).unwrap();
        assert_eq!(pixels.len(), 32 * 32 * 4);
        assert!(pixels.chunks_exact(4).all(|p| p[0] > 0 && p[3] == 255));
        assert_eq!(renderer.stats().frames, 1);
    }

    #[test]
    fn same_size_frames_keep_attachments() {
        let Some((device, queue)) = gpu_with_compute() else { return };

        let ctx = RenderCtx::new(&device, &queue, SURFACE, (16, 16));
        let mut renderer = Renderer::new(&ctx, small_config(), &scene(vec![cube()])).unwrap();
        let texture = surface(&device, 16, 16);

        frame(&mut renderer, &device, &queue, &texture);
        frame(&mut renderer, &device, &queue, &texture);
        assert_eq!(renderer.stats(), FrameStats { frames: 2, reallocations: 0 });

        let resized = surface(&device, 24, 16);
        frame(&mut renderer, &device, &queue, &resized);
        assert_eq!(renderer.stats().frames, 3);
        assert!(renderer.stats().reallocations > 0);
    }

    #[test]
    fn shutdown_releases_everything_once() {
        let Some((device, queue)) = gpu_with_compute() else { return };

        let ctx = RenderCtx::new(&device, &queue, SURFACE, (8, 8));
        let mut renderer = Renderer::new(&ctx, small_config(), &scene(Vec::new())).unwrap();
        assert!(renderer.environment().is_usable());

        renderer.shutdown();
        assert!(!renderer.environment().is_usable());
        renderer.shutdown();
    }

    // ── transparency ──────────────────────────────────────────────────────

    #[test]
    fn half_transparent_quad_accumulates_premultiplied_colour() {
        let Some((device, queue)) = gpu_with_compute() else { return };

        let dir = std::env::temp_dir().join(format!("lumen-renderer-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbaImage::from_pixel(1, 1, image::Rgba([128, 128, 128, 128]))
            .save(dir.join("half.png"))
            .unwrap();
        let alpha = 128.0 / 255.0;

        // Same surface, fully opaque: its colour is what the blended quad lights to.
        let reference = render_quads(&device, &queue, &dir, vec![facing_quad(50.0, "")]);
        let lit = centre_texel(&reference, &device, &queue, 0);
        assert!(lit[0] > 0.01, "{lit:?}");
        assert!(centre_texel(&reference, &device, &queue, 2)[0].abs() < 1e-3);

        let blended = render_quads(
            &device,
            &queue,
            &dir,
            vec![facing_quad(0.0, ""), facing_quad(50.0, "half.png")],
        );
        let color = centre_texel(&blended, &device, &queue, 0);
        let accum = centre_texel(&blended, &device, &queue, 1);
        let coverage = centre_texel(&blended, &device, &queue, 2);

        // The quad behind stays in the opaque target; the blended one never
        // writes there or into depth.
        assert!(color[0] > 0.01, "{color:?}");
        assert!((coverage[0] - alpha).abs() < 5e-3, "{coverage:?}");
        assert!((accum[3] - alpha).abs() < 5e-3, "{accum:?}");
        for channel in 0..3 {
            let expected = lit[channel] * alpha;
            assert!(
                (accum[channel] - expected).abs() <= 0.01 * expected.max(1.0),
                "channel {channel}: {} vs {expected}",
                accum[channel]
            );
        }

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn stacked_transparent_quads_add_up() {
        let Some((device, queue)) = gpu_with_compute() else { return };

        let dir = std::env::temp_dir().join(format!("lumen-renderer-stack-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 128]))
            .save(dir.join("half.png"))
            .unwrap();
        let alpha = 128.0 / 255.0;

        // Front first: without depth writes the one behind still lands.
        let renderer = render_quads(
            &device,
            &queue,
            &dir,
            vec![facing_quad(50.0, "half.png"), facing_quad(25.0, "half.png")],
        );
        let coverage = centre_texel(&renderer, &device, &queue, 2);
        let accum = centre_texel(&renderer, &device, &queue, 1);
        assert!((coverage[0] - 2.0 * alpha).abs() < 1e-2, "{coverage:?}");
        assert!((accum[3] - 2.0 * alpha).abs() < 1e-2, "{accum:?}");

        std::fs::remove_dir_all(&dir).ok();
    }
}
