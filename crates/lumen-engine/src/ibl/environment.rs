use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use half::f16;

use crate::assets::{Image, Pixels};
use crate::gpu::{
    CUBE_FACE_COUNT, GpuHandle, ProgramKind, ResourceId, ShaderProgram, ShaderStage, Texture,
    TextureDesc, TextureKind, UniformBuffer, read_texture,
};

use super::schedule::{brdf_row_stride, dispatch_groups, prefilter_schedule};
use super::{BRDF_LUT_SIZE, ENV_MAP_SIZE, IRRADIANCE_MAP_SIZE, WORKGROUP_SIZE};

const CUBE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const LUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

/// Sizes and sample counts of the precompute passes.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub env_map_size: u32,
    pub irradiance_map_size: u32,
    pub brdf_lut_size: u32,
    /// GGX samples per pre-filtered texel.
    pub specular_samples: u32,
    /// Hemisphere samples per irradiance texel.
    pub irradiance_samples: u32,
    /// GGX samples per BRDF table entry.
    pub brdf_samples: u32,
    /// Directory holding the precompute WGSL programs.
    pub shader_dir: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            env_map_size: ENV_MAP_SIZE,
            irradiance_map_size: IRRADIANCE_MAP_SIZE,
            brdf_lut_size: BRDF_LUT_SIZE,
            specular_samples: 1024,
            irradiance_samples: 64 * 1024,
            brdf_samples: 1024,
            shader_dir: PathBuf::from(crate::SHADER_DIR),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct PrefilterParams {
    roughness: f32,
    samples: u32,
    _pad: [u32; 2],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct IrradianceParams {
    samples: u32,
    _pad: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct BrdfParams {
    size: u32,
    row_stride: u32,
    samples: u32,
    _pad: u32,
}

/// The three lighting textures derived from one HDR environment.
///
/// Construction blocks until the GPU has finished, so every texture is
/// complete as soon as `new` returns.
#[derive(Default)]
pub struct Environment {
    id: ResourceId,
    cubemap: Texture,
    irradiance: Texture,
    brdf_lut: Texture,
    failed_programs: Vec<String>,
}

impl Environment {
    /// Runs the full precompute chain on `image`.
    ///
    /// Fails when `image` is not a floating point image with at least three
    /// channels, or when the device cannot run the precompute workgroups.
    /// A precompute program that fails to compile is logged and its step
    /// skipped; see [`Environment::failed_programs`].
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &Image,
        config: &EnvironmentConfig,
    ) -> Result<Self> {
        check_source(image)?;
        check_limits(&device.limits())?;

        let started = Instant::now();
        let size = config.env_map_size;
        log::info!(
            "precomputing environment: {}x{} equirect -> {size}x{size} cube",
            image.width(),
            image.height()
        );

        let equirect = upload_equirect(device, queue, image)?;

        let storage = wgpu::TextureUsages::STORAGE_BINDING
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST;
        let unfiltered = Texture::new(
            device,
            &TextureDesc::new("lumen environment (unfiltered)", TextureKind::Cube, size, size, CUBE_FORMAT)
                .usage(storage),
        );
        let cubemap = Texture::new(
            device,
            &TextureDesc::new("lumen environment", TextureKind::Cube, size, size, CUBE_FORMAT).usage(storage),
        );
        let irr_size = config.irradiance_map_size;
        let irradiance = Texture::new(
            device,
            &TextureDesc::new("lumen irradiance", TextureKind::Cube, irr_size, irr_size, CUBE_FORMAT)
                .levels(1)
                .usage(storage),
        );
        let lut_size = config.brdf_lut_size;
        let brdf_lut = Texture::new(
            device,
            &TextureDesc::new("lumen brdf lut", TextureKind::D2, lut_size, lut_size, LUT_FORMAT)
                .levels(1)
                .usage(
                    wgpu::TextureUsages::TEXTURE_BINDING
                        | wgpu::TextureUsages::COPY_DST
                        | wgpu::TextureUsages::COPY_SRC,
                ),
        );

        let steps = Steps::load(device, &config.shader_dir);
        let failed_programs = steps.failed();

        let equirect_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen equirect sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let cube_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("lumen precompute cube sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
            ..Default::default()
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lumen environment encoder"),
        });

        // 1. equirect -> unfiltered cube, level 0
        let equirect_view = equirect.view().context("equirect texture not allocated")?;
        let cube_level0 = level_view(&unfiltered, 0)?;
        let groups = dispatch_groups(size);
        steps.equirect.dispatch(
            device,
            &mut encoder,
            "lumen equirect to cube",
            &[
                texture_entry(0, equirect_view),
                sampler_entry(1, &equirect_sampler),
                texture_entry(2, &cube_level0),
            ],
            (groups, groups, CUBE_FACE_COUNT),
        );

        // 2. mip chain of the unfiltered cube, then level 0 verbatim into the result
        for level in 1..unfiltered.levels() {
            let src = level_view(&unfiltered, level - 1)?;
            let dst = level_view(&unfiltered, level)?;
            let groups = dispatch_groups((size >> level).max(1));
            steps.downsample.dispatch(
                device,
                &mut encoder,
                "lumen environment mip",
                &[texture_entry(0, &src), texture_entry(1, &dst)],
                (groups, groups, CUBE_FACE_COUNT),
            );
        }

        encoder.copy_texture_to_texture(
            whole_level(&unfiltered, 0)?,
            whole_level(&cubemap, 0)?,
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: CUBE_FACE_COUNT,
            },
        );

        // 3. specular pre-filter of levels 1.. from the unfiltered chain
        let unfiltered_view = unfiltered.view().context("environment texture not allocated")?;
        let schedule = prefilter_schedule(size, cubemap.levels());
        // One buffer per level: the values are baked at creation, so every
        // dispatch in this single submission sees its own roughness.
        let prefilter_params: Vec<UniformBuffer<PrefilterParams>> = schedule
            .iter()
            .map(|entry| {
                UniformBuffer::with_value(
                    device,
                    &format!("lumen prefilter params {}", entry.level),
                    PrefilterParams {
                        roughness: entry.roughness,
                        samples: config.specular_samples,
                        _pad: [0; 2],
                    },
                )
            })
            .collect();

        for (entry, params) in schedule.iter().zip(&prefilter_params) {
            let dst = level_view(&cubemap, entry.level)?;
            log::debug!(
                "prefilter level {}: {}x{} roughness {:.3}",
                entry.level,
                entry.size,
                entry.size,
                entry.roughness
            );
            steps.prefilter.dispatch(
                device,
                &mut encoder,
                "lumen specular prefilter",
                &[
                    buffer_entry(0, params)?,
                    texture_entry(1, unfiltered_view),
                    sampler_entry(2, &cube_sampler),
                    texture_entry(3, &dst),
                ],
                (entry.groups, entry.groups, CUBE_FACE_COUNT),
            );
        }

        // 4. irradiance from the filtered result
        let irradiance_params = UniformBuffer::with_value(
            device,
            "lumen irradiance params",
            IrradianceParams {
                samples: config.irradiance_samples,
                _pad: [0; 3],
            },
        );
        let cubemap_view = cubemap.view().context("environment texture not allocated")?;
        let irradiance_level0 = level_view(&irradiance, 0)?;
        let groups = dispatch_groups(irr_size);
        steps.irradiance.dispatch(
            device,
            &mut encoder,
            "lumen irradiance",
            &[
                buffer_entry(0, &irradiance_params)?,
                texture_entry(1, cubemap_view),
                sampler_entry(2, &cube_sampler),
                texture_entry(3, &irradiance_level0),
            ],
            (groups, groups, CUBE_FACE_COUNT),
        );

        // 5. BRDF table through a row-padded staging buffer
        let row_stride = brdf_row_stride(lut_size);
        let brdf_params = UniformBuffer::with_value(
            device,
            "lumen brdf params",
            BrdfParams {
                size: lut_size,
                row_stride,
                samples: config.brdf_samples,
                _pad: 0,
            },
        );
        let lut_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lumen brdf staging"),
            size: u64::from(row_stride) * 4 * u64::from(lut_size),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let groups = dispatch_groups(lut_size);
        let ran = steps.brdf.dispatch(
            device,
            &mut encoder,
            "lumen brdf lut",
            &[
                buffer_entry(0, &brdf_params)?,
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: lut_buffer.as_entire_binding(),
                },
            ],
            (groups, groups, 1),
        );
        if ran {
            encoder.copy_buffer_to_texture(
                wgpu::TexelCopyBufferInfo {
                    buffer: &lut_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(row_stride * 4),
                        rows_per_image: Some(lut_size),
                    },
                },
                whole_level(&brdf_lut, 0)?,
                wgpu::Extent3d {
                    width: lut_size,
                    height: lut_size,
                    depth_or_array_layers: 1,
                },
            );
        }

        queue.submit(std::iter::once(encoder.finish()));
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .context("device poll failed while precomputing environment")?;

        log::info!(
            "environment ready in {:.2?}: {} levels, irradiance {irr_size}x{irr_size}, lut {lut_size}x{lut_size}",
            started.elapsed(),
            cubemap.levels()
        );

        Ok(Self {
            id: ResourceId::next(),
            cubemap,
            irradiance,
            brdf_lut,
            failed_programs,
        })
    }

    /// Pre-filtered specular environment; mip level encodes roughness.
    pub fn cubemap(&self) -> &Texture {
        &self.cubemap
    }

    pub fn irradiance(&self) -> &Texture {
        &self.irradiance
    }

    pub fn brdf_lut(&self) -> &Texture {
        &self.brdf_lut
    }

    /// Labels of precompute programs that failed to build.
    pub fn failed_programs(&self) -> &[String] {
        &self.failed_programs
    }

    /// Reads the BRDF table back, tightly packed `rg16float` rows.
    pub fn brdf_lut_bytes(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<u8>> {
        let texture = self.brdf_lut.raw().context("brdf lut not allocated")?;
        read_texture(device, queue, texture, 0, 0)
    }
}

impl GpuHandle for Environment {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        self.cubemap.release();
        self.irradiance.release();
        self.brdf_lut.release();
        self.id = ResourceId::NULL;
    }
}

/// A precompute program and its pipeline, if it built.
struct ComputeStep {
    program: ShaderProgram,
    pipeline: Option<wgpu::ComputePipeline>,
}

impl ComputeStep {
    fn load(device: &wgpu::Device, dir: &Path, file: &str) -> Self {
        let program = ShaderProgram::from_file(device, ProgramKind::Compute, &dir.join(file));
        let pipeline = program.stage(ShaderStage::Compute).map(|(module, entry_point)| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(file),
                layout: None,
                module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            })
        });

        Self { program, pipeline }
    }

    /// Records one compute pass. Returns false (and records nothing) when the
    /// program is unusable.
    fn dispatch(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        entries: &[wgpu::BindGroupEntry<'_>],
        (x, y, z): (u32, u32, u32),
    ) -> bool {
        let Some(pipeline) = self.pipeline.as_ref() else {
            log::warn!("skipping {label}: program '{}' is not usable", self.program.label());
            return false;
        };

        let layout = pipeline.get_bind_group_layout(0);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &layout,
            entries,
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(x, y, z);

        true
    }
}

struct Steps {
    equirect: ComputeStep,
    downsample: ComputeStep,
    prefilter: ComputeStep,
    irradiance: ComputeStep,
    brdf: ComputeStep,
}

impl Steps {
    fn load(device: &wgpu::Device, dir: &Path) -> Self {
        Self {
            equirect: ComputeStep::load(device, dir, "equirect2cube.wgsl"),
            downsample: ComputeStep::load(device, dir, "downsample.wgsl"),
            prefilter: ComputeStep::load(device, dir, "spmap.wgsl"),
            irradiance: ComputeStep::load(device, dir, "irmap.wgsl"),
            brdf: ComputeStep::load(device, dir, "spbrdf.wgsl"),
        }
    }

    fn failed(&self) -> Vec<String> {
        [
            &self.equirect,
            &self.downsample,
            &self.prefilter,
            &self.irradiance,
            &self.brdf,
        ]
        .into_iter()
        .filter(|step| step.pipeline.is_none())
        .map(|step| step.program.label().to_string())
        .collect()
    }
}

fn check_source(image: &Image) -> Result<()> {
    anyhow::ensure!(
        image.is_hdr(),
        "environment map must be a floating point (HDR) image"
    );
    anyhow::ensure!(
        image.channels() >= 3,
        "environment map needs at least 3 channels, got {}",
        image.channels()
    );
    Ok(())
}

fn check_limits(limits: &wgpu::Limits) -> Result<()> {
    let needed = WORKGROUP_SIZE * WORKGROUP_SIZE;
    anyhow::ensure!(
        limits.max_compute_invocations_per_workgroup >= needed
            && limits.max_compute_workgroup_size_x >= WORKGROUP_SIZE
            && limits.max_compute_workgroup_size_y >= WORKGROUP_SIZE,
        "device allows {} invocations per workgroup, environment precompute needs {needed}",
        limits.max_compute_invocations_per_workgroup
    );
    Ok(())
}

/// Converts the HDR texels to RGBA half floats and uploads them.
fn upload_equirect(device: &wgpu::Device, queue: &wgpu::Queue, image: &Image) -> Result<Texture> {
    let Pixels::Hdr(data) = image.pixels() else {
        anyhow::bail!("environment map must be a floating point (HDR) image");
    };

    let texels = to_rgba_f16(data, image.channels() as usize);
    let desc = TextureDesc::new(
        "lumen equirect",
        TextureKind::D2,
        image.width(),
        image.height(),
        CUBE_FORMAT,
    )
    .levels(1);
    let texture = Texture::new(device, &desc);
    texture.write_level(queue, 0, bytemuck::cast_slice(&texels))?;

    Ok(texture)
}

fn to_rgba_f16(data: &[f32], channels: usize) -> Vec<u16> {
    data.chunks_exact(channels)
        .flat_map(|px| {
            let alpha = if channels >= 4 { px[3] } else { 1.0 };
            [px[0], px[1], px[2], alpha]
        })
        .map(|v| f16::from_f32(v).to_bits())
        .collect()
}

fn level_view(texture: &Texture, level: u32) -> Result<wgpu::TextureView> {
    texture
        .level_view(level)
        .with_context(|| format!("texture level {level} not available"))
}

fn whole_level(texture: &Texture, level: u32) -> Result<wgpu::TexelCopyTextureInfo<'_>> {
    Ok(wgpu::TexelCopyTextureInfo {
        texture: texture.raw().context("texture not allocated")?,
        mip_level: level,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
    })
}

fn texture_entry(binding: u32, view: &wgpu::TextureView) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::TextureView(view),
    }
}

fn sampler_entry(binding: u32, sampler: &wgpu::Sampler) -> wgpu::BindGroupEntry<'_> {
    wgpu::BindGroupEntry {
        binding,
        resource: wgpu::BindingResource::Sampler(sampler),
    }
}

fn buffer_entry<T: Pod>(binding: u32, buffer: &UniformBuffer<T>) -> Result<wgpu::BindGroupEntry<'_>> {
    Ok(wgpu::BindGroupEntry {
        binding,
        resource: buffer.binding().context("uniform buffer not allocated")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;

    fn small_config() -> EnvironmentConfig {
        EnvironmentConfig {
            env_map_size: 64,
            irradiance_map_size: 8,
            brdf_lut_size: 32,
            specular_samples: 64,
            irradiance_samples: 256,
            brdf_samples: 64,
            ..EnvironmentConfig::default()
        }
    }

    fn constant_sky(value: f32) -> Image {
        let (w, h) = (32, 16);
        Image::from_hdr(w, h, 3, vec![value; (w * h * 3) as usize]).unwrap()
    }

    fn gpu_with_compute() -> Option<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = headless()?;
        if check_limits(&device.limits()).is_err() {
            return None;
        }
        Some((device, queue))
    }

    fn half_values(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(2)
            .map(|b| f16::from_bits(u16::from_le_bytes([b[0], b[1]])).to_f32())
            .collect()
    }

    // ── preconditions ─────────────────────────────────────────────────────

    #[test]
    fn ldr_source_is_rejected() {
        let image = Image::from_ldr(2, 2, 3, vec![0; 12]).unwrap();
        assert!(check_source(&image).is_err());
    }

    #[test]
    fn hdr_rgb_source_is_accepted() {
        assert!(check_source(&constant_sky(1.0)).is_ok());
    }

    #[test]
    fn default_limits_cannot_run_32x32_groups() {
        assert!(check_limits(&wgpu::Limits::default()).is_err());
    }

    #[test]
    fn rgb_widens_to_opaque_rgba_halves() {
        let texels = to_rgba_f16(&[0.5, 1.0, 2.0], 3);
        let values: Vec<f32> = texels.iter().map(|b| f16::from_bits(*b).to_f32()).collect();
        assert_eq!(values, vec![0.5, 1.0, 2.0, 1.0]);
    }

    // ── GPU-backed ────────────────────────────────────────────────────────

    #[test]
    fn environment_textures_have_expected_shapes() {
        let Some((device, queue)) = gpu_with_compute() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let env = Environment::new(&device, &queue, &constant_sky(1.0), &small_config()).unwrap();
        assert!(env.is_usable());
        assert!(env.failed_programs().is_empty());
        assert_eq!(env.cubemap().kind(), Some(TextureKind::Cube));
        assert_eq!(env.cubemap().levels(), 7);
        assert_eq!(env.irradiance().width(), 8);
        assert_eq!(env.irradiance().levels(), 1);
        assert_eq!(env.brdf_lut().format(), Some(LUT_FORMAT));
    }

    #[test]
    fn brdf_lut_is_deterministic() {
        let Some((device, queue)) = gpu_with_compute() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let config = small_config();
        let a = Environment::new(&device, &queue, &constant_sky(1.0), &config).unwrap();
        let b = Environment::new(&device, &queue, &constant_sky(4.0), &config).unwrap();

        let bytes_a = a.brdf_lut_bytes(&device, &queue).unwrap();
        let bytes_b = b.brdf_lut_bytes(&device, &queue).unwrap();
        assert_eq!(bytes_a.len(), 32 * 32 * 4);
        assert_eq!(bytes_a, bytes_b);

        for v in half_values(&bytes_a) {
            assert!(v.is_finite() && (0.0..=1.5).contains(&v), "lut value {v}");
        }
    }

    #[test]
    fn constant_sky_gives_constant_irradiance() {
        let Some((device, queue)) = gpu_with_compute() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let env = Environment::new(&device, &queue, &constant_sky(1.0), &small_config()).unwrap();
        let raw = env.irradiance().raw().unwrap();
        for face in 0..CUBE_FACE_COUNT {
            let bytes = read_texture(&device, &queue, raw, 0, face).unwrap();
            for texel in half_values(&bytes).chunks_exact(4) {
                for c in &texel[..3] {
                    assert!((c - 1.0).abs() < 0.05, "face {face}: {c}");
                }
            }
        }
    }

    #[test]
    fn release_is_idempotent() {
        let mut env = Environment::default();
        assert!(!env.is_usable());
        env.release();
        env.release();
        assert!(!env.is_usable());
    }
}
