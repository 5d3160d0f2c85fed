use std::path::Path;

use anyhow::Result;

use crate::assets::MeshData;
use crate::gpu::{GpuHandle, MeshGeometry, ResourceId, Texture, UniformBuffer};
use crate::ibl::Environment;
use crate::renderer::MaterialUniforms;

use super::material::MaterialSlot;
use super::program::{PassKind, PbrProgram};

/// A drawable mesh with its four material textures.
///
/// The environment textures are referenced, not owned: the bind group built
/// here keeps them bound, and whoever owns the [`Environment`] must keep it
/// alive for as long as the mesh is drawn.
#[derive(Default)]
pub struct PbrMesh {
    id: ResourceId,
    geometry: MeshGeometry,
    textures: [Texture; 4],
    info: UniformBuffer<MaterialUniforms>,
    bind_group: Option<wgpu::BindGroup>,
    environment: ResourceId,
}

impl PbrMesh {
    /// Uploads `data` and loads its material textures from `texture_dir`.
    ///
    /// Slots whose texture name is empty get a one-texel fallback. Without an
    /// environment (or with an unusable one) the image-based lighting slots
    /// are bound to black placeholders.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        program: &PbrProgram,
        data: &MeshData,
        texture_dir: &Path,
        environment: Option<&Environment>,
    ) -> Result<Self> {
        let names = &data.textures;
        let [albedo, normal, metalness, roughness] = MaterialSlot::ALL;
        let textures = [
            albedo.load(device, queue, texture_dir, &names.albedo)?,
            normal.load(device, queue, texture_dir, &names.normal)?,
            metalness.load(device, queue, texture_dir, &names.metalness)?,
            roughness.load(device, queue, texture_dir, &names.roughness)?,
        ];

        let environment = environment.filter(|env| env.is_usable());
        let env_textures = environment.map(|env| [env.cubemap(), env.irradiance(), env.brdf_lut()]);

        let info = UniformBuffer::with_value(
            device,
            "lumen pbr material info",
            MaterialUniforms::new(!names.normal.is_empty()),
        );

        let [t0, t1, t2, t3] = &textures;
        let bind_group = program.material_bind_group(device, [t0, t1, t2, t3], &info, env_textures);
        if bind_group.is_none() {
            log::warn!("pbr mesh has no material bind group; it will not be drawn");
        }

        Ok(Self {
            id: ResourceId::next(),
            geometry: MeshGeometry::new(device, "lumen pbr mesh", data),
            textures,
            info,
            bind_group,
            environment: environment.map_or(ResourceId::NULL, |env| env.id()),
        })
    }

    /// Id of the environment bound at creation, null if none.
    pub fn environment(&self) -> ResourceId {
        self.environment
    }

    pub fn texture(&self, slot: MaterialSlot) -> &Texture {
        &self.textures[slot as usize]
    }

    pub fn material_info(&self) -> &MaterialUniforms {
        self.info.value()
    }

    pub fn element_count(&self) -> u32 {
        self.geometry.element_count()
    }

    /// Records the draw for `kind`. Frame uniforms (group 0) must already be
    /// bound on `pass`. Does nothing if the pipeline or bind group is missing.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, program: &PbrProgram, kind: PassKind) {
        let (Some(pipeline), Some(bind_group)) = (program.pipeline(kind), self.bind_group.as_ref()) else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(1, bind_group, &[]);
        self.geometry.draw(pass);
    }
}

impl GpuHandle for PbrMesh {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        self.bind_group = None;
        self.geometry.release();
        for texture in &mut self.textures {
            texture.release();
        }
        self.info.release();
        self.environment = ResourceId::NULL;
        self.id = ResourceId::NULL;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;
    use crate::gpu::Vertex;
    use crate::pbr::PassFormats;

    fn triangle() -> MeshData {
        let vertex = |position: [f32; 3]| Vertex {
            position,
            normal: [0.0, 0.0, 1.0],
            tangent: [1.0, 0.0, 0.0],
            bitangent: [0.0, 1.0, 0.0],
            texcoord: [position[0], position[1], 0.0],
        };
        MeshData {
            vertices: vec![
                vertex([0.0, 0.0, 0.0]),
                vertex([1.0, 0.0, 0.0]),
                vertex([0.0, 1.0, 0.0]),
            ],
            indices: vec![0, 1, 2],
            textures: Default::default(),
        }
    }

    fn formats() -> PassFormats {
        PassFormats {
            color: vec![
                wgpu::TextureFormat::Rgba16Float,
                wgpu::TextureFormat::Rgba16Float,
                wgpu::TextureFormat::R16Float,
            ],
            depth: wgpu::TextureFormat::Depth32Float,
            samples: 1,
        }
    }

    #[test]
    fn default_mesh_is_unusable() {
        let mesh = PbrMesh::default();
        assert!(!mesh.is_usable());
        assert!(mesh.environment().is_null());
        assert_eq!(mesh.element_count(), 0);
    }

    #[test]
    fn mesh_without_textures_uses_fallbacks() {
        let Some((device, queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let program = PbrProgram::new(&device, &queue, Path::new(crate::SHADER_DIR), &formats()).unwrap();
        assert!(program.is_complete());

        let mut mesh = PbrMesh::new(&device, &queue, &program, &triangle(), Path::new("textures"), None).unwrap();
        assert!(mesh.is_usable());
        assert_eq!(mesh.element_count(), 3);
        assert!(mesh.environment().is_null());
        assert_eq!(mesh.material_info().geometric_normal, 1);
        for slot in MaterialSlot::ALL {
            let texture = mesh.texture(slot);
            assert_eq!((texture.width(), texture.height()), (1, 1), "{slot:?}");
            assert_eq!(texture.format(), Some(slot.fallback_format()));
        }

        mesh.release();
        mesh.release();
        assert!(!mesh.is_usable());
    }

    #[test]
    fn missing_texture_file_fails_construction() {
        let Some((device, queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let program = PbrProgram::new(&device, &queue, Path::new(crate::SHADER_DIR), &formats()).unwrap();
        let mut data = triangle();
        data.textures.albedo = "missing.png".to_string();

        let result = PbrMesh::new(&device, &queue, &program, &data, Path::new("/nonexistent"), None);
        assert!(result.is_err());
    }
}
