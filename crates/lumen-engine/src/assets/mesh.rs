use std::path::Path;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};

use crate::gpu::Vertex;

/// Texture file names referenced by a mesh's material. Empty means "none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialTextureNames {
    pub albedo: String,
    pub normal: String,
    pub metalness: String,
    pub roughness: String,
}

/// CPU-side triangle mesh ready for upload.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub textures: MaterialTextureNames,
}

impl MeshData {
    /// Loads a Wavefront OBJ file, merging every object it contains.
    ///
    /// Missing or partial normals are rebuilt as smooth area-weighted normals. Tangent
    /// frames are always derived from the texture coordinates.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading mesh: {}", path.display());

        let (models, materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                single_index: true,
                triangulate: true,
                ..Default::default()
            },
        )
        .with_context(|| format!("failed to load mesh file: {}", path.display()))?;

        anyhow::ensure!(
            !models.is_empty(),
            "failed to load mesh file: {}: no objects",
            path.display()
        );

        let materials = match materials {
            Ok(m) => m,
            Err(e) => {
                log::warn!("{}: material library not loaded: {e}", path.display());
                Vec::new()
            }
        };

        let mut data = MeshData::default();
        for model in &models {
            data.append(&model.mesh);
        }

        let material = models
            .iter()
            .find_map(|m| m.mesh.material_id)
            .and_then(|id| materials.get(id))
            .or_else(|| materials.first());
        if let Some(material) = material {
            data.textures = texture_names(material);
        }

        log::debug!(
            "{}: {} vertices, {} triangles",
            path.display(),
            data.vertices.len(),
            data.indices.len() / 3
        );

        Ok(data)
    }

    fn append(&mut self, mesh: &tobj::Mesh) {
        let base = self.vertices.len() as u32;
        let count = mesh.positions.len() / 3;

        let mut vertices: Vec<Vertex> = (0..count)
            .map(|i| Vertex {
                position: read3(&mesh.positions, i),
                normal: if mesh.normals.len() >= (i + 1) * 3 {
                    read3(&mesh.normals, i)
                } else {
                    [0.0; 3]
                },
                texcoord: if mesh.texcoords.len() >= (i + 1) * 2 {
                    [mesh.texcoords[i * 2], mesh.texcoords[i * 2 + 1], 0.0]
                } else {
                    [0.0; 3]
                },
                ..Vertex::default()
            })
            .collect();

        if mesh.normals.len() != mesh.positions.len() {
            compute_normals(&mut vertices, &mesh.indices);
        }
        compute_tangents(&mut vertices, &mesh.indices);

        self.vertices.extend(vertices);
        self.indices.extend(mesh.indices.iter().map(|i| base + i));
    }
}

fn read3(values: &[f32], i: usize) -> [f32; 3] {
    [values[i * 3], values[i * 3 + 1], values[i * 3 + 2]]
}

fn texture_names(material: &tobj::Material) -> MaterialTextureNames {
    let extra = |key: &str| material.unknown_param.get(key).cloned();

    MaterialTextureNames {
        albedo: material.diffuse_texture.clone().unwrap_or_default(),
        normal: material
            .normal_texture
            .clone()
            .or_else(|| extra("norm"))
            .unwrap_or_default(),
        metalness: extra("map_Pm").unwrap_or_default(),
        roughness: extra("map_Pr").unwrap_or_default(),
    }
}

/// Area-weighted smooth normals.
pub(crate) fn compute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let p0 = Vec3::from(vertices[a].position);
        let p1 = Vec3::from(vertices[b].position);
        let p2 = Vec3::from(vertices[c].position);
        // Unnormalised cross product weights by triangle area.
        let n = (p1 - p0).cross(p2 - p0);
        accum[a] += n;
        accum[b] += n;
        accum[c] += n;
    }

    for (vertex, n) in vertices.iter_mut().zip(accum) {
        vertex.normal = n.normalize_or(Vec3::Z).to_array();
    }
}

/// Per-vertex tangent and bitangent from UV gradients.
///
/// Tangents are orthogonalised against the normal. The bitangent is rebuilt
/// as `cross(n, t)` with the sign of the accumulated UV-space bitangent.
pub(crate) fn compute_tangents(vertices: &mut [Vertex], indices: &[u32]) {
    let mut tangents = vec![Vec3::ZERO; vertices.len()];
    let mut bitangents = vec![Vec3::ZERO; vertices.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let p0 = Vec3::from(vertices[a].position);
        let p1 = Vec3::from(vertices[b].position);
        let p2 = Vec3::from(vertices[c].position);
        let uv0 = Vec2::new(vertices[a].texcoord[0], vertices[a].texcoord[1]);
        let uv1 = Vec2::new(vertices[b].texcoord[0], vertices[b].texcoord[1]);
        let uv2 = Vec2::new(vertices[c].texcoord[0], vertices[c].texcoord[1]);

        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let d1 = uv1 - uv0;
        let d2 = uv2 - uv0;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-12 {
            continue;
        }
        let r = 1.0 / det;
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let bt = (e2 * d1.x - e1 * d2.x) * r;

        for i in [a, b, c] {
            tangents[i] += t;
            bitangents[i] += bt;
        }
    }

    for (i, vertex) in vertices.iter_mut().enumerate() {
        let n = Vec3::from(vertex.normal).normalize_or(Vec3::Z);

        let t = tangents[i] - n * n.dot(tangents[i]);
        let t = if t.length_squared() > 1e-12 {
            t.normalize()
        } else {
            fallback_tangent(n)
        };

        let handedness = if n.cross(t).dot(bitangents[i]) < 0.0 { -1.0 } else { 1.0 };
        let b = n.cross(t) * handedness;

        vertex.tangent = t.to_array();
        vertex.bitangent = b.to_array();
    }
}

/// Any unit vector perpendicular to `n`.
fn fallback_tangent(n: Vec3) -> Vec3 {
    let axis = if n.x.abs() < 0.9 { Vec3::X } else { Vec3::Y };
    (axis - n * n.dot(axis)).normalize()
}
