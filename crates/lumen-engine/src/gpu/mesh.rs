use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::assets::MeshData;

use super::handle::{GpuHandle, ResourceId};

/// Interleaved vertex: five 3-component attributes, 60 bytes.
///
/// ```text
/// location 0  position   offset  0
/// location 1  normal     offset 12
/// location 2  tangent    offset 24
/// location 3  bitangent  offset 36
/// location 4  texcoord   offset 48  (z unused)
/// ```
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub texcoord: [f32; 3],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

enum Geometry {
    Indexed {
        vertices: wgpu::Buffer,
        indices: wgpu::Buffer,
        index_count: u32,
    },
    /// No buffers; the vertex stage derives a covering triangle from the
    /// vertex index.
    FullScreenTriangle,
}

/// Vertex and index buffers of one mesh, or the buffer-less full-screen
/// triangle.
#[derive(Default)]
pub struct MeshGeometry {
    id: ResourceId,
    geometry: Option<Geometry>,
}

impl MeshGeometry {
    pub fn new(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            id: ResourceId::next(),
            geometry: Some(Geometry::Indexed {
                vertices,
                indices,
                index_count: mesh.indices.len() as u32,
            }),
        }
    }

    pub fn full_screen_triangle() -> Self {
        Self {
            id: ResourceId::next(),
            geometry: Some(Geometry::FullScreenTriangle),
        }
    }

    pub fn is_full_screen_triangle(&self) -> bool {
        matches!(self.geometry, Some(Geometry::FullScreenTriangle))
    }

    /// Number of vertices the draw call consumes.
    pub fn element_count(&self) -> u32 {
        match &self.geometry {
            Some(Geometry::Indexed { index_count, .. }) => *index_count,
            Some(Geometry::FullScreenTriangle) => 3,
            None => 0,
        }
    }

    /// Issues the draw: indexed triangle list, or three generated vertices.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        match &self.geometry {
            Some(Geometry::Indexed {
                vertices,
                indices,
                index_count,
            }) => {
                pass.set_vertex_buffer(0, vertices.slice(..));
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..*index_count, 0, 0..1);
            }
            Some(Geometry::FullScreenTriangle) => pass.draw(0..3, 0..1),
            None => {}
        }
    }
}

impl GpuHandle for MeshGeometry {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        if let Some(Geometry::Indexed {
            vertices, indices, ..
        }) = self.geometry.take()
        {
            vertices.destroy();
            indices.destroy();
        }
        self.id = ResourceId::NULL;
    }
}
