//! Owned wrappers around GPU objects.
//!
//! Every wrapper implements [`GpuHandle`]: it has a process-unique
//! [`ResourceId`], is usable only while it owns its object, and can be moved
//! out of a slot with `std::mem::take`, leaving an unusable handle behind.

mod framebuffer;
mod handle;
mod mesh;
mod mipmap;
mod readback;
mod shader;
mod target;
mod texture;
mod uniform;

pub use framebuffer::{AttachmentPoint, Framebuffer};
pub use handle::{GpuHandle, ResourceId};
pub use mesh::{MeshGeometry, Vertex};
pub use mipmap::{MipLevel, build_mip_chain};
pub use readback::read_texture;
pub use shader::{ProgramKind, Shader, ShaderProgram, ShaderStage, validate_wgsl};
pub use target::{AttachmentParams, RenderTarget, Renderbuffer, TargetKind};
pub use texture::{CUBE_FACE_COUNT, Texture, TextureDesc, TextureKind, default_mip_levels};
pub use uniform::{UniformBuffer, uniform_layout_entry};
