//! Metallic/roughness meshes and the shared program that draws them.
//!
//! `PbrProgram` is created once per renderer and owns everything meshes
//! share. Each `PbrMesh` owns its geometry and material textures and a bind
//! group that also references the environment maps.

mod material;
mod mesh;
mod program;

pub use material::MaterialSlot;
pub use mesh::PbrMesh;
pub use program::{
    ALBEDO_SLOT, BRDF_LUT_SLOT, IRRADIANCE_SLOT, METALNESS_SLOT, NORMAL_SLOT, PassFormats,
    PassKind, PbrProgram, ROUGHNESS_SLOT, SPECULAR_ENV_SLOT,
};
