//! Decoders for the files read at startup: images and OBJ meshes.

mod image;
mod mesh;

pub use self::image::{Image, Pixels};
pub use mesh::{MaterialTextureNames, MeshData};
