//! CPU-side render resources: meshes, materials, textures

mod material;
mod mesh;
mod texture;

pub use material::*;
pub use mesh::*;
pub use texture::*;
