//! Material definitions

use crate::resources::{SamplerDesc, TextureData};
use crate::EntityId;
use bytemuck::{Pod, Zeroable};
use std::sync::Arc;

/// Material: a base color factor modulating a base color texture.
///
/// Immutable after construction; shared between primitives through `Arc`.
#[derive(Clone)]
pub struct Material {
    id: EntityId,
    pub name: String,
    pub base_factor: [f32; 4],
    pub base_texture: Arc<TextureData>,
    pub sampler: SamplerDesc,
}

impl Material {
    pub fn new(name: &str, base_texture: Arc<TextureData>) -> Self {
        Self {
            id: EntityId::next(),
            name: name.to_string(),
            base_factor: [1.0, 1.0, 1.0, 1.0],
            base_texture,
            sampler: SamplerDesc::default(),
        }
    }

    pub fn with_base_factor(mut self, base_factor: [f32; 4]) -> Self {
        self.base_factor = base_factor;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerDesc) -> Self {
        self.sampler = sampler;
        self
    }

    /// A plain tinted material over a white texture
    pub fn tinted(name: &str, base_factor: [f32; 4]) -> Self {
        Self::new(name, Arc::new(TextureData::white())).with_base_factor(base_factor)
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Build material uniform data for shaders
    pub fn uniform_data(&self) -> MaterialUniformData {
        MaterialUniformData {
            base_factor: self.base_factor,
        }
    }
}

/// Material uniform data for GPU, bound at slot 3
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniformData {
    pub base_factor: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_uniform_is_16_bytes() {
        assert_eq!(std::mem::size_of::<MaterialUniformData>(), 16);
    }

    #[test]
    fn base_factor_defaults_to_white() {
        let m = Material::new("m", Arc::new(TextureData::white()));
        assert_eq!(m.uniform_data().base_factor, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn clones_share_entity_identity() {
        let m = Material::tinted("red", [1.0, 0.0, 0.0, 1.0]);
        let c = m.clone();
        assert_eq!(m.id(), c.id());
    }
}
