//! Directional light component

use crate::EntityId;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Directional light component attached to a scene node.
///
/// Color channels are in the 0-255 range and scaled to unit range when the
/// uniform is built; the direction points toward the light and is normalized
/// at upload, never mutated in place.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    id: EntityId,
    pub color: Vec3,
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vec3::new(255.0, 255.0, 255.0), Vec3::new(0.2, 0.9, 1.0))
    }
}

impl DirectionalLight {
    pub fn new(color: Vec3, direction: Vec3) -> Self {
        Self {
            id: EntityId::next(),
            color,
            direction,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Build light uniform data: color scaled to unit range, direction normalized
    pub fn uniform_data(&self) -> LightUniformData {
        LightUniformData {
            color: self.color / 255.0,
            _pad0: 0.0,
            direction: self.direction.normalize(),
            _pad1: 0.0,
        }
    }
}

/// Light uniform data for GPU, bound at slot 1.
///
/// Layout contract: color at byte 0 (12 bytes, padded to 16), direction at
/// byte 16 (12 bytes, padded to 32).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LightUniformData {
    pub color: Vec3,
    pub _pad0: f32,
    pub direction: Vec3,
    pub _pad1: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_light_up_normalizes_to_unit_values() {
        let light = DirectionalLight::new(Vec3::new(255.0, 255.0, 255.0), Vec3::new(0.0, 1.0, 0.0));
        let data = light.uniform_data();
        assert_eq!(data.color, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(data.direction, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn direction_is_normalized_at_upload() {
        let light = DirectionalLight::new(Vec3::new(128.0, 64.0, 0.0), Vec3::new(0.0, 3.0, 4.0));
        let data = light.uniform_data();
        assert!((data.direction.length() - 1.0).abs() < 1e-6);
        assert!((data.direction.y - 0.6).abs() < 1e-6);
        assert!((data.direction.z - 0.8).abs() < 1e-6);
        // source component is left untouched
        assert_eq!(light.direction, Vec3::new(0.0, 3.0, 4.0));
    }

    #[test]
    fn light_uniform_layout_is_32_bytes() {
        assert_eq!(std::mem::size_of::<LightUniformData>(), 32);
        assert_eq!(bytemuck::offset_of!(LightUniformData, color), 0);
        assert_eq!(bytemuck::offset_of!(LightUniformData, direction), 16);
    }

    #[test]
    fn uniform_bytes_hold_color_then_direction() {
        let light = DirectionalLight::new(Vec3::new(255.0, 0.0, 255.0), Vec3::new(0.0, 1.0, 0.0));
        let data = light.uniform_data();
        let bytes = bytemuck::bytes_of(&data);
        let color: &[f32] = bytemuck::cast_slice(&bytes[0..12]);
        let direction: &[f32] = bytemuck::cast_slice(&bytes[16..28]);
        assert_eq!(color, &[1.0, 0.0, 1.0]);
        assert_eq!(direction, &[0.0, 1.0, 0.0]);
    }
}
