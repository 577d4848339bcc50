//! Camera component

use crate::EntityId;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Camera projection type
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Projection::Orthographic {
            left: -half_w,
            right: half_w,
            bottom: -half_h,
            top: half_h,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(*fov_y, *aspect, *near, *far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(*left, *right, *bottom, *top, *near, *far),
        }
    }

    pub fn is_orthographic(&self) -> bool {
        matches!(self, Projection::Orthographic { .. })
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// Camera component attached to a scene node.
///
/// The view matrix is not stored here; it is the inverse of the owning
/// node's global transform at the time of rendering.
#[derive(Debug, Clone)]
pub struct Camera {
    id: EntityId,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Projection::default())
    }
}

impl Camera {
    pub fn new(projection: Projection) -> Self {
        Self {
            id: EntityId::next(),
            projection,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// View matrix for a camera whose node has the given global transform
    pub fn view_from_global(global: Mat4) -> Mat4 {
        global.inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// Update aspect ratio for perspective projection
    pub fn set_aspect(&mut self, width: f32, height: f32) {
        self.projection.set_aspect(width / height);
    }

    /// Build camera uniform data from the node's global transform
    pub fn uniform_data(&self, global: Mat4) -> CameraUniformData {
        CameraUniformData {
            view: Self::view_from_global(global),
            projection: self.projection_matrix(),
        }
    }
}

/// Camera uniform data for GPU, bound at slot 0
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct CameraUniformData {
    pub view: Mat4,
    pub projection: Mat4,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn view_matrix_is_inverse_of_global() {
        let global = Mat4::from_translation(Vec3::new(0.0, 5.0, 10.0));
        let view = Camera::view_from_global(global);
        // a point at the camera's position maps to the view-space origin
        let origin = view * Vec4::new(0.0, 5.0, 10.0, 1.0);
        assert!(origin.truncate().length() < 1e-5);
    }

    #[test]
    fn orthographic_constructor_is_centered() {
        let p = Projection::orthographic(160.0, 160.0, -200.0, 300.0);
        match p {
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => {
                assert_eq!((left, right), (-80.0, 80.0));
                assert_eq!((bottom, top), (-80.0, 80.0));
                assert_eq!((near, far), (-200.0, 300.0));
            }
            _ => panic!("expected orthographic projection"),
        }
    }

    #[test]
    fn set_aspect_only_affects_perspective() {
        let mut p = Projection::orthographic(2.0, 2.0, 0.1, 10.0);
        p.set_aspect(2.0);
        assert!(p.is_orthographic());

        let mut p = Projection::default();
        p.set_aspect(2.0);
        match p {
            Projection::Perspective { aspect, .. } => assert_eq!(aspect, 2.0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn camera_uniform_layout_is_128_bytes() {
        assert_eq!(std::mem::size_of::<CameraUniformData>(), 128);
        assert_eq!(bytemuck::offset_of!(CameraUniformData, view), 0);
        assert_eq!(bytemuck::offset_of!(CameraUniformData, projection), 64);
    }

    #[test]
    fn cameras_get_distinct_entity_ids() {
        let a = Camera::default();
        let b = Camera::default();
        assert_ne!(a.id(), b.id());
    }
}
