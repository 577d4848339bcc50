//! Transform component

use bytemuck::{Pod, Zeroable};
use glam::{Mat3, Mat4, Quat, Vec3};

/// Local transform of a scene node
#[derive(Debug, Clone, Copy)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    pub fn from_translation_rotation(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            ..Default::default()
        }
    }

    pub fn from_translation_scale(translation: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            scale,
            ..Default::default()
        }
    }

    /// Create transform from translation, rotation (euler angles in radians), and scale
    pub fn from_components(translation: Vec3, rotation_euler: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::from_euler(
                glam::EulerRot::XYZ,
                rotation_euler.x,
                rotation_euler.y,
                rotation_euler.z,
            ),
            scale,
        }
    }

    /// Local model matrix, composed as translation * rotation * scale
    pub fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Translate by an offset
    pub fn translate(&mut self, offset: Vec3) {
        self.translation += offset;
    }

    /// Rotate by euler angles (radians)
    pub fn rotate_euler(&mut self, euler: Vec3) {
        let delta = Quat::from_euler(glam::EulerRot::XYZ, euler.x, euler.y, euler.z);
        self.rotation = delta * self.rotation;
    }

    /// Rotate around an axis
    pub fn rotate_axis(&mut self, axis: Vec3, angle: f32) {
        let delta = Quat::from_axis_angle(axis, angle);
        self.rotation = delta * self.rotation;
    }

    /// Orient the transform so its local -Z looks at a target position.
    /// A target coinciding with the translation leaves the rotation as is.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let Some(forward) = (target - self.translation).try_normalize() else {
            return;
        };
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        self.rotation = Quat::from_mat3(&Mat3::from_cols(right, up, -forward));
    }
}

/// Normal matrix of a global transform: inverse transpose of the upper 3x3,
/// padded back out to 4x4 for the uniform layout
pub fn normal_matrix(global: Mat4) -> Mat4 {
    Mat4::from_mat3(Mat3::from_mat4(global).inverse().transpose())
}

/// Model uniform data for GPU, bound at slot 2
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct ModelUniformData {
    pub model: Mat4,
    pub normal: Mat4,
}

impl ModelUniformData {
    pub fn new(global: Mat4) -> Self {
        Self {
            model: global,
            normal: normal_matrix(global),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn mat4_close(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn local_matrix_composes_translation_rotation_scale() {
        let t = Transform::from_components(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
            Vec3::splat(2.0),
        );
        let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))
            * Mat4::from_quat(t.rotation)
            * Mat4::from_scale(Vec3::splat(2.0));
        assert!(mat4_close(t.local_matrix(), expected));
    }

    #[test]
    fn identity_transform_has_identity_matrix() {
        assert!(mat4_close(Transform::default().local_matrix(), Mat4::IDENTITY));
    }

    #[test]
    fn normal_matrix_undoes_nonuniform_scale() {
        let global = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let n = normal_matrix(global);
        // a normal along the stretched axis shrinks instead
        let v = n * Vec4::new(1.0, 0.0, 0.0, 0.0);
        assert!((v.x - 0.5).abs() < 1e-5);
        assert_eq!(v.w, 0.0);
    }

    #[test]
    fn normal_matrix_of_rotation_is_the_rotation() {
        let global = Mat4::from_quat(Quat::from_rotation_y(0.7));
        assert!(mat4_close(normal_matrix(global), global));
    }

    #[test]
    fn look_at_own_position_keeps_the_rotation() {
        let mut t = Transform::from_translation(Vec3::new(3.0, 1.0, -2.0));
        t.rotate_axis(Vec3::Y, 0.4);
        let before = t.rotation;

        t.look_at(t.translation, Vec3::Y);

        assert_eq!(t.rotation, before);
        assert!(t.rotation.is_finite());
    }

    #[test]
    fn look_at_points_local_negative_z_at_the_target() {
        let mut t = Transform::from_translation(Vec3::new(0.0, 0.0, 5.0));
        t.look_at(Vec3::ZERO, Vec3::Y);
        let forward = t.rotation * -Vec3::Z;
        assert!((forward - -Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn model_uniform_layout_is_128_bytes() {
        assert_eq!(std::mem::size_of::<ModelUniformData>(), 128);
        assert_eq!(bytemuck::offset_of!(ModelUniformData, model), 0);
        assert_eq!(bytemuck::offset_of!(ModelUniformData, normal), 64);
    }
}
