//! Shader-visible constant and vertex layouts.
//!
//! glam matrices are column-major, which is what HLSL cbuffers expect by
//! default, so matrices are stored without transposing.

use glam::{Mat4, Vec2, Vec3, Vec4};

pub const MAX_LIGHTS: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_c: Vec2,
}

impl Vertex {
    pub const fn new(position: Vec3, normal: Vec3, tex_c: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_c,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct ObjectConstants {
    pub world: Mat4,
    pub tex_transform: Mat4,
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
            tex_transform: Mat4::IDENTITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct MaterialConstants {
    pub diffuse_albedo: Vec4,
    pub fresnel_r0: Vec3,
    pub roughness: f32,
    pub mat_transform: Mat4,
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: Vec4::ONE,
            fresnel_r0: Vec3::splat(0.01),
            roughness: 0.25,
            mat_transform: Mat4::IDENTITY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Light {
    pub strength: Vec3,
    /// Point and spot lights only.
    pub falloff_start: f32,
    /// Directional and spot lights only.
    pub direction: Vec3,
    /// Point and spot lights only.
    pub falloff_end: f32,
    /// Point and spot lights only.
    pub position: Vec3,
    /// Spot lights only.
    pub spot_power: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: Vec3::splat(0.5),
            falloff_start: 1.0,
            direction: Vec3::new(0.0, -1.0, 0.0),
            falloff_end: 10.0,
            position: Vec3::ZERO,
            spot_power: 64.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct PassConstants {
    pub view: Mat4,
    pub inv_view: Mat4,
    pub proj: Mat4,
    pub inv_proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view_proj: Mat4,
    pub eye_position_world: Vec3,
    _pad0: f32,
    pub render_target_size: Vec2,
    pub inv_render_target_size: Vec2,
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: Vec4,
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            inv_view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            inv_proj: Mat4::IDENTITY,
            view_proj: Mat4::IDENTITY,
            inv_view_proj: Mat4::IDENTITY,
            eye_position_world: Vec3::ZERO,
            _pad0: 0.0,
            render_target_size: Vec2::ZERO,
            inv_render_target_size: Vec2::ZERO,
            near_z: 0.0,
            far_z: 0.0,
            total_time: 0.0,
            delta_time: 0.0,
            ambient_light: Vec4::new(0.0, 0.0, 0.0, 1.0),
            lights: [Light::default(); MAX_LIGHTS],
        }
    }
}

impl PassConstants {
    /// Fills the camera-derived matrices, including inverses.
    pub fn set_camera(&mut self, view: Mat4, proj: Mat4, eye: Vec3, near_z: f32, far_z: f32) {
        let view_proj = proj * view;

        self.view = view;
        self.inv_view = view.inverse();
        self.proj = proj;
        self.inv_proj = proj.inverse();
        self.view_proj = view_proj;
        self.inv_view_proj = view_proj.inverse();
        self.eye_position_world = eye;
        self.near_z = near_z;
        self.far_z = far_z;
    }

    pub fn set_render_target_size(&mut self, width: u32, height: u32) {
        let size = Vec2::new(width as f32, height as f32);
        self.render_target_size = size;
        self.inv_render_target_size = size.recip();
    }

    pub fn set_time(&mut self, total_time: f32, delta_time: f32) {
        self.total_time = total_time;
        self.delta_time = delta_time;
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::{MaterialConstants, ObjectConstants, PassConstants, Vertex};
    use crate::graphics::{align, upload_buffer::BufferUsage, CONSTANT_BUFFER_ALIGNMENT};

    #[test]
    fn constant_strides() {
        assert_eq!(size_of::<ObjectConstants>(), 128);
        assert_eq!(size_of::<MaterialConstants>(), 96);
        assert_eq!(align(size_of::<ObjectConstants>(), CONSTANT_BUFFER_ALIGNMENT), 256);
        assert_eq!(size_of::<PassConstants>() % 16, 0);
    }

    #[test]
    fn vertices_are_tightly_packed() {
        assert_eq!(size_of::<Vertex>(), 32);
        assert_eq!(BufferUsage::Upload.element_stride(size_of::<Vertex>()), 32);
    }

    #[test]
    fn camera_inverses_round_trip() {
        let mut pass = PassConstants::default();
        let view = Mat4::look_at_lh(Vec3::new(0.0, 2.0, -5.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_lh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 1.0, 1000.0);

        pass.set_camera(view, proj, Vec3::new(0.0, 2.0, -5.0), 1.0, 1000.0);

        assert!((pass.view * pass.inv_view).abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert!((pass.view_proj * pass.inv_view_proj).abs_diff_eq(Mat4::IDENTITY, 1e-3));
    }

    #[test]
    fn render_target_size_reciprocal() {
        let mut pass = PassConstants::default();
        pass.set_render_target_size(800, 600);

        assert_eq!(pass.render_target_size.x, 800.0);
        assert!((pass.inv_render_target_size.y - 1.0 / 600.0).abs() < f32::EPSILON);
    }
}
