use std::f32::consts::{FRAC_PI_4, PI};

use glam::{Mat4, Vec2, Vec3};

use crate::input::{InputSnapshot, MouseButtons};

#[derive(Clone, Debug)]
pub struct Camera {
    pub view: Mat4,
    pub eye: Vec3,
    pub far: f32,
    pub near: f32,
    pub fov: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov, self.aspect_ratio, self.near, self.far)
    }
}

/// Camera on a sphere around the origin.
///
/// Left drag orbits, right drag moves along the view direction.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    pub theta: f32,
    pub phi: f32,
    pub radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub aspect_ratio: f32,
    last_mouse: Option<Vec2>,
}

impl OrbitCamera {
    const ORBIT_DEGREES_PER_PIXEL: f32 = 0.25;
    const ZOOM_PER_PIXEL: f32 = 0.05;
    const MIN_PHI: f32 = 0.1;
    const MAX_PHI: f32 = PI - 0.1;

    pub const FOV: f32 = FRAC_PI_4;
    pub const NEAR: f32 = 1.0;
    pub const FAR: f32 = 1000.0;

    pub fn new(radius: f32, max_radius: f32, aspect_ratio: f32) -> Self {
        Self {
            theta: 1.5 * PI,
            phi: 0.2 * PI,
            radius,
            min_radius: 3.0,
            max_radius,
            aspect_ratio,
            last_mouse: None,
        }
    }

    pub fn update(&mut self, input: &InputSnapshot) {
        let position = input.mouse_position;
        let delta = self.last_mouse.map_or(Vec2::ZERO, |last| position - last);
        self.last_mouse = Some(position);

        if input.is_pressed(MouseButtons::LEFT) {
            let d = (delta * Self::ORBIT_DEGREES_PER_PIXEL).to_array().map(f32::to_radians);
            self.theta += d[0];
            self.phi = (self.phi + d[1]).clamp(Self::MIN_PHI, Self::MAX_PHI);
        } else if input.is_pressed(MouseButtons::RIGHT) {
            let d = delta * Self::ZOOM_PER_PIXEL;
            self.radius = (self.radius + d.x - d.y).clamp(self.min_radius, self.max_radius);
        }
    }

    pub fn eye(&self) -> Vec3 {
        Vec3::new(
            self.radius * self.phi.sin() * self.theta.cos(),
            self.radius * self.phi.cos(),
            self.radius * self.phi.sin() * self.theta.sin(),
        )
    }

    pub fn camera(&self) -> Camera {
        let eye = self.eye();

        Camera {
            view: Mat4::look_at_lh(eye, Vec3::ZERO, Vec3::Y),
            eye,
            far: Self::FAR,
            near: Self::NEAR,
            fov: Self::FOV,
            aspect_ratio: self.aspect_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::OrbitCamera;
    use crate::input::{InputSnapshot, MouseButtons};

    fn drag(camera: &mut OrbitCamera, buttons: MouseButtons, from: Vec2, to: Vec2) {
        camera.update(&InputSnapshot {
            mouse_position: from,
            buttons,
            ..Default::default()
        });
        camera.update(&InputSnapshot {
            mouse_position: to,
            buttons,
            ..Default::default()
        });
    }

    #[test]
    fn phi_is_clamped() {
        let mut camera = OrbitCamera::new(5.0, 150.0, 1.0);
        drag(&mut camera, MouseButtons::LEFT, Vec2::ZERO, Vec2::new(0.0, 10_000.0));
        assert!((camera.phi - (std::f32::consts::PI - 0.1)).abs() < 1e-5);

        drag(&mut camera, MouseButtons::LEFT, Vec2::ZERO, Vec2::new(0.0, -10_000.0));
        assert!((camera.phi - 0.1).abs() < 1e-5);
    }

    #[test]
    fn radius_is_clamped() {
        let mut camera = OrbitCamera::new(5.0, 20.0, 1.0);
        drag(&mut camera, MouseButtons::RIGHT, Vec2::ZERO, Vec2::new(10_000.0, 0.0));
        assert_eq!(camera.radius, 20.0);

        drag(&mut camera, MouseButtons::RIGHT, Vec2::ZERO, Vec2::new(-10_000.0, 0.0));
        assert_eq!(camera.radius, 3.0);
    }

    #[test]
    fn eye_lies_on_sphere() {
        let mut camera = OrbitCamera::new(15.0, 150.0, 16.0 / 9.0);
        drag(&mut camera, MouseButtons::LEFT, Vec2::ZERO, Vec2::new(37.0, 12.0));
        assert!((camera.camera().eye.length() - 15.0).abs() < 1e-3);
    }

    #[test]
    fn moving_without_buttons_does_nothing() {
        let mut camera = OrbitCamera::new(15.0, 150.0, 1.0);
        let (theta, phi) = (camera.theta, camera.phi);
        drag(&mut camera, MouseButtons::empty(), Vec2::ZERO, Vec2::new(100.0, 100.0));
        assert_eq!((camera.theta, camera.phi, camera.radius), (theta, phi, 15.0));
    }
}
