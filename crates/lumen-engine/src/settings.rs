//! Camera and scene state edited by the driver and read by the renderer.

use glam::{Mat4, Vec3};

pub const NUM_LIGHTS: usize = 3;

const NEAR_PLANE: f32 = 1.0;
const FAR_PLANE: f32 = 10000.0;

/// Orbit camera. Angles are in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewSettings {
    pub pitch: f32,
    pub yaw: f32,
    pub distance: f32,
    /// Vertical field of view.
    pub fov: f32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            yaw: 0.0,
            distance: 400.0,
            fov: 35.0,
        }
    }
}

impl ViewSettings {
    /// Camera orientation without the orbit distance.
    pub fn rotation(&self) -> Mat4 {
        euler_xy(self.pitch, self.yaw)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance)) * self.rotation()
    }

    /// Right-handed perspective with a 0..1 depth range.
    pub fn projection(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        Mat4::perspective_rh(self.fov.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }

    /// World-space camera position.
    pub fn eye_position(&self) -> Vec3 {
        self.view_matrix().inverse().transform_point3(Vec3::ZERO)
    }
}

/// Directional light. `direction` points from the light into the scene.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub direction: Vec3,
    pub radiance: Vec3,
    pub enabled: bool,
}

impl Light {
    pub fn new(direction: Vec3, radiance: Vec3) -> Self {
        Self {
            direction: direction.normalize_or_zero(),
            radiance,
            enabled: false,
        }
    }
}

/// Object orientation and light rig. Angles are in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SceneSettings {
    pub pitch: f32,
    pub yaw: f32,
    pub lights: [Light; NUM_LIGHTS],
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            pitch: 0.0,
            yaw: 0.0,
            lights: [
                Light::new(Vec3::new(-1.0, 0.0, 0.0), Vec3::ONE),
                Light::new(Vec3::new(1.0, 0.0, 0.0), Vec3::ONE),
                Light::new(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE),
            ],
        }
    }
}

impl SceneSettings {
    pub fn model_matrix(&self) -> Mat4 {
        euler_xy(self.pitch, self.yaw)
    }

    /// Flips light `index`; out-of-range indices are ignored.
    pub fn toggle_light(&mut self, index: usize) {
        if let Some(light) = self.lights.get_mut(index) {
            light.enabled = !light.enabled;
        }
    }
}

/// Rotation about X by `pitch`, then about Y by `yaw` (applied right to left).
fn euler_xy(pitch_deg: f32, yaw_deg: f32) -> Mat4 {
    Mat4::from_rotation_x(pitch_deg.to_radians()) * Mat4::from_rotation_y(yaw_deg.to_radians())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-3
    }

    // ── view ──────────────────────────────────────────────────────────────

    #[test]
    fn default_eye_sits_on_positive_z() {
        let view = ViewSettings::default();
        assert!(approx(view.eye_position(), Vec3::new(0.0, 0.0, 400.0)));
    }

    #[test]
    fn yaw_orbits_eye_around_y() {
        let view = ViewSettings {
            yaw: 90.0,
            distance: 10.0,
            ..ViewSettings::default()
        };
        let eye = view.eye_position();
        assert!((eye.length() - 10.0).abs() < 1e-3);
        assert!(eye.y.abs() < 1e-3);
        assert!(eye.z.abs() < 1e-3);
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let proj = ViewSettings::default().projection(1280, 720);
        let clip = proj * glam::Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!((clip.z / clip.w).abs() < 1e-5);
    }

    #[test]
    fn projection_tolerates_zero_height() {
        let proj = ViewSettings::default().projection(100, 0);
        assert!(proj.is_finite());
    }

    // ── scene ─────────────────────────────────────────────────────────────

    #[test]
    fn default_lights_are_unit_and_disabled() {
        let scene = SceneSettings::default();
        for light in &scene.lights {
            assert!((light.direction.length() - 1.0).abs() < 1e-6);
            assert_eq!(light.radiance, Vec3::ONE);
            assert!(!light.enabled);
        }
        assert_eq!(scene.lights[2].direction, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn toggle_light_flips_only_that_light() {
        let mut scene = SceneSettings::default();
        scene.toggle_light(1);
        assert!(!scene.lights[0].enabled);
        assert!(scene.lights[1].enabled);
        scene.toggle_light(1);
        assert!(!scene.lights[1].enabled);
        scene.toggle_light(7);
    }

    #[test]
    fn model_matrix_is_pure_rotation() {
        let scene = SceneSettings {
            pitch: 30.0,
            yaw: -45.0,
            ..SceneSettings::default()
        };
        let m = scene.model_matrix();
        assert!(approx(m.transform_point3(Vec3::ZERO), Vec3::ZERO));
        assert!((m.determinant() - 1.0).abs() < 1e-5);
    }
}
