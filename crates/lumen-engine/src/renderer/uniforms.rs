use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::settings::{NUM_LIGHTS, SceneSettings, ViewSettings};

/// Matrices derived once per frame from the view settings.
#[derive(Debug, Copy, Clone)]
pub struct CameraMatrices {
    pub projection: Mat4,
    pub view: Mat4,
    pub view_rotation: Mat4,
    pub eye: Vec3,
}

impl CameraMatrices {
    pub fn new(view: &ViewSettings, width: u32, height: u32) -> Self {
        let view_matrix = view.view_matrix();
        Self {
            projection: view.projection(width, height),
            view: view_matrix,
            view_rotation: view.rotation(),
            eye: view_matrix.inverse().transform_point3(Vec3::ZERO),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SkyboxUniforms {
    pub sky_view_projection: [[f32; 4]; 4],
}

impl SkyboxUniforms {
    /// Rotation-only view, so the sky never moves with the orbit distance.
    pub fn new(camera: &CameraMatrices) -> Self {
        Self {
            sky_view_projection: (camera.projection * camera.view_rotation).to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct TransformUniforms {
    pub view_projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

impl TransformUniforms {
    pub fn new(camera: &CameraMatrices, scene: &SceneSettings) -> Self {
        Self {
            view_projection: (camera.projection * camera.view).to_cols_array_2d(),
            model: scene.model_matrix().to_cols_array_2d(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, Pod, Zeroable)]
pub struct LightUniform {
    pub direction: [f32; 4],
    pub radiance: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ShadingUniforms {
    pub lights: [LightUniform; NUM_LIGHTS],
    pub eye_position: [f32; 4],
    /// Mip level prefiltered for roughness 1.
    pub specular_max_lod: f32,
    pub _pad: [f32; 3],
}

impl ShadingUniforms {
    /// Disabled lights keep their direction but contribute zero radiance.
    /// `specular_levels` is the mip count of the prefiltered cubemap.
    pub fn new(scene: &SceneSettings, eye: Vec3, specular_levels: u32) -> Self {
        let mut lights = [LightUniform::default(); NUM_LIGHTS];
        for (dst, light) in lights.iter_mut().zip(&scene.lights) {
            dst.direction = light.direction.extend(0.0).to_array();
            if light.enabled {
                dst.radiance = light.radiance.extend(0.0).to_array();
            }
        }

        Self {
            lights,
            eye_position: eye.extend(1.0).to_array(),
            specular_max_lod: specular_levels.saturating_sub(1) as f32,
            _pad: [0.0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct BaseInfoUniforms {
    pub opaque_pass: u32,
    pub _pad: [u32; 3],
}

impl BaseInfoUniforms {
    pub fn new(opaque_pass: bool) -> Self {
        Self {
            opaque_pass: opaque_pass as u32,
            _pad: [0; 3],
        }
    }
}

/// Per-mesh switches read by the PBR fragment stage.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct MaterialUniforms {
    /// Nonzero when the mesh names no normal map. The stand-in texel is not
    /// an encoded tangent-space normal, so the interpolated normal is used.
    pub geometric_normal: u32,
    pub _pad: [u32; 3],
}

impl MaterialUniforms {
    pub fn new(has_normal_map: bool) -> Self {
        Self {
            geometric_normal: (!has_normal_map) as u32,
            _pad: [0; 3],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct TonemapUniforms {
    pub exposure: f32,
    pub pure_white: f32,
    pub apply_gamma: u32,
    pub _pad: u32,
}

impl TonemapUniforms {
    /// Gamma is only applied in-shader when the surface does not encode sRGB
    /// on store.
    pub fn new(exposure: f32, pure_white: f32, surface_format: wgpu::TextureFormat) -> Self {
        Self {
            exposure,
            pure_white,
            apply_gamma: (!surface_format.is_srgb()) as u32,
            _pad: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn sizes_match_shader_blocks() {
        assert_eq!(std::mem::size_of::<SkyboxUniforms>(), 64);
        assert_eq!(std::mem::size_of::<TransformUniforms>(), 128);
        assert_eq!(std::mem::size_of::<ShadingUniforms>(), 128);
        assert_eq!(std::mem::size_of::<BaseInfoUniforms>(), 16);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 16);
        assert_eq!(std::mem::size_of::<TonemapUniforms>(), 16);
    }

    // ── builders ──────────────────────────────────────────────────────────

    #[test]
    fn meshes_without_normal_maps_shade_with_the_geometric_normal() {
        assert_eq!(MaterialUniforms::new(false).geometric_normal, 1);
        assert_eq!(MaterialUniforms::new(true).geometric_normal, 0);
    }

    #[test]
    fn disabled_lights_have_zero_radiance() {
        let mut scene = SceneSettings::default();
        scene.lights[1].enabled = true;

        let shading = ShadingUniforms::new(&scene, Vec3::ZERO, 1);
        assert_eq!(shading.lights[0].radiance, [0.0; 4]);
        assert_eq!(shading.lights[1].radiance, [1.0, 1.0, 1.0, 0.0]);
        assert_eq!(shading.lights[2].radiance, [0.0; 4]);
        assert_eq!(shading.lights[0].direction, [-1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn eye_position_is_a_point() {
        let shading = ShadingUniforms::new(&SceneSettings::default(), Vec3::new(1.0, 2.0, 3.0), 1);
        assert_eq!(shading.eye_position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn roughest_lookup_lands_on_last_level() {
        let scene = SceneSettings::default();
        assert_eq!(ShadingUniforms::new(&scene, Vec3::ZERO, 11).specular_max_lod, 10.0);
        assert_eq!(ShadingUniforms::new(&scene, Vec3::ZERO, 1).specular_max_lod, 0.0);
        assert_eq!(ShadingUniforms::new(&scene, Vec3::ZERO, 0).specular_max_lod, 0.0);
    }

    #[test]
    fn sky_matrix_ignores_distance() {
        let near = ViewSettings {
            distance: 10.0,
            ..ViewSettings::default()
        };
        let far = ViewSettings {
            distance: 5000.0,
            ..ViewSettings::default()
        };
        let a = SkyboxUniforms::new(&CameraMatrices::new(&near, 640, 480));
        let b = SkyboxUniforms::new(&CameraMatrices::new(&far, 640, 480));
        assert_eq!(a.sky_view_projection, b.sky_view_projection);
    }

    #[test]
    fn camera_eye_matches_view_settings() {
        let view = ViewSettings {
            pitch: 20.0,
            yaw: 35.0,
            ..ViewSettings::default()
        };
        let camera = CameraMatrices::new(&view, 800, 600);
        assert!((camera.eye - view.eye_position()).length() < 1e-3);
    }

    #[test]
    fn base_info_flag() {
        assert_eq!(BaseInfoUniforms::new(true).opaque_pass, 1);
        assert_eq!(BaseInfoUniforms::new(false).opaque_pass, 0);
    }

    #[test]
    fn gamma_only_for_linear_surfaces() {
        let srgb = TonemapUniforms::new(1.0, 1.0, wgpu::TextureFormat::Bgra8UnormSrgb);
        let linear = TonemapUniforms::new(1.0, 1.0, wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(srgb.apply_gamma, 0);
        assert_eq!(linear.apply_gamma, 1);
    }
}
