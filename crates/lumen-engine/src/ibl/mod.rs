//! Image-based lighting precomputation.
//!
//! One equirectangular HDR image becomes three textures: a specular
//! pre-filtered environment cube (roughness across its mip chain), a small
//! diffuse irradiance cube and the split-sum BRDF lookup table.

mod environment;
mod schedule;

pub use environment::{Environment, EnvironmentConfig};
pub use schedule::{PrefilterLevel, brdf_row_stride, dispatch_groups, prefilter_schedule};

/// Face size of the environment cube map.
pub const ENV_MAP_SIZE: u32 = 1024;
/// Face size of the irradiance cube map.
pub const IRRADIANCE_MAP_SIZE: u32 = 32;
/// Side of the square BRDF lookup table.
pub const BRDF_LUT_SIZE: u32 = 256;
/// Workgroup side declared by every precompute shader (`@workgroup_size(32, 32, 1)`).
pub const WORKGROUP_SIZE: u32 = 32;
