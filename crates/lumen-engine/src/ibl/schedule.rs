use super::WORKGROUP_SIZE;

/// Workgroups along one axis needed to cover `size` texels. Never zero.
pub fn dispatch_groups(size: u32) -> u32 {
    size.div_ceil(WORKGROUP_SIZE).max(1)
}

/// One pre-filter dispatch.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PrefilterLevel {
    pub level: u32,
    /// Face size at this level.
    pub size: u32,
    pub roughness: f32,
    /// Workgroups per axis (x and y); z is always the face count.
    pub groups: u32,
}

/// Levels `1..levels` of a `base_size` cube with roughness
/// `level / max(levels - 1, 1)`.
///
/// Level 0 is absent: it is a verbatim copy of the unfiltered source (a
/// mirror reflection).
pub fn prefilter_schedule(base_size: u32, levels: u32) -> Vec<PrefilterLevel> {
    let delta = 1.0 / levels.saturating_sub(1).max(1) as f32;

    (1..levels)
        .map(|level| {
            let size = (base_size >> level).max(1);
            PrefilterLevel {
                level,
                size,
                roughness: level as f32 * delta,
                groups: dispatch_groups(size),
            }
        })
        .collect()
}

/// Texels per row of the BRDF staging buffer, padded so the copy into the
/// texture satisfies the 256-byte row alignment. Each texel is 4 bytes.
pub fn brdf_row_stride(size: u32) -> u32 {
    let bytes = size * 4;
    bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT / 4
}
