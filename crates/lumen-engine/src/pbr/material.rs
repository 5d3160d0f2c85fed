use std::path::Path;

use anyhow::Result;

use crate::assets::Image;
use crate::gpu::Texture;

/// One of the four per-mesh material textures.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MaterialSlot {
    Albedo,
    Normal,
    Metalness,
    Roughness,
}

impl MaterialSlot {
    pub const ALL: [MaterialSlot; 4] = [
        MaterialSlot::Albedo,
        MaterialSlot::Normal,
        MaterialSlot::Metalness,
        MaterialSlot::Roughness,
    ];

    /// Channel count the source image is decoded to.
    pub const fn channels(self) -> u32 {
        match self {
            MaterialSlot::Albedo => 4,
            MaterialSlot::Normal => 3,
            MaterialSlot::Metalness | MaterialSlot::Roughness => 1,
        }
    }

    /// Only albedo holds colour; the others are linear data.
    pub const fn srgb(self) -> bool {
        matches!(self, MaterialSlot::Albedo)
    }

    /// Single texel used when the material names no file for this slot.
    pub const fn fallback_texel(self) -> &'static [u8] {
        match self {
            MaterialSlot::Albedo => &[128, 128, 128, 255],
            MaterialSlot::Normal => &[0, 0, 255, 255],
            MaterialSlot::Metalness | MaterialSlot::Roughness => &[128],
        }
    }

    pub const fn fallback_format(self) -> wgpu::TextureFormat {
        match self {
            MaterialSlot::Albedo => wgpu::TextureFormat::Rgba8UnormSrgb,
            MaterialSlot::Normal => wgpu::TextureFormat::Rgba8Unorm,
            MaterialSlot::Metalness | MaterialSlot::Roughness => wgpu::TextureFormat::R8Unorm,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            MaterialSlot::Albedo => "albedo",
            MaterialSlot::Normal => "normal",
            MaterialSlot::Metalness => "metalness",
            MaterialSlot::Roughness => "roughness",
        }
    }

    /// Loads `file` from `texture_dir`, or the fallback texel when `file` is
    /// empty.
    pub fn load(
        self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_dir: &Path,
        file: &str,
    ) -> Result<Texture> {
        let label = format!("lumen {} texture", self.name());

        if file.is_empty() {
            log::debug!("no {} texture, using fallback", self.name());
            return Ok(Texture::solid_color(
                device,
                queue,
                &label,
                self.fallback_format(),
                self.fallback_texel(),
            ));
        }

        let image = Image::from_file(texture_dir.join(file), self.channels())?;
        Texture::from_image(device, queue, &label, &image, self.srgb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;
    use crate::gpu::read_texture;

    // ── fallbacks ─────────────────────────────────────────────────────────

    #[test]
    fn fallback_texels_fit_their_formats() {
        for slot in MaterialSlot::ALL {
            let size = slot.fallback_format().block_copy_size(None).unwrap_or(0) as usize;
            assert_eq!(slot.fallback_texel().len(), size, "{slot:?}");
        }
    }

    #[test]
    fn fallback_values() {
        assert_eq!(MaterialSlot::Albedo.fallback_texel(), &[128, 128, 128, 255]);
        assert_eq!(MaterialSlot::Normal.fallback_texel(), &[0, 0, 255, 255]);
        assert_eq!(MaterialSlot::Metalness.fallback_texel(), &[128]);
        assert_eq!(MaterialSlot::Roughness.fallback_texel(), &[128]);
    }

    #[test]
    fn only_albedo_is_srgb() {
        assert!(MaterialSlot::Albedo.srgb());
        assert!(MaterialSlot::Albedo.fallback_format().is_srgb());
        for slot in &MaterialSlot::ALL[1..] {
            assert!(!slot.srgb());
            assert!(!slot.fallback_format().is_srgb());
        }
    }

    // ── loading ───────────────────────────────────────────────────────────

    #[test]
    fn empty_name_gives_one_texel_fallback() {
        let Some((device, queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let texture = MaterialSlot::Roughness
            .load(&device, &queue, Path::new("textures"), "")
            .unwrap();
        assert_eq!((texture.width(), texture.height()), (1, 1));
        assert_eq!(texture.format(), Some(wgpu::TextureFormat::R8Unorm));
    }

    #[test]
    fn albedo_fallback_reads_back_mid_grey() {
        let Some((device, queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let texture = MaterialSlot::Albedo
            .load(&device, &queue, Path::new("textures"), "")
            .unwrap();
        let texels = read_texture(&device, &queue, texture.raw().unwrap(), 0, 0).unwrap();
        assert_eq!(texels, vec![128, 128, 128, 255]);
    }

    #[test]
    fn missing_file_names_the_path() {
        let Some((device, queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let err = MaterialSlot::Albedo
            .load(&device, &queue, Path::new("/nonexistent"), "albedo.png")
            .unwrap_err();
        assert!(format!("{err:#}").contains("albedo.png"));
    }
}
