use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::assets::{Image, Pixels};

use super::handle::{GpuHandle, ResourceId};
use super::mipmap::build_mip_chain;

/// Number of faces in a cube texture.
pub const CUBE_FACE_COUNT: u32 = 6;

/// Full mip chain length for a `width`×`height` base level:
/// `1 + floor(log2(max(width, height)))`.
pub fn default_mip_levels(width: u32, height: u32) -> u32 {
    let largest = width.max(height).max(1);
    32 - largest.leading_zeros()
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureKind {
    D2,
    Cube,
}

/// Creation parameters for [`Texture::new`].
#[derive(Debug, Clone)]
pub struct TextureDesc<'a> {
    pub label: &'a str,
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    /// `None` selects [`default_mip_levels`].
    pub levels: Option<u32>,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
    pub samples: u32,
}

impl<'a> TextureDesc<'a> {
    pub fn new(label: &'a str, kind: TextureKind, width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            kind,
            width,
            height,
            levels: None,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            samples: 1,
        }
    }

    pub fn levels(mut self, levels: u32) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn usage(mut self, usage: wgpu::TextureUsages) -> Self {
        self.usage = usage;
        self
    }
}

#[derive(Debug)]
struct TextureInner {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

/// A sampleable 2D or cube texture with storage for its whole mip chain.
#[derive(Debug, Default)]
pub struct Texture {
    id: ResourceId,
    inner: Option<TextureInner>,
    kind: Option<TextureKind>,
    width: u32,
    height: u32,
    levels: u32,
}

impl Texture {
    /// Allocates storage immediately; contents are undefined until written.
    pub fn new(device: &wgpu::Device, desc: &TextureDesc<'_>) -> Self {
        let levels = desc
            .levels
            .unwrap_or_else(|| default_mip_levels(desc.width, desc.height))
            .max(1);
        let layers = match desc.kind {
            TextureKind::D2 => 1,
            TextureKind::Cube => CUBE_FACE_COUNT,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: layers,
            },
            mip_level_count: levels,
            sample_count: desc.samples,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });

        Self::wrap(texture, desc.kind, desc.format)
    }

    /// 1×1 texture holding a single texel (`data` is one texel of `format`).
    pub fn solid_color(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        format: wgpu::TextureFormat,
        data: &[u8],
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        Self::wrap(texture, TextureKind::D2, format)
    }

    /// Uploads an 8-bit image with a full CPU-filtered mip chain.
    ///
    /// Three-channel images are widened to RGBA since wgpu has no 24-bit
    /// formats. `srgb` only applies to three and four channel images.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        image: &Image,
        srgb: bool,
    ) -> Result<Self> {
        let Pixels::Ldr(data) = image.pixels() else {
            anyhow::bail!("texture '{label}' expects an 8-bit image");
        };

        let (data, channels) = match image.channels() {
            3 => (widen_rgb(data), 4usize),
            n => (data.clone(), n as usize),
        };
        let format = ldr_format(channels, srgb)?;

        let chain = build_mip_chain(data, image.width(), image.height(), channels, srgb);
        let desc = TextureDesc::new(label, TextureKind::D2, image.width(), image.height(), format)
            .levels(chain.len() as u32);
        let texture = Self::new(device, &desc);

        for (level, mip) in chain.iter().enumerate() {
            texture.write_level(queue, level as u32, &mip.data)?;
        }

        Ok(texture)
    }

    /// Uploads tightly packed texels for every layer of mip `level`.
    pub fn write_level(&self, queue: &wgpu::Queue, level: u32, data: &[u8]) -> Result<()> {
        let Some(inner) = self.inner.as_ref() else {
            anyhow::bail!("write to a released texture");
        };
        let texel_size = inner
            .format
            .block_copy_size(None)
            .context("texture format has no fixed texel size")?;

        let width = (self.width >> level).max(1);
        let height = (self.height >> level).max(1);
        let layers = inner.texture.depth_or_array_layers();
        let expected = (width * height * layers * texel_size) as usize;
        anyhow::ensure!(
            data.len() == expected,
            "level {level} expects {expected} bytes, got {}",
            data.len()
        );

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &inner.texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * texel_size),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: layers,
            },
        );

        Ok(())
    }

    fn wrap(texture: wgpu::Texture, kind: TextureKind, format: wgpu::TextureFormat) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: None,
            dimension: Some(match kind {
                TextureKind::D2 => wgpu::TextureViewDimension::D2,
                TextureKind::Cube => wgpu::TextureViewDimension::Cube,
            }),
            ..Default::default()
        });

        Self {
            id: ResourceId::next(),
            width: texture.width(),
            height: texture.height(),
            levels: texture.mip_level_count(),
            kind: Some(kind),
            inner: Some(TextureInner {
                texture,
                view,
                format,
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn kind(&self) -> Option<TextureKind> {
        self.kind
    }

    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.inner.as_ref().map(|i| i.format)
    }

    pub fn raw(&self) -> Option<&wgpu::Texture> {
        self.inner.as_ref().map(|i| &i.texture)
    }

    /// Sampling view over every level (cube dimension for cube textures).
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.inner.as_ref().map(|i| &i.view)
    }

    /// Single-level view, usable as a storage binding or as a sampled source
    /// for one level.
    ///
    /// Cube textures are exposed as 6-layer 2D arrays, the only form compute
    /// shaders can write.
    pub fn level_view(&self, level: u32) -> Option<wgpu::TextureView> {
        let inner = self.inner.as_ref()?;
        let dimension = match self.kind? {
            TextureKind::D2 => wgpu::TextureViewDimension::D2,
            TextureKind::Cube => wgpu::TextureViewDimension::D2Array,
        };
        Some(inner.texture.create_view(&wgpu::TextureViewDescriptor {
            label: None,
            dimension: Some(dimension),
            base_mip_level: level,
            mip_level_count: Some(1),
            ..Default::default()
        }))
    }
}

impl GpuHandle for Texture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.texture.destroy();
        }
        self.id = ResourceId::NULL;
    }
}

fn ldr_format(channels: usize, srgb: bool) -> Result<wgpu::TextureFormat> {
    Ok(match (channels, srgb) {
        (1, _) => wgpu::TextureFormat::R8Unorm,
        (2, _) => wgpu::TextureFormat::Rg8Unorm,
        (4, true) => wgpu::TextureFormat::Rgba8UnormSrgb,
        (4, false) => wgpu::TextureFormat::Rgba8Unorm,
        (n, _) => anyhow::bail!("unsupported channel count {n}"),
    })
}

fn widen_rgb(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .flat_map(|t| [t[0], t[1], t[2], 255])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── mip levels ────────────────────────────────────────────────────────

    #[test]
    fn default_levels_for_1024_is_eleven() {
        assert_eq!(default_mip_levels(1024, 1024), 11);
    }

    #[test]
    fn default_levels_use_larger_side() {
        assert_eq!(default_mip_levels(256, 32), 9);
        assert_eq!(default_mip_levels(3, 5), 3);
    }

    #[test]
    fn default_levels_for_single_texel() {
        assert_eq!(default_mip_levels(1, 1), 1);
        assert_eq!(default_mip_levels(0, 0), 1);
    }

    // ── formats ───────────────────────────────────────────────────────────

    #[test]
    fn rgb_is_widened_with_opaque_alpha() {
        assert_eq!(widen_rgb(&[1, 2, 3, 4, 5, 6]), vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn single_channel_ignores_srgb() {
        assert_eq!(ldr_format(1, true).unwrap(), wgpu::TextureFormat::R8Unorm);
        assert!(ldr_format(3, false).is_err());
    }

    // ── handle semantics ──────────────────────────────────────────────────

    #[test]
    fn default_texture_is_unusable() {
        let mut t = Texture::default();
        assert!(!t.is_usable());
        assert!(t.view().is_none());
        t.release();
        t.release();
        assert!(!t.is_usable());
    }
}
