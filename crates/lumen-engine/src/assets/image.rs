use std::path::Path;

use anyhow::{Context, Result};

/// Decoded texel storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// 8-bit channels.
    Ldr(Vec<u8>),
    /// 32-bit float channels (Radiance HDR and other float sources).
    Hdr(Vec<f32>),
}

/// A decoded image with interleaved channels, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    width: u32,
    height: u32,
    channels: u32,
    pixels: Pixels,
}

impl Image {
    /// Decodes `path`, converting to `channels` (1..=4). `0` keeps the file's
    /// native channel count.
    ///
    /// HDR sources stay floating point; everything else decodes to 8 bits.
    pub fn from_file(path: impl AsRef<Path>, channels: u32) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading image: {}", path.display());

        let decoded = image::open(path)
            .with_context(|| format!("failed to load image file: {}", path.display()))?;

        Ok(Self::from_dynamic(decoded, channels))
    }

    fn from_dynamic(decoded: image::DynamicImage, channels: u32) -> Self {
        let (width, height) = (decoded.width(), decoded.height());
        let hdr = matches!(
            decoded,
            image::DynamicImage::ImageRgb32F(_) | image::DynamicImage::ImageRgba32F(_)
        );

        let channels = match channels {
            0 => u32::from(decoded.color().channel_count()).clamp(1, 4),
            n => n.clamp(1, 4),
        };

        let pixels = if hdr {
            let rgba = decoded.to_rgba32f().into_raw();
            Pixels::Hdr(select_channels(&rgba, channels as usize))
        } else {
            let raw = match channels {
                1 => decoded.to_luma8().into_raw(),
                2 => decoded.to_luma_alpha8().into_raw(),
                3 => decoded.to_rgb8().into_raw(),
                _ => decoded.to_rgba8().into_raw(),
            };
            Pixels::Ldr(raw)
        };

        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// Builds an 8-bit image from raw interleaved texels.
    pub fn from_ldr(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Result<Self> {
        anyhow::ensure!((1..=4).contains(&channels), "unsupported channel count {channels}");
        anyhow::ensure!(
            data.len() == (width * height * channels) as usize,
            "pixel data size mismatch: {} bytes for {width}x{height}x{channels}",
            data.len()
        );
        Ok(Self {
            width,
            height,
            channels,
            pixels: Pixels::Ldr(data),
        })
    }

    /// Builds a float image from raw interleaved texels.
    pub fn from_hdr(width: u32, height: u32, channels: u32, data: Vec<f32>) -> Result<Self> {
        anyhow::ensure!((1..=4).contains(&channels), "unsupported channel count {channels}");
        anyhow::ensure!(
            data.len() == (width * height * channels) as usize,
            "pixel data size mismatch: {} floats for {width}x{height}x{channels}",
            data.len()
        );
        Ok(Self {
            width,
            height,
            channels,
            pixels: Pixels::Hdr(data),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn is_hdr(&self) -> bool {
        matches!(self.pixels, Pixels::Hdr(_))
    }

    pub fn pixels(&self) -> &Pixels {
        &self.pixels
    }
}

/// Takes the first `channels` components of every RGBA texel.
fn select_channels(rgba: &[f32], channels: usize) -> Vec<f32> {
    if channels == 4 {
        return rgba.to_vec();
    }
    rgba.chunks_exact(4)
        .flat_map(|texel| texel[..channels].iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let err = Image::from_file("/nonexistent/lumen/env.hdr", 3).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load image file: /nonexistent/lumen/env.hdr"));
    }

    #[test]
    fn ldr_size_mismatch_is_rejected() {
        assert!(Image::from_ldr(2, 2, 4, vec![0; 15]).is_err());
        assert!(Image::from_ldr(2, 2, 4, vec![0; 16]).is_ok());
    }

    #[test]
    fn float_dynamic_image_is_hdr() {
        let buf = image::Rgb32FImage::from_raw(1, 1, vec![2.0, 3.0, 4.0]).unwrap();
        let img = Image::from_dynamic(image::DynamicImage::ImageRgb32F(buf), 3);
        assert!(img.is_hdr());
        assert_eq!(img.pixels(), &Pixels::Hdr(vec![2.0, 3.0, 4.0]));
    }

    #[test]
    fn forced_channel_count_converts_ldr() {
        let buf = image::RgbImage::from_raw(1, 1, vec![10, 20, 30]).unwrap();
        let img = Image::from_dynamic(image::DynamicImage::ImageRgb8(buf), 4);
        assert!(!img.is_hdr());
        assert_eq!(img.channels(), 4);
        assert_eq!(img.pixels(), &Pixels::Ldr(vec![10, 20, 30, 255]));
    }

    #[test]
    fn native_channel_count_is_kept() {
        let buf = image::GrayImage::from_raw(2, 1, vec![7, 9]).unwrap();
        let img = Image::from_dynamic(image::DynamicImage::ImageLuma8(buf), 0);
        assert_eq!(img.channels(), 1);
        assert_eq!(img.pixels(), &Pixels::Ldr(vec![7, 9]));
    }
}
