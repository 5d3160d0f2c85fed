//! CPU mip chain generation for 8-bit material textures.
//!
//! Each level is a 2×2 box filter of the previous one. Odd edges clamp, so a
//! 3×3 level reduces to 1×1 from its top-left 2×2 block plus the clamped edge
//! samples. sRGB data is filtered in linear space; alpha is always linear.

/// One level of a mip chain, tightly packed.
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// Builds the full chain down to 1×1, level 0 included.
pub fn build_mip_chain(
    base: Vec<u8>,
    width: u32,
    height: u32,
    channels: usize,
    srgb: bool,
) -> Vec<MipLevel> {
    let mut levels = vec![MipLevel { width, height, data: base }];

    loop {
        let prev = &levels[levels.len() - 1];
        if prev.width <= 1 && prev.height <= 1 {
            break;
        }
        let next = downsample(prev, channels, srgb);
        levels.push(next);
    }

    levels
}

fn downsample(src: &MipLevel, channels: usize, srgb: bool) -> MipLevel {
    let w = (src.width / 2).max(1);
    let h = (src.height / 2).max(1);
    let mut data = vec![0u8; w as usize * h as usize * channels];

    let fetch = |x: u32, y: u32, c: usize| -> f32 {
        let x = x.min(src.width - 1) as usize;
        let y = y.min(src.height - 1) as usize;
        let v = src.data[(y * src.width as usize + x) * channels + c] as f32 / 255.0;
        if srgb && is_color_channel(c, channels) {
            srgb_to_linear(v)
        } else {
            v
        }
    };

    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                let sum = fetch(2 * x, 2 * y, c)
                    + fetch(2 * x + 1, 2 * y, c)
                    + fetch(2 * x, 2 * y + 1, c)
                    + fetch(2 * x + 1, 2 * y + 1, c);
                let mut v = sum * 0.25;
                if srgb && is_color_channel(c, channels) {
                    v = linear_to_srgb(v);
                }
                data[(y as usize * w as usize + x as usize) * channels + c] =
                    (v * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    MipLevel { width: w, height: h, data }
}

fn is_color_channel(c: usize, channels: usize) -> bool {
    !(channels == 4 && c == 3)
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}
