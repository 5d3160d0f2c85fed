use anyhow::{Context, Result};

/// Copies one level/layer of `texture` back to the CPU, rows tightly packed.
///
/// Blocks until the GPU has finished all submitted work.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level: u32,
    layer: u32,
) -> Result<Vec<u8>> {
    let format = texture.format();
    let bytes_per_texel = format
        .block_copy_size(None)
        .context("texture format cannot be copied")?;

    let width = (texture.width() >> mip_level).max(1);
    let height = (texture.height() >> mip_level).max(1);
    let tight_bpr = width * bytes_per_texel;
    let padded_bpr = align_to(tight_bpr, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lumen readback"),
        size: u64::from(padded_bpr) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("lumen readback encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_bpr),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device
        .poll(wgpu::PollType::Wait {
            submission_index: None,
            timeout: None,
        })
        .context("device poll failed during readback")?;
    rx.recv()
        .context("readback callback dropped")?
        .context("failed to map readback buffer")?;

    let mapped = slice.get_mapped_range();
    let data = strip_row_padding(&mapped, tight_bpr as usize, padded_bpr as usize, height as usize);
    drop(mapped);
    staging.unmap();

    Ok(data)
}

pub(crate) fn align_to(value: u32, alignment: u32) -> u32 {
    value.div_ceil(alignment) * alignment
}

fn strip_row_padding(padded: &[u8], tight_bpr: usize, padded_bpr: usize, rows: usize) -> Vec<u8> {
    if tight_bpr == padded_bpr {
        return padded[..tight_bpr * rows].to_vec();
    }
    let mut out = Vec::with_capacity(tight_bpr * rows);
    for row in 0..rows {
        let start = row * padded_bpr;
        out.extend_from_slice(&padded[start..start + tight_bpr]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_copy_alignment() {
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }

    #[test]
    fn padding_is_removed_per_row() {
        let padded = [1, 2, 0, 0, 3, 4, 0, 0];
        assert_eq!(strip_row_padding(&padded, 2, 4, 2), vec![1, 2, 3, 4]);
    }
}
