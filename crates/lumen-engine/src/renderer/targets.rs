use anyhow::Result;

use crate::gpu::{AttachmentParams, AttachmentPoint, Framebuffer, GpuHandle};

/// Lit opaque colour.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Premultiplied colour and alpha summed over transparent fragments.
pub const ACCUM_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Summed transparent alpha, used as the blend weight.
pub const COVERAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub const SCENE_FORMATS: [wgpu::TextureFormat; 3] = [COLOR_FORMAT, ACCUM_FORMAT, COVERAGE_FORMAT];

pub const SCENE_COLORS: [AttachmentPoint; 3] = [
    AttachmentPoint::Color(0),
    AttachmentPoint::Color(1),
    AttachmentPoint::Color(2),
];

/// The off-screen targets the scene is drawn into.
///
/// With more than one sample the scene goes into multisampled renderbuffers
/// and is resolved into single-sample textures for tone mapping. With one
/// sample there is nothing to resolve: the scene is drawn straight into the
/// textures, and a single-sample depth buffer is attached next to them.
#[derive(Default)]
pub struct FrameTargets {
    msaa: Option<Framebuffer>,
    resolve: Framebuffer,
}

impl FrameTargets {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, samples: u32) -> Result<Self> {
        let (width, height) = (width.max(1), height.max(1));

        let mut resolve = Framebuffer::new("lumen resolve framebuffer");
        for (point, format) in SCENE_COLORS.into_iter().zip(SCENE_FORMATS) {
            resolve.attach(device, point, AttachmentParams::texture(format), width, height);
        }

        let msaa = if samples > 1 {
            let mut msaa = Framebuffer::new("lumen msaa framebuffer");
            for (point, format) in SCENE_COLORS.into_iter().zip(SCENE_FORMATS) {
                msaa.attach(device, point, AttachmentParams::renderbuffer(format, samples), width, height);
            }
            msaa.attach(
                device,
                AttachmentPoint::Depth,
                AttachmentParams::renderbuffer(DEPTH_FORMAT, samples),
                width,
                height,
            );
            msaa.check_complete()?;
            Some(msaa)
        } else {
            resolve.attach(
                device,
                AttachmentPoint::Depth,
                AttachmentParams::renderbuffer(DEPTH_FORMAT, 1),
                width,
                height,
            );
            None
        };
        resolve.check_complete()?;

        Ok(Self { msaa, resolve })
    }

    /// Framebuffer the scene passes render into.
    pub fn draw(&self) -> &Framebuffer {
        self.msaa.as_ref().unwrap_or(&self.resolve)
    }

    /// Single-sample textures read by tone mapping.
    pub fn resolved(&self) -> &Framebuffer {
        &self.resolve
    }

    pub fn samples(&self) -> u32 {
        self.draw().samples()
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.resolve.size()
    }

    /// Matches every attachment to the new size. Returns how many were
    /// reallocated; zero when the size is unchanged or degenerate.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> Result<usize> {
        let mut count = self.resolve.resize_all(device, width, height);
        if let Some(msaa) = self.msaa.as_mut() {
            count += msaa.resize_all(device, width, height);
            msaa.check_complete()?;
        }
        self.resolve.check_complete()?;
        Ok(count)
    }

    /// Resolves the multisampled scene into [`FrameTargets::resolved`]. The
    /// multisampled contents are discarded afterwards.
    pub fn resolve(&self, encoder: &mut wgpu::CommandEncoder) -> Result<()> {
        match self.msaa.as_ref() {
            Some(msaa) => msaa.resolve_into(encoder, &self.resolve, &SCENE_COLORS),
            None => Ok(()),
        }
    }

    pub fn release(&mut self) {
        if let Some(msaa) = self.msaa.as_mut() {
            msaa.release();
        }
        self.msaa = None;
        self.resolve.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;

    fn ids(fb: &Framebuffer) -> Vec<crate::gpu::ResourceId> {
        SCENE_COLORS
            .iter()
            .filter_map(|p| fb.target(*p).map(|t| t.id()))
            .collect()
    }

    #[test]
    fn single_sample_draws_into_resolve_textures() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let targets = FrameTargets::new(&device, 32, 16, 1).unwrap();
        assert_eq!(targets.samples(), 1);
        assert_eq!(ids(targets.draw()), ids(targets.resolved()));
        assert!(targets.draw().depth_view().is_some());
        assert_eq!(targets.draw().color_formats(), SCENE_FORMATS.to_vec());
    }

    #[test]
    fn multisampled_targets_resolve_into_textures() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let targets = FrameTargets::new(&device, 32, 16, 4).unwrap();
        assert_eq!(targets.samples(), 4);
        assert_eq!(targets.resolved().samples(), 1);
        assert!(targets.resolved().depth_view().is_none());
        for point in SCENE_COLORS {
            assert!(targets.resolved().texture(point).is_ok());
        }

        let mut encoder = device.create_command_encoder(&Default::default());
        targets.resolve(&mut encoder).unwrap();
    }

    #[test]
    fn resize_counts_reallocations() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let mut targets = FrameTargets::new(&device, 32, 16, 4).unwrap();
        assert_eq!(targets.resize(&device, 32, 16).unwrap(), 0);
        // 3 resolve textures + 3 colour renderbuffers + depth.
        assert_eq!(targets.resize(&device, 64, 64).unwrap(), 7);
        assert_eq!(targets.size(), Some((64, 64)));

        targets.release();
        assert!(targets.size().is_none());
    }
}
