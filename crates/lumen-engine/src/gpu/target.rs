use super::handle::{GpuHandle, ResourceId};
use super::texture::{Texture, TextureDesc, TextureKind};

/// Which concrete object backs a framebuffer attachment.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TargetKind {
    /// Sampleable after rendering (resolve targets, post-processing inputs).
    Texture,
    /// Render-only storage, typically multisampled.
    Renderbuffer,
}

/// Parameters an attachment keeps for its whole life; only the size changes
/// on resize.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttachmentParams {
    pub kind: TargetKind,
    pub format: wgpu::TextureFormat,
    pub samples: u32,
}

impl AttachmentParams {
    pub fn texture(format: wgpu::TextureFormat) -> Self {
        Self {
            kind: TargetKind::Texture,
            format,
            samples: 1,
        }
    }

    pub fn renderbuffer(format: wgpu::TextureFormat, samples: u32) -> Self {
        Self {
            kind: TargetKind::Renderbuffer,
            format,
            samples,
        }
    }
}

/// Render-attachment-only storage (never sampled).
#[derive(Default)]
pub struct Renderbuffer {
    id: ResourceId,
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
    samples: u32,
}

impl Renderbuffer {
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        samples: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples.max(1),
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            id: ResourceId::next(),
            texture: Some(texture),
            view: Some(view),
            width,
            height,
            samples: samples.max(1),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }
}

impl GpuHandle for Renderbuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        self.view = None;
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
        self.id = ResourceId::NULL;
    }
}

/// Anything a framebuffer can draw into.
pub enum RenderTarget {
    Texture(Texture),
    Renderbuffer(Renderbuffer),
}

impl RenderTarget {
    /// Allocates a `width`×`height` target described by `params`.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        params: AttachmentParams,
        width: u32,
        height: u32,
    ) -> Self {
        match params.kind {
            TargetKind::Texture => {
                let desc = TextureDesc::new(label, TextureKind::D2, width, height, params.format)
                    .levels(1)
                    .usage(
                        wgpu::TextureUsages::RENDER_ATTACHMENT
                            | wgpu::TextureUsages::TEXTURE_BINDING
                            | wgpu::TextureUsages::COPY_SRC,
                    );
                RenderTarget::Texture(Texture::new(device, &desc))
            }
            TargetKind::Renderbuffer => RenderTarget::Renderbuffer(Renderbuffer::new(
                device,
                label,
                width,
                height,
                params.format,
                params.samples,
            )),
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            RenderTarget::Texture(_) => TargetKind::Texture,
            RenderTarget::Renderbuffer(_) => TargetKind::Renderbuffer,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            RenderTarget::Texture(t) => t.width(),
            RenderTarget::Renderbuffer(r) => r.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            RenderTarget::Texture(t) => t.height(),
            RenderTarget::Renderbuffer(r) => r.height(),
        }
    }

    pub fn samples(&self) -> u32 {
        match self {
            RenderTarget::Texture(_) => 1,
            RenderTarget::Renderbuffer(r) => r.samples(),
        }
    }

    /// View bound when this target is attached to a render pass.
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        match self {
            RenderTarget::Texture(t) => t.view(),
            RenderTarget::Renderbuffer(r) => r.view(),
        }
    }

    pub fn as_texture(&self) -> Option<&Texture> {
        match self {
            RenderTarget::Texture(t) => Some(t),
            RenderTarget::Renderbuffer(_) => None,
        }
    }
}

impl GpuHandle for RenderTarget {
    fn id(&self) -> ResourceId {
        match self {
            RenderTarget::Texture(t) => t.id(),
            RenderTarget::Renderbuffer(r) => r.id(),
        }
    }

    fn release(&mut self) {
        match self {
            RenderTarget::Texture(t) => t.release(),
            RenderTarget::Renderbuffer(r) => r.release(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderbuffer_default_is_unusable() {
        let mut rb = Renderbuffer::default();
        assert!(!rb.is_usable());
        rb.release();
        rb.release();
        assert!(!rb.is_usable());
        assert!(rb.view().is_none());
    }

    #[test]
    fn target_dispatches_to_variant() {
        let target = RenderTarget::Renderbuffer(Renderbuffer::default());
        assert_eq!(target.kind(), TargetKind::Renderbuffer);
        assert!(target.as_texture().is_none());
        assert!(!target.is_usable());

        let target = RenderTarget::Texture(Texture::default());
        assert_eq!(target.kind(), TargetKind::Texture);
        assert!(target.as_texture().is_some());
        assert_eq!(target.samples(), 1);
    }

    #[test]
    fn params_constructors() {
        let p = AttachmentParams::renderbuffer(wgpu::TextureFormat::Depth32Float, 8);
        assert_eq!(p.kind, TargetKind::Renderbuffer);
        assert_eq!(p.samples, 8);
        assert_eq!(AttachmentParams::texture(wgpu::TextureFormat::R16Float).samples, 1);
    }
}
