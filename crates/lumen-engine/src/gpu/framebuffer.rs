use std::collections::BTreeMap;

use anyhow::{Context, Result};

use super::handle::{GpuHandle, ResourceId};
use super::target::{AttachmentParams, RenderTarget, TargetKind};
use super::texture::Texture;

/// Named slot of a framebuffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum AttachmentPoint {
    Color(u32),
    Depth,
}

struct Attachment {
    params: AttachmentParams,
    target: RenderTarget,
}

/// A set of render targets drawn together.
///
/// The framebuffer owns its targets. Other code observes them through
/// [`Framebuffer::target`] and [`Framebuffer::texture`] and keys any derived
/// state (bind groups) on the target's [`ResourceId`].
#[derive(Default)]
pub struct Framebuffer {
    id: ResourceId,
    label: String,
    attachments: BTreeMap<AttachmentPoint, Attachment>,
}

impl Framebuffer {
    /// Creates an empty framebuffer.
    pub fn new(label: &str) -> Self {
        Self {
            id: ResourceId::next(),
            label: label.to_string(),
            attachments: BTreeMap::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Allocates a `width`×`height` target at `point`, replacing (and
    /// releasing) any previous attachment there. `params` stay fixed for
    /// later resizes.
    pub fn attach(
        &mut self,
        device: &wgpu::Device,
        point: AttachmentPoint,
        params: AttachmentParams,
        width: u32,
        height: u32,
    ) {
        let target = RenderTarget::new(device, &self.target_label(point), params, width, height);
        log::debug!(
            "{}: attached {:?} {:?} {:?}x{} at {width}x{height} ({})",
            self.label,
            point,
            params.kind,
            params.format,
            params.samples,
            target.id()
        );
        self.attachments.insert(point, Attachment { params, target });
    }

    /// Resizes every attachment whose size differs from `width`×`height`.
    ///
    /// Unchanged attachments keep their object identity. Returns the number
    /// of attachments that were reallocated. A zero-sized request is ignored.
    pub fn resize_all(&mut self, device: &wgpu::Device, width: u32, height: u32) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }

        let stale: Vec<AttachmentPoint> = self
            .attachments
            .iter()
            .filter(|(_, a)| needs_realloc(&a.target, width, height))
            .map(|(point, _)| *point)
            .collect();

        for point in &stale {
            let label = self.target_label(*point);
            if let Some(attachment) = self.attachments.get_mut(point) {
                attachment.target.release();
                attachment.target = RenderTarget::new(device, &label, attachment.params, width, height);
            }
        }

        if !stale.is_empty() {
            log::debug!(
                "{}: reallocated {} attachment(s) at {width}x{height}",
                self.label,
                stale.len()
            );
        }

        stale.len()
    }

    pub fn target(&self, point: AttachmentPoint) -> Option<&RenderTarget> {
        self.attachments.get(&point).map(|a| &a.target)
    }

    pub fn params(&self, point: AttachmentPoint) -> Option<AttachmentParams> {
        self.attachments.get(&point).map(|a| a.params)
    }

    /// The sampleable texture at `point`.
    pub fn texture(&self, point: AttachmentPoint) -> Result<&Texture> {
        let target = self
            .target(point)
            .with_context(|| format!("{}: nothing attached at {point:?}", self.label))?;
        target
            .as_texture()
            .with_context(|| format!("{}: attachment {point:?} is not a texture", self.label))
    }

    /// Size shared by the attachments (taken from the first one).
    pub fn size(&self) -> Option<(u32, u32)> {
        self.attachments
            .values()
            .next()
            .map(|a| (a.target.width(), a.target.height()))
    }

    pub fn samples(&self) -> u32 {
        self.attachments
            .values()
            .next()
            .map_or(1, |a| a.params.samples)
    }

    /// Colour attachment formats in attachment order.
    pub fn color_formats(&self) -> Vec<wgpu::TextureFormat> {
        self.attachments
            .iter()
            .filter(|(p, _)| matches!(p, AttachmentPoint::Color(_)))
            .map(|(_, a)| a.params.format)
            .collect()
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.params(AttachmentPoint::Depth).map(|p| p.format)
    }

    /// Colour views in attachment order.
    pub fn color_views(&self) -> Vec<&wgpu::TextureView> {
        self.attachments
            .iter()
            .filter(|(p, _)| matches!(p, AttachmentPoint::Color(_)))
            .filter_map(|(_, a)| a.target.view())
            .collect()
    }

    pub fn depth_view(&self) -> Option<&wgpu::TextureView> {
        self.target(AttachmentPoint::Depth).and_then(|t| t.view())
    }

    /// Verifies the attachment set can be rendered into as a whole.
    pub fn check_complete(&self) -> Result<()> {
        anyhow::ensure!(!self.attachments.is_empty(), "{}: no attachments", self.label);

        let Some((width, height)) = self.size() else {
            anyhow::bail!("{}: no attachments", self.label);
        };
        let samples = self.samples();

        let mut next_color = 0;
        for (point, attachment) in &self.attachments {
            anyhow::ensure!(
                attachment.target.is_usable(),
                "{}: attachment {point:?} is not allocated",
                self.label
            );
            anyhow::ensure!(
                attachment.target.width() == width && attachment.target.height() == height,
                "{}: attachment {point:?} is {}x{}, expected {width}x{height}",
                self.label,
                attachment.target.width(),
                attachment.target.height()
            );
            anyhow::ensure!(
                attachment.params.samples == samples,
                "{}: attachment {point:?} has {} samples, expected {samples}",
                self.label,
                attachment.params.samples
            );
            anyhow::ensure!(
                !(attachment.params.kind == TargetKind::Texture && attachment.params.samples > 1),
                "{}: texture attachment {point:?} cannot be multisampled",
                self.label
            );

            let is_depth = attachment.params.format.has_depth_aspect();
            match point {
                AttachmentPoint::Color(index) => {
                    anyhow::ensure!(
                        *index == next_color,
                        "{}: colour attachments must be contiguous, found {index} after {}",
                        self.label,
                        next_color
                    );
                    anyhow::ensure!(!is_depth, "{}: depth format on {point:?}", self.label);
                    next_color += 1;
                }
                AttachmentPoint::Depth => {
                    anyhow::ensure!(is_depth, "{}: colour format on depth attachment", self.label);
                }
            }
        }

        Ok(())
    }

    /// Resolves the multisampled colour attachments at `points` into the
    /// matching single-sample textures of `dst`.
    ///
    /// The multisampled contents are discarded afterwards; they must not be
    /// read again this frame.
    pub fn resolve_into(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        dst: &Framebuffer,
        points: &[AttachmentPoint],
    ) -> Result<()> {
        let mut attachments = Vec::with_capacity(points.len());

        for point in points {
            let src = self
                .attachments
                .get(point)
                .with_context(|| format!("{}: nothing attached at {point:?}", self.label))?;
            let dst_attachment = dst
                .attachments
                .get(point)
                .with_context(|| format!("{}: nothing attached at {point:?}", dst.label))?;

            anyhow::ensure!(
                matches!(point, AttachmentPoint::Color(_)),
                "only colour attachments can be resolved"
            );
            anyhow::ensure!(
                src.params.samples > 1 && dst_attachment.params.samples == 1,
                "{point:?}: resolve needs a multisampled source and single-sample destination"
            );
            anyhow::ensure!(
                src.params.format == dst_attachment.params.format,
                "{point:?}: resolve format mismatch ({:?} -> {:?})",
                src.params.format,
                dst_attachment.params.format
            );

            let view = src.target.view().context("resolve source not allocated")?;
            let resolve = dst_attachment
                .target
                .view()
                .context("resolve destination not allocated")?;

            attachments.push(Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: Some(resolve),
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Discard,
                },
                depth_slice: None,
            }));
        }

        let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen resolve pass"),
            color_attachments: &attachments,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        Ok(())
    }

    fn target_label(&self, point: AttachmentPoint) -> String {
        format!("{} {point:?}", self.label)
    }
}

impl GpuHandle for Framebuffer {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        for attachment in self.attachments.values_mut() {
            attachment.target.release();
        }
        self.attachments.clear();
        self.id = ResourceId::NULL;
    }
}

fn needs_realloc(target: &RenderTarget, width: u32, height: u32) -> bool {
    !target.is_usable() || target.width() != width || target.height() != height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;
    use crate::gpu::target::Renderbuffer;

    const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
    const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn target_id(fb: &Framebuffer, point: AttachmentPoint) -> ResourceId {
        fb.target(point).map(|t| t.id()).unwrap_or_default()
    }

    // ── pure checks ───────────────────────────────────────────────────────

    #[test]
    fn released_target_always_needs_realloc() {
        let target = RenderTarget::Renderbuffer(Renderbuffer::default());
        assert!(needs_realloc(&target, 1, 1));
    }

    #[test]
    fn empty_framebuffer_is_incomplete() {
        assert!(Framebuffer::new("empty").check_complete().is_err());
    }

    #[test]
    fn release_is_idempotent() {
        let mut fb = Framebuffer::new("fb");
        assert!(fb.is_usable());
        fb.release();
        fb.release();
        assert!(!fb.is_usable());
        assert!(!Framebuffer::default().is_usable());
    }

    #[test]
    fn moving_out_leaves_unusable_source() {
        let mut fb = Framebuffer::new("fb");
        let moved = std::mem::take(&mut fb);
        assert!(moved.is_usable());
        assert!(!fb.is_usable());
    }

    // ── GPU-backed ────────────────────────────────────────────────────────

    #[test]
    fn resize_to_same_size_keeps_attachments() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let mut fb = Framebuffer::new("test fb");
        fb.attach(&device, AttachmentPoint::Color(0), AttachmentParams::renderbuffer(COLOR, 1), 64, 32);
        fb.attach(&device, AttachmentPoint::Depth, AttachmentParams::renderbuffer(DEPTH, 1), 64, 32);
        let color = target_id(&fb, AttachmentPoint::Color(0));
        let depth = target_id(&fb, AttachmentPoint::Depth);

        assert_eq!(fb.resize_all(&device, 64, 32), 0);
        assert_eq!(target_id(&fb, AttachmentPoint::Color(0)), color);
        assert_eq!(target_id(&fb, AttachmentPoint::Depth), depth);
        assert!(fb.check_complete().is_ok());
    }

    #[test]
    fn resize_to_new_size_reallocates_with_same_params() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let mut fb = Framebuffer::new("test fb");
        let params = AttachmentParams::texture(COLOR);
        fb.attach(&device, AttachmentPoint::Color(0), params, 64, 32);
        let before = target_id(&fb, AttachmentPoint::Color(0));

        assert_eq!(fb.resize_all(&device, 128, 64), 1);
        let after = target_id(&fb, AttachmentPoint::Color(0));
        assert_ne!(before, after);
        assert_eq!(fb.size(), Some((128, 64)));
        assert_eq!(fb.params(AttachmentPoint::Color(0)), Some(params));
        assert!(fb.texture(AttachmentPoint::Color(0)).is_ok());
    }

    #[test]
    fn zero_size_resize_is_ignored() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let mut fb = Framebuffer::new("test fb");
        fb.attach(&device, AttachmentPoint::Color(0), AttachmentParams::texture(COLOR), 16, 16);
        assert_eq!(fb.resize_all(&device, 0, 16), 0);
        assert_eq!(fb.size(), Some((16, 16)));
    }

    #[test]
    fn gap_in_colour_points_is_incomplete() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let mut fb = Framebuffer::new("test fb");
        fb.attach(&device, AttachmentPoint::Color(1), AttachmentParams::texture(COLOR), 8, 8);
        assert!(fb.check_complete().is_err());
    }

    #[test]
    fn renderbuffer_is_not_a_texture() {
        let Some((device, _queue)) = headless() else {
            eprintln!("No GPU adapter available, skipping test");
            return;
        };

        let mut fb = Framebuffer::new("test fb");
        fb.attach(&device, AttachmentPoint::Depth, AttachmentParams::renderbuffer(DEPTH, 1), 8, 8);
        assert!(fb.texture(AttachmentPoint::Depth).is_err());
    }
}
