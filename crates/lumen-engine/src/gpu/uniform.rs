use bytemuck::Pod;
use wgpu::util::DeviceExt;

use super::handle::{GpuHandle, ResourceId};

/// GPU-resident mirror of a fixed-layout value.
///
/// Mutate the CPU copy through [`UniformBuffer::value_mut`], then call
/// [`UniformBuffer::bind`] right before the pass that reads it: binding always
/// uploads, so a draw never sees a stale value.
pub struct UniformBuffer<T: Pod> {
    id: ResourceId,
    buffer: Option<wgpu::Buffer>,
    value: T,
}

impl<T: Pod> Default for UniformBuffer<T> {
    fn default() -> Self {
        Self {
            id: ResourceId::NULL,
            buffer: None,
            value: T::zeroed(),
        }
    }
}

impl<T: Pod> UniformBuffer<T> {
    /// Allocates a zero-initialised buffer.
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: Self::size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            id: ResourceId::next(),
            buffer: Some(buffer),
            value: T::zeroed(),
        }
    }

    /// Allocates a buffer whose initial contents are `value`.
    ///
    /// Unlike [`UniformBuffer::bind`], the contents are fixed at creation, so
    /// several of these may be recorded into one submission with distinct
    /// values.
    pub fn with_value(device: &wgpu::Device, label: &str, value: T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            id: ResourceId::next(),
            buffer: Some(buffer),
            value,
        }
    }

    /// Byte size of `T`, which is also the minimum binding size.
    pub fn size() -> u64 {
        std::mem::size_of::<T>() as u64
    }

    pub fn min_binding_size() -> Option<std::num::NonZeroU64> {
        std::num::NonZeroU64::new(Self::size())
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
    }

    /// Uploads the CPU copy. The write lands before the next queue submission.
    pub fn bind(&self, queue: &wgpu::Queue) {
        let Some(buffer) = self.buffer.as_ref() else { return };
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(&self.value));
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    pub fn binding(&self) -> Option<wgpu::BindingResource<'_>> {
        self.buffer.as_ref().map(|b| b.as_entire_binding())
    }
}

impl<T: Pod> GpuHandle for UniformBuffer<T> {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn release(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            buffer.destroy();
        }
        self.id = ResourceId::NULL;
    }
}

/// Layout entry for a uniform block visible to `visibility`.
pub fn uniform_layout_entry<T: Pod>(
    binding: u32,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: UniformBuffer::<T>::min_binding_size(),
        },
        count: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[derive(Debug, Copy, Clone, Pod, Zeroable)]
    #[repr(C)]
    struct Probe {
        a: [f32; 4],
    }

    #[test]
    fn default_is_unusable_and_zeroed() {
        let ub = UniformBuffer::<Probe>::default();
        assert!(!ub.is_usable());
        assert_eq!(ub.value().a, [0.0; 4]);
        assert!(ub.binding().is_none());
    }

    #[test]
    fn value_edits_stay_on_cpu_mirror() {
        let mut ub = UniformBuffer::<Probe>::default();
        ub.value_mut().a[2] = 3.0;
        assert_eq!(ub.value().a, [0.0, 0.0, 3.0, 0.0]);
        ub.set(Probe { a: [1.0; 4] });
        assert_eq!(ub.value().a, [1.0; 4]);
    }

    #[test]
    fn release_twice_is_harmless() {
        let mut ub = UniformBuffer::<Probe>::default();
        ub.release();
        ub.release();
        assert!(!ub.is_usable());
    }

    #[test]
    fn size_matches_layout() {
        assert_eq!(UniformBuffer::<Probe>::size(), 16);
        assert!(UniformBuffer::<Probe>::min_binding_size().is_some());
    }
}
