use std::sync::Arc;

/// Owns (or aliases) a region of GPU memory. Mirrors the device-buffer
/// abstraction every stage is built against: allocate once at construction,
/// release at destruction, never resize per frame.
///
/// Copy is disallowed (the underlying `wgpu::Buffer` isn't `Clone`); cloning
/// a `DeviceBuffer` produces a non-owning view over the same bytes, which is
/// how `sub_buffer` and aggregated-cost-volume partitioning work.
#[derive(Clone)]
pub struct DeviceBuffer {
    buffer: Arc<wgpu::Buffer>,
    offset: u64,
    size: u64,
    owns: bool,
}

impl DeviceBuffer {
    pub fn allocate(device: &wgpu::Device, label: &str, size_bytes: u64, usage: wgpu::BufferUsages) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size_bytes.max(4),
            usage,
            mapped_at_creation: false,
        });

        DeviceBuffer {
            buffer: Arc::new(buffer),
            offset: 0,
            size: size_bytes,
            owns: true,
        }
    }

    /// Produces a non-owning view over `[offset, offset + length)` bytes of
    /// this buffer. Used to partition the aggregated cost volume into
    /// disjoint per-direction sub-buffers without extra allocation.
    pub fn sub_buffer(&self, offset: u64, length: u64) -> DeviceBuffer {
        assert!(offset + length <= self.size, "sub_buffer out of range");
        DeviceBuffer {
            buffer: Arc::clone(&self.buffer),
            offset: self.offset + offset,
            size: length,
            owns: false,
        }
    }

    pub fn fill_zero(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.clear_buffer(&self.buffer, self.offset, Some(self.size));
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn owns_data(&self) -> bool {
        self.owns
    }

    pub fn raw_handle(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn binding(&self) -> wgpu::BufferBinding<'_> {
        wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: self.offset,
            size: std::num::NonZeroU64::new(self.size),
        }
    }

    pub fn as_entire_binding(&self) -> wgpu::BindingResource<'_> {
        wgpu::BindingResource::Buffer(self.binding())
    }

    /// Allocates a uniform buffer sized and initialized from `data`. Used
    /// for the small per-stage parameter blocks (`Dimensions`, `PathParams`,
    /// ...); these are written once at construction and re-written whenever
    /// `execute` runs against a new image size.
    pub fn uniform<T: bytemuck::Pod>(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, data: &T) -> Self {
        let bytes = bytemuck::bytes_of(data);
        let buffer = Self::allocate(
            device,
            label,
            bytes.len() as u64,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        );
        queue.write_buffer(&buffer.buffer, 0, bytes);
        buffer
    }

    pub fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, data: &T) {
        queue.write_buffer(&self.buffer, self.offset, bytemuck::bytes_of(data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::DeviceContext;
    use crate::core::params::DeviceOptions;

    #[test]
    fn test_sub_buffer_partitions_are_disjoint_and_in_range() {
        let ctx = DeviceContext::new(DeviceOptions::default()).unwrap();
        let parent = DeviceBuffer::allocate(
            &ctx.device,
            "parent",
            4 * 256,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );

        let a = parent.sub_buffer(0, 256);
        let b = parent.sub_buffer(256, 256);

        assert_eq!(a.size(), 256);
        assert_eq!(b.size(), 256);
        assert!(!a.owns_data());
        assert!(!b.owns_data());
        assert!(parent.owns_data());
    }

    #[test]
    #[should_panic(expected = "sub_buffer out of range")]
    fn test_sub_buffer_out_of_range_panics() {
        let ctx = DeviceContext::new(DeviceOptions::default()).unwrap();
        let parent = DeviceBuffer::allocate(
            &ctx.device,
            "parent",
            64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        let _ = parent.sub_buffer(32, 64);
    }
}
