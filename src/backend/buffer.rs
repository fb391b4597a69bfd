// Vertex buffers backed by gpu-allocator
//
// Shapes are small and change rarely, so each one lives in its own
// host-visible buffer written straight through the mapped pointer.

use super::VulkanDevice;
use anyhow::{Context, Result};
use ash::vk;
use glam::Vec2;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::Arc;

pub struct VertexBuffer {
    pub buffer: vk::Buffer,
    pub vertex_count: u32,
    allocation: Option<Allocation>,
    device: Arc<VulkanDevice>,
}

impl VertexBuffer {
    /// Create a buffer and fill it with `vertices`
    pub fn new(device: Arc<VulkanDevice>, name: &str, vertices: &[Vec2]) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if bytes.is_empty() {
            anyhow::bail!("Vertex buffer '{}' would be empty", name);
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(bytes.len() as vk::DeviceSize)
            .usage(vk::BufferUsageFlags::VERTEX_BUFFER)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .device
                .create_buffer(&buffer_info, None)
                .context("Failed to create buffer")?
        };

        // Any failure below is cleaned up by Drop
        let mut this = Self {
            buffer,
            vertex_count: vertices.len() as u32,
            allocation: None,
            device,
        };

        let requirements = unsafe { this.device.device.get_buffer_memory_requirements(buffer) };

        let allocation = this
            .device
            .allocator
            .lock()
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location: MemoryLocation::CpuToGpu,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })
            .with_context(|| format!("Failed to allocate memory for '{}'", name))?;
        let allocation = this.allocation.insert(allocation);

        let mapped = allocation
            .mapped_slice_mut()
            .context("Vertex buffer memory is not host visible")?;
        mapped[..bytes.len()].copy_from_slice(bytes);

        unsafe {
            this.device
                .device
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
                .context("Failed to bind buffer memory")?;
        }

        Ok(this)
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            if let Err(e) = self.device.allocator.lock().free(allocation) {
                log::warn!("Failed to free vertex buffer memory: {}", e);
            }
        }
        unsafe { self.device.device.destroy_buffer(self.buffer, None) };
    }
}
