// Synchronization primitives
//
// One set per frame in flight: the acquire waits on image_available, the
// present waits on render_finished and the CPU waits on in_flight_fence
// before reusing the slot.

use super::VulkanDevice;
use anyhow::{Context, Result};
use ash::vk;

/// Frame synchronization - one per frame in flight
pub struct FrameSync {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
    pub in_flight_fence: vk::Fence,
}

impl FrameSync {
    pub fn new(device: &VulkanDevice) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        // Start signaled so the first wait on this slot returns immediately
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        unsafe {
            Ok(Self {
                image_available: device
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .context("Failed to create semaphore")?,
                render_finished: device
                    .device
                    .create_semaphore(&semaphore_info, None)
                    .context("Failed to create semaphore")?,
                in_flight_fence: device
                    .device
                    .create_fence(&fence_info, None)
                    .context("Failed to create fence")?,
            })
        }
    }

    pub fn create_all(device: &VulkanDevice, count: usize) -> Result<Vec<Self>> {
        (0..count).map(|_| Self::new(device)).collect()
    }

    /// Swaps the in-flight fence for a new signaled one. Used when a reset
    /// fence will not be signaled because its submission failed.
    pub fn replace_fence(&mut self, device: &ash::Device) -> Result<vk::Fence> {
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);
        let fence = unsafe { device.create_fence(&fence_info, None) }
            .context("Failed to create fence")?;
        let old = std::mem::replace(&mut self.in_flight_fence, fence);
        unsafe { device.destroy_fence(old, None) };
        Ok(old)
    }

    pub fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
            device.destroy_fence(self.in_flight_fence, None);
        }
    }
}
