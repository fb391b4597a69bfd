// Swapchain - Window presentation
//
// Owns the chain of images we render to and present, their views, the render
// pass drawing into them and one framebuffer per image. Rebuilt whenever the
// window size changes.

use super::pipeline::{create_framebuffers, create_render_pass};
use super::VulkanDevice;
use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;

pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub swapchain_loader: ash::khr::swapchain::Device,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub render_pass: vk::RenderPass,
    pub framebuffers: Vec<vk::Framebuffer>,
    device: Arc<VulkanDevice>,
}

/// Prefer 8-bit BGRA sRGB, else whatever the surface lists first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            f.format == vk::Format::B8G8R8A8_SRGB
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// The configured mode when supported. FIFO is always available.
pub fn choose_present_mode(
    available: &[vk::PresentModeKHR],
    preferred: vk::PresentModeKHR,
) -> vk::PresentModeKHR {
    if available.contains(&preferred) {
        preferred
    } else {
        vk::PresentModeKHR::FIFO
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if caps.current_extent.width != u32::MAX {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: height.clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum so we never wait on the driver, capped when
/// the surface has a maximum (0 means unlimited).
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = caps.min_image_count + 1;
    if caps.max_image_count > 0 && count > caps.max_image_count {
        caps.max_image_count
    } else {
        count
    }
}

impl Swapchain {
    /// Create a swapchain for the device's surface. Passing the previous
    /// swapchain lets the driver hand over resources; its format must not change.
    pub fn new(
        device: Arc<VulkanDevice>,
        preferred_present_mode: vk::PresentModeKHR,
        width: u32,
        height: u32,
        old: Option<&Swapchain>,
    ) -> Result<Self> {
        let surface = device.surface;
        let loader = &device.surface_loader;

        // Query surface capabilities
        let surface_caps = unsafe {
            loader.get_physical_device_surface_capabilities(device.physical_device, surface)
        }?;
        let formats =
            unsafe { loader.get_physical_device_surface_formats(device.physical_device, surface) }?;
        let present_modes = unsafe {
            loader.get_physical_device_surface_present_modes(device.physical_device, surface)
        }?;

        let surface_format = choose_surface_format(&formats).context("No suitable surface format")?;
        if let Some(old) = old {
            if old.format != surface_format.format {
                anyhow::bail!(
                    "Swapchain image format changed from {:?} to {:?}",
                    old.format,
                    surface_format.format
                );
            }
        }

        let present_mode = choose_present_mode(&present_modes, preferred_present_mode);
        if present_mode != preferred_present_mode {
            log::warn!(
                "Present mode {:?} not supported, using {:?}",
                preferred_present_mode,
                present_mode
            );
        }

        let extent = choose_extent(&surface_caps, width, height);
        let image_count = choose_image_count(&surface_caps);

        log::info!(
            "Creating swapchain: {}x{}, {} images, {:?}",
            extent.width,
            extent.height,
            image_count,
            present_mode
        );

        // Graphics and present on different families share the images
        let family_indices = [device.queue_families.graphics, device.queue_families.present];
        let (sharing_mode, shared_families) =
            if device.queue_families.graphics != device.queue_families.present {
                (vk::SharingMode::CONCURRENT, &family_indices[..])
            } else {
                (vk::SharingMode::EXCLUSIVE, &family_indices[..0])
            };

        let swapchain_loader = ash::khr::swapchain::Device::new(&device.instance, &device.device);

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(shared_families)
            .pre_transform(surface_caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old.map_or(vk::SwapchainKHR::null(), |o| o.swapchain));

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .context("Failed to create swapchain")?;

        // From here on partially built state is cleaned up by Drop
        let mut this = Self {
            swapchain,
            swapchain_loader,
            images: Vec::new(),
            image_views: Vec::new(),
            format: surface_format.format,
            extent,
            present_mode,
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
            device,
        };

        this.images = unsafe { this.swapchain_loader.get_swapchain_images(swapchain) }?;
        log::info!("Created swapchain with {} images", this.images.len());

        for &image in &this.images {
            let view = Self::create_image_view(&this.device, image, this.format)?;
            this.image_views.push(view);
        }

        this.render_pass = create_render_pass(&this.device, this.format)?;
        this.framebuffers =
            create_framebuffers(&this.device, &this.image_views, this.render_pass, extent)?;

        Ok(this)
    }

    fn create_image_view(device: &VulkanDevice, image: vk::Image, format: vk::Format) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        unsafe {
            device
                .device
                .create_image_view(&create_info, None)
                .context("Failed to create image view")
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire next image for rendering. `None` means the swapchain is out
    /// of date and has to be recreated; the flag reports a suboptimal image.
    pub fn acquire_next_image(&self, timeout: u64, semaphore: vk::Semaphore) -> Result<Option<(u32, bool)>> {
        let result = unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, timeout, semaphore, vk::Fence::null())
        };

        match result {
            Ok((index, suboptimal)) => Ok(Some((index, suboptimal))),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(None),
            Err(e) => Err(e).context("Failed to acquire swapchain image"),
        }
    }

    /// Present rendered image to screen. Returns true when the swapchain
    /// should be recreated.
    pub fn present(&self, queue: vk::Queue, image_index: u32, wait_semaphores: &[vk::Semaphore]) -> Result<bool> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe { self.swapchain_loader.queue_present(queue, &present_info) };

        match result {
            Ok(suboptimal) => Ok(suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
            Err(e) => Err(e).context("Failed to present swapchain image"),
        }
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                self.device.device.destroy_framebuffer(framebuffer, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                self.device.device.destroy_render_pass(self.render_pass, None);
            }
            for &view in &self.image_views {
                self.device.device.destroy_image_view(view, None);
            }
            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
        }
    }
}
