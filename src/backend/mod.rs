// Backend module - Vulkan abstraction layer
//
// Thin wrappers around ash: device and surface, swapchain with its render
// pass, per-frame sync, the shape pipeline and the renderer tying them into
// a frame loop.

pub mod buffer;
pub mod device;
pub mod hot_reload;
pub mod pipeline;
pub mod renderer;
pub mod shader;
pub mod shape_system;
pub mod swapchain;
pub mod sync;

pub use device::VulkanDevice;
pub use renderer::Renderer;
pub use swapchain::Swapchain;
