// Renderer - frame lifecycle on top of device, swapchain and shape system
//
// FRAME FLOW:
// 1. Wait for the fence of this frame slot
// 2. Acquire a swapchain image (recreate + skip the frame when out of date)
// 3. Wait for any earlier frame still rendering to that image
// 4. Record: render pass with clear color, one draw per scene object
// 5. Reset the fence, submit, present, move to the next frame slot
//
// The swapchain is rebuilt when the window is resized or presentation
// reports it out of date / suboptimal. Minimized windows skip rendering.

use super::hot_reload::ShaderWatcher;
use super::shape_system::ShapeRenderSystem;
use super::sync::FrameSync;
use super::{Swapchain, VulkanDevice};
use crate::config::{Config, MAX_FRAMES_IN_FLIGHT};
use crate::scene::Scene;
use anyhow::{Context, Result};
use ash::vk;
use std::sync::Arc;
use winit::window::Window;

/// Which frame slot is in use and whether a frame is being recorded.
#[derive(Debug)]
pub struct FrameCounter {
    max_frames: usize,
    current: usize,
    started: bool,
}

impl FrameCounter {
    pub fn new(max_frames: usize) -> Self {
        Self {
            max_frames: max_frames.max(1),
            current: 0,
            started: false,
        }
    }

    /// Frame-in-flight slot, `0..max_frames`.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn ensure_idle(&self) -> Result<()> {
        if self.started {
            anyhow::bail!("Cannot begin a frame while frame {} is still in progress", self.current);
        }
        Ok(())
    }

    pub fn ensure_started(&self) -> Result<()> {
        if !self.started {
            anyhow::bail!("No frame in progress");
        }
        Ok(())
    }

    pub fn begin(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.started = true;
        Ok(())
    }

    /// Ends the frame and moves to the next slot.
    pub fn finish(&mut self) -> Result<()> {
        self.ensure_started()?;
        self.started = false;
        self.current = (self.current + 1) % self.max_frames;
        Ok(())
    }
}

/// The steps of handing a recorded frame to the GPU.
trait FrameSubmission {
    fn end_recording(&mut self) -> Result<()>;
    fn reset_fence(&mut self) -> Result<()>;
    fn submit(&mut self) -> Result<()>;
    /// Puts a signaled fence back after a failed submit.
    fn restore_fence(&mut self) -> Result<()>;
}

/// The fence is reset right before submitting, and restored if the submit
/// fails, so waiting on it later never blocks forever.
fn submit_recorded<S: FrameSubmission>(submission: &mut S) -> Result<()> {
    submission.end_recording()?;
    submission.reset_fence()?;
    if let Err(e) = submission.submit() {
        if let Err(restore) = submission.restore_fence() {
            log::error!("Frame fence lost: {:#}", restore);
        }
        return Err(e);
    }
    Ok(())
}

struct GpuSubmission<'a> {
    device: &'a VulkanDevice,
    sync: &'a mut FrameSync,
    cmd: vk::CommandBuffer,
    wait_stages: &'a [vk::PipelineStageFlags],
    images_in_flight: &'a mut [vk::Fence],
}

impl FrameSubmission for GpuSubmission<'_> {
    fn end_recording(&mut self) -> Result<()> {
        unsafe { self.device.device.end_command_buffer(self.cmd) }.context("Failed to record frame")
    }

    fn reset_fence(&mut self) -> Result<()> {
        unsafe { self.device.device.reset_fences(&[self.sync.in_flight_fence]) }
            .context("Failed to reset frame fence")
    }

    fn submit(&mut self) -> Result<()> {
        let wait_semaphores = [self.sync.image_available];
        let signal_semaphores = [self.sync.render_finished];
        let command_buffers = [self.cmd];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(self.wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.device.device.queue_submit(
                self.device.graphics_queue,
                &[submit_info],
                self.sync.in_flight_fence,
            )
        }
        .context("Failed to submit frame")
    }

    fn restore_fence(&mut self) -> Result<()> {
        let old = self.sync.replace_fence(&self.device.device)?;
        // Images guarded by the destroyed fence have nothing in flight
        for fence in self.images_in_flight.iter_mut().filter(|f| **f == old) {
            *fence = vk::Fence::null();
        }
        Ok(())
    }
}

pub struct Renderer {
    shapes: Option<ShapeRenderSystem>,
    shader_watcher: Option<ShaderWatcher>,
    swapchain: Option<Swapchain>,

    command_pool: vk::CommandPool,
    /// One command buffer per frame in flight, re-recorded every frame
    command_buffers: Vec<vk::CommandBuffer>,

    frame_sync: Vec<FrameSync>,
    /// Fence of the frame currently rendering to each swapchain image
    images_in_flight: Vec<vk::Fence>,
    frames: FrameCounter,
    current_image: u32,

    wait_stages: [vk::PipelineStageFlags; 1],
    clear_color: [f32; 4],
    present_mode: vk::PresentModeKHR,

    /// Set when the window is resized - triggers swapchain recreation
    pub needs_resize: bool,
    /// Set when the window is minimized (size = 0) - skip rendering
    pub is_minimized: bool,

    window: Arc<Window>,
    device: Arc<VulkanDevice>,
}

impl Renderer {
    /// Initialize all Vulkan resources for `window`.
    pub fn new(window: Arc<Window>, config: &Config) -> Result<Self> {
        log::info!("Initializing Vulkan...");

        // Step 1: Device, surface and queues
        let device = VulkanDevice::new(
            &window,
            &config.window.title,
            config.debug.validation_layers,
        )?;

        // Step 2: Command pool and per-frame command buffers
        let max_frames = config
            .graphics
            .max_frames_in_flight
            .clamp(1, MAX_FRAMES_IN_FLIGHT);
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.queue_families.graphics)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = unsafe { device.device.create_command_pool(&pool_info, None) }
            .context("Failed to create command pool")?;

        let mut renderer = Self {
            shapes: None,
            shader_watcher: None,
            swapchain: None,
            command_pool,
            command_buffers: Vec::new(),
            frame_sync: Vec::new(),
            images_in_flight: Vec::new(),
            frames: FrameCounter::new(max_frames),
            current_image: 0,
            wait_stages: [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
            clear_color: config.graphics.clear_color,
            present_mode: config.get_present_mode(),
            needs_resize: false,
            is_minimized: false,
            window,
            device,
        };

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(max_frames as u32);
        renderer.command_buffers = unsafe { renderer.device.device.allocate_command_buffers(&alloc_info) }
            .context("Failed to allocate command buffers")?;

        // Step 3: Synchronization primitives (not recreated on resize)
        renderer.frame_sync = FrameSync::create_all(&renderer.device, max_frames)?;

        // Step 4: Swapchain, render pass and framebuffers
        renderer.recreate_swapchain()?;
        let render_pass = renderer
            .swapchain
            .as_ref()
            .map(|s| s.render_pass)
            .context("Window has no drawable area")?;

        // Step 5: Shape pipeline
        renderer.shapes = Some(ShapeRenderSystem::new(
            renderer.device.clone(),
            render_pass,
            &config.graphics.shader_dir,
            max_frames,
        )?);

        if config.debug.hot_reload_shaders {
            match ShaderWatcher::new(&config.graphics.shader_dir) {
                Ok(watcher) => renderer.shader_watcher = Some(watcher),
                Err(e) => log::warn!("Shader hot reload disabled: {:#}", e),
            }
        }

        log::info!("Vulkan initialized successfully!");
        Ok(renderer)
    }

    pub fn device(&self) -> &Arc<VulkanDevice> {
        &self.device
    }

    /// Current drawable size in pixels, zero while minimized.
    pub fn extent(&self) -> vk::Extent2D {
        match &self.swapchain {
            Some(swapchain) if !self.is_minimized => swapchain.extent,
            _ => vk::Extent2D::default(),
        }
    }

    pub fn current_frame(&self) -> usize {
        self.frames.current()
    }

    pub fn is_frame_started(&self) -> bool {
        self.frames.is_started()
    }

    /// Called on window resize events.
    pub fn resized(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            self.is_minimized = true;
        } else {
            self.is_minimized = false;
            self.needs_resize = true;
        }
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.device.wait_idle()
    }

    /// Rebuild the swapchain for the current window size.
    fn recreate_swapchain(&mut self) -> Result<()> {
        let size = self.window.inner_size();

        // Don't create swapchain if window is minimized (size = 0)
        if size.width == 0 || size.height == 0 {
            self.is_minimized = true;
            return Ok(());
        }

        // Wait for GPU to finish all work before replacing resources
        self.device.wait_idle()?;

        let swapchain = Swapchain::new(
            self.device.clone(),
            self.present_mode,
            size.width,
            size.height,
            self.swapchain.as_ref(),
        )?;

        self.images_in_flight = vec![vk::Fence::null(); swapchain.image_count()];
        // The retired swapchain is destroyed here, after its replacement exists
        self.swapchain = Some(swapchain);
        self.needs_resize = false;
        self.is_minimized = false;
        Ok(())
    }

    fn reload_shaders_if_changed(&mut self) {
        let changed = self
            .shader_watcher
            .as_ref()
            .is_some_and(ShaderWatcher::take_changed);
        if !changed {
            return;
        }

        let (Some(shapes), Some(swapchain)) = (self.shapes.as_mut(), self.swapchain.as_ref()) else {
            return;
        };
        if let Err(e) = self.device.wait_idle() {
            log::error!("Shader reload skipped: {:#}", e);
            return;
        }
        if let Err(e) = shapes.reload_pipeline(swapchain.render_pass) {
            log::error!("Shader reload failed, keeping previous pipeline: {:#}", e);
        }
    }

    /// Start a frame. `None` means nothing should be drawn this time
    /// (minimized, or the swapchain had to be recreated).
    pub fn begin_frame(&mut self) -> Result<Option<vk::CommandBuffer>> {
        self.frames.ensure_idle()?;

        if self.is_minimized {
            return Ok(None);
        }
        if self.needs_resize {
            self.recreate_swapchain()?;
            if self.is_minimized {
                return Ok(None);
            }
        }

        let device = &self.device.device;
        let swapchain = self.swapchain.as_ref().context("Swapchain not initialized")?;
        let sync = &self.frame_sync[self.frames.current()];

        // STEP 1: Wait until the GPU is done with this frame slot
        unsafe { device.wait_for_fences(&[sync.in_flight_fence], true, u64::MAX) }
            .context("Failed waiting for frame fence")?;

        // STEP 2: Acquire next swapchain image
        let image_index = match swapchain.acquire_next_image(u64::MAX, sync.image_available)? {
            Some((index, suboptimal)) => {
                // Suboptimal still works, rebuild after this frame
                if suboptimal {
                    self.needs_resize = true;
                }
                index
            }
            None => {
                self.recreate_swapchain()?;
                return Ok(None);
            }
        };

        // STEP 3: An earlier frame may still be drawing into this image
        let image_fence = self.images_in_flight[image_index as usize];
        if image_fence != vk::Fence::null() && image_fence != sync.in_flight_fence {
            unsafe { device.wait_for_fences(&[image_fence], true, u64::MAX) }
                .context("Failed waiting for image fence")?;
        }
        self.images_in_flight[image_index as usize] = sync.in_flight_fence;

        // STEP 4: Begin recording
        let cmd = self.command_buffers[self.frames.current()];
        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(cmd, &begin_info)?;
        }

        self.current_image = image_index;
        self.frames.begin()?;
        Ok(Some(cmd))
    }

    /// Begin the render pass on the acquired image, clear it and set the
    /// full-window viewport.
    pub fn begin_render_pass(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.frames
            .ensure_started()
            .context("begin_render_pass called outside of a frame")?;
        let swapchain = self.swapchain.as_ref().context("Swapchain not initialized")?;
        let extent = swapchain.extent;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(swapchain.render_pass)
            .framebuffer(swapchain.framebuffers[self.current_image as usize])
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };

        let device = &self.device.device;
        unsafe {
            device.cmd_begin_render_pass(cmd, &render_pass_info, vk::SubpassContents::INLINE);
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[scissor]);
        }
        Ok(())
    }

    pub fn end_render_pass(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.frames
            .ensure_started()
            .context("end_render_pass called outside of a frame")?;
        unsafe { self.device.device.cmd_end_render_pass(cmd) };
        Ok(())
    }

    /// Submit the recorded frame and present it.
    pub fn end_frame(&mut self) -> Result<()> {
        self.frames.ensure_started()?;

        let result = self.submit_and_present();
        // The slot advances even if submission failed, the frame is over
        self.frames.finish()?;

        let needs_recreate = result?;
        if needs_recreate || self.needs_resize {
            self.recreate_swapchain()?;
        }
        Ok(())
    }

    fn submit_and_present(&mut self) -> Result<bool> {
        let slot = self.frames.current();
        let device = &self.device;

        let mut submission = GpuSubmission {
            device,
            sync: &mut self.frame_sync[slot],
            cmd: self.command_buffers[slot],
            wait_stages: &self.wait_stages,
            images_in_flight: &mut self.images_in_flight,
        };
        submit_recorded(&mut submission)?;

        let swapchain = self.swapchain.as_ref().context("Swapchain not initialized")?;
        let signal_semaphores = [self.frame_sync[slot].render_finished];
        swapchain.present(device.present_queue, self.current_image, &signal_semaphores)
    }

    /// Draw `scene` as one full frame. Returns false when the frame was skipped.
    pub fn render(&mut self, scene: &Scene) -> Result<bool> {
        self.reload_shaders_if_changed();

        let Some(cmd) = self.begin_frame()? else {
            return Ok(false);
        };

        let slot = self.frames.current();
        let extent = self.extent();
        let prepared = match self.shapes.as_mut() {
            Some(shapes) => shapes.prepare(scene, slot),
            None => Ok(()),
        };

        let recorded = self.begin_render_pass(cmd).and_then(|()| {
            if let Some(shapes) = &self.shapes {
                shapes.draw(cmd, scene, extent);
            }
            self.end_render_pass(cmd)
        });

        // Always close the frame so the next one can start
        self.end_frame()?;
        recorded?;
        prepared.context("Failed to upload shapes")?;
        Ok(true)
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::info!("Cleaning up renderer...");

        // Wait for GPU to finish before destroying anything
        let _ = self.device.wait_idle();

        // Destroy in reverse order of creation
        self.shader_watcher = None;
        self.shapes = None;
        self.swapchain = None;

        unsafe {
            for sync in &self.frame_sync {
                sync.destroy(&self.device.device);
            }
            // Also frees the command buffers
            self.device.device.destroy_command_pool(self.command_pool, None);
        }

        log::info!("Cleanup complete");
    }
}
