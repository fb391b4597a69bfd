// Shape render system - draws every scene object with the shape pipeline
//
// Objects keep their geometry on the CPU. Each one is mirrored into its own
// vertex buffer the first time it is seen and again whenever its revision
// changes; moves and color changes only touch push constants. Buffers that
// are replaced or whose object was removed may still be read by frames in
// flight, so they are parked on the current frame slot and freed the next
// time that slot comes around.

use super::buffer::VertexBuffer;
use super::pipeline::{ShapePipeline, PUSH_CONSTANT_STAGES};
use super::VulkanDevice;
use crate::color::Color;
use crate::scene::{Object, ObjectId, Scene};
use anyhow::Result;
use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Per-draw data, must match the `Push` block in the shape shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ShapePushConstants {
    pub scale: [f32; 2],
    pub offset: [f32; 2],
    pub color: [f32; 4],
}

impl ShapePushConstants {
    /// Maps local pixel coordinates translated by `translation` into clip
    /// space for a `width` x `height` target with y pointing up.
    pub fn new(translation: Vec2, color: Color, width: f32, height: f32) -> Self {
        let (w, h) = (width.max(1.0), height.max(1.0));
        Self {
            scale: [2.0 / w, -2.0 / h],
            offset: [2.0 * translation.x / w - 1.0, 1.0 - 2.0 * translation.y / h],
            color: color.to_rgba(),
        }
    }

    /// Clip-space position of a local vertex, as the vertex shader computes it.
    pub fn apply(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            v.x * self.scale[0] + self.offset[0],
            v.y * self.scale[1] + self.offset[1],
        )
    }
}

/// GPU copies of scene objects keyed by id, with deferred release.
#[derive(Debug)]
pub struct MeshCache<T> {
    entries: HashMap<ObjectId, (u64, T)>,
    retired: Vec<Vec<T>>,
}

impl<T> MeshCache<T> {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            entries: HashMap::new(),
            retired: (0..frames_in_flight.max(1)).map(|_| Vec::new()).collect(),
        }
    }

    /// Releases what was retired the last time `slot` was used. Call after
    /// that slot's fence was waited on.
    pub fn begin_frame(&mut self, slot: usize) {
        let index = slot % self.retired.len();
        self.retired[index].clear();
    }

    /// Brings the cache in line with `scene`, calling `upload` for new or
    /// changed objects. Returns the number of uploads.
    pub fn sync<F>(&mut self, scene: &Scene, slot: usize, mut upload: F) -> Result<usize>
    where
        F: FnMut(&Object) -> Result<T>,
    {
        let index = slot % self.retired.len();
        let mut uploads = 0;

        for object in scene.iter() {
            let current = self.entries.get(&object.id()).map(|(rev, _)| *rev);
            if current == Some(object.revision()) {
                continue;
            }

            let mesh = upload(object)?;
            uploads += 1;
            if let Some((_, old)) = self.entries.insert(object.id(), (object.revision(), mesh)) {
                self.retired[index].push(old);
            }
        }

        // Every live object has an entry now, anything beyond that is stale
        if self.entries.len() > scene.len() {
            let live: HashSet<ObjectId> = scene.iter().map(Object::id).collect();
            let gone: Vec<ObjectId> = self
                .entries
                .keys()
                .filter(|id| !live.contains(id))
                .copied()
                .collect();
            for id in gone {
                if let Some((_, old)) = self.entries.remove(&id) {
                    self.retired[index].push(old);
                }
            }
        }

        Ok(uploads)
    }

    pub fn get(&self, id: ObjectId) -> Option<&T> {
        self.entries.get(&id).map(|(_, mesh)| mesh)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn retired_count(&self) -> usize {
        self.retired.iter().map(Vec::len).sum()
    }
}

pub struct ShapeRenderSystem {
    meshes: MeshCache<VertexBuffer>,
    pipeline: ShapePipeline,
    shader_dir: PathBuf,
    device: Arc<VulkanDevice>,
}

impl ShapeRenderSystem {
    pub fn new(
        device: Arc<VulkanDevice>,
        render_pass: vk::RenderPass,
        shader_dir: &Path,
        frames_in_flight: usize,
    ) -> Result<Self> {
        let pipeline = ShapePipeline::load(device.clone(), render_pass, shader_dir)?;
        Ok(Self {
            meshes: MeshCache::new(frames_in_flight),
            pipeline,
            shader_dir: shader_dir.to_path_buf(),
            device,
        })
    }

    /// Rebuilds the pipeline from the shader directory. On failure the
    /// current pipeline stays in use. The device must be idle.
    pub fn reload_pipeline(&mut self, render_pass: vk::RenderPass) -> Result<()> {
        let pipeline = ShapePipeline::load(self.device.clone(), render_pass, &self.shader_dir)?;
        self.pipeline = pipeline;
        log::info!("Shape pipeline reloaded");
        Ok(())
    }

    /// Uploads geometry for new or changed objects and releases buffers of
    /// removed ones. `slot` is the frame-in-flight index.
    pub fn prepare(&mut self, scene: &Scene, slot: usize) -> Result<()> {
        self.meshes.begin_frame(slot);

        let device = &self.device;
        let uploads = self.meshes.sync(scene, slot, |object| {
            let name = format!("{:?} {}", object.kind(), object.id().raw());
            VertexBuffer::new(device.clone(), &name, object.vertices())
        })?;

        if uploads > 0 {
            log::trace!("Uploaded {} meshes ({} cached)", uploads, self.meshes.len());
        }
        Ok(())
    }

    /// Records draws for every object in scene order. Must be called inside
    /// the render pass, after [`Self::prepare`] for the same scene.
    pub fn draw(&self, cmd: vk::CommandBuffer, scene: &Scene, extent: vk::Extent2D) {
        let device = &self.device.device;
        let (width, height) = (extent.width as f32, extent.height as f32);

        unsafe {
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline.pipeline);
        }

        for object in scene.iter() {
            let Some(mesh) = self.meshes.get(object.id()) else {
                continue;
            };

            let push = ShapePushConstants::new(object.translation(), object.color(), width, height);
            unsafe {
                device.cmd_push_constants(
                    cmd,
                    self.pipeline.layout,
                    PUSH_CONSTANT_STAGES,
                    0,
                    bytemuck::bytes_of(&push),
                );
                device.cmd_bind_vertex_buffers(cmd, 0, &[mesh.buffer], &[0]);
                device.cmd_draw(cmd, mesh.vertex_count, 1, 0, 0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{RED, WHITE};

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn push_constants_are_32_bytes() {
        assert_eq!(std::mem::size_of::<ShapePushConstants>(), 32);
    }

    #[test]
    fn corners_map_to_clip_space() {
        let push = ShapePushConstants::new(Vec2::ZERO, WHITE, 800.0, 600.0);
        // bottom-left of the window is clip (-1, 1) in Vulkan
        assert!(close(push.apply(Vec2::new(0.0, 0.0)), Vec2::new(-1.0, 1.0)));
        assert!(close(push.apply(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0)));
        assert!(close(push.apply(Vec2::new(400.0, 300.0)), Vec2::ZERO));
    }

    #[test]
    fn translation_is_added_in_pixels() {
        let push = ShapePushConstants::new(Vec2::new(100.0, 50.0), RED, 200.0, 100.0);
        assert!(close(push.apply(Vec2::ZERO), Vec2::new(0.0, 0.0)));
        assert!(close(push.apply(Vec2::new(100.0, 50.0)), Vec2::new(1.0, -1.0)));
        assert_eq!(push.color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn zero_extent_does_not_divide_by_zero() {
        let push = ShapePushConstants::new(Vec2::ZERO, RED, 0.0, 0.0);
        assert!(push.scale.iter().all(|s| s.is_finite()));
    }

    fn upload_counter(count: &mut usize) -> impl FnMut(&Object) -> Result<u64> + '_ {
        move |object| {
            *count += 1;
            Ok(object.id().raw() * 100 + object.revision())
        }
    }

    #[test]
    fn uploads_once_until_revision_changes() {
        let mut scene = Scene::new();
        let a = scene.add_rectangle(0.0, 0.0, 10.0, 10.0, RED);
        let mut cache = MeshCache::new(2);
        let mut count = 0;

        assert_eq!(cache.sync(&scene, 0, upload_counter(&mut count)).unwrap(), 1);
        scene.move_object(a, 5.0, 5.0).unwrap();
        scene.set_color(a, WHITE).unwrap();
        assert_eq!(cache.sync(&scene, 1, upload_counter(&mut count)).unwrap(), 0);

        scene.get_mut(a).unwrap().mirror_horizontal();
        assert_eq!(cache.sync(&scene, 0, upload_counter(&mut count)).unwrap(), 1);
        assert_eq!(count, 2);
        assert_eq!(cache.get(a), Some(&(a.raw() * 100 + 1)));
        assert_eq!(cache.retired_count(), 1);
    }

    #[test]
    fn removed_objects_are_retired_then_released() {
        let mut scene = Scene::new();
        let a = scene.add_rectangle(0.0, 0.0, 10.0, 10.0, RED);
        let b = scene.add_circle(50.0, 50.0, 5.0, RED);
        let mut cache = MeshCache::new(2);
        let mut count = 0;
        cache.sync(&scene, 0, upload_counter(&mut count)).unwrap();
        assert_eq!(cache.len(), 2);

        scene.remove(a);
        cache.begin_frame(1);
        cache.sync(&scene, 1, upload_counter(&mut count)).unwrap();
        assert!(cache.get(a).is_none());
        assert!(cache.get(b).is_some());
        assert_eq!(cache.retired_count(), 1);

        // slot 0 coming around again does not free slot 1's retirees
        cache.begin_frame(0);
        assert_eq!(cache.retired_count(), 1);
        cache.begin_frame(1);
        assert_eq!(cache.retired_count(), 0);
    }

    #[test]
    fn failed_upload_propagates() {
        let mut scene = Scene::new();
        scene.add_rectangle(0.0, 0.0, 1.0, 1.0, RED);
        let mut cache: MeshCache<u8> = MeshCache::new(1);
        let result = cache.sync(&scene, 0, |_| anyhow::bail!("out of memory"));
        assert!(result.is_err());
        assert!(cache.is_empty());
    }
}
