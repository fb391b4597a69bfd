// Shader module loading
//
// Vulkan consumes SPIR-V. The shape shaders are compiled by build.rs and read
// from the shader directory at runtime, which lets them be swapped while the
// game runs.

use super::VulkanDevice;
use anyhow::{Context, Result};
use ash::vk;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const SHAPE_VERTEX_SHADER: &str = "shape.vert.spv";
pub const SHAPE_FRAGMENT_SHADER: &str = "shape.frag.spv";

/// Vertex and fragment SPIR-V paths of the shape pipeline.
pub fn shape_shader_paths(shader_dir: &Path) -> (PathBuf, PathBuf) {
    (
        shader_dir.join(SHAPE_VERTEX_SHADER),
        shader_dir.join(SHAPE_FRAGMENT_SHADER),
    )
}

/// Read a SPIR-V file into 4-byte words.
pub fn load_spirv(path: &Path) -> Result<Vec<u32>> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open shader {:?} (was it compiled with glslc?)", path))?;
    ash::util::read_spv(&mut file).with_context(|| format!("Invalid SPIR-V in {:?}", path))
}

/// Create a shader module from SPIR-V words
pub fn create_shader_module(device: &VulkanDevice, code: &[u32]) -> Result<vk::ShaderModule> {
    let create_info = vk::ShaderModuleCreateInfo::default().code(code);

    unsafe {
        device
            .device
            .create_shader_module(&create_info, None)
            .context("Failed to create shader module")
    }
}
