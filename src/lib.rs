// =============================================================================
// hop - a small 2D shape engine
// =============================================================================
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  Game (pull-style loop: start / update / is_running / stop)     │
// │    └── Engine (winit event loop, plugins, key bindings)         │
// │          ├── Scene, Group, TextBox (CPU-side shapes)            │
// │          ├── Keyboard, AudioEngine                              │
// │          └── Renderer (Vulkan device, swapchain, shapes)        │
// └─────────────────────────────────────────────────────────────────┘
//
// Coordinates are pixels with the origin at the bottom-left of the window
// and y pointing up.

pub mod audio;
pub mod backend;
pub mod clock;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod geometry;
pub mod group;
pub mod input;
pub mod logging;
pub mod plugin;
pub mod scene;
pub mod text;

pub use audio::{AudioEngine, Sound};
pub use color::{Color, BLACK, BLUE, GREEN, RED, WHITE};
pub use config::Config;
pub use engine::Engine;
pub use error::{HopError, HopResult};
pub use game::Game;
pub use geometry::Rect;
pub use group::Group;
pub use input::{Key, KeyBindings, Keyboard};
pub use plugin::{Context, Plugin};
pub use scene::{Object, ObjectId, Scene, ShapeKind};
pub use text::TextBox;

pub use glam::Vec2;
