// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Every section is optional and falls back to defaults. A broken file is
// reported in the log and replaced by defaults instead of stopping the game.

use crate::input::Key;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Smallest window edge a game may ask for.
pub const MIN_WINDOW_SIZE: u32 = 100;
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub audio: AudioConfig,
    pub debug: DebugConfig,
    pub controls: ControlsConfig,
}

/// Window settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "hop".to_string(),
            width: 800,
            height: 800,
            fullscreen: false,
            resizable: true,
        }
    }
}

/// Graphics settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub present_mode: String,
    pub clear_color: [f32; 4],
    pub max_frames_in_flight: usize,
    /// Directory holding `shape.vert.spv` and `shape.frag.spv`.
    pub shader_dir: PathBuf,
    /// Frame pacing target used by the pull-style game loop.
    pub frame_budget_ms: u64,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: "fifo".to_string(),
            clear_color: [0.01, 0.01, 0.01, 1.0],
            max_frames_in_flight: 2,
            shader_dir: PathBuf::from("shaders"),
            frame_budget_ms: 20,
        }
    }
}

/// Audio settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub sound_dir: PathBuf,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sound_dir: PathBuf::from("sounds"),
        }
    }
}

/// Debug settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_to_file: bool,
    pub log_file: String,
    pub show_fps: bool,
    pub hot_reload_shaders: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: cfg!(debug_assertions),
            log_to_file: false,
            log_file: "hop.log".to_string(),
            show_fps: true,
            hot_reload_shaders: false,
        }
    }
}

/// Built-in control keys
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub quit_key: String,
    pub fullscreen_key: String,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            quit_key: "ESCAPE".to_string(),
            fullscreen_key: "F11".to_string(),
        }
    }
}

impl ControlsConfig {
    pub fn quit(&self) -> Option<Key> {
        parse_control("quit_key", &self.quit_key)
    }

    pub fn fullscreen(&self) -> Option<Key> {
        parse_control("fullscreen_key", &self.fullscreen_key)
    }
}

fn parse_control(field: &str, name: &str) -> Option<Key> {
    if name.is_empty() {
        return None;
    }
    let key = Key::from_name(name);
    if key.is_none() {
        log::warn!("controls.{}: unknown key '{}', control disabled", field, name);
    }
    key
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to load config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.window;
        if w.width < MIN_WINDOW_SIZE || w.height < MIN_WINDOW_SIZE {
            bail!(
                "window size {}x{} is below the minimum of {}",
                w.width,
                w.height,
                MIN_WINDOW_SIZE
            );
        }

        let frames = self.graphics.max_frames_in_flight;
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&frames) {
            bail!(
                "max_frames_in_flight must be in 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT,
                frames
            );
        }

        Ok(())
    }

    /// Pulls out-of-range values back to the nearest usable one.
    pub fn clamp_to_limits(&mut self) {
        self.window.width = self.window.width.max(MIN_WINDOW_SIZE);
        self.window.height = self.window.height.max(MIN_WINDOW_SIZE);
        self.graphics.max_frames_in_flight = self
            .graphics
            .max_frames_in_flight
            .clamp(1, MAX_FRAMES_IN_FLIGHT);
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.graphics.frame_budget_ms)
    }

    /// Get present mode as Vulkan enum
    pub fn get_present_mode(&self) -> ash::vk::PresentModeKHR {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => ash::vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => ash::vk::PresentModeKHR::MAILBOX,
            "fifo" => ash::vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => ash::vk::PresentModeKHR::FIFO_RELAXED,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to FIFO",
                    self.graphics.present_mode
                );
                ash::vk::PresentModeKHR::FIFO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    #[test]
    fn empty_document_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.graphics.max_frames_in_flight, 2);
        assert_eq!(config.frame_budget(), Duration::from_millis(20));
        assert_eq!(config.controls.quit(), Some(Key::Escape));
        assert_eq!(config.controls.fullscreen(), Some(Key::F11));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml(
            r#"
            [window]
            title = "Pong"
            width = 1920

            [audio]
            sound_dir = "assets/sfx"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Pong");
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.audio.sound_dir, PathBuf::from("assets/sfx"));
        assert!(config.audio.enabled);
    }

    #[test]
    fn tiny_window_is_rejected() {
        assert!(Config::from_toml("[window]\nwidth = 99").is_err());
    }

    #[test]
    fn frames_in_flight_range() {
        assert!(Config::from_toml("[graphics]\nmax_frames_in_flight = 0").is_err());
        assert!(Config::from_toml("[graphics]\nmax_frames_in_flight = 4").is_err());
        assert!(Config::from_toml("[graphics]\nmax_frames_in_flight = 3").is_ok());
    }

    #[test]
    fn clamping_makes_config_valid() {
        let mut config = Config::default();
        config.window.width = 10;
        config.graphics.max_frames_in_flight = 0;
        assert!(config.validate().is_err());

        config.clamp_to_limits();
        assert!(config.validate().is_ok());
        assert_eq!(config.window.width, MIN_WINDOW_SIZE);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.graphics.max_frames_in_flight, 1);

        config.graphics.max_frames_in_flight = 9;
        config.clamp_to_limits();
        assert_eq!(config.graphics.max_frames_in_flight, MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn present_mode_names() {
        let mut config = Config::default();
        config.graphics.present_mode = "Mailbox".to_string();
        assert_eq!(config.get_present_mode(), vk::PresentModeKHR::MAILBOX);
        config.graphics.present_mode = "vsync-ish".to_string();
        assert_eq!(config.get_present_mode(), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn controls_parse_key_names() {
        let config = Config::from_toml("[controls]\nquit_key = \"q\"\nfullscreen_key = \"\"").unwrap();
        assert_eq!(config.controls.quit(), Some(Key::Q));
        assert_eq!(config.controls.fullscreen(), None);

        let config = Config::from_toml("[controls]\nquit_key = \"HYPER\"").unwrap();
        assert_eq!(config.controls.quit(), None);
    }

    #[test]
    fn missing_file_is_default() {
        let config = Config::load_from_path("definitely/not/here.toml").unwrap();
        assert_eq!(config.window.title, "hop");
    }

    #[test]
    fn shipped_config_parses() {
        let config = Config::from_toml(include_str!("../config.toml")).unwrap();
        assert_eq!(config.graphics.shader_dir, PathBuf::from("shaders"));
    }
}
