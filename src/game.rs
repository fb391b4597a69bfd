// Game - pull-style facade over the engine
//
// Instead of handing control to the event loop, the game owns the loop:
//
//     let mut game = Game::new("pong");
//     game.start()?;
//     while game.is_running() {
//         game.update();
//         if game.key_pressed(Key::Up) { ... }
//     }
//
// Every `update` pumps pending window events, fires key bindings, renders one
// frame and sleeps off the rest of the frame budget.

use crate::audio::Sound;
use crate::color::Color;
use crate::config::{Config, MIN_WINDOW_SIZE};
use crate::engine::Engine;
use crate::error::{at_least, HopError, HopResult};
use crate::group::Group;
use crate::input::Key;
use crate::logging::init_logging;
use crate::plugin::Context;
use crate::scene::{ObjectId, Scene};
use crate::text::TextBox;
use anyhow::{bail, Context as _, Result};
use glam::Vec2;
use std::time::Duration;
use winit::event_loop::{ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};

/// How many times `start` pumps the event loop waiting for the window.
const STARTUP_PUMPS: u32 = 100;
const STARTUP_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

fn warned<T>(result: HopResult<T>) -> HopResult<T> {
    if let Err(e) = &result {
        log::warn!("{}", e);
    }
    result
}

pub struct Game {
    engine: Engine,
    event_loop: Option<EventLoop<()>>,
}

impl Game {
    /// Creates a game titled `name`, using `config.toml` when present.
    pub fn new(name: &str) -> Self {
        let mut config = Config::load();
        config.window.title = name.to_string();
        Self::with_config(config)
    }

    pub fn with_config(config: Config) -> Self {
        init_logging(&config);
        Self {
            engine: Engine::new(config),
            event_loop: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    // =========================================================================
    // WINDOW
    // =========================================================================

    /// Sets the window size in pixels; both edges must be at least 100.
    pub fn set_window_size(&mut self, width: u32, height: u32) -> HopResult<()> {
        let min = MIN_WINDOW_SIZE as f32;
        warned(at_least("window width", width as f32, min))?;
        warned(at_least("window height", height as f32, min))?;
        self.engine.request_window_size(width, height);
        Ok(())
    }

    pub fn set_fullscreen(&mut self) {
        self.engine.set_fullscreen(true);
    }

    pub fn set_windowed(&mut self) {
        self.engine.set_fullscreen(false);
    }

    /// Opens the window and initializes the renderer.
    pub fn start(&mut self) -> Result<()> {
        if self.event_loop.is_some() {
            bail!("Game already started");
        }

        let mut event_loop = EventLoop::new().context("Failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        // The window is opened from the first resume event
        let mut pumps = 0;
        while !self.engine.is_running() && pumps < STARTUP_PUMPS {
            let status = event_loop.pump_app_events(Some(STARTUP_PUMP_TIMEOUT), &mut self.engine);
            if let Some(e) = self.engine.take_failure() {
                return Err(e);
            }
            if let PumpStatus::Exit(code) = status {
                bail!("Event loop exited during startup (code {})", code);
            }
            pumps += 1;
        }

        if !self.engine.is_running() {
            bail!("Window was not opened");
        }
        self.event_loop = Some(event_loop);
        log::info!("Started {}", self.engine.config().window.title);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Runs one frame: input, key bindings, rendering, pacing, plugins.
    pub fn update(&mut self) {
        let Some(event_loop) = self.event_loop.as_mut() else {
            log::warn!("update called before start");
            return;
        };
        if !self.engine.is_running() {
            return;
        }

        self.engine.keyboard_mut().end_frame();
        let status = event_loop.pump_app_events(Some(Duration::ZERO), &mut self.engine);
        if matches!(status, PumpStatus::Exit(_)) || self.engine.stop_requested() {
            self.engine.shutdown();
            return;
        }

        self.engine.dispatch_bindings();
        self.engine.render();
        self.engine.pace();
        self.engine.advance();
    }

    /// Closes the window. `is_running` is false afterwards.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.engine.shutdown();
    }

    /// Size of the monitor the window is on.
    pub fn resolution(&self) -> HopResult<(u32, u32)> {
        let window = self.engine.window().ok_or(HopError::NotStarted)?;
        Ok(match window.current_monitor() {
            Some(monitor) => {
                let size = monitor.size();
                (size.width, size.height)
            }
            None => self.engine.window_size(),
        })
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.engine.window_size()
    }

    // =========================================================================
    // SHAPES
    // =========================================================================

    pub fn create_rectangle(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    ) -> HopResult<ObjectId> {
        warned(at_least("rectangle width", width, 1.0))?;
        warned(at_least("rectangle height", height, 1.0))?;
        Ok(self.engine.scene_mut().add_rectangle(x, y, width, height, color))
    }

    /// Circle centered on `(x, y)`.
    pub fn create_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) -> HopResult<ObjectId> {
        warned(at_least("circle radius", radius, 1.0))?;
        Ok(self.engine.scene_mut().add_circle(x, y, radius, color))
    }

    pub fn create_triangle(&mut self, a: Vec2, b: Vec2, c: Vec2, color: Color) -> ObjectId {
        self.engine.scene_mut().add_triangle(a, b, c, color)
    }

    /// Empty group; fill it with `Group::create_*` on [`Game::scene_mut`].
    pub fn create_group(&self, x: f32, y: f32, width: f32, height: f32) -> Group {
        Group::new(x, y, width, height)
    }

    pub fn create_text(
        &mut self,
        x: f32,
        y: f32,
        size: u32,
        color: Color,
        text: &str,
    ) -> HopResult<TextBox> {
        warned(TextBox::new(self.engine.scene_mut(), x, y, size, color, text))
    }

    pub fn create_sound(&self, file_name: &str, looping: bool) -> HopResult<Sound> {
        warned(self.engine.create_sound(file_name, looping))
    }

    // =========================================================================
    // KEYBOARD
    // =========================================================================

    /// Starts reporting the key called `name`, see [`Key::from_name`].
    pub fn monitor_key(&mut self, name: &str) -> HopResult<Key> {
        let key = warned(Key::from_name(name).ok_or_else(|| HopError::UnknownKey(name.to_string())))?;
        self.engine.keyboard_mut().monitor(key);
        Ok(key)
    }

    pub fn key_pressed(&self, key: Key) -> bool {
        self.engine.keyboard().key_pressed(key)
    }

    pub fn key_held(&self, key: Key) -> bool {
        self.engine.keyboard().key_held(key)
    }

    pub fn key_released(&self, key: Key) -> bool {
        self.engine.keyboard().key_released(key)
    }

    pub fn pressed_keys(&self) -> Vec<Key> {
        self.engine.keyboard().pressed_keys()
    }

    pub fn held_keys(&self) -> Vec<Key> {
        self.engine.keyboard().held_keys()
    }

    pub fn released_keys(&self) -> Vec<Key> {
        self.engine.keyboard().released_keys()
    }

    /// Calls `callback` during `update` whenever the key goes down or repeats.
    pub fn bind_key<F>(&mut self, name: &str, callback: F) -> HopResult<Key>
    where
        F: FnMut(&mut Context<'_>) + 'static,
    {
        warned(self.engine.bindings_mut().bind_name(name, callback))
    }

    // =========================================================================
    // OBJECTS
    // =========================================================================

    pub fn move_object(&mut self, id: ObjectId, dx: f32, dy: f32) -> HopResult<()> {
        warned(self.engine.scene_mut().move_object(id, dx, dy))
    }

    pub fn set_color(&mut self, id: ObjectId, color: Color) -> HopResult<()> {
        warned(self.engine.scene_mut().set_color(id, color))
    }

    pub fn collides(&self, a: ObjectId, b: ObjectId) -> HopResult<bool> {
        warned(self.engine.scene().collides(a, b))
    }

    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        self.engine.scene_mut().remove(id).is_some()
    }

    pub fn scene(&self) -> &Scene {
        self.engine.scene()
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        self.engine.scene_mut()
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        // Plugins and GPU resources go before the event loop
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLUE, GREEN, RED};

    fn game() -> Game {
        let mut config = Config::default();
        config.audio.enabled = false;
        Game::with_config(config)
    }

    #[test]
    fn window_size_must_be_at_least_100() {
        let mut game = game();
        assert!(matches!(
            game.set_window_size(99, 400),
            Err(HopError::TooSmall { what: "window width", .. })
        ));
        assert!(matches!(
            game.set_window_size(400, 10),
            Err(HopError::TooSmall { what: "window height", .. })
        ));
        assert_eq!(game.window_size(), (800, 800));

        game.set_window_size(100, 300).unwrap();
        assert_eq!(game.window_size(), (100, 300));
    }

    #[test]
    fn nothing_runs_before_start() {
        let mut game = game();
        assert!(!game.is_running());
        assert!(matches!(game.resolution(), Err(HopError::NotStarted)));
        game.update();
        game.stop();
        assert!(!game.is_running());
    }

    #[test]
    fn shapes_below_one_pixel_are_rejected() {
        let mut game = game();
        assert!(game.create_rectangle(0.0, 0.0, 0.5, 10.0, RED).is_err());
        assert!(game.create_rectangle(0.0, 0.0, 10.0, 0.0, RED).is_err());
        assert!(game.create_circle(50.0, 50.0, 0.9, RED).is_err());
        assert!(game.scene().is_empty());

        game.create_rectangle(0.0, 0.0, 1.0, 1.0, RED).unwrap();
        game.create_circle(50.0, 50.0, 1.0, RED).unwrap();
        assert_eq!(game.scene().len(), 2);
    }

    #[test]
    fn objects_move_and_collide() {
        let mut game = game();
        let paddle = game.create_rectangle(0.0, 0.0, 10.0, 50.0, GREEN).unwrap();
        let ball = game.create_circle(30.0, 25.0, 5.0, BLUE).unwrap();
        assert!(!game.collides(paddle, ball).unwrap());

        game.move_object(ball, -17.0, 0.0).unwrap();
        assert!(game.collides(paddle, ball).unwrap());

        assert!(game.remove_object(ball));
        assert!(matches!(
            game.set_color(ball, RED),
            Err(HopError::UnknownObject(_))
        ));
    }

    #[test]
    fn keys_are_monitored_by_name() {
        let mut game = game();
        assert_eq!(game.monitor_key("up").unwrap(), Key::Up);
        assert!(matches!(game.monitor_key("warp"), Err(HopError::UnknownKey(_))));
        assert!(game.engine().keyboard().is_monitored(Key::Up));
        assert!(game.pressed_keys().is_empty());

        game.bind_key("space", |ctx| ctx.stop()).unwrap();
        assert!(game.bind_key("nope", |_| {}).is_err());
    }

    #[test]
    fn text_and_groups_need_no_window() {
        let mut game = game();
        let text = game.create_text(10.0, 10.0, 2, RED, "Hi").unwrap();
        assert!(!text.group().all_objects().is_empty());
        assert!(game.create_text(0.0, 0.0, 0, RED, "x").is_err());

        let mut group = game.create_group(0.0, 0.0, 100.0, 100.0);
        group
            .create_rectangle(game.scene_mut(), 10.0, 10.0, 20.0, 20.0, RED)
            .unwrap();
        assert_eq!(group.objects().len(), 1);
    }
}
