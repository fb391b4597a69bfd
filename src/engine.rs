// =============================================================================
// ENGINE - window, main loop and plugin host
// =============================================================================
//
// FRAME FLOW:
// 1. winit delivers input, the keyboard records transitions
// 2. Key bindings fire for keys pressed or repeated this frame
// 3. The renderer draws the scene
// 4. Delta time is measured, plugins update
// 5. Per-frame key transitions are cleared
//
// `Engine::run` drives this from the winit event loop. `Game` pumps the same
// handler one frame at a time instead.

use crate::audio::{AudioEngine, Sound};
use crate::backend::Renderer;
use crate::clock::FrameClock;
use crate::config::Config;
use crate::error::{HopError, HopResult};
use crate::input::{Key, KeyBindings, Keyboard};
use crate::plugin::{Context as PluginContext, LoopControl, Plugin, Plugins};
use crate::scene::Scene;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Fullscreen, Window, WindowAttributes, WindowId},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LoopState {
    Idle,
    Running,
    Closed,
}

/// Counts rendered frames and reports the rate once per second.
#[derive(Debug)]
pub struct FpsCounter {
    frame_count: u32,
    last_update: Instant,
    last_frame: Instant,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_count: 0,
            last_update: now,
            last_frame: now,
        }
    }

    /// Records a frame. Once a second has passed since the last report,
    /// returns `(frames per second, last frame time in ms)`.
    pub fn frame(&mut self, now: Instant) -> Option<(f32, f32)> {
        let frame_time = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_count += 1;

        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f32();
        if elapsed < 1.0 {
            return None;
        }

        let fps = self.frame_count as f32 / elapsed;
        self.frame_count = 0;
        self.last_update = now;
        Some((fps, frame_time * 1000.0))
    }
}

/// Owns the scene, input, audio and renderer, and runs the main loop.
///
/// Field order matters for Drop: the renderer goes before the window it
/// presents to.
pub struct Engine {
    config: Config,
    scene: Scene,
    keyboard: Keyboard,
    bindings: KeyBindings,
    plugins: Plugins,
    control: LoopControl,
    clock: FrameClock,
    fps: FpsCounter,

    renderer: Option<Renderer>,
    window: Option<Arc<Window>>,
    audio: Option<AudioEngine>,

    quit_key: Option<Key>,
    fullscreen_key: Option<Key>,
    is_fullscreen: bool,
    state: LoopState,
    /// Whether redraw events run frames (`run`) or the caller does (`Game`)
    drives_redraws: bool,
    /// Startup error, reported once the event loop returns
    failure: Option<anyhow::Error>,
}

impl Engine {
    /// Creates an engine. Nothing is opened until the loop starts, except the
    /// audio output when `audio.enabled` is set.
    pub fn new(mut config: Config) -> Self {
        if let Err(e) = config.validate() {
            log::warn!("Invalid config, using nearest valid values: {:#}", e);
            config.clamp_to_limits();
        }

        let audio = if config.audio.enabled {
            match AudioEngine::new(config.audio.sound_dir.clone()) {
                Ok(audio) => Some(audio),
                Err(e) => {
                    log::warn!("Continuing without sound: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            quit_key: config.controls.quit(),
            fullscreen_key: config.controls.fullscreen(),
            is_fullscreen: config.window.fullscreen,
            config,
            scene: Scene::new(),
            keyboard: Keyboard::new(),
            bindings: KeyBindings::new(),
            plugins: Plugins::default(),
            control: LoopControl::default(),
            clock: FrameClock::new(),
            fps: FpsCounter::new(Instant::now()),
            renderer: None,
            window: None,
            audio,
            state: LoopState::Idle,
            drives_redraws: false,
            failure: None,
        }
    }

    /// Loads and validates the configuration at `path` first.
    pub fn with_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::load_from_path(path)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a plugin. Once the loop is running its `init` hook runs
    /// right away, otherwise together with the others when the window opens.
    pub fn add_plugin<P: Plugin + 'static>(&mut self, plugin: P) -> &mut Self {
        let mut plugin: Box<dyn Plugin> = Box::new(plugin);
        if self.state == LoopState::Running {
            let (mut ctx, _, _) = self.parts();
            log::debug!("init {}", plugin.name());
            plugin.init(&mut ctx);
        }
        self.plugins.add(plugin);
        self
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut Keyboard {
        &mut self.keyboard
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.bindings
    }

    pub fn audio(&self) -> Option<&AudioEngine> {
        self.audio.as_ref()
    }

    pub fn create_sound(&self, file_name: &str, looping: bool) -> HopResult<Sound> {
        self.audio
            .as_ref()
            .ok_or(HopError::AudioUnavailable)?
            .create_sound(file_name, looping)
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_deref()
    }

    /// True between opening the window and shutting down.
    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Asks the loop to end after the current frame.
    pub fn stop(&mut self) {
        self.control.request_stop();
    }

    pub fn stop_requested(&self) -> bool {
        self.control.stop_requested()
    }

    /// Inner window size in physical pixels, or the configured size before
    /// the window exists.
    pub fn window_size(&self) -> (u32, u32) {
        match &self.window {
            Some(window) => {
                let size = window.inner_size();
                (size.width, size.height)
            }
            None => (self.config.window.width, self.config.window.height),
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        self.is_fullscreen
    }

    /// Switches between borderless fullscreen and windowed mode. Before the
    /// window exists this only changes how it will be opened.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.is_fullscreen = fullscreen;
        self.config.window.fullscreen = fullscreen;

        let Some(window) = &self.window else {
            return;
        };
        if fullscreen {
            // Enter fullscreen (use current monitor)
            window.set_fullscreen(Some(Fullscreen::Borderless(None)));
            log::info!("Entered fullscreen mode");
        } else {
            window.set_fullscreen(None);
            log::info!("Exited fullscreen mode");
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.needs_resize = true;
        }
    }

    pub(crate) fn request_window_size(&mut self, width: u32, height: u32) {
        self.config.window.width = width;
        self.config.window.height = height;
        if let Some(window) = &self.window {
            let _ = window.request_inner_size(PhysicalSize::new(width, height));
        }
    }

    /// Runs the main loop until the window closes or a plugin stops it.
    pub fn run(mut self) -> Result<()> {
        let event_loop = EventLoop::new().context("Failed to create event loop")?;
        // Render continuously instead of waiting for events
        event_loop.set_control_flow(ControlFlow::Poll);

        self.drives_redraws = true;
        event_loop
            .run_app(&mut self)
            .context("Event loop terminated with an error")?;
        self.shutdown();

        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // =========================================================================
    // LOOP STEPS
    // =========================================================================

    /// Context for plugins and bindings, next to the containers that call them.
    fn parts(&mut self) -> (PluginContext<'_>, &mut Plugins, &mut KeyBindings) {
        let window_size = self.window_size();
        let ctx = PluginContext::new(
            &mut self.scene,
            &self.keyboard,
            self.audio.as_ref(),
            &mut self.control,
            window_size,
        );
        (ctx, &mut self.plugins, &mut self.bindings)
    }

    fn open_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_config = &self.config.window;
        log::info!(
            "Window: {}x{} ({})",
            window_config.width,
            window_config.height,
            if self.is_fullscreen { "fullscreen" } else { "windowed" }
        );

        let mut window_attributes = WindowAttributes::default()
            .with_title(&window_config.title)
            .with_resizable(window_config.resizable)
            .with_inner_size(PhysicalSize::new(window_config.width, window_config.height));

        if self.is_fullscreen {
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );
        let renderer =
            Renderer::new(window.clone(), &self.config).context("Failed to initialize Vulkan")?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.state = LoopState::Running;

        let (mut ctx, plugins, _) = self.parts();
        plugins.init(&mut ctx);

        self.clock.reset();
        self.fps = FpsCounter::new(Instant::now());
        Ok(())
    }

    /// Fires key bindings for this frame's presses and repeats.
    pub(crate) fn dispatch_bindings(&mut self) {
        let triggered = self.keyboard.triggered_keys();
        if triggered.is_empty() {
            return;
        }
        let (mut ctx, _, bindings) = self.parts();
        for key in triggered {
            bindings.dispatch(key, &mut ctx);
        }
    }

    pub(crate) fn render(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        match renderer.render(&self.scene) {
            Ok(true) => self.update_fps(),
            Ok(false) => {}
            Err(e) => log::error!("Render error: {:?}", e),
        }
    }

    /// Measures the frame time and updates plugins.
    pub(crate) fn advance(&mut self) {
        let time = self.clock.tick();
        let (mut ctx, plugins, _) = self.parts();
        plugins.update(&mut ctx, time.dt);
    }

    /// Sleeps off what is left of the configured frame budget.
    pub(crate) fn pace(&self) {
        let remaining = self.clock.remaining(self.config.frame_budget());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    fn frame(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        self.dispatch_bindings();
        self.render();
        self.advance();
        self.keyboard.end_frame();
    }

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }
        let Some((fps, frame_ms)) = self.fps.frame(Instant::now()) else {
            return;
        };
        if let Some(window) = &self.window {
            let mode = if self.is_fullscreen { "fullscreen" } else { "windowed" };
            window.set_title(&format!(
                "{} - {:.0} FPS ({:.2}ms) [{}]",
                self.config.window.title, fps, frame_ms, mode
            ));
        }
    }

    fn handle_key(&mut self, key: Key, pressed: bool, repeat: bool) {
        self.keyboard.key_event(key, pressed, repeat);
        if !pressed || repeat {
            return;
        }

        if Some(key) == self.quit_key {
            log::info!("{:?} pressed, exiting...", key);
            self.control.request_stop();
        } else if Some(key) == self.fullscreen_key {
            let fullscreen = !self.is_fullscreen;
            self.set_fullscreen(fullscreen);
        }
    }

    /// Ends the loop: waits for the GPU, closes plugins, then releases the
    /// renderer and the window. Runs once.
    pub(crate) fn shutdown(&mut self) {
        if self.state != LoopState::Running {
            return;
        }
        self.state = LoopState::Closed;
        log::info!("Shutting down...");

        if let Some(renderer) = &self.renderer {
            if let Err(e) = renderer.wait_idle() {
                log::warn!("Device did not go idle: {:#}", e);
            }
        }

        let (mut ctx, plugins, _) = self.parts();
        plugins.close(&mut ctx);

        // Reverse order of creation
        self.renderer = None;
        self.window = None;
    }

    pub(crate) fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for Engine {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state != LoopState::Idle {
            return;
        }

        if let Err(e) = self.open_window(event_loop) {
            log::error!("Failed to start: {:?}", e);
            self.failure = Some(e);
            self.state = LoopState::Closed;
            self.control.request_stop();
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.control.request_stop();
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.resized(size.width, size.height);
                }
            }

            WindowEvent::Focused(false) => self.keyboard.release_all(),

            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    if let Some(key) = Key::from_key_code(code) {
                        self.handle_key(key, event.state.is_pressed(), event.repeat);
                    }
                }
            }

            WindowEvent::RedrawRequested if self.drives_redraws => self.frame(),

            _ => {}
        }
    }

    /// Called when the event loop is about to block waiting for events.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.control.stop_requested() {
            event_loop.exit();
            return;
        }
        if self.drives_redraws {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RED;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.audio.enabled = false;
        config
    }

    #[test]
    fn fps_reports_once_per_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        for i in 1..10 {
            assert!(fps.frame(start + Duration::from_millis(100 * i)).is_none());
        }
        let (rate, frame_ms) = fps.frame(start + Duration::from_millis(1000)).unwrap();
        assert!((rate - 10.0).abs() < 1e-3);
        assert!((frame_ms - 100.0).abs() < 1e-3);
        assert!(fps.frame(start + Duration::from_millis(1100)).is_none());
    }

    #[test]
    fn controls_come_from_config() {
        let mut config = quiet_config();
        config.controls.quit_key = "q".into();
        config.controls.fullscreen_key = String::new();
        let mut engine = Engine::new(config);

        engine.handle_key(Key::F11, true, false);
        assert!(!engine.is_fullscreen());

        engine.handle_key(Key::Q, true, true);
        assert!(!engine.stop_requested());
        engine.handle_key(Key::Q, true, false);
        assert!(engine.stop_requested());
    }

    #[test]
    fn fullscreen_key_toggles_before_window_exists() {
        let mut engine = Engine::new(quiet_config());
        engine.handle_key(Key::F11, true, false);
        assert!(engine.is_fullscreen());
        assert!(engine.config().window.fullscreen);
        engine.handle_key(Key::F11, false, false);
        engine.handle_key(Key::F11, true, false);
        assert!(!engine.is_fullscreen());
    }

    #[test]
    fn bindings_fire_for_presses_and_repeats() {
        let mut engine = Engine::new(quiet_config());
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        engine.bindings_mut().bind(Key::Space, move |ctx| {
            *counter.borrow_mut() += 1;
            ctx.scene.add_rectangle(0.0, 0.0, 2.0, 2.0, RED);
        });

        engine.handle_key(Key::Space, true, false);
        engine.dispatch_bindings();
        engine.keyboard_mut().end_frame();

        // held without repeat: nothing
        engine.dispatch_bindings();
        engine.handle_key(Key::Space, true, true);
        engine.dispatch_bindings();

        assert_eq!(*hits.borrow(), 2);
        assert_eq!(engine.scene().len(), 2);
    }

    #[test]
    fn no_window_before_start() {
        let mut engine = Engine::new(quiet_config());
        assert!(!engine.is_running());
        assert!(engine.window().is_none());
        assert_eq!(engine.window_size(), (800, 800));
        assert!(matches!(
            engine.create_sound("beep.wav", false),
            Err(HopError::AudioUnavailable)
        ));
        // nothing to close yet
        engine.shutdown();
        assert!(!engine.is_running());
    }

    #[test]
    fn out_of_range_config_is_clamped() {
        let mut config = quiet_config();
        config.graphics.max_frames_in_flight = 0;
        config.window.height = 20;
        let engine = Engine::new(config);
        assert_eq!(engine.config().graphics.max_frames_in_flight, 1);
        assert_eq!(engine.window_size(), (800, 100));
    }

    #[test]
    fn late_plugins_are_initialized() {
        struct Spawner;
        impl Plugin for Spawner {
            fn init(&mut self, ctx: &mut PluginContext<'_>) {
                ctx.scene.add_rectangle(0.0, 0.0, 4.0, 4.0, RED);
            }
        }

        let mut engine = Engine::new(quiet_config());
        engine.add_plugin(Spawner);
        assert!(engine.scene().is_empty());

        engine.state = LoopState::Running;
        engine.add_plugin(Spawner);
        assert_eq!(engine.scene().len(), 1);
        assert_eq!(engine.plugins.len(), 2);
    }

    #[test]
    fn plugins_update_without_a_window() {
        struct Mover;
        impl Plugin for Mover {
            fn update(&mut self, ctx: &mut PluginContext<'_>, dt: f32) {
                assert!(dt > 0.0);
                ctx.scene.add_circle(10.0, 10.0, 5.0, RED);
                ctx.stop();
            }
        }

        let mut engine = Engine::new(quiet_config());
        engine.add_plugin(Mover);
        engine.advance();
        assert_eq!(engine.scene().len(), 1);
        assert!(engine.stop_requested());
    }
}
