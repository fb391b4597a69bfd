// Plugins - game code hooked into the engine's main loop
//
// init runs once before the first frame, update once per frame and close once
// after the loop ends. Plugins run in registration order.

use crate::audio::{AudioEngine, Sound};
use crate::error::{HopError, HopResult};
use crate::input::Keyboard;
use crate::scene::Scene;

/// Loop-level requests made from plugins and key bindings.
#[derive(Debug, Default)]
pub struct LoopControl {
    stop_requested: bool,
}

impl LoopControl {
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }
}

/// What a plugin or key binding gets to touch during a callback.
pub struct Context<'a> {
    pub scene: &'a mut Scene,
    keyboard: &'a Keyboard,
    audio: Option<&'a AudioEngine>,
    control: &'a mut LoopControl,
    window_size: (u32, u32),
}

impl<'a> Context<'a> {
    pub fn new(
        scene: &'a mut Scene,
        keyboard: &'a Keyboard,
        audio: Option<&'a AudioEngine>,
        control: &'a mut LoopControl,
        window_size: (u32, u32),
    ) -> Self {
        Self {
            scene,
            keyboard,
            audio,
            control,
            window_size,
        }
    }

    pub fn keyboard(&self) -> &Keyboard {
        self.keyboard
    }

    pub fn audio(&self) -> Option<&AudioEngine> {
        self.audio
    }

    pub fn create_sound(&self, file_name: &str, looping: bool) -> HopResult<Sound> {
        self.audio
            .ok_or(HopError::AudioUnavailable)?
            .create_sound(file_name, looping)
    }

    /// Ends the main loop after the current frame.
    pub fn stop(&mut self) {
        self.control.request_stop();
    }

    pub fn is_stopping(&self) -> bool {
        self.control.stop_requested()
    }

    /// Inner window size in physical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }
}

pub trait Plugin {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn init(&mut self, _ctx: &mut Context<'_>) {}

    /// `dt` is the time since the previous frame in seconds.
    fn update(&mut self, _ctx: &mut Context<'_>, _dt: f32) {}

    fn close(&mut self, _ctx: &mut Context<'_>) {}
}

/// Registered plugins, dispatched in order.
#[derive(Default)]
pub struct Plugins {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Plugins {
    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        log::info!("Registered plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn init(&mut self, ctx: &mut Context<'_>) {
        for plugin in &mut self.plugins {
            log::debug!("init {}", plugin.name());
            plugin.init(ctx);
        }
    }

    pub fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {
        for plugin in &mut self.plugins {
            plugin.update(ctx, dt);
        }
    }

    pub fn close(&mut self, ctx: &mut Context<'_>) {
        for plugin in &mut self.plugins {
            log::debug!("close {}", plugin.name());
            plugin.close(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::WHITE;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        tag: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Plugin for Recorder {
        fn init(&mut self, ctx: &mut Context<'_>) {
            ctx.scene.add_rectangle(0.0, 0.0, 10.0, 10.0, WHITE);
            self.log.borrow_mut().push(format!("{} init", self.tag));
        }

        fn update(&mut self, ctx: &mut Context<'_>, dt: f32) {
            self.log.borrow_mut().push(format!("{} update {}", self.tag, dt));
            if ctx.scene.len() >= 2 {
                ctx.stop();
            }
        }

        fn close(&mut self, _ctx: &mut Context<'_>) {
            self.log.borrow_mut().push(format!("{} close", self.tag));
        }
    }

    struct Silent;
    impl Plugin for Silent {}

    #[test]
    fn hooks_run_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut plugins = Plugins::default();
        for tag in ["a", "b"] {
            plugins.add(Box::new(Recorder { tag, log: log.clone() }));
        }
        plugins.add(Box::new(Silent));
        assert_eq!(plugins.len(), 3);

        let mut scene = Scene::new();
        let keyboard = Keyboard::new();
        let mut control = LoopControl::default();
        let mut ctx = Context::new(&mut scene, &keyboard, None, &mut control, (800, 800));

        plugins.init(&mut ctx);
        plugins.update(&mut ctx, 0.5);
        plugins.close(&mut ctx);

        assert_eq!(
            *log.borrow(),
            vec!["a init", "b init", "a update 0.5", "b update 0.5", "a close", "b close"]
        );
        assert!(ctx.is_stopping());
        assert_eq!(ctx.window_size(), (800, 800));
    }

    #[test]
    fn sounds_need_audio() {
        let mut scene = Scene::new();
        let keyboard = Keyboard::new();
        let mut control = LoopControl::default();
        let ctx = Context::new(&mut scene, &keyboard, None, &mut control, (100, 100));
        assert!(matches!(
            ctx.create_sound("bounce.wav", false),
            Err(HopError::AudioUnavailable)
        ));
    }

    #[test]
    fn default_name_is_type_name() {
        assert!(Silent.name().ends_with("Silent"));
    }
}
