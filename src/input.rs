// Keyboard input - valid keys, per-frame key state, key bindings

use crate::error::{HopError, HopResult};
use crate::plugin::Context;
use std::collections::{BTreeSet, HashMap};
use winit::keyboard::KeyCode;

/// Keys a game can monitor or bind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Space,
    Comma,
    Semicolon,
    Equal,
    BracketLeft,
    Backslash,
    BracketRight,

    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Escape,
    Enter,
    Tab,
    Backspace,
    Insert,
    Delete,
    Right,
    Left,
    Down,
    Up,
    CapsLock,

    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    Numpad0, Numpad1, Numpad2, Numpad3, Numpad4,
    Numpad5, Numpad6, Numpad7, Numpad8, Numpad9,

    ShiftLeft,
    ControlLeft,
    AltLeft,
    ShiftRight,
    ControlRight,
    AltRight,
}

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];

const DIGITS: [Key; 10] = [
    Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
    Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
];

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6,
    Key::F7, Key::F8, Key::F9, Key::F10, Key::F11, Key::F12,
];

impl Key {
    /// Parses a key name: a single letter/digit/punctuation character, or
    /// one of the named keys (`SPACE`, `ENTER`, `TAB`, `UP`, `DOWN`, `LEFT`,
    /// `RIGHT`, `ESCAPE`, `BACKSPACE`, `F1`..`F12`), upper or lower case.
    pub fn from_name(name: &str) -> Option<Key> {
        let mut chars = name.chars();
        if let (Some(c), None) = (chars.next(), chars.clone().next()) {
            return Self::from_char(c);
        }

        let upper = name.to_ascii_uppercase();
        let key = match upper.as_str() {
            "SPACE" => Key::Space,
            "ENTER" | "RETURN" => Key::Enter,
            "TAB" => Key::Tab,
            "UP" => Key::Up,
            "DOWN" => Key::Down,
            "LEFT" => Key::Left,
            "RIGHT" => Key::Right,
            "ESCAPE" | "ESC" => Key::Escape,
            "BACKSPACE" => Key::Backspace,
            "INSERT" => Key::Insert,
            "DELETE" => Key::Delete,
            "CAPSLOCK" => Key::CapsLock,
            _ => {
                let n: usize = upper.strip_prefix('F')?.parse().ok()?;
                return FUNCTION_KEYS.get(n.checked_sub(1)?).copied();
            }
        };
        Some(key)
    }

    pub fn from_char(c: char) -> Option<Key> {
        let c = c.to_ascii_uppercase();
        match c {
            'A'..='Z' => Some(LETTERS[(c as u8 - b'A') as usize]),
            '0'..='9' => Some(DIGITS[(c as u8 - b'0') as usize]),
            ' ' => Some(Key::Space),
            ',' => Some(Key::Comma),
            ';' => Some(Key::Semicolon),
            '=' => Some(Key::Equal),
            '[' => Some(Key::BracketLeft),
            '\\' => Some(Key::Backslash),
            ']' => Some(Key::BracketRight),
            _ => None,
        }
    }

    /// Maps a physical winit key. Keys outside the supported set give `None`.
    pub fn from_key_code(code: KeyCode) -> Option<Key> {
        use KeyCode as K;
        let key = match code {
            K::Space => Key::Space,
            K::Comma => Key::Comma,
            K::Semicolon => Key::Semicolon,
            K::Equal => Key::Equal,
            K::BracketLeft => Key::BracketLeft,
            K::Backslash => Key::Backslash,
            K::BracketRight => Key::BracketRight,
            K::Digit0 => Key::Digit0,
            K::Digit1 => Key::Digit1,
            K::Digit2 => Key::Digit2,
            K::Digit3 => Key::Digit3,
            K::Digit4 => Key::Digit4,
            K::Digit5 => Key::Digit5,
            K::Digit6 => Key::Digit6,
            K::Digit7 => Key::Digit7,
            K::Digit8 => Key::Digit8,
            K::Digit9 => Key::Digit9,
            K::KeyA => Key::A,
            K::KeyB => Key::B,
            K::KeyC => Key::C,
            K::KeyD => Key::D,
            K::KeyE => Key::E,
            K::KeyF => Key::F,
            K::KeyG => Key::G,
            K::KeyH => Key::H,
            K::KeyI => Key::I,
            K::KeyJ => Key::J,
            K::KeyK => Key::K,
            K::KeyL => Key::L,
            K::KeyM => Key::M,
            K::KeyN => Key::N,
            K::KeyO => Key::O,
            K::KeyP => Key::P,
            K::KeyQ => Key::Q,
            K::KeyR => Key::R,
            K::KeyS => Key::S,
            K::KeyT => Key::T,
            K::KeyU => Key::U,
            K::KeyV => Key::V,
            K::KeyW => Key::W,
            K::KeyX => Key::X,
            K::KeyY => Key::Y,
            K::KeyZ => Key::Z,
            K::Escape => Key::Escape,
            K::Enter => Key::Enter,
            K::Tab => Key::Tab,
            K::Backspace => Key::Backspace,
            K::Insert => Key::Insert,
            K::Delete => Key::Delete,
            K::ArrowRight => Key::Right,
            K::ArrowLeft => Key::Left,
            K::ArrowDown => Key::Down,
            K::ArrowUp => Key::Up,
            K::CapsLock => Key::CapsLock,
            K::F1 => Key::F1,
            K::F2 => Key::F2,
            K::F3 => Key::F3,
            K::F4 => Key::F4,
            K::F5 => Key::F5,
            K::F6 => Key::F6,
            K::F7 => Key::F7,
            K::F8 => Key::F8,
            K::F9 => Key::F9,
            K::F10 => Key::F10,
            K::F11 => Key::F11,
            K::F12 => Key::F12,
            K::Numpad0 => Key::Numpad0,
            K::Numpad1 => Key::Numpad1,
            K::Numpad2 => Key::Numpad2,
            K::Numpad3 => Key::Numpad3,
            K::Numpad4 => Key::Numpad4,
            K::Numpad5 => Key::Numpad5,
            K::Numpad6 => Key::Numpad6,
            K::Numpad7 => Key::Numpad7,
            K::Numpad8 => Key::Numpad8,
            K::Numpad9 => Key::Numpad9,
            K::ShiftLeft => Key::ShiftLeft,
            K::ControlLeft => Key::ControlLeft,
            K::AltLeft => Key::AltLeft,
            K::ShiftRight => Key::ShiftRight,
            K::ControlRight => Key::ControlRight,
            K::AltRight => Key::AltRight,
            _ => return None,
        };
        Some(key)
    }
}

/// Key state for the current frame.
///
/// Only monitored keys show up in the queries. Transitions recorded with
/// [`Keyboard::key_event`] stay visible until [`Keyboard::end_frame`].
#[derive(Debug, Default)]
pub struct Keyboard {
    monitored: BTreeSet<Key>,
    down: BTreeSet<Key>,
    pressed: BTreeSet<Key>,
    repeated: BTreeSet<Key>,
    released: BTreeSet<Key>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts reporting `key`. Returns false if it was already monitored.
    pub fn monitor(&mut self, key: Key) -> bool {
        self.monitored.insert(key)
    }

    pub fn unmonitor(&mut self, key: Key) -> bool {
        self.monitored.remove(&key)
    }

    pub fn is_monitored(&self, key: Key) -> bool {
        self.monitored.contains(&key)
    }

    /// Records a key transition from the window.
    pub fn key_event(&mut self, key: Key, pressed: bool, repeat: bool) {
        if pressed {
            if repeat || !self.down.insert(key) {
                self.repeated.insert(key);
            } else {
                self.pressed.insert(key);
            }
        } else if self.down.remove(&key) {
            self.released.insert(key);
        }
    }

    /// Releases everything; used when the window loses focus.
    pub fn release_all(&mut self) {
        let down = std::mem::take(&mut self.down);
        self.released.extend(down);
    }

    /// Clears per-frame transitions. Call once after a frame's input was consumed.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.repeated.clear();
        self.released.clear();
    }

    /// Whether `key` is physically down, monitored or not.
    pub fn is_down(&self, key: Key) -> bool {
        self.down.contains(&key)
    }

    /// Went down this frame.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.is_monitored(key) && self.pressed.contains(&key)
    }

    /// Down, and already down before this frame (or auto-repeating).
    pub fn key_held(&self, key: Key) -> bool {
        self.is_monitored(key)
            && self.down.contains(&key)
            && (!self.pressed.contains(&key) || self.repeated.contains(&key))
    }

    /// Went up this frame.
    pub fn key_released(&self, key: Key) -> bool {
        self.is_monitored(key) && self.released.contains(&key)
    }

    pub fn pressed_keys(&self) -> Vec<Key> {
        self.monitored.intersection(&self.pressed).copied().collect()
    }

    pub fn held_keys(&self) -> Vec<Key> {
        self.monitored
            .iter()
            .copied()
            .filter(|k| self.key_held(*k))
            .collect()
    }

    pub fn released_keys(&self) -> Vec<Key> {
        self.monitored.intersection(&self.released).copied().collect()
    }

    /// Keys that went down or auto-repeated this frame, monitored or not.
    /// These are the ones key bindings fire for.
    pub fn triggered_keys(&self) -> Vec<Key> {
        self.pressed.union(&self.repeated).copied().collect()
    }
}

pub type KeyCallback = Box<dyn FnMut(&mut Context<'_>)>;

/// Callbacks fired when a key goes down or auto-repeats.
#[derive(Default)]
pub struct KeyBindings {
    bindings: HashMap<Key, Vec<KeyCallback>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<F>(&mut self, key: Key, callback: F)
    where
        F: FnMut(&mut Context<'_>) + 'static,
    {
        self.bindings.entry(key).or_default().push(Box::new(callback));
    }

    /// Binds by key name, see [`Key::from_name`].
    pub fn bind_name<F>(&mut self, name: &str, callback: F) -> HopResult<Key>
    where
        F: FnMut(&mut Context<'_>) + 'static,
    {
        let key = Key::from_name(name).ok_or_else(|| HopError::UnknownKey(name.to_string()))?;
        self.bind(key, callback);
        Ok(key)
    }

    pub fn unbind(&mut self, key: Key) {
        self.bindings.remove(&key);
    }

    pub fn is_bound(&self, key: Key) -> bool {
        self.bindings.get(&key).is_some_and(|v| !v.is_empty())
    }

    /// Runs every callback bound to `key`, in bind order.
    pub fn dispatch(&mut self, key: Key, ctx: &mut Context<'_>) {
        if let Some(callbacks) = self.bindings.get_mut(&key) {
            for callback in callbacks.iter_mut() {
                callback(ctx);
            }
        }
    }
}

impl std::fmt::Debug for KeyBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.bindings.keys().collect();
        keys.sort();
        f.debug_struct("KeyBindings").field("keys", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RED;
    use crate::plugin::LoopControl;
    use crate::scene::Scene;

    #[test]
    fn names_parse_case_insensitively() {
        assert_eq!(Key::from_name("space"), Some(Key::Space));
        assert_eq!(Key::from_name("SPACE"), Some(Key::Space));
        assert_eq!(Key::from_name("Up"), Some(Key::Up));
        assert_eq!(Key::from_name("a"), Some(Key::A));
        assert_eq!(Key::from_name("7"), Some(Key::Digit7));
        assert_eq!(Key::from_name("f11"), Some(Key::F11));
        assert_eq!(Key::from_name("Escape"), Some(Key::Escape));
    }

    #[test]
    fn bad_names_are_rejected() {
        assert_eq!(Key::from_name(""), None);
        assert_eq!(Key::from_name("F13"), None);
        assert_eq!(Key::from_name("F0"), None);
        assert_eq!(Key::from_name("hyper"), None);
        assert_eq!(Key::from_name("#"), None);
    }

    #[test]
    fn key_codes_map_to_keys() {
        assert_eq!(Key::from_key_code(KeyCode::KeyQ), Some(Key::Q));
        assert_eq!(Key::from_key_code(KeyCode::ArrowUp), Some(Key::Up));
        assert_eq!(Key::from_key_code(KeyCode::Numpad3), Some(Key::Numpad3));
        assert_eq!(Key::from_key_code(KeyCode::PrintScreen), None);
    }

    #[test]
    fn unmonitored_keys_are_not_reported() {
        let mut kb = Keyboard::new();
        kb.key_event(Key::Up, true, false);
        assert!(kb.is_down(Key::Up));
        assert!(!kb.key_pressed(Key::Up));
        assert!(kb.pressed_keys().is_empty());

        kb.monitor(Key::Up);
        assert!(kb.key_pressed(Key::Up));
    }

    #[test]
    fn press_hold_release_cycle() {
        let mut kb = Keyboard::new();
        kb.monitor(Key::Down);

        kb.key_event(Key::Down, true, false);
        assert!(kb.key_pressed(Key::Down));
        assert!(!kb.key_held(Key::Down));
        kb.end_frame();

        assert!(!kb.key_pressed(Key::Down));
        assert!(kb.key_held(Key::Down));
        assert_eq!(kb.held_keys(), vec![Key::Down]);
        kb.end_frame();

        kb.key_event(Key::Down, false, false);
        assert!(kb.key_released(Key::Down));
        assert!(!kb.key_held(Key::Down));
        kb.end_frame();
        assert!(kb.released_keys().is_empty());
    }

    #[test]
    fn repeat_counts_as_held() {
        let mut kb = Keyboard::new();
        kb.monitor(Key::Space);
        kb.key_event(Key::Space, true, false);
        kb.key_event(Key::Space, true, true);
        assert!(kb.key_pressed(Key::Space));
        assert!(kb.key_held(Key::Space));
    }

    #[test]
    fn triggers_ignore_monitoring() {
        let mut kb = Keyboard::new();
        kb.key_event(Key::B, true, false);
        kb.key_event(Key::A, true, false);
        kb.key_event(Key::A, true, true);
        assert_eq!(kb.triggered_keys(), vec![Key::A, Key::B]);
        kb.end_frame();
        assert!(kb.triggered_keys().is_empty());
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut kb = Keyboard::new();
        kb.monitor(Key::A);
        kb.key_event(Key::A, true, false);
        kb.end_frame();
        kb.release_all();
        assert!(!kb.is_down(Key::A));
        assert_eq!(kb.released_keys(), vec![Key::A]);
    }

    #[test]
    fn bindings_run_in_order() {
        let mut scene = Scene::new();
        let keyboard = Keyboard::new();
        let mut control = LoopControl::default();
        let mut ctx = Context::new(&mut scene, &keyboard, None, &mut control, (800, 600));

        let mut bindings = KeyBindings::new();
        bindings.bind(Key::Space, |ctx| {
            ctx.scene.add_rectangle(0.0, 0.0, 1.0, 1.0, RED);
        });
        bindings
            .bind_name("space", |ctx| {
                assert_eq!(ctx.scene.len(), 1);
                ctx.stop();
            })
            .unwrap();

        bindings.dispatch(Key::Space, &mut ctx);
        bindings.dispatch(Key::Enter, &mut ctx);
        assert!(ctx.is_stopping());
        assert_eq!(ctx.scene.len(), 1);
    }

    #[test]
    fn binding_unknown_name_fails() {
        let mut bindings = KeyBindings::new();
        assert!(matches!(
            bindings.bind_name("warp", |_| {}),
            Err(HopError::UnknownKey(_))
        ));
        assert!(!bindings.is_bound(Key::Space));
    }
}
