//! Input state tracking driven by discrete platform events.
//!
//! - **Level state (pressed):** `is_pressed(key)` reflects the physical state
//!   reported by the most recent key event for that key.
//!
//! - **Edge state (toggled):** `is_toggled(key)` is true only during the frame in
//!   which the pressed state changed. The run loop calls `clear_toggles()` exactly
//!   once per completed frame, after the per-frame callback has observed them. The
//!   edge is a diff against the pressed state at the last clear, not against the
//!   state left by the previous event. A press and a release inside one frame
//!   cancel out, a repeat while already held never produces an edge, and a press
//!   followed by a repeat in the same frame keeps its press edge.
//!
//! Every entry point gives the hosted application's [`InputHooks`] first refusal.
//! A consumed event skips the default tracking, except for mouse input while a
//! button is held: position and button tracking then proceed regardless, so a
//! drag stays consistent even if the host starts claiming events halfway through.

use bitflags::bitflags;

use crate::profiler::Profiler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Left,
    Right,
    Up,
    Down,
    Escape,
    Space,
    Enter,
    Tab,
    Backspace,
    LeftShift,
    RightShift,
    LeftControl,
    RightControl,
    LeftAlt,
    RightAlt,
}

impl Key {
    /// Size of a table indexed by [`Key::index`].
    pub const COUNT: usize = Key::RightAlt as usize + 1;

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Press,
    Release,
    Repeat,
}

bitflags! {
    /// Modifier keys held while a key, char or button event was generated.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const SUPER   = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

bitflags! {
    /// Set of mouse buttons currently held.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u8 {
        const LEFT   = 0b001;
        const MIDDLE = 0b010;
        const RIGHT  = 0b100;
    }
}

impl MouseButton {
    pub fn flag(self) -> MouseButtons {
        match self {
            Self::Left => MouseButtons::LEFT,
            Self::Middle => MouseButtons::MIDDLE,
            Self::Right => MouseButtons::RIGHT,
        }
    }
}

/// A raw event as delivered by a [`crate::Platform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Motion {
        x: i32,
        y: i32,
    },
    MouseButton {
        button: MouseButton,
        action: ButtonAction,
        mods: Modifiers,
    },
    Key {
        key: Key,
        action: ButtonAction,
        mods: Modifiers,
    },
    Char {
        ch: char,
        mods: Modifiers,
    },
    Wheel {
        delta: i32,
    },
    Resize {
        width: u32,
        height: u32,
    },
}

/// Hosted-application capability interface for input.
///
/// Each predicate returns `true` when the host consumed the event, which
/// suppresses the default state tracking for it.
pub trait InputHooks {
    fn resize(&mut self, _width: u32, _height: u32) {}

    fn mouse_pos(&mut self, _x: i32, _y: i32) -> bool {
        false
    }

    fn mouse_button(
        &mut self,
        _button: MouseButton,
        _action: ButtonAction,
        _mods: Modifiers,
    ) -> bool {
        false
    }

    fn mouse_wheel(&mut self, _delta: i32) -> bool {
        false
    }

    fn key_button(&mut self, _key: Key, _action: ButtonAction, _mods: Modifiers) -> bool {
        false
    }

    fn key_char(&mut self, _ch: char, _mods: Modifiers) -> bool {
        false
    }
}

/// Hooks that never consume anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl InputHooks for PassThrough {}

#[derive(Debug, Clone)]
pub struct InputState {
    pressed: [bool; Key::COUNT],
    toggled: [bool; Key::COUNT],
    // Pressed state at the last `clear_toggles`.
    baseline: [bool; Key::COUNT],
    mouse_buttons: MouseButtons,
    cursor: (i32, i32),
    wheel: i32,
    viewport: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self::with_viewport(0, 0)
    }

    pub fn with_viewport(width: u32, height: u32) -> Self {
        Self {
            pressed: [false; Key::COUNT],
            toggled: [false; Key::COUNT],
            baseline: [false; Key::COUNT],
            mouse_buttons: MouseButtons::empty(),
            cursor: (0, 0),
            wheel: 0,
            viewport: (width, height),
        }
    }

    pub fn dispatch<H: InputHooks + ?Sized>(
        &mut self,
        event: Event,
        hooks: &mut H,
        profiler: &mut Profiler,
    ) {
        match event {
            Event::Motion { x, y } => self.on_motion(x, y, hooks),
            Event::MouseButton {
                button,
                action,
                mods,
            } => self.on_mouse_button(button, action, mods, hooks, profiler),
            Event::Key { key, action, mods } => self.on_key(key, action, mods, hooks, profiler),
            Event::Char { ch, mods } => self.on_char(ch, mods, hooks, profiler),
            Event::Wheel { delta } => self.on_wheel(delta, hooks, profiler),
            Event::Resize { width, height } => self.on_resize(width, height, hooks, profiler),
        }
    }

    /// The only entry point that leaves the profiler's window intact.
    pub fn on_motion<H: InputHooks + ?Sized>(&mut self, x: i32, y: i32, hooks: &mut H) {
        if self.mouse_buttons.is_empty() && hooks.mouse_pos(x, y) {
            return;
        }
        self.cursor = (x, y);
    }

    pub fn on_mouse_button<H: InputHooks + ?Sized>(
        &mut self,
        button: MouseButton,
        action: ButtonAction,
        mods: Modifiers,
        hooks: &mut H,
        profiler: &mut Profiler,
    ) {
        profiler.reset();

        if self.mouse_buttons.is_empty() && hooks.mouse_button(button, action, mods) {
            return;
        }

        match action {
            ButtonAction::Press => self.mouse_buttons.insert(button.flag()),
            ButtonAction::Release => {
                // A release with nothing held is a leftover from before the window
                // had focus.
                if !self.mouse_buttons.is_empty() {
                    self.mouse_buttons.remove(button.flag());
                }
            }
            ButtonAction::Repeat => {}
        }
    }

    pub fn on_key<H: InputHooks + ?Sized>(
        &mut self,
        key: Key,
        action: ButtonAction,
        mods: Modifiers,
        hooks: &mut H,
        profiler: &mut Profiler,
    ) {
        profiler.reset();

        if hooks.key_button(key, action, mods) {
            return;
        }

        let new_state = matches!(action, ButtonAction::Press | ButtonAction::Repeat);
        let i = key.index();
        self.toggled[i] = self.baseline[i] != new_state;
        self.pressed[i] = new_state;
    }

    /// Text input carries no persistent state; it only reaches the host.
    pub fn on_char<H: InputHooks + ?Sized>(
        &mut self,
        ch: char,
        mods: Modifiers,
        hooks: &mut H,
        profiler: &mut Profiler,
    ) {
        profiler.reset();
        hooks.key_char(ch, mods);
    }

    pub fn on_wheel<H: InputHooks + ?Sized>(
        &mut self,
        delta: i32,
        hooks: &mut H,
        profiler: &mut Profiler,
    ) {
        profiler.reset();

        if hooks.mouse_wheel(delta) {
            return;
        }
        self.wheel += delta;
    }

    /// A zero-sized resize is what minimizing reports on some platforms; it is
    /// dropped without touching the viewport or the host.
    pub fn on_resize<H: InputHooks + ?Sized>(
        &mut self,
        width: u32,
        height: u32,
        hooks: &mut H,
        profiler: &mut Profiler,
    ) {
        profiler.reset();

        if width == 0 && height == 0 {
            return;
        }
        self.viewport = (width, height);
        hooks.resize(width, height);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed[key.index()]
    }

    pub fn is_toggled(&self, key: Key) -> bool {
        self.toggled[key.index()]
    }

    /// Fresh press edge: the key went down during this frame.
    pub fn on_press(&self, key: Key) -> bool {
        self.is_toggled(key) && self.is_pressed(key)
    }

    /// Fresh release edge: the key went up during this frame.
    pub fn on_release(&self, key: Key) -> bool {
        self.is_toggled(key) && !self.is_pressed(key)
    }

    pub fn mouse_buttons(&self) -> MouseButtons {
        self.mouse_buttons
    }

    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(button.flag())
    }

    pub fn cursor(&self) -> (i32, i32) {
        self.cursor
    }

    /// Wheel steps accumulated since the run started.
    pub fn wheel(&self) -> i32 {
        self.wheel
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn clear_toggles(&mut self) {
        self.toggled = [false; Key::COUNT];
        self.baseline = self.pressed;
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
