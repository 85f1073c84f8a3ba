// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable per-frame snapshot, including
// click / double-click / drag classification for the left button.

use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Second click must land within this many seconds of the first.
pub const DOUBLE_CLICK_WINDOW: f32 = 0.35;

/// Pixels the cursor may travel and still count as a click, and as
/// "the same spot" for a double-click.
pub const CLICK_SLOP: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Click {
    Single { x: f32, y: f32 },
    Double { x: f32, y: f32 },
}

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    // Mouse
    pub mouse_position: (f32, f32),
    mouse_prev_position: (f32, f32),
    pub mouse_delta: (f32, f32),

    // Scroll: accumulated vertical scroll this frame, reset in end_frame()
    pub scroll_delta: f32,

    pub window_size: (u32, u32),

    // Left button
    press_origin: Option<(f32, f32)>,
    dragging: bool,
    last_click: Option<(f32, (f32, f32))>,
    clicks: Vec<Click>,

    // Seconds since startup, stamped by the shell each frame
    now: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            mouse_position: (0.0, 0.0),
            mouse_prev_position: (0.0, 0.0),
            mouse_delta: (0.0, 0.0),
            scroll_delta: 0.0,
            window_size: (0, 0),
            press_origin: None,
            dragging: false,
            last_click: None,
            clicks: Vec::new(),
            now: 0.0,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed if !event.repeat => self.key_down(key),
                        ElementState::Pressed => {}
                        ElementState::Released => self.key_up(key),
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.left_button(*state == ElementState::Pressed);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 100.0,
                };
                self.scroll_delta += y;
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            WindowEvent::Focused(false) => {
                self.keys_held.clear();
                self.press_origin = None;
                self.dragging = false;
            }
            _ => {}
        }
    }

    /// Stamp the clock used for double-click timing. Call at the top of each frame.
    pub fn set_time(&mut self, seconds: f32) {
        self.now = seconds;
    }

    pub fn key_down(&mut self, key: KeyCode) {
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) {
        self.mouse_position = (x, y);
        if let Some(origin) = self.press_origin {
            if distance(origin, (x, y)) > CLICK_SLOP {
                self.dragging = true;
            }
        }
    }

    pub fn left_button(&mut self, pressed: bool) {
        if pressed {
            self.press_origin = Some(self.mouse_position);
            self.dragging = false;
            return;
        }
        if self.press_origin.take().is_none() {
            return;
        }
        if std::mem::take(&mut self.dragging) {
            return;
        }

        let at = self.mouse_position;
        let (x, y) = at;
        let is_double = matches!(
            self.last_click,
            Some((t, spot)) if self.now - t <= DOUBLE_CLICK_WINDOW && distance(spot, at) <= CLICK_SLOP
        );
        if is_double {
            self.last_click = None;
            self.clicks.push(Click::Double { x, y });
        } else {
            self.last_click = Some((self.now, at));
            self.clicks.push(Click::Single { x, y });
        }
    }

    /// Clicks completed since the last call, oldest first.
    pub fn take_clicks(&mut self) -> Vec<Click> {
        std::mem::take(&mut self.clicks)
    }

    /// Cursor movement this frame while the left button drags, if it does.
    pub fn drag_delta(&self) -> Option<(f32, f32)> {
        self.dragging.then_some(self.mouse_delta)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.scroll_delta = 0.0;
        self.keys_pressed.clear();
        self.mouse_delta = (
            self.mouse_position.0 - self.mouse_prev_position.0,
            self.mouse_position.1 - self.mouse_prev_position.1,
        );
        self.mouse_prev_position = self.mouse_position;
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// True only on the frame the key went down.
    pub fn was_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn shift_held(&self) -> bool {
        self.is_key_held(KeyCode::ShiftLeft) || self.is_key_held(KeyCode::ShiftRight)
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}
