// Interaction controller: owns the view state and maps keyboard input and
// picked clicks onto it. The composer only ever reads the result.

use explode_view::assembly::registry::Registry;
use explode_view::assembly::view::{SelectionChange, ViewState};
use explode_view::engine::input::InputState;
use glam::Vec3;
use winit::keyboard::KeyCode;

/// Moving-part translation, world units per second.
pub const MOVE_SPEED: f32 = 1.5;
/// Moving-part rotation, radians per second.
pub const ROTATE_SPEED: f32 = 1.5;
pub const WEAR_STEP: f32 = 0.1;

/// Requests the controller cannot satisfy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellAction {
    Quit,
    ToggleStats,
    ToggleAutoRotate,
}

const TRANSLATE_KEYS: [(KeyCode, Vec3); 6] = [
    (KeyCode::ArrowLeft, Vec3::NEG_X),
    (KeyCode::ArrowRight, Vec3::X),
    (KeyCode::ArrowUp, Vec3::NEG_Z),
    (KeyCode::ArrowDown, Vec3::Z),
    (KeyCode::PageUp, Vec3::Y),
    (KeyCode::PageDown, Vec3::NEG_Y),
];

const ROTATE_KEYS: [(KeyCode, Vec3); 6] = [
    (KeyCode::KeyQ, Vec3::Y),
    (KeyCode::KeyE, Vec3::NEG_Y),
    (KeyCode::KeyR, Vec3::X),
    (KeyCode::KeyF, Vec3::NEG_X),
    (KeyCode::KeyZ, Vec3::Z),
    (KeyCode::KeyC, Vec3::NEG_Z),
];

pub struct Controller {
    pub view: ViewState,
}

impl Controller {
    pub fn new(registry: &Registry, exploded: bool) -> Self {
        let mut view = ViewState::seeded(registry);
        view.exploded = exploded;
        Self { view }
    }

    /// Apply a click or double-click outcome from the composer.
    pub fn apply_selection(&mut self, change: SelectionChange) {
        self.view.apply(change);
    }

    /// Process this frame's keyboard input.
    pub fn update(&mut self, input: &InputState, registry: &Registry, dt: f32) -> Vec<ShellAction> {
        let mut actions = Vec::new();
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        if input.was_pressed(KeyCode::Escape) {
            actions.push(ShellAction::Quit);
        }
        if input.was_pressed(KeyCode::F3) {
            actions.push(ShellAction::ToggleStats);
        }
        if input.was_pressed(KeyCode::KeyT) {
            actions.push(ShellAction::ToggleAutoRotate);
        }

        if input.was_pressed(KeyCode::Space) {
            self.view.exploded = !self.view.exploded;
            log::info!("{}", if self.view.exploded { "exploding" } else { "assembling" });
        }
        if input.was_pressed(KeyCode::KeyB) {
            self.view.visibility.clear();
        }
        if input.was_pressed(KeyCode::Enter) {
            self.view.moving = None;
        }
        if input.was_pressed(KeyCode::Digit0) && input.shift_held() {
            self.view.wear.clear();
        }

        if let Some(id) = self.view.selected.clone() {
            self.selected_keys(input, registry, &id);
        }

        if let Some(id) = self.view.moving.clone() {
            self.nudge(input, &id, dt);
        }

        actions
    }

    fn selected_keys(&mut self, input: &InputState, registry: &Registry, id: &str) {
        let Some(spec) = registry.get(id) else { return };
        let kind = spec.kind();

        if input.was_pressed(KeyCode::KeyO) && kind.is_hinged() {
            let open = !self.view.is_open(id);
            self.view.open.insert(id.to_string(), open);
        }
        if input.was_pressed(KeyCode::Backspace) {
            self.view.offsets.remove(id);
            self.view.rotations.remove(id);
        }
        if kind.has_wear() {
            let step = match (input.was_pressed(KeyCode::Equal), input.was_pressed(KeyCode::Minus)) {
                (true, false) => WEAR_STEP,
                (false, true) => -WEAR_STEP,
                _ => 0.0,
            };
            if step != 0.0 {
                let wear = (self.view.wear(id) + step).clamp(0.0, 1.0);
                self.view.wear.insert(id.to_string(), wear);
            }
            if input.was_pressed(KeyCode::Digit0) && !input.shift_held() {
                self.view.wear.insert(id.to_string(), 0.0);
            }
        }
        if input.was_pressed(KeyCode::KeyV) {
            self.view.visibility.insert(id.to_string(), false);
            self.view.selected = None;
            if self.view.is_moving(id) {
                self.view.moving = None;
            }
        }
    }

    fn nudge(&mut self, input: &InputState, id: &str, dt: f32) {
        let held = |keys: &[(KeyCode, Vec3)]| {
            keys.iter()
                .filter(|(key, _)| input.is_key_held(*key))
                .map(|(_, dir)| *dir)
                .sum::<Vec3>()
        };

        let translate = held(&TRANSLATE_KEYS[..]);
        if translate != Vec3::ZERO {
            *self.view.offsets.entry(id.to_string()).or_insert(Vec3::ZERO) += translate * MOVE_SPEED * dt;
        }
        let rotate = held(&ROTATE_KEYS[..]);
        if rotate != Vec3::ZERO {
            *self.view.rotations.entry(id.to_string()).or_insert(Vec3::ZERO) += rotate * ROTATE_SPEED * dt;
        }
    }
}
