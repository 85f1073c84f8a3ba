// Interaction state read by the blender every frame.
//
// The maps are sparse overlays: an id that is absent takes the default
// (visible, closed, no offset, no rotation, no wear). Unknown ids are never
// an error.

use std::collections::HashMap;

use glam::Vec3;

use super::registry::Registry;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub exploded: bool,
    pub selected: Option<String>,
    pub moving: Option<String>,
    pub visibility: HashMap<String, bool>,
    pub open: HashMap<String, bool>,
    pub offsets: HashMap<String, Vec3>,
    /// User rotation as XYZ Euler angles, radians.
    pub rotations: HashMap<String, Vec3>,
    pub wear: HashMap<String, f32>,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state with the catalog's starting wear filled in.
    pub fn seeded(registry: &Registry) -> Self {
        let wear = registry
            .iter()
            .filter_map(|p| p.initial_wear.map(|w| (p.id.clone(), w)))
            .collect();
        Self { wear, ..Self::default() }
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visibility.get(id).copied().unwrap_or(true)
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.open.get(id).copied().unwrap_or(false)
    }

    pub fn offset(&self, id: &str) -> Vec3 {
        self.offsets.get(id).copied().unwrap_or(Vec3::ZERO)
    }

    pub fn rotation(&self, id: &str) -> Vec3 {
        self.rotations.get(id).copied().unwrap_or(Vec3::ZERO)
    }

    /// Wear level clamped to [0, 1].
    pub fn wear(&self, id: &str) -> f32 {
        self.wear.get(id).copied().unwrap_or(0.0).clamp(0.0, 1.0)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id)
    }

    pub fn is_moving(&self, id: &str) -> bool {
        self.moving.as_deref() == Some(id)
    }

    pub fn apply(&mut self, change: SelectionChange) {
        self.selected = change.selected;
        self.moving = change.moving;
    }
}

/// New `(selected, moving)` pair produced by a click or double-click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChange {
    pub selected: Option<String>,
    pub moving: Option<String>,
}

/// Click toggles selection of `id`; the moving part is untouched.
pub fn click_transition(view: &ViewState, id: &str) -> SelectionChange {
    let selected = (!view.is_selected(id)).then(|| id.to_string());
    SelectionChange { selected, moving: view.moving.clone() }
}

/// Double-click toggles whether `id` is being moved and selects it either way.
pub fn double_click_transition(view: &ViewState, id: &str) -> SelectionChange {
    let moving = (!view.is_moving(id)).then(|| id.to_string());
    SelectionChange { selected: Some(id.to_string()), moving }
}
