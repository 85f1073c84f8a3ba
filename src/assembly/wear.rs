// Wear levels to display colors and an overall health figure.
//
// Thresholds are strict: a part is in warning only once wear exceeds 0.4,
// critical once it exceeds 0.7.

use super::registry::Registry;
use super::view::ViewState;
use crate::engine::components::Color;

pub const WARNING_WEAR: f32 = 0.4;
pub const CRITICAL_WEAR: f32 = 0.7;

pub const AMBER: Color = Color::from_rgb_u32(0xf59e0b);
pub const RED: Color = Color::from_rgb_u32(0xef4444);
pub const GREEN: Color = Color::from_rgb_u32(0x10b981);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WearStatus {
    Healthy,
    Warning,
    Critical,
}

impl WearStatus {
    pub fn from_wear(wear: f32) -> Self {
        if wear > CRITICAL_WEAR {
            WearStatus::Critical
        } else if wear > WARNING_WEAR {
            WearStatus::Warning
        } else {
            WearStatus::Healthy
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WearStatus::Healthy => "Healthy",
            WearStatus::Warning => "Warning",
            WearStatus::Critical => "Critical",
        }
    }

    pub fn color(self) -> Color {
        match self {
            WearStatus::Healthy => GREEN,
            WearStatus::Warning => AMBER,
            WearStatus::Critical => RED,
        }
    }
}

/// Display color of a wear-bearing part.
pub fn wear_color(base: Color, wear: f32) -> Color {
    match WearStatus::from_wear(wear) {
        WearStatus::Healthy => base,
        status => status.color(),
    }
}

/// `100 − mean wear × 100` over wear-bearing parts, floored at 0. An assembly
/// with no such parts reports 100.
pub fn system_health(registry: &Registry, view: &ViewState) -> f32 {
    let wears: Vec<f32> = registry
        .iter()
        .filter(|p| p.kind().has_wear())
        .map(|p| view.wear(&p.id))
        .collect();
    if wears.is_empty() {
        return 100.0;
    }
    let mean = wears.iter().sum::<f32>() / wears.len() as f32;
    (100.0 - mean * 100.0).max(0.0)
}

pub fn health_color(health: f32) -> Color {
    if health < 30.0 {
        Color::from_rgb_u32(0xf87171)
    } else if health < 60.0 {
        Color::from_rgb_u32(0xfbbf24)
    } else {
        Color::from_rgb_u32(0x34d399)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::registry::Variant;
    use approx::assert_relative_eq;

    const BASE: Color = Color::from_rgb_u32(0x3b82f6);

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(wear_color(BASE, 0.39), BASE);
        assert_eq!(wear_color(BASE, 0.4), BASE);
        assert_eq!(wear_color(BASE, 0.41), AMBER);
        assert_eq!(wear_color(BASE, 0.7), AMBER);
        assert_eq!(wear_color(BASE, 0.71), RED);
    }

    #[test]
    fn status_labels() {
        assert_eq!(WearStatus::from_wear(0.0).label(), "Healthy");
        assert_eq!(WearStatus::from_wear(0.5).label(), "Warning");
        assert_eq!(WearStatus::from_wear(1.0).label(), "Critical");
    }

    #[test]
    fn cube_demo_health() {
        let registry = Registry::builtin(Variant::Cube).unwrap();
        let view = ViewState::seeded(&registry);
        // (0.65 + 0.35) over seven panels
        assert_relative_eq!(system_health(&registry, &view), 100.0 - 100.0 / 7.0, epsilon = 1e-4);
    }

    #[test]
    fn health_ignores_parts_without_wear() {
        let registry = Registry::builtin(Variant::Car).unwrap();
        let mut view = ViewState::seeded(&registry);
        view.wear.insert("car-body".into(), 1.0);
        assert_eq!(system_health(&registry, &view), 100.0);
    }

    #[test]
    fn health_bands() {
        assert_eq!(health_color(10.0), Color::from_rgb_u32(0xf87171));
        assert_eq!(health_color(45.0), Color::from_rgb_u32(0xfbbf24));
        assert_eq!(health_color(60.0), Color::from_rgb_u32(0x34d399));
    }
}
