// Per-part, per-frame transform blending.
//
// `step` is a pure function of the previous state, the part's spec, the
// current view state and the frame time. All animation (layout moves, spin,
// hinge articulation, feedback pulse) lives here; nothing reads a clock.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, TAU};

use bevy_ecs::prelude::*;
use glam::{EulerRot, Quat, Vec3};

use super::registry::{Axis, DoorSide, HatchKind, KindParams, PartKind, PartSpec};
use super::view::ViewState;
use super::wear::wear_color;
use crate::engine::components::{Color, Transform};
use crate::engine::smoothing::{approach, approach_vec3};

/// Pulse angular frequencies in rad/s.
pub const MOVE_PULSE_FREQ: f32 = 8.0;
pub const SELECT_PULSE_FREQ: f32 = 5.0;

/// Emissive tint of the part being moved.
pub const MOVE_HIGHLIGHT: Color = Color::from_rgb_u32(0x22d3ee);

/// Visual tuning for one part kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindTuning {
    pub position_rate: f32,
    pub hinge_rate: f32,
    pub scale_rate: f32,
    /// Scale pulse amplitude while the part is being moved.
    pub pulse_move: f32,
    /// Scale pulse amplitude while the part is selected.
    pub pulse_select: f32,
    pub emissive_move: f32,
    pub emissive_select: f32,
    /// Multiplier on the catalog spin speed. Zero for parts that never spin.
    pub spin_scale: f32,
}

impl KindTuning {
    const BASE: KindTuning = KindTuning {
        position_rate: 5.0,
        hinge_rate: 5.0,
        scale_rate: 10.0,
        pulse_move: 0.05,
        pulse_select: 0.03,
        emissive_move: 0.5,
        emissive_select: 0.3,
        spin_scale: 0.0,
    };

    pub const fn for_kind(kind: PartKind) -> Self {
        let base = Self::BASE;
        match kind {
            PartKind::Body => KindTuning {
                pulse_move: 0.03,
                pulse_select: 0.02,
                emissive_move: 0.4,
                emissive_select: 0.2,
                ..base
            },
            PartKind::Door | PartKind::Hatch => base,
            PartKind::Wheel => KindTuning { spin_scale: 1.0, ..base },
            PartKind::Gear => KindTuning { emissive_move: 0.6, spin_scale: 0.5, ..base },
            PartKind::Shaft => KindTuning { emissive_move: 0.6, ..base },
            PartKind::Housing => KindTuning {
                pulse_move: 0.04,
                pulse_select: 0.02,
                emissive_select: 0.2,
                ..base
            },
            PartKind::Cube => KindTuning { pulse_move: 0.03, pulse_select: 0.02, ..base },
            PartKind::Asset => KindTuning {
                pulse_move: 0.03,
                pulse_select: 0.02,
                emissive_move: 0.3,
                emissive_select: 0.15,
                ..base
            },
        }
    }
}

/// Smoothed animation state of one part.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PartRuntimeState {
    pub position: Vec3,
    /// Accumulated spin as XYZ Euler angles, each kept in [0, 2π).
    pub rotation: Vec3,
    pub hinge_angle: f32,
    pub scale: f32,
}

impl PartRuntimeState {
    /// Assembled, unrotated, closed, unit scale.
    pub fn at_rest(spec: &PartSpec) -> Self {
        Self {
            position: spec.assembled_position,
            rotation: Vec3::ZERO,
            hinge_angle: 0.0,
            scale: 1.0,
        }
    }
}

/// Frame timing handed to `step`, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    dt: f32,
    elapsed: f32,
}

impl FrameTime {
    /// Non-finite or negative `dt` is treated as a zero-length frame.
    pub fn new(dt: f32, elapsed: f32) -> Self {
        Self {
            dt: if dt.is_finite() && dt > 0.0 { dt } else { 0.0 },
            elapsed: if elapsed.is_finite() { elapsed } else { 0.0 },
        }
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Total simulation time; drives the feedback pulse.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Layout position plus the user's offset.
pub fn target_position(spec: &PartSpec, view: &ViewState) -> Vec3 {
    spec.layout_position(view.exploded) + view.offset(&spec.id)
}

/// Fully open hinge angle, for kinds that articulate.
pub fn open_angle(params: &KindParams) -> Option<f32> {
    match params {
        KindParams::Door { side: DoorSide::Left, .. } => Some(-FRAC_PI_3),
        KindParams::Door { side: DoorSide::Right, .. } => Some(FRAC_PI_3),
        KindParams::Hatch { kind: HatchKind::Hood, .. } => Some(-FRAC_PI_4),
        KindParams::Hatch { kind: HatchKind::Trunk, .. } => Some(FRAC_PI_3),
        _ => None,
    }
}

pub fn hinge_axis(kind: PartKind) -> Option<Axis> {
    match kind {
        PartKind::Door => Some(Axis::Y),
        PartKind::Hatch => Some(Axis::Z),
        _ => None,
    }
}

/// Spin axis and catalog speed (rad/s before tuning) for parts that spin.
fn spin(params: &KindParams) -> Option<(Axis, f32)> {
    match *params {
        KindParams::Wheel { spin_speed, .. } => Some((Axis::Z, spin_speed)),
        KindParams::Gear { spin_speed, spin_axis, .. } => Some((spin_axis, spin_speed)),
        _ => None,
    }
}

/// Fixed orientation between the synthesized solid's frame and the part frame.
/// Solids are swept along +Z; gears and housings lie flat.
pub fn mount_rotation(kind: PartKind) -> Quat {
    match kind {
        PartKind::Gear | PartKind::Housing => Quat::from_rotation_x(FRAC_PI_2),
        _ => Quat::IDENTITY,
    }
}

/// Reduce an angle into `[0, TAU)`. `rem_euclid` rounds tiny negative inputs
/// up to exactly `TAU`, which is folded back to zero.
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped >= TAU { 0.0 } else { wrapped }
}

fn euler(v: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, v.x, v.y, v.z)
}

/// Advance one part by one frame.
pub fn step(prev: &PartRuntimeState, spec: &PartSpec, view: &ViewState, time: FrameTime) -> PartRuntimeState {
    let kind = spec.kind();
    let tuning = KindTuning::for_kind(kind);
    let dt = time.dt();

    let position = approach_vec3(prev.position, target_position(spec, view), tuning.position_rate, dt);

    let rotation = match spin(&spec.params) {
        Some((axis, speed)) if !view.exploded => {
            let turned = prev.rotation + axis.unit() * (speed * dt * tuning.spin_scale);
            Vec3::new(wrap_angle(turned.x), wrap_angle(turned.y), wrap_angle(turned.z))
        }
        _ => prev.rotation,
    };

    let hinge_angle = match open_angle(&spec.params) {
        Some(open) => {
            let target = if view.is_open(&spec.id) { open } else { 0.0 };
            approach(prev.hinge_angle, target, tuning.hinge_rate, dt)
        }
        None => 0.0,
    };

    let scale = if view.is_moving(&spec.id) {
        1.0 + (time.elapsed() * MOVE_PULSE_FREQ).sin() * tuning.pulse_move
    } else if view.is_selected(&spec.id) {
        1.0 + (time.elapsed() * SELECT_PULSE_FREQ).sin() * tuning.pulse_select
    } else {
        approach(prev.scale, 1.0, tuning.scale_rate, dt)
    };

    PartRuntimeState { position, rotation, hinge_angle, scale }
}

/// World transform of a part:
/// `euler(user rotation + hinge axis × hinge angle) · mount · euler(spin)`.
pub fn pose(spec: &PartSpec, state: &PartRuntimeState, view: &ViewState) -> Transform {
    let kind = spec.kind();
    let hinge = hinge_axis(kind).map_or(Vec3::ZERO, |axis| axis.unit() * state.hinge_angle);
    let rotation = euler(view.rotation(&spec.id) + hinge) * mount_rotation(kind) * euler(state.rotation);
    Transform { position: state.position, rotation, scale: state.scale }
}

/// Base color, replaced by the wear color for wear-bearing kinds.
pub fn display_color(spec: &PartSpec, view: &ViewState) -> Color {
    if spec.kind().has_wear() {
        wear_color(spec.base_color, view.wear(&spec.id))
    } else {
        spec.base_color
    }
}

/// Highlight color and intensity: cyan while moving, the display color while
/// selected, nothing otherwise.
pub fn emissive(spec: &PartSpec, view: &ViewState) -> (Color, f32) {
    let tuning = KindTuning::for_kind(spec.kind());
    if view.is_moving(&spec.id) {
        (MOVE_HIGHLIGHT, tuning.emissive_move)
    } else if view.is_selected(&spec.id) {
        (display_color(spec, view), tuning.emissive_select)
    } else {
        (Color::BLACK, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::registry::{Registry, Variant};
    use crate::assembly::wear::{AMBER, RED};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const DT: f32 = 1.0 / 60.0;

    fn part(variant: Variant, id: &str) -> PartSpec {
        Registry::builtin(variant).unwrap().get(id).unwrap().clone()
    }

    /// Run `ticks` frames at `DT`, returning every intermediate state.
    fn run(spec: &PartSpec, view: &ViewState, start: PartRuntimeState, ticks: usize) -> Vec<PartRuntimeState> {
        let mut state = start;
        (0..ticks)
            .map(|i| {
                state = step(&state, spec, view, FrameTime::new(DT, (i + 1) as f32 * DT));
                state
            })
            .collect()
    }

    #[test]
    fn position_converges_monotonically() {
        let spec = part(Variant::Gearbox, "drive-gear");
        let view = ViewState { exploded: true, ..ViewState::new() };
        let target = spec.exploded_position;

        let mut gap = (target - spec.assembled_position).length();
        let states = run(&spec, &view, PartRuntimeState::at_rest(&spec), 60);
        for s in &states {
            let next = (target - s.position).length();
            assert!(next < gap);
            gap = next;
        }
        let initial = (target - spec.assembled_position).length();
        assert!(gap < 0.01 * initial);
    }

    #[test]
    fn long_frame_lands_on_target_without_overshoot() {
        let spec = part(Variant::Car, "wheel-front-left");
        let mut view = ViewState { exploded: true, ..ViewState::new() };
        view.offsets.insert(spec.id.clone(), Vec3::new(0.0, 1.0, 0.0));

        let next = step(&PartRuntimeState::at_rest(&spec), &spec, &view, FrameTime::new(5.0, 5.0));
        assert_eq!(next.position, spec.exploded_position + Vec3::Y);
    }

    #[test]
    fn left_door_opens_toward_negative_angle() {
        let spec = part(Variant::Car, "door-front-left");
        let mut view = ViewState::new();
        view.open.insert(spec.id.clone(), true);

        let states = run(&spec, &view, PartRuntimeState::at_rest(&spec), 240);
        let mut prev = 0.0;
        for s in &states {
            assert!(s.hinge_angle <= prev);
            assert!(s.hinge_angle >= -FRAC_PI_3);
            prev = s.hinge_angle;
        }
        assert_abs_diff_eq!(prev, -FRAC_PI_3, epsilon = 1e-3);
    }

    #[test]
    fn right_door_and_hatches_use_their_own_angles() {
        for (id, expected) in [("door-rear-right", FRAC_PI_3), ("hood", -FRAC_PI_4), ("trunk", FRAC_PI_3)] {
            let spec = part(Variant::Car, id);
            let mut view = ViewState::new();
            view.open.insert(spec.id.clone(), true);
            let last = *run(&spec, &view, PartRuntimeState::at_rest(&spec), 240).last().unwrap();
            assert_abs_diff_eq!(last.hinge_angle, expected, epsilon = 1e-3);
        }
    }

    #[test]
    fn closing_returns_hinge_to_zero() {
        let spec = part(Variant::Car, "trunk");
        let opened = PartRuntimeState { hinge_angle: FRAC_PI_3, ..PartRuntimeState::at_rest(&spec) };
        let last = *run(&spec, &ViewState::new(), opened, 240).last().unwrap();
        assert_abs_diff_eq!(last.hinge_angle, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn gears_spin_at_half_speed_only_when_assembled() {
        let spec = part(Variant::Gearbox, "idler-gear");
        let rest = PartRuntimeState::at_rest(&spec);

        let spun = step(&rest, &spec, &ViewState::new(), FrameTime::new(0.1, 0.1));
        assert_relative_eq!(spun.rotation.z, 1.5 * 0.1 * 0.5, epsilon = 1e-6);

        let exploded = ViewState { exploded: true, ..ViewState::new() };
        let still = step(&spun, &spec, &exploded, FrameTime::new(0.1, 0.2));
        assert_eq!(still.rotation, spun.rotation);
    }

    #[test]
    fn reverse_spin_stays_wrapped() {
        let spec = part(Variant::Gearbox, "driven-gear");
        let states = run(&spec, &ViewState::new(), PartRuntimeState::at_rest(&spec), 600);
        for s in states {
            assert!((0.0..TAU).contains(&s.rotation.z));
        }
    }

    #[test]
    fn tiny_reverse_step_never_lands_on_a_full_turn() {
        let spec = part(Variant::Gearbox, "driven-gear");
        let s = step(&PartRuntimeState::at_rest(&spec), &spec, &ViewState::new(), FrameTime::new(1e-7, 0.0));
        assert!((0.0..TAU).contains(&s.rotation.z), "{}", s.rotation.z);
        assert!((0.0..TAU).contains(&wrap_angle(-1e-9)));
        assert_eq!(wrap_angle(TAU), 0.0);
    }

    #[test]
    fn non_spinning_parts_keep_rotation() {
        let spec = part(Variant::Gearbox, "main-shaft");
        let last = *run(&spec, &ViewState::new(), PartRuntimeState::at_rest(&spec), 30).last().unwrap();
        assert_eq!(last.rotation, Vec3::ZERO);
    }

    #[test]
    fn moving_pulse_takes_precedence_over_selection() {
        let spec = part(Variant::Car, "hood");
        let mut view = ViewState::new();
        view.selected = Some(spec.id.clone());
        view.moving = Some(spec.id.clone());

        let t = 0.3;
        let s = step(&PartRuntimeState::at_rest(&spec), &spec, &view, FrameTime::new(DT, t));
        assert_relative_eq!(s.scale, 1.0 + (t * MOVE_PULSE_FREQ).sin() * 0.05);

        view.moving = None;
        let s = step(&PartRuntimeState::at_rest(&spec), &spec, &view, FrameTime::new(DT, t));
        assert_relative_eq!(s.scale, 1.0 + (t * SELECT_PULSE_FREQ).sin() * 0.03);
    }

    #[test]
    fn scale_decays_back_to_one() {
        let spec = part(Variant::Cube, "core");
        let pulsed = PartRuntimeState { scale: 1.02, ..PartRuntimeState::at_rest(&spec) };
        let last = *run(&spec, &ViewState::new(), pulsed, 60).last().unwrap();
        assert_abs_diff_eq!(last.scale, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn bad_frame_time_changes_nothing() {
        let spec = part(Variant::Car, "wheel-rear-left");
        let view = ViewState { exploded: true, ..ViewState::new() };
        let rest = PartRuntimeState::at_rest(&spec);
        for dt in [f32::NAN, -1.0, f32::NEG_INFINITY] {
            assert_eq!(step(&rest, &spec, &view, FrameTime::new(dt, 1.0)), rest);
        }
    }

    #[test]
    fn pulse_amplitudes_stay_small() {
        for kind in PartKind::ALL {
            let t = KindTuning::for_kind(kind);
            assert!(t.pulse_move <= 0.05 && t.pulse_select <= t.pulse_move, "{kind:?}");
            assert!(t.emissive_select <= 0.3 && t.emissive_move >= t.emissive_select, "{kind:?}");
        }
    }

    #[test]
    fn open_left_door_swings_outward() {
        let spec = part(Variant::Car, "door-front-left");
        let state = PartRuntimeState { hinge_angle: -FRAC_PI_3, ..PartRuntimeState::at_rest(&spec) };
        let t = pose(&spec, &state, &ViewState::new());
        // a point on the panel, aft of the hinge, moves to +z (outside the car)
        let p = t.rotation * Vec3::X;
        assert!(p.z > 0.8);
    }

    #[test]
    fn user_rotation_adds_to_hinge() {
        let spec = part(Variant::Car, "door-front-right");
        let mut view = ViewState::new();
        view.rotations.insert(spec.id.clone(), Vec3::new(0.0, -0.25, 0.0));
        let state = PartRuntimeState { hinge_angle: 0.25, ..PartRuntimeState::at_rest(&spec) };
        let t = pose(&spec, &state, &view);
        assert_abs_diff_eq!(t.rotation.angle_between(Quat::IDENTITY), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn gears_lie_flat() {
        let spec = part(Variant::Gearbox, "drive-gear");
        let t = pose(&spec, &PartRuntimeState::at_rest(&spec), &ViewState::new());
        let axis = t.rotation * Vec3::Z;
        assert_abs_diff_eq!(axis.y.abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn emissive_follows_interaction() {
        let spec = part(Variant::Cube, "left-bearing");
        let mut view = ViewState::seeded(&Registry::builtin(Variant::Cube).unwrap());
        assert_eq!(emissive(&spec, &view), (Color::BLACK, 0.0));

        view.selected = Some(spec.id.clone());
        assert_eq!(emissive(&spec, &view), (AMBER, 0.3));

        view.wear.insert(spec.id.clone(), 0.9);
        assert_eq!(display_color(&spec, &view), RED);

        view.moving = Some(spec.id.clone());
        assert_eq!(emissive(&spec, &view), (MOVE_HIGHLIGHT, 0.5));
    }
}
