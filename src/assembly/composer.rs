// Turns a catalog plus the controller's view state into draw records.
//
// Each drawable part is an entity carrying its catalog slot, its geometry and
// its runtime state. Geometry is synthesized once, at construction; a part
// whose geometry fails is logged, reported and left out of the world.

use bevy_ecs::prelude::*;

use super::blend::{FrameTime, PartRuntimeState, display_color, emissive, pose, step};
use super::error::{GeometryError, GeometryFault, GeometryResult};
use super::extrude::{Bevel, GeometryCache, GeometryHandle};
use super::profile::{GearParams, ProfileKind};
use super::registry::{HatchKind, KindParams, PartSpec, Registry};
use super::view::{SelectionChange, ViewState, click_transition, double_click_transition};
use crate::engine::components::{Color, Transform};

// Housing plate mounting holes.
const HOUSING_HOLE_RADIUS: f32 = 0.08;
const HOUSING_HOLE_INSET: glam::Vec2 = glam::Vec2::new(0.5, 0.45);

const DOOR_SKIN_DEPTH: f32 = 0.08;

/// Bevel inset never exceeds this share of a part's smallest outline feature.
const BEVEL_FEATURE_SHARE: f32 = 0.1;
/// Bevel depth never exceeds this share of the sweep depth.
const BEVEL_DEPTH_SHARE: f32 = 0.2;

/// Car body silhouette size at which its nominal bevel is authored.
const BODY_REF_SIZE: (f32, f32) = (3.5, 1.1);
/// Narrowest body detail at the reference size.
const BODY_FEATURE: f32 = 0.3;
/// Narrowest door skin detail (the strip above the window) per unit of size.
const DOOR_FEATURE: f32 = 0.08;

/// What the shell should draw for a part.
#[derive(Component, Debug, Clone)]
pub enum PartGeometry {
    Solid(GeometryHandle),
    /// Mesh file loaded by the shell, relative to its asset directory.
    Asset(String),
}

/// Index of the part in catalog order.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
struct PartSlot(usize);

/// Whether the part was visible on its last tick.
#[derive(Component, Debug, Clone, Copy)]
struct Presence {
    visible: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposerOptions {
    /// Snap a part back to rest when it is shown again after being hidden.
    /// Off by default: a re-shown part resumes from where it was.
    pub reset_on_show: bool,
}

#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub id: String,
    pub geometry: PartGeometry,
    pub transform: Transform,
    pub color: Color,
    pub emissive: Color,
    pub emissive_intensity: f32,
}

/// A part that will never be drawn because its geometry could not be built.
#[derive(Debug)]
pub struct GeometryFailure {
    pub id: String,
    pub error: GeometryError,
}

/// Bevel of at most `thickness` by `size`, shrunk to suit an outline whose
/// smallest feature is `feature` swept to `depth`.
fn fitted_bevel(thickness: f32, size: f32, segments: u32, feature: f32, depth: f32) -> Bevel {
    Bevel::new(thickness.min(depth * BEVEL_DEPTH_SHARE), size.min(feature * BEVEL_FEATURE_SHARE), segments)
}

/// Profile, sweep depth and bevel for a part, or `None` for loaded assets.
/// Bevels scale down with the part so small parts keep their edges.
pub fn solid_recipe(params: &KindParams) -> Option<(ProfileKind, f32, Option<Bevel>)> {
    let recipe = match *params {
        KindParams::Body { length, height, width } => {
            let scale = (length / BODY_REF_SIZE.0).min(height / BODY_REF_SIZE.1);
            let bevel = fitted_bevel(0.03, 0.03, 2, BODY_FEATURE * scale, width);
            (ProfileKind::CarBody { length, height }, width, Some(bevel))
        }
        KindParams::Door { length, height, .. } => (
            ProfileKind::DoorPanel { length, height, hinge_offset: length * 0.5 },
            DOOR_SKIN_DEPTH,
            Some(fitted_bevel(0.01, 0.01, 1, DOOR_FEATURE * length.min(height), DOOR_SKIN_DEPTH)),
        ),
        KindParams::Hatch { kind, length, width } => {
            let hinge_offset = match kind {
                HatchKind::Hood => -length * 0.5,
                HatchKind::Trunk => length * 0.5,
            };
            (ProfileKind::HatchPanel { length, hinge_offset }, width, None)
        }
        KindParams::Wheel { radius, width, .. } => {
            (ProfileKind::Disc { radius }, width, Some(fitted_bevel(0.03, 0.03, 2, radius, width)))
        }
        KindParams::Gear { radius, tooth_count, thickness, .. } => {
            let gear = GearParams::from_nominal(radius, tooth_count);
            let bevel = fitted_bevel(0.02, 0.02, 2, gear.min_feature(), thickness);
            (ProfileKind::Gear(gear), thickness, Some(bevel))
        }
        KindParams::Shaft { length, radius } => (ProfileKind::Disc { radius }, length, None),
        KindParams::Housing { width, depth, thickness } => (
            ProfileKind::MountingPlate {
                width,
                depth,
                corner_radius: 0.0,
                hole_radius: HOUSING_HOLE_RADIUS,
                hole_inset: HOUSING_HOLE_INSET,
            },
            thickness,
            None,
        ),
        KindParams::Cube { size } => (
            ProfileKind::RoundedRect { width: size, height: size, corner_radius: size * 0.09 },
            size,
            Some(Bevel::new(size * 0.04, size * 0.04, 2)),
        ),
        KindParams::Asset { .. } => return None,
    };
    Some(recipe)
}

/// Synthesize the solid for a part, or `None` for loaded assets. If the bevel
/// would still collapse some feature, the part is swept without one.
pub fn build_solid(params: &KindParams, cache: &mut GeometryCache) -> GeometryResult<Option<GeometryHandle>> {
    let Some((profile, depth, bevel)) = solid_recipe(params) else { return Ok(None) };
    match cache.get_or_build(&profile, depth, bevel) {
        Err(GeometryError::InvalidGeometry(GeometryFault::BevelCollapse { contour })) if bevel.is_some() => {
            log::debug!("{} bevel collapses contour {}, sweeping square-edged", profile.name(), contour);
            cache.get_or_build(&profile, depth, None).map(Some)
        }
        built => built.map(Some),
    }
}

fn build_geometry(spec: &PartSpec, cache: &mut GeometryCache) -> Result<PartGeometry, GeometryError> {
    if let KindParams::Asset { path } = &spec.params {
        return Ok(PartGeometry::Asset(path.clone()));
    }
    build_solid(&spec.params, cache)?
        .map(PartGeometry::Solid)
        .ok_or_else(|| GeometryError::param("kind", format!("{} has no solid recipe", spec.kind().name())))
}

pub struct Composer {
    registry: Registry,
    options: ComposerOptions,
    world: World,
    /// Entity per catalog slot; `None` where geometry failed.
    slots: Vec<Option<Entity>>,
    cache: GeometryCache,
    failures: Vec<GeometryFailure>,
}

impl Composer {
    pub fn new(registry: Registry) -> Self {
        Self::with_options(registry, ComposerOptions::default())
    }

    pub fn with_options(registry: Registry, options: ComposerOptions) -> Self {
        let mut world = World::new();
        let mut cache = GeometryCache::new();
        let mut failures = Vec::new();

        let slots = registry
            .iter()
            .enumerate()
            .map(|(index, spec)| match build_geometry(spec, &mut cache) {
                Ok(geometry) => {
                    let entity = world
                        .spawn((PartSlot(index), geometry, PartRuntimeState::at_rest(spec), Presence { visible: true }))
                        .id();
                    Some(entity)
                }
                Err(error) => {
                    log::warn!("part `{}` will not be drawn: {}", spec.id, error);
                    failures.push(GeometryFailure { id: spec.id.clone(), error });
                    None
                }
            })
            .collect();

        log::info!(
            "composed `{}`: {} parts, {} distinct solids, {} failed",
            registry.name(),
            registry.len(),
            cache.len(),
            failures.len()
        );
        Self { registry, options, world, slots, cache, failures }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> ComposerOptions {
        self.options
    }

    pub fn geometry_failures(&self) -> &[GeometryFailure] {
        &self.failures
    }

    /// Number of distinct synthesized solids shared across parts.
    pub fn solid_count(&self) -> usize {
        self.cache.len()
    }

    fn entity(&self, id: &str) -> Option<Entity> {
        self.registry.index_of(id).and_then(|i| self.slots[i])
    }

    pub fn state(&self, id: &str) -> Option<&PartRuntimeState> {
        self.entity(id).and_then(|e| self.world.get::<PartRuntimeState>(e))
    }

    pub fn geometry(&self, id: &str) -> Option<&PartGeometry> {
        self.entity(id).and_then(|e| self.world.get::<PartGeometry>(e))
    }

    /// Advance every visible part by one frame. Hidden parts keep their state.
    pub fn tick(&mut self, view: &ViewState, time: FrameTime) {
        let parts = self.registry.parts();
        let reset_on_show = self.options.reset_on_show;

        let mut query = self.world.query::<(&PartSlot, &mut PartRuntimeState, &mut Presence)>();
        for (slot, mut state, mut presence) in query.iter_mut(&mut self.world) {
            let spec = &parts[slot.0];
            if !view.is_visible(&spec.id) {
                presence.visible = false;
                continue;
            }
            if !presence.visible {
                presence.visible = true;
                if reset_on_show {
                    log::debug!("part `{}` shown again, resetting", spec.id);
                    *state = PartRuntimeState::at_rest(spec);
                }
            }
            let next = step(&state, spec, view, time);
            *state = next;
        }
    }

    /// One record per visible, drawable part, in catalog order.
    pub fn draw_records(&self, view: &ViewState) -> Vec<DrawRecord> {
        self.registry
            .iter()
            .zip(&self.slots)
            .filter(|(spec, _)| view.is_visible(&spec.id))
            .filter_map(|(spec, slot)| {
                let entity = (*slot)?;
                let state = self.world.get::<PartRuntimeState>(entity)?;
                let geometry = self.world.get::<PartGeometry>(entity)?.clone();
                let (emissive, emissive_intensity) = emissive(spec, view);
                Some(DrawRecord {
                    id: spec.id.clone(),
                    geometry,
                    transform: pose(spec, state, view),
                    color: display_color(spec, view),
                    emissive,
                    emissive_intensity,
                })
            })
            .collect()
    }

    fn accepts_events(&self, view: &ViewState, id: &str) -> bool {
        self.entity(id).is_some() && view.is_visible(id)
    }

    pub fn on_select(&self, view: &ViewState, id: &str) -> Option<SelectionChange> {
        self.accepts_events(view, id).then(|| click_transition(view, id))
    }

    pub fn on_double_click(&self, view: &ViewState, id: &str) -> Option<SelectionChange> {
        self.accepts_events(view, id).then(|| double_click_transition(view, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::blend::MOVE_HIGHLIGHT;
    use crate::assembly::registry::{Axis, DoorMount, DoorSide, Variant};
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    const DT: f32 = 1.0 / 60.0;

    fn composer(variant: Variant) -> Composer {
        Composer::new(Registry::builtin(variant).unwrap())
    }

    fn run(composer: &mut Composer, view: &ViewState, ticks: usize) {
        for i in 0..ticks {
            composer.tick(view, FrameTime::new(DT, (i + 1) as f32 * DT));
        }
    }

    #[test]
    fn builtin_catalogs_compose_without_failures() {
        for variant in Variant::ALL {
            let c = composer(variant);
            assert!(c.geometry_failures().is_empty(), "{variant:?}: {:?}", c.geometry_failures());
            let records = c.draw_records(&ViewState::new());
            assert_eq!(records.len(), c.registry().len());
        }
    }

    #[test]
    fn records_follow_catalog_order() {
        let c = composer(Variant::Gearbox);
        let ids: Vec<String> = c.draw_records(&ViewState::new()).into_iter().map(|r| r.id).collect();
        let expected: Vec<String> = c.registry().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn identical_parts_share_one_solid() {
        let c = composer(Variant::Cube);
        assert_eq!(c.solid_count(), 1);
        match (c.geometry("core"), c.geometry("left-bearing")) {
            (Some(PartGeometry::Solid(a)), Some(PartGeometry::Solid(b))) => assert!(Arc::ptr_eq(a, b)),
            other => panic!("expected solids, got {other:?}"),
        }
        // body, door skin, hood, trunk, wheel
        assert_eq!(composer(Variant::Car).solid_count(), 5);
    }

    #[test]
    fn plant_is_passed_through_as_asset() {
        let c = composer(Variant::Plant);
        assert_eq!(c.solid_count(), 0);
        assert!(matches!(c.geometry("plant-full"), Some(PartGeometry::Asset(p)) if p == "indoor_plant_02.obj"));
    }

    #[test]
    fn hidden_parts_are_dropped_and_frozen() {
        let mut c = composer(Variant::Gearbox);
        let mut view = ViewState { exploded: true, ..ViewState::new() };
        view.visibility.insert("drive-gear".into(), false);

        run(&mut c, &view, 30);
        let records = c.draw_records(&view);
        assert_eq!(records.len(), c.registry().len() - 1);
        assert!(records.iter().all(|r| r.id != "drive-gear"));
        assert_eq!(c.state("drive-gear").unwrap().position, Vec3::new(-1.0, 0.0, 0.0));
        assert_ne!(c.state("driven-gear").unwrap().position, Vec3::new(1.1, 0.0, 0.0));
    }

    #[test]
    fn reshown_parts_resume_by_default() {
        let mut c = composer(Variant::Gearbox);
        let mut view = ViewState { exploded: true, ..ViewState::new() };
        run(&mut c, &view, 20);
        let before = *c.state("idler-gear").unwrap();

        view.visibility.insert("idler-gear".into(), false);
        run(&mut c, &view, 5);
        view.visibility.insert("idler-gear".into(), true);
        c.tick(&view, FrameTime::new(0.0, 1.0));
        assert_eq!(c.state("idler-gear").unwrap().position, before.position);
    }

    #[test]
    fn reset_on_show_snaps_back_to_rest() {
        let registry = Registry::builtin(Variant::Gearbox).unwrap();
        let mut c = Composer::with_options(registry, ComposerOptions { reset_on_show: true });
        let mut view = ViewState { exploded: true, ..ViewState::new() };
        run(&mut c, &view, 20);

        view.visibility.insert("idler-gear".into(), false);
        run(&mut c, &view, 1);
        view.visibility.insert("idler-gear".into(), true);
        c.tick(&view, FrameTime::new(0.0, 1.0));
        assert_eq!(c.state("idler-gear").unwrap().position, Vec3::new(0.0, 0.9, 0.0));
    }

    #[test]
    fn events_ignore_unknown_and_hidden_parts() {
        let c = composer(Variant::Car);
        let mut view = ViewState::new();
        assert!(c.on_select(&view, "spoiler").is_none());

        view.visibility.insert("hood".into(), false);
        assert!(c.on_select(&view, "hood").is_none());
        assert!(c.on_double_click(&view, "hood").is_none());

        let change = c.on_double_click(&view, "trunk").unwrap();
        assert_eq!(change.moving.as_deref(), Some("trunk"));
        assert_eq!(change.selected.as_deref(), Some("trunk"));
    }

    #[test]
    fn moving_part_glows_cyan() {
        let c = composer(Variant::Car);
        let mut view = ViewState::new();
        view.apply(c.on_double_click(&view, "hood").unwrap());

        let records = c.draw_records(&view);
        let hood = records.iter().find(|r| r.id == "hood").unwrap();
        assert_eq!(hood.emissive, MOVE_HIGHLIGHT);
        assert!(hood.emissive_intensity > 0.3);
        let trunk = records.iter().find(|r| r.id == "trunk").unwrap();
        assert_eq!(trunk.emissive_intensity, 0.0);
    }

    #[test]
    fn invalid_geometry_is_reported_not_drawn() {
        let src = r##"(
            name: "Broken",
            parts: [
                (id: "ok", name: "Ok", position: (0.0, 0.0, 0.0), exploded: (0.0, 0.0, 0.0),
                 color: "#ffffff", kind: Cube),
                (id: "thin", name: "Thin", position: (0.0, 0.0, 0.0), exploded: (0.0, 0.0, 0.0),
                 color: "#ffffff", kind: Shaft, params: {"length": 1.0, "radius": -0.1}),
            ],
        )"##;
        let c = Composer::new(Registry::from_ron(src).unwrap());
        assert_eq!(c.geometry_failures().len(), 1);
        assert_eq!(c.geometry_failures()[0].id, "thin");
        assert!(matches!(c.geometry_failures()[0].error, GeometryError::InvalidParameter { name: "radius", .. }));

        let view = ViewState::new();
        let ids: Vec<String> = c.draw_records(&view).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["ok".to_string()]);
        assert!(c.on_select(&view, "thin").is_none());
    }

    fn gear(radius: f32, tooth_count: u32, thickness: f32) -> KindParams {
        KindParams::Gear { radius, tooth_count, spin_speed: 1.0, spin_axis: Axis::Z, thickness }
    }

    fn door(length: f32, height: f32) -> KindParams {
        KindParams::Door { side: DoorSide::Left, mount: DoorMount::Front, length, height }
    }

    fn assert_recipe_sweeps(cache: &mut GeometryCache, params: &KindParams) {
        let (profile, depth, bevel) = solid_recipe(params).unwrap();
        if let Err(e) = cache.get_or_build(&profile, depth, bevel) {
            panic!("{params:?} with {bevel:?}: {e}");
        }
    }

    #[test]
    fn fine_toothed_gears_and_small_doors_keep_their_bevel() {
        let mut cache = GeometryCache::new();
        for (radius, teeth) in [(0.8, 48), (0.5, 24), (0.3, 16), (1.0, 48)] {
            assert_recipe_sweeps(&mut cache, &gear(radius, teeth, 0.3));
        }
        assert_recipe_sweeps(&mut cache, &door(0.2, 0.3));
    }

    #[test]
    fn valid_part_sizes_always_sweep() {
        let mut rng = StdRng::seed_from_u64(0xbe7e1);
        let mut cache = GeometryCache::new();
        for _ in 0..120 {
            let spur = gear(rng.gen_range(0.2..2.0), rng.gen_range(3..49), rng.gen_range(0.05..0.5));
            assert_recipe_sweeps(&mut cache, &spur);

            assert_recipe_sweeps(&mut cache, &door(rng.gen_range(0.2..2.0), rng.gen_range(0.2..2.0)));

            let hatch = KindParams::Hatch {
                kind: if rng.gen_bool(0.5) { HatchKind::Hood } else { HatchKind::Trunk },
                length: rng.gen_range(0.3..2.5),
                width: rng.gen_range(0.3..2.0),
            };
            assert_recipe_sweeps(&mut cache, &hatch);

            let wheel = KindParams::Wheel {
                spin_speed: 1.0,
                radius: rng.gen_range(0.05..0.8),
                width: rng.gen_range(0.05..0.5),
            };
            assert_recipe_sweeps(&mut cache, &wheel);
        }
    }

    #[test]
    fn bevels_shrink_with_the_part() {
        let (_, _, big) = solid_recipe(&gear(0.8, 16, 0.3)).unwrap();
        let (_, _, fine) = solid_recipe(&gear(0.8, 48, 0.3)).unwrap();
        let (big, fine) = (big.unwrap(), fine.unwrap());
        assert!(fine.size < big.size);
        assert!(big.size <= 0.02);

        let (_, depth, thin) = solid_recipe(&gear(0.8, 16, 0.05)).unwrap();
        assert!(2.0 * thin.unwrap().thickness < depth);
    }

    #[test]
    fn build_solid_covers_every_solid_kind() {
        let mut cache = GeometryCache::new();
        let solid = build_solid(&gear(0.3, 40, 0.1), &mut cache).unwrap();
        assert!(solid.is_some_and(|s| s.mesh.triangle_count() > 0));
        let asset = KindParams::Asset { path: "a.obj".into() };
        assert!(build_solid(&asset, &mut cache).unwrap().is_none());
    }
}
