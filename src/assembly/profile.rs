// Parametric 2D outlines.
//
// Every builder is a pure function of its parameters. Outer boundaries come
// back counter-clockwise and holes clockwise, so a sweep can keep material on
// the left of every edge.

use std::f32::consts::TAU;

use glam::Vec2;
use lyon_geom::{LineSegment, QuadraticBezierSegment};
use lyon_path::math::point;

use super::error::{GeometryError, GeometryResult};

/// Share of each tooth sector occupied by the tooth itself.
pub const DEFAULT_TOOTH_FRACTION: f32 = 0.65;
/// Root radius as a share of the nominal (tip) radius.
pub const GEAR_ROOT_RATIO: f32 = 0.7;
/// Bore radius as a share of the radius it is derived from.
pub const BORE_RATIO: f32 = 0.3;
/// Share of a tooth's width spent on each sloped flank.
const TOOTH_FLANK: f32 = 0.3;

/// Segment count for round outlines (discs, bores).
pub const CIRCLE_SEGMENTS: usize = 32;
const MOUNT_HOLE_SEGMENTS: usize = 16;

/// Hatch panels are thin shells with a gentle crown.
const HATCH_THICKNESS: f32 = 0.08;
const HATCH_CROWN: f32 = 0.04;

/// Reference silhouette size the car body control points are authored at.
const BODY_REF_LENGTH: f32 = 3.5;
const BODY_REF_HEIGHT: f32 = 1.1;

// ============================================================================
// CONTOURS
// ============================================================================

/// One step of a contour, drawn from the previous end point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line(Vec2),
    Quad { ctrl: Vec2, to: Vec2 },
}

impl Segment {
    pub fn end(&self) -> Vec2 {
        match *self {
            Segment::Line(to) | Segment::Quad { to, .. } => to,
        }
    }

    fn map(self, f: &impl Fn(Vec2) -> Vec2) -> Self {
        match self {
            Segment::Line(to) => Segment::Line(f(to)),
            Segment::Quad { ctrl, to } => Segment::Quad { ctrl: f(ctrl), to: f(to) },
        }
    }
}

/// A closed path: start point plus segments. The last segment implicitly
/// connects back to `start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub start: Vec2,
    pub segments: Vec<Segment>,
}

impl Contour {
    pub fn new(start: Vec2) -> Self {
        Self { start, segments: Vec::new() }
    }

    pub fn line_to(mut self, to: Vec2) -> Self {
        self.segments.push(Segment::Line(to));
        self
    }

    pub fn quad_to(mut self, ctrl: Vec2, to: Vec2) -> Self {
        self.segments.push(Segment::Quad { ctrl, to });
        self
    }

    /// Straight-edged contour through `points`.
    pub fn polygon(points: &[Vec2]) -> Self {
        let Some((&first, rest)) = points.split_first() else {
            return Self::new(Vec2::ZERO);
        };
        Self {
            start: first,
            segments: rest.iter().map(|&p| Segment::Line(p)).collect(),
        }
    }

    /// Counter-clockwise regular polygon approximating a circle.
    pub fn circle(center: Vec2, radius: f32, segments: usize) -> Self {
        let points: Vec<Vec2> = (0..segments)
            .map(|i| {
                let a = i as f32 * TAU / segments as f32;
                center + Vec2::new(a.cos(), a.sin()) * radius
            })
            .collect();
        Self::polygon(&points)
    }

    /// Same path traversed the other way.
    pub fn reversed(&self) -> Self {
        let mut ends = Vec::with_capacity(self.segments.len() + 1);
        ends.push(self.start);
        ends.extend(self.segments.iter().map(Segment::end));

        let Some(&last) = ends.last() else {
            return self.clone();
        };
        let segments = self
            .segments
            .iter()
            .enumerate()
            .rev()
            .map(|(i, seg)| match *seg {
                Segment::Line(_) => Segment::Line(ends[i]),
                Segment::Quad { ctrl, .. } => Segment::Quad { ctrl, to: ends[i] },
            })
            .collect();

        Self { start: last, segments }
    }

    /// Apply `f` to every point, control points included.
    pub fn map_points(&self, f: impl Fn(Vec2) -> Vec2) -> Self {
        Self {
            start: f(self.start),
            segments: self.segments.iter().map(|s| s.map(&f)).collect(),
        }
    }

    /// Polyline approximation within `tolerance`. The closing point is not repeated.
    pub fn flatten(&self, tolerance: f32) -> Vec<Vec2> {
        let mut out = vec![self.start];
        let mut cursor = self.start;

        for seg in &self.segments {
            match *seg {
                Segment::Line(to) => out.push(to),
                Segment::Quad { ctrl, to } => {
                    let curve = QuadraticBezierSegment {
                        from: point(cursor.x, cursor.y),
                        ctrl: point(ctrl.x, ctrl.y),
                        to: point(to.x, to.y),
                    };
                    curve.for_each_flattened(tolerance, &mut |line: &LineSegment<f32>| {
                        out.push(Vec2::new(line.to.x, line.to.y));
                    });
                    // land exactly on the authored end point
                    if let Some(last) = out.last_mut() {
                        *last = to;
                    }
                }
            }
            cursor = seg.end();
        }

        if out.len() > 1 && out[out.len() - 1] == self.start {
            out.pop();
        }
        out
    }
}

/// Outer boundary plus zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub outer: Contour,
    pub holes: Vec<Contour>,
}

impl Profile {
    pub fn solid(outer: Contour) -> Self {
        Self { outer, holes: Vec::new() }
    }

    /// Flattened contours, outer boundary first.
    pub fn flatten(&self, tolerance: f32) -> Vec<Vec<Vec2>> {
        std::iter::once(&self.outer)
            .chain(self.holes.iter())
            .map(|c| c.flatten(tolerance))
            .collect()
    }
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// Spur gear outline parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearParams {
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub tooth_count: u32,
    /// Share of each `2π / tooth_count` sector taken by the tooth.
    pub tooth_fraction: f32,
    pub bore_radius: f32,
}

impl GearParams {
    /// Root and tip radii given directly; bore is `0.3 × inner_radius`.
    pub fn new(inner_radius: f32, outer_radius: f32, tooth_count: u32) -> Self {
        Self {
            inner_radius,
            outer_radius,
            tooth_count,
            tooth_fraction: DEFAULT_TOOTH_FRACTION,
            bore_radius: inner_radius * BORE_RATIO,
        }
    }

    /// Catalog form: `radius` is the tip radius, the root sits at 70% of it
    /// and the bore at 30% of it.
    pub fn from_nominal(radius: f32, tooth_count: u32) -> Self {
        Self {
            inner_radius: radius * GEAR_ROOT_RATIO,
            outer_radius: radius,
            tooth_count,
            tooth_fraction: DEFAULT_TOOTH_FRACTION,
            bore_radius: radius * BORE_RATIO,
        }
    }

    pub fn with_tooth_fraction(mut self, fraction: f32) -> Self {
        self.tooth_fraction = fraction;
        self
    }

    pub fn with_bore_radius(mut self, radius: f32) -> Self {
        self.bore_radius = radius;
        self
    }

    /// Smallest feature of the outline: the chord across a tooth tip, or the
    /// tooth height if that is shorter.
    pub fn min_feature(&self) -> f32 {
        let width = self.tooth_fraction * TAU / self.tooth_count as f32;
        let land = width * (1.0 - 2.0 * TOOTH_FLANK);
        let tip_chord = 2.0 * self.outer_radius * (land * 0.5).sin();
        tip_chord.min(self.outer_radius - self.inner_radius)
    }

    /// Leading root angle of tooth `i`, computed directly from its index.
    pub fn tooth_angle(&self, i: u32) -> f32 {
        i as f32 * TAU / self.tooth_count as f32
    }

    pub fn validate(&self) -> GeometryResult<()> {
        if self.tooth_count < 3 {
            return Err(GeometryError::param(
                "tooth_count",
                format!("need at least 3 teeth, got {}", self.tooth_count),
            ));
        }
        positive("inner_radius", self.inner_radius)?;
        if !(self.outer_radius > self.inner_radius) || !self.outer_radius.is_finite() {
            return Err(GeometryError::param(
                "outer_radius",
                format!("{} must exceed the inner radius {}", self.outer_radius, self.inner_radius),
            ));
        }
        if !(self.tooth_fraction > 0.0 && self.tooth_fraction < 1.0) {
            return Err(GeometryError::param(
                "tooth_fraction",
                format!("{} is not strictly between 0 and 1", self.tooth_fraction),
            ));
        }
        if !(self.bore_radius > 0.0 && self.bore_radius < self.inner_radius) {
            return Err(GeometryError::param(
                "bore_radius",
                format!("{} is not between 0 and the inner radius", self.bore_radius),
            ));
        }
        Ok(())
    }
}

/// Every outline the synthesizer knows how to build, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileKind {
    Gear(GearParams),
    /// Side silhouette of the car, x along the length, y up.
    CarBody { length: f32, height: f32 },
    /// Door skin with a window cut-out. `hinge_offset` shifts the panel so the
    /// hinge line sits at x = 0.
    DoorPanel { length: f32, height: f32, hinge_offset: f32 },
    /// Hood or trunk lid cross-section, swept across the car's width.
    HatchPanel { length: f32, hinge_offset: f32 },
    Disc { radius: f32 },
    RoundedRect { width: f32, height: f32, corner_radius: f32 },
    /// Rounded plate with four mounting holes, each `hole_inset` in from the corners.
    MountingPlate {
        width: f32,
        depth: f32,
        corner_radius: f32,
        hole_radius: f32,
        hole_inset: Vec2,
    },
}

/// Hashable identity of a parameter set, quantized so float noise below
/// 1e-4 does not split cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileKey {
    kind: &'static str,
    params: Vec<i64>,
}

pub(crate) fn quantize(v: f32) -> i64 {
    (v as f64 * 1e4).round() as i64
}

impl ProfileKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::Gear(_) => "gear",
            ProfileKind::CarBody { .. } => "car_body",
            ProfileKind::DoorPanel { .. } => "door_panel",
            ProfileKind::HatchPanel { .. } => "hatch_panel",
            ProfileKind::Disc { .. } => "disc",
            ProfileKind::RoundedRect { .. } => "rounded_rect",
            ProfileKind::MountingPlate { .. } => "mounting_plate",
        }
    }

    pub fn key(&self) -> ProfileKey {
        let floats: Vec<f32> = match *self {
            ProfileKind::Gear(g) => vec![
                g.inner_radius,
                g.outer_radius,
                g.tooth_count as f32,
                g.tooth_fraction,
                g.bore_radius,
            ],
            ProfileKind::CarBody { length, height } => vec![length, height],
            ProfileKind::DoorPanel { length, height, hinge_offset } => vec![length, height, hinge_offset],
            ProfileKind::HatchPanel { length, hinge_offset } => vec![length, hinge_offset],
            ProfileKind::Disc { radius } => vec![radius],
            ProfileKind::RoundedRect { width, height, corner_radius } => vec![width, height, corner_radius],
            ProfileKind::MountingPlate { width, depth, corner_radius, hole_radius, hole_inset } => {
                vec![width, depth, corner_radius, hole_radius, hole_inset.x, hole_inset.y]
            }
        };
        ProfileKey {
            kind: self.name(),
            params: floats.into_iter().map(quantize).collect(),
        }
    }
}

fn positive(name: &'static str, v: f32) -> GeometryResult<()> {
    if v > 0.0 && v.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::param(name, format!("{v} must be positive")))
    }
}

fn finite(name: &'static str, v: f32) -> GeometryResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(GeometryError::param(name, format!("{v} is not finite")))
    }
}

// ============================================================================
// BUILDERS
// ============================================================================

/// Build the outline for `kind`. Parameters are checked before any point is produced.
pub fn build_profile(kind: &ProfileKind) -> GeometryResult<Profile> {
    match *kind {
        ProfileKind::Gear(params) => gear(&params),
        ProfileKind::CarBody { length, height } => {
            positive("length", length)?;
            positive("height", height)?;
            Ok(car_body(length, height))
        }
        ProfileKind::DoorPanel { length, height, hinge_offset } => {
            positive("length", length)?;
            positive("height", height)?;
            finite("hinge_offset", hinge_offset)?;
            Ok(door_panel(length, height, hinge_offset))
        }
        ProfileKind::HatchPanel { length, hinge_offset } => {
            positive("length", length)?;
            finite("hinge_offset", hinge_offset)?;
            Ok(hatch_panel(length, hinge_offset))
        }
        ProfileKind::Disc { radius } => {
            positive("radius", radius)?;
            Ok(Profile::solid(Contour::circle(Vec2::ZERO, radius, CIRCLE_SEGMENTS)))
        }
        ProfileKind::RoundedRect { width, height, corner_radius } => {
            positive("width", width)?;
            positive("height", height)?;
            check_corner(corner_radius, width, height)?;
            Ok(Profile::solid(rounded_rect(width * 0.5, height * 0.5, corner_radius)))
        }
        ProfileKind::MountingPlate { width, depth, corner_radius, hole_radius, hole_inset } => {
            positive("width", width)?;
            positive("depth", depth)?;
            check_corner(corner_radius, width, depth)?;
            positive("hole_radius", hole_radius)?;
            let (hw, hd) = (width * 0.5, depth * 0.5);
            if !(hole_inset.x > hole_radius && hole_inset.x < hw && hole_inset.y > hole_radius && hole_inset.y < hd) {
                return Err(GeometryError::param(
                    "hole_inset",
                    format!("{hole_inset} leaves a hole of radius {hole_radius} outside the {width}x{depth} plate"),
                ));
            }
            Ok(mounting_plate(hw, hd, corner_radius, hole_radius, hole_inset))
        }
    }
}

fn check_corner(r: f32, width: f32, height: f32) -> GeometryResult<()> {
    if r >= 0.0 && r < width.min(height) * 0.5 {
        Ok(())
    } else {
        Err(GeometryError::param(
            "corner_radius",
            format!("{r} must be non-negative and under half of {}", width.min(height)),
        ))
    }
}

fn gear(params: &GearParams) -> GeometryResult<Profile> {
    params.validate()?;

    let n = params.tooth_count;
    let sector = TAU / n as f32;
    let width = params.tooth_fraction * sector;
    let flank = TOOTH_FLANK * width;
    let at = |angle: f32, r: f32| Vec2::new(angle.cos(), angle.sin()) * r;

    let mut points = Vec::with_capacity(n as usize * 4);
    for i in 0..n {
        let a0 = params.tooth_angle(i);
        points.push(at(a0, params.inner_radius));
        points.push(at(a0 + flank, params.outer_radius));
        points.push(at(a0 + width - flank, params.outer_radius));
        points.push(at(a0 + width, params.inner_radius));
    }

    let bore = Contour::circle(Vec2::ZERO, params.bore_radius, CIRCLE_SEGMENTS).reversed();
    Ok(Profile { outer: Contour::polygon(&points), holes: vec![bore] })
}

fn car_body(length: f32, height: f32) -> Profile {
    let v = |x: f32, y: f32| Vec2::new(x, y);
    // Authored at 3.5 x 1.1, nose toward +x, rocker at y = -0.3.
    let outline = Contour::new(v(-1.75, -0.15))
        .quad_to(v(-1.75, -0.3), v(-1.6, -0.3))
        .line_to(v(1.6, -0.3))
        .quad_to(v(1.75, -0.3), v(1.75, -0.15))
        .line_to(v(1.75, 0.1))
        .quad_to(v(1.75, 0.26), v(1.6, 0.28))
        .line_to(v(1.05, 0.32))
        .line_to(v(0.85, 0.55))
        .quad_to(v(0.65, 0.8), v(0.45, 0.8))
        .line_to(v(-0.4, 0.8))
        .quad_to(v(-0.65, 0.8), v(-0.8, 0.6))
        .quad_to(v(-0.95, 0.32), v(-1.1, 0.3))
        .line_to(v(-1.6, 0.3))
        .quad_to(v(-1.75, 0.3), v(-1.75, 0.2));

    let scale = Vec2::new(length / BODY_REF_LENGTH, height / BODY_REF_HEIGHT);
    Profile::solid(outline.map_points(|p| p * scale))
}

fn door_panel(length: f32, height: f32, hinge_offset: f32) -> Profile {
    let v = |x: f32, y: f32| Vec2::new(x, y);
    let skin = Contour::new(v(-0.5, -0.5))
        .line_to(v(0.5, -0.5))
        .line_to(v(0.5, 0.15))
        .quad_to(v(0.5, 0.5), v(0.15, 0.5))
        .line_to(v(-0.4, 0.5))
        .quad_to(v(-0.5, 0.5), v(-0.5, 0.4));
    let window = Contour::new(v(-0.4, 0.1))
        .line_to(v(0.38, 0.1))
        .quad_to(v(0.4, 0.42), v(0.12, 0.42))
        .line_to(v(-0.4, 0.42))
        .reversed();

    let place = |p: Vec2| Vec2::new(p.x * length + hinge_offset, p.y * height);
    Profile {
        outer: skin.map_points(place),
        holes: vec![window.map_points(place)],
    }
}

fn hatch_panel(length: f32, hinge_offset: f32) -> Profile {
    let (half, t) = (length * 0.5, HATCH_THICKNESS * 0.5);
    let v = |x: f32, y: f32| Vec2::new(x + hinge_offset, y);
    let lid = Contour::new(v(-half, -t))
        .quad_to(v(0.0, -t + HATCH_CROWN), v(half, -t))
        .line_to(v(half, t))
        .quad_to(v(0.0, t + HATCH_CROWN), v(-half, t));
    Profile::solid(lid)
}

fn rounded_rect(hw: f32, hh: f32, r: f32) -> Contour {
    let v = |x: f32, y: f32| Vec2::new(x, y);
    if r <= 0.0 {
        return Contour::polygon(&[v(-hw, -hh), v(hw, -hh), v(hw, hh), v(-hw, hh)]);
    }
    Contour::new(v(-hw + r, -hh))
        .line_to(v(hw - r, -hh))
        .quad_to(v(hw, -hh), v(hw, -hh + r))
        .line_to(v(hw, hh - r))
        .quad_to(v(hw, hh), v(hw - r, hh))
        .line_to(v(-hw + r, hh))
        .quad_to(v(-hw, hh), v(-hw, hh - r))
        .line_to(v(-hw, -hh + r))
        .quad_to(v(-hw, -hh), v(-hw + r, -hh))
}

fn mounting_plate(hw: f32, hd: f32, corner: f32, hole_radius: f32, inset: Vec2) -> Profile {
    let (hx, hy) = (hw - inset.x, hd - inset.y);
    let holes = [(-hx, -hy), (hx, -hy), (hx, hy), (-hx, hy)]
        .into_iter()
        .map(|(x, y)| Contour::circle(Vec2::new(x, y), hole_radius, MOUNT_HOLE_SEGMENTS).reversed())
        .collect();
    Profile { outer: rounded_rect(hw, hd, corner), holes }
}
