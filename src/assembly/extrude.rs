// Sweeps a 2D profile along +Z into a closed, flat-shaded solid.
//
// Pipeline:
//   Profile → flatten + validate → rings (one per bevel station) → welded PolyMesh
//   → manifold check → triangulate_flat → RenderMesh
//
// The side wall always sits on the exact profile. A bevel only rounds the
// transition into each cap: the cap is inset by `size` and the wall stops
// `thickness` short of it, joined by a quarter ellipse.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{Vec2, Vec3};
use lyon_path::Path;
use lyon_path::math::point;
use lyon_tessellation::{BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers};

use super::error::{GeometryError, GeometryFault, GeometryResult};
use super::outline::{
    dedup_closed, is_simple, point_in_polygon, polygons_intersect, signed_area,
};
use super::profile::{Profile, ProfileKey, ProfileKind, build_profile, quantize};
use crate::engine::mesh::{Aabb, PolyMesh, RenderMesh, triangulate_flat};

/// Max chord deviation when flattening curved profile segments.
pub const FLATTEN_TOLERANCE: f32 = 0.005;

/// Longest allowed inset direction, relative to the inset distance.
const MITER_LIMIT: f32 = 4.0;

/// Contours with less area than this are degenerate.
const MIN_AREA: f32 = 1e-8;

/// Rounded transition between the side wall and each cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bevel {
    /// Depth along Z taken from each end.
    pub thickness: f32,
    /// Inset of the cap from the wall.
    pub size: f32,
    pub segments: u32,
}

impl Bevel {
    pub const fn new(thickness: f32, size: f32, segments: u32) -> Self {
        Self { thickness, size, segments }
    }

    fn validate(&self, depth: f32) -> GeometryResult<()> {
        if !(self.thickness >= 0.0 && self.thickness.is_finite()) {
            return Err(GeometryError::param("bevel_thickness", format!("{} is not a usable length", self.thickness)));
        }
        if !(self.size >= 0.0 && self.size.is_finite()) {
            return Err(GeometryError::param("bevel_size", format!("{} is not a usable length", self.size)));
        }
        if self.segments == 0 {
            return Err(GeometryError::param("bevel_segments", "need at least one segment"));
        }
        if !(2.0 * self.thickness < depth) {
            return Err(GeometryError::param(
                "bevel_thickness",
                format!("{} leaves no side wall on a solid {} deep", self.thickness, depth),
            ));
        }
        Ok(())
    }
}

/// A synthesized solid, ready for upload. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub mesh: RenderMesh,
    pub bounds: Aabb,
}

/// Shared, read-only handle to a synthesized solid.
pub type GeometryHandle = Arc<Solid>;

/// One cross-section of the sweep.
#[derive(Debug, Clone, Copy)]
struct Station {
    inset: f32,
    z: f32,
}

/// Extrude `profile` to `depth`, centred on z = 0.
pub fn extrude(profile: &Profile, depth: f32, bevel: Option<Bevel>) -> GeometryResult<Solid> {
    if !(depth > 0.0 && depth.is_finite()) {
        return Err(GeometryError::param("depth", format!("{depth} must be positive")));
    }
    let bevel = match bevel {
        Some(b) => {
            b.validate(depth)?;
            (b.thickness > 0.0 || b.size > 0.0).then_some(b)
        }
        None => None,
    };

    let mut contours = profile.flatten(FLATTEN_TOLERANCE);
    contours.iter_mut().for_each(dedup_closed);
    validate_contours(&contours)?;
    normalize_winding(&mut contours);

    let stations = stations(depth, bevel);
    let miters: Vec<Vec<Vec2>> = contours.iter().map(|c| miter_directions(c)).collect();

    // The cap is the last station; compute it the same way the rings are so
    // tessellator output maps back bit-for-bit.
    let cap_inset = stations.last().map_or(0.0, |s| s.inset);
    let cap: Vec<Vec<Vec2>> = contours
        .iter()
        .zip(&miters)
        .map(|(c, m)| c.iter().zip(m).map(|(&p, &d)| inset_point(p, d, cap_inset)).collect())
        .collect();

    if cap_inset > 0.0 {
        validate_contours(&cap).map_err(|fault| GeometryFault::BevelCollapse { contour: contour_of(&fault) })?;
        for (i, (before, after)) in contours.iter().zip(&cap).enumerate() {
            if signed_area(before).signum() != signed_area(after).signum() || edges_flipped(before, after) {
                return Err(GeometryFault::BevelCollapse { contour: i }.into());
            }
        }
    }

    let mesh = sweep(&contours, &miters, &stations, &cap)?;
    if !mesh.is_closed_manifold() {
        return Err(GeometryFault::NotManifold.into());
    }

    let render = triangulate_flat(&mesh);
    let bounds = render.bounds();
    Ok(Solid { mesh: render, bounds })
}

fn validate_contours(contours: &[Vec<Vec2>]) -> Result<(), GeometryFault> {
    for (i, c) in contours.iter().enumerate() {
        if c.len() < 3 {
            return Err(GeometryFault::TooFewPoints { contour: i });
        }
        if signed_area(c).abs() <= MIN_AREA {
            return Err(GeometryFault::ZeroArea { contour: i });
        }
        if !is_simple(c) {
            return Err(GeometryFault::SelfIntersection { contour: i });
        }
    }

    for a in 0..contours.len() {
        for b in (a + 1)..contours.len() {
            if polygons_intersect(&contours[a], &contours[b]) {
                return Err(GeometryFault::ContourOverlap { a, b });
            }
        }
    }

    let Some((outer, holes)) = contours.split_first() else {
        return Err(GeometryFault::TooFewPoints { contour: 0 });
    };
    for (i, hole) in holes.iter().enumerate() {
        if !point_in_polygon(hole[0], outer) {
            return Err(GeometryFault::HoleOutside { contour: i + 1 });
        }
        // a hole inside another hole would be an island, which the sweep does not support
        for (j, other) in holes.iter().enumerate() {
            if i != j && point_in_polygon(hole[0], other) {
                return Err(GeometryFault::ContourOverlap { a: j + 1, b: i + 1 });
            }
        }
    }
    Ok(())
}

/// True when insetting turned any edge around, which means the offset overran it.
fn edges_flipped(before: &[Vec2], after: &[Vec2]) -> bool {
    let n = before.len();
    (0..n).any(|i| {
        let j = (i + 1) % n;
        (after[j] - after[i]).dot(before[j] - before[i]) <= 0.0
    })
}

fn contour_of(fault: &GeometryFault) -> usize {
    match *fault {
        GeometryFault::TooFewPoints { contour }
        | GeometryFault::ZeroArea { contour }
        | GeometryFault::SelfIntersection { contour }
        | GeometryFault::HoleOutside { contour }
        | GeometryFault::BevelCollapse { contour } => contour,
        GeometryFault::ContourOverlap { b, .. } => b,
        GeometryFault::Tessellation(_) | GeometryFault::NotManifold => 0,
    }
}

/// Outer boundary counter-clockwise, holes clockwise: material is always on the left.
fn normalize_winding(contours: &mut [Vec<Vec2>]) {
    for (i, c) in contours.iter_mut().enumerate() {
        let ccw = signed_area(c) > 0.0;
        if (i == 0) != ccw {
            c.reverse();
        }
    }
}

/// Ring stations from the back cap (z = -depth/2) to the front cap.
fn stations(depth: f32, bevel: Option<Bevel>) -> Vec<Station> {
    let half = depth * 0.5;
    let Some(b) = bevel else {
        return vec![Station { inset: 0.0, z: -half }, Station { inset: 0.0, z: half }];
    };

    let s = b.segments;
    let arc = |k: u32| {
        if k == s {
            return (b.size, b.thickness);
        }
        let theta = k as f32 / s as f32 * FRAC_PI_2;
        (b.size * (1.0 - theta.cos()), b.thickness * theta.sin())
    };
    let wall = half - b.thickness;

    let back = (0..=s).rev().map(|k| {
        let (inset, rise) = arc(k);
        Station { inset, z: -wall - rise }
    });
    let front = (0..=s).map(|k| {
        let (inset, rise) = arc(k);
        Station { inset, z: wall + rise }
    });
    back.chain(front).collect()
}

/// Per-vertex direction that moves both adjacent edges inward by one unit.
fn miter_directions(points: &[Vec2]) -> Vec<Vec2> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            let n1 = (cur - prev).normalize_or_zero().perp();
            let n2 = (next - cur).normalize_or_zero().perp();
            let denom = 1.0 + n1.dot(n2);
            let m = if denom > 1e-6 { (n1 + n2) / denom } else { n1 };
            m.clamp_length_max(MITER_LIMIT)
        })
        .collect()
}

fn inset_point(p: Vec2, dir: Vec2, inset: f32) -> Vec2 {
    if inset == 0.0 { p } else { p + dir * inset }
}

fn sweep(
    contours: &[Vec<Vec2>],
    miters: &[Vec<Vec2>],
    stations: &[Station],
    cap: &[Vec<Vec2>],
) -> GeometryResult<PolyMesh> {
    let per_ring: usize = contours.iter().map(Vec::len).sum();
    let offsets: Vec<usize> = contours
        .iter()
        .scan(0, |acc, c| {
            let start = *acc;
            *acc += c.len();
            Some(start)
        })
        .collect();

    let mut mesh = PolyMesh::new();
    for st in stations {
        for (c, m) in contours.iter().zip(miters) {
            for (&p, &d) in c.iter().zip(m) {
                let q = inset_point(p, d, st.inset);
                mesh.add_vertex(Vec3::new(q.x, q.y, st.z));
            }
        }
    }

    let idx = |ring: usize, contour: usize, i: usize| {
        ring * per_ring + offsets[contour] + i % contours[contour].len()
    };

    // Walls: edge direction × +Z points away from the material.
    for ring in 0..stations.len() - 1 {
        for (ci, c) in contours.iter().enumerate() {
            for i in 0..c.len() {
                mesh.add_face(vec![
                    idx(ring, ci, i),
                    idx(ring, ci, i + 1),
                    idx(ring + 1, ci, i + 1),
                    idx(ring + 1, ci, i),
                ]);
            }
        }
    }

    let front = (stations.len() - 1) * per_ring;
    for [a, b, c] in tessellate_cap(cap)? {
        mesh.add_face(vec![front + a, front + b, front + c]);
        mesh.add_face(vec![c, b, a]);
    }

    Ok(mesh)
}

/// Counter-clockwise cap triangles, indexed into the concatenated contours.
fn tessellate_cap(contours: &[Vec<Vec2>]) -> Result<Vec<[usize; 3]>, GeometryFault> {
    let flat: Vec<Vec2> = contours.iter().flatten().copied().collect();
    let mut lookup: HashMap<(u32, u32), usize> = HashMap::with_capacity(flat.len());
    for (i, p) in flat.iter().enumerate() {
        lookup.entry((p.x.to_bits(), p.y.to_bits())).or_insert(i);
    }

    let mut builder = Path::builder();
    for c in contours {
        builder.begin(point(c[0].x, c[0].y));
        for p in &c[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.close();
    }
    let path = builder.build();

    let mut buffers: VertexBuffers<Vec2, u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::tolerance(FLATTEN_TOLERANCE).with_fill_rule(FillRule::EvenOdd),
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| {
                Vec2::new(vertex.position().x, vertex.position().y)
            }),
        )
        .map_err(|e| GeometryFault::Tessellation(format!("{e:?}")))?;

    let nearest = |p: Vec2| {
        flat.iter()
            .enumerate()
            .map(|(i, q)| (i, q.distance_squared(p)))
            .filter(|&(_, d)| d <= 1e-8)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    };
    let remap = buffers
        .vertices
        .iter()
        .map(|p| lookup.get(&(p.x.to_bits(), p.y.to_bits())).copied().or_else(|| nearest(*p)))
        .collect::<Option<Vec<usize>>>()
        .ok_or_else(|| GeometryFault::Tessellation("cap vertex does not lie on the outline".to_string()))?;

    let mut triangles = Vec::with_capacity(buffers.indices.len() / 3);
    for t in buffers.indices.chunks_exact(3) {
        let [a, b, c] = [remap[t[0] as usize], remap[t[1] as usize], remap[t[2] as usize]];
        if a == b || b == c || a == c {
            continue;
        }
        let area = (flat[b] - flat[a]).perp_dot(flat[c] - flat[a]);
        triangles.push(if area < 0.0 { [a, c, b] } else { [a, b, c] });
    }
    Ok(triangles)
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SolidKey {
    profile: ProfileKey,
    depth: i64,
    bevel: Option<(i64, i64, u32)>,
}

impl SolidKey {
    fn new(kind: &ProfileKind, depth: f32, bevel: Option<Bevel>) -> Self {
        Self {
            profile: kind.key(),
            depth: quantize(depth),
            bevel: bevel.map(|b| (quantize(b.thickness), quantize(b.size), b.segments)),
        }
    }
}

/// Memoizes solids by their generating parameters.
#[derive(Debug, Default)]
pub struct GeometryCache {
    solids: HashMap<SolidKey, GeometryHandle>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached solid for these parameters, synthesizing it on first use.
    /// Failures are not cached.
    pub fn get_or_build(
        &mut self,
        kind: &ProfileKind,
        depth: f32,
        bevel: Option<Bevel>,
    ) -> GeometryResult<GeometryHandle> {
        let key = SolidKey::new(kind, depth, bevel);
        if let Some(handle) = self.solids.get(&key) {
            log::trace!("geometry cache hit: {:?}", key);
            return Ok(Arc::clone(handle));
        }

        let solid = extrude(&build_profile(kind)?, depth, bevel)?;
        log::debug!(
            "synthesized {} solid: {} triangles, depth {}",
            kind.name(),
            solid.mesh.triangle_count(),
            depth
        );
        let handle = Arc::new(solid);
        self.solids.insert(key, Arc::clone(&handle));
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.solids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::profile::{Contour, GearParams};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn volume(mesh: &RenderMesh) -> f32 {
        let p = |i: u32| Vec3::from_array(mesh.vertices[i as usize].position);
        mesh.indices
            .chunks_exact(3)
            .map(|t| p(t[0]).dot(p(t[1]).cross(p(t[2]))) / 6.0)
            .sum()
    }

    fn net_area(profile: &Profile) -> f32 {
        let contours = profile.flatten(FLATTEN_TOLERANCE);
        let outer = signed_area(&contours[0]).abs();
        outer - contours[1..].iter().map(|c| signed_area(c).abs()).sum::<f32>()
    }

    fn square(half: f32, center: Vec2) -> Contour {
        Contour::polygon(&[
            center + Vec2::new(-half, -half),
            center + Vec2::new(half, -half),
            center + Vec2::new(half, half),
            center + Vec2::new(-half, half),
        ])
    }

    #[test]
    fn plain_sweep_volume_is_area_times_depth() {
        let profile = build_profile(&ProfileKind::Disc { radius: 1.0 }).unwrap();
        let solid = extrude(&profile, 2.0, None).unwrap();
        assert_relative_eq!(volume(&solid.mesh), net_area(&profile) * 2.0, max_relative = 1e-4);
        assert_relative_eq!(solid.bounds.min.z, -1.0);
        assert_relative_eq!(solid.bounds.max.z, 1.0);
    }

    #[test]
    fn holes_are_subtracted_from_the_volume() {
        let kind = ProfileKind::MountingPlate {
            width: 4.0,
            depth: 2.5,
            corner_radius: 0.0,
            hole_radius: 0.08,
            hole_inset: Vec2::new(0.5, 0.45),
        };
        let profile = build_profile(&kind).unwrap();
        let solid = extrude(&profile, 0.3, None).unwrap();
        let expected = net_area(&profile) * 0.3;
        assert!(expected < 4.0 * 2.5 * 0.3);
        assert_relative_eq!(volume(&solid.mesh), expected, max_relative = 1e-4);
    }

    #[test]
    fn hole_walls_face_into_the_hole() {
        let profile = Profile { outer: square(1.0, Vec2::ZERO), holes: vec![square(0.25, Vec2::ZERO)] };
        let solid = extrude(&profile, 0.5, None).unwrap();
        for v in &solid.mesh.vertices {
            let n = Vec3::from_array(v.normal);
            let p = Vec3::from_array(v.position);
            if n.z.abs() > 0.5 {
                assert_relative_eq!(n.z.signum(), p.z.signum());
            } else if p.x.abs().max(p.y.abs()) < 0.5 {
                // inner wall: normal points toward the axis
                assert!(n.truncate().dot(p.truncate()) < 0.0);
            } else {
                assert!(n.truncate().dot(p.truncate()) > 0.0);
            }
        }
    }

    #[test]
    fn clockwise_input_is_normalized() {
        let profile = Profile::solid(square(1.0, Vec2::ZERO).reversed());
        let solid = extrude(&profile, 1.0, None).unwrap();
        assert_relative_eq!(volume(&solid.mesh), 4.0, max_relative = 1e-5);
    }

    #[test]
    fn bevel_keeps_the_wall_on_the_profile() {
        let params = GearParams::from_nominal(0.8, 16);
        let profile = build_profile(&ProfileKind::Gear(params)).unwrap();
        let solid = extrude(&profile, 0.3, Some(Bevel::new(0.02, 0.02, 2))).unwrap();

        let max_radius = solid
            .mesh
            .vertices
            .iter()
            .map(|v| Vec2::new(v.position[0], v.position[1]).length())
            .fold(0.0, f32::max);
        assert_relative_eq!(max_radius, 0.8, epsilon = 1e-5);
        assert_relative_eq!(solid.bounds.max.z, 0.15, epsilon = 1e-6);
        assert_relative_eq!(solid.bounds.min.z, -0.15, epsilon = 1e-6);

        // the bevel removes material, never adds it
        let plain = extrude(&profile, 0.3, None).unwrap();
        assert!(volume(&solid.mesh) < volume(&plain.mesh));
        assert!(volume(&solid.mesh) > 0.9 * volume(&plain.mesh));
    }

    #[test]
    fn catalog_shapes_all_sweep() {
        let cases = [
            (ProfileKind::CarBody { length: 3.5, height: 1.1 }, 1.6, Some(Bevel::new(0.03, 0.03, 2))),
            (ProfileKind::DoorPanel { length: 0.8, height: 0.9, hinge_offset: 0.4 }, 0.08, Some(Bevel::new(0.01, 0.01, 1))),
            (ProfileKind::HatchPanel { length: 0.8, hinge_offset: -0.4 }, 1.4, None),
            (ProfileKind::Disc { radius: 0.35 }, 0.25, Some(Bevel::new(0.03, 0.03, 2))),
            (ProfileKind::Gear(GearParams::from_nominal(0.4, 10)), 0.3, Some(Bevel::new(0.02, 0.02, 2))),
            (ProfileKind::RoundedRect { width: 0.9, height: 0.9, corner_radius: 0.1 }, 0.9, Some(Bevel::new(0.036, 0.036, 2))),
        ];
        for (kind, depth, bevel) in cases {
            let profile = build_profile(&kind).unwrap();
            let solid = extrude(&profile, depth, bevel).unwrap_or_else(|e| panic!("{kind:?}: {e}"));
            assert!(solid.mesh.triangle_count() > 0);
            assert!(volume(&solid.mesh) > 0.0, "{kind:?}");
        }
    }

    #[test]
    fn extrude_is_deterministic() {
        let profile = build_profile(&ProfileKind::Gear(GearParams::from_nominal(0.6, 12))).unwrap();
        let bevel = Some(Bevel::new(0.02, 0.02, 2));
        let a = extrude(&profile, 0.3, bevel).unwrap();
        let b = extrude(&profile, 0.3, bevel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn cache_shares_handles_for_identical_keys() {
        let mut cache = GeometryCache::new();
        let kind = ProfileKind::Disc { radius: 0.35 };
        let bevel = Some(Bevel::new(0.03, 0.03, 2));

        let a = cache.get_or_build(&kind, 0.25, bevel).unwrap();
        let b = cache.get_or_build(&kind, 0.25, bevel).unwrap();
        let c = cache.get_or_build(&kind, 0.3, bevel).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn self_intersecting_outline_is_rejected() {
        let bow = Contour::polygon(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(0.0, 1.0),
        ]);
        let err = extrude(&Profile::solid(bow), 1.0, None).unwrap_err();
        assert_eq!(err, GeometryError::InvalidGeometry(GeometryFault::SelfIntersection { contour: 0 }));
    }

    #[test]
    fn degenerate_outlines_are_rejected() {
        let line = Contour::polygon(&[Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]);
        assert_eq!(
            extrude(&Profile::solid(line), 1.0, None).unwrap_err(),
            GeometryError::InvalidGeometry(GeometryFault::ZeroArea { contour: 0 })
        );

        let pair = Contour::polygon(&[Vec2::ZERO, Vec2::X]);
        assert_eq!(
            extrude(&Profile::solid(pair), 1.0, None).unwrap_err(),
            GeometryError::InvalidGeometry(GeometryFault::TooFewPoints { contour: 0 })
        );
    }

    #[test]
    fn misplaced_holes_are_rejected() {
        let outside = Profile { outer: square(1.0, Vec2::ZERO), holes: vec![square(0.2, Vec2::new(3.0, 0.0))] };
        assert_eq!(
            extrude(&outside, 1.0, None).unwrap_err(),
            GeometryError::InvalidGeometry(GeometryFault::HoleOutside { contour: 1 })
        );

        let crossing = Profile { outer: square(1.0, Vec2::ZERO), holes: vec![square(0.5, Vec2::new(0.9, 0.0))] };
        assert_eq!(
            extrude(&crossing, 1.0, None).unwrap_err(),
            GeometryError::InvalidGeometry(GeometryFault::ContourOverlap { a: 0, b: 1 })
        );
    }

    #[test]
    fn oversized_bevel_is_rejected() {
        let profile = Profile::solid(square(0.1, Vec2::ZERO));
        assert_eq!(
            extrude(&profile, 1.0, Some(Bevel::new(0.05, 0.15, 2))).unwrap_err(),
            GeometryError::InvalidGeometry(GeometryFault::BevelCollapse { contour: 0 })
        );
        assert!(matches!(
            extrude(&profile, 0.1, Some(Bevel::new(0.05, 0.01, 2))),
            Err(GeometryError::InvalidParameter { name: "bevel_thickness", .. })
        ));
        assert!(matches!(
            extrude(&profile, 0.0, None),
            Err(GeometryError::InvalidParameter { name: "depth", .. })
        ));
    }

    #[test]
    fn zero_bevel_is_a_plain_sweep() {
        let profile = Profile::solid(square(0.5, Vec2::ZERO));
        let plain = extrude(&profile, 1.0, None).unwrap();
        let zero = extrude(&profile, 1.0, Some(Bevel::new(0.0, 0.0, 3))).unwrap();
        assert_eq!(plain, zero);
        assert_abs_diff_eq!(volume(&plain.mesh), 1.0, epsilon = 1e-6);
    }
}
