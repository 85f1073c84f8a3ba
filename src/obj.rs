// Whole-file Wavefront OBJ loading for externally authored assets.
// Only positions and faces are read; normals are recomputed smooth.

use std::path::Path;

use anyhow::{Context, Result, bail};
use explode_view::engine::mesh::{Aabb, PolyMesh, RenderMesh, triangulate_smooth};
use glam::Vec3;

/// Uniform scale applied to loaded assets.
pub const ASSET_SCALE: f32 = 0.3;

/// Parse OBJ text into a polygon mesh. Faces may use `v`, `v/vt`, `v//vn`
/// or `v/vt/vn` references, positive or negative (relative).
pub fn parse_obj(src: &str) -> Result<PolyMesh> {
    let mut mesh = PolyMesh::new();

    for (line_no, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let coords: Vec<f32> = parts
                    .take(3)
                    .map(|p| p.parse::<f32>())
                    .collect::<std::result::Result<_, _>>()
                    .with_context(|| format!("line {}: bad vertex", line_no + 1))?;
                if coords.len() < 3 {
                    bail!("line {}: vertex needs three coordinates", line_no + 1);
                }
                mesh.add_vertex(Vec3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                let count = mesh.vertex_count();
                let face = parts
                    .map(|token| resolve_index(token, count))
                    .collect::<Option<Vec<usize>>>()
                    .with_context(|| format!("line {}: bad face reference", line_no + 1))?;
                if face.len() >= 3 {
                    mesh.add_face(face);
                } else {
                    log::warn!("line {}: skipping face with {} corners", line_no + 1, face.len());
                }
            }
            _ => {}
        }
    }

    if mesh.face_count() == 0 {
        bail!("no faces");
    }
    Ok(mesh)
}

fn resolve_index(token: &str, count: usize) -> Option<usize> {
    let raw: i64 = token.split('/').next()?.parse().ok()?;
    let index = match raw {
        0 => return None,
        r if r > 0 => r as usize - 1,
        r => count.checked_sub(r.unsigned_abs() as usize)?,
    };
    (index < count).then_some(index)
}

/// Scale by `ASSET_SCALE` and center on the XZ plane; the base height is kept.
pub fn normalize(mesh: &mut RenderMesh) {
    let bounds = mesh.bounds();
    let center = bounds.center() * ASSET_SCALE;
    let shift = Vec3::new(center.x, 0.0, center.z);
    for v in &mut mesh.vertices {
        v.position = (Vec3::from_array(v.position) * ASSET_SCALE - shift).to_array();
    }
}

/// Load, triangulate and normalize an asset. Returns the mesh and its bounds.
pub fn load_asset(path: &Path) -> Result<(RenderMesh, Aabb)> {
    let src = std::fs::read_to_string(path).with_context(|| format!("Failed to open OBJ: {:?}", path))?;
    let poly = parse_obj(&src).with_context(|| format!("Failed to parse OBJ: {:?}", path))?;
    let mut mesh = triangulate_smooth(&poly);
    normalize(&mut mesh);
    let bounds = mesh.bounds();
    log::info!(
        "loaded {:?}: {} vertices, {} triangles",
        path,
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok((mesh, bounds))
}
