// Procedural mesh types and triangulation.
//
// Two-layer architecture:
//   profile sweep → PolyMesh (welded, n-gon faces) → triangulate_flat()/triangulate_smooth() → RenderMesh → GPU
//
// PolyMesh keeps vertices welded so topology checks (closed manifold) are exact.
// RenderMesh is what the shell uploads; it may duplicate positions to carry hard normals.

use std::collections::HashSet;
use glam::Vec3;

// ============================================================================
// GPU VERTEX
// ============================================================================

/// Vertex as the part shader reads it: position at location 0, normal at 1.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal:   [f32; 3],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// ============================================================================
// BOUNDS
// ============================================================================

/// Axis-aligned bounding box in the mesh's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of a point set. An empty set yields a degenerate box at the origin.
    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self { min: Vec3::ZERO, max: Vec3::ZERO };
        };
        iter.fold(Self { min: first, max: first }, |acc, p| Self {
            min: acc.min.min(p),
            max: acc.max.max(p),
        })
    }

    pub fn center(&self) -> Vec3 { (self.min + self.max) * 0.5 }
    pub fn size(&self) -> Vec3 { self.max - self.min }

    /// Slab test. Returns the entry distance along `dir` (or 0 if the origin is inside).
    pub fn ray_hit(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = dir[axis];
            if d.abs() < 1e-8 {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (self.min[axis] - o) * inv;
            let mut t1 = (self.max[axis] - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

// ============================================================================
// POLY MESH
// ============================================================================

/// Welded polygon mesh. Faces are index loops of any length, wound
/// counter-clockwise seen from outside.
#[derive(Debug, Clone, Default)]
pub struct PolyMesh {
    pub positions: Vec<Vec3>,
    pub faces: Vec<Vec<usize>>,
}

impl PolyMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, pos: Vec3) -> usize {
        self.positions.push(pos);
        self.positions.len() - 1
    }

    pub fn add_face(&mut self, indices: Vec<usize>) {
        debug_assert!(indices.len() >= 3, "degenerate face {indices:?}");
        self.faces.push(indices);
    }

    pub fn vertex_count(&self) -> usize { self.positions.len() }
    pub fn face_count(&self) -> usize { self.faces.len() }

    /// True when every directed edge appears exactly once and its reverse also appears.
    ///
    /// That is: each undirected edge borders exactly two faces with opposite
    /// traversal, so the surface is closed and consistently oriented.
    pub fn is_closed_manifold(&self) -> bool {
        let mut directed: HashSet<(usize, usize)> = HashSet::new();

        for face in &self.faces {
            let n = face.len();
            for i in 0..n {
                let edge = (face[i], face[(i + 1) % n]);
                if edge.0 == edge.1 || !directed.insert(edge) {
                    return false;
                }
            }
        }

        directed.iter().all(|&(a, b)| directed.contains(&(b, a)))
    }
}

// ============================================================================
// RENDER MESH
// ============================================================================

/// Indexed triangle list ready for upload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderMesh {
    pub vertices: Vec<GpuVertex>,
    pub indices:  Vec<u32>,
}

impl RenderMesh {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> usize  { self.indices.len() }
    pub fn triangle_count(&self) -> usize { self.indices.len() / 3 }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.vertices.iter().map(|v| Vec3::from_array(v.position)))
    }
}

// ============================================================================
// TRIANGULATION
// ============================================================================

/// Fan triangles of each face, in order.
fn fan(face: &[usize]) -> impl Iterator<Item = [usize; 3]> + '_ {
    (1..face.len().saturating_sub(1)).map(move |i| [face[0], face[i], face[i + 1]])
}

/// Shared-vertex triangulation with smooth normals, for imported meshes.
/// Each vertex normal sums the unnormalized cross products of the triangles
/// around it, so larger triangles weigh more.
pub fn triangulate_smooth(poly: &PolyMesh) -> RenderMesh {
    let mut normals = vec![Vec3::ZERO; poly.vertex_count()];
    let mut indices = Vec::new();

    for tri in poly.faces.iter().flat_map(|f| fan(f)) {
        let [a, b, c] = tri.map(|i| poly.positions[i]);
        let weighted = (b - a).cross(c - a);
        for i in tri {
            normals[i] += weighted;
            indices.push(i as u32);
        }
    }

    let vertices = poly
        .positions
        .iter()
        .zip(&normals)
        .map(|(p, n)| GpuVertex { position: p.to_array(), normal: n.normalize_or_zero().to_array() })
        .collect();

    RenderMesh { vertices, indices }
}

/// Convert a PolyMesh to a RenderMesh with one normal per face (hard edges).
///
/// Every face gets its own copy of its corner vertices so that machined
/// parts (gear flanks, panel edges) keep crisp shading. Faces are assumed
/// planar and convex enough for a fan from vertex 0, which holds for the
/// quads and triangles produced by profile sweeps.
pub fn triangulate_flat(poly: &PolyMesh) -> RenderMesh {
    let corner_total: usize = poly.faces.iter().map(|f| f.len()).sum();
    let mut vertices = Vec::with_capacity(corner_total);
    let mut indices = Vec::with_capacity(corner_total * 3);

    for face in &poly.faces {
        let n = face.len();

        // Newell's method: robust for quads that are only nearly planar
        let mut normal = Vec3::ZERO;
        for i in 0..n {
            let cur = poly.positions[face[i]];
            let next = poly.positions[face[(i + 1) % n]];
            normal.x += (cur.y - next.y) * (cur.z + next.z);
            normal.y += (cur.z - next.z) * (cur.x + next.x);
            normal.z += (cur.x - next.x) * (cur.y + next.y);
        }
        let normal = normal.normalize_or_zero().to_array();

        let base = vertices.len() as u32;
        vertices.extend(face.iter().map(|&vi| GpuVertex {
            position: poly.positions[vi].to_array(),
            normal,
        }));
        indices.extend((1..n as u32 - 1).flat_map(|i| [base, base + i, base + i + 1]));
    }

    RenderMesh { vertices, indices }
}
