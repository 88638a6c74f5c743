//! Triangle meshes and the polygon soup the CSG kernel works on.

use glam::DVec3;

/// A vertex with position and normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: DVec3,
    pub normal: DVec3,
}

impl Vertex {
    pub fn new(position: DVec3, normal: DVec3) -> Self {
        Self { position, normal }
    }

    /// Linear interpolation along an edge, used by plane splitting.
    pub fn lerp(&self, other: &Vertex, t: f64) -> Vertex {
        Vertex {
            position: self.position.lerp(other.position, t),
            normal: self.normal.lerp(other.normal, t).normalize_or_zero(),
        }
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
    }
}

// ─── Plane ───────────────────────────────────────────────────────────────────

/// Oriented plane `normal · p = w`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub w: f64,
}

impl Plane {
    pub fn from_points(a: DVec3, b: DVec3, c: DVec3) -> Option<Plane> {
        let n = (b - a).cross(c - a);
        if n.length_squared() < 1e-18 {
            return None;
        }
        let normal = n.normalize();
        Some(Plane { normal, w: normal.dot(a) })
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }
}

// ─── Polygon ─────────────────────────────────────────────────────────────────

/// Convex planar polygon. `color` carries a stencil mask, when present.
#[derive(Debug, Clone)]
pub struct Polygon {
    pub vertices: Vec<Vertex>,
    pub plane: Plane,
    pub color: Option<[f64; 4]>,
}

impl Polygon {
    /// Build from three or more vertices. Returns `None` for degenerate
    /// (zero-area or collinear) input.
    pub fn new(vertices: Vec<Vertex>) -> Option<Polygon> {
        if vertices.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(
            vertices[0].position,
            vertices[1].position,
            vertices[2].position,
        )?;
        Some(Polygon { vertices, plane, color: None })
    }

    /// Same as `new` but with vertex normals set to the face normal.
    pub fn from_positions(points: &[DVec3]) -> Option<Polygon> {
        if points.len() < 3 {
            return None;
        }
        let plane = Plane::from_points(points[0], points[1], points[2])?;
        let vertices = points.iter().map(|&p| Vertex::new(p, plane.normal)).collect();
        Some(Polygon { vertices, plane, color: None })
    }

    pub fn flip(&mut self) {
        self.vertices.reverse();
        for v in &mut self.vertices {
            v.flip();
        }
        self.plane.flip();
    }
}

// ─── Mesh ────────────────────────────────────────────────────────────────────

/// An indexed triangle mesh in world space.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Per-vertex colors. Empty unless a stencil mask applied.
    pub colors: Vec<[f64; 4]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Fan-triangulate a polygon soup into an indexed mesh. Vertex colors
    /// are emitted only when at least one polygon carries a mask color.
    pub fn from_polygons(polygons: &[Polygon]) -> Mesh {
        let mut mesh = Mesh::new();
        let colored = polygons.iter().any(|p| p.color.is_some());

        for poly in polygons {
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend(poly.vertices.iter().copied());
            if colored {
                let color = poly.color.unwrap_or([1.0, 1.0, 1.0, 1.0]);
                mesh.colors.extend(std::iter::repeat_n(color, poly.vertices.len()));
            }
            for i in 1..poly.vertices.len() as u32 - 1 {
                mesh.indices.push(base);
                mesh.indices.push(base + i);
                mesh.indices.push(base + i + 1);
            }
        }
        mesh
    }

    /// Triangles back into polygons, for feeding a compiled mesh to the
    /// CSG kernel.
    pub fn to_polygons(&self) -> Vec<Polygon> {
        self.indices
            .chunks(3)
            .filter_map(|tri| {
                Polygon::new(vec![
                    self.vertices[tri[0] as usize],
                    self.vertices[tri[1] as usize],
                    self.vertices[tri[2] as usize],
                ])
            })
            .collect()
    }

    /// True when every edge is shared by exactly two triangles, keyed on
    /// quantized positions. A closed CSG result must satisfy this.
    pub fn is_edge_manifold(&self) -> bool {
        use std::collections::HashMap;

        let key = |v: DVec3| -> (i64, i64, i64) {
            let q = 1e7;
            ((v.x * q).round() as i64, (v.y * q).round() as i64, (v.z * q).round() as i64)
        };

        let mut edges: HashMap<((i64, i64, i64), (i64, i64, i64)), i32> = HashMap::new();
        for tri in self.indices.chunks(3) {
            for e in 0..3 {
                let a = key(self.vertices[tri[e] as usize].position);
                let b = key(self.vertices[tri[(e + 1) % 3] as usize].position);
                if a == b {
                    continue; // degenerate edge collapses under quantization
                }
                let (lo, hi) = if a < b { (a, b) } else { (b, a) };
                *edges.entry((lo, hi)).or_insert(0) += 1;
            }
        }
        edges.values().all(|&count| count == 2)
    }

    /// Axis-aligned bounds, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(DVec3, DVec3)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices {
            min = min.min(v.position);
            max = max.max(v.position);
        }
        Some((min, max))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Polygon {
        Polygon::from_positions(&[
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ])
        .expect("planar quad")
    }

    #[test]
    fn quad_fans_into_two_triangles() {
        let mesh = Mesh::from_polygons(&[quad()]);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.colors.is_empty());
    }

    #[test]
    fn degenerate_polygon_rejected() {
        assert!(Polygon::from_positions(&[
            DVec3::ZERO,
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(2.0, 0.0, 0.0),
        ]).is_none());
    }

    #[test]
    fn flip_reverses_winding_and_normals() {
        let mut p = quad();
        let n = p.plane.normal;
        p.flip();
        assert_eq!(p.plane.normal, -n);
        assert_eq!(p.vertices[0].normal, -n);
    }

    #[test]
    fn colors_filled_when_any_polygon_masked() {
        let mut masked = quad();
        masked.color = Some([1.0, 0.0, 0.0, 1.0]);
        let mesh = Mesh::from_polygons(&[quad(), masked]);
        assert_eq!(mesh.colors.len(), mesh.vertex_count());
        assert_eq!(mesh.colors[0], [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(mesh.colors[4], [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn open_sheet_is_not_manifold() {
        let mesh = Mesh::from_polygons(&[quad()]);
        assert!(!mesh.is_edge_manifold());
    }
}
