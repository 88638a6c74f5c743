//! Boundary-representation booleans over polygon soups, using BSP-tree
//! clipping. Operand order follows source order and the output is fully
//! deterministic for a given input.

use glam::DVec3;

use crate::mesh::{Plane, Polygon};

const EPSILON: f64 = 1e-5;

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Split `polygon` by `plane`, routing the pieces into the four output lists.
fn split_polygon(
    plane: &Plane,
    polygon: &Polygon,
    coplanar_front: &mut Vec<Polygon>,
    coplanar_back: &mut Vec<Polygon>,
    front: &mut Vec<Polygon>,
    back: &mut Vec<Polygon>,
) {
    let mut polygon_type = 0u8;
    let mut types = Vec::with_capacity(polygon.vertices.len());

    for v in &polygon.vertices {
        let t = plane.normal.dot(v.position) - plane.w;
        let ty = if t < -EPSILON { BACK } else if t > EPSILON { FRONT } else { COPLANAR };
        polygon_type |= ty;
        types.push(ty);
    }

    match polygon_type {
        COPLANAR => {
            if plane.normal.dot(polygon.plane.normal) > 0.0 {
                coplanar_front.push(polygon.clone());
            } else {
                coplanar_back.push(polygon.clone());
            }
        }
        FRONT => front.push(polygon.clone()),
        BACK => back.push(polygon.clone()),
        _ => {
            let mut f = Vec::new();
            let mut b = Vec::new();
            let n = polygon.vertices.len();
            for i in 0..n {
                let j = (i + 1) % n;
                let ti = types[i];
                let tj = types[j];
                let vi = &polygon.vertices[i];
                let vj = &polygon.vertices[j];
                if ti != BACK {
                    f.push(*vi);
                }
                if ti != FRONT {
                    b.push(*vi);
                }
                if (ti | tj) == SPANNING {
                    let t = (plane.w - plane.normal.dot(vi.position))
                        / plane.normal.dot(vj.position - vi.position);
                    let v = vi.lerp(vj, t);
                    f.push(v);
                    b.push(v);
                }
            }
            if let Some(mut p) = Polygon::new(f) {
                p.color = polygon.color;
                front.push(p);
            }
            if let Some(mut p) = Polygon::new(b) {
                p.color = polygon.color;
                back.push(p);
            }
        }
    }
}

// ─── BSP node ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<Box<BspNode>>,
    back: Option<Box<BspNode>>,
    polygons: Vec<Polygon>,
}

impl BspNode {
    fn new(polygons: Vec<Polygon>) -> Self {
        let mut node = BspNode::default();
        node.build(polygons);
        node
    }

    fn build(&mut self, polygons: Vec<Polygon>) {
        if polygons.is_empty() {
            return;
        }
        let plane = match self.plane {
            Some(p) => p,
            None => {
                let p = polygons[0].plane;
                self.plane = Some(p);
                p
            }
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        let mut coplanar_back = Vec::new();
        for poly in &polygons {
            split_polygon(&plane, poly, &mut self.polygons, &mut coplanar_back, &mut front, &mut back);
        }
        self.polygons.append(&mut coplanar_back);

        if !front.is_empty() {
            self.front.get_or_insert_with(Box::default).build(front);
        }
        if !back.is_empty() {
            self.back.get_or_insert_with(Box::default).build(back);
        }
    }

    /// Swap solid and empty space.
    fn invert(&mut self) {
        for poly in &mut self.polygons {
            poly.flip();
        }
        if let Some(p) = self.plane.as_mut() {
            p.flip();
        }
        if let Some(f) = self.front.as_mut() {
            f.invert();
        }
        if let Some(b) = self.back.as_mut() {
            b.invert();
        }
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Remove the parts of `polygons` inside this tree's solid.
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let Some(plane) = self.plane else {
            return polygons;
        };

        let mut front = Vec::new();
        let mut back = Vec::new();
        for poly in &polygons {
            let mut coplanar_front = Vec::new();
            let mut coplanar_back = Vec::new();
            let mut f = Vec::new();
            let mut b = Vec::new();
            split_polygon(&plane, poly, &mut coplanar_front, &mut coplanar_back, &mut f, &mut b);
            front.append(&mut coplanar_front);
            front.append(&mut f);
            back.append(&mut coplanar_back);
            back.append(&mut b);
        }

        let mut front = match &self.front {
            Some(f) => f.clip_polygons(front),
            None => front,
        };
        let back = match &self.back {
            Some(b) => b.clip_polygons(back),
            None => Vec::new(), // inside the solid: discarded
        };
        front.extend(back);
        front
    }

    /// Remove the parts of this tree inside `other`'s solid.
    fn clip_to(&mut self, other: &BspNode) {
        self.polygons = other.clip_polygons(std::mem::take(&mut self.polygons));
        if let Some(f) = self.front.as_mut() {
            f.clip_to(other);
        }
        if let Some(b) = self.back.as_mut() {
            b.clip_to(other);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        let mut out = self.polygons.clone();
        if let Some(f) = &self.front {
            out.extend(f.all_polygons());
        }
        if let Some(b) = &self.back {
            out.extend(b.all_polygons());
        }
        out
    }
}

// ─── Boolean operations ──────────────────────────────────────────────────────

pub fn union(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut na = BspNode::new(a);
    let mut nb = BspNode::new(b);
    na.clip_to(&nb);
    nb.clip_to(&na);
    nb.invert();
    nb.clip_to(&na);
    nb.invert();
    na.build(nb.all_polygons());
    na.all_polygons()
}

pub fn difference(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut na = BspNode::new(a);
    let mut nb = BspNode::new(b);
    na.invert();
    na.clip_to(&nb);
    nb.clip_to(&na);
    nb.invert();
    nb.clip_to(&na);
    nb.invert();
    na.build(nb.all_polygons());
    na.invert();
    na.all_polygons()
}

pub fn intersection(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let mut na = BspNode::new(a);
    let mut nb = BspNode::new(b);
    na.invert();
    nb.clip_to(&na);
    nb.invert();
    na.clip_to(&nb);
    nb.clip_to(&na);
    na.build(nb.all_polygons());
    na.invert();
    na.all_polygons()
}

/// Symmetric difference: (a − b) ∪ (b − a).
pub fn xor(a: Vec<Polygon>, b: Vec<Polygon>) -> Vec<Polygon> {
    let left = difference(a.clone(), b.clone());
    let right = difference(b, a);
    union(left, right)
}

// ─── Stencil ─────────────────────────────────────────────────────────────────

/// Color-mask the surface of `a` where it lies inside `b`, without altering
/// topology: whole polygons are recolored by centroid containment.
pub fn stencil(a: Vec<Polygon>, b: &[Polygon], color: [f64; 4]) -> Vec<Polygon> {
    a.into_iter()
        .map(|mut poly| {
            let centroid = poly.vertices.iter().fold(DVec3::ZERO, |acc, v| acc + v.position)
                / poly.vertices.len() as f64;
            if point_in_polygons(centroid, b) {
                poly.color = Some(color);
            }
            poly
        })
        .collect()
}

/// Ray-cast containment test against a closed polygon soup. The ray
/// direction is fixed and irrational-ish to avoid hitting edges exactly.
pub fn point_in_polygons(p: DVec3, polygons: &[Polygon]) -> bool {
    let dir = DVec3::new(0.577_350_3, 0.211_324_9, 0.788_675_1).normalize();
    let mut crossings = 0u32;
    for poly in polygons {
        let n = poly.vertices.len();
        for i in 1..n - 1 {
            let tri = [
                poly.vertices[0].position,
                poly.vertices[i].position,
                poly.vertices[i + 1].position,
            ];
            if ray_hits_triangle(p, dir, &tri) {
                crossings += 1;
            }
        }
    }
    crossings % 2 == 1
}

/// Möller–Trumbore, counting only hits in front of the origin.
fn ray_hits_triangle(origin: DVec3, dir: DVec3, tri: &[DVec3; 3]) -> bool {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let h = dir.cross(e2);
    let det = e1.dot(h);
    if det.abs() < 1e-12 {
        return false;
    }
    let inv = 1.0 / det;
    let s = origin - tri[0];
    let u = inv * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return false;
    }
    let q = s.cross(e1);
    let v = inv * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return false;
    }
    inv * e2.dot(q) > 1e-9
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::primitives;

    fn volume(polygons: &[Polygon]) -> f64 {
        // signed volume via the divergence theorem over triangles
        let mut v = 0.0;
        for poly in polygons {
            let n = poly.vertices.len();
            for i in 1..n - 1 {
                let a = poly.vertices[0].position;
                let b = poly.vertices[i].position;
                let c = poly.vertices[i + 1].position;
                v += a.dot(b.cross(c)) / 6.0;
            }
        }
        v
    }

    fn shifted(polys: Vec<Polygon>, offset: DVec3) -> Vec<Polygon> {
        polys
            .into_iter()
            .filter_map(|p| {
                Polygon::new(
                    p.vertices
                        .iter()
                        .map(|v| crate::mesh::Vertex::new(v.position + offset, v.normal))
                        .collect(),
                )
            })
            .collect()
    }

    #[test]
    fn union_of_disjoint_cubes_keeps_both() {
        let a = primitives::cube();
        let b = shifted(primitives::cube(), DVec3::new(3.0, 0.0, 0.0));
        let out = union(a, b);
        assert!((volume(&out) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn union_of_overlapping_cubes_merges_volume() {
        let a = primitives::cube();
        let b = shifted(primitives::cube(), DVec3::new(0.5, 0.0, 0.0));
        let out = union(a, b);
        assert!((volume(&out) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn difference_removes_overlap() {
        let a = primitives::cube();
        let b = shifted(primitives::cube(), DVec3::new(0.5, 0.0, 0.0));
        let out = difference(a, b);
        assert!((volume(&out) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn intersection_keeps_overlap_only() {
        let a = primitives::cube();
        let b = shifted(primitives::cube(), DVec3::new(0.5, 0.0, 0.0));
        let out = intersection(a, b);
        assert!((volume(&out) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn xor_is_union_minus_intersection() {
        let a = primitives::cube();
        let b = shifted(primitives::cube(), DVec3::new(0.5, 0.0, 0.0));
        let out = xor(a, b);
        assert!((volume(&out) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn difference_result_is_closed() {
        let a = primitives::cube();
        let b = shifted(primitives::cube(), DVec3::new(0.5, 0.5, 0.5));
        let mesh = Mesh::from_polygons(&difference(a, b));
        assert!(mesh.is_edge_manifold());
    }

    #[test]
    fn containment_test_inside_and_outside() {
        let cube = primitives::cube();
        assert!(point_in_polygons(DVec3::ZERO, &cube));
        assert!(!point_in_polygons(DVec3::new(2.0, 0.0, 0.0), &cube));
    }

    #[test]
    fn stencil_recolors_contained_faces_only() {
        let a = primitives::cube();
        let count = a.len();
        let small = shifted(primitives::cube(), DVec3::new(0.45, 0.0, 0.0));
        let out = stencil(a, &small, [1.0, 0.0, 0.0, 1.0]);
        // topology unchanged
        assert_eq!(out.len(), count);
        // the +x face centroid lies inside the shifted cube, the -x face not
        assert!(out.iter().any(|p| p.color.is_some()));
        assert!(out.iter().any(|p| p.color.is_none()));
    }
}
