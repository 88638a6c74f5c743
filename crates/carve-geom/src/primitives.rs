//! Canonical parametric tessellation of the leaf primitives. All primitives
//! are unit-sized and centered at the origin; transforms place them.

use std::f64::consts::TAU;

use carve_lang::{PrimitiveKind, Transform};
use glam::DVec3;

use crate::mesh::{Polygon, Vertex};

pub fn polygons(kind: PrimitiveKind, detail: u32) -> Vec<Polygon> {
    match kind {
        PrimitiveKind::Cube => cube(),
        PrimitiveKind::Sphere => sphere(detail),
        PrimitiveKind::Cylinder => cylinder(detail),
        PrimitiveKind::Cone => cone(detail),
        PrimitiveKind::Torus => torus(detail),
    }
}

/// Unit cube, six outward quads.
pub fn cube() -> Vec<Polygon> {
    let corner = |i: usize| {
        DVec3::new(
            (i & 1) as f64 - 0.5,
            ((i >> 1) & 1) as f64 - 0.5,
            ((i >> 2) & 1) as f64 - 0.5,
        )
    };
    let faces: [([usize; 4], DVec3); 6] = [
        ([0, 4, 6, 2], DVec3::NEG_X),
        ([1, 3, 7, 5], DVec3::X),
        ([0, 1, 5, 4], DVec3::NEG_Y),
        ([2, 6, 7, 3], DVec3::Y),
        ([0, 2, 3, 1], DVec3::NEG_Z),
        ([4, 5, 7, 6], DVec3::Z),
    ];
    faces
        .iter()
        .filter_map(|(idx, normal)| {
            Polygon::new(idx.iter().map(|&i| Vertex::new(corner(i), *normal)).collect())
        })
        .collect()
}

/// Unit-diameter UV sphere with smooth normals.
pub fn sphere(detail: u32) -> Vec<Polygon> {
    let slices = detail.max(3);
    let stacks = (detail / 2).max(2);
    let point = |lat: f64, lon: f64| {
        DVec3::new(lat.cos() * lon.cos(), lat.sin(), -lat.cos() * lon.sin()) * 0.5
    };

    let mut out = Vec::new();
    for i in 0..stacks {
        let lat0 = -TAU / 4.0 + TAU / 2.0 * f64::from(i) / f64::from(stacks);
        let lat1 = -TAU / 4.0 + TAU / 2.0 * f64::from(i + 1) / f64::from(stacks);
        for j in 0..slices {
            let lon0 = TAU * f64::from(j) / f64::from(slices);
            let lon1 = TAU * f64::from(j + 1) / f64::from(slices);
            let ring = [
                point(lat0, lon0),
                point(lat0, lon1),
                point(lat1, lon1),
                point(lat1, lon0),
            ];
            push_deduped(&mut out, &ring, |p| p.normalize_or_zero());
        }
    }
    out
}

/// Unit cylinder along the y axis: radius 0.5, height 1, capped.
pub fn cylinder(detail: u32) -> Vec<Polygon> {
    let slices = detail.max(3);
    let rim = |theta: f64, y: f64| DVec3::new(0.5 * theta.cos(), y, -0.5 * theta.sin());
    let radial = |theta: f64| DVec3::new(theta.cos(), 0.0, -theta.sin());

    let mut out = Vec::new();
    for j in 0..slices {
        let t0 = TAU * f64::from(j) / f64::from(slices);
        let t1 = TAU * f64::from(j + 1) / f64::from(slices);
        if let Some(p) = Polygon::new(vec![
            Vertex::new(rim(t0, -0.5), radial(t0)),
            Vertex::new(rim(t1, -0.5), radial(t1)),
            Vertex::new(rim(t1, 0.5), radial(t1)),
            Vertex::new(rim(t0, 0.5), radial(t0)),
        ]) {
            out.push(p);
        }
    }
    out.extend(caps(slices, rim));
    out
}

/// Unit cone: base radius 0.5 at y = −0.5, apex at y = 0.5.
pub fn cone(detail: u32) -> Vec<Polygon> {
    let slices = detail.max(3);
    let rim = |theta: f64| DVec3::new(0.5 * theta.cos(), -0.5, -0.5 * theta.sin());
    let apex = DVec3::new(0.0, 0.5, 0.0);

    let mut out = Vec::new();
    for j in 0..slices {
        let t0 = TAU * f64::from(j) / f64::from(slices);
        let t1 = TAU * f64::from(j + 1) / f64::from(slices);
        if let Some(p) = Polygon::from_positions(&[rim(t0), rim(t1), apex]) {
            out.push(p);
        }
    }
    // base cap, wound for a −y normal
    let base: Vec<DVec3> = (0..slices)
        .rev()
        .map(|j| rim(TAU * f64::from(j) / f64::from(slices)))
        .collect();
    if let Some(p) = Polygon::from_positions(&base) {
        out.push(p);
    }
    out
}

/// Torus in the xz plane: major radius 0.35, tube radius 0.15, so the
/// overall diameter is 1.
pub fn torus(detail: u32) -> Vec<Polygon> {
    let major = 0.35;
    let minor = 0.15;
    let around = detail.max(3);
    let tube = detail.max(3);
    let point = |theta: f64, phi: f64| {
        let dir = DVec3::new(theta.cos(), 0.0, -theta.sin());
        (dir * major + (dir * phi.cos() + DVec3::Y * phi.sin()) * minor,
         dir * phi.cos() + DVec3::Y * phi.sin())
    };

    let mut out = Vec::new();
    for i in 0..tube {
        let p0 = TAU * f64::from(i) / f64::from(tube);
        let p1 = TAU * f64::from(i + 1) / f64::from(tube);
        for j in 0..around {
            let t0 = TAU * f64::from(j) / f64::from(around);
            let t1 = TAU * f64::from(j + 1) / f64::from(around);
            let quad = [point(t0, p0), point(t1, p0), point(t1, p1), point(t0, p1)];
            if let Some(p) = Polygon::new(quad.iter().map(|(pos, n)| Vertex::new(*pos, *n)).collect()) {
                out.push(p);
            }
        }
    }
    out
}

/// Top and bottom n-gon caps for a cylinder-style rim function.
fn caps(slices: u32, rim: impl Fn(f64, f64) -> DVec3) -> Vec<Polygon> {
    let ring = |y: f64, reversed: bool| -> Vec<DVec3> {
        let mut pts: Vec<DVec3> = (0..slices)
            .map(|j| rim(TAU * f64::from(j) / f64::from(slices), y))
            .collect();
        if reversed {
            pts.reverse();
        }
        pts
    };
    let mut out = Vec::new();
    if let Some(top) = Polygon::from_positions(&ring(0.5, false)) {
        out.push(top);
    }
    if let Some(bottom) = Polygon::from_positions(&ring(-0.5, true)) {
        out.push(bottom);
    }
    out
}

/// Quad with possible pole degeneracies: consecutive duplicate positions are
/// collapsed before the polygon is built.
fn push_deduped(out: &mut Vec<Polygon>, ring: &[DVec3; 4], normal_of: impl Fn(DVec3) -> DVec3) {
    let mut pts: Vec<DVec3> = Vec::with_capacity(4);
    for &p in ring {
        if pts.last().is_none_or(|&q| (p - q).length_squared() > 1e-18) {
            pts.push(p);
        }
    }
    if pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).length_squared() <= 1e-18 {
        pts.pop();
    }
    if pts.len() < 3 {
        return;
    }
    if let Some(polygon) = Polygon::new(pts.iter().map(|&p| Vertex::new(p, normal_of(p))).collect()) {
        out.push(polygon);
    }
}

// ─── Placement ───────────────────────────────────────────────────────────────

/// Bake a transform into a polygon set. Normals go through the rotation with
/// inverse scaling so non-uniform scales keep them perpendicular; a negative
/// determinant flips winding.
pub fn transform_polygons(polys: Vec<Polygon>, t: &Transform) -> Vec<Polygon> {
    let mirror = t.scale[0] * t.scale[1] * t.scale[2] < 0.0;
    polys
        .into_iter()
        .filter_map(|poly| {
            let color = poly.color;
            let vertices: Vec<Vertex> = poly
                .vertices
                .iter()
                .map(|v| {
                    let p = t.apply_point([v.position.x, v.position.y, v.position.z]);
                    let scaled_normal = [
                        v.normal.x / nonzero(t.scale[0]),
                        v.normal.y / nonzero(t.scale[1]),
                        v.normal.z / nonzero(t.scale[2]),
                    ];
                    let n = t.rotation.rotate(scaled_normal);
                    Vertex::new(
                        DVec3::new(p[0], p[1], p[2]),
                        DVec3::new(n[0], n[1], n[2]).normalize_or_zero(),
                    )
                })
                .collect();
            let mut out = Polygon::new(vertices)?;
            out.color = color;
            if mirror {
                out.flip();
            }
            Some(out)
        })
        .collect()
}

fn nonzero(s: f64) -> f64 {
    if s.abs() < 1e-12 { 1e-12f64.copysign(s) } else { s }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;

    fn closed(polys: &[Polygon]) -> bool {
        Mesh::from_polygons(polys).is_edge_manifold()
    }

    fn volume(polys: &[Polygon]) -> f64 {
        let mut v = 0.0;
        for poly in polys {
            for i in 1..poly.vertices.len() - 1 {
                let a = poly.vertices[0].position;
                let b = poly.vertices[i].position;
                let c = poly.vertices[i + 1].position;
                v += a.dot(b.cross(c)) / 6.0;
            }
        }
        v
    }

    #[test]
    fn cube_is_closed_unit_volume() {
        let c = cube();
        assert_eq!(c.len(), 6);
        assert!(closed(&c));
        assert!((volume(&c) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sphere_is_closed_and_outward() {
        let s = sphere(16);
        assert!(closed(&s));
        // volume approaches 4/3·π·r³ ≈ 0.5236 from below
        let v = volume(&s);
        assert!(v > 0.4 && v < 0.5236, "volume {v}");
    }

    #[test]
    fn cylinder_is_closed() {
        let c = cylinder(12);
        assert!(closed(&c));
        let v = volume(&c);
        // π r² h ≈ 0.785
        assert!(v > 0.7 && v < 0.7854, "volume {v}");
    }

    #[test]
    fn cone_is_closed() {
        let c = cone(12);
        assert!(closed(&c));
        assert!(volume(&c) > 0.0);
    }

    #[test]
    fn torus_is_closed() {
        let t = torus(12);
        assert!(closed(&t));
        assert!(volume(&t) > 0.0);
    }

    #[test]
    fn detail_controls_sphere_resolution() {
        assert!(sphere(32).len() > sphere(8).len());
    }

    #[test]
    fn transform_scales_volume() {
        let t = Transform {
            position: [1.0, 2.0, 3.0],
            scale: [2.0, 1.0, 1.0],
            ..Transform::identity()
        };
        let c = transform_polygons(cube(), &t);
        assert!((volume(&c) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn mirrored_transform_keeps_outward_winding() {
        let t = Transform { scale: [-1.0, 1.0, 1.0], ..Transform::identity() };
        let c = transform_polygons(cube(), &t);
        assert!((volume(&c) - 1.0).abs() < 1e-9);
        assert!(closed(&c));
    }
}
