//! Mesh synthesis from 2D cross-section outlines: fill, lathe, extrude,
//! loft, hull, minkowski. Every operation is deterministic and
//! order-sensitive; failures return a message for the fail-soft compiler.

use std::f64::consts::TAU;

use carve_lang::Transform;
use glam::{DVec2, DVec3};

use crate::mesh::Polygon;

pub type BuildResult = Result<Vec<Polygon>, String>;

// ─── Triangulation ───────────────────────────────────────────────────────────

/// Ear-clipping triangulation of a simple polygon. Returns index triples
/// into `outline`, wound counter-clockwise.
pub fn ear_clip(outline: &[DVec2]) -> Result<Vec<[usize; 3]>, String> {
    let n = outline.len();
    if n < 3 {
        return Err(format!("cannot triangulate an outline of {n} points"));
    }

    let mut ring: Vec<usize> = (0..n).collect();
    if signed_area(outline) < 0.0 {
        ring.reverse();
    }

    let mut triangles = Vec::with_capacity(n - 2);
    while ring.len() > 3 {
        let len = ring.len();
        let mut clipped = false;
        for i in 0..len {
            let ia = ring[(i + len - 1) % len];
            let ib = ring[i];
            let ic = ring[(i + 1) % len];
            let (a, b, c) = (outline[ia], outline[ib], outline[ic]);
            if cross2(b - a, c - b) <= 1e-12 {
                continue; // reflex or degenerate corner
            }
            let blocked = ring.iter().any(|&j| {
                j != ia && j != ib && j != ic && point_in_triangle(outline[j], a, b, c)
            });
            if blocked {
                continue;
            }
            triangles.push([ia, ib, ic]);
            ring.remove(i);
            clipped = true;
            break;
        }
        if !clipped {
            return Err("outline is self-intersecting or degenerate".to_string());
        }
    }
    triangles.push([ring[0], ring[1], ring[2]]);
    Ok(triangles)
}

fn signed_area(outline: &[DVec2]) -> f64 {
    let mut area = 0.0;
    for i in 0..outline.len() {
        let a = outline[i];
        let b = outline[(i + 1) % outline.len()];
        area += cross2(a, b);
    }
    area * 0.5
}

fn cross2(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

fn point_in_triangle(p: DVec2, a: DVec2, b: DVec2, c: DVec2) -> bool {
    let d1 = cross2(b - a, p - a);
    let d2 = cross2(c - b, p - b);
    let d3 = cross2(a - c, p - c);
    d1 > 1e-12 && d2 > 1e-12 && d3 > 1e-12
}

/// Outline in counter-clockwise order (reversed copy when needed).
fn ccw(outline: &[DVec2]) -> Vec<DVec2> {
    if signed_area(outline) < 0.0 {
        outline.iter().rev().copied().collect()
    } else {
        outline.to_vec()
    }
}

fn polygon_from_ring(points: &[DVec3]) -> Option<Polygon> {
    let mut pts: Vec<DVec3> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last().is_none_or(|&q| (p - q).length_squared() > 1e-18) {
            pts.push(p);
        }
    }
    while pts.len() > 1 && (pts[0] - pts[pts.len() - 1]).length_squared() <= 1e-18 {
        pts.pop();
    }
    Polygon::from_positions(&pts)
}

fn place(t: &Transform, p: DVec3) -> DVec3 {
    let q = t.apply_point([p.x, p.y, p.z]);
    DVec3::new(q[0], q[1], q[2])
}

// ─── Fill ────────────────────────────────────────────────────────────────────

/// Triangulate a closed outline into a double-sided flat sheet.
pub fn fill(outline: &[DVec2], xf: &Transform) -> BuildResult {
    let outline = ccw(outline);
    let triangles = ear_clip(&outline)?;
    let mut out = Vec::with_capacity(triangles.len() * 2);
    for [a, b, c] in &triangles {
        let pts = [
            place(xf, outline[*a].extend(0.0)),
            place(xf, outline[*b].extend(0.0)),
            place(xf, outline[*c].extend(0.0)),
        ];
        if let Some(front) = Polygon::from_positions(&pts) {
            out.push(front);
        }
        if let Some(back) = Polygon::from_positions(&[pts[2], pts[1], pts[0]]) {
            out.push(back);
        }
    }
    Ok(out)
}

// ─── Lathe ───────────────────────────────────────────────────────────────────

/// Revolve a profile around the y axis in `detail` angular steps. The
/// profile's x coordinate is the radius.
pub fn lathe(profile: &[DVec2], profile_closed: bool, detail: u32, xf: &Transform) -> BuildResult {
    if profile.len() < 2 {
        return Err("lathe needs a profile of at least 2 points".to_string());
    }
    let steps = detail.max(3);
    let spin = |p: DVec2, theta: f64| DVec3::new(p.x * theta.cos(), p.y, -p.x * theta.sin());

    let seg_count = if profile_closed { profile.len() } else { profile.len() - 1 };
    let mut out = Vec::new();
    for i in 0..seg_count {
        let p0 = profile[i];
        let p1 = profile[(i + 1) % profile.len()];
        for j in 0..steps {
            let t0 = TAU * f64::from(j) / f64::from(steps);
            let t1 = TAU * f64::from(j + 1) / f64::from(steps);
            let ring = [spin(p0, t0), spin(p0, t1), spin(p1, t1), spin(p1, t0)];
            if let Some(poly) = polygon_from_ring(&ring) {
                out.push(poly);
            }
        }
    }
    if out.is_empty() {
        return Err("lathe profile produced no surface".to_string());
    }
    Ok(crate::primitives::transform_polygons(out, xf))
}

// ─── Extrude ─────────────────────────────────────────────────────────────────

/// Sweep a closed cross-section along the z axis (height 1, centered), with
/// an optional linear twist in radians.
pub fn extrude_linear(section: &[DVec2], twist: f64, detail: u32, xf: &Transform) -> BuildResult {
    let section = ccw(section);
    let triangles = ear_clip(&section)?;
    let slices = if twist.abs() > 1e-12 { detail.max(2) } else { 1 };

    let ring_at = |k: u32| -> Vec<DVec3> {
        let frac = f64::from(k) / f64::from(slices);
        let ang = twist * frac;
        section
            .iter()
            .map(|p| {
                let r = DVec2::new(
                    p.x * ang.cos() - p.y * ang.sin(),
                    p.x * ang.sin() + p.y * ang.cos(),
                );
                r.extend(frac - 0.5)
            })
            .collect()
    };

    let rings: Vec<Vec<DVec3>> = (0..=slices).map(ring_at).collect();
    let mut out = sweep_sides(&rings, false);

    // caps share the section triangulation
    let first = &rings[0];
    let last = &rings[rings.len() - 1];
    for [a, b, c] in &triangles {
        if let Some(bottom) = polygon_from_ring(&[first[*c], first[*b], first[*a]]) {
            out.push(bottom);
        }
        if let Some(top) = polygon_from_ring(&[last[*a], last[*b], last[*c]]) {
            out.push(top);
        }
    }
    Ok(crate::primitives::transform_polygons(out, xf))
}

/// Sweep a closed cross-section along a spine polyline lying in the xy
/// plane. The section's x axis follows the in-plane normal and its y axis
/// the world z axis.
pub fn extrude_along(
    section: &[DVec2],
    spine: &[DVec2],
    spine_closed: bool,
    twist: f64,
    xf: &Transform,
) -> BuildResult {
    if spine.len() < 2 {
        return Err("extrude along needs a spine of at least 2 points".to_string());
    }
    let section = ccw(section);
    let triangles = ear_clip(&section)?;

    let n = spine.len();
    let tangent = |i: usize| -> DVec2 {
        let prev = if i == 0 {
            if spine_closed { spine[n - 1] } else { spine[0] }
        } else {
            spine[i - 1]
        };
        let next = if i + 1 == n {
            if spine_closed { spine[0] } else { spine[n - 1] }
        } else {
            spine[i + 1]
        };
        let d = next - prev;
        if d.length_squared() < 1e-18 { DVec2::X } else { d.normalize() }
    };

    let rings: Vec<Vec<DVec3>> = (0..n)
        .map(|i| {
            let t = tangent(i);
            let u = DVec2::new(-t.y, t.x);
            let frac = if spine_closed {
                i as f64 / n as f64
            } else {
                i as f64 / (n - 1) as f64
            };
            let ang = twist * frac;
            section
                .iter()
                .map(|p| {
                    let sx = p.x * ang.cos() - p.y * ang.sin();
                    let sy = p.x * ang.sin() + p.y * ang.cos();
                    DVec3::new(spine[i].x + u.x * sx, spine[i].y + u.y * sx, sy)
                })
                .collect()
        })
        .collect();

    let mut out = sweep_sides(&rings, spine_closed);

    if !spine_closed {
        let first = &rings[0];
        let last = &rings[rings.len() - 1];
        for [a, b, c] in &triangles {
            if let Some(start) = polygon_from_ring(&[first[*c], first[*b], first[*a]]) {
                out.push(start);
            }
            if let Some(end) = polygon_from_ring(&[last[*a], last[*b], last[*c]]) {
                out.push(end);
            }
        }
    }
    Ok(crate::primitives::transform_polygons(out, xf))
}

/// Quads between consecutive rings of equal arity.
fn sweep_sides(rings: &[Vec<DVec3>], wrap: bool) -> Vec<Polygon> {
    let mut out = Vec::new();
    let count = if wrap { rings.len() } else { rings.len() - 1 };
    for i in 0..count {
        let r0 = &rings[i];
        let r1 = &rings[(i + 1) % rings.len()];
        let m = r0.len();
        for j in 0..m {
            let k = (j + 1) % m;
            if let Some(poly) = polygon_from_ring(&[r0[j], r0[k], r1[k], r1[j]]) {
                out.push(poly);
            }
        }
    }
    out
}

// ─── Loft ────────────────────────────────────────────────────────────────────

/// Skin an ordered sequence of placed cross-sections. Outlines are
/// resampled to a common vertex count by arc length.
pub fn loft(sections: &[(Vec<DVec2>, Transform)]) -> BuildResult {
    if sections.len() < 2 {
        return Err(format!("loft needs at least 2 cross-sections, got {}", sections.len()));
    }
    for (outline, _) in sections {
        if outline.len() < 3 {
            return Err("loft cross-sections need at least 3 points".to_string());
        }
    }

    let target = sections.iter().map(|(o, _)| o.len()).max().unwrap_or(3).max(8);
    let outlines: Vec<Vec<DVec2>> = sections
        .iter()
        .map(|(outline, _)| resample_closed(&ccw(outline), target))
        .collect();
    let rings: Vec<Vec<DVec3>> = outlines
        .iter()
        .zip(sections)
        .map(|(outline, (_, t))| outline.iter().map(|p| place(t, p.extend(0.0))).collect())
        .collect();

    let mut out = sweep_sides(&rings, false);

    // caps triangulate the resampled outlines so their edges pair with the
    // side quads
    let last = rings.len() - 1;
    for (ring_index, outline, flip) in [(0, &outlines[0], true), (last, &outlines[last], false)] {
        for [a, b, c] in ear_clip(outline)? {
            let pts = if flip { [c, b, a] } else { [a, b, c] };
            let mapped = [
                rings[ring_index][pts[0]],
                rings[ring_index][pts[1]],
                rings[ring_index][pts[2]],
            ];
            if let Some(poly) = polygon_from_ring(&mapped) {
                out.push(poly);
            }
        }
    }
    Ok(out)
}

/// Evenly spaced points along a closed polyline.
fn resample_closed(outline: &[DVec2], target: usize) -> Vec<DVec2> {
    let n = outline.len();
    let mut lengths = Vec::with_capacity(n);
    let mut total = 0.0;
    for i in 0..n {
        let d = (outline[(i + 1) % n] - outline[i]).length();
        lengths.push(d);
        total += d;
    }
    if total < 1e-12 {
        return vec![outline[0]; target];
    }

    let mut out = Vec::with_capacity(target);
    let mut seg = 0usize;
    let mut seg_start = 0.0;
    for k in 0..target {
        let want = total * k as f64 / target as f64;
        while seg < n - 1 && seg_start + lengths[seg] < want {
            seg_start += lengths[seg];
            seg += 1;
        }
        let t = if lengths[seg] < 1e-12 { 0.0 } else { (want - seg_start) / lengths[seg] };
        let a = outline[seg];
        let b = outline[(seg + 1) % n];
        out.push(a.lerp(b, t.clamp(0.0, 1.0)));
    }
    out
}

// ─── Hull ────────────────────────────────────────────────────────────────────

/// Incremental convex hull over a point set.
pub fn hull(points: &[DVec3]) -> BuildResult {
    let pts = dedupe_points(points);
    if pts.len() < 4 {
        return Err(format!("hull needs at least 4 distinct points, got {}", pts.len()));
    }

    let seed = seed_tetrahedron(&pts)
        .ok_or_else(|| "hull points are coplanar".to_string())?;

    #[derive(Clone)]
    struct Face {
        verts: [usize; 3],
        normal: DVec3,
        w: f64,
    }

    let make_face = |a: usize, b: usize, c: usize| -> Option<Face> {
        let n = (pts[b] - pts[a]).cross(pts[c] - pts[a]);
        if n.length_squared() < 1e-18 {
            return None;
        }
        let normal = n.normalize();
        Some(Face { verts: [a, b, c], normal, w: normal.dot(pts[a]) })
    };

    // seed tetrahedron, faces oriented away from its centroid
    let [s0, s1, s2, s3] = seed;
    let centroid = (pts[s0] + pts[s1] + pts[s2] + pts[s3]) / 4.0;
    let mut faces: Vec<Face> = Vec::new();
    for (a, b, c) in [(s0, s1, s2), (s0, s3, s1), (s0, s2, s3), (s1, s3, s2)] {
        let mut f = make_face(a, b, c).ok_or_else(|| "degenerate hull seed".to_string())?;
        if f.normal.dot(centroid) - f.w > 0.0 {
            f = make_face(a, c, b).ok_or_else(|| "degenerate hull seed".to_string())?;
        }
        faces.push(f);
    }

    for p in 0..pts.len() {
        if seed.contains(&p) {
            continue;
        }
        let visible: Vec<usize> = (0..faces.len())
            .filter(|&f| faces[f].normal.dot(pts[p]) - faces[f].w > 1e-9)
            .collect();
        if visible.is_empty() {
            continue;
        }

        // horizon: directed edges of visible faces whose reverse is not in
        // another visible face
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for &f in &visible {
            let [a, b, c] = faces[f].verts;
            for e in [(a, b), (b, c), (c, a)] {
                if let Some(pos) = edges.iter().position(|&(x, y)| (y, x) == e) {
                    edges.remove(pos);
                } else {
                    edges.push(e);
                }
            }
        }

        let mut keep: Vec<Face> = Vec::with_capacity(faces.len());
        for (i, f) in faces.iter().enumerate() {
            if !visible.contains(&i) {
                keep.push(f.clone());
            }
        }
        for (a, b) in edges {
            if let Some(f) = make_face(a, b, p) {
                keep.push(f);
            }
        }
        faces = keep;
    }

    let polys: Vec<Polygon> = faces
        .iter()
        .filter_map(|f| {
            polygon_from_ring(&[pts[f.verts[0]], pts[f.verts[1]], pts[f.verts[2]]])
        })
        .collect();
    if polys.is_empty() {
        Err("hull produced no faces".to_string())
    } else {
        Ok(polys)
    }
}

fn dedupe_points(points: &[DVec3]) -> Vec<DVec3> {
    let mut out: Vec<DVec3> = Vec::with_capacity(points.len());
    for &p in points {
        if !out.iter().any(|&q| (p - q).length_squared() < 1e-14) {
            out.push(p);
        }
    }
    out
}

/// Four non-coplanar seed points: two extremes, the point farthest from
/// their line, then the point farthest from that plane.
fn seed_tetrahedron(pts: &[DVec3]) -> Option<[usize; 4]> {
    let i0 = (0..pts.len()).min_by(|&a, &b| {
        (pts[a].x, pts[a].y, pts[a].z)
            .partial_cmp(&(pts[b].x, pts[b].y, pts[b].z))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    let i1 = (0..pts.len()).max_by(|&a, &b| {
        pts[a].distance_squared(pts[i0])
            .partial_cmp(&pts[b].distance_squared(pts[i0]))
            .unwrap_or(std::cmp::Ordering::Equal)
    })?;
    if pts[i1].distance_squared(pts[i0]) < 1e-14 {
        return None;
    }

    let dir = (pts[i1] - pts[i0]).normalize();
    let line_dist = |p: DVec3| (p - pts[i0] - dir * (p - pts[i0]).dot(dir)).length_squared();
    let i2 = (0..pts.len()).max_by(|&a, &b| {
        line_dist(pts[a]).partial_cmp(&line_dist(pts[b])).unwrap_or(std::cmp::Ordering::Equal)
    })?;
    if line_dist(pts[i2]) < 1e-14 {
        return None;
    }

    let n = (pts[i1] - pts[i0]).cross(pts[i2] - pts[i0]).normalize();
    let plane_dist = |p: DVec3| (p - pts[i0]).dot(n).abs();
    let i3 = (0..pts.len()).max_by(|&a, &b| {
        plane_dist(pts[a]).partial_cmp(&plane_dist(pts[b])).unwrap_or(std::cmp::Ordering::Equal)
    })?;
    if plane_dist(pts[i3]) < 1e-9 {
        return None;
    }
    Some([i0, i1, i2, i3])
}

// ─── Minkowski ───────────────────────────────────────────────────────────────

/// Minkowski sum of two convex point sets: the hull over pairwise sums.
pub fn minkowski(a: &[DVec3], b: &[DVec3]) -> BuildResult {
    if a.is_empty() || b.is_empty() {
        return Err("minkowski needs two non-empty operands".to_string());
    }
    let a = dedupe_points(a);
    let b = dedupe_points(b);
    if a.len() * b.len() > 250_000 {
        return Err(format!(
            "minkowski operand vertex product too large ({} × {})", a.len(), b.len()
        ));
    }
    let mut sums = Vec::with_capacity(a.len() * b.len());
    for &pa in &a {
        for &pb in &b {
            sums.push(pa + pb);
        }
    }
    hull(&sums)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
