//! The geometry compiler: resolved shape tree → flat descriptor list.
//!
//! Leaf primitives outside any CSG/builder context pass through as
//! parametric descriptors. Under a boolean or builder node, children are
//! realized into world-space triangle meshes. Failures are scoped to their
//! subtree: the subtree yields a diagnostic and an inline marker mesh while
//! siblings compile normally.

use carve_lang::{BuilderKind, BuilderOpts, CsgOp, Material, PathData, ResolvedShape, ShapeKind, Transform};
use glam::{DVec2, DVec3};
use tracing::debug;

use crate::mesh::{Mesh, Polygon};
use crate::{Diagnostic, Geometry, MaterialDesc, MeshDescriptor, Placement};
use crate::{builders, csg, path, primitives};

pub(crate) fn compile_scene(roots: &[ResolvedShape]) -> (Vec<MeshDescriptor>, Vec<Diagnostic>) {
    let mut meshes = Vec::new();
    let mut diagnostics = Vec::new();
    for root in roots {
        walk(root, &Transform::identity(), &mut meshes, &mut diagnostics);
    }
    debug!(meshes = meshes.len(), failed_subtrees = diagnostics.len(), "scene compiled");
    (meshes, diagnostics)
}

fn walk(
    node: &ResolvedShape,
    parent: &Transform,
    out: &mut Vec<MeshDescriptor>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let world = parent.compose(&node.transform);
    match &node.kind {
        ShapeKind::Group => {
            for child in &node.children {
                walk(child, &world, out, diagnostics);
            }
        }

        ShapeKind::Primitive(kind) => {
            out.push(MeshDescriptor {
                geometry: Geometry::Primitive {
                    primitive: kind.as_str().to_string(),
                    segments: node.detail,
                },
                transform: Placement::from(&world),
                material: MaterialDesc::from(&node.material),
            });
            for child in &node.children {
                walk(child, &world, out, diagnostics);
            }
        }

        ShapeKind::Path(_) | ShapeKind::Csg(_) | ShapeKind::Builder { .. } => {
            match realize(node, parent) {
                Ok(polys) if polys.is_empty() => {
                    fail(node, &world, "produced no geometry", out, diagnostics);
                }
                Ok(polys) => out.push(mesh_descriptor(&polys, &node.material)),
                Err(message) => fail(node, &world, &message, out, diagnostics),
            }
        }
    }
}

fn fail(
    node: &ResolvedShape,
    world: &Transform,
    message: &str,
    out: &mut Vec<MeshDescriptor>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    debug!(line = node.span.line, column = node.span.column, message, "subtree failed");
    diagnostics.push(Diagnostic {
        message: message.to_string(),
        line: node.span.line,
        column: node.span.column,
    });
    out.push(error_marker(world));
}

// ─── Mesh realization ────────────────────────────────────────────────────────

/// Realize a subtree into world-space polygons. Any failure aborts only
/// this subtree.
fn realize(node: &ResolvedShape, parent: &Transform) -> Result<Vec<Polygon>, String> {
    let world = parent.compose(&node.transform);
    match &node.kind {
        ShapeKind::Primitive(kind) => {
            let polys = primitives::polygons(*kind, node.detail);
            Ok(primitives::transform_polygons(polys, &world))
        }

        ShapeKind::Group => {
            let mut polys = Vec::new();
            for child in &node.children {
                polys.extend(realize(child, &world)?);
            }
            Ok(polys)
        }

        // a bare path in a solid position compiles as a filled sheet
        ShapeKind::Path(data) => {
            if !data.closed {
                return Err("an open path has no surface to fill".to_string());
            }
            let outline = path::flatten(data, node.detail);
            builders::fill(&outline, &world)
        }

        ShapeKind::Csg(op) => realize_csg(*op, node, &world),

        ShapeKind::Builder { kind, opts } => realize_builder(*kind, opts, node, &world),
    }
}

fn realize_csg(op: CsgOp, node: &ResolvedShape, world: &Transform) -> Result<Vec<Polygon>, String> {
    if node.children.len() < 2 {
        return Err(format!(
            "`{}` needs at least 2 operands, got {}",
            op.as_str(),
            node.children.len()
        ));
    }

    let Some((head, rest)) = node.children.split_first() else {
        return Err(format!("`{}` has no operands", op.as_str()));
    };
    let mut acc = realize(head, world)?;

    for child in rest {
        let rhs = realize(child, world)?;
        acc = match op {
            CsgOp::Union => csg::union(acc, rhs),
            CsgOp::Difference => csg::difference(acc, rhs),
            CsgOp::Intersection => csg::intersection(acc, rhs),
            CsgOp::Xor => csg::xor(acc, rhs),
            // later children color-mask the first child's surface
            CsgOp::Stencil => {
                let m = &child.material;
                csg::stencil(acc, &rhs, [m.color[0], m.color[1], m.color[2], m.opacity])
            }
        };
    }
    Ok(acc)
}

fn realize_builder(
    kind: BuilderKind,
    opts: &BuilderOpts,
    node: &ResolvedShape,
    world: &Transform,
) -> Result<Vec<Polygon>, String> {
    let paths: Vec<(&ResolvedShape, &PathData)> = node.children.iter()
        .filter_map(|c| match &c.kind {
            ShapeKind::Path(data) => Some((c, data)),
            _ => None,
        })
        .collect();
    let solids: Vec<&ResolvedShape> = node.children.iter()
        .filter(|c| !matches!(c.kind, ShapeKind::Path(_)))
        .collect();

    match kind {
        BuilderKind::Fill => {
            if paths.is_empty() {
                return Err("`fill` needs a path to triangulate".to_string());
            }
            let mut out = Vec::new();
            for (child, data) in &paths {
                if !data.closed {
                    return Err("`fill` needs a closed path".to_string());
                }
                let outline = path::flatten(data, child.detail);
                let xf = world.compose(&child.transform);
                out.extend(builders::fill(&outline, &xf)?);
            }
            Ok(out)
        }

        BuilderKind::Lathe => {
            let (child, data) = paths.first()
                .ok_or_else(|| "`lathe` needs a profile path".to_string())?;
            let profile = section_2d(data, child);
            builders::lathe(&profile, data.closed, node.detail, world)
        }

        BuilderKind::Extrude => {
            let (child, data) = paths.first()
                .ok_or_else(|| "`extrude` needs a cross-section path".to_string())?;
            if !data.closed {
                return Err("`extrude` needs a closed cross-section".to_string());
            }
            let section = section_2d(data, child);
            match &opts.spine {
                Some(spine) => {
                    let spine_pts = path::flatten(spine, node.detail);
                    builders::extrude_along(&section, &spine_pts, spine.closed, opts.twist, world)
                }
                None => builders::extrude_linear(&section, opts.twist, node.detail, world),
            }
        }

        BuilderKind::Loft => {
            let sections: Vec<(Vec<DVec2>, Transform)> = paths.iter()
                .map(|(child, data)| {
                    if !data.closed {
                        return Err("`loft` cross-sections must be closed".to_string());
                    }
                    Ok((path::flatten(data, child.detail), world.compose(&child.transform)))
                })
                .collect::<Result<_, String>>()?;
            builders::loft(&sections)
        }

        BuilderKind::Hull => {
            let points = gather_points(&paths, &solids, world)?;
            builders::hull(&points)
        }

        BuilderKind::Minkowski => {
            if node.children.len() != 2 {
                return Err(format!(
                    "`minkowski` needs exactly 2 operands, got {}",
                    node.children.len()
                ));
            }
            let a = gather_points_of(&node.children[0], world)?;
            let b = gather_points_of(&node.children[1], world)?;
            builders::minkowski(&a, &b)
        }
    }
}

/// A path child flattened into the builder's 2D plane, with the child's own
/// transform applied.
fn section_2d(data: &PathData, child: &ResolvedShape) -> Vec<DVec2> {
    path::flatten(data, child.detail)
        .into_iter()
        .map(|p| {
            let q = child.transform.apply_point([p.x, p.y, 0.0]);
            DVec2::new(q[0], q[1])
        })
        .collect()
}

fn gather_points(
    paths: &[(&ResolvedShape, &PathData)],
    solids: &[&ResolvedShape],
    world: &Transform,
) -> Result<Vec<DVec3>, String> {
    let mut points = Vec::new();
    for (child, data) in paths {
        let xf = world.compose(&child.transform);
        for p in path::flatten(data, child.detail) {
            let q = xf.apply_point([p.x, p.y, 0.0]);
            points.push(DVec3::new(q[0], q[1], q[2]));
        }
    }
    for solid in solids {
        for poly in realize(solid, world)? {
            points.extend(poly.vertices.iter().map(|v| v.position));
        }
    }
    Ok(points)
}

fn gather_points_of(child: &ResolvedShape, world: &Transform) -> Result<Vec<DVec3>, String> {
    match &child.kind {
        ShapeKind::Path(data) => {
            let xf = world.compose(&child.transform);
            Ok(path::flatten(data, child.detail)
                .into_iter()
                .map(|p| {
                    let q = xf.apply_point([p.x, p.y, 0.0]);
                    DVec3::new(q[0], q[1], q[2])
                })
                .collect())
        }
        _ => Ok(realize(child, world)?
            .iter()
            .flat_map(|poly| poly.vertices.iter().map(|v| v.position))
            .collect()),
    }
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

fn mesh_descriptor(polys: &[Polygon], material: &Material) -> MeshDescriptor {
    let mesh = Mesh::from_polygons(polys);
    MeshDescriptor {
        geometry: geometry_of(&mesh),
        transform: Placement::identity(),
        material: MaterialDesc::from(material),
    }
}

fn geometry_of(mesh: &Mesh) -> Geometry {
    Geometry::Mesh {
        positions: mesh.vertices.iter().map(|v| [v.position.x, v.position.y, v.position.z]).collect(),
        normals: mesh.vertices.iter().map(|v| [v.normal.x, v.normal.y, v.normal.z]).collect(),
        indices: mesh.indices.clone(),
        colors: mesh.colors.clone(),
    }
}

/// Small magenta octahedron standing in for a failed subtree.
fn error_marker(world: &Transform) -> MeshDescriptor {
    let r = 0.1;
    let axis = [
        DVec3::new(r, 0.0, 0.0),
        DVec3::new(0.0, r, 0.0),
        DVec3::new(0.0, 0.0, r),
    ];
    let center = DVec3::new(world.position[0], world.position[1], world.position[2]);
    let mut polys = Vec::with_capacity(8);
    for &sx in &[1.0, -1.0] {
        for &sy in &[1.0, -1.0] {
            for &sz in &[1.0, -1.0] {
                let (a, b, c) = (axis[0] * sx, axis[1] * sy, axis[2] * sz);
                let tri = if sx * sy * sz > 0.0 { [a, b, c] } else { [a, c, b] };
                if let Some(p) = Polygon::from_positions(&[
                    center + tri[0],
                    center + tri[1],
                    center + tri[2],
                ]) {
                    polys.push(p);
                }
            }
        }
    }
    let mesh = Mesh::from_polygons(&polys);
    MeshDescriptor {
        geometry: geometry_of(&mesh),
        transform: Placement::identity(),
        material: MaterialDesc {
            color: [1.0, 0.0, 1.0],
            opacity: 1.0,
            metallic: 0.0,
            roughness: 1.0,
            glow: 0.5,
            texture: None,
        },
    }
}
