//! End-to-end pipeline tests: script text in, mesh/primitive descriptors out.

use std::collections::HashMap;

use approx::assert_relative_eq;
use carve_geom::{Compiled, EngineConfig, EngineError, Geometry, Stage, compile};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn run(src: &str) -> Compiled {
    compile(src, &EngineConfig::default()).unwrap_or_else(|e| panic!("compile failed: {e}"))
}

fn run_err(src: &str) -> EngineError {
    compile(src, &EngineConfig::default()).expect_err("expected pipeline error")
}

fn mesh_data(geometry: &Geometry) -> (&Vec<[f64; 3]>, &Vec<u32>) {
    match geometry {
        Geometry::Mesh { positions, indices, .. } => (positions, indices),
        Geometry::Primitive { .. } => panic!("expected mesh geometry, got a primitive"),
    }
}

/// Signed volume of an indexed triangle mesh via the divergence theorem.
fn volume(positions: &[[f64; 3]], indices: &[u32]) -> f64 {
    let mut v = 0.0;
    for tri in indices.chunks(3) {
        let a = positions[tri[0] as usize];
        let b = positions[tri[1] as usize];
        let c = positions[tri[2] as usize];
        let bxc = [
            b[1] * c[2] - b[2] * c[1],
            b[2] * c[0] - b[0] * c[2],
            b[0] * c[1] - b[1] * c[0],
        ];
        v += (a[0] * bxc[0] + a[1] * bxc[1] + a[2] * bxc[2]) / 6.0;
    }
    v
}

/// Every edge shared by exactly two triangles, keyed on quantized positions.
fn is_closed(positions: &[[f64; 3]], indices: &[u32]) -> bool {
    let key = |p: [f64; 3]| -> (i64, i64, i64) {
        let q = 1e7;
        ((p[0] * q).round() as i64, (p[1] * q).round() as i64, (p[2] * q).round() as i64)
    };
    let mut edges: HashMap<((i64, i64, i64), (i64, i64, i64)), u32> = HashMap::new();
    for tri in indices.chunks(3) {
        for e in 0..3 {
            let a = key(positions[tri[e] as usize]);
            let b = key(positions[tri[(e + 1) % 3] as usize]);
            if a == b {
                continue;
            }
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            *edges.entry((lo, hi)).or_insert(0) += 1;
        }
    }
    edges.values().all(|&n| n == 2)
}

// ─── Scenario tests ──────────────────────────────────────────────────────────

#[test]
fn two_primitives_with_placement() {
    let out = run("cube { size 1 } sphere { position 2 0 0 size 1 }");
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.meshes.len(), 2);

    match &out.meshes[0].geometry {
        Geometry::Primitive { primitive, .. } => assert_eq!(primitive, "cube"),
        other => panic!("expected primitive, got {other:?}"),
    }
    match &out.meshes[1].geometry {
        Geometry::Primitive { primitive, .. } => assert_eq!(primitive, "sphere"),
        other => panic!("expected primitive, got {other:?}"),
    }
    assert_eq!(out.meshes[1].transform.position, [2.0, 0.0, 0.0]);
}

#[test]
fn same_script_compiles_identically() {
    let src = "
detail 12
for i in 1 to 3 {
    translate 1 0 0
    difference { cube sphere { size 0.6 } }
}
";
    let a = serde_json::to_vec(&run(src)).expect("serialize");
    let b = serde_json::to_vec(&run(src)).expect("serialize");
    assert_eq!(a, b);
}

#[test]
fn difference_carves_a_cavity() {
    let out = run("difference { cube sphere { size 0.5 } }");
    assert!(out.diagnostics.is_empty());
    assert_eq!(out.meshes.len(), 1);
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert!(is_closed(positions, indices), "difference result must be closed");
    let v = volume(positions, indices);
    // unit cube minus a tessellated ball of radius 0.25
    assert!(v > 0.90 && v < 0.95, "volume {v}");
}

#[test]
fn union_merges_and_stays_closed() {
    let out = run("union { cube cube { position 0.5 0 0 } }");
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert!(is_closed(positions, indices));
    assert_relative_eq!(volume(positions, indices), 1.5, epsilon = 1e-6);
}

#[test]
fn csg_respects_group_transforms() {
    // the whole difference is shifted; the cavity moves with it
    let out = run("group { translate 1 0 0 difference { cube sphere { size 0.5 } } }");
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    let min_x = positions.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
    let max_x = positions.iter().map(|p| p[0]).fold(f64::NEG_INFINITY, f64::max);
    assert!((min_x - 0.5).abs() < 1e-9, "min_x {min_x}");
    assert!((max_x - 1.5).abs() < 1e-9, "max_x {max_x}");
    assert!(is_closed(positions, indices));
}

// ─── Builders ────────────────────────────────────────────────────────────────

#[test]
fn extrude_square_makes_a_box() {
    let out = run("extrude { square }");
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert!(is_closed(positions, indices));
    assert_relative_eq!(volume(positions, indices), 1.0, epsilon = 1e-9);
}

#[test]
fn extrude_with_twist() {
    let out = run("extrude { square\n twist 1 }");
    assert!(out.diagnostics.is_empty());
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert!(is_closed(positions, indices));
}

#[test]
fn lathe_profile_revolves() {
    let src = "lathe { path { point 0 -0.5 point 0.4 -0.5 point 0.4 0.5 point 0 0.5 } }";
    let out = run(src);
    assert!(out.diagnostics.is_empty());
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert!(is_closed(positions, indices));
    assert!(volume(positions, indices) > 0.0);
}

#[test]
fn fill_triangulates_closed_path() {
    let out = run("fill { polygon { sides 6 } }");
    assert!(out.diagnostics.is_empty());
    let (_, indices) = mesh_data(&out.meshes[0].geometry);
    // 4 triangles per side (front and back)
    assert_eq!(indices.len() / 3, 8);
}

#[test]
fn loft_between_sections() {
    let src = "loft { square\n translate 0 0 1\n square { size 0.5 } }";
    let out = run(src);
    assert!(out.diagnostics.is_empty(), "diagnostics: {:?}", out.diagnostics);
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert!(is_closed(positions, indices));
    assert!(volume(positions, indices) > 0.0);
}

#[test]
fn hull_wraps_children() {
    let out = run("hull { cube cube { position 2 0 0 } }");
    assert!(out.diagnostics.is_empty());
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    // convex hull of two unit cubes 2 apart: a 3×1×1 prism
    assert_relative_eq!(volume(positions, indices), 3.0, epsilon = 1e-6);
}

#[test]
fn minkowski_sums_two_cubes() {
    let out = run("minkowski { cube cube }");
    assert!(out.diagnostics.is_empty());
    let (positions, indices) = mesh_data(&out.meshes[0].geometry);
    assert_relative_eq!(volume(positions, indices), 8.0, epsilon = 1e-6);
}

#[test]
fn stencil_masks_surface_without_topology_change() {
    let out = run("stencil { cube cube { position 0.45 0 0 color 1 0 0 } }");
    assert!(out.diagnostics.is_empty());
    match &out.meshes[0].geometry {
        Geometry::Mesh { positions, indices, colors, .. } => {
            // same cube topology as an unstenciled cube: 6 quads fanned
            assert_eq!(indices.len() / 3, 12);
            assert_eq!(colors.len(), positions.len());
            assert!(colors.iter().any(|c| c[0] == 1.0 && c[1] == 0.0));
            assert!(colors.iter().any(|c| *c == [1.0, 1.0, 1.0, 1.0]));
        }
        other => panic!("expected mesh, got {other:?}"),
    }
}

// ─── Error contract ──────────────────────────────────────────────────────────

#[test]
fn undefined_symbol_yields_no_meshes() {
    let err = run_err("cube { size nope }");
    assert_eq!(err.stage, Stage::Evaluate);
    assert_eq!(err.kind, "UndefinedSymbol");
    assert_eq!(err.line, 1);
}

#[test]
fn lex_error_stage() {
    let err = run_err("cube $ 1");
    assert_eq!(err.stage, Stage::Lex);
    assert_eq!(err.kind, "LexError");
}

#[test]
fn parse_error_stage() {
    let err = run_err("union { cube");
    assert_eq!(err.stage, Stage::Parse);
    assert_eq!(err.kind, "ParseError");
}

#[test]
fn compile_failure_is_fail_soft() {
    // the one-operand union fails, the sibling cube still compiles
    let out = run("cube\nunion { sphere }");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].line, 2);
    assert_eq!(out.meshes.len(), 2);
    // the failed subtree left a marker mesh
    assert!(matches!(out.meshes[1].geometry, Geometry::Mesh { .. }));
    assert_eq!(out.meshes[1].material.color, [1.0, 0.0, 1.0]);
}

#[test]
fn open_path_to_fill_is_fail_soft() {
    let out = run("fill { path { point 0 0 point 1 0 point 1 1 } }\ncube");
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.meshes.len(), 2);
}

#[test]
fn error_serializes_with_stage_and_position() {
    let err = run_err("cube { size nope }");
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["stage"], "evaluate");
    assert_eq!(json["kind"], "UndefinedSymbol");
    assert_eq!(json["line"], 1);
    assert!(json["message"].as_str().is_some_and(|m| m.contains("nope")));
}

#[test]
fn diagnostics_convert_to_engine_errors() {
    let out = run("union { sphere }");
    let err = out.diagnostics[0].to_engine_error();
    assert_eq!(err.stage, Stage::Compile);
    assert_eq!(err.kind, "CompileError");
}

// ─── Config plumbing ─────────────────────────────────────────────────────────

#[test]
fn default_detail_threads_through_to_descriptors() {
    let config = EngineConfig { default_detail: 24, ..EngineConfig::default() };
    let out = compile("sphere", &config).expect("compiled");
    match &out.meshes[0].geometry {
        Geometry::Primitive { segments, .. } => assert_eq!(*segments, 24),
        other => panic!("expected primitive, got {other:?}"),
    }
}

#[test]
fn resource_ceiling_errors_are_reported() {
    let config = EngineConfig { max_total_shapes: 3, ..EngineConfig::default() };
    let err = compile("for i in 1 to 10 { cube }", &config).expect_err("should abort");
    assert_eq!(err.stage, Stage::Evaluate);
    assert_eq!(err.kind, "ResourceLimitExceeded");
}
