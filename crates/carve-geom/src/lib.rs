//! Geometry compiler and end-to-end facade for the carve scripting engine.
//!
//! `compile` runs the full pipeline — text → tokens → AST → resolved shape
//! tree → mesh/primitive descriptors — in a single synchronous call with no
//! state carried across invocations. Lex, parse and evaluation errors are
//! fail-fast; geometry-compile errors are fail-soft per subtree and come
//! back as diagnostics next to an inline marker mesh.

pub mod builders;
mod compiler;
pub mod csg;
pub mod mesh;
pub mod path;
pub mod primitives;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use carve_lang::{
    EngineConfig, Material, PathData, PrimitiveKind, ResolvedShape, ShapeKind, Transform,
};

// ─── Output descriptors ──────────────────────────────────────────────────────

/// One renderable item. Plain primitives stay parametric; CSG and builder
/// results carry world-space triangle data with an identity placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshDescriptor {
    pub geometry: Geometry,
    pub transform: Placement,
    pub material: MaterialDesc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    Primitive {
        primitive: String,
        segments: u32,
    },
    Mesh {
        positions: Vec<[f64; 3]>,
        normals: Vec<[f64; 3]>,
        indices: Vec<u32>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        colors: Vec<[f64; 4]>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub position: [f64; 3],
    /// Quaternion, (x, y, z, w).
    pub rotation: [f64; 4],
    pub scale: [f64; 3],
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

impl From<&Transform> for Placement {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.position,
            rotation: [t.rotation.x, t.rotation.y, t.rotation.z, t.rotation.w],
            scale: t.scale,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialDesc {
    pub color: [f64; 3],
    pub opacity: f64,
    pub metallic: f64,
    pub roughness: f64,
    pub glow: f64,
    pub texture: Option<String>,
}

impl From<&Material> for MaterialDesc {
    fn from(m: &Material) -> Self {
        Self {
            color: m.color,
            opacity: m.opacity,
            metallic: m.metallic,
            roughness: m.roughness,
            glow: m.glow,
            texture: m.texture.clone(),
        }
    }
}

/// Successful compilation: the ordered descriptor list plus any fail-soft
/// per-subtree compile diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Compiled {
    pub meshes: Vec<MeshDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

/// A fail-soft geometry-compile finding, positioned at the failed subtree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Diagnostic {
    pub fn to_engine_error(&self) -> EngineError {
        EngineError {
            stage: Stage::Compile,
            kind: "CompileError".to_string(),
            message: self.message.clone(),
            line: self.line,
            column: self.column,
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lex,
    Parse,
    Evaluate,
    Compile,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lex => "lex",
            Self::Parse => "parse",
            Self::Evaluate => "evaluate",
            Self::Compile => "compile",
        }
    }
}

/// Structured pipeline error handed back to the caller, carrying the source
/// position so an upstream generator can attempt a correction.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{} error [{kind}] {line}:{column} — {message}", .stage.as_str())]
pub struct EngineError {
    pub stage: Stage,
    pub kind: String,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<carve_lang::Error> for EngineError {
    fn from(e: carve_lang::Error) -> Self {
        let stage = if e.code.is_lex() { Stage::Lex } else { Stage::Parse };
        Self {
            stage,
            kind: if stage == Stage::Lex { "LexError" } else { "ParseError" }.to_string(),
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

impl From<carve_lang::EvalError> for EngineError {
    fn from(e: carve_lang::EvalError) -> Self {
        Self {
            stage: Stage::Evaluate,
            kind: e.kind.as_str().to_string(),
            message: e.message,
            line: e.line,
            column: e.column,
        }
    }
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Compile a script into renderable descriptors. Stateless: everything is
/// built fresh for this call and dropped when the result is returned.
pub fn compile(source: &str, config: &EngineConfig) -> Result<Compiled, EngineError> {
    let program = carve_lang::parse_source(source)?;
    let scene = carve_lang::evaluate(&program, config)?;
    debug!(shapes = scene.len(), "scene evaluated");
    let (meshes, diagnostics) = compiler::compile_scene(&scene);
    Ok(Compiled { meshes, diagnostics })
}
