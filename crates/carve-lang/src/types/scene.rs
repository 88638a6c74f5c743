//! Resolved scene types — the evaluator's output, consumed by the geometry
//! compiler. All kinds are closed enums so the compiler can match
//! exhaustively.

use crate::syntax::ast::Span;
use crate::types::transform::Transform;

// ─── Kinds ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Torus,
}

impl PrimitiveKind {
    pub fn from_word(s: &str) -> Option<Self> {
        match s {
            "cube"     => Some(Self::Cube),
            "sphere"   => Some(Self::Sphere),
            "cylinder" => Some(Self::Cylinder),
            "cone"     => Some(Self::Cone),
            "torus"    => Some(Self::Torus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cube => "cube",
            Self::Sphere => "sphere",
            Self::Cylinder => "cylinder",
            Self::Cone => "cone",
            Self::Torus => "torus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsgOp {
    Union,
    Difference,
    Intersection,
    Xor,
    Stencil,
}

impl CsgOp {
    pub fn from_word(s: &str) -> Option<Self> {
        match s {
            "union"        => Some(Self::Union),
            "difference"   => Some(Self::Difference),
            "intersection" => Some(Self::Intersection),
            "xor"          => Some(Self::Xor),
            "stencil"      => Some(Self::Stencil),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Union => "union",
            Self::Difference => "difference",
            Self::Intersection => "intersection",
            Self::Xor => "xor",
            Self::Stencil => "stencil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Extrude,
    Lathe,
    Loft,
    Hull,
    Minkowski,
    Fill,
}

impl BuilderKind {
    pub fn from_word(s: &str) -> Option<Self> {
        match s {
            "extrude"   => Some(Self::Extrude),
            "lathe"     => Some(Self::Lathe),
            "loft"      => Some(Self::Loft),
            "hull"      => Some(Self::Hull),
            "minkowski" => Some(Self::Minkowski),
            "fill"      => Some(Self::Fill),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extrude => "extrude",
            Self::Lathe => "lathe",
            Self::Loft => "loft",
            Self::Hull => "hull",
            Self::Minkowski => "minkowski",
            Self::Fill => "fill",
        }
    }
}

// ─── Material ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: [f64; 3],
    pub opacity: f64,
    pub metallic: f64,
    pub roughness: f64,
    pub glow: f64,
    pub texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            metallic: 0.0,
            roughness: 0.5,
            glow: 0.0,
            texture: None,
        }
    }
}

// ─── Paths ────────────────────────────────────────────────────────────────────

/// One step of a 2D path outline. A `Curve` is a quadratic control point:
/// the on-curve points around it are interpolated through it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathVerb {
    Point([f64; 2]),
    Curve([f64; 2]),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PathData {
    pub verbs: Vec<PathVerb>,
    pub closed: bool,
}

impl PathData {
    /// On-curve points only (control points excluded).
    pub fn points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.verbs.iter().filter_map(|v| match v {
            PathVerb::Point(p) => Some(*p),
            PathVerb::Curve(_) => None,
        })
    }

    pub fn point_count(&self) -> usize {
        self.points().count()
    }

    pub fn first_point(&self) -> Option<[f64; 2]> {
        self.points().next()
    }

    pub fn last_point(&self) -> Option<[f64; 2]> {
        self.points().last()
    }

    pub fn push_point(&mut self, p: [f64; 2]) {
        self.verbs.push(PathVerb::Point(p));
    }

    /// A path whose first and last on-curve points coincide is closed.
    /// The duplicated closing point is dropped; `closed` implies the outline
    /// wraps from the last point back to the first.
    pub fn detect_closed(&mut self) {
        if let (Some(a), Some(b)) = (self.first_point(), self.last_point()) {
            let near = (a[0] - b[0]).abs() < 1e-9 && (a[1] - b[1]).abs() < 1e-9;
            if near && self.point_count() > 3 {
                if matches!(self.verbs.last(), Some(PathVerb::Point(_))) {
                    self.verbs.pop();
                }
                self.closed = true;
            }
        }
    }
}

// ─── Resolved shapes ──────────────────────────────────────────────────────────

/// Options attached to a builder node. Only `extrude` reads them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuilderOpts {
    /// Total twist in radians, distributed linearly along the sweep.
    pub twist: f64,
    /// Sweep spine from an `along { … }` block.
    pub spine: Option<PathData>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Primitive(PrimitiveKind),
    Csg(CsgOp),
    Builder { kind: BuilderKind, opts: BuilderOpts },
    Group,
    Path(PathData),
}

/// A shape node after evaluation: every property reduced to a concrete
/// value, ready for geometry compilation. `transform` is local to the parent
/// node; the compiler composes the ancestor chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedShape {
    pub kind: ShapeKind,
    pub transform: Transform,
    pub material: Material,
    pub detail: u32,
    pub children: Vec<ResolvedShape>,
    pub span: Span,
}

impl ResolvedShape {
    pub fn new(kind: ShapeKind, span: Span) -> Self {
        Self {
            kind,
            transform: Transform::identity(),
            material: Material::default(),
            detail: 16,
            children: Vec::new(),
            span,
        }
    }
}
