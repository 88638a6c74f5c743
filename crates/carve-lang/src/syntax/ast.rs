use crate::types::scene::{BuilderKind, CsgOp, PrimitiveKind};

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Stmt {
    /// `cube`, `sphere { size 1 }`, …
    Shape {
        kind: PrimitiveKind,
        block: Option<Vec<Stmt>>,
        span: Span,
    },
    /// `union { … }`, `difference { … }`, …
    Csg {
        op: CsgOp,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `extrude { … }`, `lathe { … }`, …
    Builder {
        kind: BuilderKind,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `group { … }`
    Group {
        body: Vec<Stmt>,
        span: Span,
    },
    /// `path { point 0 0 … }`
    Path {
        body: Vec<Stmt>,
        span: Span,
    },
    /// `point 1 2`, `curve 1 2`, `circle`, `polygon { sides 5 }`,
    /// `svgpath "M0 0L1 0"`, …
    PathCmd {
        kind: PathCmdKind,
        args: Vec<Expr>,
        block: Option<Vec<Stmt>>,
        span: Span,
    },
    /// `size 1 2 3`, `color 1 0 0`, `detail 32`, …
    Property {
        name: String,
        value: Expr,
        span: Span,
    },
    /// `translate 1 0 0`, `rotate 0 0 pi`, `scale 2` — advance the enclosing
    /// block's transform cursor, affecting subsequent siblings and children.
    Move {
        kind: MoveKind,
        value: Expr,
        span: Span,
    },
    /// `along { … }` inside an extrude block.
    Along {
        body: Vec<Stmt>,
        span: Span,
    },
    /// `for i in 1 to 5 { … }`, `for p in points { … }`
    For {
        var: String,
        iterable: Expr,
        body: Vec<Stmt>,
        span: Span,
    },
    /// `if … { } else if … { } else { }` — one (condition, body) per branch.
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
    /// `switch v { case 1 2 … else … }`
    Switch {
        value: Expr,
        cases: Vec<SwitchCase>,
        else_body: Option<Vec<Stmt>>,
        span: Span,
    },
    /// `define name expr` or `define name(params) { body }`
    Define {
        name: String,
        params: Vec<String>,
        value: DefineValue,
        span: Span,
    },
    /// `option name default` — keyword-overridable default inside a define body.
    Option {
        name: String,
        default: Expr,
        span: Span,
    },
    /// Bare identifier in statement position: custom-shape invocation with
    /// positional arguments and/or a property/children block.
    Invoke {
        name: String,
        args: Vec<Expr>,
        block: Option<Vec<Stmt>>,
        span: Span,
    },
}

impl Stmt {
    pub fn span(&self) -> &Span {
        match self {
            Stmt::Shape { span, .. }
            | Stmt::Csg { span, .. }
            | Stmt::Builder { span, .. }
            | Stmt::Group { span, .. }
            | Stmt::Path { span, .. }
            | Stmt::PathCmd { span, .. }
            | Stmt::Property { span, .. }
            | Stmt::Move { span, .. }
            | Stmt::Along { span, .. }
            | Stmt::For { span, .. }
            | Stmt::If { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Define { span, .. }
            | Stmt::Option { span, .. }
            | Stmt::Invoke { span, .. } => span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Translate,
    Rotate,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCmdKind {
    Point,
    Curve,
    Arc,
    Circle,
    Square,
    RoundRect,
    Polygon,
    SvgPath,
}

impl PathCmdKind {
    pub fn from_word(s: &str) -> Option<Self> {
        match s {
            "point"     => Some(Self::Point),
            "curve"     => Some(Self::Curve),
            "arc"       => Some(Self::Arc),
            "circle"    => Some(Self::Circle),
            "square"    => Some(Self::Square),
            "roundrect" => Some(Self::RoundRect),
            "polygon"   => Some(Self::Polygon),
            "svgpath"   => Some(Self::SvgPath),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub values: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DefineValue {
    /// `define radius 0.5` — constant binding.
    Expr(Expr),
    /// `define wheel { … }` — custom shape/function closure.
    Body(Vec<Stmt>),
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64, Span),
    Bool(bool, Span),
    Str(String, Span),
    Ident(String, Span),

    /// Space-separated operand run: `1 2 3`, `(5 -1)`.
    Vector(Vec<Expr>, Span),

    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
        span: Span,
    },

    UnOp {
        op: UnOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `1 to 5`, `0 to 10 step 2` — bounds inclusive.
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        step: Option<Box<Expr>>,
        span: Span,
    },

    /// `p.x`, `list.first`
    Member {
        expr: Box<Expr>,
        field: String,
        span: Span,
    },

    /// `v[0]`, `v[-1]`
    Index {
        expr: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },

    /// `cos(a)`, `atan2(y x)` — args space-separated, paren attached to name.
    Call {
        callee: String,
        args: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Number(_, s)   => s,
            Expr::Bool(_, s)     => s,
            Expr::Str(_, s)      => s,
            Expr::Ident(_, s)    => s,
            Expr::Vector(_, s)   => s,
            Expr::BinOp { span, .. }  => span,
            Expr::UnOp { span, .. }   => span,
            Expr::Range { span, .. }  => span,
            Expr::Member { span, .. } => span,
            Expr::Index { span, .. }  => span,
            Expr::Call { span, .. }   => span,
        }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+", Self::Sub => "-",
            Self::Mul => "*", Self::Div => "/", Self::Mod => "%",
            Self::Eq => "=", Self::NotEq => "<>",
            Self::Lt => "<", Self::LtEq => "<=",
            Self::Gt => ">", Self::GtEq => ">=",
            Self::And => "and", Self::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}
