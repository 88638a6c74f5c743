pub mod error;
pub mod runtime;
pub mod syntax;
pub mod types;

pub use error::{Error, ErrorCode, EvalError, EvalErrorKind};
pub use runtime::value::Value;
pub use syntax::ast::{Program, Span};
pub use syntax::token::{Token, TokenKind};
pub use types::scene::{
    BuilderKind, BuilderOpts, CsgOp, Material, PathData, PathVerb, PrimitiveKind,
    ResolvedShape, ShapeKind,
};
pub use types::transform::{Quat, Transform};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Resource ceilings and defaults threaded through one evaluation. These
/// counters are the only defense against runaway scripts — the evaluator has
/// no suspension point an external timeout could interrupt at.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cumulative loop-iteration budget per evaluation.
    pub max_loop_iterations: u64,
    /// Maximum custom-shape invocation depth.
    pub max_recursion_depth: u32,
    /// Maximum number of resolved shape nodes.
    pub max_total_shapes: u64,
    /// Tessellation level used when a script does not set `detail`.
    pub default_detail: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_loop_iterations: 100_000,
            max_recursion_depth: 64,
            max_total_shapes: 10_000,
            default_detail: 16,
        }
    }
}

// ─── Public API ───────────────────────────────────────────────────────────────

/// Source text → token stream. Fails fast on the first lexical error.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    syntax::lexer::Lexer::new(source).tokenize()
}

/// Source text → AST. Fails fast; no partial AST is returned.
pub fn parse_source(source: &str) -> Result<Program, Error> {
    let tokens = tokenize(source)?;
    syntax::parser::Parser::new(tokens).parse()
}

/// AST + config → resolved shape tree. All structures are created fresh per
/// call and carry no state across invocations.
pub fn evaluate(program: &Program, config: &EngineConfig) -> Result<Vec<ResolvedShape>, EvalError> {
    runtime::interpreter::evaluate(program, config)
}
