use std::rc::Rc;

use crate::runtime::scope::Scope;
use crate::syntax::ast::Stmt;
use crate::types::scene::{PathData, ResolvedShape};

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Str(String),
    /// Fixed-arity numeric tuple. Arity is set at construction and checked
    /// by element-wise operators.
    Vector(Vec<f64>),
    /// Heterogeneous list, produced by builtins such as `split`.
    List(Vec<Value>),
    Path(PathData),
    Shapes(Vec<ResolvedShape>),
    Range { from: f64, to: f64, step: f64 },
    Closure(Rc<Closure>),
}

/// A custom shape/function definition bound to its declaring scope chain.
#[derive(Debug)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub env: Scope,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_)   => "number",
            Value::Bool(_)     => "boolean",
            Value::Str(_)      => "string",
            Value::Vector(_)   => "vector",
            Value::List(_)     => "list",
            Value::Path(_)     => "path",
            Value::Shapes(_)   => "shapes",
            Value::Range { .. } => "range",
            Value::Closure(_)  => "shape definition",
        }
    }
}

/// Literal equality, used by `=`/`<>` and `switch` case matching.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Vector(x), Value::Vector(y)) => x == y,
        _ => false,
    }
}
