//! Always-available built-in functions and constants. The root scope is
//! seeded with the constants; functions are dispatched by name from the
//! interpreter's call evaluation.
//!
//! All trigonometry is in radians.

use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::scope::Scope;
use crate::runtime::value::Value;
use crate::syntax::ast::Span;

pub fn install_constants(scope: &mut Scope) {
    scope.define("pi", Value::Number(std::f64::consts::PI));
    scope.define("tau", Value::Number(std::f64::consts::TAU));
}

/// Dispatch a builtin call. Returns `None` when the name is not a builtin —
/// the caller then tries user definitions.
pub fn call(name: &str, args: &[Value], span: &Span) -> Option<Result<Value, EvalError>> {
    let result = match name {
        // ── 1-arg math ────────────────────────────────────────────────────
        "sin"   => unary_math(name, args, span, f64::sin),
        "cos"   => unary_math(name, args, span, f64::cos),
        "tan"   => unary_math(name, args, span, f64::tan),
        "asin"  => unary_math(name, args, span, f64::asin),
        "acos"  => unary_math(name, args, span, f64::acos),
        "atan"  => unary_math(name, args, span, f64::atan),
        "sqrt"  => unary_math(name, args, span, f64::sqrt),
        "abs"   => unary_math(name, args, span, f64::abs),
        "floor" => unary_math(name, args, span, f64::floor),
        "ceil"  => unary_math(name, args, span, f64::ceil),
        "round" => unary_math(name, args, span, f64::round),

        // ── 2-arg math ────────────────────────────────────────────────────
        "atan2" => binary_math(name, args, span, f64::atan2),
        "pow"   => binary_math(name, args, span, f64::powf),
        "min"   => binary_math(name, args, span, f64::min),
        "max"   => binary_math(name, args, span, f64::max),

        // ── vector ops ────────────────────────────────────────────────────
        "dot" => (|| {
            check_argc(name, args, 2, span)?;
            let a = as_vector(&args[0], span)?;
            let b = as_vector(&args[1], span)?;
            check_arity(a.len(), b.len(), span)?;
            Ok(Value::Number(a.iter().zip(b).map(|(x, y)| x * y).sum()))
        })(),
        "cross" => (|| {
            check_argc(name, args, 2, span)?;
            let a = as_vector(&args[0], span)?;
            let b = as_vector(&args[1], span)?;
            if a.len() != 3 || b.len() != 3 {
                return Err(EvalError::new(EvalErrorKind::ArityMismatch, span.line, span.column,
                    "`cross` requires two 3-component vectors"));
            }
            Ok(Value::Vector(vec![
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ]))
        })(),
        "length" => (|| {
            check_argc(name, args, 1, span)?;
            let v = as_vector(&args[0], span)?;
            Ok(Value::Number(v.iter().map(|x| x * x).sum::<f64>().sqrt()))
        })(),
        "normalize" => (|| {
            check_argc(name, args, 1, span)?;
            let v = as_vector(&args[0], span)?;
            let len = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            if len == 0.0 {
                return Err(EvalError::new(EvalErrorKind::DivisionByZero, span.line, span.column,
                    "cannot normalize a zero-length vector"));
            }
            Ok(Value::Vector(v.iter().map(|x| x / len).collect()))
        })(),
        "sum" => (|| {
            check_argc(name, args, 1, span)?;
            match &args[0] {
                Value::Vector(v) => Ok(Value::Number(v.iter().sum())),
                Value::List(items) => {
                    let mut total = 0.0;
                    for item in items {
                        total += as_number(item, span)?;
                    }
                    Ok(Value::Number(total))
                }
                other => Err(type_error("sum", "a vector or list", other, span)),
            }
        })(),

        // ── string ops ────────────────────────────────────────────────────
        "join" => (|| {
            check_argc(name, args, 2, span)?;
            let sep = as_str(&args[1], span)?;
            match &args[0] {
                Value::List(items) => {
                    let parts: Result<Vec<String>, EvalError> =
                        items.iter().map(|v| stringify(v, span)).collect();
                    Ok(Value::Str(parts?.join(sep)))
                }
                Value::Vector(v) => {
                    let parts: Vec<String> = v.iter().map(|n| format_number(*n)).collect();
                    Ok(Value::Str(parts.join(sep)))
                }
                other => Err(type_error("join", "a list or vector", other, span)),
            }
        })(),
        "split" => (|| {
            check_argc(name, args, 2, span)?;
            let s = as_str(&args[0], span)?;
            let sep = as_str(&args[1], span)?;
            let parts = if sep.is_empty() {
                s.chars().map(|c| Value::Str(c.to_string())).collect()
            } else {
                s.split(sep).map(|p| Value::Str(p.to_string())).collect()
            };
            Ok(Value::List(parts))
        })(),
        "trim" => (|| {
            check_argc(name, args, 1, span)?;
            Ok(Value::Str(as_str(&args[0], span)?.trim().to_string()))
        })(),

        _ => return None,
    };
    Some(result)
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn unary_math(name: &str, args: &[Value], span: &Span, f: fn(f64) -> f64) -> Result<Value, EvalError> {
    check_argc(name, args, 1, span)?;
    Ok(Value::Number(f(as_number(&args[0], span)?)))
}

fn binary_math(name: &str, args: &[Value], span: &Span, f: fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    check_argc(name, args, 2, span)?;
    Ok(Value::Number(f(as_number(&args[0], span)?, as_number(&args[1], span)?)))
}

fn check_argc(name: &str, args: &[Value], n: usize, span: &Span) -> Result<(), EvalError> {
    if args.len() != n {
        Err(EvalError::new(EvalErrorKind::ArityMismatch, span.line, span.column,
            format!("`{name}` expects {n} argument{}, got {}", if n == 1 { "" } else { "s" }, args.len())))
    } else {
        Ok(())
    }
}

fn check_arity(a: usize, b: usize, span: &Span) -> Result<(), EvalError> {
    if a != b {
        Err(EvalError::new(EvalErrorKind::ArityMismatch, span.line, span.column,
            format!("vector arity mismatch: {a} vs {b}")))
    } else {
        Ok(())
    }
}

fn as_number(v: &Value, span: &Span) -> Result<f64, EvalError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(type_error("argument", "a number", other, span)),
    }
}

fn as_vector<'a>(v: &'a Value, span: &Span) -> Result<&'a [f64], EvalError> {
    match v {
        Value::Vector(items) => Ok(items),
        other => Err(type_error("argument", "a vector", other, span)),
    }
}

fn as_str<'a>(v: &'a Value, span: &Span) -> Result<&'a str, EvalError> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(type_error("argument", "a string", other, span)),
    }
}

fn stringify(v: &Value, span: &Span) -> Result<String, EvalError> {
    match v {
        Value::Str(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(type_error("join", "strings or numbers", other, span)),
    }
}

fn format_number(n: f64) -> String {
    if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn type_error(what: &str, expected: &str, got: &Value, span: &Span) -> EvalError {
    EvalError::new(EvalErrorKind::TypeMismatch, span.line, span.column,
        format!("{what} must be {expected}, got {}", got.type_name()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
