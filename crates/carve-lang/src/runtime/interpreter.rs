//! Tree-walking evaluator. A single depth-first walk over the AST against an
//! explicit scope chain, producing the resolved shape tree consumed by the
//! geometry compiler. Resource ceilings (loop iterations, recursion depth,
//! emitted shapes) are counters checked at every step.

use std::rc::Rc;

use crate::EngineConfig;
use crate::error::{EvalError, EvalErrorKind};
use crate::runtime::builtins;
use crate::runtime::paths;
use crate::runtime::scope::Scope;
use crate::runtime::value::{Closure, Value, values_equal};
use crate::syntax::ast::{
    BinOp, DefineValue, Expr, MoveKind, PathCmdKind, Program, Span, Stmt, UnOp,
};
use crate::types::scene::{
    BuilderOpts, Material, PathData, PathVerb, PrimitiveKind, ResolvedShape, ShapeKind,
};
use crate::types::transform::{Quat, Transform};

/// Evaluate a parsed program into the resolved shape tree.
pub fn evaluate(program: &Program, config: &EngineConfig) -> Result<Vec<ResolvedShape>, EvalError> {
    let mut interp = Interpreter::new(config);
    let mut root = BlockCtx::root(config.default_detail);
    interp.exec_stmts(&program.body, &mut root)?;
    Ok(root.children)
}

// ─── Block context ────────────────────────────────────────────────────────────

/// Per-block evaluation state: the relative transform cursor advanced by
/// `translate`/`rotate`/`scale`, the inherited material and detail, the
/// owning shape's absolute property record, and collected children.
struct BlockCtx {
    cursor: Transform,
    material: Material,
    detail: u32,
    record: ShapeRecord,
    children: Vec<ResolvedShape>,
    /// Set while evaluating `path { … }` contents: point/curve commands
    /// append here instead of emitting shapes.
    path: Option<PathData>,
    /// True inside a primitive's property block — unrecognized words with
    /// arguments are ignored there (forward-compatible properties).
    in_leaf: bool,
}

impl BlockCtx {
    fn root(detail: u32) -> Self {
        Self {
            cursor: Transform::identity(),
            material: Material::default(),
            detail,
            record: ShapeRecord::default(),
            children: Vec::new(),
            path: None,
            in_leaf: false,
        }
    }

    fn child_of(parent: &BlockCtx) -> Self {
        Self {
            cursor: Transform::identity(),
            material: parent.material.clone(),
            detail: parent.detail,
            record: ShapeRecord::default(),
            children: Vec::new(),
            path: None,
            in_leaf: false,
        }
    }
}

/// Absolute properties collected from a shape's own block.
#[derive(Default)]
struct ShapeRecord {
    position: Option<[f64; 3]>,
    rotation: Option<[f64; 3]>,
    size: Option<[f64; 3]>,
    twist: f64,
    sides: Option<f64>,
    angle: Option<f64>,
    radius: Option<f64>,
    spine: Option<PathData>,
}

impl ShapeRecord {
    fn to_transform(&self) -> Transform {
        let mut t = Transform::identity();
        if let Some(p) = self.position {
            t.position = p;
        }
        if let Some(r) = self.rotation {
            t.rotation = Quat::from_euler(r[0], r[1], r[2]);
        }
        if let Some(s) = self.size {
            t.scale = s;
        }
        t
    }
}

enum NodeSeed {
    Primitive(PrimitiveKind),
    Csg(crate::types::scene::CsgOp),
    Builder(crate::types::scene::BuilderKind),
    Group,
}

// ─── Interpreter ──────────────────────────────────────────────────────────────

pub struct Interpreter<'a> {
    config: &'a EngineConfig,
    scope: Scope,
    iterations: u64,
    depth: u32,
    shape_count: u64,
}

impl<'a> Interpreter<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        let mut scope = Scope::new();
        builtins::install_constants(&mut scope);
        Self { config, scope, iterations: 0, depth: 0, shape_count: 0 }
    }

    fn err(&self, kind: EvalErrorKind, span: &Span, msg: impl Into<String>) -> EvalError {
        EvalError::new(kind, span.line, span.column, msg)
    }

    // ─── Statement execution ──────────────────────────────────────────────────

    fn exec_stmts(&mut self, stmts: &[Stmt], ctx: &mut BlockCtx) -> Result<(), EvalError> {
        for stmt in stmts {
            self.exec_stmt(stmt, ctx)?;
        }
        Ok(())
    }

    /// Statements in a fresh child frame, so `define`s inside the block stay
    /// invisible outside it.
    fn exec_block(&mut self, stmts: &[Stmt], ctx: &mut BlockCtx) -> Result<(), EvalError> {
        self.scope.push();
        let result = self.exec_stmts(stmts, ctx);
        self.scope.pop();
        result
    }

    fn exec_stmt(&mut self, stmt: &Stmt, ctx: &mut BlockCtx) -> Result<(), EvalError> {
        match stmt {
            Stmt::Shape { kind, block, span } => {
                self.exec_node(NodeSeed::Primitive(*kind), block.as_deref(), ctx, span)
            }
            Stmt::Csg { op, body, span } => {
                self.exec_node(NodeSeed::Csg(*op), Some(body), ctx, span)
            }
            Stmt::Builder { kind, body, span } => {
                self.exec_node(NodeSeed::Builder(*kind), Some(body), ctx, span)
            }
            Stmt::Group { body, span } => {
                self.exec_node(NodeSeed::Group, Some(body), ctx, span)
            }

            Stmt::Path { body, span } => {
                let data = self.eval_path_block(body, ctx)?;
                if let Some(path) = ctx.path.as_mut() {
                    path.verbs.extend(data.verbs);
                } else {
                    self.emit_path(data, ctx, span)?;
                }
                Ok(())
            }

            Stmt::PathCmd { kind, args, block, span } => {
                self.exec_path_cmd(*kind, args, block.as_deref(), ctx, span)
            }

            Stmt::Property { name, value, span } => {
                self.apply_property(name, value, ctx, span)
            }

            Stmt::Move { kind, value, span } => {
                if ctx.path.is_some() {
                    return Err(self.err(EvalErrorKind::TypeMismatch, span,
                        "transform commands are not valid inside a path"));
                }
                let v = self.eval_expr(value, ctx)?;
                let step = match kind {
                    MoveKind::Translate => Transform::from_translation(pad_vec3(&v, span)?),
                    MoveKind::Rotate => Transform::from_euler(pad_vec3(&v, span)?),
                    MoveKind::Scale => Transform::from_scale(broadcast_vec3(&v, span)?),
                };
                ctx.cursor = ctx.cursor.compose(&step);
                Ok(())
            }

            Stmt::Along { body, .. } => {
                let data = self.eval_path_block(body, ctx)?;
                ctx.record.spine = Some(data);
                Ok(())
            }

            Stmt::For { var, iterable, body, span } => {
                self.exec_for(var, iterable, body, ctx, span)
            }

            Stmt::If { branches, else_body, span } => {
                for (cond, body) in branches {
                    match self.eval_expr(cond, ctx)? {
                        Value::Bool(true) => return self.exec_block(body, ctx),
                        Value::Bool(false) => {}
                        other => {
                            return Err(self.err(EvalErrorKind::TypeMismatch, span,
                                format!("`if` condition must be a boolean, got {}", other.type_name())));
                        }
                    }
                }
                if let Some(body) = else_body {
                    return self.exec_block(body, ctx);
                }
                Ok(())
            }

            Stmt::Switch { value, cases, else_body, .. } => {
                let subject = self.eval_expr(value, ctx)?;
                for case in cases {
                    for candidate in &case.values {
                        let v = self.eval_expr(candidate, ctx)?;
                        if values_equal(&subject, &v) {
                            return self.exec_block(&case.body, ctx);
                        }
                    }
                }
                // no match and no else executes nothing
                if let Some(body) = else_body {
                    return self.exec_block(body, ctx);
                }
                Ok(())
            }

            Stmt::Define { name, params, value, .. } => {
                let bound = match value {
                    DefineValue::Expr(expr) => self.eval_expr(expr, ctx)?,
                    DefineValue::Body(body) => Value::Closure(Rc::new(Closure {
                        params: params.clone(),
                        body: body.clone(),
                        env: self.scope.clone(),
                    })),
                };
                self.scope.define(name, bound);
                Ok(())
            }

            Stmt::Option { name, default, .. } => {
                // Already bound when the invocation supplied an override.
                if !self.scope.contains_innermost(name) {
                    let v = self.eval_expr(default, ctx)?;
                    self.scope.define(name, v);
                }
                Ok(())
            }

            Stmt::Invoke { name, args, block, span } => {
                self.exec_invoke(name, args, block.as_deref(), ctx, span)
            }
        }
    }

    // ─── Shape nodes ──────────────────────────────────────────────────────────

    fn exec_node(
        &mut self,
        seed: NodeSeed,
        block: Option<&[Stmt]>,
        ctx: &mut BlockCtx,
        span: &Span,
    ) -> Result<(), EvalError> {
        if ctx.path.is_some() {
            return Err(self.err(EvalErrorKind::TypeMismatch, span,
                "solid shapes are not valid inside a path"));
        }

        let mut child = BlockCtx::child_of(ctx);
        child.in_leaf = matches!(seed, NodeSeed::Primitive(_));
        if let Some(body) = block {
            self.exec_block(body, &mut child)?;
        }

        let kind = match seed {
            NodeSeed::Primitive(k) => ShapeKind::Primitive(k),
            NodeSeed::Csg(op) => ShapeKind::Csg(op),
            NodeSeed::Builder(k) => ShapeKind::Builder {
                kind: k,
                opts: BuilderOpts {
                    twist: child.record.twist,
                    spine: child.record.spine.take(),
                },
            },
            NodeSeed::Group => ShapeKind::Group,
        };

        let node = ResolvedShape {
            kind,
            transform: ctx.cursor.compose(&child.record.to_transform()),
            material: child.material.clone(),
            detail: child.detail,
            children: std::mem::take(&mut child.children),
            span: span.clone(),
        };
        self.emit(node, ctx, span)
    }

    fn emit(&mut self, node: ResolvedShape, ctx: &mut BlockCtx, span: &Span) -> Result<(), EvalError> {
        self.shape_count += 1;
        if self.shape_count > self.config.max_total_shapes {
            return Err(self.err(EvalErrorKind::ResourceLimitExceeded, span,
                format!("shape budget exceeded (max {})", self.config.max_total_shapes)));
        }
        ctx.children.push(node);
        Ok(())
    }

    fn emit_path(&mut self, data: PathData, ctx: &mut BlockCtx, span: &Span) -> Result<(), EvalError> {
        let node = ResolvedShape {
            kind: ShapeKind::Path(data),
            transform: ctx.cursor,
            material: ctx.material.clone(),
            detail: ctx.detail,
            children: Vec::new(),
            span: span.clone(),
        };
        self.emit(node, ctx, span)
    }

    // ─── Paths ────────────────────────────────────────────────────────────────

    fn eval_path_block(&mut self, body: &[Stmt], ctx: &BlockCtx) -> Result<PathData, EvalError> {
        let mut child = BlockCtx::child_of(ctx);
        child.path = Some(PathData::default());
        self.exec_block(body, &mut child)?;
        let mut data = child.path.take().unwrap_or_default();
        data.detect_closed();
        Ok(data)
    }

    fn exec_path_cmd(
        &mut self,
        kind: PathCmdKind,
        args: &[Expr],
        block: Option<&[Stmt]>,
        ctx: &mut BlockCtx,
        span: &Span,
    ) -> Result<(), EvalError> {
        match kind {
            PathCmdKind::Point | PathCmdKind::Curve => {
                let p = self.eval_point2(args, ctx, span)?;
                match ctx.path.as_mut() {
                    Some(path) => {
                        match kind {
                            PathCmdKind::Point => path.verbs.push(PathVerb::Point(p)),
                            _ => path.verbs.push(PathVerb::Curve(p)),
                        }
                        Ok(())
                    }
                    None => Err(self.err(EvalErrorKind::TypeMismatch, span,
                        "`point`/`curve` are only valid inside a path")),
                }
            }
            _ => {
                let data = self.eval_named_path_cmd(kind, args, block, ctx, span)?;
                match ctx.path.as_mut() {
                    Some(path) => {
                        if path.verbs.is_empty() {
                            path.closed = data.closed;
                        }
                        path.verbs.extend(data.verbs);
                        Ok(())
                    }
                    None => self.emit_path(data, ctx, span),
                }
            }
        }
    }

    /// Named 2D primitives flatten immediately using the detail in effect.
    fn eval_named_path_cmd(
        &mut self,
        kind: PathCmdKind,
        args: &[Expr],
        block: Option<&[Stmt]>,
        ctx: &BlockCtx,
        span: &Span,
    ) -> Result<PathData, EvalError> {
        let (record, explicit, detail) = if let Some(body) = block {
            let mut child = BlockCtx::child_of(ctx);
            child.path = Some(PathData::default());
            self.exec_block(body, &mut child)?;
            let explicit = child.path.take().unwrap_or_default();
            let detail = child.detail;
            (child.record, explicit, detail)
        } else {
            (ShapeRecord::default(), PathData::default(), ctx.detail)
        };

        let mut data = match kind {
            PathCmdKind::Circle => paths::circle(detail),
            PathCmdKind::Square => paths::square(),
            PathCmdKind::RoundRect => paths::roundrect(record.radius.unwrap_or(0.25), detail),
            PathCmdKind::Arc => paths::arc(record.angle.unwrap_or(std::f64::consts::PI), detail),
            PathCmdKind::Polygon => {
                if explicit.point_count() > 0 {
                    let mut p = explicit;
                    p.closed = true;
                    p
                } else {
                    let sides = record.sides.unwrap_or(5.0).max(3.0).round() as u32;
                    paths::regular_polygon(sides, 0.5)
                }
            }
            PathCmdKind::SvgPath => {
                if args.len() != 1 {
                    return Err(self.err(EvalErrorKind::ArityMismatch, span,
                        "`svgpath` expects one string argument"));
                }
                let d = match self.eval_expr(&args[0], ctx)? {
                    Value::Str(s) => s,
                    other => {
                        return Err(self.err(EvalErrorKind::TypeMismatch, span,
                            format!("`svgpath` expects a string, got {}", other.type_name())));
                    }
                };
                paths::svg_path(&d, detail)
                    .map_err(|msg| self.err(EvalErrorKind::TypeMismatch, span, msg))?
            }
            PathCmdKind::Point | PathCmdKind::Curve => unreachable!("handled by exec_path_cmd"),
        };

        if let Some(size) = record.size {
            for verb in &mut data.verbs {
                let (PathVerb::Point(p) | PathVerb::Curve(p)) = verb;
                p[0] *= size[0];
                p[1] *= size[1];
            }
        }
        Ok(data)
    }

    fn eval_point2(&mut self, args: &[Expr], ctx: &BlockCtx, span: &Span) -> Result<[f64; 2], EvalError> {
        match args.len() {
            1 => match self.eval_expr(&args[0], ctx)? {
                Value::Vector(v) if v.len() == 2 => Ok([v[0], v[1]]),
                other => Err(self.err(EvalErrorKind::ArityMismatch, span,
                    format!("a path point needs two coordinates, got {}", other.type_name()))),
            },
            2 => {
                let x = self.eval_number(&args[0], ctx)?;
                let y = self.eval_number(&args[1], ctx)?;
                Ok([x, y])
            }
            n => Err(self.err(EvalErrorKind::ArityMismatch, span,
                format!("a path point needs two coordinates, got {n} values"))),
        }
    }

    // ─── Properties ───────────────────────────────────────────────────────────

    fn apply_property(
        &mut self,
        name: &str,
        value: &Expr,
        ctx: &mut BlockCtx,
        span: &Span,
    ) -> Result<(), EvalError> {
        let v = self.eval_expr(value, ctx)?;
        match name {
            "position" => ctx.record.position = Some(pad_vec3(&v, span)?),
            "rotation" => ctx.record.rotation = Some(pad_vec3(&v, span)?),
            "size" => ctx.record.size = Some(broadcast_vec3(&v, span)?),
            "color" => match &v {
                Value::Number(n) => ctx.material.color = [*n, *n, *n],
                Value::Vector(c) if c.len() == 3 => ctx.material.color = [c[0], c[1], c[2]],
                Value::Vector(c) if c.len() == 4 => {
                    ctx.material.color = [c[0], c[1], c[2]];
                    ctx.material.opacity = c[3];
                }
                other => {
                    return Err(self.err(EvalErrorKind::ArityMismatch, span,
                        format!("`color` expects 1, 3 or 4 components, got {}", other.type_name())));
                }
            },
            "opacity" => ctx.material.opacity = number_of(&v, span)?,
            "metallic" => ctx.material.metallic = number_of(&v, span)?,
            "roughness" => ctx.material.roughness = number_of(&v, span)?,
            "glow" => ctx.material.glow = number_of(&v, span)?,
            "texture" => match v {
                Value::Str(s) => ctx.material.texture = Some(s),
                other => {
                    return Err(self.err(EvalErrorKind::TypeMismatch, span,
                        format!("`texture` expects a string, got {}", other.type_name())));
                }
            },
            "detail" => {
                let n = number_of(&v, span)?;
                ctx.detail = n.max(1.0).round() as u32;
            }
            "twist" => ctx.record.twist = number_of(&v, span)?,
            "sides" => ctx.record.sides = Some(number_of(&v, span)?),
            "angle" => ctx.record.angle = Some(number_of(&v, span)?),
            "radius" => ctx.record.radius = Some(number_of(&v, span)?),
            // parser only produces the names above
            _ => {}
        }
        Ok(())
    }

    // ─── Control flow ─────────────────────────────────────────────────────────

    fn exec_for(
        &mut self,
        var: &str,
        iterable: &Expr,
        body: &[Stmt],
        ctx: &mut BlockCtx,
        span: &Span,
    ) -> Result<(), EvalError> {
        match self.eval_expr(iterable, ctx)? {
            Value::Range { from, to, step } => {
                if step == 0.0 {
                    return Err(self.err(EvalErrorKind::TypeMismatch, span,
                        "range step must not be zero"));
                }
                let eps = 1e-9;
                let mut v = from;
                loop {
                    let done = if step > 0.0 { v > to + eps } else { v < to - eps };
                    if done {
                        break;
                    }
                    self.run_iteration(var, Value::Number(v), body, ctx, span)?;
                    v += step;
                }
                Ok(())
            }
            Value::Vector(items) => {
                for n in items {
                    self.run_iteration(var, Value::Number(n), body, ctx, span)?;
                }
                Ok(())
            }
            Value::List(items) => {
                for item in items {
                    self.run_iteration(var, item, body, ctx, span)?;
                }
                Ok(())
            }
            Value::Shapes(shapes) => {
                for shape in shapes {
                    self.run_iteration(var, Value::Shapes(vec![shape]), body, ctx, span)?;
                }
                Ok(())
            }
            other => Err(self.err(EvalErrorKind::TypeMismatch, span,
                format!("`for` expects a range or value list, got {}", other.type_name()))),
        }
    }

    /// Fresh child frame per iteration so inner `define`s do not leak across
    /// iterations.
    fn run_iteration(
        &mut self,
        var: &str,
        value: Value,
        body: &[Stmt],
        ctx: &mut BlockCtx,
        span: &Span,
    ) -> Result<(), EvalError> {
        self.iterations += 1;
        if self.iterations > self.config.max_loop_iterations {
            return Err(self.err(EvalErrorKind::ResourceLimitExceeded, span,
                format!("loop budget exceeded (max {} iterations)", self.config.max_loop_iterations)));
        }
        self.scope.push();
        self.scope.define(var, value);
        let result = self.exec_stmts(body, ctx);
        self.scope.pop();
        result
    }

    // ─── Custom-shape invocation ──────────────────────────────────────────────

    fn exec_invoke(
        &mut self,
        name: &str,
        args: &[Expr],
        block: Option<&[Stmt]>,
        ctx: &mut BlockCtx,
        span: &Span,
    ) -> Result<(), EvalError> {
        let resolved = self.scope.lookup(name).cloned();
        match resolved {
            Some(Value::Closure(closure)) => {
                let arg_vals: Vec<Value> = args.iter()
                    .map(|a| self.eval_expr(a, ctx))
                    .collect::<Result<_, _>>()?;

                let option_names = option_names(&closure.body);
                let (overrides, child_stmts) = match block {
                    Some(body) => self.split_invocation_block(body, &option_names, ctx)?,
                    None => (Vec::new(), Vec::new()),
                };

                // children evaluate at the call site, in the caller's scope
                let mut nursery = BlockCtx::child_of(ctx);
                self.exec_block(&child_stmts, &mut nursery)?;
                let children = Value::Shapes(nursery.children);

                let produced =
                    self.invoke_closure(name, &closure, &arg_vals, overrides, children, ctx, span)?;
                if ctx.path.is_some() && !produced.is_empty() {
                    return Err(self.err(EvalErrorKind::TypeMismatch, span,
                        "solid shapes are not valid inside a path"));
                }
                for mut node in produced {
                    node.transform = ctx.cursor.compose(&node.transform);
                    ctx.children.push(node);
                }
                Ok(())
            }

            Some(Value::Shapes(list)) => {
                if ctx.path.is_some() {
                    return Err(self.err(EvalErrorKind::TypeMismatch, span,
                        "solid shapes are not valid inside a path"));
                }
                for mut node in list {
                    node.transform = ctx.cursor.compose(&node.transform);
                    self.emit(node, ctx, span)?;
                }
                Ok(())
            }

            Some(Value::Path(data)) => {
                if let Some(path) = ctx.path.as_mut() {
                    path.verbs.extend(data.verbs);
                    Ok(())
                } else {
                    self.emit_path(data, ctx, span)
                }
            }

            Some(other) => Err(self.err(EvalErrorKind::TypeMismatch, span,
                format!("`{name}` is {}, not a shape", other.type_name()))),

            None => {
                // Unrecognized property names inside a primitive's block are
                // ignored; unrecognized shape words are errors.
                if ctx.in_leaf && !args.is_empty() && block.is_none() {
                    return Ok(());
                }
                Err(self.err(EvalErrorKind::UndefinedSymbol, span,
                    format!("undefined symbol `{name}`")))
            }
        }
    }

    fn split_invocation_block(
        &mut self,
        block: &[Stmt],
        option_names: &[String],
        ctx: &BlockCtx,
    ) -> Result<(Vec<(String, Value)>, Vec<Stmt>), EvalError> {
        let mut overrides = Vec::new();
        let mut rest = Vec::new();
        for stmt in block {
            match stmt {
                Stmt::Invoke { name, args, block: None, span }
                    if option_names.contains(name) && !args.is_empty() =>
                {
                    let v = self.eval_arg_run(args, ctx, span)?;
                    overrides.push((name.clone(), v));
                }
                Stmt::Property { name, value, .. } if option_names.contains(name) => {
                    let v = self.eval_expr(value, ctx)?;
                    overrides.push((name.clone(), v));
                }
                other => rest.push(other.clone()),
            }
        }
        Ok((overrides, rest))
    }

    /// Invocation scope seeding: option defaults (evaluated lazily by the
    /// `option` statements themselves), positional params, named overrides,
    /// and the `children` binding. The closure's own name is rebound so
    /// self-recursion resolves.
    fn invoke_closure(
        &mut self,
        name: &str,
        closure: &Rc<Closure>,
        args: &[Value],
        overrides: Vec<(String, Value)>,
        children: Value,
        ctx: &BlockCtx,
        span: &Span,
    ) -> Result<Vec<ResolvedShape>, EvalError> {
        if self.depth >= self.config.max_recursion_depth {
            return Err(self.err(EvalErrorKind::RecursionLimitExceeded, span,
                format!("recursion limit exceeded (max depth {})", self.config.max_recursion_depth)));
        }
        if args.len() != closure.params.len() {
            return Err(self.err(EvalErrorKind::ArityMismatch, span,
                format!("`{name}` expects {} argument{}, got {}",
                    closure.params.len(),
                    if closure.params.len() == 1 { "" } else { "s" },
                    args.len())));
        }

        self.depth += 1;
        let saved = std::mem::replace(&mut self.scope, closure.env.clone());
        self.scope.push();
        self.scope.define(name, Value::Closure(closure.clone()));
        for (param, value) in closure.params.iter().zip(args) {
            self.scope.define(param, value.clone());
        }
        for (opt, value) in overrides {
            self.scope.define(&opt, value);
        }
        self.scope.define("children", children);

        let mut inner = BlockCtx::child_of(ctx);
        let result = self.exec_stmts(&closure.body, &mut inner);

        self.scope = saved;
        self.depth -= 1;
        result?;
        Ok(inner.children)
    }

    // ─── Expression evaluation ────────────────────────────────────────────────

    fn eval_expr(&mut self, expr: &Expr, ctx: &BlockCtx) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Str(s, _) => Ok(Value::Str(s.clone())),

            Expr::Ident(name, span) => {
                match self.scope.lookup(name).cloned() {
                    // a parameterless definition referenced as a value
                    // evaluates its body into a shape list
                    Some(Value::Closure(c)) if c.params.is_empty() => {
                        let shapes = self.invoke_closure(
                            name, &c, &[], Vec::new(), Value::Shapes(Vec::new()), ctx, span,
                        )?;
                        Ok(Value::Shapes(shapes))
                    }
                    Some(v) => Ok(v),
                    None => Err(self.err(EvalErrorKind::UndefinedSymbol, span,
                        format!("undefined symbol `{name}`"))),
                }
            }

            Expr::Vector(items, span) => {
                let mut comps = Vec::with_capacity(items.len());
                for item in items {
                    match self.eval_expr(item, ctx)? {
                        Value::Number(n) => comps.push(n),
                        Value::Vector(v) => comps.extend(v),
                        other => {
                            return Err(self.err(EvalErrorKind::TypeMismatch, span,
                                format!("vector components must be numbers, got {}", other.type_name())));
                        }
                    }
                }
                Ok(Value::Vector(comps))
            }

            Expr::BinOp { left, op, right, span } => {
                let l = self.eval_expr(left, ctx)?;
                let r = self.eval_expr(right, ctx)?;
                eval_binop(*op, l, r, span)
            }

            Expr::UnOp { op, operand, span } => {
                let v = self.eval_expr(operand, ctx)?;
                match op {
                    UnOp::Neg => match v {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        Value::Vector(items) => Ok(Value::Vector(items.into_iter().map(|n| -n).collect())),
                        other => Err(self.err(EvalErrorKind::TypeMismatch, span,
                            format!("unary `-` requires a number or vector, got {}", other.type_name()))),
                    },
                    UnOp::Not => match v {
                        Value::Bool(b) => Ok(Value::Bool(!b)),
                        other => Err(self.err(EvalErrorKind::TypeMismatch, span,
                            format!("`not` requires a boolean, got {}", other.type_name()))),
                    },
                }
            }

            Expr::Range { from, to, step, .. } => {
                let from = self.eval_number(from, ctx)?;
                let to = self.eval_number(to, ctx)?;
                let step = match step {
                    Some(e) => self.eval_number(e, ctx)?,
                    None => 1.0,
                };
                Ok(Value::Range { from, to, step })
            }

            Expr::Member { expr, field, span } => {
                let obj = self.eval_expr(expr, ctx)?;
                self.eval_member(obj, field, span)
            }

            Expr::Index { expr, index, span } => {
                let obj = self.eval_expr(expr, ctx)?;
                let idx = self.eval_number(index, ctx)?;
                self.eval_index(obj, idx, span)
            }

            Expr::Call { callee, args, span } => {
                let arg_vals: Vec<Value> = args.iter()
                    .map(|a| self.eval_expr(a, ctx))
                    .collect::<Result<_, _>>()?;

                if let Some(result) = builtins::call(callee, &arg_vals, span) {
                    return result;
                }

                match self.scope.lookup(callee).cloned() {
                    Some(Value::Closure(c)) => {
                        let shapes = self.invoke_closure(
                            callee, &c, &arg_vals, Vec::new(), Value::Shapes(Vec::new()), ctx, span,
                        )?;
                        Ok(Value::Shapes(shapes))
                    }
                    Some(other) => Err(self.err(EvalErrorKind::TypeMismatch, span,
                        format!("`{callee}` is {}, not a function", other.type_name()))),
                    None => Err(self.err(EvalErrorKind::UndefinedFunction, span,
                        format!("undefined function `{callee}`"))),
                }
            }
        }
    }

    fn eval_number(&mut self, expr: &Expr, ctx: &BlockCtx) -> Result<f64, EvalError> {
        match self.eval_expr(expr, ctx)? {
            Value::Number(n) => Ok(n),
            other => Err(self.err(EvalErrorKind::TypeMismatch, expr.span(),
                format!("expected a number, got {}", other.type_name()))),
        }
    }

    fn eval_arg_run(&mut self, args: &[Expr], ctx: &BlockCtx, span: &Span) -> Result<Value, EvalError> {
        if args.len() == 1 {
            return self.eval_expr(&args[0], ctx);
        }
        let mut comps = Vec::with_capacity(args.len());
        for arg in args {
            match self.eval_expr(arg, ctx)? {
                Value::Number(n) => comps.push(n),
                Value::Vector(v) => comps.extend(v),
                other => {
                    return Err(self.err(EvalErrorKind::TypeMismatch, span,
                        format!("vector components must be numbers, got {}", other.type_name())));
                }
            }
        }
        Ok(Value::Vector(comps))
    }

    fn eval_member(&self, obj: Value, field: &str, span: &Span) -> Result<Value, EvalError> {
        let oor = |what: &str| EvalError::new(EvalErrorKind::IndexOutOfRange, span.line, span.column,
            format!("{what} is empty"));
        match (&obj, field) {
            (Value::Vector(v), "x") if !v.is_empty() => Ok(Value::Number(v[0])),
            (Value::Vector(v), "y") if v.len() > 1 => Ok(Value::Number(v[1])),
            (Value::Vector(v), "z") if v.len() > 2 => Ok(Value::Number(v[2])),
            (Value::Vector(v), "x" | "y" | "z") => {
                Err(EvalError::new(EvalErrorKind::IndexOutOfRange, span.line, span.column,
                    format!("vector has only {} component{}", v.len(), if v.len() == 1 { "" } else { "s" })))
            }
            (Value::Vector(v), "first") => v.first().map(|n| Value::Number(*n)).ok_or_else(|| oor("vector")),
            (Value::Vector(v), "last") => v.last().map(|n| Value::Number(*n)).ok_or_else(|| oor("vector")),
            (Value::Vector(v), "count") => Ok(Value::Number(v.len() as f64)),

            (Value::Path(p), "first") => {
                p.first_point().map(|q| Value::Vector(vec![q[0], q[1]])).ok_or_else(|| oor("path"))
            }
            (Value::Path(p), "last") => {
                p.last_point().map(|q| Value::Vector(vec![q[0], q[1]])).ok_or_else(|| oor("path"))
            }
            (Value::Path(p), "count") => Ok(Value::Number(p.point_count() as f64)),

            (Value::Shapes(s), "first") => {
                s.first().map(|n| Value::Shapes(vec![n.clone()])).ok_or_else(|| oor("shape list"))
            }
            (Value::Shapes(s), "last") => {
                s.last().map(|n| Value::Shapes(vec![n.clone()])).ok_or_else(|| oor("shape list"))
            }
            (Value::Shapes(s), "count") => Ok(Value::Number(s.len() as f64)),

            (Value::List(items), "first") => items.first().cloned().ok_or_else(|| oor("list")),
            (Value::List(items), "last") => items.last().cloned().ok_or_else(|| oor("list")),
            (Value::List(items), "count") => Ok(Value::Number(items.len() as f64)),

            (Value::Str(s), "count") => Ok(Value::Number(s.chars().count() as f64)),

            _ => Err(EvalError::new(EvalErrorKind::TypeMismatch, span.line, span.column,
                format!("{} has no member `{field}`", obj.type_name()))),
        }
    }

    /// Negative indices count from the end.
    fn eval_index(&self, obj: Value, idx: f64, span: &Span) -> Result<Value, EvalError> {
        let resolve = |len: usize| -> Result<usize, EvalError> {
            let raw = idx.trunc() as i64;
            let i = if raw < 0 { raw + len as i64 } else { raw };
            if i < 0 || i as usize >= len {
                Err(EvalError::new(EvalErrorKind::IndexOutOfRange, span.line, span.column,
                    format!("index {raw} out of range for length {len}")))
            } else {
                Ok(i as usize)
            }
        };
        match obj {
            Value::Vector(v) => {
                let i = resolve(v.len())?;
                Ok(Value::Number(v[i]))
            }
            Value::List(items) => {
                let i = resolve(items.len())?;
                Ok(items[i].clone())
            }
            Value::Shapes(shapes) => {
                let i = resolve(shapes.len())?;
                Ok(Value::Shapes(vec![shapes[i].clone()]))
            }
            Value::Path(p) => {
                let pts: Vec<[f64; 2]> = p.points().collect();
                let i = resolve(pts.len())?;
                Ok(Value::Vector(vec![pts[i][0], pts[i][1]]))
            }
            other => Err(EvalError::new(EvalErrorKind::TypeMismatch, span.line, span.column,
                format!("cannot index {}", other.type_name()))),
        }
    }
}

// ─── Option scanning ─────────────────────────────────────────────────────────

fn option_names(body: &[Stmt]) -> Vec<String> {
    body.iter()
        .filter_map(|stmt| match stmt {
            Stmt::Option { name, .. } => Some(name.clone()),
            _ => None,
        })
        .collect()
}

// ─── Operators ───────────────────────────────────────────────────────────────

fn eval_binop(op: BinOp, l: Value, r: Value, span: &Span) -> Result<Value, EvalError> {
    use BinOp::*;
    match op {
        Eq => Ok(Value::Bool(values_equal(&l, &r))),
        NotEq => Ok(Value::Bool(!values_equal(&l, &r))),

        And | Or => match (l, r) {
            (Value::Bool(a), Value::Bool(b)) => {
                Ok(Value::Bool(if op == And { a && b } else { a || b }))
            }
            (l, r) => Err(binop_type_error(op, &l, &r, span)),
        },

        Lt | LtEq | Gt | GtEq => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(match op {
                Lt => a < b,
                LtEq => a <= b,
                Gt => a > b,
                _ => a >= b,
            })),
            (l, r) => Err(binop_type_error(op, &l, &r, span)),
        },

        Add | Sub | Mul | Div | Mod => match (l, r) {
            (Value::Number(a), Value::Number(b)) => {
                Ok(Value::Number(apply_arith(op, a, b, span)?))
            }
            (Value::Vector(a), Value::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(EvalError::new(EvalErrorKind::ArityMismatch, span.line, span.column,
                        format!("vector arity mismatch: {} vs {}", a.len(), b.len())));
                }
                let comps: Result<Vec<f64>, EvalError> = a.iter().zip(&b)
                    .map(|(x, y)| apply_arith(op, *x, *y, span))
                    .collect();
                Ok(Value::Vector(comps?))
            }
            // a scalar broadcasts across all components
            (Value::Number(s), Value::Vector(v)) => {
                let comps: Result<Vec<f64>, EvalError> =
                    v.iter().map(|x| apply_arith(op, s, *x, span)).collect();
                Ok(Value::Vector(comps?))
            }
            (Value::Vector(v), Value::Number(s)) => {
                let comps: Result<Vec<f64>, EvalError> =
                    v.iter().map(|x| apply_arith(op, *x, s, span)).collect();
                Ok(Value::Vector(comps?))
            }
            (l, r) => Err(binop_type_error(op, &l, &r, span)),
        },
    }
}

fn apply_arith(op: BinOp, a: f64, b: f64, span: &Span) -> Result<f64, EvalError> {
    match op {
        BinOp::Add => Ok(a + b),
        BinOp::Sub => Ok(a - b),
        BinOp::Mul => Ok(a * b),
        BinOp::Div => {
            if b == 0.0 {
                Err(EvalError::new(EvalErrorKind::DivisionByZero, span.line, span.column,
                    "division by zero"))
            } else {
                Ok(a / b)
            }
        }
        BinOp::Mod => {
            if b == 0.0 {
                Err(EvalError::new(EvalErrorKind::DivisionByZero, span.line, span.column,
                    "modulo by zero"))
            } else {
                Ok(a % b)
            }
        }
        _ => unreachable!("not an arithmetic operator"),
    }
}

fn binop_type_error(op: BinOp, l: &Value, r: &Value, span: &Span) -> EvalError {
    EvalError::new(EvalErrorKind::TypeMismatch, span.line, span.column,
        format!("operator `{}` not supported for {} and {}", op.as_str(), l.type_name(), r.type_name()))
}

// ─── Value → vector conversions ──────────────────────────────────────────────

/// Positions and rotations pad missing components with zero: `position 2`
/// is `(2 0 0)`.
fn pad_vec3(v: &Value, span: &Span) -> Result<[f64; 3], EvalError> {
    match v {
        Value::Number(n) => Ok([*n, 0.0, 0.0]),
        Value::Vector(c) if c.len() == 2 => Ok([c[0], c[1], 0.0]),
        Value::Vector(c) if c.len() == 3 => Ok([c[0], c[1], c[2]]),
        other => Err(EvalError::new(EvalErrorKind::ArityMismatch, span.line, span.column,
            format!("expected 1 to 3 components, got {}", other.type_name()))),
    }
}

/// Sizes and scales broadcast a lone scalar across all axes: `size 2` is
/// `(2 2 2)`.
fn broadcast_vec3(v: &Value, span: &Span) -> Result<[f64; 3], EvalError> {
    match v {
        Value::Number(n) => Ok([*n, *n, *n]),
        Value::Vector(c) if c.len() == 2 => Ok([c[0], c[1], 1.0]),
        Value::Vector(c) if c.len() == 3 => Ok([c[0], c[1], c[2]]),
        other => Err(EvalError::new(EvalErrorKind::ArityMismatch, span.line, span.column,
            format!("expected 1 to 3 components, got {}", other.type_name()))),
    }
}

fn number_of(v: &Value, span: &Span) -> Result<f64, EvalError> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(EvalError::new(EvalErrorKind::TypeMismatch, span.line, span.column,
            format!("expected a number, got {}", other.type_name()))),
    }
}
