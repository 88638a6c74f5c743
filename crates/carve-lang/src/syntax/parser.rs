use crate::error::{Error, ErrorCode};
use crate::syntax::ast::*;
use crate::syntax::token::{Token, TokenKind};
use crate::types::scene::{BuilderKind, CsgOp, PrimitiveKind};

/// Classification of identifiers that start statements. These words also
/// terminate space-separated operand runs: `position 2 0 0 size 1` stops
/// collecting at `size` because `size` is a known statement word.
enum Word {
    Primitive(PrimitiveKind),
    Csg(CsgOp),
    Builder(BuilderKind),
    Group,
    Path,
    PathCmd(PathCmdKind),
    Move(MoveKind),
    Property,
    Along,
}

fn statement_word(s: &str) -> Option<Word> {
    if let Some(k) = PrimitiveKind::from_word(s) {
        return Some(Word::Primitive(k));
    }
    if let Some(op) = CsgOp::from_word(s) {
        return Some(Word::Csg(op));
    }
    if let Some(k) = BuilderKind::from_word(s) {
        return Some(Word::Builder(k));
    }
    if let Some(k) = PathCmdKind::from_word(s) {
        return Some(Word::PathCmd(k));
    }
    match s {
        "group" => Some(Word::Group),
        "path"  => Some(Word::Path),
        "along" => Some(Word::Along),
        "translate" => Some(Word::Move(MoveKind::Translate)),
        "rotate"    => Some(Word::Move(MoveKind::Rotate)),
        "scale"     => Some(Word::Move(MoveKind::Scale)),
        "position" | "rotation" | "size"
        | "color" | "opacity" | "metallic" | "roughness" | "glow" | "texture"
        | "detail" | "twist" | "sides" | "radius" | "angle" => Some(Word::Property),
        _ => None,
    }
}

// ─── Parser ──────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a whole program. Fail-fast: the first error aborts and no
    /// partial AST is returned.
    pub fn parse(mut self) -> Result<Program, Error> {
        let body = self.parse_stmts_until(|k| matches!(k, TokenKind::Eof))?;
        Ok(Program { body })
    }

    // ─── Blocks ──────────────────────────────────────────────────────────────

    /// Entry point that consumes the braces itself.
    fn parse_block(&mut self) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_block_contents()?;
        self.expect(TokenKind::RBrace)?;
        Ok(stmts)
    }

    /// Entry point for callers that have already consumed the opening brace.
    /// Stops before the closing brace, which the caller consumes.
    fn parse_block_contents(&mut self) -> Result<Vec<Stmt>, Error> {
        self.parse_stmts_until(|k| matches!(k, TokenKind::RBrace | TokenKind::Eof))
    }

    fn parse_stmts_until(&mut self, stop: impl Fn(&TokenKind) -> bool) -> Result<Vec<Stmt>, Error> {
        let mut stmts = Vec::new();
        loop {
            self.skip_newlines();
            if stop(&self.peek().kind) {
                break;
            }
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        match self.peek().kind.clone() {
            TokenKind::Define => self.parse_define(),
            TokenKind::Option => self.parse_option(),
            TokenKind::For    => self.parse_for(),
            TokenKind::If     => self.parse_if(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Ident(name) => self.parse_word_stmt(&name),
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_word_stmt(&mut self, name: &str) -> Result<Stmt, Error> {
        let span = self.span();
        match statement_word(name) {
            Some(Word::Primitive(kind)) => {
                self.advance();
                let block = self.maybe_block()?;
                Ok(Stmt::Shape { kind, block, span })
            }
            Some(Word::Csg(op)) => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_block_contents()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Stmt::Csg { op, body, span })
            }
            Some(Word::Builder(kind)) => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_block_contents()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Stmt::Builder { kind, body, span })
            }
            Some(Word::Group) => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_block_contents()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Stmt::Group { body, span })
            }
            Some(Word::Path) => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_block_contents()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Stmt::Path { body, span })
            }
            Some(Word::Along) => {
                self.advance();
                self.expect(TokenKind::LBrace)?;
                let body = self.parse_block_contents()?;
                self.expect(TokenKind::RBrace)?;
                Ok(Stmt::Along { body, span })
            }
            Some(Word::PathCmd(kind)) => {
                self.advance();
                let args = self.parse_operands()?;
                let block = self.maybe_block()?;
                Ok(Stmt::PathCmd { kind, args, block, span })
            }
            Some(Word::Move(kind)) => {
                self.advance();
                let value = self.parse_value_run("a transform amount")?;
                Ok(Stmt::Move { kind, value, span })
            }
            Some(Word::Property) => {
                let name = name.to_string();
                self.advance();
                let value = self.parse_value_run("a property value")?;
                Ok(Stmt::Property { name, value, span })
            }
            None => {
                let name = name.to_string();
                self.advance();
                let args = self.parse_operands()?;
                let block = self.maybe_block()?;
                Ok(Stmt::Invoke { name, args, block, span })
            }
        }
    }

    fn maybe_block(&mut self) -> Result<Option<Vec<Stmt>>, Error> {
        if self.check(TokenKind::LBrace) {
            Ok(Some(self.parse_block()?))
        } else {
            Ok(None)
        }
    }

    fn parse_define(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Define)?;
        let name_tok = self.peek().clone();
        let name = self.expect_ident()?;

        // `define f(a b)` declares parameters; `define v (1 2)` binds a
        // parenthesized value. The paren must be attached to the name to
        // count as a parameter list.
        let mut params = Vec::new();
        if self.call_paren_attached(&name_tok, &name) {
            self.advance();
            while !self.check(TokenKind::RParen) && !self.is_at_end() {
                params.push(self.expect_ident()?);
            }
            self.expect(TokenKind::RParen)?;
        }

        let value = if self.check(TokenKind::LBrace) {
            DefineValue::Body(self.parse_block()?)
        } else {
            if !params.is_empty() {
                return Err(self.unexpected("a `{` body after parameter list"));
            }
            DefineValue::Expr(self.parse_value_run("a value after `define`")?)
        };
        Ok(Stmt::Define { name, params, value, span })
    }

    fn parse_option(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Option)?;
        let name = self.expect_ident()?;
        let default = self.parse_value_run("a default value after `option`")?;
        Ok(Stmt::Option { name, default, span })
    }

    fn parse_for(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::For)?;
        let var = self.expect_ident()?;
        self.expect(TokenKind::In)?;
        let mut iterable = self.parse_value_run("a range or value list after `in`")?;

        // `step` is normally consumed by the range expression itself; reaching
        // it here means the iterable was not a range.
        if self.check(TokenKind::Step) {
            let step_span = self.span();
            self.advance();
            let step = self.parse_expr()?;
            match iterable {
                Expr::Range { from, to, step: None, span: rspan } => {
                    iterable = Expr::Range { from, to, step: Some(Box::new(step)), span: rspan };
                }
                _ => {
                    return Err(Error::new(ErrorCode::P001, step_span.line, step_span.column,
                        "`step` only applies to ranges"));
                }
            }
        }

        let body = self.parse_block()?;
        Ok(Stmt::For { var, iterable, body, span })
    }

    fn parse_if(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        let mut branches = vec![(cond, body)];
        let mut else_body = None;

        loop {
            self.skip_newlines();
            if !self.matches(TokenKind::Else) {
                break;
            }
            if self.matches(TokenKind::If) {
                let cond = self.parse_expr()?;
                let body = self.parse_block()?;
                branches.push((cond, body));
            } else {
                else_body = Some(self.parse_block()?);
                break;
            }
        }
        Ok(Stmt::If { branches, else_body, span })
    }

    fn parse_switch(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Switch)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::LBrace)?;

        let mut cases = Vec::new();
        let mut else_body = None;
        loop {
            self.skip_newlines();
            match self.peek().kind {
                TokenKind::Case => {
                    let case_span = self.span();
                    self.advance();
                    let values = self.parse_operands()?;
                    if values.is_empty() {
                        return Err(self.unexpected("a value after `case`"));
                    }
                    let body = self.parse_stmts_until(|k| matches!(
                        k,
                        TokenKind::Case | TokenKind::Else | TokenKind::RBrace | TokenKind::Eof
                    ))?;
                    cases.push(SwitchCase { values, body, span: case_span });
                }
                TokenKind::Else => {
                    self.advance();
                    else_body = Some(self.parse_stmts_until(|k| matches!(
                        k,
                        TokenKind::RBrace | TokenKind::Eof
                    ))?);
                }
                _ => break,
            }
        }

        self.expect(TokenKind::RBrace)?;
        Ok(Stmt::Switch { value, cases, else_body, span })
    }

    // ─── Operand runs ────────────────────────────────────────────────────────

    /// Collect a run of space-separated expressions. The run stops at the
    /// first token that cannot begin a primary expression (newline, brace,
    /// keyword, EOF) and at identifiers that are known statement words —
    /// those start the next statement, not another operand.
    fn parse_operands(&mut self) -> Result<Vec<Expr>, Error> {
        let mut items = Vec::new();
        while self.begins_operand() {
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }

    fn begins_operand(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Ident(name) => statement_word(name).is_none(),
            k => k.begins_primary(),
        }
    }

    /// An operand run reduced to a single expression: one operand is itself,
    /// several become a vector literal, none is an error.
    fn parse_value_run(&mut self, expected: &str) -> Result<Expr, Error> {
        let span = self.span();
        let mut items = self.parse_operands()?;
        if items.is_empty() {
            return Err(Error::new(ErrorCode::P002, span.line, span.column,
                format!("expected {expected}")));
        }
        if items.len() == 1 {
            return Ok(items.remove(0));
        }
        Ok(Expr::Vector(items, span))
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_range()
    }

    fn parse_range(&mut self) -> Result<Expr, Error> {
        let from = self.parse_or()?;
        if self.matches(TokenKind::To) {
            let span = from.span().clone();
            let to = self.parse_or()?;
            let step = if self.matches(TokenKind::Step) {
                Some(Box::new(self.parse_or()?))
            } else {
                None
            };
            return Ok(Expr::Range { from: Box::new(from), to: Box::new(to), step, span });
        }
        Ok(from)
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.check(TokenKind::Or) {
            let span = left.span().clone();
            self.advance();
            let right = self.parse_and()?;
            left = Expr::BinOp { left: Box::new(left), op: BinOp::Or, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.check(TokenKind::And) {
            let span = left.span().clone();
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::BinOp { left: Box::new(left), op: BinOp::And, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq    => BinOp::Eq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            let span = left.span().clone();
            self.advance();
            let right = self.parse_comparison()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_addition()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            let span = left.span().clone();
            self.advance();
            let right = self.parse_addition()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let span = left.span().clone();
            self.advance();
            let right = self.parse_multiplication()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star    => BinOp::Mul,
                TokenKind::Slash   => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            let span = left.span().clone();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::BinOp { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::MinusPrefix) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnOp { op: UnOp::Neg, operand: Box::new(operand), span });
        }
        if self.matches(TokenKind::Plus) {
            return self.parse_unary();
        }
        if self.matches(TokenKind::Not) {
            let operand = self.parse_unary()?;
            return Ok(Expr::UnOp { op: UnOp::Not, operand: Box::new(operand), span });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek().kind {
                TokenKind::Dot => {
                    let span = expr.span().clone();
                    self.advance();
                    let field = self.expect_ident()?;
                    expr = Expr::Member { expr: Box::new(expr), field, span };
                }
                TokenKind::LBracket => {
                    let span = expr.span().clone();
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index { expr: Box::new(expr), index: Box::new(index), span };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind.clone() {
            TokenKind::Number(v) => { self.advance(); Ok(Expr::Number(v, span)) }
            TokenKind::Bool(v)   => { self.advance(); Ok(Expr::Bool(v, span)) }
            TokenKind::StringLit(s) => { self.advance(); Ok(Expr::Str(s, span)) }

            TokenKind::Ident(name) => {
                self.advance();
                if self.call_paren_attached(&tok, &name) {
                    self.advance(); // (
                    let args = self.parse_group_operands()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr::Call { callee: name, args, span })
                } else {
                    Ok(Expr::Ident(name, span))
                }
            }

            // grouping or vector literal
            TokenKind::LParen => {
                self.advance();
                let mut items = self.parse_group_operands()?;
                self.expect(TokenKind::RParen)?;
                if items.is_empty() {
                    return Err(Error::new(ErrorCode::P001, span.line, span.column,
                        "expected an expression inside `()`"));
                }
                if items.len() == 1 {
                    return Ok(items.remove(0));
                }
                Ok(Expr::Vector(items, span))
            }

            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `f(x)` is a call only when the paren is attached to the name;
    /// `f (x)` is an identifier followed by a separate parenthesized operand.
    fn call_paren_attached(&self, ident: &Token, name: &str) -> bool {
        let next = self.peek();
        next.kind == TokenKind::LParen
            && next.line == ident.line
            && next.column == ident.column + name.len()
    }

    /// Operands inside parentheses. Newlines are insignificant here, and
    /// statement words are plain identifiers again — there is no statement
    /// boundary to guard inside a grouping.
    fn parse_group_operands(&mut self) -> Result<Vec<Expr>, Error> {
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(TokenKind::RParen) || self.is_at_end() {
                break;
            }
            items.push(self.parse_expr()?);
        }
        Ok(items)
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {:?}, found {:?}", kind, tok.kind),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(s) => Ok(s),
            _ => Err(Error::new(ErrorCode::P002, tok.line, tok.column,
                format!("expected an identifier, found {:?}", tok.kind))),
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(TokenKind::Newline) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {:?}", expected, tok.kind),
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::Lexer;

    fn parse(src: &str) -> Program {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    fn parse_err(src: &str) -> Error {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        Parser::new(tokens).parse().expect_err("expected parse error")
    }

    fn parse_expr_src(src: &str) -> Expr {
        let tokens = Lexer::new(src).tokenize().expect("lex failed");
        let mut p = Parser::new(tokens);
        p.parse_expr().expect("parse_expr failed")
    }

    // ── shape statements ─────────────────────────────────────────────────────

    #[test]
    fn bare_primitive() {
        let p = parse("cube");
        assert!(matches!(p.body[0], Stmt::Shape { kind: PrimitiveKind::Cube, block: None, .. }));
    }

    #[test]
    fn primitive_with_block() {
        let p = parse("cube { size 1 }");
        match &p.body[0] {
            Stmt::Shape { kind: PrimitiveKind::Cube, block: Some(b), .. } => {
                assert_eq!(b.len(), 1);
                assert!(matches!(&b[0], Stmt::Property { name, .. } if name == "size"));
            }
            other => panic!("expected cube with block, got {other:?}"),
        }
    }

    #[test]
    fn two_shapes_on_one_line() {
        // `size 1` must stop collecting before the closing brace, and the
        // second statement must start cleanly after it
        let p = parse("cube { size 1 } sphere { position 2 0 0 size 1 }");
        assert_eq!(p.body.len(), 2);
        match &p.body[1] {
            Stmt::Shape { kind: PrimitiveKind::Sphere, block: Some(b), .. } => {
                assert_eq!(b.len(), 2);
                match &b[0] {
                    Stmt::Property { name, value: Expr::Vector(items, _), .. } => {
                        assert_eq!(name, "position");
                        assert_eq!(items.len(), 3);
                    }
                    other => panic!("expected position vector, got {other:?}"),
                }
                assert!(matches!(&b[1], Stmt::Property { name, .. } if name == "size"));
            }
            other => panic!("expected sphere, got {other:?}"),
        }
    }

    #[test]
    fn property_run_stops_at_next_property_name() {
        let p = parse("sphere { position 2 0 0 size 1 }");
        match &p.body[0] {
            Stmt::Shape { block: Some(b), .. } => assert_eq!(b.len(), 2),
            other => panic!("expected shape, got {other:?}"),
        }
    }

    #[test]
    fn property_run_stops_at_newline() {
        let p = parse("cube {\n size 1\n color 1 0 0\n }");
        match &p.body[0] {
            Stmt::Shape { block: Some(b), .. } => assert_eq!(b.len(), 2),
            other => panic!("expected shape, got {other:?}"),
        }
    }

    // ── vector collection boundary ───────────────────────────────────────────

    #[test]
    fn spaced_tight_minus_makes_vector() {
        // `5 -1` is a 2-vector
        let p = parse("define v 5 -1");
        match &p.body[0] {
            Stmt::Define { value: DefineValue::Expr(Expr::Vector(items, _)), .. } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[0], Expr::Number(n, _) if n == 5.0));
                assert!(matches!(&items[1], Expr::UnOp { op: UnOp::Neg, .. }));
            }
            other => panic!("expected vector define, got {other:?}"),
        }
    }

    #[test]
    fn fully_spaced_minus_makes_subtraction() {
        // `5 - 1` is a scalar expression
        let p = parse("define v 5 - 1");
        match &p.body[0] {
            Stmt::Define { value: DefineValue::Expr(Expr::BinOp { op: BinOp::Sub, .. }), .. } => {}
            other => panic!("expected subtraction define, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_inside_run() {
        // `1 + 2` collapses to one operand; `3` is a second one
        let p = parse("define v 1 + 2 3");
        match &p.body[0] {
            Stmt::Define { value: DefineValue::Expr(Expr::Vector(items, _)), .. } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[0], Expr::BinOp { op: BinOp::Add, .. }));
            }
            other => panic!("expected vector define, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_vector_literal() {
        let p = parse("define v (1 2 3)");
        match &p.body[0] {
            Stmt::Define { value: DefineValue::Expr(Expr::Vector(items, _)), .. } => {
                assert_eq!(items.len(), 3);
            }
            other => panic!("expected vector define, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_single_expr_is_grouping() {
        let p = parse("define v (1 + 2)");
        assert!(matches!(
            &p.body[0],
            Stmt::Define { value: DefineValue::Expr(Expr::BinOp { .. }), .. }
        ));
    }

    // ── define / option ──────────────────────────────────────────────────────

    #[test]
    fn define_constant() {
        let p = parse("define radius 0.5");
        match &p.body[0] {
            Stmt::Define { name, params, value: DefineValue::Expr(_), .. } => {
                assert_eq!(name, "radius");
                assert!(params.is_empty());
            }
            other => panic!("expected define, got {other:?}"),
        }
    }

    #[test]
    fn define_custom_shape_with_params() {
        let p = parse("define triangle(a b c) { path { point a point b point c } }");
        match &p.body[0] {
            Stmt::Define { name, params, value: DefineValue::Body(body), .. } => {
                assert_eq!(name, "triangle");
                assert_eq!(params, &["a", "b", "c"]);
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected define body, got {other:?}"),
        }
    }

    #[test]
    fn define_body_with_option() {
        let p = parse("define wheel { option spokes 5\n cylinder }");
        match &p.body[0] {
            Stmt::Define { value: DefineValue::Body(body), .. } => {
                assert!(matches!(&body[0], Stmt::Option { name, .. } if name == "spokes"));
                assert!(matches!(&body[1], Stmt::Shape { kind: PrimitiveKind::Cylinder, .. }));
            }
            other => panic!("expected define body, got {other:?}"),
        }
    }

    #[test]
    fn define_params_without_body_is_error() {
        parse_err("define f(a b) 5");
    }

    // ── custom invocation ────────────────────────────────────────────────────

    #[test]
    fn invoke_with_positional_args() {
        let p = parse("triangle p1 p2 p3");
        match &p.body[0] {
            Stmt::Invoke { name, args, block: None, .. } => {
                assert_eq!(name, "triangle");
                assert_eq!(args.len(), 3);
                assert!(matches!(&args[0], Expr::Ident(n, _) if n == "p1"));
            }
            other => panic!("expected invoke, got {other:?}"),
        }
    }

    #[test]
    fn invoke_with_block() {
        let p = parse("wheel { spokes 7 }");
        match &p.body[0] {
            Stmt::Invoke { name, args, block: Some(b), .. } => {
                assert_eq!(name, "wheel");
                assert!(args.is_empty());
                assert_eq!(b.len(), 1);
            }
            other => panic!("expected invoke with block, got {other:?}"),
        }
    }

    // ── control flow ─────────────────────────────────────────────────────────

    #[test]
    fn for_over_range() {
        let p = parse("for i in 1 to 5 { cube }");
        match &p.body[0] {
            Stmt::For { var, iterable: Expr::Range { step: None, .. }, body, .. } => {
                assert_eq!(var, "i");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for, got {other:?}"),
        }
    }

    #[test]
    fn for_over_range_with_step() {
        let p = parse("for i in 5 to 1 step -1 { cube }");
        match &p.body[0] {
            Stmt::For { iterable: Expr::Range { step: Some(s), .. }, .. } => {
                assert!(matches!(**s, Expr::UnOp { op: UnOp::Neg, .. }));
            }
            other => panic!("expected stepped for, got {other:?}"),
        }
    }

    #[test]
    fn for_over_values() {
        let p = parse("for x in (1 2 3) { cube }");
        assert!(matches!(&p.body[0], Stmt::For { iterable: Expr::Vector(..), .. }));
    }

    #[test]
    fn step_outside_range_is_error() {
        parse_err("for x in points step 2 { cube }");
    }

    #[test]
    fn if_else_chain() {
        let p = parse("if a > 1 { cube } else if a > 0 { sphere } else { cone }");
        match &p.body[0] {
            Stmt::If { branches, else_body: Some(e), .. } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(e.len(), 1);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn else_on_next_line() {
        let p = parse("if a > 1 {\n cube\n}\nelse {\n sphere\n}");
        assert!(matches!(&p.body[0], Stmt::If { else_body: Some(_), .. }));
    }

    #[test]
    fn switch_with_cases_and_else() {
        let p = parse("switch n {\n case 1 2\n cube\n case 3\n sphere\n else\n cone\n}");
        match &p.body[0] {
            Stmt::Switch { cases, else_body: Some(e), .. } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].values.len(), 2);
                assert_eq!(cases[0].body.len(), 1);
                assert_eq!(e.len(), 1);
            }
            other => panic!("expected switch, got {other:?}"),
        }
    }

    // ── csg / builder / path statements ──────────────────────────────────────

    #[test]
    fn csg_block() {
        let p = parse("difference { cube sphere }");
        match &p.body[0] {
            Stmt::Csg { op: CsgOp::Difference, body, .. } => assert_eq!(body.len(), 2),
            other => panic!("expected csg, got {other:?}"),
        }
    }

    #[test]
    fn nested_csg_blocks() {
        // inner block must not try to re-consume a brace its caller already ate
        let p = parse("union { difference { cube sphere } cylinder }");
        match &p.body[0] {
            Stmt::Csg { op: CsgOp::Union, body, .. } => {
                assert_eq!(body.len(), 2);
                assert!(matches!(&body[0], Stmt::Csg { op: CsgOp::Difference, .. }));
            }
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn extrude_with_along_and_twist() {
        let p = parse("extrude { circle twist pi along { path { point 0 0 point 1 1 } } }");
        match &p.body[0] {
            Stmt::Builder { kind: BuilderKind::Extrude, body, .. } => {
                assert!(matches!(&body[0], Stmt::PathCmd { kind: PathCmdKind::Circle, .. }));
                assert!(matches!(&body[1], Stmt::Property { name, .. } if name == "twist"));
                assert!(matches!(&body[2], Stmt::Along { .. }));
            }
            other => panic!("expected extrude, got {other:?}"),
        }
    }

    #[test]
    fn path_with_points_and_curves() {
        let p = parse("path { point 0 0\n curve 1 0\n point 1 1 }");
        match &p.body[0] {
            Stmt::Path { body, .. } => {
                assert_eq!(body.len(), 3);
                assert!(matches!(&body[1], Stmt::PathCmd { kind: PathCmdKind::Curve, args, .. } if args.len() == 2));
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn polygon_with_sides() {
        let p = parse("fill { polygon { sides 6 } }");
        match &p.body[0] {
            Stmt::Builder { kind: BuilderKind::Fill, body, .. } => {
                assert!(matches!(
                    &body[0],
                    Stmt::PathCmd { kind: PathCmdKind::Polygon, block: Some(_), .. }
                ));
            }
            other => panic!("expected fill, got {other:?}"),
        }
    }

    #[test]
    fn svgpath_with_string() {
        let p = parse(r#"fill { svgpath "M0 0L1 0L1 1Z" }"#);
        match &p.body[0] {
            Stmt::Builder { body, .. } => {
                assert!(matches!(
                    &body[0],
                    Stmt::PathCmd { kind: PathCmdKind::SvgPath, args, .. } if args.len() == 1
                ));
            }
            other => panic!("expected builder, got {other:?}"),
        }
    }

    #[test]
    fn group_with_moves() {
        let p = parse("group { translate 1 0 0 cube }");
        match &p.body[0] {
            Stmt::Group { body, .. } => {
                assert!(matches!(&body[0], Stmt::Move { kind: MoveKind::Translate, .. }));
                assert!(matches!(&body[1], Stmt::Shape { .. }));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    // ── expressions ──────────────────────────────────────────────────────────

    #[test]
    fn precedence_mul_over_add() {
        let e = parse_expr_src("2 + 3 * 4");
        match e {
            Expr::BinOp { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::BinOp { op: BinOp::Mul, .. }));
            }
            other => panic!("expected add at top, got {other:?}"),
        }
    }

    #[test]
    fn precedence_compare_over_and() {
        let e = parse_expr_src("a > 1 and b < 2");
        assert!(matches!(e, Expr::BinOp { op: BinOp::And, .. }));
    }

    #[test]
    fn precedence_equality_below_comparison() {
        let e = parse_expr_src("a < b = c < d");
        assert!(matches!(e, Expr::BinOp { op: BinOp::Eq, .. }));
    }

    #[test]
    fn not_equal_operator() {
        let e = parse_expr_src("a <> b");
        assert!(matches!(e, Expr::BinOp { op: BinOp::NotEq, .. }));
    }

    #[test]
    fn parens_override_precedence() {
        let e = parse_expr_src("(2 + 3) * 4");
        assert!(matches!(e, Expr::BinOp { op: BinOp::Mul, .. }));
    }

    #[test]
    fn member_access_chain() {
        let e = parse_expr_src("p.x");
        assert!(matches!(e, Expr::Member { field, .. } if field == "x"));
    }

    #[test]
    fn negative_subscript() {
        let e = parse_expr_src("v[-1]");
        match e {
            Expr::Index { index, .. } => assert!(matches!(*index, Expr::UnOp { op: UnOp::Neg, .. })),
            other => panic!("expected index, got {other:?}"),
        }
    }

    #[test]
    fn call_with_attached_paren() {
        let e = parse_expr_src("atan2(1 2)");
        match e {
            Expr::Call { callee, args, .. } => {
                assert_eq!(callee, "atan2");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn detached_paren_is_not_a_call() {
        let e = parse_expr_src("x (1)");
        assert!(matches!(e, Expr::Ident(n, _) if n == "x"));
    }

    #[test]
    fn range_with_step_expr() {
        let e = parse_expr_src("1 to 10 step 2");
        match e {
            Expr::Range { step: Some(_), .. } => {}
            other => panic!("expected range with step, got {other:?}"),
        }
    }

    #[test]
    fn multiline_vector_in_parens() {
        let p = parse("define v (1\n2\n3)");
        assert!(matches!(
            &p.body[0],
            Stmt::Define { value: DefineValue::Expr(Expr::Vector(items, _)), .. } if items.len() == 3
        ));
    }

    // ── errors ───────────────────────────────────────────────────────────────

    #[test]
    fn missing_brace_is_error() {
        parse_err("union { cube");
    }

    #[test]
    fn property_without_value_is_error() {
        parse_err("cube { size }");
    }

    #[test]
    fn stray_token_is_error() {
        parse_err("} cube");
    }

    #[test]
    fn error_carries_position() {
        let e = parse_err("cube { size }");
        assert_eq!(e.code, ErrorCode::P002);
        assert_eq!(e.line, 1);
    }

    #[test]
    fn case_without_value_is_error() {
        parse_err("switch x { case\n cube }");
    }
}
