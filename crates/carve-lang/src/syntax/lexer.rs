use crate::error::{Error, ErrorCode};
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer<'a> {
    source: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    /// Whether the previously emitted token can end an expression.
    /// Consulted by the `-` disambiguation.
    prev_ends_expr: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source: source.as_bytes(), pos: 0, line: 1, column: 1, prev_ends_expr: false }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens: Vec<Token> = Vec::new();

        loop {
            let spaced = self.skip_blanks();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
                break;
            }

            match self.next_token(spaced)? {
                None => {}
                Some(tok) => {
                    // collapse runs of newlines into a single token
                    if tok.kind == TokenKind::Newline
                        && matches!(tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. }))
                    {
                        continue;
                    }
                    self.prev_ends_expr = tok.kind.can_end_expr();
                    tokens.push(tok);
                }
            }
        }

        Ok(tokens)
    }

    fn next_token(&mut self, spaced: bool) -> Result<Option<Token>, Error> {
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'\n' => TokenKind::Newline,

            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Star,
            b'%' => TokenKind::Percent,
            b'=' => TokenKind::Eq,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,

            // Whitespace decides what a minus means. After a complete
            // expression, ` -x` is a unary/vector-separator marker while
            // ` - x` and `x-` are binary subtraction. Anywhere an expression
            // cannot have just ended, `-` is always the unary marker.
            b'-' => {
                let tight_right = !self.is_at_end()
                    && !matches!(self.peek(), b' ' | b'\t' | b'\r' | b'\n');
                if !self.prev_ends_expr || (spaced && tight_right) {
                    TokenKind::MinusPrefix
                } else {
                    TokenKind::Minus
                }
            }

            b'/' => {
                if self.peek() == b'/' {
                    self.skip_line();
                    return Ok(None);
                } else if self.peek() == b'*' {
                    self.skip_block_comment(line, col)?;
                    return Ok(None);
                } else {
                    TokenKind::Slash
                }
            }

            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else if self.peek() == b'>' { self.advance(); TokenKind::NotEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }

            b'.' => {
                if self.peek().is_ascii_digit() {
                    TokenKind::Number(self.read_number(ch))
                } else {
                    TokenKind::Dot
                }
            }

            b'"' => TokenKind::StringLit(self.read_string(line, col)?),
            b'0'..=b'9' => TokenKind::Number(self.read_number(ch)),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => keyword_or_ident(self.read_ident(ch)),

            other => {
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{}`", other as char)));
            }
        };

        Ok(Some(Token::new(kind, line, col)))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.source[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.source.len() { 0 } else { self.source[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Skip spaces and tabs (not newlines — those are tokens).
    /// Returns true if anything was skipped.
    fn skip_blanks(&mut self) -> bool {
        let mut skipped = false;
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' => { self.advance(); skipped = true; }
                _ => break,
            }
        }
        skipped
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
    }

    /// Block comments nest: `/* a /* b */ c */` is one comment.
    fn skip_block_comment(&mut self, start_line: usize, start_col: usize) -> Result<(), Error> {
        self.advance(); // consume *
        let mut depth = 1usize;
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                depth -= 1;
                if depth == 0 { return Ok(()); }
            } else if self.peek() == b'/' && self.peek_next() == b'*' {
                self.advance();
                self.advance();
                depth += 1;
            } else {
                self.advance();
            }
        }
        Err(Error::new(ErrorCode::L004, start_line, start_col, "unterminated block comment"))
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    fn read_string(&mut self, start_line: usize, start_col: usize) -> Result<String, Error> {
        let mut bytes = Vec::new();
        loop {
            if self.is_at_end() || self.peek() == b'\n' {
                return Err(Error::new(ErrorCode::L002, start_line, start_col,
                    "unterminated string literal"));
            }
            let ch = self.advance();
            if ch == b'"' { break; }
            if ch == b'\\' {
                let esc_line = self.line;
                let esc_col = self.column;
                match self.advance() {
                    b'n'  => bytes.push(b'\n'),
                    b't'  => bytes.push(b'\t'),
                    b'"'  => bytes.push(b'"'),
                    b'\\' => bytes.push(b'\\'),
                    other => {
                        return Err(Error::new(ErrorCode::L003, esc_line, esc_col,
                            format!("unknown escape sequence `\\{}`", other as char)));
                    }
                }
            } else {
                bytes.push(ch);
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_number(&mut self, first: u8) -> f64 {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            s.push(self.advance() as char);
        }
        // consume decimal only if followed by at least one digit
        // (avoids treating `.` in `p.x` as a decimal point)
        if first != b'.' && !self.is_at_end() && self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            s.push(self.advance() as char);
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                s.push(self.advance() as char);
            }
        }
        s.parse().unwrap_or(0.0)
    }

    fn read_ident(&mut self, first: u8) -> String {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            s.push(self.advance() as char);
        }
        s
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
