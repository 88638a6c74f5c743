#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Bool(bool),
    Ident(String),
    StringLit(String),

    // Keywords
    Define,
    Option,
    For,
    In,
    To,
    Step,
    If,
    Else,
    Switch,
    Case,
    And,
    Or,
    Not,

    // Operators
    Plus,        // +
    Minus,       // binary `-` (spaces on both sides, or attached to the left operand)
    MinusPrefix, // unary `-` / vector-separator (space before, none after)
    Star,        // *
    Slash,       // /
    Percent,     // %
    Eq,          // =
    NotEq,       // <>
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=

    // Punctuation
    Dot,      // .
    LParen,   // (
    RParen,   // )
    LBrace,   // {
    RBrace,   // }
    LBracket, // [
    RBracket, // ]

    /// Significant line break. Terminates space-separated operand runs.
    Newline,
    Eof,
}

impl TokenKind {
    /// Tokens that can be the final token of a complete expression.
    /// The lexer consults this when deciding how to read a `-`.
    pub fn can_end_expr(&self) -> bool {
        matches!(
            self,
            Self::Number(_) | Self::Bool(_) | Self::Ident(_) | Self::StringLit(_)
            | Self::RParen | Self::RBracket
        )
    }

    /// Tokens that can begin a primary expression.
    pub fn begins_primary(&self) -> bool {
        matches!(
            self,
            Self::Number(_) | Self::Bool(_) | Self::Ident(_) | Self::StringLit(_)
            | Self::LParen | Self::MinusPrefix | Self::Plus | Self::Not
        )
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Define | Self::Option | Self::For | Self::In | Self::To | Self::Step
            | Self::If | Self::Else | Self::Switch | Self::Case
            | Self::And | Self::Or | Self::Not
        )
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "define" => TokenKind::Define,
        "option" => TokenKind::Option,
        "for"    => TokenKind::For,
        "in"     => TokenKind::In,
        "to"     => TokenKind::To,
        "step"   => TokenKind::Step,
        "if"     => TokenKind::If,
        "else"   => TokenKind::Else,
        "switch" => TokenKind::Switch,
        "case"   => TokenKind::Case,
        "and"    => TokenKind::And,
        "or"     => TokenKind::Or,
        "not"    => TokenKind::Not,
        "true"   => TokenKind::Bool(true),
        "false"  => TokenKind::Bool(false),
        _        => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
