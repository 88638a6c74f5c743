use thiserror::Error;

/// Syntax error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // invalid escape sequence
    L004, // unterminated block comment

    // Parser
    P001, // unexpected token
    P002, // missing expected token
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::L004 => "L004",
            Self::P001 => "P001",
            Self::P002 => "P002",
        }
    }

    pub fn is_lex(&self) -> bool {
        matches!(self, Self::L001 | Self::L002 | Self::L003 | Self::L004)
    }
}

/// A lex or parse failure. Both phases are fail-fast: the first error aborts
/// the compilation and no partial token stream or AST is produced.
#[derive(Debug, Clone, Error)]
#[error("[{}] {line}:{column} — {message}", .code.as_str())]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Evaluation failure taxonomy. Any of these aborts the whole evaluation:
/// later shapes may depend on state that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    UndefinedSymbol,
    UndefinedFunction,
    ArityMismatch,
    IndexOutOfRange,
    TypeMismatch,
    DivisionByZero,
    RecursionLimitExceeded,
    ResourceLimitExceeded,
}

impl EvalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UndefinedSymbol        => "UndefinedSymbol",
            Self::UndefinedFunction      => "UndefinedFunction",
            Self::ArityMismatch          => "ArityMismatch",
            Self::IndexOutOfRange        => "IndexOutOfRange",
            Self::TypeMismatch           => "TypeMismatch",
            Self::DivisionByZero         => "DivisionByZero",
            Self::RecursionLimitExceeded => "RecursionLimitExceeded",
            Self::ResourceLimitExceeded  => "ResourceLimitExceeded",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("[{}] {line}:{column} — {message}", .kind.as_str())]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { kind, line, column, message: message.into() }
    }
}
