//! Token types for CMake lexical analysis

use crate::source::SourceLocation;
use std::fmt;

/// Token kinds produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// Command names and unquoted arguments
    Identifier,
    /// Quoted strings and bracket arguments
    String,
    /// Numeric literals
    Number,
    /// `${VAR}`, `$ENV{VAR}` or `$CACHE{VAR}`
    Variable,
    /// `$<...>`, preserved opaquely
    GeneratorExpr,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Semicolon,

    // Comments
    /// `# ...` to end of line
    Comment,
    /// `#[=*[ ... ]=*]`
    BracketComment,

    // Control
    Newline,
    Whitespace,
    Eof,

    /// Invalid input; the message lives in the token value
    Invalid,
}

impl TokenKind {
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Variable => "variable",
            TokenKind::GeneratorExpr => "generator expression",
            TokenKind::LeftParen => "'('",
            TokenKind::RightParen => "')'",
            TokenKind::LeftBracket => "'['",
            TokenKind::RightBracket => "']'",
            TokenKind::Semicolon => "';'",
            TokenKind::Comment => "comment",
            TokenKind::BracketComment => "bracket comment",
            TokenKind::Newline => "newline",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Eof => "end of file",
            TokenKind::Invalid => "invalid token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload attached to a token, depending on its kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Str(String),
    Num(f64),
}

impl TokenValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TokenValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            TokenValue::Num(n) => Some(*n),
            _ => None,
        }
    }
}

/// One lexed token. `text` is the raw source slice the token covers, so
/// `source[location.offset..location.offset + text.len()] == text`.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: TokenValue,
    pub location: SourceLocation,
    pub text: String,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        value: TokenValue,
        location: SourceLocation,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            value,
            location,
            text: text.into(),
        }
    }

    pub fn eof(location: SourceLocation) -> Self {
        Self::new(TokenKind::Eof, TokenValue::None, location, "")
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whitespace and comments carry no syntax.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::BracketComment
        )
    }

    pub fn str_value(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn num_value(&self) -> Option<f64> {
        self.value.as_num()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            TokenValue::Str(s) => write!(f, "{}({:?})", self.kind, s),
            TokenValue::Num(n) => write!(f, "{}({})", self.kind, n),
            TokenValue::None => write!(f, "{}", self.kind),
        }
    }
}
