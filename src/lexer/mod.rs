//! Lexical analysis for the CMake language
//!
//! Single-pass scanner producing one token per call, with a buffered
//! lookahead so the parser can peek arbitrarily far ahead. The grammar is
//! whitespace-sensitive: whitespace runs and newlines are real tokens,
//! because adjacency decides whether `foo${X}` is one argument or two.

pub mod interpolation;
pub mod token;

pub use token::{Token, TokenKind, TokenValue};

use crate::error::{ParseCategory, ParseError, Result};
use crate::source::{SourceBuffer, SourceLocation};
use std::collections::VecDeque;

/// CMake lexer over a [`SourceBuffer`].
pub struct Lexer {
    buffer: SourceBuffer,
    pos: usize,
    /// Already-lexed tokens waiting to be consumed (filled by peeks).
    lookahead: VecDeque<Token>,
}

impl Lexer {
    pub fn new(source: impl Into<String>, filename: impl Into<String>) -> Self {
        Self::from_buffer(SourceBuffer::new(source, filename))
    }

    pub fn from_buffer(buffer: SourceBuffer) -> Self {
        Self {
            buffer,
            pos: 0,
            lookahead: VecDeque::new(),
        }
    }

    pub fn buffer(&self) -> &SourceBuffer {
        &self.buffer
    }

    /// Produce the next token, consuming it.
    pub fn next_token(&mut self) -> Result<Token> {
        if let Some(tok) = self.lookahead.pop_front() {
            return Ok(tok);
        }
        self.lex_token()
    }

    /// Look `ahead` tokens past the next one without consuming anything.
    pub fn peek_token(&mut self, ahead: usize) -> Result<Token> {
        while self.lookahead.len() <= ahead {
            let tok = self.lex_token()?;
            self.lookahead.push_back(tok);
        }
        Ok(self.lookahead[ahead].clone())
    }

    // Scanner internals ----------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.buffer.len()
    }

    fn current(&self) -> u8 {
        self.buffer.at(self.pos)
    }

    fn peek_byte(&self, ahead: usize) -> u8 {
        self.buffer.at(self.pos + ahead)
    }

    fn advance(&mut self) -> u8 {
        let b = self.current();
        if !self.at_end() {
            self.pos += 1;
        }
        b
    }

    fn location(&self) -> SourceLocation {
        self.buffer.location_at(self.pos)
    }

    fn make_token(&self, kind: TokenKind, start: usize, value: TokenValue) -> Token {
        Token::new(
            kind,
            value,
            self.buffer.location_at(start),
            self.buffer.slice(start, self.pos),
        )
    }

    fn lex_token(&mut self) -> Result<Token> {
        if self.at_end() {
            return Ok(Token::eof(self.location()));
        }

        let start = self.pos;
        match self.current() {
            b' ' | b'\t' | b'\r' => Ok(self.lex_whitespace(start)),
            b'\\' if self.peek_byte(1) == b'\n' => Ok(self.lex_whitespace(start)),
            b'\n' => {
                self.advance();
                Ok(self.make_token(TokenKind::Newline, start, TokenValue::None))
            }
            b'#' => {
                if self.peek_byte(1) == b'[' && self.is_bracket_open(self.pos + 1) {
                    self.lex_bracket_comment(start)
                } else {
                    self.advance();
                    while !self.at_end() && self.current() != b'\n' {
                        self.advance();
                    }
                    // Line comments carry no payload; the parser skips them.
                    Ok(self.make_token(TokenKind::Comment, start, TokenValue::None))
                }
            }
            b'(' => {
                self.advance();
                Ok(self.make_token(TokenKind::LeftParen, start, TokenValue::None))
            }
            b')' => {
                self.advance();
                Ok(self.make_token(TokenKind::RightParen, start, TokenValue::None))
            }
            b'[' => {
                if self.is_bracket_open(self.pos) {
                    self.lex_bracket_argument(start)
                } else {
                    self.advance();
                    Ok(self.make_token(TokenKind::LeftBracket, start, TokenValue::None))
                }
            }
            b']' => {
                self.advance();
                Ok(self.make_token(TokenKind::RightBracket, start, TokenValue::None))
            }
            b';' => {
                self.advance();
                Ok(self.make_token(TokenKind::Semicolon, start, TokenValue::None))
            }
            b'"' => self.lex_string(start),
            b'$' => match self.peek_byte(1) {
                b'{' => self.lex_braced_variable(start),
                b'<' => self.lex_generator_expr(start),
                _ if self.has_scope_wrapper(self.pos + 1).is_some() => {
                    self.lex_scoped_variable(start)
                }
                _ => self.lex_unquoted(start),
            },
            b if b.is_ascii_digit() || (b == b'.' && self.peek_byte(1).is_ascii_digit()) => {
                self.lex_number(start)
            }
            b if is_unquoted_elem(b) => self.lex_unquoted(start),
            b => {
                self.advance();
                Ok(self.make_token(
                    TokenKind::Invalid,
                    start,
                    TokenValue::Str(format!("unexpected character '{}'", b as char)),
                ))
            }
        }
    }

    /// A run of spaces, tabs, carriage returns and `\`-newline
    /// continuations collapses into one Whitespace token.
    fn lex_whitespace(&mut self, start: usize) -> Token {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' => {
                    self.advance();
                }
                b'\\' if self.peek_byte(1) == b'\n' => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
        self.make_token(TokenKind::Whitespace, start, TokenValue::None)
    }

    fn lex_string(&mut self, start: usize) -> Result<Token> {
        let start_loc = self.location();
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            if self.at_end() {
                return Err(ParseError::new(
                    ParseCategory::UnterminatedString,
                    "unterminated string",
                )
                .at(start_loc)
                .with_help("add a closing '\"'")
                .into());
            }
            match self.current() {
                b'"' => {
                    self.advance();
                    break;
                }
                b'\\' => {
                    self.advance();
                    match self.current() {
                        b'n' => value.push('\n'),
                        b't' => value.push('\t'),
                        b'r' => value.push('\r'),
                        b'\\' => value.push('\\'),
                        b'"' => value.push('"'),
                        b'$' => value.push('$'),
                        b';' => value.push(';'),
                        other => {
                            // Unknown escape keeps both characters.
                            value.push('\\');
                            value.push(other as char);
                        }
                    }
                    self.advance();
                }
                _ => {
                    value.push(self.advance_char());
                }
            }
        }

        Ok(self.make_token(TokenKind::String, start, TokenValue::Str(value)))
    }

    /// `${NAME}`, with balanced inner braces kept verbatim so
    /// `${ENV{PATH}}` stores `ENV{PATH}` as the name.
    fn lex_braced_variable(&mut self, start: usize) -> Result<Token> {
        let start_loc = self.location();
        self.advance(); // $
        self.advance(); // {
        let name = self.collect_balanced_braces(&start_loc)?;
        Ok(self.make_token(TokenKind::Variable, start, TokenValue::Str(name)))
    }

    /// `$ENV{NAME}` or `$CACHE{NAME}`; the wrapper stays part of the
    /// stored name and the parser turns it into the variable scope.
    fn lex_scoped_variable(&mut self, start: usize) -> Result<Token> {
        let start_loc = self.location();
        self.advance(); // $
        let wrapper = self
            .has_scope_wrapper(self.pos)
            .expect("dispatch checked the wrapper");
        self.pos += wrapper.len();
        let inner = self.collect_balanced_braces(&start_loc)?;
        let name = format!("{}{}}}", wrapper, inner);
        Ok(self.make_token(TokenKind::Variable, start, TokenValue::Str(name)))
    }

    /// Returns `"ENV{"` or `"CACHE{"` when `pos` starts one.
    fn has_scope_wrapper(&self, pos: usize) -> Option<&'static str> {
        if self.buffer.slice(pos, pos + 4) == "ENV{" {
            Some("ENV{")
        } else if self.buffer.slice(pos, pos + 6) == "CACHE{" {
            Some("CACHE{")
        } else {
            None
        }
    }

    /// Collect up to (and over) the `}` matching an already-consumed `{`.
    fn collect_balanced_braces(&mut self, start_loc: &SourceLocation) -> Result<String> {
        let mut name = String::new();
        let mut depth = 1usize;
        loop {
            if self.at_end() {
                return Err(ParseError::new(
                    ParseCategory::UnterminatedString,
                    "unterminated variable reference",
                )
                .at(start_loc.clone())
                .into());
            }
            match self.current() {
                b'{' => {
                    depth += 1;
                    name.push('{');
                    self.advance();
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                    name.push('}');
                    self.advance();
                }
                _ => name.push(self.advance_char()),
            }
        }
        Ok(name)
    }

    fn lex_generator_expr(&mut self, start: usize) -> Result<Token> {
        let start_loc = self.location();
        self.advance(); // $
        self.advance(); // <

        let mut expr = String::new();
        let mut depth = 1usize;
        loop {
            if self.at_end() {
                return Err(ParseError::new(
                    ParseCategory::UnterminatedString,
                    "unterminated generator expression",
                )
                .at(start_loc)
                .into());
            }
            match self.current() {
                b'<' => {
                    depth += 1;
                    expr.push('<');
                    self.advance();
                }
                b'>' => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        break;
                    }
                    expr.push('>');
                    self.advance();
                }
                _ => expr.push(self.advance_char()),
            }
        }

        Ok(self.make_token(TokenKind::GeneratorExpr, start, TokenValue::Str(expr)))
    }

    fn lex_number(&mut self, start: usize) -> Result<Token> {
        while self.current().is_ascii_digit() {
            self.advance();
        }
        if self.current() == b'.' && self.peek_byte(1).is_ascii_digit() {
            self.advance();
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }
        let exp_follows = |b: u8, after: u8, after2: u8| {
            (b == b'e' || b == b'E')
                && (after.is_ascii_digit()
                    || ((after == b'+' || after == b'-') && after2.is_ascii_digit()))
        };
        if exp_follows(self.current(), self.peek_byte(1), self.peek_byte(2)) {
            self.advance();
            if self.current() == b'+' || self.current() == b'-' {
                self.advance();
            }
            while self.current().is_ascii_digit() {
                self.advance();
            }
        }

        let text = self.buffer.slice(start, self.pos);
        match text.parse::<f64>() {
            Ok(num) => Ok(self.make_token(TokenKind::Number, start, TokenValue::Num(num))),
            Err(_) => Err(ParseError::syntax(format!("invalid number '{}'", text))
                .at(self.buffer.location_at(start))
                .into()),
        }
    }

    /// Unquoted argument. Stops at whitespace, parens, `#`, and at the
    /// start of an embedded `${...}` or `$<...>` so those interleave as
    /// their own tokens.
    fn lex_unquoted(&mut self, start: usize) -> Result<Token> {
        let mut value = String::new();

        loop {
            if self.at_end() {
                break;
            }
            let b = self.current();
            match b {
                b' ' | b'\t' | b'\r' | b'\n' | b'(' | b')' | b'#' | b'"' => break,
                b'$' if self.peek_byte(1) == b'{'
                    || self.peek_byte(1) == b'<'
                    || self.has_scope_wrapper(self.pos + 1).is_some() =>
                {
                    break
                }
                b'\\' => {
                    let next = self.peek_byte(1);
                    match next {
                        b';' | b' ' | b'(' | b')' | b'$' | b'@' | b'\\' | b'#' => {
                            self.advance();
                            value.push(self.advance_char());
                        }
                        b'\n' => {
                            // Line continuation
                            self.advance();
                            self.advance();
                        }
                        _ => {
                            value.push('\\');
                            self.advance();
                        }
                    }
                }
                b if b.is_ascii_control() => break,
                _ => value.push(self.advance_char()),
            }
        }

        if value.is_empty() {
            return Err(ParseError::syntax("expected argument")
                .at(self.buffer.location_at(start))
                .into());
        }

        Ok(self.make_token(TokenKind::Identifier, start, TokenValue::Str(value)))
    }

    fn lex_bracket_comment(&mut self, start: usize) -> Result<Token> {
        let start_loc = self.location();
        self.advance(); // #
        if self.consume_bracket_body().is_none() {
            return Err(ParseError::new(
                ParseCategory::UnterminatedString,
                "unterminated bracket comment",
            )
            .at(start_loc)
            .into());
        }
        Ok(self.make_token(TokenKind::BracketComment, start, TokenValue::None))
    }

    fn lex_bracket_argument(&mut self, start: usize) -> Result<Token> {
        let start_loc = self.location();
        match self.consume_bracket_body() {
            Some(content) => {
                Ok(self.make_token(TokenKind::String, start, TokenValue::Str(content)))
            }
            None => Err(ParseError::new(
                ParseCategory::UnterminatedString,
                "unterminated bracket argument",
            )
            .at(start_loc)
            .into()),
        }
    }

    /// Whether `[` at `pos` opens a bracket form: `[` `=`* `[`.
    fn is_bracket_open(&self, pos: usize) -> bool {
        if self.buffer.at(pos) != b'[' {
            return false;
        }
        let mut i = pos + 1;
        while self.buffer.at(i) == b'=' {
            i += 1;
        }
        self.buffer.at(i) == b'['
    }

    /// Consume `[=*[ ... ]=*]` with a matching equals count, positioned at
    /// the opening `[`. Returns the content, or None at EOF.
    fn consume_bracket_body(&mut self) -> Option<String> {
        self.advance(); // first [
        let mut equals = 0usize;
        while self.current() == b'=' {
            equals += 1;
            self.advance();
        }
        self.advance(); // second [

        let mut closing = String::from("]");
        closing.push_str(&"=".repeat(equals));
        closing.push(']');

        let mut content = String::new();
        while !self.at_end() {
            if self.buffer.slice(self.pos, self.pos + closing.len()) == closing {
                self.pos += closing.len();
                return Some(content);
            }
            content.push(self.advance_char());
        }
        None
    }

    /// Advance over one (possibly multi-byte) character and return it.
    fn advance_char(&mut self) -> char {
        let rest = &self.buffer.content()[self.pos..];
        let ch = rest.chars().next().unwrap_or('\0');
        self.pos += ch.len_utf8();
        ch
    }
}

fn is_unquoted_elem(b: u8) -> bool {
    if b.is_ascii_control() {
        return false;
    }
    !matches!(b, b' ' | b'(' | b')' | b'#' | b'"')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source, "test.cmake");
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token().expect("lex failure");
            let done = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        all_tokens(source)
            .into_iter()
            .filter(|t| !t.is_trivia() && t.kind != TokenKind::Eof)
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_command_shape() {
        assert_eq!(
            kinds("add_library(calc STATIC src/calc.cpp)"),
            vec![
                TokenKind::Identifier,
                TokenKind::LeftParen,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn test_raw_text_matches_source() {
        let source = "set(X \"a b\") # note\nproject(demo)";
        for tok in all_tokens(source) {
            let start = tok.location.offset;
            assert_eq!(&source[start..start + tok.text.len()], tok.text);
        }
    }

    #[test]
    fn test_string_escapes() {
        let toks = all_tokens(r#""a\tb\"c\;d""#);
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].str_value(), Some("a\tb\"c;d"));
    }

    #[test]
    fn test_unknown_escape_preserved() {
        let toks = all_tokens(r#""a\qb""#);
        assert_eq!(toks[0].str_value(), Some("a\\qb"));
    }

    #[test]
    fn test_unterminated_string_errors() {
        let mut lexer = Lexer::new("\"abc", "t.cmake");
        let err = lexer.next_token().unwrap_err();
        match err {
            crate::error::Error::Parse(p) => {
                assert_eq!(p.category, ParseCategory::UnterminatedString)
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_variable_forms() {
        let toks = all_tokens("${FOO} $ENV{PATH} $CACHE{OPT}");
        let vars: Vec<_> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Variable)
            .map(|t| t.str_value().unwrap().to_string())
            .collect();
        assert_eq!(vars, vec!["FOO", "ENV{PATH}", "CACHE{OPT}"]);
    }

    #[test]
    fn test_generator_expr_nested() {
        let toks = all_tokens("$<$<CONFIG:Debug>:-g>");
        assert_eq!(toks[0].kind, TokenKind::GeneratorExpr);
        assert_eq!(toks[0].str_value(), Some("$<CONFIG:Debug>:-g"));
    }

    #[test]
    fn test_unquoted_splits_at_variable() {
        assert_eq!(
            kinds("pre${X}post"),
            vec![
                TokenKind::Identifier,
                TokenKind::Variable,
                TokenKind::Identifier
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        let toks = all_tokens("3 3.25 1e3 .5");
        let nums: Vec<_> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .map(|t| t.num_value().unwrap())
            .collect();
        assert_eq!(nums, vec![3.0, 3.25, 1000.0, 0.5]);
    }

    #[test]
    fn test_line_comment_token() {
        let toks = all_tokens("# hello\nset(X 1)");
        assert_eq!(toks[0].kind, TokenKind::Comment);
        assert_eq!(toks[1].kind, TokenKind::Newline);
    }

    #[test]
    fn test_bracket_comment_with_equals() {
        let toks = all_tokens("#[==[ anything ]] here ]==] set(X 1)");
        assert_eq!(toks[0].kind, TokenKind::BracketComment);
        let set_tok = toks.iter().find(|t| t.kind == TokenKind::Identifier).unwrap();
        assert_eq!(set_tok.str_value(), Some("set"));
    }

    #[test]
    fn test_bracket_argument_content() {
        let toks = all_tokens("[=[raw ${not_a_var}]=]");
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].str_value(), Some("raw ${not_a_var}"));
    }

    #[test]
    fn test_line_continuation_in_whitespace() {
        let toks = all_tokens("set(X \\\n    1)");
        let names = toks
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Identifier | TokenKind::Number))
            .count();
        assert_eq!(names, 3); // set, X, 1
        assert!(!toks.iter().any(|t| t.kind == TokenKind::Newline));
    }

    #[test]
    fn test_unquoted_escapes() {
        let toks = all_tokens(r"a\;b c\ d");
        let idents: Vec<_> = toks
            .iter()
            .filter(|t| t.kind == TokenKind::Identifier)
            .map(|t| t.str_value().unwrap().to_string())
            .collect();
        assert_eq!(idents, vec!["a;b", "c d"]);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new("set(X 1)", "t.cmake");
        let peeked = lexer.peek_token(0).unwrap();
        let peeked2 = lexer.peek_token(2).unwrap();
        let next = lexer.next_token().unwrap();
        assert_eq!(peeked, next);
        assert_eq!(peeked2.kind, TokenKind::Identifier); // X
    }

    #[test]
    fn test_invalid_character() {
        // Control characters are not part of any token form.
        let toks = all_tokens("\u{1}");
        assert_eq!(toks[0].kind, TokenKind::Invalid);
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut lexer = Lexer::new("", "t.cmake");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
    }
}
