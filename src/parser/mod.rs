//! Recursive-descent parser for the CMake language
//!
//! The parser pulls tokens from the lexer into an owned buffer (arbitrary
//! lookahead), dispatches statements on the leading identifier, and uses
//! panic-mode recovery so one run reports as many errors as possible. A
//! partial AST with [`Node::Error`] stand-ins is always produced.

mod arguments;
mod control_flow;
mod cpm;

pub(crate) use arguments::{node_string, node_text};

use crate::ast::{Interner, Node};
use crate::error::{Error, ParseCategory, ParseError, Result};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::source::{SourceBuffer, SourceLocation};
use log::debug;
use sha2::{Digest, Sha256};

/// Result of parsing one file: the (possibly partial) AST plus every
/// error collected along the way. An error-free parse has no
/// `Node::Error` stand-ins.
#[derive(Debug)]
pub struct ParseOutcome {
    pub file: Node,
    pub errors: Vec<Error>,
}

impl ParseOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Statement-starter keywords used by panic-mode recovery.
fn is_statement_starter(name: &str) -> bool {
    matches!(
        name,
        "if" | "foreach"
            | "while"
            | "function"
            | "macro"
            | "set"
            | "add_library"
            | "add_executable"
            | "include"
            | "project"
            | "cmake_minimum_required"
            | "endif"
            | "endforeach"
            | "endwhile"
            | "endfunction"
            | "endmacro"
    ) || name.starts_with("target_")
        || name.starts_with("find_")
}

/// Main CMake parser.
pub struct Parser {
    lexer: Lexer,
    interner: Interner,
    tokens: Vec<Token>,
    current: usize,
    panic_mode: bool,
    errors: Vec<Error>,
    filename: String,
    content_hash: String,
}

impl Parser {
    pub fn new(source: impl Into<String>, filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self::from_buffer(SourceBuffer::new(source, filename))
    }

    pub fn from_buffer(buffer: SourceBuffer) -> Self {
        let filename = buffer.filename().to_string();
        let content_hash = format!("{:x}", Sha256::digest(buffer.content().as_bytes()));
        Self {
            lexer: Lexer::from_buffer(buffer),
            interner: Interner::new(),
            tokens: Vec::new(),
            current: 0,
            panic_mode: false,
            errors: Vec::new(),
            filename,
            content_hash,
        }
    }

    /// Interner holding every name seen by this parse.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Parse the whole file. Always returns a `File` node; accumulated
    /// errors ride along in the outcome.
    pub fn parse_file(mut self) -> ParseOutcome {
        debug!("parsing {}", self.filename);
        let start_loc = SourceLocation::new(self.filename.clone(), 1, 1, 0);
        let mut statements = Vec::new();

        loop {
            self.skip_trivia_and_newlines();
            if self.check(TokenKind::Eof) {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => {
                    self.panic_mode = false;
                    statements.push(stmt);
                }
                Err(err) => {
                    let node = self.error_node_for(&err);
                    self.report_error(err);
                    self.synchronize();
                    statements.push(node);
                }
            }
        }

        debug!(
            "parsed {}: {} statements, {} errors, {} interned names",
            self.filename,
            statements.len(),
            self.errors.len(),
            self.interner.len()
        );

        let path = self.interner.intern(&self.filename.clone());
        ParseOutcome {
            file: Node::File {
                path,
                statements,
                content_hash: Some(self.content_hash),
                location: start_loc,
            },
            errors: self.errors,
        }
    }

    // Token management -----------------------------------------------------

    fn fill_to(&mut self, index: usize) {
        while self.tokens.len() <= index {
            match self.lexer.next_token() {
                Ok(tok) => {
                    let is_eof = tok.kind == TokenKind::Eof;
                    self.tokens.push(tok);
                    if is_eof {
                        break;
                    }
                }
                Err(err) => {
                    // Lexical errors surface once; the stream then ends.
                    let loc = err
                        .location()
                        .cloned()
                        .unwrap_or_else(|| SourceLocation::new(self.filename.clone(), 1, 1, 0));
                    self.report_error(err);
                    self.tokens.push(Token::eof(loc));
                    break;
                }
            }
        }
    }

    pub(crate) fn current_token(&mut self) -> &Token {
        self.fill_to(self.current);
        let idx = self.current.min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn peek(&mut self, ahead: usize) -> &Token {
        self.fill_to(self.current + ahead);
        let idx = (self.current + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub(crate) fn advance(&mut self) -> Token {
        let tok = self.current_token().clone();
        if tok.kind != TokenKind::Eof {
            self.current += 1;
        }
        tok
    }

    pub(crate) fn check(&mut self, kind: TokenKind) -> bool {
        self.current_token().kind == kind
    }

    pub(crate) fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    pub(crate) fn consume(
        &mut self,
        kind: TokenKind,
        category: ParseCategory,
        message: &str,
    ) -> Result<Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        Err(self.error_at_current(category, message))
    }

    /// Skip whitespace and comments, but not newlines.
    pub(crate) fn skip_trivia(&mut self) {
        while self.current_token().is_trivia() {
            self.advance();
        }
    }

    pub(crate) fn skip_trivia_and_newlines(&mut self) {
        loop {
            if self.current_token().is_trivia() || self.check(TokenKind::Newline) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Current identifier's string value, if any.
    pub(crate) fn current_ident(&mut self) -> Option<String> {
        let tok = self.current_token();
        if tok.kind == TokenKind::Identifier {
            tok.str_value().map(|s| s.to_string())
        } else {
            None
        }
    }

    pub(crate) fn intern(&mut self, s: &str) -> crate::ast::IStr {
        self.interner.intern(s)
    }

    // Error handling -------------------------------------------------------

    pub(crate) fn error_at_current(&mut self, category: ParseCategory, message: &str) -> Error {
        let location = self.current_token().location.clone();
        let category = if self.check(TokenKind::Eof) {
            ParseCategory::UnexpectedEof
        } else {
            category
        };
        ParseError::new(category, message).at(location).into()
    }

    fn report_error(&mut self, err: Error) {
        // Panic mode suppresses cascade reports until the next
        // synchronization point.
        if !self.panic_mode {
            self.errors.push(err);
        }
        self.panic_mode = true;
    }

    fn error_node_for(&self, err: &Error) -> Node {
        let (message, category) = match err {
            Error::Parse(p) => (p.message.clone(), p.category),
            other => (other.message().to_string(), ParseCategory::InvalidSyntax),
        };
        Node::Error {
            message,
            category,
            location: err
                .location()
                .cloned()
                .unwrap_or_else(|| SourceLocation::new(self.filename.clone(), 1, 1, 0)),
        }
    }

    /// Advance to a likely statement boundary: past a newline, or up to a
    /// statement-starter keyword.
    fn synchronize(&mut self) {
        self.panic_mode = false;
        while !self.check(TokenKind::Eof) {
            if self.match_kind(TokenKind::Newline) {
                return;
            }
            if let Some(name) = self.current_ident() {
                if is_statement_starter(&name) {
                    return;
                }
            }
            self.advance();
        }
    }

    // Statement parsing ----------------------------------------------------

    pub(crate) fn parse_statement(&mut self) -> Result<Node> {
        self.skip_trivia();

        if self.check(TokenKind::Invalid) {
            let tok = self.advance();
            let message = tok
                .str_value()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "invalid token".to_string());
            return Err(ParseError::new(ParseCategory::UnexpectedToken, message)
                .at(tok.location)
                .into());
        }

        match self.current_ident().as_deref() {
            Some("if") => self.parse_if_statement(),
            Some("foreach") => self.parse_foreach_statement(),
            Some("while") => self.parse_while_statement(),
            Some("function") => self.parse_function_def(),
            Some("macro") => self.parse_macro_def(),
            Some(_) => self.parse_command_invocation(),
            None => Err(self.error_at_current(
                ParseCategory::UnexpectedToken,
                "expected command or control flow statement",
            )),
        }
    }

    fn parse_command_invocation(&mut self) -> Result<Node> {
        let name_tok = self.consume(
            TokenKind::Identifier,
            ParseCategory::UnexpectedToken,
            "expected command name",
        )?;
        let name = name_tok
            .str_value()
            .ok_or_else(|| ParseError::syntax("invalid command name").at(name_tok.location.clone()))?
            .to_string();
        let start_loc = name_tok.location;

        self.skip_trivia();
        self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            &format!("expected '(' after '{}'", name),
        )?;

        let args = self.parse_arguments()?;

        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            &format!("expected ')' to close '{}('", name),
        )?;

        // Package-manager commands get first-class nodes; unrecognized
        // CPM-prefixed names stay generic command calls.
        if name.starts_with("CPM") {
            if let Some(parsed) = cpm::parse_cpm_command(&name, &args, start_loc.clone()) {
                return parsed;
            }
            debug!("unrecognized CPM command '{}', keeping generic call", name);
        }

        Ok(Node::CommandCall {
            name: self.intern(&name),
            args,
            location: start_loc,
        })
    }

    /// Condition expression inside `if(...)`, `elseif(...)`, `while(...)`.
    pub(crate) fn parse_expression(&mut self) -> Result<Node> {
        let location = self.current_token().location.clone();
        let args = self.parse_arguments()?;
        match args.len() {
            0 => Err(self.error_at_current(ParseCategory::TooFewArguments, "expected expression")),
            1 => Ok(args.into_iter().next().expect("len checked")),
            _ => Ok(Node::List {
                elements: args,
                separator: " ".to_string(),
                location,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Node;

    pub(crate) fn parse(source: &str) -> ParseOutcome {
        Parser::new(source, "test.cmake").parse_file()
    }

    fn statements(outcome: &ParseOutcome) -> &[Node] {
        match &outcome.file {
            Node::File { statements, .. } => statements,
            other => panic!("not a file: {:?}", other),
        }
    }

    #[test]
    fn test_parse_simple_command() {
        let outcome = parse("project(demo)\n");
        assert!(outcome.is_clean());
        let stmts = statements(&outcome);
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Node::CommandCall { name, args, .. } => {
                assert_eq!(*name, "project");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_file() {
        let outcome = parse("# only a comment\n\n");
        assert!(outcome.is_clean());
        assert!(statements(&outcome).is_empty());
    }

    #[test]
    fn test_content_hash_present() {
        let outcome = parse("project(p)\n");
        match &outcome.file {
            Node::File { content_hash, .. } => {
                let hash = content_hash.as_deref().expect("hash");
                assert_eq!(hash.len(), 64);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_missing_paren_recovers() {
        let outcome = parse("set(X 1\nproject(demo)\n");
        assert!(!outcome.is_clean());
        assert!(outcome.file.error_count() >= 1);
        // The later valid statement still lands in the AST.
        let has_project = statements(&outcome).iter().any(|s| {
            matches!(s, Node::CommandCall { name, .. } if *name == "project")
        });
        assert!(has_project);
    }

    #[test]
    fn test_error_count_matches_reported() {
        let outcome = parse("set(X 1\nset(Y 2\nproject(p)\n");
        assert_eq!(outcome.file.error_count(), outcome.errors.len());
    }

    #[test]
    fn test_statement_starters() {
        assert!(is_statement_starter("target_link_libraries"));
        assert!(is_statement_starter("find_package"));
        assert!(is_statement_starter("endif"));
        assert!(!is_statement_starter("my_custom_fn"));
    }
}
