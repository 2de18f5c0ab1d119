//! Argument parsing
//!
//! CMake arguments come in four forms: quoted strings (which may contain
//! `${...}` interpolations), unquoted runs (which split at embedded
//! variable references), bracket arguments, and parenthesized groups
//! inside conditions. Adjacency matters: `pre${X}post` is one argument,
//! `pre ${X} post` is three.

use super::Parser;
use crate::ast::{Node, NumberValue, VarScope};
use crate::error::{ParseCategory, Result};
use crate::lexer::interpolation;
use crate::lexer::TokenKind;
use crate::source::SourceLocation;

impl Parser {
    /// Parse arguments up to the closing `)` of the enclosing command.
    /// Newlines between arguments are allowed; a newline followed by what
    /// looks like a fresh statement (`starter_keyword (`) ends the list so
    /// a missing `)` does not swallow the rest of the file.
    pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Node>> {
        let mut args = Vec::new();

        loop {
            let mut crossed_newline = false;
            loop {
                if self.current_token().is_trivia() {
                    self.advance();
                } else if self.check(TokenKind::Newline) {
                    crossed_newline = true;
                    self.advance();
                } else {
                    break;
                }
            }

            if self.check(TokenKind::RightParen) || self.check(TokenKind::Eof) {
                break;
            }

            if crossed_newline && self.looks_like_statement_start() {
                break;
            }

            let arg = self.parse_argument()?;
            args.push(arg);

            self.skip_trivia();
            // Semicolon separators between arguments are allowed.
            self.match_kind(TokenKind::Semicolon);
        }

        Ok(args)
    }

    /// `starter_keyword (` after a newline reads as a new statement, not a
    /// continuation of an unterminated argument list.
    fn looks_like_statement_start(&mut self) -> bool {
        let name = match self.current_ident() {
            Some(name) => name,
            None => return false,
        };
        if !super::is_statement_starter(&name) {
            return false;
        }
        let mut ahead = 1;
        while self.peek(ahead).is_trivia() {
            ahead += 1;
        }
        self.peek(ahead).kind == TokenKind::LeftParen
    }

    pub(crate) fn parse_argument(&mut self) -> Result<Node> {
        match self.current_token().kind {
            TokenKind::String => self.parse_quoted_argument(),
            TokenKind::LeftParen => self.parse_paren_group(),
            TokenKind::Identifier
            | TokenKind::Number
            | TokenKind::Variable
            | TokenKind::GeneratorExpr
            | TokenKind::LeftBracket
            | TokenKind::RightBracket => self.parse_unquoted_argument(),
            TokenKind::Invalid => {
                let tok = self.advance();
                let message = tok
                    .str_value()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "invalid token".to_string());
                Err(crate::error::ParseError::new(ParseCategory::UnexpectedToken, message)
                    .at(tok.location)
                    .into())
            }
            _ => Err(self.error_at_current(ParseCategory::UnexpectedToken, "expected argument")),
        }
    }

    /// Quoted string or bracket argument (both arrive as String tokens;
    /// bracket arguments are told apart by their raw text).
    pub(crate) fn parse_quoted_argument(&mut self) -> Result<Node> {
        let tok = self.advance();
        let location = tok.location.clone();
        let value = tok.str_value().unwrap_or("").to_string();

        if tok.text.starts_with('[') {
            // Bracket argument: content is taken verbatim, no
            // interpolation, never quoted.
            return Ok(Node::BracketExpr {
                content: Box::new(Node::StringLiteral {
                    value,
                    quoted: false,
                    location: location.clone(),
                }),
                quoted: true,
                location,
            });
        }

        if interpolation::has_interpolations(&value) {
            let parts = interpolation::split(&value, &location);
            let mut nodes = Vec::with_capacity(parts.len());
            for part in parts {
                match part {
                    interpolation::Part::Literal(text) => nodes.push(Node::StringLiteral {
                        value: text,
                        quoted: false,
                        location: location.clone(),
                    }),
                    interpolation::Part::Variable(name) => {
                        nodes.push(self.make_variable(&name, location.clone()))
                    }
                }
            }
            if nodes.len() == 1 {
                return Ok(nodes.into_iter().next().expect("len checked"));
            }
            return Ok(Node::List {
                elements: nodes,
                separator: String::new(),
                location,
            });
        }

        Ok(Node::StringLiteral {
            value,
            quoted: true,
            location,
        })
    }

    /// Unquoted run: adjacent identifier/number/variable/generator tokens
    /// glue into one argument, splitting into a list at each embedded
    /// reference.
    pub(crate) fn parse_unquoted_argument(&mut self) -> Result<Node> {
        let start_loc = self.current_token().location.clone();
        let mut parts: Vec<Node> = Vec::new();
        let mut text = String::new();

        loop {
            match self.current_token().kind {
                TokenKind::Identifier => {
                    let tok = self.advance();
                    text.push_str(tok.str_value().unwrap_or(""));
                }
                TokenKind::Number => {
                    // Raw text keeps trailing zeros (`3.20` stays `3.20`).
                    let tok = self.advance();
                    text.push_str(&tok.text);
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    text.push('[');
                }
                TokenKind::RightBracket => {
                    self.advance();
                    text.push(']');
                }
                TokenKind::Variable => {
                    if !text.is_empty() {
                        parts.push(Node::StringLiteral {
                            value: std::mem::take(&mut text),
                            quoted: false,
                            location: start_loc.clone(),
                        });
                    }
                    let tok = self.advance();
                    let name = tok.str_value().unwrap_or("").to_string();
                    parts.push(self.make_variable(&name, tok.location));
                }
                TokenKind::GeneratorExpr => {
                    if !text.is_empty() {
                        parts.push(Node::StringLiteral {
                            value: std::mem::take(&mut text),
                            quoted: false,
                            location: start_loc.clone(),
                        });
                    }
                    let tok = self.advance();
                    parts.push(Node::GeneratorExpr {
                        text: tok.str_value().unwrap_or("").to_string(),
                        location: tok.location,
                    });
                }
                _ => break,
            }
        }

        if !text.is_empty() {
            if parts.is_empty() {
                // Plain unquoted token: classify as boolean, number, or
                // string.
                return Ok(classify_unquoted(text, start_loc));
            }
            parts.push(Node::StringLiteral {
                value: text,
                quoted: false,
                location: start_loc.clone(),
            });
        }

        match parts.len() {
            0 => Err(self.error_at_current(ParseCategory::UnexpectedToken, "expected argument")),
            1 => Ok(parts.into_iter().next().expect("len checked")),
            _ => Ok(Node::List {
                elements: parts,
                separator: String::new(),
                location: start_loc,
            }),
        }
    }

    /// Parenthesized group inside a condition, e.g. `if(NOT (A AND B))`.
    fn parse_paren_group(&mut self) -> Result<Node> {
        let open = self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            "expected '('",
        )?;
        let elements = self.parse_arguments()?;
        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            "expected ')' to close group",
        )?;
        Ok(Node::List {
            elements,
            separator: " ".to_string(),
            location: open.location,
        })
    }

    /// Build a `Variable` node, unwrapping `ENV{...}`/`CACHE{...}` into
    /// the scope while keeping the wrapper in the stored name.
    pub(crate) fn make_variable(&mut self, name: &str, location: SourceLocation) -> Node {
        let scope = if name.starts_with("ENV{") && name.ends_with('}') {
            VarScope::Env
        } else if name.starts_with("CACHE{") && name.ends_with('}') {
            VarScope::Cache
        } else {
            VarScope::Normal
        };
        Node::Variable {
            name: self.intern(name),
            scope,
            location,
        }
    }
}

/// Boolean keywords and numeric spellings take their literal forms;
/// everything else is an unquoted string.
fn classify_unquoted(text: String, location: SourceLocation) -> Node {
    match text.as_str() {
        "TRUE" | "ON" | "YES" | "Y" => {
            return Node::BooleanLiteral {
                value: true,
                original: text,
                location,
            }
        }
        "FALSE" | "OFF" | "NO" | "N" => {
            return Node::BooleanLiteral {
                value: false,
                original: text,
                location,
            }
        }
        _ => {}
    }

    let numeric_start = text
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+')
        .unwrap_or(false);
    if numeric_start {
        if let Ok(int) = text.parse::<i64>() {
            return Node::NumberLiteral {
                value: NumberValue::Int(int),
                text,
                location,
            };
        }
        if let Ok(float) = text.parse::<f64>() {
            return Node::NumberLiteral {
                value: NumberValue::Float(float),
                text,
                location,
            };
        }
    }

    Node::StringLiteral {
        value: text,
        quoted: false,
        location,
    }
}

/// Extract a plain string from an argument node, for keyword scanning.
pub(crate) fn node_string(node: &Node) -> Option<String> {
    match node {
        Node::StringLiteral { value, .. } => Some(value.clone()),
        Node::Identifier { name, .. } => Some(name.to_string()),
        Node::BooleanLiteral { original, .. } => Some(original.clone()),
        Node::NumberLiteral { text, .. } => Some(text.clone()),
        _ => None,
    }
}

/// Like [`node_string`] but also renders variables and adjacency lists to
/// their source spelling, for arguments preserved verbatim.
pub(crate) fn node_text(node: &Node) -> String {
    match node {
        Node::Variable { .. } | Node::List { .. } | Node::GeneratorExpr { .. } => {
            node.pretty_print(0)
        }
        other => node_string(other).unwrap_or_else(|| other.pretty_print(0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn first_arg(source: &str) -> Node {
        let outcome = Parser::new(source, "t.cmake").parse_file();
        assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
        match outcome.file {
            Node::File { mut statements, .. } => match statements.remove(0) {
                Node::CommandCall { mut args, .. } => args.remove(0),
                other => panic!("not a command: {:?}", other),
            },
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_boolean_keywords() {
        match first_arg("set(ON)") {
            Node::BooleanLiteral {
                value, original, ..
            } => {
                assert!(value);
                assert_eq!(original, "ON");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            first_arg("set(NO)"),
            Node::BooleanLiteral { value: false, .. }
        ));
    }

    #[test]
    fn test_integer_and_float_literals() {
        assert!(matches!(
            first_arg("set(42)"),
            Node::NumberLiteral {
                value: NumberValue::Int(42),
                ..
            }
        ));
        match first_arg("set(3.20)") {
            Node::NumberLiteral { text, value, .. } => {
                assert_eq!(text, "3.20");
                assert_eq!(value, NumberValue::Float(3.2));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_version_string_stays_string() {
        assert!(matches!(
            first_arg("set(1.0.0)"),
            Node::StringLiteral { quoted: false, .. }
        ));
        // `inf` spells a file name, not a float
        assert!(matches!(
            first_arg("set(inf)"),
            Node::StringLiteral { .. }
        ));
    }

    #[test]
    fn test_quoted_string() {
        match first_arg("set(\"a b\")") {
            Node::StringLiteral { value, quoted, .. } => {
                assert_eq!(value, "a b");
                assert!(quoted);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_quoted_interpolation_splits() {
        match first_arg("set(\"${PREFIX}_lib\")") {
            Node::List { elements, separator, .. } => {
                assert_eq!(separator, "");
                assert_eq!(elements.len(), 2);
                assert!(matches!(elements[0], Node::Variable { .. }));
                assert!(matches!(
                    &elements[1],
                    Node::StringLiteral { value, quoted: false, .. } if value == "_lib"
                ));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unquoted_adjacency_splits() {
        match first_arg("set(pre${X}post)") {
            Node::List { elements, .. } => {
                assert_eq!(elements.len(), 3);
                assert!(matches!(elements[1], Node::Variable { .. }));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_env_variable_scope() {
        match first_arg("set($ENV{HOME})") {
            Node::Variable { name, scope, .. } => {
                assert_eq!(name, "ENV{HOME}");
                assert_eq!(scope, VarScope::Env);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_generator_expr_preserved() {
        match first_arg("target_link_libraries(a $<$<CONFIG:Debug>:dbg>)") {
            Node::GeneratorExpr { text, .. } => {
                assert_eq!(text, "$<CONFIG:Debug>:dbg");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_bracket_argument() {
        match first_arg("set([=[raw ${X}]=])") {
            Node::BracketExpr { content, .. } => match *content {
                Node::StringLiteral { value, quoted, .. } => {
                    assert_eq!(value, "raw ${X}");
                    assert!(!quoted);
                }
                other => panic!("unexpected content: {:?}", other),
            },
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_paren_group_in_condition() {
        let outcome = Parser::new("if(NOT (A AND B))\nendif()\n", "t.cmake").parse_file();
        assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
    }

    #[test]
    fn test_semicolon_separated_args() {
        let outcome = Parser::new("set(L a;b;c)\n", "t.cmake").parse_file();
        assert!(outcome.is_clean());
    }
}
