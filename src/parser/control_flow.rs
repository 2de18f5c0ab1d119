//! Control-flow parsing: if/elseif/else, foreach, while, function, macro
//!
//! Blocks run until one of a fixed terminator set; every `end*` keyword
//! consumes its (empty) parenthesis pair. Function and macro bodies are
//! stored unexpanded.

use super::Parser;
use crate::ast::{ElseIf, IStr, LoopKind, Node};
use crate::error::{ParseCategory, Result};
use crate::lexer::TokenKind;

impl Parser {
    pub(crate) fn parse_if_statement(&mut self) -> Result<Node> {
        let start_loc = self.current_token().location.clone();
        self.expect_keyword("if")?;
        self.skip_trivia();
        self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            "expected '(' after 'if'",
        )?;
        let condition = Box::new(self.parse_expression()?);
        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            "expected ')' after condition",
        )?;
        self.skip_trivia_and_newlines();

        let terminators = ["else", "elseif", "endif"];
        let then_branch = self.parse_block_until(&terminators)?;

        let mut elseifs = Vec::new();
        let mut else_branch = None;

        while let Some(name) = self.current_ident() {
            match name.as_str() {
                "elseif" => {
                    let arm_loc = self.current_token().location.clone();
                    self.advance();
                    self.skip_trivia();
                    self.consume(
                        TokenKind::LeftParen,
                        ParseCategory::UnbalancedParens,
                        "expected '(' after 'elseif'",
                    )?;
                    let condition = Box::new(self.parse_expression()?);
                    self.consume(
                        TokenKind::RightParen,
                        ParseCategory::UnbalancedParens,
                        "expected ')' after elseif condition",
                    )?;
                    self.skip_trivia_and_newlines();
                    let body = self.parse_block_until(&terminators)?;
                    elseifs.push(ElseIf {
                        condition,
                        body,
                        location: arm_loc,
                    });
                }
                "else" => {
                    self.advance();
                    self.skip_trivia();
                    self.consume(
                        TokenKind::LeftParen,
                        ParseCategory::UnbalancedParens,
                        "expected '(' after 'else'",
                    )?;
                    self.consume(
                        TokenKind::RightParen,
                        ParseCategory::UnbalancedParens,
                        "expected ')' after 'else('",
                    )?;
                    self.skip_trivia_and_newlines();
                    let body = self.parse_block_until(&["endif"])?;
                    else_branch = Some(body);
                    break; // nothing follows an else but endif
                }
                _ => break,
            }
        }

        self.expect_block_end("endif")?;

        Ok(Node::If {
            condition,
            then_branch,
            elseifs,
            else_branch,
            location: start_loc,
        })
    }

    pub(crate) fn parse_while_statement(&mut self) -> Result<Node> {
        let start_loc = self.current_token().location.clone();
        self.expect_keyword("while")?;
        self.skip_trivia();
        self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            "expected '(' after 'while'",
        )?;
        let condition = Box::new(self.parse_expression()?);
        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            "expected ')' after condition",
        )?;
        self.skip_trivia_and_newlines();

        let body = self.parse_block_until(&["endwhile"])?;
        self.expect_block_end("endwhile")?;

        Ok(Node::While {
            condition,
            body,
            location: start_loc,
        })
    }

    pub(crate) fn parse_foreach_statement(&mut self) -> Result<Node> {
        let start_loc = self.current_token().location.clone();
        self.expect_keyword("foreach")?;
        self.skip_trivia();
        self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            "expected '(' after 'foreach'",
        )?;
        self.skip_trivia();

        // Loop variables run until an IN or RANGE keyword, or until the
        // arguments stop looking like identifiers.
        let mut vars: Vec<IStr> = Vec::new();
        while let Some(name) = self.current_ident() {
            if name == "IN" || name == "RANGE" {
                break;
            }
            vars.push(self.intern(&name));
            self.advance();
            self.skip_trivia();
        }

        if vars.is_empty() {
            return Err(self.error_at_current(
                ParseCategory::TooFewArguments,
                "expected loop variable in foreach",
            ));
        }

        let loop_kind = self.parse_foreach_loop_kind();

        // Short form `foreach(v a b c)` keeps the first identifier as the
        // loop variable; the rest already collected are items.
        let mut items: Vec<Node> = Vec::new();
        if loop_kind == LoopKind::In && vars.len() > 1 {
            let extra = vars.split_off(1);
            for name in extra {
                items.push(Node::StringLiteral {
                    value: name.to_string(),
                    quoted: false,
                    location: start_loc.clone(),
                });
            }
        }
        items.extend(self.parse_arguments()?);

        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            "expected ')' after foreach arguments",
        )?;
        self.skip_trivia_and_newlines();

        let body = self.parse_block_until(&["endforeach"])?;
        self.expect_block_end("endforeach")?;

        Ok(Node::ForEach {
            vars,
            loop_kind,
            items,
            body,
            location: start_loc,
        })
    }

    /// `IN LISTS` / `IN ITEMS` / `IN ZIP_LISTS` / bare `IN` / `RANGE`;
    /// absent keywords mean the short item form.
    fn parse_foreach_loop_kind(&mut self) -> LoopKind {
        match self.current_ident().as_deref() {
            Some("RANGE") => {
                self.advance();
                LoopKind::Range
            }
            Some("IN") => {
                self.advance();
                self.skip_trivia();
                match self.current_ident().as_deref() {
                    Some("LISTS") => {
                        self.advance();
                        LoopKind::InLists
                    }
                    Some("ITEMS") => {
                        self.advance();
                        LoopKind::InItems
                    }
                    Some("ZIP_LISTS") => {
                        self.advance();
                        LoopKind::InZipLists
                    }
                    _ => LoopKind::In,
                }
            }
            _ => LoopKind::In,
        }
    }

    pub(crate) fn parse_function_def(&mut self) -> Result<Node> {
        self.parse_callable_def("function", "endfunction", true)
    }

    pub(crate) fn parse_macro_def(&mut self) -> Result<Node> {
        self.parse_callable_def("macro", "endmacro", false)
    }

    /// Shared shape of `function(name params...)` and `macro(...)`.
    fn parse_callable_def(
        &mut self,
        keyword: &str,
        end_keyword: &str,
        is_function: bool,
    ) -> Result<Node> {
        let start_loc = self.current_token().location.clone();
        self.expect_keyword(keyword)?;
        self.skip_trivia();
        self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            &format!("expected '(' after '{}'", keyword),
        )?;
        self.skip_trivia();

        let name = match self.current_ident() {
            Some(name) => {
                self.advance();
                self.intern(&name)
            }
            None => {
                return Err(self.error_at_current(
                    ParseCategory::TooFewArguments,
                    &format!("expected {} name", keyword),
                ))
            }
        };
        self.skip_trivia();

        let mut params = Vec::new();
        while !self.check(TokenKind::RightParen) && !self.check(TokenKind::Eof) {
            match self.current_ident() {
                Some(param) => {
                    params.push(self.intern(&param));
                    self.advance();
                }
                None => {
                    // Skip non-identifier noise inside the parameter list.
                    self.advance();
                }
            }
            self.skip_trivia();
        }

        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            &format!("expected ')' after {} parameters", keyword),
        )?;
        self.skip_trivia_and_newlines();

        // Bodies stay unexpanded; invocations are never inlined.
        let body = self.parse_block_until(&[end_keyword])?;
        self.expect_block_end(end_keyword)?;

        if is_function {
            Ok(Node::FunctionDef {
                name,
                params,
                body,
                location: start_loc,
            })
        } else {
            Ok(Node::MacroDef {
                name,
                params,
                body,
                location: start_loc,
            })
        }
    }

    /// Parse statements until one of `terminators` begins a line (or EOF).
    /// Failed statements are recovered into `Node::Error` stand-ins.
    pub(crate) fn parse_block_until(&mut self, terminators: &[&str]) -> Result<Vec<Node>> {
        let mut statements = Vec::new();

        loop {
            self.skip_trivia_and_newlines();
            if self.check(TokenKind::Eof) || self.at_block_terminator(terminators) {
                break;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    let node = self.error_node_for(&err);
                    self.report_error(err);
                    self.synchronize();
                    statements.push(node);
                }
            }
        }

        Ok(statements)
    }

    fn at_block_terminator(&mut self, terminators: &[&str]) -> bool {
        match self.current_ident() {
            Some(name) => terminators.iter().any(|t| *t == name),
            None => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        match self.current_ident() {
            Some(name) if name == keyword => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error_at_current(
                ParseCategory::UnexpectedToken,
                &format!("expected '{}'", keyword),
            )),
        }
    }

    /// `end*` keyword plus its parenthesis pair. Arguments inside the
    /// pair (the legacy `endif(COND)` form) are accepted and ignored.
    fn expect_block_end(&mut self, keyword: &str) -> Result<()> {
        match self.current_ident() {
            Some(name) if name == keyword => {
                self.advance();
            }
            _ => {
                return Err(self.error_at_current(
                    ParseCategory::UnexpectedEof,
                    &format!("expected '{}()'", keyword),
                ))
            }
        }
        self.skip_trivia();
        self.consume(
            TokenKind::LeftParen,
            ParseCategory::UnbalancedParens,
            &format!("expected '(' after '{}'", keyword),
        )?;
        let _ = self.parse_arguments()?;
        self.consume(
            TokenKind::RightParen,
            ParseCategory::UnbalancedParens,
            &format!("expected ')' after '{}('", keyword),
        )?;
        Ok(())
    }
}
