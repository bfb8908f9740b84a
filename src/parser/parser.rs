//! Parser implementation
//!
//! Recursive descent over the token stream. The top level only admits
//! declarations; everything executable lives inside task bodies.

use super::ast::*;
use crate::error::{KeelError, KeelResult, SourceLocation};
use crate::lexer::token::Literal as TokenLiteral;
use crate::lexer::{Keyword, Token, TokenType};

/// Parser for Buildfile source code
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parse tokens into a program
    pub fn parse(&mut self) -> KeelResult<Program> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.top_level()?);
            self.skip_semicolons();
        }

        Ok(Program { body })
    }

    // ===== Declarations =====

    fn top_level(&mut self) -> KeelResult<Stmt> {
        if self.match_keyword(Keyword::Let) {
            self.var_declaration(false, false)
        } else if self.match_keyword(Keyword::Const) {
            self.var_declaration(true, false)
        } else if self.match_keyword(Keyword::Env) {
            self.var_declaration(false, true)
        } else if self.match_keyword(Keyword::Task) {
            self.task_declaration()
        } else if self.match_keyword(Keyword::Tool) {
            self.tool_declaration()
        } else {
            Err(self.error(&format!(
                "Expected 'let', 'const', 'env', 'tool' or 'task' at top level, found {}",
                self.peek().token_type
            )))
        }
    }

    fn var_declaration(&mut self, is_const: bool, is_env: bool) -> KeelResult<Stmt> {
        let location = self.previous().location.clone();
        let keyword = self.previous().lexeme.clone();
        let name = self.consume_identifier("Expected variable name")?;

        let initializer = if self.match_token(TokenType::Assign) {
            Some(self.expression()?)
        } else if is_const || is_env {
            return Err(self.error(&format!("'{}' declaration of '{}' needs an initializer", keyword, name)));
        } else {
            None
        };

        Ok(Stmt::VarDecl {
            name,
            is_const,
            is_env,
            initializer,
            location,
        })
    }

    fn task_declaration(&mut self) -> KeelResult<Stmt> {
        let location = self.previous().location.clone();
        let name = self.consume_identifier("Expected task name after 'task'")?;

        let mut dependencies: Vec<String> = Vec::new();
        if self.match_keyword(Keyword::Depends) {
            if self.match_token(TokenType::LeftParen) {
                if !self.check(TokenType::RightParen) {
                    loop {
                        self.dependency(&name, &mut dependencies)?;
                        if !self.match_token(TokenType::Comma) || self.check(TokenType::RightParen) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RightParen, "Expected ')' after dependency list")?;
            } else {
                self.dependency(&name, &mut dependencies)?;
            }
        }

        self.consume(TokenType::LeftBrace, "Expected '{' before task body")?;
        let body = self.block_statements()?;

        Ok(Stmt::TaskDecl {
            name,
            dependencies,
            body,
            location,
        })
    }

    fn dependency(&mut self, task: &str, dependencies: &mut Vec<String>) -> KeelResult<()> {
        let location = self.peek().location.clone();
        let dependency = self.consume_identifier("Expected task name in dependency list")?;

        if dependency == task {
            return Err(KeelError::syntax_error(
                format!("Task '{}' cannot depend on itself", task),
                location,
            ));
        }
        if dependencies.contains(&dependency) {
            return Err(KeelError::syntax_error(
                format!("Task '{}' lists dependency '{}' more than once", task, dependency),
                location,
            ));
        }

        dependencies.push(dependency);
        Ok(())
    }

    fn tool_declaration(&mut self) -> KeelResult<Stmt> {
        let location = self.previous().location.clone();
        let name = self.consume_identifier("Expected tool name after 'tool'")?;
        self.consume(TokenType::LeftBrace, "Expected '{' after tool name")?;

        let mut options = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            let (platform, arch) = if self.match_token(TokenType::LeftBracket) {
                let platform = self.consume_identifier("Expected platform name in tool key")?;
                self.consume(TokenType::Comma, "Expected ',' between platform and architecture")?;
                let arch = self.consume_identifier("Expected architecture name in tool key")?;
                self.consume(TokenType::RightBracket, "Expected ']' after tool key")?;
                (PlatformKey::from_name(&platform), Some(arch))
            } else {
                let platform = self.consume_identifier("Expected platform name or '[platform, arch]'")?;
                (PlatformKey::from_name(&platform), None)
            };

            self.consume(TokenType::Colon, "Expected ':' after tool key")?;
            let value = self.expression()?;
            options.push(ToolOption { platform, arch, value });

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.consume(TokenType::RightBrace, "Expected '}' after tool entries")?;

        Ok(Stmt::ToolDecl {
            name,
            options,
            location,
        })
    }

    // ===== Statements =====

    fn statement(&mut self) -> KeelResult<Stmt> {
        if self.match_keyword(Keyword::Let) {
            self.var_declaration(false, false)
        } else if self.match_keyword(Keyword::Const) {
            self.var_declaration(true, false)
        } else if self.match_keyword(Keyword::Env) {
            self.var_declaration(false, true)
        } else if self.match_keyword(Keyword::Plat) {
            self.platform_block(BlockKind::Plat)
        } else if self.match_keyword(Keyword::Arch) {
            self.platform_block(BlockKind::Arch)
        } else if self.check_keyword(Keyword::Task) || self.check_keyword(Keyword::Tool) {
            Err(self.error(&format!(
                "'{}' declarations are only allowed at top level",
                self.peek().lexeme
            )))
        } else {
            self.expression_statement()
        }
    }

    fn platform_block(&mut self, kind: BlockKind) -> KeelResult<Stmt> {
        let location = self.previous().location.clone();
        let selector = self.consume_identifier(&format!("Expected name after '{}'", kind))?;

        self.consume(TokenType::LeftBrace, &format!("Expected '{{' after '{} {}'", kind, selector))?;
        let body = self.block_statements()?;

        let else_body = if self.match_keyword(Keyword::Else) {
            if self.match_keyword(Keyword::Plat) {
                Some(vec![self.platform_block(BlockKind::Plat)?])
            } else if self.match_keyword(Keyword::Arch) {
                Some(vec![self.platform_block(BlockKind::Arch)?])
            } else {
                self.consume(TokenType::LeftBrace, "Expected '{' after else")?;
                Some(self.block_statements()?)
            }
        } else {
            None
        };

        Ok(Stmt::PlatformBlock {
            kind,
            selector,
            body,
            else_body,
            location,
        })
    }

    fn expression_statement(&mut self) -> KeelResult<Stmt> {
        let expr = self.expression()?;
        let location = expr.location().clone();
        Ok(Stmt::Expression { expr, location })
    }

    fn block_statements(&mut self) -> KeelResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        self.skip_semicolons();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
            self.skip_semicolons();
        }

        self.consume(TokenType::RightBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    // ===== Expressions =====

    fn expression(&mut self) -> KeelResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> KeelResult<Expr> {
        let expr = self.term()?;

        if self.match_token(TokenType::Assign) {
            let location = self.previous().location.clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Identifier { name, location } => Ok(Expr::Assign {
                    target: name,
                    value,
                    location,
                }),
                _ => Err(KeelError::syntax_error("Invalid assignment target", location)),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> KeelResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_tokens(&[TokenType::Plus, TokenType::Minus]) {
            let location = self.previous().location.clone();
            let operator = match &self.previous().token_type {
                TokenType::Plus => BinaryOp::Add,
                _ => BinaryOp::Subtract,
            };
            let right = Box::new(self.factor()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right,
                location,
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> KeelResult<Expr> {
        let mut expr = self.call()?;

        while self.match_tokens(&[TokenType::Star, TokenType::Slash, TokenType::Percent]) {
            let location = self.previous().location.clone();
            let operator = match &self.previous().token_type {
                TokenType::Star => BinaryOp::Multiply,
                TokenType::Slash => BinaryOp::Divide,
                _ => BinaryOp::Modulo,
            };
            let right = Box::new(self.call()?);
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right,
                location,
            };
        }

        Ok(expr)
    }

    fn call(&mut self) -> KeelResult<Expr> {
        let mut expr = self.primary()?;

        while self.match_token(TokenType::LeftParen) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> KeelResult<Expr> {
        let location = self.previous().location.clone();
        let mut arguments = Vec::new();

        while !self.check(TokenType::RightParen) && !self.is_at_end() {
            arguments.push(self.argument()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.consume(TokenType::RightParen, "Expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
            location,
        })
    }

    fn argument(&mut self) -> KeelResult<Argument> {
        if self.match_spread() {
            return Ok(Argument::Spread(self.expression()?));
        }

        if self.check(TokenType::Identifier) && self.check_next(TokenType::Colon) {
            let name = self.advance().lexeme.clone();
            self.advance();
            let value = self.expression()?;
            return Ok(Argument::Named { name, value });
        }

        Ok(Argument::Positional(self.expression()?))
    }

    fn primary(&mut self) -> KeelResult<Expr> {
        let location = self.peek().location.clone();

        if let TokenType::Literal(lit) = &self.peek().token_type {
            let expr = match lit {
                TokenLiteral::Number(value) => Expr::Number {
                    value: *value,
                    location,
                },
                TokenLiteral::String(raw) => Expr::String {
                    raw: raw.clone(),
                    location,
                },
            };
            self.advance();
            return Ok(expr);
        }

        if self.check(TokenType::Identifier) {
            let name = self.advance().lexeme.clone();
            return Ok(match name.as_str() {
                "true" => Expr::Boolean { value: true, location },
                "false" => Expr::Boolean { value: false, location },
                _ => Expr::Identifier { name, location },
            });
        }

        if self.match_token(TokenType::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenType::RightParen, "Expected ')' after expression")?;
            return Ok(expr);
        }

        if self.match_token(TokenType::LeftBracket) {
            return self.array_literal(location);
        }

        Err(self.error(&format!("Expected expression, found {}", self.peek().token_type)))
    }

    fn array_literal(&mut self, location: SourceLocation) -> KeelResult<Expr> {
        let mut elements = Vec::new();

        while !self.check(TokenType::RightBracket) && !self.is_at_end() {
            if self.match_spread() {
                elements.push(ArrayElement::Spread(self.expression()?));
            } else {
                elements.push(ArrayElement::Item(self.expression()?));
            }
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.consume(TokenType::RightBracket, "Expected ']' after array elements")?;

        Ok(Expr::Array { elements, location })
    }

    // ===== Helper Methods =====

    /// Consume a `...` prefix if one is next.
    fn match_spread(&mut self) -> bool {
        let is_spread = (0..3).all(|offset| {
            self.tokens
                .get(self.current + offset)
                .is_some_and(|t| t.token_type == TokenType::Dot)
        });
        if is_spread {
            self.current += 3;
        }
        is_spread
    }

    fn skip_semicolons(&mut self) {
        while self.match_token(TokenType::Semicolon) {}
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for t in types {
            if self.check(t.clone()) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn match_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            false
        } else {
            std::mem::discriminant(&self.peek().token_type) == std::mem::discriminant(&token_type)
        }
    }

    fn check_next(&self, token_type: TokenType) -> bool {
        self.tokens.get(self.current + 1).is_some_and(|t| {
            std::mem::discriminant(&t.token_type) == std::mem::discriminant(&token_type)
        })
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        if self.is_at_end() {
            false
        } else {
            matches!(&self.peek().token_type, TokenType::Keyword(k) if *k == keyword)
        }
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self, token_type: TokenType, message: &str) -> KeelResult<&Token> {
        if self.check(token_type) {
            Ok(self.advance())
        } else {
            Err(self.error(message))
        }
    }

    fn consume_identifier(&mut self, message: &str) -> KeelResult<String> {
        if self.check(TokenType::Identifier) {
            Ok(self.advance().lexeme.clone())
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> KeelError {
        KeelError::syntax_error(message, self.peek().location.clone())
    }
}
