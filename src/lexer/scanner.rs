//! Lexer/Scanner implementation for the Keel language
//!
//! This module implements lexical analysis, converting source code into tokens.

use super::token::{Keyword, Literal, Token, TokenType};
use crate::error::{KeelError, KeelResult, SourceLocation};

/// Lexer for Buildfile source code
pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    start_line: usize,
    start_column: usize,
    current: usize,
    line: usize,
    column: usize,
    filename: Option<String>,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(source: &str, filename: Option<&str>) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            start_line: 1,
            start_column: 1,
            current: 0,
            line: 1,
            column: 1,
            filename: filename.map(|s| s.to_string()),
        }
    }

    /// Tokenize the source code
    pub fn tokenize(&mut self) -> KeelResult<Vec<Token>> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token()?;
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            self.current_location(),
        ));

        Ok(std::mem::take(&mut self.tokens))
    }

    fn scan_token(&mut self) -> KeelResult<()> {
        let c = self.advance();

        match c {
            ' ' | '\r' | '\t' | '\n' => Ok(()),

            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            ':' => self.add_token(TokenType::Colon),
            ';' => self.add_token(TokenType::Semicolon),
            '+' => self.add_token(TokenType::Plus),
            '-' => self.add_token(TokenType::Minus),
            '*' => self.add_token(TokenType::Star),
            '%' => self.add_token(TokenType::Percent),

            '=' => {
                if self.match_char('=') {
                    self.add_token(TokenType::Equal)
                } else {
                    self.add_token(TokenType::Assign)
                }
            }

            '!' => {
                if self.match_char('=') {
                    self.add_token(TokenType::NotEqual)
                } else {
                    Err(self.error_at_start("Unexpected character '!'. Did you mean '!='?"))
                }
            }

            '<' => {
                if self.match_char('=') {
                    self.add_token(TokenType::LessEqual)
                } else {
                    self.add_token(TokenType::Less)
                }
            }

            '>' => {
                if self.match_char('=') {
                    self.add_token(TokenType::GreaterEqual)
                } else {
                    self.add_token(TokenType::Greater)
                }
            }

            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    Ok(())
                } else {
                    self.add_token(TokenType::Slash)
                }
            }

            '"' | '\'' => self.scan_string(c),

            '.' => {
                if self.peek().is_ascii_digit() {
                    self.scan_number()
                } else {
                    self.add_token(TokenType::Dot)
                }
            }

            c if c.is_ascii_digit() => self.scan_number(),

            c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_identifier(),

            _ => Err(self.error_at_start(&format!("Unexpected character '{}'", c))),
        }
    }

    /// Scan a string literal. Contents are kept verbatim; a missing closing
    /// quote ends the string at end of input.
    fn scan_string(&mut self, quote: char) -> KeelResult<()> {
        let mut value = String::new();

        while self.peek() != quote && !self.is_at_end() {
            value.push(self.advance());
        }

        if !self.is_at_end() {
            self.advance();
        }

        self.add_token(TokenType::Literal(Literal::String(value)))
    }

    /// Scan a number literal. Called with the first digit or the leading
    /// '.' already consumed.
    fn scan_number(&mut self) -> KeelResult<()> {
        let mut seen_point = self.source[self.start] == '.';

        loop {
            let c = self.peek();
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !seen_point && self.peek_next().is_ascii_digit() {
                seen_point = true;
                self.advance();
            } else {
                break;
            }
        }

        let lexeme: String = self.source[self.start..self.current].iter().collect();
        let value = lexeme
            .parse::<f64>()
            .map_err(|_| self.error_at_start(&format!("Invalid number literal '{}'", lexeme)))?;
        self.add_token(TokenType::Literal(Literal::Number(value)))
    }

    fn scan_identifier(&mut self) -> KeelResult<()> {
        while self.peek().is_alphanumeric() || self.peek() == '_' || self.peek() == '$' {
            self.advance();
        }

        let lexeme: String = self.source[self.start..self.current].iter().collect();

        let token_type = if let Some(keyword) = Keyword::from_str(&lexeme) {
            TokenType::Keyword(keyword)
        } else {
            TokenType::Identifier
        };

        self.add_token(token_type)
    }

    fn add_token(&mut self, token_type: TokenType) -> KeelResult<()> {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        let location = SourceLocation::new(self.start_line, self.start_column, self.filename.clone());
        self.tokens.push(Token::new(token_type, lexeme, location));
        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            false
        } else {
            self.advance();
            true
        }
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.filename.clone())
    }

    fn error_at_start(&self, message: &str) -> KeelError {
        KeelError::syntax_error(
            message,
            SourceLocation::new(self.start_line, self.start_column, self.filename.clone()),
        )
    }
}
