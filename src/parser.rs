// Expression parser for the condition-query language

use crate::ast::{BinaryOp, Expr, UnaryOp};
use thiserror::Error;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Unclosed string literal")]
    UnclosedString,

    #[error("Invalid escape sequence: {0}")]
    InvalidEscape(String),

    #[error("Expected {expected}, found {found}")]
    Expected { expected: String, found: String },
}

/// Token types for the lexer
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    String(String),
    Number(f64),
    True,
    False,
    Null,

    // Identifiers
    Identifier(String),

    // Operators
    Bang,
    And,
    Or,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Question,
    Colon,
    Dot,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,

    // Special
    Eof,
}

/// Lexer for tokenizing condition-query expressions
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: String) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote_char: char) -> Result<String, ParserError> {
        let mut result = String::new();
        self.advance(); // skip opening quote

        loop {
            match self.current() {
                None => return Err(ParserError::UnclosedString),
                Some(ch) if ch == quote_char => {
                    self.advance(); // skip closing quote
                    return Ok(result);
                }
                Some('\\') => {
                    self.advance();
                    match self.current() {
                        None => return Err(ParserError::UnclosedString),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some(ch) => {
                            return Err(ParserError::InvalidEscape(format!("\\{}", ch)))
                        }
                    }
                    self.advance();
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }
    }

    fn read_number(&mut self) -> Result<f64, ParserError> {
        let start = self.position;

        // Optional minus sign
        if self.current() == Some('-') {
            self.advance();
        }

        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // Fractional part
        if self.current() == Some('.') && self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str: String = self.input[start..self.position].iter().collect();
        num_str
            .parse()
            .map_err(|_| ParserError::InvalidNumber(num_str))
    }

    fn read_identifier(&mut self) -> String {
        let start = self.position;

        while let Some(ch) = self.current() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        self.input[start..self.position].iter().collect()
    }

    pub fn next_token(&mut self) -> Result<Token, ParserError> {
        self.skip_whitespace();

        match self.current() {
            None => Ok(Token::Eof),

            // String literals
            Some('"') => Ok(Token::String(self.read_string('"')?)),
            Some('\'') => Ok(Token::String(self.read_string('\'')?)),

            // Numbers
            Some(ch) if ch.is_ascii_digit() => Ok(Token::Number(self.read_number()?)),
            Some('-') if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                Ok(Token::Number(self.read_number()?))
            }

            // Multi-character operators
            // `===`/`==` and `!==`/`!=` collapse to the same tokens:
            // equality in this language is always strict
            Some('=') if self.peek(1) == Some('=') => {
                self.advance();
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                }
                Ok(Token::Equal)
            }
            Some('!') if self.peek(1) == Some('=') => {
                self.advance();
                self.advance();
                if self.current() == Some('=') {
                    self.advance();
                }
                Ok(Token::NotEqual)
            }
            Some('&') if self.peek(1) == Some('&') => {
                self.advance();
                self.advance();
                Ok(Token::And)
            }
            Some('|') if self.peek(1) == Some('|') => {
                self.advance();
                self.advance();
                Ok(Token::Or)
            }
            Some('<') if self.peek(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(Token::LessThanOrEqual)
            }
            Some('>') if self.peek(1) == Some('=') => {
                self.advance();
                self.advance();
                Ok(Token::GreaterThanOrEqual)
            }

            // Single-character operators and delimiters
            Some('!') => {
                self.advance();
                Ok(Token::Bang)
            }
            Some('<') => {
                self.advance();
                Ok(Token::LessThan)
            }
            Some('>') => {
                self.advance();
                Ok(Token::GreaterThan)
            }
            Some('?') => {
                self.advance();
                Ok(Token::Question)
            }
            Some(':') => {
                self.advance();
                Ok(Token::Colon)
            }
            Some('.') => {
                self.advance();
                Ok(Token::Dot)
            }
            Some('(') => {
                self.advance();
                Ok(Token::LeftParen)
            }
            Some(')') => {
                self.advance();
                Ok(Token::RightParen)
            }
            Some(',') => {
                self.advance();
                Ok(Token::Comma)
            }

            // Identifiers and keywords
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                Ok(match ident.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" | "undefined" => Token::Null,
                    _ => Token::Identifier(ident),
                })
            }

            Some(ch) => Err(ParserError::UnexpectedToken(ch.to_string())),
        }
    }
}

/// Parser for condition-query expressions using Pratt parsing
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
}

impl Parser {
    pub fn new(input: String) -> Result<Self, ParserError> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
        })
    }

    fn advance(&mut self) -> Result<(), ParserError> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParserError> {
        if std::mem::discriminant(&self.current_token) == std::mem::discriminant(&expected) {
            self.advance()?;
            Ok(())
        } else {
            Err(ParserError::Expected {
                expected: format!("{:?}", expected),
                found: format!("{:?}", self.current_token),
            })
        }
    }

    /// Get the binding power (precedence) for the current token
    fn binding_power(&self, token: &Token) -> Option<(u8, u8)> {
        // Returns (left_bp, right_bp); higher numbers bind tighter
        match token {
            Token::Question => Some((20, 21)),
            Token::Or => Some((25, 26)),
            Token::And => Some((30, 31)),
            Token::Equal | Token::NotEqual => Some((40, 41)),
            Token::LessThan
            | Token::LessThanOrEqual
            | Token::GreaterThan
            | Token::GreaterThanOrEqual => Some((45, 46)),
            Token::Dot => Some((75, 76)),
            Token::LeftParen => Some((80, 81)),
            _ => None,
        }
    }

    /// Parse a primary expression (literals, identifiers, negation, grouping)
    fn parse_primary(&mut self) -> Result<Expr, ParserError> {
        match &self.current_token {
            Token::String(s) => {
                let value = s.clone();
                self.advance()?;
                Ok(Expr::String(value))
            }
            Token::Number(n) => {
                let value = *n;
                self.advance()?;
                Ok(Expr::Number(value))
            }
            Token::True => {
                self.advance()?;
                Ok(Expr::Boolean(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expr::Boolean(false))
            }
            Token::Null => {
                self.advance()?;
                Ok(Expr::Null)
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Expr::Identifier(name))
            }
            Token::Bang => {
                self.advance()?;
                let operand = self.parse_expression(70)?; // binds tighter than any binary op
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }
            Token::LeftParen => {
                self.advance()?; // skip '('
                let inner = self.parse_expression(0)?;
                self.expect(Token::RightParen)?;
                Ok(inner)
            }
            Token::Eof => Err(ParserError::UnexpectedEnd),
            _ => Err(ParserError::UnexpectedToken(format!(
                "{:?}",
                self.current_token
            ))),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, ParserError> {
        // current token is '('
        self.advance()?;
        let mut args = Vec::new();

        if self.current_token != Token::RightParen {
            loop {
                args.push(self.parse_expression(0)?);

                if self.current_token != Token::Comma {
                    break;
                }
                self.advance()?;
            }
        }

        self.expect(Token::RightParen)?;
        Ok(args)
    }

    /// Parse an expression with Pratt parsing
    fn parse_expression(&mut self, min_bp: u8) -> Result<Expr, ParserError> {
        let mut lhs = self.parse_primary()?;

        loop {
            if matches!(
                self.current_token,
                Token::Eof | Token::RightParen | Token::Comma | Token::Colon
            ) {
                break;
            }

            let (left_bp, right_bp) = match self.binding_power(&self.current_token) {
                Some(bp) => bp,
                None => break,
            };

            if left_bp < min_bp {
                break;
            }

            match &self.current_token {
                Token::Dot => {
                    self.advance()?;
                    let name = match &self.current_token {
                        Token::Identifier(name) => name.clone(),
                        other => {
                            return Err(ParserError::Expected {
                                expected: "property name".to_string(),
                                found: format!("{:?}", other),
                            })
                        }
                    };
                    self.advance()?;

                    // a property followed by '(' is a method call
                    if self.current_token == Token::LeftParen {
                        let args = self.parse_arguments()?;
                        lhs = Expr::Method {
                            target: Box::new(lhs),
                            name,
                            args,
                        };
                    } else {
                        lhs = Expr::Member {
                            target: Box::new(lhs),
                            name,
                        };
                    }
                }
                Token::LeftParen => {
                    let name = match &lhs {
                        Expr::Identifier(name) => name.clone(),
                        _ => {
                            return Err(ParserError::InvalidSyntax(
                                "Only named functions can be called".to_string(),
                            ))
                        }
                    };
                    let args = self.parse_arguments()?;
                    lhs = Expr::Function { name, args };
                }
                Token::Question => {
                    self.advance()?;
                    let then_branch = self.parse_expression(0)?;

                    // the else branch re-admits `?` itself, so chained
                    // ternaries associate to the right as in JavaScript:
                    // a ? b : c ? d : e is a ? b : (c ? d : e)
                    let else_branch = if self.current_token == Token::Colon {
                        self.advance()?;
                        Some(Box::new(self.parse_expression(left_bp)?))
                    } else {
                        None
                    };

                    lhs = Expr::Conditional {
                        condition: Box::new(lhs),
                        then_branch: Box::new(then_branch),
                        else_branch,
                    };
                }
                _ => {
                    let op = match &self.current_token {
                        Token::And => BinaryOp::And,
                        Token::Or => BinaryOp::Or,
                        Token::Equal => BinaryOp::Equal,
                        Token::NotEqual => BinaryOp::NotEqual,
                        Token::LessThan => BinaryOp::LessThan,
                        Token::LessThanOrEqual => BinaryOp::LessThanOrEqual,
                        Token::GreaterThan => BinaryOp::GreaterThan,
                        Token::GreaterThanOrEqual => BinaryOp::GreaterThanOrEqual,
                        _ => {
                            return Err(ParserError::UnexpectedToken(format!(
                                "{:?}",
                                self.current_token
                            )))
                        }
                    };

                    self.advance()?;
                    let rhs = self.parse_expression(right_bp)?;

                    lhs = Expr::Binary {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                }
            }
        }

        Ok(lhs)
    }

    pub fn parse(&mut self) -> Result<Expr, ParserError> {
        let ast = self.parse_expression(0)?;

        if self.current_token != Token::Eof {
            return Err(ParserError::Expected {
                expected: "end of expression".to_string(),
                found: format!("{:?}", self.current_token),
            });
        }

        Ok(ast)
    }
}

/// Parse a condition-query expression string into an AST
///
/// This is the main entry point for parsing.
pub fn parse(expression: &str) -> Result<Expr, ParserError> {
    let mut parser = Parser::new(expression.to_string())?;
    parser.parse()
}
