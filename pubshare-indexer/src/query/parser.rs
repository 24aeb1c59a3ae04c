//! Tokenizer and recursive-descent parser for filter expressions.
//!
//! The grammar is the usual OData-style boolean filter:
//!
//! ```text
//! expr    := and ("or" and)*
//! and     := unary ("and" unary)*
//! unary   := "not" unary | primary
//! primary := "(" expr ")"
//!          | IDENT "(" [operand ("," operand)*] ")"
//!          | operand OP operand
//! operand := IDENT | STRING | NUMBER
//! OP      := "eq" | "ne" | "gt" | "ge" | "lt" | "le"
//! ```
//!
//! Strings are single-quoted; a doubled quote (`''`) stands for one quote.
//! The parser accepts the whole grammar. Deciding what can be evaluated is
//! left to the compiler.

use crate::error::{IndexError, IndexResult};
use std::fmt;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn parse(word: &str) -> Option<Self> {
        match word {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Ge => "ge",
            Self::Lt => "lt",
            Self::Le => "le",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field reference or a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Field(String),
    Literal(String),
}

/// Parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpr {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Call {
        name: String,
        args: Vec<Operand>,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Number(String),
    LParen,
    RParen,
    Comma,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '/')
}

fn tokenize(input: &str) -> IndexResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '\'' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '\'')) => {
                            if matches!(chars.peek(), Some((_, '\''))) {
                                chars.next();
                                value.push('\'');
                            } else {
                                break;
                            }
                        }
                        Some((_, ch)) => value.push(ch),
                        None => {
                            return Err(IndexError::InvalidQuery(format!(
                                "unterminated string starting at {pos}"
                            )));
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut number = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_ascii_digit() || matches!(ch, '-' | '.' | ':' | 'T' | 'Z' | '+') {
                        number.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(number));
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if is_ident_char(ch) {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(IndexError::InvalidQuery(format!(
                    "unexpected character {other:?} at {pos}"
                )));
            }
        }
    }
    Ok(tokens)
}

/// Deepest accepted nesting of parentheses and `not`.
const MAX_DEPTH: usize = 64;
/// Most `and`/`or` operators accepted in one filter.
const MAX_OPERATORS: usize = 1024;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(word)) if word == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> IndexResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(IndexError::InvalidQuery(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(IndexError::InvalidQuery(format!(
                "expected {expected:?}, found end of input"
            ))),
        }
    }

    fn descend(&mut self) -> IndexResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(IndexError::InvalidQuery(format!(
                "filter nested deeper than {MAX_DEPTH} levels"
            )));
        }
        Ok(())
    }

    fn count_operator(&mut self) -> IndexResult<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(IndexError::InvalidQuery(format!(
                "filter has more than {MAX_OPERATORS} operators"
            )));
        }
        Ok(())
    }

    fn expr(&mut self) -> IndexResult<FilterExpr> {
        let mut left = self.and()?;
        while self.eat_keyword("or") {
            self.count_operator()?;
            let right = self.and()?;
            left = FilterExpr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> IndexResult<FilterExpr> {
        let mut left = self.unary()?;
        while self.eat_keyword("and") {
            self.count_operator()?;
            let right = self.unary()?;
            left = FilterExpr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> IndexResult<FilterExpr> {
        if self.eat_keyword("not") {
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> IndexResult<FilterExpr> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            self.descend()?;
            let inner = self.expr()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }

        if let (Some(Token::Ident(name)), Some(Token::LParen)) = (self.peek(), self.peek_at(1)) {
            let name = name.clone();
            self.pos += 2;
            let mut args = Vec::new();
            if self.peek() != Some(&Token::RParen) {
                loop {
                    args.push(self.operand()?);
                    if self.peek() == Some(&Token::Comma) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
            }
            self.expect(Token::RParen)?;
            return Ok(FilterExpr::Call { name, args });
        }

        let left = self.operand()?;
        let op = match self.next() {
            Some(Token::Ident(word)) => CompareOp::parse(&word)
                .ok_or_else(|| IndexError::InvalidQuery(format!("unknown operator {word:?}")))?,
            Some(token) => {
                return Err(IndexError::InvalidQuery(format!(
                    "expected operator, found {token:?}"
                )));
            }
            None => {
                return Err(IndexError::InvalidQuery(
                    "expected operator, found end of input".to_string(),
                ));
            }
        };
        let right = self.operand()?;
        Ok(FilterExpr::Compare { left, op, right })
    }

    fn operand(&mut self) -> IndexResult<Operand> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(Operand::Field(name)),
            Some(Token::Str(value)) | Some(Token::Number(value)) => Ok(Operand::Literal(value)),
            Some(token) => Err(IndexError::InvalidQuery(format!(
                "expected field or literal, found {token:?}"
            ))),
            None => Err(IndexError::InvalidQuery(
                "expected field or literal, found end of input".to_string(),
            )),
        }
    }
}

/// Parses a filter expression.
pub fn parse(input: &str) -> IndexResult<FilterExpr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(IndexError::InvalidQuery("empty filter".to_string()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(IndexError::InvalidQuery(format!("unexpected trailing {token:?}")));
    }
    Ok(expr)
}
