//! Restricted arithmetic for `custom` scoring formulas.
//!
//! The grammar only admits numbers, identifiers, `+ - * /`, unary signs and parentheses:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | primary
//! primary := number | identifier | '(' expr ')'
//! ```
//!
//! Identifiers are resolved as whole names against a variable bag at evaluation time, so
//! `q_1` and `q_10` never shadow each other.

use std::collections::{BTreeMap, BTreeSet};
use std::iter::Peekable;
use std::str::CharIndices;

/// Deepest run of unary signs and parentheses a formula may nest.
pub const MAX_NESTING: usize = 64;
/// Longest formula, in tokens, accepted by the parser.
pub const MAX_TOKENS: usize = 512;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,
    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },
    #[error("invalid number '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
    #[error("unexpected end of formula")]
    UnexpectedEnd,
    #[error("unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("formula produced a non-finite value")]
    NonFinite,
    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("formula has more than {limit} tokens")]
    TooLong { limit: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

/// Parsed formula ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(FormulaError::Empty);
        }
        if tokens.len() > MAX_TOKENS {
            return Err(FormulaError::TooLong { limit: MAX_TOKENS });
        }

        let mut parser = Parser {
            tokens,
            position: 0,
            depth: 0,
        };
        let expr = parser.expression()?;
        if let Some(trailing) = parser.peek() {
            return Err(trailing.unexpected());
        }

        Ok(Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Names referenced by the formula.
    pub fn variables(&self) -> BTreeSet<&str> {
        let mut names = BTreeSet::new();
        collect_variables(&self.expr, &mut names);
        names
    }

    pub fn evaluate(&self, variables: &BTreeMap<String, f64>) -> Result<f64, FormulaError> {
        let value = eval(&self.expr, variables)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }
}

/// Parse and evaluate in one step.
pub fn evaluate(source: &str, variables: &BTreeMap<String, f64>) -> Result<f64, FormulaError> {
    Formula::parse(source)?.evaluate(variables)
}

fn collect_variables<'a>(expr: &'a Expr, names: &mut BTreeSet<&'a str>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Variable(name) => {
            names.insert(name.as_str());
        }
        Expr::Negate(inner) => collect_variables(inner, names),
        Expr::Binary { lhs, rhs, .. } => {
            collect_variables(lhs, names);
            collect_variables(rhs, names);
        }
    }
}

fn eval(expr: &Expr, variables: &BTreeMap<String, f64>) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Variable(name) => variables
            .get(name)
            .copied()
            .ok_or_else(|| FormulaError::UnknownVariable(name.clone())),
        Expr::Negate(inner) => Ok(-eval(inner, variables)?),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, variables)?;
            let rhs = eval(rhs, variables)?;
            match op {
                BinaryOp::Add => Ok(lhs + rhs),
                BinaryOp::Subtract => Ok(lhs - rhs),
                BinaryOp::Multiply => Ok(lhs * rhs),
                BinaryOp::Divide if rhs == 0.0 => Err(FormulaError::DivisionByZero),
                BinaryOp::Divide => Ok(lhs / rhs),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    position: usize,
}

impl Spanned {
    fn unexpected(&self) -> FormulaError {
        let token = match &self.token {
            Token::Number(value) => value.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Plus => "+".to_string(),
            Token::Minus => "-".to_string(),
            Token::Star => "*".to_string(),
            Token::Slash => "/".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        };
        FormulaError::UnexpectedToken {
            token,
            position: self.position,
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Spanned>, FormulaError> {
    let mut chars = source.char_indices().peekable();
    let mut tokens = Vec::new();

    while let Some(&(position, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let literal = take_while(&mut chars, |c| c.is_ascii_digit() || c == '.');
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber {
                        literal: literal.clone(),
                        position,
                    })?;
                tokens.push(Spanned {
                    token: Token::Number(value),
                    position,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let name = take_while(&mut chars, |c| c.is_ascii_alphanumeric() || c == '_');
                tokens.push(Spanned {
                    token: Token::Ident(name),
                    position,
                });
                continue;
            }
            other => {
                return Err(FormulaError::UnexpectedCharacter {
                    ch: other,
                    position,
                })
            }
        };

        chars.next();
        tokens.push(Spanned { token, position });
    }

    Ok(tokens)
}

fn take_while(chars: &mut Peekable<CharIndices<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut text = String::new();
    while let Some(&(_, ch)) = chars.peek() {
        if !accept(ch) {
            break;
        }
        text.push(ch);
        chars.next();
    }
    text
}

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, FormulaError>,
    ) -> Result<T, FormulaError> {
        if self.depth >= MAX_NESTING {
            return Err(FormulaError::TooDeep { limit: MAX_NESTING });
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|spanned| &spanned.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|spanned| &spanned.token) {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek().map(|spanned| &spanned.token) {
            Some(Token::Minus) => {
                self.advance();
                let inner = self.nested(Self::unary)?;
                Ok(Expr::Negate(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::unary)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let spanned = self.advance().ok_or(FormulaError::UnexpectedEnd)?;
        match spanned.token {
            Token::Number(value) => Ok(Expr::Number(value)),
            Token::Ident(name) => Ok(Expr::Variable(name)),
            Token::LParen => {
                let inner = self.nested(Self::expression)?;
                match self.advance() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(other.unexpected()),
                    None => Err(FormulaError::UnexpectedEnd),
                }
            }
            _ => Err(spanned.unexpected()),
        }
    }
}
