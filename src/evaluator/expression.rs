//! Restricted arithmetic evaluator behind the `math` helper.
//!
//! Evaluation happens in three steps:
//!
//! 1. identifiers are replaced by numbers from a caller-supplied resolver,
//! 2. the substituted text is checked against a fixed character allow-list
//!    (digits, `.`, `+ - * / %`, parentheses, whitespace) and rejected on the
//!    first foreign character,
//! 3. the remaining text is tokenized and evaluated by a recursive-descent
//!    parser that only knows numbers, the binary operators `+ - * / % **`,
//!    unary signs and parentheses.
//!
//! Nothing outside that grammar is ever interpreted.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::OnceLock;

use regex::Regex;

use super::type_coercion::format_number;
use crate::error::ExpressionError;

/// Maximum nesting of parentheses and unary operators.
pub const MAX_DEPTH: usize = 64;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*\b")
            .expect("identifier pattern is valid")
    })
}

/// Replace every identifier the resolver knows with its numeric value.
/// Unknown identifiers are left in place so the allow-list rejects them.
pub fn substitute_variables<F>(expr: &str, resolve: F) -> String
where
    F: Fn(&str) -> Option<f64>,
{
    identifier_pattern()
        .replace_all(expr, |caps: &regex::Captures<'_>| {
            let name = &caps[0];
            match resolve(name).filter(|n| n.is_finite()) {
                Some(n) if n < 0.0 => format!("({})", format_number(n)),
                Some(n) => format_number(n),
                None => name.to_string(),
            }
        })
        .into_owned()
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_digit()
        || ch.is_ascii_whitespace()
        || matches!(ch, '.' | '+' | '-' | '*' | '/' | '%' | '(' | ')')
}

/// Allow-list check. Runs before any tokenizing or evaluation.
pub fn check_allowed(expr: &str) -> Result<(), ExpressionError> {
    match expr.char_indices().find(|(_, ch)| !is_allowed(*ch)) {
        Some((offset, ch)) => Err(ExpressionError::Rejected { ch, offset }),
        None => Ok(()),
    }
}

/// Evaluate an already-substituted expression.
pub fn evaluate(expr: &str) -> Result<f64, ExpressionError> {
    check_allowed(expr)?;
    let tokens = tokenize(expr)?;
    let mut parser = Parser::new(&tokens);
    let value = parser.expression()?;
    if let Some(token) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken(token.to_string()));
    }
    if !value.is_finite() {
        return Err(ExpressionError::NonFinite);
    }
    Ok(value)
}

/// Substitute variables, then evaluate.
pub fn evaluate_with<F>(expr: &str, resolve: F) -> Result<f64, ExpressionError>
where
    F: Fn(&str) -> Option<f64>,
{
    evaluate(&substitute_variables(expr, resolve))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Power,
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", format_number(*n)),
            Token::Plus => f.write_str("+"),
            Token::Minus => f.write_str("-"),
            Token::Star => f.write_str("*"),
            Token::Slash => f.write_str("/"),
            Token::Percent => f.write_str("%"),
            Token::Power => f.write_str("**"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars: Peekable<CharIndices<'_>> = expr.char_indices().peekable();

    while let Some((offset, ch)) = chars.next() {
        let token = match ch {
            c if c.is_ascii_whitespace() => continue,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                if matches!(chars.peek(), Some((_, '*'))) {
                    chars.next();
                    Token::Power
                } else {
                    Token::Star
                }
            }
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let mut end = offset + c.len_utf8();
                while let Some((idx, next)) = chars.peek().copied() {
                    if next.is_ascii_digit() || next == '.' {
                        end = idx + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let literal = &expr[offset..end];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber(literal.to_string()))?;
                Token::Number(value)
            }
            other => return Err(ExpressionError::Rejected { ch: other, offset }),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn enter(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.term()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Plus => {
                    self.advance();
                    value += self.term()?;
                }
                Token::Minus => {
                    self.advance();
                    value -= self.term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64, ExpressionError> {
        let mut value = self.unary()?;
        while let Some(token) = self.peek() {
            match token {
                Token::Star => {
                    self.advance();
                    value *= self.unary()?;
                }
                Token::Slash => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    value /= divisor;
                }
                Token::Percent => {
                    self.advance();
                    let divisor = self.unary()?;
                    if divisor == 0.0 {
                        return Err(ExpressionError::DivisionByZero);
                    }
                    value %= divisor;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> Result<f64, ExpressionError> {
        self.enter()?;
        let result = match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.unary().map(|v| -v)
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        };
        self.leave();
        result
    }

    // power := primary ('**' unary)?
    fn power(&mut self) -> Result<f64, ExpressionError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Power) {
            self.advance();
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary := number | '(' expression ')'
    fn primary(&mut self) -> Result<f64, ExpressionError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                self.enter()?;
                let value = self.expression();
                self.leave();
                let value = value?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(other) => Err(ExpressionError::UnexpectedToken(other.to_string())),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ExpressionError::UnexpectedToken(other.to_string())),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }
}
