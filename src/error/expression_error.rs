use thiserror::Error;

/// Arithmetic evaluator errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("Character '{ch}' at offset {offset} is not allowed in expressions")]
    Rejected { ch: char, offset: usize },
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Unexpected end of expression")]
    UnexpectedEnd,
    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),
    #[error("Expression nesting exceeds {0} levels")]
    TooDeep(usize),
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Result is not a finite number")]
    NonFinite,
}

impl ExpressionError {
    /// Rejections come from the allow-list check and never reach evaluation.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ExpressionError::Rejected { .. })
    }
}
