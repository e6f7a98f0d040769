use thiserror::Error;

use super::ExpressionError;

/// Errors raised while a single helper runs. The sandbox turns every one of
/// them into an inline marker; none of them escape a render.
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Block render failed: {0}")]
    Block(String),
    #[error("Block nesting exceeded the limit of {0}")]
    DepthExceeded(usize),
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),
    #[error("Helper panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Failed(String),
}

impl HelperError {
    pub fn invalid(message: impl Into<String>) -> Self {
        HelperError::InvalidArgument(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        HelperError::Failed(message.into())
    }
}
