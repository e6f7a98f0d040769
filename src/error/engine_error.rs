//! Engine-level error types.

use thiserror::Error;

/// Engine-level errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Template compile error: {0}")]
    Compile(String),
    #[error("Template render error: {0}")]
    Render(String),
    #[error("Template too large (max {max} bytes, got {actual} bytes)")]
    TemplateTooLarge { max: usize, actual: usize },
    #[error("Partial '{name}' failed to compile: {message}")]
    Partial { name: String, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<handlebars::TemplateError> for EngineError {
    fn from(e: handlebars::TemplateError) -> Self {
        EngineError::Compile(e.to_string())
    }
}

impl From<handlebars::RenderError> for EngineError {
    fn from(e: handlebars::RenderError) -> Self {
        EngineError::Render(e.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Config(e.to_string())
    }
}
