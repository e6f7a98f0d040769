//! Error types for the render engine.
//!
//! - [`EngineError`]: Compile, render and registration failures of the engine.
//! - [`HelperError`]: Failures raised by a single helper invocation.
//! - [`ExpressionError`]: Rejections and failures of the arithmetic evaluator.

pub mod engine_error;
pub mod expression_error;
pub mod helper_error;

pub use engine_error::EngineError;
pub use expression_error::ExpressionError;
pub use helper_error::HelperError;

/// Convenience alias for engine-level results.
pub type EngineResult<T> = Result<T, EngineError>;
