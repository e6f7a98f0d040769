//! # XRender: a Handlebars Render Engine with Sandboxed Helpers
//!
//! `xrender` turns short author-written templates into text against a
//! dynamic JSON context, through a library of helper functions. It provides:
//!
//! - **Helper catalogs**: field access, relations, media, formatting,
//!   conditionals, collections and arithmetic, all behind one helper
//!   signature.
//! - **Dual calling convention**: every helper can be used inline or in block
//!   form; block helpers get render callbacks for their body and
//!   else-branch.
//! - **Failure containment**: a failing or panicking helper writes
//!   `[Helper Error: name]` in its slot and the rest of the template renders.
//! - **Restricted arithmetic**: `{{math "a + b * 2"}}` substitutes variables
//!   and evaluates a fixed arithmetic grammar behind a character allow-list.
//! - **Output escaping**: plain values are escaped, [`SafeString`] markup is
//!   written verbatim.
//! - **Compiled-template cache**: keyed by source and compile options,
//!   LRU-bounded, safe to share across threads.
//!
//! # Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use xrender::{CompileOptions, RenderContext, RenderEngine};
//!
//! let engine = RenderEngine::new();
//! let ctx = RenderContext::new(json!({"title": "Hello", "price": 25000}));
//! let out = engine.render(
//!     "{{title}}: {{formatCurrency price}}",
//!     &ctx,
//!     &CompileOptions::default(),
//! );
//! assert_eq!(out, "Hello: ₩25,000");
//! ```

pub mod builder;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod helpers;
pub mod sandbox;

pub use builder::TemplateBuilder;
pub use config::{CompileOptions, RenderConfig};
pub use context::RenderContext;
pub use engine::{CacheStats, CompiledTemplate, RenderEngine, ValidationReport};
pub use error::{EngineError, EngineResult, ExpressionError, HelperError};
pub use sandbox::{
    BlockRenderer, CallingConvention, HelperCall, HelperEntry, HelperOutput, HelperResult,
    SafeString, TemplateHelper,
};
