use handlebars::Handlebars;
use serde_json::Value;

use crate::config::CompileOptions;
use crate::context::RenderContext;
use crate::error::EngineResult;

const TEMPLATE_NAME: &str = "__template";

/// A compiled template, ready to render against any context.
///
/// Owns a snapshot of the helper and partial registry taken at compile time,
/// so helpers registered later never change an already compiled template.
pub struct CompiledTemplate {
    registry: Handlebars<'static>,
    options: CompileOptions,
}

impl CompiledTemplate {
    pub fn compile(
        mut registry: Handlebars<'static>,
        source: &str,
        options: &CompileOptions,
    ) -> EngineResult<Self> {
        registry.set_strict_mode(options.strict);
        if options.no_escape {
            registry.register_escape_fn(handlebars::no_escape);
        }
        registry.register_template_string(TEMPLATE_NAME, source)?;
        Ok(Self {
            registry,
            options: *options,
        })
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Render against an already merged context value.
    pub fn render(&self, data: &Value) -> EngineResult<String> {
        Ok(self.registry.render(TEMPLATE_NAME, data)?)
    }

    pub fn render_context(&self, ctx: &RenderContext) -> EngineResult<String> {
        self.render(&ctx.to_value())
    }
}

impl std::fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("options", &self.options)
            .finish()
    }
}
