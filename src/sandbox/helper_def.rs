//! Adapter installing [`TemplateHelper`]s into the Handlebars registry.
//!
//! Every helper, built-in or custom, runs through [`SandboxedHelper`]: it
//! builds a [`HelperCall`] from the invocation, executes the helper inside a
//! failure boundary, and writes the result through the output policy. A
//! failing helper costs one substitution, never the render.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use handlebars::{
    BlockContext, Context, Handlebars, Helper, HelperDef, Output, RenderContext as HbRenderContext,
    RenderError, Renderable, ScopedJson, Template,
};
use serde_json::{Map, Value};

use super::types::{
    BlockRenderer, CallingConvention, HelperCall, HelperEntry, HelperOutput, HelperResult,
};
use crate::error::HelperError;
use crate::evaluator::{is_truthy, to_display_string};

thread_local! {
    static BLOCK_DEPTH: Cell<usize> = Cell::new(0);
}

/// Inline text written in place of a failed helper.
pub fn error_marker(name: &str) -> String {
    format!("[Helper Error: {}]", name)
}

pub struct SandboxedHelper {
    entry: HelperEntry,
    max_depth: usize,
}

impl SandboxedHelper {
    pub fn new(entry: HelperEntry, max_depth: usize) -> Self {
        Self { entry, max_depth }
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    /// Run the helper; errors and panics both come back as `Err`.
    pub fn invoke(&self, call: &mut HelperCall<'_>) -> HelperResult {
        match panic::catch_unwind(AssertUnwindSafe(|| self.entry.helper.call(call))) {
            Ok(result) => result,
            Err(payload) => Err(HelperError::Panicked(panic_message(payload.as_ref()))),
        }
    }

    /// Replace a failure with the helper's error marker.
    pub fn contain(&self, result: HelperResult) -> HelperOutput {
        match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(helper = %self.entry.name, error = %e, "helper failed");
                HelperOutput::safe(error_marker(&self.entry.name))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl HelperDef for SandboxedHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut HbRenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let mut call = HelperCall::new(h.name(), collect_params(h))
            .with_hash(collect_hash(h))
            .with_this(current_scope(ctx, rc))
            .with_root_ref(ctx.data());
        let output = self.contain(self.invoke(&mut call));
        Ok(ScopedJson::Derived(output.into_value()))
    }

    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut HbRenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> handlebars::HelperResult {
        let this = current_scope(ctx, rc);
        let params = collect_params(h);
        let hash = collect_hash(h);

        let result = if h.is_block() {
            let mut block = HandlebarsBlock {
                template: h.template(),
                inverse: h.inverse(),
                registry: r,
                context: ctx,
                rc: &mut *rc,
                max_depth: self.max_depth,
            };
            let result = {
                let mut call = HelperCall::new(h.name(), params)
                    .with_hash(hash)
                    .with_this(this)
                    .with_root_ref(ctx.data())
                    .with_block(&mut block);
                self.invoke(&mut call)
            };
            match (self.entry.convention, result) {
                (CallingConvention::Inline, Ok(HelperOutput::Value(value))) => {
                    with_scope(&mut block, value)
                }
                (_, other) => other,
            }
        } else {
            let mut call = HelperCall::new(h.name(), params)
                .with_hash(hash)
                .with_this(this)
                .with_root_ref(ctx.data());
            self.invoke(&mut call)
        };

        let output = self.contain(result);
        let text = match output {
            HelperOutput::Safe(safe) => safe.into_string(),
            HelperOutput::Value(value) => {
                let rendered = to_display_string(&value);
                if rc.is_disable_escape() {
                    rendered
                } else {
                    r.get_escape_fn()(&rendered)
                }
            }
        };
        out.write(&text)?;
        Ok(())
    }
}

/// Inline helpers used in block form: a truthy value becomes the scope.
fn with_scope(block: &mut dyn BlockRenderer, value: Value) -> HelperResult {
    let rendered = if is_truthy(&value) {
        block.render_with(&value, &[])?
    } else {
        block.inverse()?
    };
    Ok(HelperOutput::safe(rendered))
}

fn collect_params(h: &Helper<'_>) -> Vec<Value> {
    h.params().iter().map(|p| p.value().clone()).collect()
}

fn collect_hash(h: &Helper<'_>) -> Map<String, Value> {
    h.hash()
        .iter()
        .map(|(key, value)| (key.to_string(), value.value().clone()))
        .collect()
}

fn current_scope<'reg: 'rc, 'rc>(ctx: &'rc Context, rc: &HbRenderContext<'reg, 'rc>) -> Value {
    rc.evaluate(ctx, "this")
        .map(|json| json.as_json().clone())
        .unwrap_or_else(|_| ctx.data().clone())
}

// ================================
// Block callbacks over Handlebars
// ================================

struct HandlebarsBlock<'a, 'reg, 'rc> {
    template: Option<&'rc Template>,
    inverse: Option<&'rc Template>,
    registry: &'reg Handlebars<'reg>,
    context: &'rc Context,
    rc: &'a mut HbRenderContext<'reg, 'rc>,
    max_depth: usize,
}

impl<'a, 'reg: 'rc, 'rc> HandlebarsBlock<'a, 'reg, 'rc> {
    fn run(
        &mut self,
        template: Option<&'rc Template>,
        scope: Option<&Value>,
        locals: &[(&str, Value)],
    ) -> Result<String, HelperError> {
        let Some(template) = template else {
            return Ok(String::new());
        };
        let _depth = DepthGuard::enter(self.max_depth)?;

        if let Some(scope) = scope {
            let mut block = BlockContext::new();
            block.set_base_value(scope.clone());
            for (name, value) in locals {
                block.set_local_var(name, value.clone());
            }
            self.rc.push_block(block);
        }

        let mut buffer = BufferOutput::default();
        let result = template.render(self.registry, self.context, &mut *self.rc, &mut buffer);

        if scope.is_some() {
            self.rc.pop_block();
        }
        result.map_err(|e| HelperError::Block(e.to_string()))?;
        Ok(buffer.0)
    }
}

impl<'a, 'reg: 'rc, 'rc> BlockRenderer for HandlebarsBlock<'a, 'reg, 'rc> {
    fn render(&mut self) -> Result<String, HelperError> {
        self.run(self.template, None, &[])
    }

    fn render_with(
        &mut self,
        scope: &Value,
        locals: &[(&str, Value)],
    ) -> Result<String, HelperError> {
        self.run(self.template, Some(scope), locals)
    }

    fn inverse(&mut self) -> Result<String, HelperError> {
        self.run(self.inverse, None, &[])
    }
}

/// Tracks block nesting on the rendering thread.
struct DepthGuard;

impl DepthGuard {
    fn enter(max_depth: usize) -> Result<Self, HelperError> {
        BLOCK_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > max_depth {
                return Err(HelperError::DepthExceeded(max_depth));
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        BLOCK_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Default)]
struct BufferOutput(String);

impl Output for BufferOutput {
    fn write(&mut self, seg: &str) -> Result<(), std::io::Error> {
        self.0.push_str(seg);
        Ok(())
    }
}

/// Unknown helpers write their marker instead of failing the render.
struct MissingHelper;

impl HelperDef for MissingHelper {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut HbRenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        tracing::warn!(helper = %h.name(), "unknown helper");
        Ok(ScopedJson::Derived(Value::String(error_marker(h.name()))))
    }
}

/// Register the fallback for calls to helpers that do not exist.
pub fn install_missing_handler(registry: &mut Handlebars<'static>) {
    registry.register_helper("helperMissing", Box::new(MissingHelper));
}

/// Install a helper behind the sandbox, replacing any previous entry.
pub fn install(registry: &mut Handlebars<'static>, entry: HelperEntry, max_depth: usize) {
    let name = entry.name.clone();
    registry.register_helper(&name, Box::new(SandboxedHelper::new(entry, max_depth)));
}
