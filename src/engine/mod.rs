//! Render engine.
//!
//! [`RenderEngine`] owns the helper and partial registry, compiles template
//! sources into [`CompiledTemplate`]s through the [`TemplateCache`], and
//! renders them against a [`RenderContext`]. Rendering never fails: compile
//! and render errors come back as inline markers, helper failures are
//! contained per substitution by the sandbox.

use std::collections::BTreeMap;
use std::sync::Arc;

use handlebars::Handlebars;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{CompileOptions, RenderConfig};
use crate::context::RenderContext;
use crate::error::{EngineError, EngineResult};
use crate::helpers::install_builtin_helpers;
use crate::sandbox::{
    install, install_missing_handler, CallingConvention, HelperEntry, TemplateHelper,
};

pub mod cache;
pub mod compiled;

pub use cache::{CacheKey, CacheStats, TemplateCache};
pub use compiled::CompiledTemplate;

/// Outcome of [`RenderEngine::validate`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub fn template_error_marker(error: &EngineError) -> String {
    format!("[Template Error: {}]", error)
}

pub fn render_error_marker(error: &EngineError) -> String {
    format!("[Render Error: {}]", error)
}

/// Template render engine. `Send + Sync`; share one per process behind an `Arc`.
pub struct RenderEngine {
    config: RenderConfig,
    registry: RwLock<Handlebars<'static>>,
    helpers: RwLock<BTreeMap<String, CallingConvention>>,
    cache: TemplateCache,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    /// Build an engine with every built-in helper catalog registered.
    pub fn with_config(config: RenderConfig) -> Self {
        let mut registry = Handlebars::new();
        install_builtin_helpers(&mut registry, config.max_block_depth);
        install_missing_handler(&mut registry);

        let helpers = crate::helpers::builtin_helpers()
            .into_iter()
            .map(|entry| (entry.name, entry.convention))
            .collect();

        RenderEngine {
            cache: TemplateCache::new(config.cache_capacity),
            config,
            registry: RwLock::new(registry),
            helpers: RwLock::new(helpers),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Compile a source, reusing the cached template for identical
    /// (source, options) pairs.
    pub fn compile(
        &self,
        source: &str,
        options: &CompileOptions,
    ) -> EngineResult<Arc<CompiledTemplate>> {
        self.check_length(source)?;
        self.cache.get_or_compile(source, options, || {
            let snapshot = self.registry.read().clone();
            CompiledTemplate::compile(snapshot, source, options)
        })
    }

    /// Render a source. Never fails: a compile failure becomes a
    /// `[Template Error: …]` marker and a structural render failure a
    /// `[Render Error: …]` marker.
    pub fn render(&self, source: &str, ctx: &RenderContext, options: &CompileOptions) -> String {
        let compiled = match self.compile(source, options) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!(error = %e, "template compile failed");
                return template_error_marker(&e);
            }
        };
        match compiled.render_context(ctx) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(error = %e, "template render failed");
                render_error_marker(&e)
            }
        }
    }

    /// [`render`](Self::render) with the options from the engine config.
    pub fn render_default(&self, source: &str, ctx: &RenderContext) -> String {
        self.render(source, ctx, &self.config.compile_options())
    }

    /// Same as [`render`](Self::render); lets async callers compose the
    /// engine without blocking a runtime thread on anything but CPU work.
    pub async fn render_async(
        &self,
        source: &str,
        ctx: &RenderContext,
        options: &CompileOptions,
    ) -> String {
        self.render(source, ctx, options)
    }

    /// Strict compile without executing or caching the template.
    pub fn validate(&self, source: &str) -> ValidationReport {
        let result = self.check_length(source).and_then(|_| {
            let snapshot = self.registry.read().clone();
            CompiledTemplate::compile(snapshot, source, &CompileOptions::strict())
        });
        match result {
            Ok(_) => ValidationReport {
                valid: true,
                errors: Vec::new(),
            },
            Err(e) => ValidationReport {
                valid: false,
                errors: vec![e.to_string()],
            },
        }
    }

    /// Register a value-producing helper. Replaces any helper with the same
    /// name; templates compiled before this call keep the old one until the
    /// cache is cleared.
    pub fn register_helper<H>(&self, name: &str, helper: H)
    where
        H: TemplateHelper + 'static,
    {
        self.register_entry(HelperEntry::new(
            name,
            Arc::new(helper),
            CallingConvention::Inline,
        ));
    }

    /// Register a helper that handles its own block body and else-branch.
    pub fn register_block_helper<H>(&self, name: &str, helper: H)
    where
        H: TemplateHelper + 'static,
    {
        self.register_entry(HelperEntry::new(
            name,
            Arc::new(helper),
            CallingConvention::Block,
        ));
    }

    pub fn register_entry(&self, entry: HelperEntry) {
        tracing::debug!(helper = %entry.name, convention = ?entry.convention, "registering helper");
        self.helpers
            .write()
            .insert(entry.name.clone(), entry.convention);
        install(&mut self.registry.write(), entry, self.config.max_block_depth);
    }

    pub fn register_partial(&self, name: &str, source: &str) -> EngineResult<()> {
        self.check_length(source)?;
        self.registry
            .write()
            .register_partial(name, source)
            .map_err(|e| EngineError::Partial {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.read().contains_key(name)
    }

    /// Registered helper names in sorted order.
    pub fn helper_names(&self) -> Vec<String> {
        self.helpers.read().keys().cloned().collect()
    }

    pub fn helper_convention(&self, name: &str) -> Option<CallingConvention> {
        self.helpers.read().get(name).copied()
    }

    /// Drop every compiled template. Helpers and partials stay registered.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn check_length(&self, source: &str) -> EngineResult<()> {
        let max = self.config.max_template_length;
        if max > 0 && source.len() > max {
            return Err(EngineError::TemplateTooLarge {
                max,
                actual: source.len(),
            });
        }
        Ok(())
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}
