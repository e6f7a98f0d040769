//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Options that change how a template compiles. Part of the cache key.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    /// Missing fields become render errors instead of empty output.
    #[serde(default)]
    pub strict: bool,
    /// Disable escaping for the whole render.
    #[serde(default)]
    pub no_escape: bool,
}

impl CompileOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn raw() -> Self {
        Self {
            no_escape: true,
            ..Self::default()
        }
    }
}

// ================================
// Render Config
// ================================

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct RenderConfig {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub no_escape: bool,
    /// Compiled-template cache bound; 0 keeps every entry.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_max_template_length")]
    pub max_template_length: usize,
    #[serde(default = "default_max_block_depth")]
    pub max_block_depth: usize,
}

fn default_cache_capacity() -> usize { 1024 }
fn default_max_template_length() -> usize { 100_000 }
fn default_max_block_depth() -> usize { 32 }

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strict: false,
            no_escape: false,
            cache_capacity: default_cache_capacity(),
            max_template_length: default_max_template_length(),
            max_block_depth: default_max_block_depth(),
        }
    }
}

impl RenderConfig {
    pub fn from_json_str(raw: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Options used by `render_default`.
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            strict: self.strict,
            no_escape: self.no_escape,
        }
    }
}
