//! Built-in helper catalogs.
//!
//! Seven domains of pure functions that all share the [`TemplateHelper`]
//! signature:
//!
//! - [`field`]: custom-field access (`acf`, `acfImage`, `acfRepeater`, …)
//! - [`relation`]: convention-based related records (`author`, `tags`, …)
//! - [`media`]: media URLs and markup (`media`, `img`, `gallery`, …)
//! - [`format`]: text, number and date formatting
//! - [`conditional`]: comparisons and predicates, usable inline or as blocks
//! - [`collection`]: list manipulation (`groupBy`, `chunk`, `pluck`, …)
//! - [`math`]: aggregates, arithmetic and the restricted `math` evaluator

use std::sync::Arc;

use handlebars::Handlebars;

use crate::sandbox::{install, CallingConvention, HelperCall, HelperEntry, HelperResult};

pub mod collection;
pub mod conditional;
pub mod field;
pub mod format;
pub mod math;
pub mod media;
pub mod relation;

/// Entry for a value-producing helper.
pub(crate) fn inline<F>(name: &str, helper: F) -> HelperEntry
where
    F: Fn(&mut HelperCall<'_>) -> HelperResult + Send + Sync + 'static,
{
    HelperEntry::new(name, Arc::new(helper), CallingConvention::Inline)
}

/// Entry for a helper that handles its own block body.
pub(crate) fn block<F>(name: &str, helper: F) -> HelperEntry
where
    F: Fn(&mut HelperCall<'_>) -> HelperResult + Send + Sync + 'static,
{
    HelperEntry::new(name, Arc::new(helper), CallingConvention::Block)
}

/// Every built-in helper, in catalog order.
pub fn builtin_helpers() -> Vec<HelperEntry> {
    let mut entries = Vec::new();
    entries.extend(field::entries());
    entries.extend(relation::entries());
    entries.extend(media::entries());
    entries.extend(format::entries());
    entries.extend(conditional::entries());
    entries.extend(collection::entries());
    entries.extend(math::entries());
    entries
}

/// Install every built-in catalog into a registry.
pub fn install_builtin_helpers(registry: &mut Handlebars<'static>, max_depth: usize) {
    for entry in builtin_helpers() {
        install(registry, entry, max_depth);
    }
}
