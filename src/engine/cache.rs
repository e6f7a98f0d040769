use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::compiled::CompiledTemplate;
use crate::config::CompileOptions;
use crate::error::EngineResult;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub content_hash: u64,
    pub options: CompileOptions,
}

impl CacheKey {
    pub fn new(source: &str, options: &CompileOptions) -> Self {
        Self {
            content_hash: hash_content(source),
            options: *options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// 0 means unbounded.
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    source: String,
    compiled: Arc<CompiledTemplate>,
    /// Tick of the last lookup or insert.
    last_used: AtomicU64,
}

/// Compiled templates keyed by (source, compile options).
///
/// The source text is kept in each entry and compared on lookup, so a hash
/// collision recompiles instead of returning the wrong template.
///
/// Recency is a per-entry tick from a shared counter, so a hit costs one
/// atomic store. Eviction scans for the oldest tick and only runs after an
/// insert.
pub struct TemplateCache {
    entries: DashMap<CacheKey, CacheEntry>,
    clock: AtomicU64,
    evicting: Mutex<()>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TemplateCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
            evicting: Mutex::new(()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, source: &str, options: &CompileOptions) -> Option<Arc<CompiledTemplate>> {
        let key = CacheKey::new(source, options);
        let entry = self.entries.get(&key)?;
        if entry.source != source {
            return None;
        }
        entry.last_used.store(self.tick(), Ordering::Relaxed);
        Some(entry.compiled.clone())
    }

    pub fn get_or_compile<F>(
        &self,
        source: &str,
        options: &CompileOptions,
        compile: F,
    ) -> EngineResult<Arc<CompiledTemplate>>
    where
        F: FnOnce() -> EngineResult<CompiledTemplate>,
    {
        if let Some(compiled) = self.get(source, options) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(compiled);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let compiled = Arc::new(compile()?);
        tracing::debug!(bytes = source.len(), strict = options.strict, "compiled template");
        Ok(self.insert_entry(source, options, compiled))
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            capacity: self.capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Insert unless another thread got there first; the winner's template
    /// is returned either way.
    fn insert_entry(
        &self,
        source: &str,
        options: &CompileOptions,
        compiled: Arc<CompiledTemplate>,
    ) -> Arc<CompiledTemplate> {
        let key = CacheKey::new(source, options);
        let tick = self.tick();
        let winner = {
            let mut slot = self.entries.entry(key).or_insert_with(|| CacheEntry {
                source: source.to_string(),
                compiled: compiled.clone(),
                last_used: AtomicU64::new(tick),
            });
            if slot.source != source {
                *slot = CacheEntry {
                    source: source.to_string(),
                    compiled,
                    last_used: AtomicU64::new(tick),
                };
            }
            slot.last_used.store(tick, Ordering::Relaxed);
            slot.compiled.clone()
        };
        self.maybe_evict();
        winner
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn maybe_evict(&self) {
        if self.capacity == 0 || self.entries.len() <= self.capacity {
            return;
        }
        let _evicting = self.evicting.lock();
        while self.entries.len() > self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.last_used.load(Ordering::Relaxed))
                .map(|entry| *entry.key());
            let Some(oldest) = oldest else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(content_hash = oldest.content_hash, "evicted compiled template");
        }
    }
}

fn hash_content(content: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    content.as_bytes().hash(&mut hasher);
    hasher.finish()
}
