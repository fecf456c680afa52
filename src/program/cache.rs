//! Program Cache
//!
//! Deduplicates compiled programs by content hash. The key of a program is
//! `hash_pair(template.uid, slots.hash)`: the collection hash already covers
//! everything the chunks generate, so equal keys mean equal sources and the
//! sources never need to be resolved (let alone compiled) twice.
//!
//! Slots built by hand without a hash stamp are keyed by their code instead.
//!
//! | Path | Template resolution | Backend compile |
//! |------|---------------------|-----------------|
//! | hit  | no                  | no              |
//! | miss | yes                 | yes             |
//!
//! Programs are shared through [`Arc`]. [`ProgramCache::release`] evicts an
//! entry once the cache holds its only reference.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::backend::{ContextId, GpuBackend};
use super::template::ShaderTemplate;
use crate::chunks::{ChunkGraph, ChunkSlots, CollectionId};
use crate::errors::Result;
use crate::settings::ProgramCacheSettings;
use crate::utils::{hash_pair, hash_tokens};

/// Template plus the slots generated for it.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSource<'a> {
    pub template: &'a ShaderTemplate,
    pub slots: &'a ChunkSlots,
}

impl<'a> ProgramSource<'a> {
    #[must_use]
    pub fn new(template: &'a ShaderTemplate, slots: &'a ChunkSlots) -> Self {
        Self { template, slots }
    }

    /// Cache key of this source.
    ///
    /// Unstamped slots fall back to hashing every slot key and its code.
    #[must_use]
    pub fn key(&self) -> String {
        let hash = self.slots.hash();
        if !hash.is_empty() || self.slots.is_empty() {
            return hash_pair(&self.template.uid, hash);
        }
        let uid: &str = &self.template.uid;
        let content = self
            .slots
            .iter()
            .flat_map(|slot| [slot.key.as_str(), slot.code.as_str()]);
        hash_tokens([uid, ""].into_iter().chain(content))
    }
}

/// Counters since the cache was created.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful backend compilations.
    pub compilations: u64,
    /// Failed backend compilations. Never cached.
    pub failures: u64,
    pub evictions: u64,
}

/// Content hash → compiled program, for one GPU context.
pub struct ProgramCache<P> {
    context: ContextId,
    programs: FxHashMap<String, Arc<P>>,
    stats: CacheStats,
    settings: ProgramCacheSettings,
}

impl<P> ProgramCache<P> {
    #[must_use]
    pub fn new(context: ContextId) -> Self {
        Self::with_settings(context, ProgramCacheSettings::default())
    }

    #[must_use]
    pub fn with_settings(context: ContextId, settings: ProgramCacheSettings) -> Self {
        Self {
            context,
            programs: FxHashMap::default(),
            stats: CacheStats::default(),
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn context_id(&self) -> ContextId {
        self.context
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Arc<P>> {
        self.programs.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.programs.contains_key(key)
    }

    /// Returns the cached program for `source`, compiling it on a miss.
    pub fn compile<B>(&mut self, backend: &B, source: ProgramSource<'_>) -> Result<Arc<P>>
    where
        B: GpuBackend<Program = P>,
    {
        let key = source.key();
        if let Some(program) = self.lookup(&key) {
            return Ok(program);
        }
        self.compile_miss(backend, key, source)
    }

    /// Like [`compile`](Self::compile), with code generated from a collection.
    ///
    /// The key only needs the collection hash, so chunk code generation runs
    /// on a miss only.
    pub fn compile_collection<B>(
        &mut self,
        backend: &B,
        template: &ShaderTemplate,
        graph: &mut ChunkGraph,
        collection: CollectionId,
    ) -> Result<Arc<P>>
    where
        B: GpuBackend<Program = P>,
    {
        let key = hash_pair(&template.uid, graph.collection_hash(collection)?);
        if let Some(program) = self.lookup(&key) {
            return Ok(program);
        }
        let slots = graph.collection_gen_code(collection)?;
        self.compile_miss(backend, key, ProgramSource::new(template, &slots))
    }

    fn lookup(&mut self, key: &str) -> Option<Arc<P>> {
        let program = self.programs.get(key)?;
        self.stats.hits += 1;
        Some(Arc::clone(program))
    }

    fn compile_miss<B>(&mut self, backend: &B, key: String, source: ProgramSource<'_>) -> Result<Arc<P>>
    where
        B: GpuBackend<Program = P>,
    {
        debug_assert_eq!(
            backend.context_id(),
            self.context,
            "program cache used with a backend of another context"
        );
        self.stats.misses += 1;

        let label: &str = &source.template.uid;
        log::debug!(
            "Program cache miss for '{label}' (key {key}, {} slot fragments)",
            source.slots.fragment_count()
        );

        let (vertex, fragment) = source.template.resolve(source.slots);
        if self.settings.trace_sources {
            log::trace!("Vertex source for '{label}':\n{vertex}");
            log::trace!("Fragment source for '{label}':\n{fragment}");
        }

        let program = match backend.create_program(label, &vertex, &fragment) {
            Ok(program) => Arc::new(program),
            Err(e) => {
                self.stats.failures += 1;
                log::warn!("{e}");
                return Err(e);
            }
        };

        self.stats.compilations += 1;
        self.programs.insert(key, Arc::clone(&program));
        Ok(program)
    }

    /// Gives back a program obtained from this cache.
    ///
    /// The entry is evicted when no one else holds it. Returns whether it was.
    pub fn release(&mut self, program: Arc<P>) -> bool {
        let Some(key) = self
            .programs
            .iter()
            .find(|(_, cached)| Arc::ptr_eq(cached, &program))
            .map(|(k, _)| k.clone())
        else {
            return false;
        };
        drop(program);

        let unused = self
            .programs
            .get(&key)
            .is_some_and(|cached| Arc::strong_count(cached) == 1);
        if unused {
            self.programs.remove(&key);
            self.stats.evictions += 1;
            log::debug!("Evicted program {key}");
        }
        unused
    }

    /// Evicts every program nobody else holds. Returns how many were dropped.
    pub fn purge_unused(&mut self) -> usize {
        let before = self.programs.len();
        self.programs.retain(|_, p| Arc::strong_count(p) > 1);
        let evicted = before - self.programs.len();
        self.stats.evictions += evicted as u64;
        evicted
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }
}
