//! One [`ProgramCache`] per GPU context.
//!
//! The registry is owned by whoever owns the contexts. Caches are created on
//! first use and live until [`ProgramCacheRegistry::destroy`] is called for
//! their context, which drops the cache's references to its programs.

use rustc_hash::FxHashMap;

use super::backend::{ContextId, GpuBackend};
use super::cache::ProgramCache;
use crate::settings::ProgramCacheSettings;

pub struct ProgramCacheRegistry<P> {
    caches: FxHashMap<ContextId, ProgramCache<P>>,
    settings: ProgramCacheSettings,
}

impl<P> Default for ProgramCacheRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ProgramCacheRegistry<P> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(ProgramCacheSettings::default())
    }

    /// Settings applied to every cache created from now on.
    #[must_use]
    pub fn with_settings(settings: ProgramCacheSettings) -> Self {
        Self {
            caches: FxHashMap::default(),
            settings,
        }
    }

    /// The cache of `backend`'s context, created if needed.
    pub fn get_or_create<B>(&mut self, backend: &B) -> &mut ProgramCache<P>
    where
        B: GpuBackend<Program = P>,
    {
        let context = backend.context_id();
        let settings = self.settings.clone();
        self.caches.entry(context).or_insert_with(|| {
            log::debug!("Creating program cache for context {}", context.raw());
            ProgramCache::with_settings(context, settings)
        })
    }

    #[must_use]
    pub fn get(&self, context: ContextId) -> Option<&ProgramCache<P>> {
        self.caches.get(&context)
    }

    pub fn get_mut(&mut self, context: ContextId) -> Option<&mut ProgramCache<P>> {
        self.caches.get_mut(&context)
    }

    /// Tears down the cache of a context that is going away.
    pub fn destroy(&mut self, context: ContextId) -> Option<ProgramCache<P>> {
        let cache = self.caches.remove(&context)?;
        log::debug!(
            "Destroyed program cache for context {} ({} programs)",
            context.raw(),
            cache.len()
        );
        Some(cache)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}
