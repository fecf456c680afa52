//! Chunk Collections
//!
//! A collection is the unit a program is assembled from: an ordered list of
//! root chunks, flattened on demand into
//!
//! - `all`: every chunk visited, proxies included (subscription bookkeeping)
//! - `actives`: behaving chunks only, children before parents, each once
//!
//! Two dirty bits drive lazy recomputation:
//!
//! | Bit          | Set by                                  | Recomputes          |
//! |--------------|-----------------------------------------|---------------------|
//! | `list_dirty` | add/remove child, set proxy, root edits | `all`, `actives`, hash |
//! | `code_dirty` | [`ChunkGraph::invalidate_code`]         | hash                |

use rustc_hash::FxHashSet;

use super::chunk::{ChunkCaps, ChunkId, CollectionId};
use super::graph::ChunkGraph;
use super::slots::ChunkSlots;
use crate::errors::{ChunkError, Result};
use crate::program::ProgramUniforms;

/// Separator between chunk hashes in a collection hash.
const HASH_SEPARATOR: char = '|';

/// Flattened, cached view over a set of root chunks.
#[derive(Debug, Clone)]
pub struct ChunkCollection {
    roots: Vec<ChunkId>,
    all: Vec<ChunkId>,
    actives: Vec<ChunkId>,
    list_dirty: bool,
    code_dirty: bool,
    hash: String,
}

impl Default for ChunkCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkCollection {
    #[must_use]
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            all: Vec::new(),
            actives: Vec::new(),
            list_dirty: true,
            code_dirty: true,
            hash: String::new(),
        }
    }

    pub(crate) fn invalidate_list(&mut self) {
        self.list_dirty = true;
        self.code_dirty = true;
    }

    pub(crate) fn invalidate_code(&mut self) {
        self.code_dirty = true;
    }

    /// Drops every reference to a removed chunk. Returns whether it had any.
    pub(crate) fn forget(&mut self, id: ChunkId) -> bool {
        let before = self.roots.len() + self.all.len();
        self.roots.retain(|c| *c != id);
        self.all.retain(|c| *c != id);
        self.actives.retain(|c| *c != id);
        before != self.roots.len() + self.all.len()
    }

    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[ChunkId] {
        &self.roots
    }

    /// Traversal list as of the last refresh.
    #[inline]
    #[must_use]
    pub fn all(&self) -> &[ChunkId] {
        &self.all
    }

    /// Active list as of the last refresh.
    #[inline]
    #[must_use]
    pub fn actives(&self) -> &[ChunkId] {
        &self.actives
    }

    #[inline]
    #[must_use]
    pub fn is_list_dirty(&self) -> bool {
        self.list_dirty
    }

    #[inline]
    #[must_use]
    pub fn is_code_dirty(&self) -> bool {
        self.code_dirty
    }

    /// Hash as of the last refresh. May be stale while a dirty bit is set.
    #[inline]
    #[must_use]
    pub fn cached_hash(&self) -> &str {
        &self.hash
    }
}

impl ChunkGraph {
    pub fn create_collection(&mut self) -> CollectionId {
        self.collections.insert(ChunkCollection::new())
    }

    /// Destroys a collection and unsubscribes its chunks.
    pub fn remove_collection(&mut self, id: CollectionId) -> Option<ChunkCollection> {
        let collection = self.collections.remove(id)?;
        for chunk in &collection.all {
            if let Some(node) = self.nodes.get_mut(*chunk) {
                node.unsubscribe(id);
            }
        }
        Some(collection)
    }

    #[must_use]
    pub fn collection(&self, id: CollectionId) -> Option<&ChunkCollection> {
        self.collections.get(id)
    }

    fn collection_mut(&mut self, id: CollectionId) -> Result<&mut ChunkCollection> {
        self.collections
            .get_mut(id)
            .ok_or(ChunkError::CollectionNotFound(id))
    }

    /// Appends a root chunk. Adding a root twice is a no-op.
    pub fn collection_add(&mut self, id: CollectionId, chunk: impl Into<ChunkId>) -> Result<()> {
        let chunk = chunk.into();
        self.node(chunk)?;
        let collection = self.collection_mut(id)?;
        if !collection.roots.contains(&chunk) {
            collection.roots.push(chunk);
            collection.invalidate_list();
        }
        Ok(())
    }

    /// Removes a root chunk. Returns whether it was present.
    pub fn collection_remove(&mut self, id: CollectionId, chunk: impl Into<ChunkId>) -> Result<bool> {
        let chunk = chunk.into();
        let collection = self.collection_mut(id)?;
        let before = collection.roots.len();
        collection.roots.retain(|c| *c != chunk);
        let removed = collection.roots.len() != before;
        if removed {
            collection.invalidate_list();
        }
        Ok(removed)
    }

    /// Brings the collection up to date. Returns whether its hash changed.
    pub fn refresh_collection(&mut self, id: CollectionId) -> Result<bool> {
        let collection = self.collections.get(id).ok_or(ChunkError::CollectionNotFound(id))?;
        if !collection.list_dirty && !collection.code_dirty {
            return Ok(false);
        }

        if collection.list_dirty {
            self.rebuild_lists(id)?;
        }

        let collection = self.collections.get(id).ok_or(ChunkError::CollectionNotFound(id))?;
        let mut hash = String::new();
        for (i, chunk) in collection
            .actives
            .iter()
            .filter_map(|c| self.nodes.get(*c))
            .filter(|n| n.caps.contains(ChunkCaps::CODE))
            .enumerate()
        {
            if i > 0 {
                hash.push(HASH_SEPARATOR);
            }
            hash.push_str(&chunk.chunk.hash());
        }

        let collection = self.collection_mut(id)?;
        collection.code_dirty = false;
        let changed = collection.hash != hash;
        if changed {
            log::debug!("Chunk collection {id:?} hash changed: '{}' -> '{hash}'", collection.hash);
            collection.hash = hash;
        }
        Ok(changed)
    }

    fn rebuild_lists(&mut self, id: CollectionId) -> Result<()> {
        let roots = self.collection_mut(id)?.roots.clone();

        let mut all = Vec::new();
        let mut actives = Vec::new();
        for root in roots {
            self.collect_chunks(root, &mut all, &mut actives);
        }

        let mut seen = FxHashSet::default();
        all.retain(|c| seen.insert(*c));
        seen.clear();
        actives.retain(|c| seen.insert(*c));

        let reachable: FxHashSet<ChunkId> = all.iter().copied().collect();
        for chunk in &all {
            if let Some(node) = self.nodes.get_mut(*chunk) {
                node.subscribe(id);
            }
        }

        let collection = self.collection_mut(id)?;
        let previous = std::mem::replace(&mut collection.all, all);
        collection.actives = actives;
        collection.list_dirty = false;
        collection.code_dirty = true;

        for chunk in previous {
            if !reachable.contains(&chunk)
                && let Some(node) = self.nodes.get_mut(chunk)
            {
                node.unsubscribe(id);
            }
        }
        Ok(())
    }

    /// Content hash of the collection, recomputed if dirty.
    pub fn collection_hash(&mut self, id: CollectionId) -> Result<&str> {
        self.refresh_collection(id)?;
        Ok(self.collection_mut(id)?.hash.as_str())
    }

    /// Active chunks, refreshed if dirty.
    pub fn collection_actives(&mut self, id: CollectionId) -> Result<&[ChunkId]> {
        self.refresh_collection(id)?;
        Ok(self.collection_mut(id)?.actives.as_slice())
    }

    /// Runs code generation over the active chunks, in order.
    ///
    /// The returned slots carry the collection hash.
    pub fn collection_gen_code(&mut self, id: CollectionId) -> Result<ChunkSlots> {
        self.refresh_collection(id)?;
        let collection = self.collections.get(id).ok_or(ChunkError::CollectionNotFound(id))?;

        let mut slots = ChunkSlots::with_hash(collection.hash.clone());
        for chunk in &collection.actives {
            if let Some(node) = self.nodes.get(*chunk)
                && node.caps.contains(ChunkCaps::CODE)
            {
                node.chunk.gen_code(&mut slots)?;
            }
        }
        Ok(slots)
    }

    /// Uploads the values of every active chunk with setup, in order.
    pub fn collection_setup(&mut self, id: CollectionId, program: &dyn ProgramUniforms) -> Result<()> {
        self.refresh_collection(id)?;
        let collection = self.collections.get(id).ok_or(ChunkError::CollectionNotFound(id))?;

        for chunk in &collection.actives {
            if let Some(node) = self.nodes.get_mut(*chunk)
                && node.caps.contains(ChunkCaps::SETUP)
            {
                node.chunk.setup(program);
                node.invalid = false;
            }
        }
        Ok(())
    }

    /// Whether any active chunk has values waiting to be uploaded.
    pub fn collection_is_invalid(&mut self, id: CollectionId) -> Result<bool> {
        self.refresh_collection(id)?;
        let collection = self.collections.get(id).ok_or(ChunkError::CollectionNotFound(id))?;
        Ok(collection
            .actives
            .iter()
            .filter_map(|c| self.nodes.get(*c))
            .any(|n| n.caps.contains(ChunkCaps::SETUP) && n.invalid))
    }
}
