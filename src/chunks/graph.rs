//! Chunk Graph
//!
//! Arena owning every chunk node and every collection. Structure is
//! expressed with [`ChunkId`] handles:
//!
//! - **children**: ordered owned sub-chunks, emitted before their parent
//! - **proxy**: an optional delegate; a proxied chunk forwards code
//!   generation, hashing, capability queries and setup to its target
//!
//! The union of child and proxy edges is kept acyclic. Every structural edit
//! checks reachability first and fails before mutating anything.
//!
//! # Invalidation
//!
//! Invalidation is pull-based. Chunks only flip dirty bits on the
//! collections subscribed to them; the collections recompute lazily on the
//! next hash / code generation request (see [`collection`](super::collection)).
//!
//! Generation borrows the graph immutably and every edit needs
//! `&mut ChunkGraph`, so a chunk can never mutate the graph while it is
//! being traversed.

use std::any::Any;
use std::borrow::Cow;

use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use super::chunk::{Chunk, ChunkCaps, ChunkHandle, ChunkId, ChunkNode, CollectionId, GroupChunk};
use super::collection::ChunkCollection;
use super::slots::ChunkSlots;
use crate::errors::{ChunkError, Result};
use crate::program::ProgramUniforms;

/// Owner of chunk nodes and collections.
#[derive(Default)]
pub struct ChunkGraph {
    pub(crate) nodes: SlotMap<ChunkId, ChunkNode>,
    pub(crate) collections: SlotMap<CollectionId, ChunkCollection>,
}

impl ChunkGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            collections: SlotMap::with_key(),
        }
    }

    // ========================================================================
    // Node storage
    // ========================================================================

    /// Inserts a chunk. Its capabilities are read once, here.
    pub fn insert<T: Chunk>(&mut self, chunk: T) -> ChunkHandle<T> {
        ChunkHandle::new(self.insert_boxed(Box::new(chunk)))
    }

    pub fn insert_boxed(&mut self, chunk: Box<dyn Chunk>) -> ChunkId {
        self.nodes.insert(ChunkNode::new(chunk))
    }

    /// Removes a chunk and detaches it from the rest of the graph.
    ///
    /// Parents drop it from their children, proxies pointing at it are
    /// cleared and collections holding it as a root forget it. Its own
    /// children stay in the graph.
    pub fn remove(&mut self, id: impl Into<ChunkId>) -> Option<Box<dyn Chunk>> {
        let id = id.into();
        let node = self.nodes.remove(id)?;

        let mut touched = Vec::new();
        for (other_id, other) in &mut self.nodes {
            let before = other.children.len();
            other.children.retain(|c| *c != id);
            let mut changed = other.children.len() != before;
            if other.proxy == Some(id) {
                other.proxy = None;
                changed = true;
            }
            if changed {
                touched.push(other_id);
            }
        }

        for (_, collection) in &mut self.collections {
            if collection.forget(id) {
                collection.invalidate_list();
            }
        }
        for list in &node.lists {
            if let Some(collection) = self.collections.get_mut(*list) {
                collection.invalidate_list();
            }
        }
        for other_id in touched {
            self.invalidate_list(other_id);
        }

        Some(node.chunk)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: impl Into<ChunkId>) -> bool {
        self.nodes.contains_key(id.into())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: ChunkId) -> Result<&ChunkNode> {
        self.nodes.get(id).ok_or(ChunkError::ChunkNotFound(id))
    }

    pub(crate) fn node_mut(&mut self, id: ChunkId) -> Result<&mut ChunkNode> {
        self.nodes.get_mut(id).ok_or(ChunkError::ChunkNotFound(id))
    }

    // ========================================================================
    // Typed access
    // ========================================================================

    #[must_use]
    pub fn get<T: Chunk>(&self, handle: ChunkHandle<T>) -> Option<&T> {
        let node = self.nodes.get(handle.id())?;
        let any: &dyn Any = &*node.chunk;
        any.downcast_ref::<T>()
    }

    /// Mutable access to a chunk's own state.
    ///
    /// This does not invalidate anything: callers that change what the chunk
    /// generates must follow up with [`invalidate_code`](Self::invalidate_code),
    /// and callers that only change uploaded values with
    /// [`mark_invalid`](Self::mark_invalid).
    pub fn get_mut<T: Chunk>(&mut self, handle: ChunkHandle<T>) -> Option<&mut T> {
        let node = self.nodes.get_mut(handle.id())?;
        let any: &mut dyn Any = &mut *node.chunk;
        any.downcast_mut::<T>()
    }

    /// Borrows two distinct chunks mutably at once.
    ///
    /// Returns `None` if either handle is stale or both name the same chunk.
    pub fn get_pair_mut<A: Chunk, B: Chunk>(
        &mut self,
        a: ChunkHandle<A>,
        b: ChunkHandle<B>,
    ) -> Option<(&mut A, &mut B)> {
        let [node_a, node_b] = self.nodes.get_disjoint_mut([a.id(), b.id()])?;
        let any_a: &mut dyn Any = &mut *node_a.chunk;
        let any_b: &mut dyn Any = &mut *node_b.chunk;
        Some((any_a.downcast_mut::<A>()?, any_b.downcast_mut::<B>()?))
    }

    /// Typed view of an untyped id.
    pub fn downcast<T: Chunk>(&self, id: ChunkId) -> Result<ChunkHandle<T>> {
        let node = self.node(id)?;
        let any: &dyn Any = &*node.chunk;
        if any.is::<T>() {
            Ok(ChunkHandle::new(id))
        } else {
            Err(ChunkError::TypeMismatch {
                id,
                expected: std::any::type_name::<T>(),
            })
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Appends `child` to `parent`'s children.
    ///
    /// Fails if `child` is already a direct child, or if `parent` is
    /// reachable from `child` (through children or proxies).
    pub fn add_child(&mut self, parent: impl Into<ChunkId>, child: impl Into<ChunkId>) -> Result<()> {
        let (parent, child) = (parent.into(), child.into());
        self.node(child)?;
        if self.node(parent)?.children.contains(&child) {
            return Err(ChunkError::DuplicateChild { parent, child });
        }
        if self.reaches(child, parent) {
            return Err(ChunkError::CyclicDependency {
                operation: "add_child",
            });
        }

        self.node_mut(parent)?.children.push(child);
        self.invalidate_list(parent);
        Ok(())
    }

    /// Removes `child` from `parent` if present. Returns whether it was.
    ///
    /// Subscribed collections are list-invalidated either way.
    pub fn remove_child(&mut self, parent: impl Into<ChunkId>, child: impl Into<ChunkId>) -> Result<bool> {
        let (parent, child) = (parent.into(), child.into());
        let node = self.node_mut(parent)?;
        let removed = match node.children.iter().position(|c| *c == child) {
            Some(pos) => {
                node.children.remove(pos);
                true
            }
            None => false,
        };
        self.invalidate_list(parent);
        Ok(removed)
    }

    #[must_use]
    pub fn children(&self, id: impl Into<ChunkId>) -> &[ChunkId] {
        self.nodes.get(id.into()).map_or(&[], |n| n.children.as_slice())
    }

    /// Redirects every behaviour of `chunk` to `target`, or clears the
    /// redirection with `None`.
    pub fn set_proxy(&mut self, chunk: impl Into<ChunkId>, target: Option<ChunkId>) -> Result<()> {
        let chunk = chunk.into();
        if self.node(chunk)?.proxy == target {
            return Ok(());
        }
        if let Some(target) = target {
            self.node(target)?;
            if self.reaches(target, chunk) {
                return Err(ChunkError::CyclicDependency {
                    operation: "set_proxy",
                });
            }
        }

        self.node_mut(chunk)?.proxy = target;
        self.invalidate_list(chunk);
        Ok(())
    }

    #[must_use]
    pub fn proxy(&self, id: impl Into<ChunkId>) -> Option<ChunkId> {
        self.nodes.get(id.into()).and_then(|n| n.proxy)
    }

    /// Creates an empty chunk delegating to `target`, so one canonical chunk
    /// can appear at several composition points without duplicated state.
    pub fn create_proxy(&mut self, target: impl Into<ChunkId>) -> Result<ChunkHandle<GroupChunk>> {
        let target = target.into();
        self.node(target)?;
        let handle = self.insert(GroupChunk);
        // A fresh node cannot be reachable from anything.
        self.node_mut(handle.id())?.proxy = Some(target);
        Ok(handle)
    }

    /// Pre-order traversal used by collections and cycle detection.
    ///
    /// Every visited chunk lands in `all`. A proxied chunk recurses into its
    /// target only; any other chunk recurses into its children first, then
    /// appends itself to `actives`.
    pub fn collect_chunks(&self, id: ChunkId, all: &mut Vec<ChunkId>, actives: &mut Vec<ChunkId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        all.push(id);
        if let Some(target) = node.proxy {
            self.collect_chunks(target, all, actives);
        } else {
            for &child in &node.children {
                self.collect_chunks(child, all, actives);
            }
            actives.push(id);
        }
    }

    /// Whether `needle` is in the transitive closure of `root` (inclusive).
    #[must_use]
    pub fn reaches(&self, root: ChunkId, needle: ChunkId) -> bool {
        let mut stack = vec![root];
        let mut visited = FxHashSet::default();
        while let Some(id) = stack.pop() {
            if id == needle {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(id) {
                // Dormant children still count: clearing the proxy revives them.
                stack.extend(node.proxy);
                stack.extend(node.children.iter().copied());
            }
        }
        false
    }

    /// Follows proxies down to the chunk that actually behaves.
    pub fn resolve(&self, id: impl Into<ChunkId>) -> Result<ChunkId> {
        let mut id = id.into();
        while let Some(target) = self.node(id)?.proxy {
            id = target;
        }
        Ok(id)
    }

    // ========================================================================
    // Behaviour (proxy-aware)
    // ========================================================================

    pub fn gen_code(&self, id: impl Into<ChunkId>, slots: &mut ChunkSlots) -> Result<()> {
        let node = self.node(self.resolve(id)?)?;
        node.chunk.gen_code(slots)
    }

    pub fn hash(&self, id: impl Into<ChunkId>) -> Result<Cow<'_, str>> {
        let node = self.node(self.resolve(id)?)?;
        Ok(node.chunk.hash())
    }

    pub fn has_code(&self, id: impl Into<ChunkId>) -> Result<bool> {
        Ok(self.caps(id)?.contains(ChunkCaps::CODE))
    }

    pub fn has_setup(&self, id: impl Into<ChunkId>) -> Result<bool> {
        Ok(self.caps(id)?.contains(ChunkCaps::SETUP))
    }

    pub fn caps(&self, id: impl Into<ChunkId>) -> Result<ChunkCaps> {
        Ok(self.node(self.resolve(id)?)?.caps)
    }

    /// Whether the chunk has values waiting to be uploaded.
    pub fn is_invalid(&self, id: impl Into<ChunkId>) -> Result<bool> {
        Ok(self.node(self.resolve(id)?)?.invalid)
    }

    /// Uploads the chunk's values to `program` and clears its pending flag.
    pub fn setup(&mut self, id: impl Into<ChunkId>, program: &dyn ProgramUniforms) -> Result<()> {
        let id = self.resolve(id)?;
        let node = self.node_mut(id)?;
        if node.caps.contains(ChunkCaps::SETUP) {
            node.chunk.setup(program);
            node.invalid = false;
        }
        Ok(())
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Marks values as pending upload without touching generated code.
    pub fn mark_invalid(&mut self, id: impl Into<ChunkId>) {
        if let Some(node) = self.nodes.get_mut(id.into()) {
            node.invalid = true;
        }
    }

    /// Structural change: subscribed collections recompute their chunk
    /// lists and their hash.
    pub fn invalidate_list(&mut self, id: impl Into<ChunkId>) {
        let Some(node) = self.nodes.get(id.into()) else {
            return;
        };
        for list in &node.lists {
            if let Some(collection) = self.collections.get_mut(*list) {
                collection.invalidate_list();
            }
        }
    }

    /// Code change: subscribed collections recompute their hash only.
    pub fn invalidate_code(&mut self, id: impl Into<ChunkId>) {
        let Some(node) = self.nodes.get(id.into()) else {
            return;
        };
        for list in &node.lists {
            if let Some(collection) = self.collections.get_mut(*list) {
                collection.invalidate_code();
            }
        }
    }

    /// Collections currently subscribed to `id`.
    #[must_use]
    pub fn subscribers(&self, id: impl Into<ChunkId>) -> &[CollectionId] {
        self.nodes.get(id.into()).map_or(&[], |n| n.lists.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Snippet(&'static str);

    impl Chunk for Snippet {
        fn caps(&self) -> ChunkCaps {
            ChunkCaps::CODE
        }

        fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
            slots.add("x", self.0);
            Ok(())
        }

        fn hash(&self) -> Cow<'_, str> {
            Cow::Borrowed(self.0)
        }
    }

    #[test]
    fn test_self_child_is_cycle() {
        let mut graph = ChunkGraph::new();
        let a = graph.insert(Snippet("a"));
        let err = graph.add_child(a, a).unwrap_err();
        assert!(matches!(err, ChunkError::CyclicDependency { .. }));
        assert!(graph.children(a).is_empty());
    }

    #[test]
    fn test_reaches_sees_children_behind_proxy() {
        let mut graph = ChunkGraph::new();
        let a = graph.insert(GroupChunk);
        let t = graph.insert(Snippet("t"));
        let c = graph.insert(Snippet("c"));
        graph.set_proxy(a, Some(t.id())).unwrap();
        graph.add_child(a, c).unwrap();

        assert!(graph.reaches(a.id(), c.id()));
        assert!(graph.reaches(a.id(), t.id()));
        assert!(!graph.reaches(c.id(), a.id()));
    }

    #[test]
    fn test_collect_order_children_first() {
        let mut graph = ChunkGraph::new();
        let root = graph.insert(Snippet("root"));
        let a = graph.insert(Snippet("a"));
        let b = graph.insert(Snippet("b"));
        let a1 = graph.insert(Snippet("a1"));
        graph.add_child(root, a).unwrap();
        graph.add_child(root, b).unwrap();
        graph.add_child(a, a1).unwrap();

        let (mut all, mut actives) = (Vec::new(), Vec::new());
        graph.collect_chunks(root.id(), &mut all, &mut actives);

        assert_eq!(all, [root.id(), a.id(), a1.id(), b.id()]);
        assert_eq!(actives, [a1.id(), a.id(), b.id(), root.id()]);
    }

    #[test]
    fn test_proxy_recorded_but_not_active() {
        let mut graph = ChunkGraph::new();
        let target = graph.insert(Snippet("t"));
        let proxy = graph.create_proxy(target).unwrap();

        let (mut all, mut actives) = (Vec::new(), Vec::new());
        graph.collect_chunks(proxy.id(), &mut all, &mut actives);

        assert_eq!(all, [proxy.id(), target.id()]);
        assert_eq!(actives, [target.id()]);
        assert_eq!(graph.hash(proxy).unwrap(), "t");
        assert!(graph.has_code(proxy).unwrap());
    }

    #[test]
    fn test_remove_detaches_everywhere() {
        let mut graph = ChunkGraph::new();
        let parent = graph.insert(GroupChunk);
        let child = graph.insert(Snippet("c"));
        let proxy = graph.create_proxy(child).unwrap();
        graph.add_child(parent, child).unwrap();

        assert!(graph.remove(child).is_some());
        assert!(graph.children(parent).is_empty());
        assert_eq!(graph.proxy(proxy), None);
        assert!(graph.remove(child).is_none());
    }

    #[test]
    fn test_get_pair_mut_rejects_same_chunk() {
        let mut graph = ChunkGraph::new();
        let a = graph.insert(Snippet("a"));
        let b = graph.insert(Snippet("b"));
        assert!(graph.get_pair_mut(a, a).is_none());
        let (a_ref, b_ref) = graph.get_pair_mut(a, b).unwrap();
        assert_eq!((a_ref.0, b_ref.0), ("a", "b"));
    }

    #[test]
    fn test_downcast_type_mismatch() {
        let mut graph = ChunkGraph::new();
        let a = graph.insert(Snippet("a"));
        assert!(graph.downcast::<Snippet>(a.id()).is_ok());
        assert!(matches!(
            graph.downcast::<GroupChunk>(a.id()),
            Err(ChunkError::TypeMismatch { .. })
        ));
    }
}
