//! Chunk behaviour and handles.
//!
//! A [`Chunk`] is the behaviour half of a node in the [`ChunkGraph`]: it
//! generates code into [`ChunkSlots`], reports a content hash and uploads
//! uniforms. The structural half (children, proxy, subscribed collections,
//! pending-upload flag) lives in the graph node so that every chunk type
//! gets the same invalidation semantics.
//!
//! [`ChunkGraph`]: super::graph::ChunkGraph

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use bitflags::bitflags;
use slotmap::new_key_type;
use smallvec::SmallVec;

use super::slots::ChunkSlots;
use crate::errors::Result;
use crate::program::ProgramUniforms;

new_key_type! {
    /// Identity of a chunk inside a [`ChunkGraph`](super::graph::ChunkGraph).
    pub struct ChunkId;

    /// Identity of a collection inside a [`ChunkGraph`](super::graph::ChunkGraph).
    pub struct CollectionId;
}

bitflags! {
    /// What a chunk contributes. Read once when the chunk is inserted.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ChunkCaps: u8 {
        /// Generates source code.
        const CODE  = 1 << 0;
        /// Uploads uniform values.
        const SETUP = 1 << 1;
    }
}

/// Behaviour of a composable shader unit.
///
/// Implementations must keep [`hash`](Chunk::hash) in step with
/// [`gen_code`](Chunk::gen_code): two states producing different code must
/// hash differently, and states producing identical code should hash
/// identically so the program cache can share them.
pub trait Chunk: Any {
    fn caps(&self) -> ChunkCaps;

    /// Appends this chunk's fragments to `slots`.
    fn gen_code(&self, _slots: &mut ChunkSlots) -> Result<()> {
        Ok(())
    }

    /// Short deterministic digest of everything that shapes the generated code.
    fn hash(&self) -> Cow<'_, str>;

    /// Pushes current values to the program's uniforms.
    ///
    /// Only called with a program compiled from this chunk's current hash.
    fn setup(&mut self, _program: &dyn ProgramUniforms) {}
}

/// Structurally empty chunk.
///
/// Used as the placeholder behind proxies and as a grouping root whose
/// children carry the actual code.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupChunk;

impl Chunk for GroupChunk {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::empty()
    }

    fn hash(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

/// Typed [`ChunkId`], returned by [`ChunkGraph::insert`](super::graph::ChunkGraph::insert).
pub struct ChunkHandle<T> {
    id: ChunkId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ChunkHandle<T> {
    pub(crate) fn new(id: ChunkId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(self) -> ChunkId {
        self.id
    }
}

impl<T> Clone for ChunkHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ChunkHandle<T> {}

impl<T> PartialEq for ChunkHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ChunkHandle<T> {}

impl<T> Hash for ChunkHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for ChunkHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChunkHandle").field(&self.id).finish()
    }
}

impl<T> From<ChunkHandle<T>> for ChunkId {
    fn from(handle: ChunkHandle<T>) -> Self {
        handle.id
    }
}

/// Graph node: behaviour plus structure.
pub(crate) struct ChunkNode {
    pub(crate) chunk: Box<dyn Chunk>,
    pub(crate) caps: ChunkCaps,
    pub(crate) children: SmallVec<[ChunkId; 4]>,
    pub(crate) proxy: Option<ChunkId>,
    pub(crate) lists: SmallVec<[CollectionId; 2]>,
    pub(crate) invalid: bool,
}

impl ChunkNode {
    pub(crate) fn new(chunk: Box<dyn Chunk>) -> Self {
        let caps = chunk.caps();
        Self {
            chunk,
            caps,
            children: SmallVec::new(),
            proxy: None,
            lists: SmallVec::new(),
            invalid: true,
        }
    }

    pub(crate) fn subscribe(&mut self, list: CollectionId) {
        if !self.lists.contains(&list) {
            self.lists.push(list);
        }
    }

    pub(crate) fn unsubscribe(&mut self, list: CollectionId) {
        self.lists.retain(|l| *l != list);
    }
}
