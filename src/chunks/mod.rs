//! Shader Chunks
//!
//! Composable units of shader code generation and uniform upload.
//!
//! - [`Chunk`]: behaviour trait (code, hash, setup)
//! - [`ChunkGraph`]: arena owning chunk structure (children, proxies) and
//!   collections, with cycle checks on every structural edit
//! - [`ChunkCollection`]: lazily flattened active list + content hash
//! - [`ChunkSlots`]: named accumulation of generated fragments
//!
//! ```rust,ignore
//! let mut graph = ChunkGraph::new();
//! let root = graph.insert(GroupChunk);
//! let flag = graph.insert(ShaderFlag::new("iblShadowing", true));
//! graph.add_child(root, flag)?;
//!
//! let collection = graph.create_collection();
//! graph.collection_add(collection, root)?;
//! let slots = graph.collection_gen_code(collection)?;
//! ```

pub mod builtin;
pub mod chunk;
pub mod collection;
pub mod graph;
pub mod slots;

pub use builtin::{DEFINITIONS_SLOT, ShaderEnum, ShaderFlag, TemplateChunk};
pub use chunk::{Chunk, ChunkCaps, ChunkHandle, ChunkId, CollectionId, GroupChunk};
pub use collection::ChunkCollection;
pub use graph::ChunkGraph;
pub use slots::{ChunkSlots, SlotCode};
