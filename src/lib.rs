#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! # Myth Chunks
//!
//! Composable shader chunks for the Myth engine.
//!
//! Shader programs are assembled from chunks that each contribute WGSL
//! fragments to named template slots and push uniform values at draw time.
//! Programs are cached per GPU context under a hash of everything the chunks
//! generate, so equivalent configurations compile once.
//!
//! ```rust,ignore
//! use myth_chunks::prelude::*;
//!
//! let mut graph = ChunkGraph::new();
//! let mut model = LightModel::new(&mut graph, LightModelSettings::default())?;
//! model.add_light(&mut graph, Light::directional(Vec3::NEG_Y))?;
//!
//! let collection = graph.create_collection();
//! graph.collection_add(collection, model.root())?;
//!
//! // Every frame
//! model.update(&mut graph)?;
//! let cache = registry.get_or_create(&backend);
//! let program = cache.compile_collection(&backend, &template, &mut graph, collection)?;
//! graph.collection_setup(collection, &*program)?;
//! ```

pub mod chunks;
pub mod errors;
pub mod lighting;
pub mod program;
pub mod settings;
pub mod utils;

pub use chunks::{
    Chunk, ChunkCaps, ChunkCollection, ChunkGraph, ChunkHandle, ChunkId, ChunkSlots, CollectionId, GroupChunk,
    ShaderEnum, ShaderFlag, TemplateChunk,
};
pub use errors::{ChunkError, Result};
pub use lighting::{Light, LightId, LightKind, LightModel, LightType, ShadowSettings};
pub use program::{
    ContextId, GpuBackend, ProgramCache, ProgramCacheRegistry, ProgramSource, ProgramUniforms, ShaderTemplate,
    TextureHandle, UniformValue, WgpuBackend, WgpuProgram,
};
pub use settings::{DepthFormat, LightModelSettings, ProgramCacheSettings, ShadowFiltering};

pub mod prelude {
    pub use crate::chunks::{ChunkGraph, ChunkHandle, ChunkId, CollectionId, GroupChunk};
    pub use crate::lighting::{Light, LightModel, LightType, ShadowSettings};
    pub use crate::program::{GpuBackend, ProgramCacheRegistry, ProgramUniforms, ShaderTemplate};
    pub use crate::settings::{LightModelSettings, ShadowFiltering};
    pub use glam::{Mat4, Vec3, Vec4};
}
