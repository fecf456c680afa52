//! Program assembly and caching.
//!
//! - [`backend`]: the GPU boundary ([`GpuBackend`], [`ProgramUniforms`])
//! - [`template`]: template pairs and `#pragma SLOT` resolution
//! - [`cache`] / [`registry`]: hash-keyed program cache, one per context
//! - [`wgpu_backend`]: `wgpu` implementation of the boundary
//! - [`shader_env`]: minijinja environment over the embedded WGSL files

pub mod backend;
pub mod cache;
pub mod registry;
pub mod shader_env;
pub mod template;
pub mod uniforms;
pub mod wgpu_backend;

pub use backend::{ContextId, GpuBackend, ProgramUniforms, TextureHandle, UniformValue};
pub use cache::{CacheStats, ProgramCache, ProgramSource};
pub use registry::ProgramCacheRegistry;
pub use template::{SLOT_PRAGMA, ShaderTemplate, process_slots};
pub use uniforms::{StagedUniform, UniformStore};
pub use wgpu_backend::{WgpuBackend, WgpuProgram, validate_wgsl};
