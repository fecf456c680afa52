//! GPU boundary.
//!
//! The chunk system never touches GPU objects directly. A [`GpuBackend`]
//! turns two resolved source strings into a program, and the program accepts
//! named uniform values through [`ProgramUniforms`].

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;

use crate::errors::Result;

/// Identity of a GPU context. Each context owns its own program cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a process-unique id.
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Opaque reference to a texture owned by the GPU layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// A value pushed to a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    /// Packed float array. `components` is the element width:
    /// 1–4 for scalars/vectors, 16 for 4×4 matrices.
    Floats { components: u32, data: &'a [f32] },
    Vec2(Vec2),
    Texture(TextureHandle),
}

impl<'a> UniformValue<'a> {
    #[inline]
    #[must_use]
    pub fn floats(components: u32, data: &'a [f32]) -> Self {
        Self::Floats { components, data }
    }

    /// Number of array elements, or 1 for single values.
    #[must_use]
    pub fn element_count(&self) -> usize {
        match self {
            Self::Floats { components, data } => data.len() / (*components).max(1) as usize,
            Self::Vec2(_) | Self::Texture(_) => 1,
        }
    }
}

/// Uniform sink of a compiled program.
pub trait ProgramUniforms {
    /// Whether the program declares `name`.
    fn has_uniform(&self, name: &str) -> bool;

    /// Stages a value. Unknown names are ignored.
    fn set_uniform(&self, name: &str, value: UniformValue<'_>);
}

/// Program factory bound to one GPU context.
pub trait GpuBackend {
    type Program: ProgramUniforms;

    fn context_id(&self) -> ContextId;

    /// Compiles a program from resolved vertex and fragment sources.
    ///
    /// Failures are reported as [`ChunkError::ProgramCompile`](crate::errors::ChunkError::ProgramCompile).
    fn create_program(&self, label: &str, vertex: &str, fragment: &str) -> Result<Self::Program>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ids_are_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_element_count() {
        let data = [0.0; 32];
        assert_eq!(UniformValue::floats(16, &data).element_count(), 2);
        assert_eq!(UniformValue::floats(4, &data[..8]).element_count(), 2);
        assert_eq!(UniformValue::Vec2(Vec2::ONE).element_count(), 1);
    }
}
