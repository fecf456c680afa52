//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`ChunkError`] covers all failure modes including:
//! - Structural edits that would break the acyclic chunk graph
//! - Lookups of chunks or collections that no longer exist
//! - Chunk template rendering failures
//! - Program compilation failures reported by the GPU backend
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ChunkError>`.
//!
//! ```rust,ignore
//! use myth_chunks::errors::{ChunkError, Result};
//!
//! fn attach(graph: &mut ChunkGraph, parent: ChunkId, child: ChunkId) -> Result<()> {
//!     graph.add_child(parent, child)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::chunks::{ChunkId, CollectionId};

/// The main error type for chunk assembly.
///
/// Structural variants are raised before any state change: when an edit
/// fails, the graph is left exactly as it was.
#[derive(Error, Debug)]
pub enum ChunkError {
    // ========================================================================
    // Structural Errors
    // ========================================================================
    /// The edit would make a chunk reachable from itself.
    #[error("{operation}() would lead to a cyclic chunk dependency")]
    CyclicDependency {
        /// Name of the rejected operation (`add_child`, `set_proxy`)
        operation: &'static str,
    },

    /// The chunk is already a direct child of the parent.
    #[error("chunk {child:?} is already a child of {parent:?}")]
    DuplicateChild {
        /// The parent chunk
        parent: ChunkId,
        /// The chunk that was added twice
        child: ChunkId,
    },

    /// The chunk id is stale or was never issued by this graph.
    #[error("chunk not found: {0:?}")]
    ChunkNotFound(ChunkId),

    /// The collection id is stale or was never issued by this graph.
    #[error("chunk collection not found: {0:?}")]
    CollectionNotFound(CollectionId),

    /// The chunk exists but is not of the requested concrete type.
    #[error("chunk {id:?} is not a {expected}")]
    TypeMismatch {
        /// The chunk that was looked up
        id: ChunkId,
        /// Name of the requested type
        expected: &'static str,
    },

    // ========================================================================
    // Code Generation Errors
    // ========================================================================
    /// A chunk template failed to load or render.
    #[error("Shader template error: {0}")]
    Template(#[from] minijinja::Error),

    /// An enum chunk was declared without variants.
    #[error("shader enum '{name}' has no variants")]
    EmptyEnum {
        /// Name of the enum chunk
        name: &'static str,
    },

    /// An enum chunk was set to a value it does not declare.
    #[error("unknown variant '{value}' for shader enum '{name}'")]
    UnknownVariant {
        /// Name of the enum chunk
        name: &'static str,
        /// The rejected value
        value: String,
    },

    // ========================================================================
    // Program Errors
    // ========================================================================
    /// The backend rejected the resolved sources.
    #[error("Failed to compile program '{label}': {message}")]
    ProgramCompile {
        /// Label of the program (template uid)
        label: String,
        /// Backend diagnostic
        message: String,
    },
}

/// Alias for `Result<T, ChunkError>`.
pub type Result<T> = std::result::Result<T, ChunkError>;
