//! Shared test fixtures: a recording backend and snippet chunks.

#![allow(dead_code)]

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use myth_chunks::chunks::{Chunk, ChunkCaps, ChunkSlots};
use myth_chunks::errors::{ChunkError, Result};
use myth_chunks::program::{ContextId, GpuBackend, ProgramUniforms, TextureHandle, UniformValue};

// ============================================================================
// Mock backend
// ============================================================================

/// Backend that records what it compiles and can be told to fail.
pub struct MockBackend {
    context: ContextId,
    pub compilations: Cell<usize>,
    pub fail: Cell<bool>,
    pub last_fragment: RefCell<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            context: ContextId::next(),
            compilations: Cell::new(0),
            fail: Cell::new(false),
            last_fragment: RefCell::new(String::new()),
        }
    }
}

impl GpuBackend for MockBackend {
    type Program = MockProgram;

    fn context_id(&self) -> ContextId {
        self.context
    }

    fn create_program(&self, label: &str, vertex: &str, fragment: &str) -> Result<MockProgram> {
        if self.fail.get() {
            return Err(ChunkError::ProgramCompile {
                label: label.to_owned(),
                message: "forced failure".to_owned(),
            });
        }
        self.compilations.set(self.compilations.get() + 1);
        *self.last_fragment.borrow_mut() = fragment.to_owned();
        Ok(MockProgram {
            vertex: vertex.to_owned(),
            fragment: fragment.to_owned(),
            uniforms: RefCell::new(BTreeMap::new()),
        })
    }
}

/// Uniform value as recorded by [`MockProgram`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Floats(u32, Vec<f32>),
    Vec2(f32, f32),
    Texture(TextureHandle),
}

pub struct MockProgram {
    pub vertex: String,
    pub fragment: String,
    pub uniforms: RefCell<BTreeMap<String, Recorded>>,
}

impl MockProgram {
    pub fn uniform(&self, name: &str) -> Option<Recorded> {
        self.uniforms.borrow().get(name).cloned()
    }

    pub fn floats(&self, name: &str) -> Option<Vec<f32>> {
        match self.uniform(name)? {
            Recorded::Floats(_, data) => Some(data),
            _ => None,
        }
    }
}

impl ProgramUniforms for MockProgram {
    // Declared = appears in either source.
    fn has_uniform(&self, name: &str) -> bool {
        self.vertex.contains(name) || self.fragment.contains(name)
    }

    fn set_uniform(&self, name: &str, value: UniformValue<'_>) {
        let recorded = match value {
            UniformValue::Floats { components, data } => Recorded::Floats(components, data.to_vec()),
            UniformValue::Vec2(v) => Recorded::Vec2(v.x, v.y),
            UniformValue::Texture(t) => Recorded::Texture(t),
        };
        self.uniforms.borrow_mut().insert(name.to_owned(), recorded);
    }
}

// ============================================================================
// Snippet chunks
// ============================================================================

/// Code-only chunk appending a fixed string to one slot.
pub struct Snippet {
    pub slot: &'static str,
    pub code: String,
}

impl Snippet {
    pub fn new(slot: &'static str, code: &str) -> Self {
        Self {
            slot,
            code: code.to_owned(),
        }
    }
}

impl Chunk for Snippet {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::CODE
    }

    fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
        slots.add(self.slot, &self.code);
        Ok(())
    }

    fn hash(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.code)
    }
}

/// Setup-only chunk uploading one float.
pub struct Value {
    pub name: &'static str,
    pub value: f32,
}

impl Chunk for Value {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::SETUP
    }

    fn hash(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn setup(&mut self, program: &dyn ProgramUniforms) {
        program.set_uniform(self.name, UniformValue::floats(1, std::slice::from_ref(&self.value)));
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
