//! wgpu implementation of the GPU boundary.
//!
//! Each program is a pair of WGSL `ShaderModule`s plus a [`UniformStore`]
//! listing the resources the sources declare. Chunk setup stages values in
//! the store; the renderer pushes the dirty ones to its buffers with
//! [`WgpuProgram::upload`] before drawing.
//!
//! Both stages are parsed and validated with naga before any module is
//! created, so a broken program is returned as [`ChunkError::ProgramCompile`]
//! and the cache never stores it.

use super::backend::{ContextId, GpuBackend, ProgramUniforms, UniformValue};
use super::uniforms::{UniformStore, declared_names};
use crate::errors::{ChunkError, Result};

/// Parses and validates one WGSL stage on the CPU.
///
/// The message is naga's rendered diagnostic, spans included.
pub fn validate_wgsl(label: &str, stage: &str, source: &str) -> Result<()> {
    use wgpu::naga::front::wgsl;
    use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};

    let compile_error = |message: String| ChunkError::ProgramCompile {
        label: label.to_owned(),
        message: format!("{stage}: {message}"),
    };

    if source.trim().is_empty() {
        return Err(compile_error("empty source".to_owned()));
    }
    let module = wgsl::parse_str(source).map_err(|e| compile_error(e.emit_to_string(source)))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| compile_error(e.emit_to_string(source)))?;
    Ok(())
}

/// Program factory for one `wgpu::Device`.
pub struct WgpuBackend {
    device: wgpu::Device,
    context: ContextId,
}

impl WgpuBackend {
    #[must_use]
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            context: ContextId::next(),
        }
    }

    #[inline]
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    fn create_module(&self, label: &str, source: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
        })
    }
}

impl GpuBackend for WgpuBackend {
    type Program = WgpuProgram;

    fn context_id(&self) -> ContextId {
        self.context
    }

    fn create_program(&self, label: &str, vertex: &str, fragment: &str) -> Result<WgpuProgram> {
        for (stage, source) in [("vertex", vertex), ("fragment", fragment)] {
            validate_wgsl(label, stage, source)?;
        }

        let vertex_module = self.create_module(&format!("{label} (vertex)"), vertex);
        let fragment_module = self.create_module(&format!("{label} (fragment)"), fragment);

        let mut names = declared_names(vertex);
        for name in declared_names(fragment) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        Ok(WgpuProgram {
            label: label.to_owned(),
            vertex: vertex_module,
            fragment: fragment_module,
            uniforms: UniformStore::new(names),
        })
    }
}

/// Compiled vertex/fragment pair with staged uniform values.
pub struct WgpuProgram {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    uniforms: UniformStore,
}

impl WgpuProgram {
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    #[must_use]
    pub fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex
    }

    #[inline]
    #[must_use]
    pub fn fragment_module(&self) -> &wgpu::ShaderModule {
        &self.fragment
    }

    #[inline]
    #[must_use]
    pub fn uniforms(&self) -> &UniformStore {
        &self.uniforms
    }

    /// Writes the staged value of `name` to `buffer` if it changed since the
    /// last upload. Returns whether anything was written.
    pub fn upload(&self, queue: &wgpu::Queue, name: &str, buffer: &wgpu::Buffer) -> bool {
        match self.uniforms.take_bytes(name) {
            Some(bytes) => {
                queue.write_buffer(buffer, 0, &bytes);
                true
            }
            None => false,
        }
    }
}

impl ProgramUniforms for WgpuProgram {
    fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.declares(name)
    }

    fn set_uniform(&self, name: &str, value: UniformValue<'_>) {
        self.uniforms.stage(name, value);
    }
}
