//! Shadow Slot Pool
//!
//! Bounded set of shadow-map bindings shared by every shadow-casting light.
//!
//! Each update pass starts with [`ShadowPool::reset`], then buckets request
//! slots in light order. Slots are handed out first come, first served until
//! the capacity is reached; later casters get no slot and render unshadowed.
//! Nothing carries over between passes except the count the code was last
//! generated for, which [`ShadowPool::check`] compares against.
//!
//! Per slot the pool stores:
//!
//! | Uniform                  | Components |
//! |--------------------------|------------|
//! | `uShadowMatrices`        | 16         |
//! | `uShadowTexelBiasVector` | 4          |
//! | `uShadowMapSize`         | 2 (size, 1/size) |

use std::borrow::Cow;

use glam::Vec2;

use super::light::ShadowSettings;
use crate::chunks::{Chunk, ChunkCaps, ChunkSlots};
use crate::errors::Result;
use crate::program::shader_env;
use crate::program::{ProgramUniforms, UniformValue};

/// Default number of shadow slots.
pub const MAX_SHADOWS: usize = 4;

const MATRIX_COMPONENTS: usize = 16;
const BIAS_COMPONENTS: usize = 4;
const SIZE_COMPONENTS: usize = 2;

/// Resources declared ahead of the per-slot textures: three storage arrays,
/// the kernel rotation and the sampler.
const FIXED_BINDINGS: u32 = 5;

pub struct ShadowPool {
    capacity: usize,
    count: usize,
    generated_count: usize,
    first_depth_texture: bool,
    generated_depth_texture: bool,
    matrices: Vec<f32>,
    texel_bias: Vec<f32>,
    map_sizes: Vec<f32>,
    kernel_rotation: Vec2,
}

impl Default for ShadowPool {
    fn default() -> Self {
        Self::new(MAX_SHADOWS)
    }
}

impl ShadowPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            count: 0,
            generated_count: 0,
            first_depth_texture: true,
            generated_depth_texture: true,
            matrices: vec![0.0; capacity * MATRIX_COMPONENTS],
            texel_bias: vec![0.0; capacity * BIAS_COMPONENTS],
            map_sizes: vec![0.0; capacity * SIZE_COMPONENTS],
            kernel_rotation: Vec2::from_angle(std::f32::consts::FRAC_PI_4),
        }
    }

    /// Sets the PCF kernel rotation from an angle in radians.
    pub fn set_kernel_rotation(&mut self, angle: f32) {
        self.kernel_rotation = Vec2::from_angle(angle);
    }

    #[inline]
    #[must_use]
    pub fn kernel_rotation(&self) -> Vec2 {
        self.kernel_rotation
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots handed out in the current pass.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Starts a new pass: every slot becomes free.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Claims the next free slot for a caster.
    ///
    /// Returns `None` once the pool is full.
    pub fn request(&mut self, shadow: &ShadowSettings) -> Option<u32> {
        if self.count >= self.capacity {
            log::debug!(
                "Shadow pool full ({} slots), light rendered without shadow",
                self.capacity
            );
            return None;
        }

        let i = self.count;
        self.count += 1;

        self.matrices[i * MATRIX_COMPONENTS..(i + 1) * MATRIX_COMPONENTS]
            .copy_from_slice(&shadow.projection.to_cols_array());
        self.texel_bias[i * BIAS_COMPONENTS..(i + 1) * BIAS_COMPONENTS]
            .copy_from_slice(&shadow.texel_bias.to_array());
        let size = shadow.map_size.max(1.0);
        self.map_sizes[i * SIZE_COMPONENTS] = size;
        self.map_sizes[i * SIZE_COMPONENTS + 1] = 1.0 / size;

        if i == 0 {
            self.first_depth_texture = shadow.depth_texture;
        }
        Some(i as u32)
    }

    /// Ends a pass. Returns whether the generated code is out of date.
    pub fn check(&mut self) -> bool {
        let depth_texture = self.depth_texture().unwrap_or(self.generated_depth_texture);
        let changed = self.count != self.generated_count || depth_texture != self.generated_depth_texture;
        self.generated_count = self.count;
        self.generated_depth_texture = depth_texture;
        changed
    }

    /// Shadow map format of slot 0, if any slot is taken.
    #[must_use]
    pub fn depth_texture(&self) -> Option<bool> {
        (self.count > 0).then_some(self.first_depth_texture)
    }

    #[must_use]
    pub fn matrices(&self) -> &[f32] {
        &self.matrices[..self.count * MATRIX_COMPONENTS]
    }

    #[must_use]
    pub fn texel_bias(&self) -> &[f32] {
        &self.texel_bias[..self.count * BIAS_COMPONENTS]
    }

    #[must_use]
    pub fn map_sizes(&self) -> &[f32] {
        &self.map_sizes[..self.count * SIZE_COMPONENTS]
    }
}

impl Chunk for ShadowPool {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::CODE | ChunkCaps::SETUP
    }

    fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
        if self.generated_count == 0 {
            return Ok(());
        }
        let binding = slots.reserve_bindings(FIXED_BINDINGS + self.generated_count as u32);
        let code = shader_env::render(
            "lights/shadow-maps-pre",
            minijinja::context! {
                count => self.generated_count,
                binding => binding,
                depth_texture => self.generated_depth_texture,
            },
        )?;
        slots.add("pf", &code);
        Ok(())
    }

    fn hash(&self) -> Cow<'_, str> {
        match self.generated_count {
            0 => Cow::Borrowed("shadows0"),
            n if self.generated_depth_texture => Cow::Owned(format!("shadows{n}d")),
            n => Cow::Owned(format!("shadows{n}r")),
        }
    }

    fn setup(&mut self, program: &dyn ProgramUniforms) {
        if self.count == 0 {
            return;
        }
        program.set_uniform("uShadowMatrices", UniformValue::floats(16, self.matrices()));
        program.set_uniform("uShadowTexelBiasVector", UniformValue::floats(4, self.texel_bias()));
        program.set_uniform("uShadowMapSize", UniformValue::floats(2, self.map_sizes()));
        if program.has_uniform("uShadowKernelRotation") {
            program.set_uniform("uShadowKernelRotation", UniformValue::Vec2(self.kernel_rotation));
        }
    }
}
