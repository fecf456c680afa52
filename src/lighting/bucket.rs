//! Per-type light buckets.
//!
//! A bucket is the chunk generating and feeding the code of every light of
//! one [`LightType`]. Its generated code depends on:
//!
//! - the light count (array sizes, one unrolled block per light)
//! - the shadow slot of each light (a literal in the per-light block)
//!
//! Both are part of the hash. Colors, positions and shadow matrices are
//! uploaded values and never touch the code.

use std::borrow::Cow;
use std::fmt::Write as _;

use slotmap::SlotMap;
use smallvec::SmallVec;

use super::buffer::LightBuffer;
use super::light::{Light, LightId, LightType};
use super::shadow::ShadowPool;
use crate::chunks::{Chunk, ChunkCaps, ChunkSlots};
use crate::errors::Result;
use crate::program::shader_env;
use crate::program::{ProgramUniforms, TextureHandle, UniformValue};

/// Slot receiving declarations and helper functions.
pub const PRE_SLOT: &str = "pf";
/// Slot receiving the light loop body.
pub const LIGHTS_SLOT: &str = "lightsf";

pub struct LightBucket {
    light_type: LightType,
    lights: Vec<LightId>,
    shadow_slots: Vec<Option<u32>>,
    shadow_maps: Vec<Option<TextureHandle>>,
    env_maps: Vec<Option<TextureHandle>>,
    buffers: SmallVec<[LightBuffer; 5]>,
}

impl LightBucket {
    #[must_use]
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            lights: Vec::new(),
            shadow_slots: Vec::new(),
            shadow_maps: Vec::new(),
            env_maps: Vec::new(),
            buffers: light_type
                .layout()
                .iter()
                .map(|(_, attribute)| LightBuffer::new(attribute.components()))
                .collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    #[inline]
    #[must_use]
    pub fn lights(&self) -> &[LightId] {
        &self.lights
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Shadow slot of each light as of the last update.
    #[inline]
    #[must_use]
    pub fn shadow_slots(&self) -> &[Option<u32>] {
        &self.shadow_slots
    }

    /// Packed buffer uploaded to `uniform`.
    #[must_use]
    pub fn buffer(&self, uniform: &str) -> Option<&LightBuffer> {
        self.light_type
            .layout()
            .iter()
            .position(|(name, _)| *name == uniform)
            .map(|i| &self.buffers[i])
    }

    /// Appends a light. Returns `false` if it was already present.
    ///
    /// A `true` return changes the generated code.
    pub fn add_light(&mut self, id: LightId) -> bool {
        if self.lights.contains(&id) {
            return false;
        }
        self.lights.push(id);
        self.shadow_slots.push(None);
        self.shadow_maps.push(None);
        self.env_maps.push(None);
        true
    }

    /// Removes a light. A `true` return changes the generated code.
    pub fn remove_light(&mut self, id: LightId) -> bool {
        let Some(i) = self.lights.iter().position(|l| *l == id) else {
            return false;
        };
        self.lights.remove(i);
        self.shadow_slots.remove(i);
        self.shadow_maps.remove(i);
        self.env_maps.remove(i);
        true
    }

    /// Packs every light and claims shadow slots. Called once per pass.
    ///
    /// Returns whether a shadow slot changed, which changes the code.
    pub fn update(&mut self, lights: &SlotMap<LightId, Light>, pool: &mut ShadowPool) -> bool {
        let count = self.lights.len();
        for buffer in &mut self.buffers {
            if buffer.resize(count) {
                log::trace!("Resized {:?} light buffers to {count} lights", self.light_type);
            }
        }

        let mut code_changed = false;
        for (i, id) in self.lights.iter().enumerate() {
            let Some(light) = lights.get(*id) else {
                continue;
            };

            for ((_, attribute), buffer) in self.light_type.layout().iter().zip(&mut self.buffers) {
                attribute.pack(light, buffer.slot_mut(i));
            }

            let slot = if light.cast_shadows {
                pool.request(&light.shadow)
            } else {
                None
            };
            if self.shadow_slots[i] != slot {
                code_changed = true;
                self.shadow_slots[i] = slot;
            }
            self.shadow_maps[i] = slot.and(light.shadow.map);
            self.env_maps[i] = light.env_map();
        }
        code_changed
    }
}

impl Chunk for LightBucket {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::CODE | ChunkCaps::SETUP
    }

    fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
        if self.lights.is_empty() {
            return Ok(());
        }

        let count = self.lights.len();
        let mut bindings = self.light_type.layout().len() as u32;
        if self.light_type == LightType::Ibl {
            // Environment sampler + one cube map per light.
            bindings += 1 + count as u32;
        }
        let binding = slots.reserve_bindings(bindings);

        let pre = shader_env::render(
            self.light_type.pre_template(),
            minijinja::context! { count => count, binding => binding },
        )?;
        slots.add(PRE_SLOT, &pre);

        let mut code = String::new();
        for (index, slot) in self.shadow_slots.iter().enumerate() {
            let shadow_index = slot.map_or(-1, i64::from);
            code.push_str(&shader_env::render(
                self.light_type.light_template(),
                minijinja::context! { index => index, shadow_index => shadow_index },
            )?);
        }
        slots.add(LIGHTS_SLOT, &code);
        Ok(())
    }

    fn hash(&self) -> Cow<'_, str> {
        let mut hash = format!("{}{}", self.light_type.tag(), self.lights.len());
        for (i, slot) in self.shadow_slots.iter().enumerate() {
            if let Some(slot) = slot {
                let _ = write!(hash, ",{i}:{slot}");
            }
        }
        Cow::Owned(hash)
    }

    fn setup(&mut self, program: &dyn ProgramUniforms) {
        if self.lights.is_empty() {
            return;
        }

        for ((name, attribute), buffer) in self.light_type.layout().iter().zip(&self.buffers) {
            program.set_uniform(
                name,
                UniformValue::floats(attribute.components() as u32, buffer.view()),
            );
        }

        for (slot, map) in self.shadow_slots.iter().zip(&self.shadow_maps) {
            if let (Some(slot), Some(map)) = (slot, map) {
                program.set_uniform(&format!("tShadowMap{slot}"), UniformValue::Texture(*map));
            }
        }

        if self.light_type == LightType::Ibl {
            for (i, env) in self.env_maps.iter().enumerate() {
                if let Some(env) = env {
                    program.set_uniform(&format!("tEnv{i}"), UniformValue::Texture(*env));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::lighting::light::ShadowSettings;

    fn setup_lights(n: usize, shadows: bool) -> (SlotMap<LightId, Light>, LightBucket) {
        let mut lights = SlotMap::with_key();
        let mut bucket = LightBucket::new(LightType::Directional);
        for i in 0..n {
            let mut light = Light::directional(Vec3::NEG_Y).with_color(Vec3::splat(i as f32), 1.0);
            if shadows {
                light = light.with_shadow(ShadowSettings::default());
            }
            bucket.add_light(lights.insert(light));
        }
        (lights, bucket)
    }

    #[test]
    fn test_add_is_idempotent() {
        let (_, mut bucket) = setup_lights(1, false);
        let id = bucket.lights()[0];
        assert!(!bucket.add_light(id));
        assert_eq!(bucket.len(), 1);
    }

    #[test]
    fn test_hash_includes_assigned_slots() {
        let (lights, mut bucket) = setup_lights(2, true);
        let mut pool = ShadowPool::new(4);
        assert!(bucket.update(&lights, &mut pool));
        assert_eq!(bucket.hash(), "dir2,0:0,1:1");

        pool.reset();
        assert!(!bucket.update(&lights, &mut pool));
        assert_eq!(bucket.hash(), "dir2,0:0,1:1");
    }

    #[test]
    fn test_values_do_not_change_hash() {
        let (mut lights, mut bucket) = setup_lights(2, false);
        let mut pool = ShadowPool::new(4);
        bucket.update(&lights, &mut pool);
        let before = bucket.hash().into_owned();

        let id = bucket.lights()[1];
        lights[id].color = Vec3::new(9.0, 9.0, 9.0);
        assert!(!bucket.update(&lights, &mut pool));
        assert_eq!(bucket.hash(), before);
        assert_eq!(&bucket.buffer("uLDirColors").unwrap().view()[4..7], [9.0, 9.0, 9.0]);
    }
}
