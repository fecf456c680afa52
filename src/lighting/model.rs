//! Light Model
//!
//! Owns the lights of a scene and every chunk needed to shade them. All
//! chunks hang under one root group, in this order:
//!
//! ```text
//! root
//! ├── iblShadowing      flag
//! ├── shadowFilter      enum
//! ├── depthFormat       enum
//! ├── shadows           ShadowPool
//! ├── preLights         template → lightsf
//! ├── directional       LightBucket
//! ├── spot              LightBucket
//! ├── point             LightBucket
//! ├── ibl               LightBucket
//! └── postLights        template → lightsf
//! ```
//!
//! Adding the root to a collection pulls in the whole model. Call
//! [`LightModel::update`] once per frame before hashing or compiling.

use slotmap::SlotMap;

use super::bucket::{LIGHTS_SLOT, LightBucket};
use super::light::{Light, LightId, LightType};
use super::shadow::ShadowPool;
use crate::chunks::{ChunkGraph, ChunkHandle, ChunkId, GroupChunk, ShaderEnum, ShaderFlag, TemplateChunk};
use crate::errors::{ChunkError, Result};
use crate::settings::{DepthFormat, LightModelSettings, ShadowFiltering};

pub struct LightModel {
    settings: LightModelSettings,
    lights: SlotMap<LightId, Light>,

    root: ChunkHandle<GroupChunk>,
    ibl_shadowing: ChunkHandle<ShaderFlag>,
    shadow_filter: ChunkHandle<ShaderEnum>,
    depth_format: ChunkHandle<ShaderEnum>,
    shadows: ChunkHandle<ShadowPool>,
    pre_lights: ChunkHandle<TemplateChunk>,
    buckets: [ChunkHandle<LightBucket>; 4],
    post_lights: ChunkHandle<TemplateChunk>,
}

impl LightModel {
    /// Inserts the model's chunks into `graph`.
    pub fn new(graph: &mut ChunkGraph, settings: LightModelSettings) -> Result<Self> {
        let root = graph.insert(GroupChunk);
        let ibl_shadowing = graph.insert(ShaderFlag::new("iblShadowing", settings.ibl_shadowing));
        let shadow_filter = graph.insert(ShaderEnum::with_value(
            "shadowFilter",
            ShadowFiltering::VARIANTS,
            settings.shadow_filtering.variant(),
        )?);
        let depth_format = graph.insert(ShaderEnum::new("depthFormat", DepthFormat::VARIANTS)?);

        let mut pool = ShadowPool::new(settings.max_shadows);
        pool.set_kernel_rotation(settings.kernel_rotation);
        let shadows = graph.insert(pool);

        let pre_lights = graph.insert(TemplateChunk::new(LIGHTS_SLOT, "lights/pre-light-setup"));
        let buckets = LightType::ALL.map(|t| graph.insert(LightBucket::new(t)));
        let post_lights = graph.insert(TemplateChunk::new(LIGHTS_SLOT, "lights/post-light-setup"));

        let model = Self {
            settings,
            lights: SlotMap::with_key(),
            root,
            ibl_shadowing,
            shadow_filter,
            depth_format,
            shadows,
            pre_lights,
            buckets,
            post_lights,
        };
        for chunk in model.chunks() {
            graph.add_child(root, chunk)?;
        }
        Ok(model)
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &LightModelSettings {
        &self.settings
    }

    /// Group holding every chunk of the model.
    #[inline]
    #[must_use]
    pub fn root(&self) -> ChunkHandle<GroupChunk> {
        self.root
    }

    /// The model's chunks in emission order.
    #[must_use]
    pub fn chunks(&self) -> Vec<ChunkId> {
        let mut chunks = vec![
            self.ibl_shadowing.id(),
            self.shadow_filter.id(),
            self.depth_format.id(),
            self.shadows.id(),
            self.pre_lights.id(),
        ];
        chunks.extend(self.buckets.iter().map(|b| b.id()));
        chunks.push(self.post_lights.id());
        chunks
    }

    #[must_use]
    pub fn bucket(&self, light_type: LightType) -> ChunkHandle<LightBucket> {
        // Declaration order of `LightType` matches `LightType::ALL`.
        self.buckets[light_type as usize]
    }

    #[inline]
    #[must_use]
    pub fn shadow_pool(&self) -> ChunkHandle<ShadowPool> {
        self.shadows
    }

    #[inline]
    #[must_use]
    pub fn depth_format(&self) -> ChunkHandle<ShaderEnum> {
        self.depth_format
    }

    // ========================================================================
    // Lights
    // ========================================================================

    /// Adds a light to the bucket of its type.
    pub fn add_light(&mut self, graph: &mut ChunkGraph, light: Light) -> Result<LightId> {
        let handle = self.bucket(light.light_type());
        let id = self.lights.insert(light);
        let bucket = graph
            .get_mut(handle)
            .ok_or(ChunkError::ChunkNotFound(handle.id()))?;
        if bucket.add_light(id) {
            graph.invalidate_code(handle);
        }
        Ok(id)
    }

    pub fn remove_light(&mut self, graph: &mut ChunkGraph, id: LightId) -> Result<Option<Light>> {
        let Some(light) = self.lights.remove(id) else {
            return Ok(None);
        };
        let handle = self.bucket(light.light_type());
        let bucket = graph
            .get_mut(handle)
            .ok_or(ChunkError::ChunkNotFound(handle.id()))?;
        if bucket.remove_light(id) {
            graph.invalidate_code(handle);
        }
        Ok(Some(light))
    }

    #[must_use]
    pub fn light(&self, id: LightId) -> Option<&Light> {
        self.lights.get(id)
    }

    /// Mutable access to a light's values.
    ///
    /// Changes are packed on the next [`update`](Self::update). The light
    /// type must not change; remove and re-add the light instead.
    pub fn light_mut(&mut self, id: LightId) -> Option<&mut Light> {
        self.lights.get_mut(id)
    }

    pub fn lights(&self) -> impl Iterator<Item = (LightId, &Light)> {
        self.lights.iter()
    }

    #[must_use]
    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    // ========================================================================
    // Options
    // ========================================================================

    pub fn set_shadow_filtering(&mut self, graph: &mut ChunkGraph, filtering: ShadowFiltering) -> Result<()> {
        let chunk = graph
            .get_mut(self.shadow_filter)
            .ok_or(ChunkError::ChunkNotFound(self.shadow_filter.id()))?;
        if chunk.set(filtering.variant())? {
            graph.invalidate_code(self.shadow_filter);
        }
        self.settings.shadow_filtering = filtering;
        Ok(())
    }

    pub fn set_ibl_shadowing(&mut self, graph: &mut ChunkGraph, enabled: bool) -> Result<()> {
        let chunk = graph
            .get_mut(self.ibl_shadowing)
            .ok_or(ChunkError::ChunkNotFound(self.ibl_shadowing.id()))?;
        if chunk.set(enabled) {
            graph.invalidate_code(self.ibl_shadowing);
        }
        self.settings.ibl_shadowing = enabled;
        Ok(())
    }

    // ========================================================================
    // Per-frame update
    // ========================================================================

    /// Packs every light, reassigns shadow slots and flags what changed.
    ///
    /// Buckets are visited in type order, so shadow slots go to casters in
    /// the order directional, spot, point, then insertion order within a
    /// type.
    pub fn update(&mut self, graph: &mut ChunkGraph) -> Result<()> {
        let shadows = self.shadows;
        graph
            .get_mut(shadows)
            .ok_or(ChunkError::ChunkNotFound(shadows.id()))?
            .reset();

        for &handle in &self.buckets {
            let (bucket, pool) = graph
                .get_pair_mut(handle, shadows)
                .ok_or(ChunkError::ChunkNotFound(handle.id()))?;
            let code_changed = bucket.update(&self.lights, pool);
            graph.mark_invalid(handle);
            if code_changed {
                graph.invalidate_code(handle);
            }
        }

        let pool = graph
            .get_mut(shadows)
            .ok_or(ChunkError::ChunkNotFound(shadows.id()))?;
        let pool_changed = pool.check();
        let depth_texture = pool.depth_texture();
        graph.mark_invalid(shadows);
        if pool_changed {
            graph.invalidate_code(shadows);
        }

        if let Some(depth_texture) = depth_texture {
            let format = DepthFormat::from_depth_texture(depth_texture);
            let chunk = graph
                .get_mut(self.depth_format)
                .ok_or(ChunkError::ChunkNotFound(self.depth_format.id()))?;
            if chunk.set(format.variant())? {
                graph.invalidate_code(self.depth_format);
            }
        }
        Ok(())
    }
}
