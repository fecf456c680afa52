//! Light description and per-type packing layouts.
//!
//! Every light type packs a fixed set of attributes into flat `f32` arrays:
//!
//! | Type        | Attributes (components)                                              |
//! |-------------|----------------------------------------------------------------------|
//! | Directional | directions (3), colors (4)                                           |
//! | Spot        | directions (3), colors (4), positions (3), spot (2), falloff (3)     |
//! | Point       | colors (3), positions (3), falloff (3)                               |
//! | IBL         | sh (27), params (4)                                                  |
//!
//! The fourth color component carries the light's IBL-shadowing factor.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::program::TextureHandle;

new_key_type! {
    /// Identity of a light inside a [`LightModel`](super::model::LightModel).
    pub struct LightId;
}

/// Closed set of light types. Each owns one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LightType {
    Directional,
    Spot,
    Point,
    Ibl,
}

impl LightType {
    /// Bucket order inside the light model.
    pub const ALL: [LightType; 4] = [Self::Directional, Self::Spot, Self::Point, Self::Ibl];

    /// Short tag prefixed to bucket hashes.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Directional => "dir",
            Self::Spot => "spot",
            Self::Point => "point",
            Self::Ibl => "ibl",
        }
    }

    /// Uniform name and attribute of every packed buffer, in upload order.
    #[must_use]
    pub fn layout(self) -> &'static [(&'static str, LightAttribute)] {
        use LightAttribute as A;
        match self {
            Self::Directional => &[("uLDirDirections", A::Direction), ("uLDirColors", A::ColorWithIblShadowing)],
            Self::Spot => &[
                ("uLSpotDirections", A::Direction),
                ("uLSpotColors", A::ColorWithIblShadowing),
                ("uLSpotPositions", A::Position),
                ("uLSpotSpot", A::Spot),
                ("uLSpotFalloff", A::Falloff),
            ],
            Self::Point => &[
                ("uLPointColors", A::Color),
                ("uLPointPositions", A::Position),
                ("uLPointFalloff", A::Falloff),
            ],
            Self::Ibl => &[("uLIblSh", A::SphericalHarmonics), ("uLIblParams", A::IblParams)],
        }
    }

    /// Template emitting the bucket's declarations into `pf`.
    #[must_use]
    pub fn pre_template(self) -> &'static str {
        match self {
            Self::Directional => "lights/directional-lights-pre",
            Self::Spot => "lights/spot-lights-pre",
            Self::Point => "lights/point-lights-pre",
            Self::Ibl => "lights/ibl-lights-pre",
        }
    }

    /// Template emitting one light's contribution into `lightsf`.
    #[must_use]
    pub fn light_template(self) -> &'static str {
        match self {
            Self::Directional => "lights/directional-light",
            Self::Spot => "lights/spot-light",
            Self::Point => "lights/point-light",
            Self::Ibl => "lights/ibl-light",
        }
    }
}

/// One packed attribute of a light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightAttribute {
    Direction,
    Position,
    /// Premultiplied color.
    Color,
    /// Premultiplied color + IBL-shadowing factor.
    ColorWithIblShadowing,
    /// `[scale, offset]` of the cone attenuation.
    Spot,
    /// `[range, 1 / range, decay]`.
    Falloff,
    /// Nine RGB spherical harmonics coefficients.
    SphericalHarmonics,
    /// `[intensity, specular mip count, ibl shadowing, 0]`.
    IblParams,
}

impl LightAttribute {
    #[must_use]
    pub fn components(self) -> usize {
        match self {
            Self::Direction | Self::Position | Self::Color | Self::Falloff => 3,
            Self::ColorWithIblShadowing | Self::IblParams => 4,
            Self::Spot => 2,
            Self::SphericalHarmonics => 27,
        }
    }

    /// Writes this attribute of `light` into `out` (`components()` long).
    pub fn pack(self, light: &Light, out: &mut [f32]) {
        let color = light.color * light.intensity;
        match self {
            Self::Direction => out.copy_from_slice(&light.direction.normalize_or_zero().to_array()),
            Self::Position => out.copy_from_slice(&light.position.to_array()),
            Self::Color => out.copy_from_slice(&color.to_array()),
            Self::ColorWithIblShadowing => {
                out.copy_from_slice(&color.extend(light.ibl_shadowing).to_array());
            }
            Self::Spot => out.copy_from_slice(&light.spot_data()),
            Self::Falloff => out.copy_from_slice(&light.falloff_data()),
            Self::SphericalHarmonics => match &light.kind {
                LightKind::Ibl { sh, .. } => out.copy_from_slice(sh),
                _ => out.fill(0.0),
            },
            Self::IblParams => {
                let mips = match &light.kind {
                    LightKind::Ibl { specular_mips, .. } => *specular_mips,
                    _ => 0.0,
                };
                out.copy_from_slice(&[light.intensity, mips, light.ibl_shadowing, 0.0]);
            }
        }
    }
}

/// Type-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum LightKind {
    Directional,
    Spot {
        /// Distance at which the light reaches zero. `0` means unbounded.
        range: f32,
        decay: f32,
        /// Full-intensity half angle, radians.
        inner_angle: f32,
        /// Cut-off half angle, radians.
        outer_angle: f32,
    },
    Point {
        range: f32,
        decay: f32,
    },
    Ibl {
        sh: [f32; 27],
        /// Prefiltered environment cube map.
        env_map: Option<TextureHandle>,
        specular_mips: f32,
    },
}

impl LightKind {
    #[must_use]
    pub fn light_type(&self) -> LightType {
        match self {
            Self::Directional => LightType::Directional,
            Self::Spot { .. } => LightType::Spot,
            Self::Point { .. } => LightType::Point,
            Self::Ibl { .. } => LightType::Ibl,
        }
    }
}

/// Shadow-map parameters of a shadow-casting light.
///
/// The projection is computed by the caller from the light and scene bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowSettings {
    pub map: Option<TextureHandle>,
    /// Shadow map resolution in texels.
    pub map_size: f32,
    /// World → shadow clip space.
    pub projection: Mat4,
    pub texel_bias: Vec4,
    /// Depth texture (`true`) or RGB-encoded depth (`false`).
    pub depth_texture: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map: None,
            map_size: 1024.0,
            projection: Mat4::IDENTITY,
            texel_bias: Vec4::ZERO,
            depth_texture: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// World position. Unused by directional and IBL lights.
    pub position: Vec3,
    /// World direction the light travels. Unused by point and IBL lights.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// How much this light's shadow darkens image-based lighting, `[0, 1]`.
    pub ibl_shadowing: f32,
    pub cast_shadows: bool,
    pub shadow: ShadowSettings,
}

impl Light {
    fn with_kind(kind: LightKind) -> Self {
        Self {
            kind,
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            color: Vec3::ONE,
            intensity: 1.0,
            ibl_shadowing: 0.5,
            cast_shadows: false,
            shadow: ShadowSettings::default(),
        }
    }

    #[must_use]
    pub fn directional(direction: Vec3) -> Self {
        Self {
            direction,
            ..Self::with_kind(LightKind::Directional)
        }
    }

    #[must_use]
    pub fn spot(position: Vec3, direction: Vec3, inner_angle: f32, outer_angle: f32) -> Self {
        Self {
            position,
            direction,
            ..Self::with_kind(LightKind::Spot {
                range: 0.0,
                decay: 2.0,
                inner_angle,
                outer_angle,
            })
        }
    }

    #[must_use]
    pub fn point(position: Vec3, range: f32) -> Self {
        Self {
            position,
            ..Self::with_kind(LightKind::Point { range, decay: 2.0 })
        }
    }

    #[must_use]
    pub fn ibl(sh: [f32; 27], env_map: Option<TextureHandle>, specular_mips: f32) -> Self {
        Self::with_kind(LightKind::Ibl {
            sh,
            env_map,
            specular_mips,
        })
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec3, intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    #[must_use]
    pub fn with_shadow(mut self, shadow: ShadowSettings) -> Self {
        self.cast_shadows = true;
        self.shadow = shadow;
        self
    }

    #[inline]
    #[must_use]
    pub fn light_type(&self) -> LightType {
        self.kind.light_type()
    }

    /// Cone attenuation as `cos_angle * scale + offset`.
    #[must_use]
    pub fn spot_data(&self) -> [f32; 2] {
        match self.kind {
            LightKind::Spot {
                inner_angle,
                outer_angle,
                ..
            } => {
                let cos_outer = outer_angle.cos();
                let scale = 1.0 / (inner_angle.cos() - cos_outer).max(0.001);
                [scale, -cos_outer * scale]
            }
            _ => [0.0, 1.0],
        }
    }

    #[must_use]
    pub fn falloff_data(&self) -> [f32; 3] {
        match self.kind {
            LightKind::Spot { range, decay, .. } | LightKind::Point { range, decay } => {
                let inv = if range > 0.0 { 1.0 / range } else { 0.0 };
                [range, inv, decay]
            }
            _ => [0.0, 0.0, 0.0],
        }
    }

    /// Environment map of an IBL light.
    #[must_use]
    pub fn env_map(&self) -> Option<TextureHandle> {
        match self.kind {
            LightKind::Ibl { env_map, .. } => env_map,
            _ => None,
        }
    }
}
