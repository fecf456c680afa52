//! Light Model & Program Cache Settings
//!
//! Plain data structures configuring the two stateful parts of the crate.
//! Both derive `serde` traits so they can be loaded from the application's
//! configuration files; every field has a default.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_chunks::settings::{LightModelSettings, ShadowFiltering};
//!
//! let settings = LightModelSettings {
//!     shadow_filtering: ShadowFiltering::Pcf4x4,
//!     ibl_shadowing: true,
//!     ..Default::default()
//! };
//! let model = LightModel::new(&mut graph, settings)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::lighting::shadow::MAX_SHADOWS;

// ---------------------------------------------------------------------------
// ShadowFiltering
// ---------------------------------------------------------------------------

/// PCF kernel used when sampling shadow maps.
///
/// Selected at compile time through the `shadowFilter` shader enum.
///
/// | Variant   | Taps | Kernel rotation |
/// |-----------|------|-----------------|
/// | `None`    | 1    | no              |
/// | `Pcf4x1`  | 4    | yes             |
/// | `Pcf2x2`  | 4    | no              |
/// | `Pcf4x4`  | 16   | yes             |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShadowFiltering {
    None,
    #[default]
    Pcf4x1,
    Pcf4x4,
    Pcf2x2,
}

impl ShadowFiltering {
    /// Variant names of the `shadowFilter` shader enum, in declaration order.
    pub const VARIANTS: &'static [&'static str] = &["PCFNONE", "PCF4x1", "PCF4x4", "PCF2x2"];

    #[must_use]
    pub fn variant(self) -> &'static str {
        match self {
            Self::None => "PCFNONE",
            Self::Pcf4x1 => "PCF4x1",
            Self::Pcf4x4 => "PCF4x4",
            Self::Pcf2x2 => "PCF2x2",
        }
    }
}

// ---------------------------------------------------------------------------
// DepthFormat
// ---------------------------------------------------------------------------

/// Storage of shadow-map depth, taken from the first caster of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthFormat {
    /// Native depth texture, sampled with a comparison sampler.
    #[default]
    Depth,
    /// Depth packed into an RGB color texture.
    Rgb,
}

impl DepthFormat {
    /// Variant names of the `depthFormat` shader enum, in declaration order.
    pub const VARIANTS: &'static [&'static str] = &["D_DEPTH", "D_RGB"];

    #[must_use]
    pub fn variant(self) -> &'static str {
        match self {
            Self::Depth => "D_DEPTH",
            Self::Rgb => "D_RGB",
        }
    }

    #[must_use]
    pub fn from_depth_texture(depth_texture: bool) -> Self {
        if depth_texture { Self::Depth } else { Self::Rgb }
    }
}

// ---------------------------------------------------------------------------
// LightModelSettings
// ---------------------------------------------------------------------------

/// Construction parameters of a [`LightModel`](crate::lighting::LightModel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightModelSettings {
    /// Number of shadow slots. Casters past this count render unshadowed.
    ///
    /// Default: [`MAX_SHADOWS`] (4).
    pub max_shadows: usize,

    /// Initial PCF kernel.
    pub shadow_filtering: ShadowFiltering,

    /// Whether shadows also darken image-based lighting, scaled by each
    /// light's `ibl_shadowing` factor.
    pub ibl_shadowing: bool,

    /// Rotation of the PCF kernel, in radians. Default: π/4.
    pub kernel_rotation: f32,
}

impl Default for LightModelSettings {
    fn default() -> Self {
        Self {
            max_shadows: MAX_SHADOWS,
            shadow_filtering: ShadowFiltering::default(),
            ibl_shadowing: false,
            kernel_rotation: std::f32::consts::FRAC_PI_4,
        }
    }
}

// ---------------------------------------------------------------------------
// ProgramCacheSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramCacheSettings {
    /// Logs every resolved source at `trace` level on a cache miss.
    pub trace_sources: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_tables_match() {
        for f in [
            ShadowFiltering::None,
            ShadowFiltering::Pcf4x1,
            ShadowFiltering::Pcf4x4,
            ShadowFiltering::Pcf2x2,
        ] {
            assert!(ShadowFiltering::VARIANTS.contains(&f.variant()));
        }
        for d in [DepthFormat::Depth, DepthFormat::Rgb] {
            assert!(DepthFormat::VARIANTS.contains(&d.variant()));
        }
    }

    #[test]
    fn test_defaults() {
        let s = LightModelSettings::default();
        assert_eq!(s.max_shadows, 4);
        assert_eq!(s.shadow_filtering, ShadowFiltering::Pcf4x1);
        assert!(!s.ibl_shadowing);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s: LightModelSettings =
            serde_json::from_str(r#"{ "max_shadows": 2, "shadow_filtering": "Pcf2x2" }"#).unwrap();
        assert_eq!(s.max_shadows, 2);
        assert_eq!(s.shadow_filtering, ShadowFiltering::Pcf2x2);
        assert!((s.kernel_rotation - std::f32::consts::FRAC_PI_4).abs() < f32::EPSILON);

        let c: ProgramCacheSettings = serde_json::from_str("{}").unwrap();
        assert!(!c.trace_sources);
    }
}
