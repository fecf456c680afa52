//! Built-in chunk kinds.
//!
//! - [`ShaderFlag`]: boolean compile-time constant
//! - [`ShaderEnum`]: one-of-N compile-time constant
//! - [`TemplateChunk`]: parameterless template rendered into one slot
//!
//! Flags and enums emit WGSL `const` declarations into the
//! [`DEFINITIONS_SLOT`], so shader code can branch on them and let the
//! compiler fold the dead paths away.
//!
//! Every hash carries the chunk's name next to its state. Two flags that are
//! both on must not hash alike when they declare different constants.

use std::borrow::Cow;
use std::fmt::Write as _;

use super::chunk::{Chunk, ChunkCaps};
use super::slots::ChunkSlots;
use crate::errors::{ChunkError, Result};
use crate::program::shader_env;

/// Slot receiving flag and enum constants.
pub const DEFINITIONS_SLOT: &str = "definitions";

/// Boolean constant `const <name>: bool = <value>;`.
#[derive(Debug, Clone)]
pub struct ShaderFlag {
    name: &'static str,
    value: bool,
}

impl ShaderFlag {
    #[must_use]
    pub fn new(name: &'static str, value: bool) -> Self {
        Self { name, value }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> bool {
        self.value
    }

    /// Returns whether the value changed (and the code with it).
    pub fn set(&mut self, value: bool) -> bool {
        let changed = self.value != value;
        self.value = value;
        changed
    }
}

impl Chunk for ShaderFlag {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::CODE
    }

    fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
        slots.add(
            DEFINITIONS_SLOT,
            &format!("const {}: bool = {};\n", self.name, self.value),
        );
        Ok(())
    }

    fn hash(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}{}", self.name, u8::from(self.value)))
    }
}

/// One-of-N constant.
///
/// Every variant is declared as `const <name>_<variant>: u32 = <i>u;` and the
/// selection as `const <name>: u32 = <name>_<value>;`.
#[derive(Debug, Clone)]
pub struct ShaderEnum {
    name: &'static str,
    variants: &'static [&'static str],
    current: usize,
}

impl ShaderEnum {
    /// Creates the enum set to its first variant.
    pub fn new(name: &'static str, variants: &'static [&'static str]) -> Result<Self> {
        if variants.is_empty() {
            return Err(ChunkError::EmptyEnum { name });
        }
        Ok(Self {
            name,
            variants,
            current: 0,
        })
    }

    pub fn with_value(name: &'static str, variants: &'static [&'static str], value: &str) -> Result<Self> {
        let mut e = Self::new(name, variants)?;
        e.set(value)?;
        Ok(e)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn variants(&self) -> &'static [&'static str] {
        self.variants
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> &'static str {
        self.variants[self.current]
    }

    /// Selects `value`. Returns whether the selection changed.
    pub fn set(&mut self, value: &str) -> Result<bool> {
        let index = self
            .variants
            .iter()
            .position(|v| *v == value)
            .ok_or_else(|| ChunkError::UnknownVariant {
                name: self.name,
                value: value.to_owned(),
            })?;
        let changed = self.current != index;
        self.current = index;
        Ok(changed)
    }
}

impl Chunk for ShaderEnum {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::CODE
    }

    fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
        let mut code = String::new();
        for (i, variant) in self.variants.iter().enumerate() {
            let _ = writeln!(code, "const {}_{variant}: u32 = {i}u;", self.name);
        }
        let _ = writeln!(code, "const {0}: u32 = {0}_{1};", self.name, self.value());
        slots.add(DEFINITIONS_SLOT, &code);
        Ok(())
    }

    fn hash(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}={}", self.name, self.value()))
    }
}

/// Renders an embedded template with no parameters into a fixed slot.
#[derive(Debug, Clone)]
pub struct TemplateChunk {
    slot: &'static str,
    template: &'static str,
}

impl TemplateChunk {
    #[must_use]
    pub fn new(slot: &'static str, template: &'static str) -> Self {
        Self { slot, template }
    }
}

impl Chunk for TemplateChunk {
    fn caps(&self) -> ChunkCaps {
        ChunkCaps::CODE
    }

    fn gen_code(&self, slots: &mut ChunkSlots) -> Result<()> {
        let code = shader_env::render(self.template, minijinja::context! {})?;
        slots.add(self.slot, &code);
        Ok(())
    }

    // The output never varies, so slot and template name identify it.
    fn hash(&self) -> Cow<'_, str> {
        Cow::Owned(format!("{}:{}", self.slot, self.template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_code_and_hash() {
        let mut flag = ShaderFlag::new("iblShadowing", false);
        let mut slots = ChunkSlots::new();
        flag.gen_code(&mut slots).unwrap();
        assert_eq!(
            slots.get(DEFINITIONS_SLOT),
            Some("const iblShadowing: bool = false;\n")
        );
        assert_eq!(flag.hash(), "iblShadowing0");

        assert!(flag.set(true));
        assert!(!flag.set(true));
        assert_eq!(flag.hash(), "iblShadowing1");
    }

    #[test]
    fn test_enum_code() {
        let e = ShaderEnum::with_value("depthFormat", &["D_DEPTH", "D_RGB"], "D_RGB").unwrap();
        let mut slots = ChunkSlots::new();
        e.gen_code(&mut slots).unwrap();
        assert_eq!(
            slots.get(DEFINITIONS_SLOT),
            Some(
                "const depthFormat_D_DEPTH: u32 = 0u;\n\
                 const depthFormat_D_RGB: u32 = 1u;\n\
                 const depthFormat: u32 = depthFormat_D_RGB;\n"
            )
        );
        assert_eq!(e.hash(), "depthFormat=D_RGB");
    }

    #[test]
    fn test_enum_rejects_unknown_variant() {
        let mut e = ShaderEnum::new("shadowFilter", &["PCFNONE", "PCF4x1"]).unwrap();
        assert!(matches!(
            e.set("PCF16x16"),
            Err(ChunkError::UnknownVariant { name: "shadowFilter", .. })
        ));
        assert_eq!(e.value(), "PCFNONE");
        assert!(e.set("PCF4x1").unwrap());
        assert!(!e.set("PCF4x1").unwrap());
    }

    #[test]
    fn test_same_state_different_names_hash_apart() {
        let fog = ShaderFlag::new("useFog", true);
        let skin = ShaderFlag::new("useSkinning", true);
        assert_ne!(fog.hash(), skin.hash());

        let a = ShaderEnum::new("tonemap", &["NONE", "ACES"]).unwrap();
        let b = ShaderEnum::new("fogMode", &["NONE", "EXP"]).unwrap();
        assert_ne!(a.hash(), b.hash());

        let vs = TemplateChunk::new("vertexBody", "lights/pre-light-setup");
        let fs = TemplateChunk::new("fragmentBody", "lights/pre-light-setup");
        assert_ne!(vs.hash(), fs.hash());
    }

    #[test]
    fn test_enum_without_variants_is_error() {
        assert!(matches!(
            ShaderEnum::new("empty", &[]),
            Err(ChunkError::EmptyEnum { name: "empty" })
        ));
        assert!(ShaderEnum::with_value("empty", &[], "x").is_err());
    }
}
