//! CPU-side staging of uniform values.
//!
//! Programs receive values through `&self` (see [`ProgramUniforms`]), so the
//! store keeps them behind a `parking_lot` mutex. The GPU layer later pulls
//! the bytes of each dirty entry and writes them to its buffers.
//!
//! [`ProgramUniforms`]: super::backend::ProgramUniforms

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::backend::{TextureHandle, UniformValue};

/// Owned copy of a [`UniformValue`].
#[derive(Debug, Clone, PartialEq)]
pub enum StagedUniform {
    Floats { components: u32, data: Vec<f32> },
    Texture(TextureHandle),
}

impl From<UniformValue<'_>> for StagedUniform {
    fn from(value: UniformValue<'_>) -> Self {
        match value {
            UniformValue::Floats { components, data } => Self::Floats {
                components,
                data: data.to_vec(),
            },
            UniformValue::Vec2(v) => Self::Floats {
                components: 2,
                data: v.to_array().to_vec(),
            },
            UniformValue::Texture(handle) => Self::Texture(handle),
        }
    }
}

#[derive(Debug)]
struct Entry {
    value: StagedUniform,
    dirty: bool,
}

/// Declared uniform names plus their latest staged values.
#[derive(Debug, Default)]
pub struct UniformStore {
    declared: FxHashSet<String>,
    values: Mutex<FxHashMap<String, Entry>>,
}

impl UniformStore {
    pub fn new<I, S>(declared: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declared: declared.into_iter().map(Into::into).collect(),
            values: Mutex::new(FxHashMap::default()),
        }
    }

    #[inline]
    #[must_use]
    pub fn declares(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    pub fn declared(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    /// Stages `value` under `name`. Undeclared names are dropped.
    ///
    /// Returns whether the value was accepted.
    pub fn stage(&self, name: &str, value: UniformValue<'_>) -> bool {
        if !self.declares(name) {
            log::trace!("Ignoring undeclared uniform '{name}'");
            return false;
        }
        let value = StagedUniform::from(value);
        let mut values = self.values.lock();
        match values.get_mut(name) {
            Some(entry) => {
                if entry.value != value {
                    entry.value = value;
                    entry.dirty = true;
                }
            }
            None => {
                values.insert(name.to_owned(), Entry { value, dirty: true });
            }
        }
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<StagedUniform> {
        self.values.lock().get(name).map(|e| e.value.clone())
    }

    /// Raw bytes of a staged float array.
    #[must_use]
    pub fn bytes(&self, name: &str) -> Option<Vec<u8>> {
        match &self.values.lock().get(name)?.value {
            StagedUniform::Floats { data, .. } => Some(bytemuck::cast_slice(data).to_vec()),
            StagedUniform::Texture(_) => None,
        }
    }

    /// Texture bound to `name`, if any.
    #[must_use]
    pub fn texture(&self, name: &str) -> Option<TextureHandle> {
        match self.values.lock().get(name)?.value {
            StagedUniform::Texture(handle) => Some(handle),
            StagedUniform::Floats { .. } => None,
        }
    }

    #[must_use]
    pub fn is_dirty(&self, name: &str) -> bool {
        self.values.lock().get(name).is_some_and(|e| e.dirty)
    }

    /// Names changed since their last [`take_bytes`](Self::take_bytes).
    #[must_use]
    pub fn dirty_names(&self) -> Vec<String> {
        let values = self.values.lock();
        let mut names: Vec<String> = values
            .iter()
            .filter(|(_, e)| e.dirty)
            .map(|(k, _)| k.clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Bytes of a dirty float array, clearing its dirty bit.
    pub fn take_bytes(&self, name: &str) -> Option<Vec<u8>> {
        let mut values = self.values.lock();
        let entry = values.get_mut(name)?;
        if !entry.dirty {
            return None;
        }
        match &entry.value {
            StagedUniform::Floats { data, .. } => {
                entry.dirty = false;
                Some(bytemuck::cast_slice(data).to_vec())
            }
            StagedUniform::Texture(_) => None,
        }
    }
}

/// Names of module-scope `var` declarations in WGSL source.
///
/// Recognises `var name`, `var<uniform> name` and `var<storage, read> name`,
/// which covers every resource declaration the shader templates emit.
#[must_use]
pub fn declared_names(source: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in source.lines() {
        let Some(pos) = find_var_keyword(line) else {
            continue;
        };
        let mut rest = &line[pos + 3..];
        if let Some(stripped) = rest.strip_prefix('<') {
            let Some(end) = stripped.find('>') else {
                continue;
            };
            rest = &stripped[end + 1..];
        }
        let rest = rest.trim_start();
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

// Module-scope declarations only: local `var`s are indented inside functions,
// while resource declarations start the line or follow attributes.
fn find_var_keyword(line: &str) -> Option<usize> {
    let trimmed = line.trim_end();
    let mut search = 0;
    while let Some(found) = trimmed[search..].find("var") {
        let pos = search + found;
        let before = &trimmed[..pos];
        let after = trimmed[pos + 3..].chars().next();
        let starts_decl = before.is_empty() || before.trim_end().ends_with(')');
        let ends_keyword = matches!(after, Some('<' | ' '));
        if starts_decl && ends_keyword && !before.starts_with(char::is_whitespace) {
            return Some(pos);
        }
        search = pos + 3;
    }
    None
}
