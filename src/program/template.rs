//! Program templates and slot resolution.
//!
//! A template is a pair of WGSL sources containing `#pragma SLOT <name>`
//! markers. Resolution replaces each marker with the fragments a
//! [`ChunkSlots`] accumulated under that name:
//!
//! ```text
//! fn fs_main() -> @location(0) vec4<f32> {          fn fs_main() -> @location(0) vec4<f32> {
//!     var color = vec3<f32>(0.0);                       var color = vec3<f32>(0.0);
//!     #pragma SLOT lightsf               ──►      color += dir_light(0u);
//!     return vec4<f32>(color, 1.0);                     return vec4<f32>(color, 1.0);
//! }                                                 }
//! ```
//!
//! Markers whose slot received nothing are removed together with their line.

use std::borrow::Cow;

use crate::chunks::ChunkSlots;
use crate::errors::Result;

use super::shader_env;

/// Marker prefix recognised in template sources.
pub const SLOT_PRAGMA: &str = "#pragma SLOT";

/// Vertex + fragment template pair with a stable identity.
///
/// `uid` takes part in the program cache key, so two templates must never
/// share one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderTemplate {
    pub uid: Cow<'static, str>,
    pub vertex: Cow<'static, str>,
    pub fragment: Cow<'static, str>,
}

impl ShaderTemplate {
    #[must_use]
    pub fn new(
        uid: impl Into<Cow<'static, str>>,
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            uid: uid.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Loads both stages from the embedded shader folder.
    ///
    /// Sources go through the template environment once, so they may use
    /// `{$ include $}` for shared code. Slot markers pass through untouched.
    pub fn from_embedded(uid: &'static str, vertex: &str, fragment: &str) -> Result<Self> {
        let ctx = minijinja::context! {};
        Ok(Self {
            uid: Cow::Borrowed(uid),
            vertex: Cow::Owned(shader_env::render(vertex, &ctx)?),
            fragment: Cow::Owned(shader_env::render(fragment, &ctx)?),
        })
    }

    /// The lit surface template shipped with the crate.
    pub fn standard() -> Result<Self> {
        Self::from_embedded("standard", "standard.vert", "standard.frag")
    }

    /// Resolves both stages against `slots`.
    #[must_use]
    pub fn resolve(&self, slots: &ChunkSlots) -> (String, String) {
        (
            process_slots(&self.vertex, slots),
            process_slots(&self.fragment, slots),
        )
    }
}

/// Replaces every slot marker in `source` with the code of its slot.
///
/// A marker swallows the whitespace and line break following its name. When
/// it stands alone on its line its indentation goes too, so the inserted code
/// keeps its own layout and an empty slot leaves no blank line behind.
#[must_use]
pub fn process_slots(source: &str, slots: &ChunkSlots) -> String {
    let mut out = String::with_capacity(source.len() + slots.iter().map(|s| s.code.len()).sum::<usize>());
    let mut rest = source;

    while let Some(pos) = rest.find(SLOT_PRAGMA) {
        let (head, tail) = rest.split_at(pos);
        let after_pragma = &tail[SLOT_PRAGMA.len()..];

        let Some((name, after_marker)) = parse_marker(after_pragma) else {
            // Not a marker after all: keep the text verbatim.
            out.push_str(head);
            out.push_str(SLOT_PRAGMA);
            rest = after_pragma;
            continue;
        };

        let trailing = after_marker.trim_start_matches([' ', '\t']);
        let (at_line_end, remainder) = if let Some(r) = trailing.strip_prefix("\r\n") {
            (true, r)
        } else if let Some(r) = trailing.strip_prefix('\n') {
            (true, r)
        } else {
            (trailing.is_empty(), trailing)
        };

        let line_start = head.rfind('\n').map_or(0, |i| i + 1);
        let indent_only = head[line_start..].chars().all(|c| c == ' ' || c == '\t');
        if at_line_end && indent_only {
            out.push_str(&head[..line_start]);
        } else {
            out.push_str(head);
        }

        if let Some(code) = slots.get(name) {
            out.push_str(code);
        }
        rest = remainder;
    }

    out.push_str(rest);
    out
}

/// Splits `<ws><name>` off the text following the pragma keyword.
fn parse_marker(text: &str) -> Option<(&str, &str)> {
    let trimmed = text.trim_start_matches([' ', '\t']);
    if trimmed.len() == text.len() {
        return None;
    }
    let len = trimmed
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    if len == 0 {
        return None;
    }
    Some(trimmed.split_at(len))
}
