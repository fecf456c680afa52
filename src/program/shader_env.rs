//! Shader Template Environment
//!
//! Chunk code and program templates are WGSL files under `src/shaders`,
//! embedded into the binary with `rust-embed` and rendered with minijinja
//! using the engine's custom syntax:
//!
//! | Construct | Syntax |
//! |-----------|--------|
//! | Block     | `{$ if shadow_index >= 0 $} ... {$ endif $}` |
//! | Variable  | `{{ index }}` |
//! | Line statement | `$$ for i in range(count)` |
//!
//! Template names are paths relative to `src/shaders`; the `.wgsl` extension
//! may be left out.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::errors::Result;

pub static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/shaders"]
struct ShaderAssets;

pub fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        match SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
        {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => log::error!("Failed to configure shader template syntax: {e}"),
        }

        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        // Chunk fragments are concatenated as-is.
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);

        env.set_loader(shader_loader);

        env
    })
}

/// Renders the named template (`.wgsl` extension optional).
pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<String> {
    let template = get_env().get_template(name)?;
    let source = template.render(ctx)?;
    Ok(source)
}

/// Looks `name` up among the embedded shaders.
///
/// A file that is not valid UTF-8 is reported instead of being skipped.
fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let path: Cow<'_, str> = if name.ends_with(".wgsl") {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    let Some(file) = ShaderAssets::get(&path) else {
        return Ok(None);
    };
    match String::from_utf8(file.data.into_owned()) {
        Ok(source) => Ok(Some(source)),
        Err(e) => Err(Error::new(
            ErrorKind::TemplateNotFound,
            format!("shader '{path}' is not UTF-8: {e}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_template_is_error() {
        assert!(render("does/not/exist", minijinja::context! {}).is_err());
    }

    #[test]
    fn test_extension_optional() {
        let a = render("lights/pre-light-setup", minijinja::context! {}).unwrap();
        let b = render("lights/pre-light-setup.wgsl", minijinja::context! {}).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_include_resolves_through_loader() {
        let source = render("standard.frag", minijinja::context! {}).unwrap();
        assert!(source.contains("fn light_contribution"));
    }
}
