//! File-name templates
//!
//! A template is literal text mixed with `{{.Field}}` actions, e.g.
//! `{{.AssetType}}/{{.PublicID}}.{{.Format}}`. Templates are compiled once at
//! startup; every syntax problem and every unknown field is reported then, so
//! rendering itself can only fail when the result is not a safe relative path.

use crate::error::TemplateError;
use crate::types::AssetDescriptor;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Matches one `{{ ... }}` action, capturing its trimmed body
fn action_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\{\{\s*(.*?)\s*\}\}").expect("action pattern is valid")
    })
}

/// Matches a `.Field` reference inside an action
fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^\.([A-Za-z][A-Za-z0-9_]*)$").expect("field pattern is valid")
    })
}

/// Asset fields a template may reference
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    /// `.AssetID`
    AssetId,
    /// `.PublicID`
    PublicId,
    /// `.Format`
    Format,
    /// `.Version`
    Version,
    /// `.AssetType` (resource type)
    AssetType,
    /// `.Type` (delivery type)
    Type,
    /// `.CreatedAt`
    CreatedAt,
    /// `.Bytes`
    Bytes,
    /// `.Width`
    Width,
    /// `.Height`
    Height,
    /// `.URL`
    Url,
    /// `.SecureURL`
    SecureUrl,
    /// `.AccessMode`
    AccessMode,
}

impl Field {
    /// Every recognized field, in documentation order
    pub const ALL: [Field; 13] = [
        Field::AssetId,
        Field::PublicId,
        Field::Format,
        Field::Version,
        Field::AssetType,
        Field::Type,
        Field::CreatedAt,
        Field::Bytes,
        Field::Width,
        Field::Height,
        Field::Url,
        Field::SecureUrl,
        Field::AccessMode,
    ];

    /// Name as written in templates (without the leading dot)
    pub fn name(self) -> &'static str {
        match self {
            Field::AssetId => "AssetID",
            Field::PublicId => "PublicID",
            Field::Format => "Format",
            Field::Version => "Version",
            Field::AssetType => "AssetType",
            Field::Type => "Type",
            Field::CreatedAt => "CreatedAt",
            Field::Bytes => "Bytes",
            Field::Width => "Width",
            Field::Height => "Height",
            Field::Url => "URL",
            Field::SecureUrl => "SecureURL",
            Field::AccessMode => "AccessMode",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    fn write_value(self, asset: &AssetDescriptor, out: &mut String) {
        match self {
            Field::AssetId => out.push_str(&asset.asset_id),
            Field::PublicId => out.push_str(&asset.public_id),
            Field::Format => out.push_str(&asset.format),
            Field::Version => out.push_str(&asset.version.to_string()),
            Field::AssetType => out.push_str(&asset.resource_type),
            Field::Type => out.push_str(&asset.delivery_type),
            Field::CreatedAt => out.push_str(&asset.created_at),
            Field::Bytes => out.push_str(&asset.bytes.to_string()),
            Field::Width => out.push_str(&asset.width.to_string()),
            Field::Height => out.push_str(&asset.height.to_string()),
            Field::Url => out.push_str(&asset.url),
            Field::SecureUrl => out.push_str(&asset.secure_url),
            Field::AccessMode => out.push_str(&asset.access_mode),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A compiled file-name template
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// Compile a template string
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] for unbalanced braces, actions that are not plain
    /// field references, and references to fields assets do not have.
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for caps in action_pattern().captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            push_literal(&mut segments, source, cursor, whole.start())?;

            let body = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let field_name = field_pattern()
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .ok_or_else(|| TemplateError::InvalidAction {
                    action: body.to_string(),
                })?;
            let field = Field::from_name(field_name).ok_or_else(|| TemplateError::UnknownField {
                field: field_name.to_string(),
            })?;
            segments.push(Segment::Field(field));

            cursor = whole.end();
        }
        push_literal(&mut segments, source, cursor, source.len())?;

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template text this was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template for one asset
    pub fn render(&self, asset: &AssetDescriptor) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(field) => field.write_value(asset, &mut out),
            }
        }
        out
    }

    /// Render the template and check the result stays inside the target directory
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::UnsafePath`] when the rendered name is empty,
    /// absolute, or climbs out through `..`.
    pub fn render_path(&self, asset: &AssetDescriptor) -> Result<PathBuf, TemplateError> {
        let rendered = self.render(asset);
        let unsafe_path = |reason| TemplateError::UnsafePath {
            rendered: rendered.clone(),
            reason,
        };

        if rendered.starts_with('/') || rendered.starts_with('\\') {
            return Err(unsafe_path("absolute path"));
        }

        let path = Path::new(&rendered);
        let mut has_name = false;
        for component in path.components() {
            match component {
                Component::Normal(_) => has_name = true,
                Component::CurDir => {}
                Component::ParentDir => return Err(unsafe_path("parent directory reference")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(unsafe_path("absolute path"));
                }
            }
        }
        if !has_name {
            return Err(unsafe_path("empty file name"));
        }

        Ok(path.to_path_buf())
    }
}

impl std::str::FromStr for NameTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

fn push_literal(
    segments: &mut Vec<Segment>,
    source: &str,
    start: usize,
    end: usize,
) -> Result<(), TemplateError> {
    let text = &source[start..end];
    if let Some(pos) = text.find("{{") {
        return Err(TemplateError::UnclosedAction { offset: start + pos });
    }
    if let Some(pos) = text.find("}}") {
        return Err(TemplateError::UnexpectedClose { offset: start + pos });
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}
