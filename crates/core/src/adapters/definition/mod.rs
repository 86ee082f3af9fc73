//! Data-described sources.
//!
//! A definition is a TOML document describing how to log into a site, how to
//! build its search request and where each result field lives in its JSON
//! response. One generic [`DefinitionAdapter`] interprets any definition.
//!
//! ```toml
//! id = "example"
//! name = "Example"
//! kind = "public"
//! links = ["https://example.org/"]
//!
//! [caps]
//! search = true
//! [[caps.categories]]
//! token = "1"
//! category = 2000
//! description = "Movies"
//!
//! [search]
//! path = "api/search"
//! [search.params]
//! q = "{{term}}"
//! cat = "{{categories}}"
//! [search.response]
//! results = "data"
//! title = "name"
//! link = "download"
//! ```

mod adapter;
mod extract;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::category::CategoryMapper;
use crate::http::{Encoding, Method};
use crate::registry::RegistryError;
use crate::source::{CapabilitySet, SourceKind};

pub use adapter::{DefinitionAdapter, TomlDefinitionInterpreter};

#[derive(Debug, Clone, Deserialize)]
pub struct Definition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_kind")]
    pub kind: SourceKind,
    pub links: Vec<String>,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub map_children_to_parent: bool,
    #[serde(default)]
    pub caps: DefinitionCaps,
    #[serde(default)]
    pub login: Option<LoginBlock>,
    pub search: SearchBlock,
}

fn default_kind() -> SourceKind {
    SourceKind::Public
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionCaps {
    #[serde(flatten)]
    pub modes: CapabilitySet,
    #[serde(default)]
    pub categories: Vec<CategoryRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRow {
    pub token: String,
    pub category: u32,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginBlock {
    pub path: String,
    /// Form fields; values may reference credentials as `{{username}}`.
    #[serde(default)]
    pub form: BTreeMap<String, String>,
    /// Text present in the response body only when the login failed.
    #[serde(default)]
    pub failure_marker: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchBlock {
    pub path: String,
    #[serde(default)]
    pub method: Method,
    /// Query (GET) or form (POST) parameters with `{{placeholder}}` templates.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default = "default_separator")]
    pub category_separator: String,
    pub response: ResponseFields,
}

fn default_separator() -> String {
    ",".to_string()
}

/// Dotted JSON paths of each result field, relative to one result row.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseFields {
    /// Path of the result array. Empty means the document root.
    #[serde(default)]
    pub results: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub magnet: Option<String>,
    #[serde(default)]
    pub info_hash: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub seeders: Option<String>,
    #[serde(default)]
    pub leechers: Option<String>,
    #[serde(default)]
    pub grabs: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub download_volume_factor: Option<String>,
    #[serde(default)]
    pub upload_volume_factor: Option<String>,
}

impl Definition {
    /// Parse and sanity-check a TOML definition.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let definition: Definition =
            toml::from_str(raw).map_err(|e| RegistryError::DefinitionParse {
                id: peek_id(raw),
                reason: e.to_string(),
            })?;
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let fail = |reason: &str| {
            Err(RegistryError::DefinitionParse {
                id: Some(self.id.clone()),
                reason: reason.to_string(),
            })
        };
        if self.id.trim().is_empty() {
            return fail("id cannot be empty");
        }
        if self.links.is_empty() {
            return fail("at least one link is required");
        }
        if self.search.response.title.is_empty() {
            return fail("search.response.title cannot be empty");
        }
        if self.search.response.link.is_none() && self.search.response.magnet.is_none() {
            return fail("search.response needs a link or a magnet field");
        }
        Ok(())
    }

    pub fn category_mapper(&self) -> CategoryMapper {
        let mut mapper =
            CategoryMapper::new().with_children_mapped_to_parent(self.map_children_to_parent);
        for row in &self.caps.categories {
            match &row.description {
                Some(description) => mapper.add_mapping_with_description(
                    row.token.clone(),
                    row.category,
                    description.clone(),
                ),
                None => mapper.add_mapping(row.token.clone(), row.category),
            }
        }
        mapper
    }
}

/// Best-effort id of a definition that failed to parse, for log messages.
fn peek_id(raw: &str) -> Option<String> {
    raw.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("id"))
        .and_then(|rest| rest.trim_start().strip_prefix('='))
        .map(|value| value.trim().trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::taxonomy::{MOVIES, MOVIES_HD};

    const MINIMAL: &str = r#"
id = "example"
name = "Example"
links = ["https://example.org/"]

[caps]
search = true
movie_search = true

[[caps.categories]]
token = "1"
category = 2000
description = "Movies"

[search]
path = "api/search"
[search.params]
q = "{{term}}"
[search.response]
results = "data"
title = "name"
link = "download"
"#;

    #[test]
    fn test_parse_minimal_definition() {
        let definition = Definition::parse(MINIMAL).unwrap();
        assert_eq!(definition.id, "example");
        assert_eq!(definition.kind, SourceKind::Public);
        assert_eq!(definition.encoding, Encoding::Utf8);
        assert!(definition.caps.modes.search);
        assert!(definition.caps.modes.movie_search);
        assert!(!definition.caps.modes.tv_search);
        assert_eq!(definition.search.method, Method::Get);
        assert_eq!(definition.search.category_separator, ",");
        assert!(definition.login.is_none());

        let mapper = definition.category_mapper();
        assert_eq!(mapper.to_source_tokens(&[MOVIES_HD]), Vec::<String>::new());
        assert_eq!(mapper.to_source_tokens(&[MOVIES]), vec!["1".to_string()]);
        assert!(mapper.to_universal_from_description("movies").contains(&MOVIES));
    }

    #[test]
    fn test_malformed_toml_reports_id() {
        let err = Definition::parse("id = \"broken\"\nname = ").unwrap_err();
        match err {
            RegistryError::DefinitionParse { id, .. } => assert_eq!(id.as_deref(), Some("broken")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_links_rejected() {
        let raw = MINIMAL.replace("links = [\"https://example.org/\"]", "links = []");
        assert!(Definition::parse(&raw).is_err());
    }
}
