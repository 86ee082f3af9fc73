//! Bidirectional mapping between universal ids and a source's own tokens.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::taxonomy::{self, CUSTOM_CATEGORY_OFFSET};

/// One row of a source's category table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    /// The token the remote site uses (`"7"`, `"Movies"`, ...).
    pub source_token: String,
    /// Optional human description as shown on the site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Universal category id this token belongs to.
    pub universal: u32,
}

/// Per-source category table.
///
/// Written only while the owning adapter is being built; read concurrently
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct CategoryMapper {
    mappings: Vec<CategoryMapping>,
    declared: Vec<u32>,
    map_children_to_parent: bool,
}

impl CategoryMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt into matching child categories against parent-tagged results.
    pub fn with_children_mapped_to_parent(mut self, enabled: bool) -> Self {
        self.map_children_to_parent = enabled;
        self
    }

    /// A mapper that speaks the universal taxonomy natively (token `"2000"` is id 2000).
    pub fn identity() -> Self {
        let mut mapper = Self::new();
        for cat in taxonomy::ALL {
            mapper.push(cat.id.to_string(), None, cat.id);
        }
        mapper
    }

    pub fn maps_children_to_parent(&self) -> bool {
        self.map_children_to_parent
    }

    /// Map a source token to a universal category.
    pub fn add_mapping(&mut self, source_token: impl Into<String>, universal: u32) {
        self.push(source_token.into(), None, universal);
    }

    /// Map a source token to a universal category, keeping the site's description.
    pub fn add_mapping_with_description(
        &mut self,
        source_token: impl Into<String>,
        universal: u32,
        description: impl Into<String>,
    ) {
        self.push(source_token.into(), Some(description.into()), universal);
    }

    fn push(&mut self, source_token: String, description: Option<String>, universal: u32) {
        self.declare(universal);
        if let Some(custom) = custom_id(&source_token) {
            self.declare(custom);
        }
        self.mappings.push(CategoryMapping {
            source_token,
            description,
            universal,
        });
    }

    fn declare(&mut self, id: u32) {
        if !self.declared.contains(&id) {
            self.declared.push(id);
        }
    }

    /// All rows, in insertion order.
    pub fn mappings(&self) -> &[CategoryMapping] {
        &self.mappings
    }

    /// Universal ids (including custom ones) this source declares.
    pub fn declared_categories(&self) -> &[u32] {
        &self.declared
    }

    /// All distinct source tokens.
    pub fn source_tokens(&self) -> Vec<String> {
        dedup_ordered(self.mappings.iter().map(|m| m.source_token.clone()))
    }

    /// Whether any of `categories` is declared, directly or as a child of a
    /// declared top-level category.
    pub fn supports_any(&self, categories: &[u32]) -> bool {
        categories.iter().any(|&cat| {
            self.declared.contains(&cat)
                || taxonomy::parent_of(cat).is_some_and(|parent| self.declared.contains(&parent))
        })
    }

    /// Translate universal ids into the tokens a remote site understands.
    ///
    /// Output keeps first-appearance order and contains no duplicates.
    pub fn to_source_tokens(&self, universal: &[u32]) -> Vec<String> {
        let mut tokens = Vec::new();
        for &cat in universal {
            if taxonomy::is_custom(cat) {
                tokens.push((cat - CUSTOM_CATEGORY_OFFSET).to_string());
                continue;
            }

            let mut wanted = vec![cat];
            wanted.extend(taxonomy::children_of(cat));
            if self.map_children_to_parent {
                if let Some(parent) = taxonomy::parent_of(cat) {
                    wanted.push(parent);
                }
            }

            tokens.extend(
                self.mappings
                    .iter()
                    .filter(|m| wanted.contains(&m.universal))
                    .map(|m| m.source_token.clone()),
            );
        }
        dedup_ordered(tokens)
    }

    /// Translate a token reported by the site into universal ids.
    ///
    /// Numeric tokens always include `token + 100000`, mapped or not.
    pub fn to_universal_categories(&self, source_token: &str) -> BTreeSet<u32> {
        let mut ids: BTreeSet<u32> = self
            .mappings
            .iter()
            .filter(|m| m.source_token.eq_ignore_ascii_case(source_token))
            .map(|m| m.universal)
            .collect();
        if let Some(custom) = custom_id(source_token) {
            ids.insert(custom);
        }
        ids
    }

    /// Translate a category description (as printed on the site) into universal ids.
    pub fn to_universal_from_description(&self, description: &str) -> BTreeSet<u32> {
        let mut ids = BTreeSet::new();
        let hit = self.mappings.iter().find(|m| {
            m.description
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(description))
        });
        if let Some(mapping) = hit {
            ids.insert(mapping.universal);
            if let Some(custom) = custom_id(&mapping.source_token) {
                ids.insert(custom);
            }
        }
        ids
    }
}

/// Custom universal id of a numeric token; none when the token is not a
/// number or the offset id would not fit in a `u32`.
fn custom_id(source_token: &str) -> Option<u32> {
    source_token
        .trim()
        .parse::<u32>()
        .ok()?
        .checked_add(CUSTOM_CATEGORY_OFFSET)
}

fn dedup_ordered(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
