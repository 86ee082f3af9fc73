//! Source description and result records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::CategoryMapper;

use super::{Query, QueryType};

/// Access model of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Public,
    Private,
    /// Proxies other indexes (e.g. a remote Jackett instance).
    Aggregate,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceKind::Public => "public",
            SourceKind::Private => "private",
            SourceKind::Aggregate => "aggregate",
        };
        f.write_str(s)
    }
}

/// Query shapes a source supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySet {
    pub search: bool,
    pub tv_search: bool,
    pub movie_search: bool,
    pub music_search: bool,
    pub tv_search_imdb: bool,
    pub movie_search_imdb: bool,
    pub limits_default: Option<usize>,
    pub limits_max: Option<usize>,
}

impl CapabilitySet {
    /// Plain keyword search only.
    pub fn search_only() -> Self {
        Self {
            search: true,
            ..Default::default()
        }
    }

    /// Every query type, IMDB lookups included.
    pub fn all() -> Self {
        Self {
            search: true,
            tv_search: true,
            movie_search: true,
            music_search: true,
            tv_search_imdb: true,
            movie_search_imdb: true,
            limits_default: None,
            limits_max: None,
        }
    }

    /// Whether a source with these capabilities and `categories` can answer `query`.
    pub fn can_handle(&self, query: &Query, categories: &CategoryMapper) -> bool {
        if query.query_type == QueryType::Caps {
            return true;
        }
        if query.has_categories() && !categories.supports_any(&query.categories) {
            return false;
        }
        if query.is_imdb_query() {
            if self.tv_search_imdb && query.is_tv_search() {
                return true;
            }
            if self.movie_search_imdb && query.is_movie_search() {
                return true;
            }
            if !self.movie_search_imdb {
                return false;
            }
        }
        let supported = match query.query_type {
            QueryType::Search => self.search,
            QueryType::TvSearch => self.tv_search,
            QueryType::Movie => self.movie_search,
            QueryType::Music => self.music_search,
            QueryType::Caps => true,
        };
        // IMDB lookups are served by any IMDB-capable movie search.
        supported || (self.movie_search_imdb && query.is_imdb_query())
    }
}

/// A configured source. Immutable once built.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: SourceKind,
    pub site_link: String,
    pub caps: CapabilitySet,
    pub categories: CategoryMapper,
}

impl Source {
    pub fn can_handle(&self, query: &Query) -> bool {
        self.caps.can_handle(query, &self.categories)
    }

    pub fn summary(&self) -> SourceSummary {
        SourceSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
        }
    }
}

/// Identity of a source as reported in events and over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub id: String,
    pub name: String,
    pub kind: SourceKind,
}

/// One normalized result record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub title: String,
    /// Download link (`.torrent` URL or magnet).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnet_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seeders: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grabs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<u32>,
    pub publish_date: DateTime<Utc>,
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_ratio: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_seed_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_volume_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_volume_factor: Option<f64>,
}

impl ResultItem {
    pub fn new(title: impl Into<String>, publish_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            link: None,
            details: None,
            magnet_uri: None,
            info_hash: None,
            size_bytes: 0,
            seeders: None,
            peers: None,
            grabs: None,
            files: None,
            publish_date,
            categories: Vec::new(),
            minimum_ratio: None,
            minimum_seed_time: None,
            download_volume_factor: None,
            upload_volume_factor: None,
        }
    }

    pub fn with_categories(mut self, categories: Vec<u32>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::taxonomy::{AUDIO, MOVIES, MOVIES_HD, TV};

    fn movie_mapper() -> CategoryMapper {
        let mut mapper = CategoryMapper::new();
        mapper.add_mapping("1", MOVIES);
        mapper
    }

    #[test]
    fn test_caps_queries_always_handled() {
        let caps = CapabilitySet::default();
        let query = Query::search("").with_type(QueryType::Caps);
        assert!(caps.can_handle(&query, &CategoryMapper::new()));
    }

    #[test]
    fn test_unsupported_categories_rejected() {
        let caps = CapabilitySet::search_only();
        let mapper = movie_mapper();
        assert!(caps.can_handle(&Query::search("x").with_categories(vec![MOVIES_HD]), &mapper));
        assert!(!caps.can_handle(&Query::search("x").with_categories(vec![AUDIO]), &mapper));
        assert!(caps.can_handle(&Query::search("x"), &mapper));
    }

    #[test]
    fn test_imdb_lookup_falls_back_to_imdb_movie_search() {
        let caps = CapabilitySet {
            movie_search: true,
            movie_search_imdb: true,
            ..Default::default()
        };
        let mapper = movie_mapper();

        let imdb_search = Query::search("").with_imdb("tt0111161");
        assert!(caps.can_handle(&imdb_search, &mapper));
        assert!(caps.can_handle(&imdb_search.clone().with_type(QueryType::Music), &mapper));
        assert!(!caps.can_handle(&Query::search("plain"), &mapper));

        let no_imdb = CapabilitySet {
            movie_search: true,
            ..Default::default()
        };
        assert!(caps.can_handle(&imdb_search.with_type(QueryType::TvSearch), &mapper));
        assert!(!no_imdb.can_handle(&Query::search("").with_imdb("tt0111161"), &mapper));
    }

    #[test]
    fn test_query_type_availability() {
        let caps = CapabilitySet::search_only();
        let mapper = movie_mapper();
        assert!(!caps.can_handle(&Query::search("x").with_type(QueryType::TvSearch), &mapper));

        let tv = CapabilitySet {
            tv_search: true,
            ..Default::default()
        };
        let mut tv_mapper = CategoryMapper::new();
        tv_mapper.add_mapping("5", TV);
        assert!(tv.can_handle(&Query::search("x").with_type(QueryType::TvSearch), &tv_mapper));
    }

    #[test]
    fn test_imdb_requires_imdb_capability() {
        let mapper = movie_mapper();
        let query = Query::search("")
            .with_type(QueryType::Movie)
            .with_imdb("tt0111161");

        let plain = CapabilitySet {
            movie_search: true,
            ..Default::default()
        };
        assert!(!plain.can_handle(&query, &mapper));

        let imdb = CapabilitySet {
            movie_search: true,
            movie_search_imdb: true,
            ..Default::default()
        };
        assert!(imdb.can_handle(&query, &mapper));
    }

    #[test]
    fn test_result_item_serialization_skips_empty_fields() {
        let item = ResultItem::new("Title", Utc::now()).with_categories(vec![MOVIES]);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["title"], "Title");
        assert!(json.get("magnet_uri").is_none());
        assert_eq!(json["categories"][0], MOVIES);
    }
}
