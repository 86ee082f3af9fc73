//! Normalized query dispatched to every capable source.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shape of a query, mirroring the Torznab `t=` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Search,
    #[serde(alias = "tv-search")]
    TvSearch,
    Movie,
    Music,
    Caps,
}

/// Immutable search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default, rename = "type")]
    pub query_type: QueryType,
    #[serde(default)]
    pub term: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
    /// Episode as the user typed it; some sites use dates (`2024/03`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            query_type: QueryType::default(),
            term: String::new(),
            imdb_id: None,
            season: None,
            episode: None,
            categories: Vec::new(),
            limit: None,
        }
    }
}

impl Query {
    /// Free-text search for `term`.
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, query_type: QueryType) -> Self {
        self.query_type = query_type;
        self
    }

    pub fn with_categories(mut self, categories: Vec<u32>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_imdb(mut self, imdb_id: impl Into<String>) -> Self {
        self.imdb_id = Some(imdb_id.into());
        self
    }

    pub fn with_episode(mut self, season: u32, episode: Option<String>) -> Self {
        self.season = Some(season);
        self.episode = episode;
        self
    }

    pub fn is_imdb_query(&self) -> bool {
        self.imdb_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    pub fn is_search(&self) -> bool {
        self.query_type == QueryType::Search
    }

    pub fn is_tv_search(&self) -> bool {
        self.query_type == QueryType::TvSearch
    }

    pub fn is_movie_search(&self) -> bool {
        self.query_type == QueryType::Movie
    }

    pub fn is_music_search(&self) -> bool {
        self.query_type == QueryType::Music
    }

    pub fn has_categories(&self) -> bool {
        !self.categories.is_empty()
    }

    /// `S01E02`, `S01`, or empty.
    pub fn episode_search_string(&self) -> String {
        match self.season {
            Some(season) if season > 0 => {
                let mut s = format!("S{:02}", season);
                if let Some(episode) = self.episode.as_deref().filter(|e| !e.is_empty()) {
                    s.push_str(&format!("E{:0>2}", episode));
                }
                s
            }
            _ => String::new(),
        }
    }

    /// Term plus the episode marker for TV queries.
    pub fn search_string(&self) -> String {
        let episode = if self.is_tv_search() {
            self.episode_search_string()
        } else {
            String::new()
        };
        format!("{} {}", self.term.trim(), episode)
            .trim()
            .to_string()
    }
}
