//! Cookie header parsing and merging.
//!
//! Cookie state travels as plain `Cookie:` header strings. Several headers
//! can be concatenated (separated by `;` or whitespace) and resolved into one,
//! with later values winning by name.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Cookies that make some CDNs answer with 502s when echoed back.
pub const STRIPPED_COOKIES: &[&str] = &["cf_use_ob", "cf_ob_info"];

static COOKIE_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^=;\s]+)=([^;\s]*)").expect("valid cookie regex"));

/// Ordered cookie set with last-write-wins semantics by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a cookie header (or several concatenated ones).
    pub fn parse(header: &str) -> Self {
        let mut jar = Self::new();
        jar.extend_from_header(header);
        jar
    }

    pub fn extend_from_header(&mut self, header: &str) {
        for caps in COOKIE_PAIR.captures_iter(header) {
            self.set(&caps[1], &caps[2]);
        }
    }

    /// Insert or overwrite a cookie, keeping its original position.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.pairs.iter_mut().find(|(n, _)| n == name) {
            Some(pair) => pair.1 = value.to_string(),
            None => self.pairs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(n, _)| n != name);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Render as a `Cookie:` header value.
    pub fn to_header(&self) -> String {
        self.pairs
            .iter()
            .map(|(n, v)| format!("{}={}", n, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Merge cookie headers left to right and drop the known-problematic names.
pub fn resolve_cookies<'a>(headers: impl IntoIterator<Item = &'a str>) -> String {
    let mut jar = CookieJar::new();
    for header in headers {
        jar.extend_from_header(header);
    }
    for name in STRIPPED_COOKIES {
        jar.remove(name);
    }
    jar.to_header()
}
