//! Request/response values exchanged with an [`HttpTransport`](super::HttpTransport).

use serde::{Deserialize, Serialize};

/// HTTP method used by a fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Text encoding of a remote site's pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    #[serde(alias = "utf8")]
    Utf8,
    /// ISO-8859-1; also used for sites that declare windows-1252.
    #[serde(alias = "iso-8859-1", alias = "windows-1252")]
    Latin1,
}

impl Encoding {
    /// Decode a response body.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// One HTTP operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    /// Cookie header to send. `None` means "use the session's header".
    pub cookies: Option<String>,
    /// Form fields for POST requests.
    pub post_data: Vec<(String, String)>,
    /// Raw body; takes precedence over `post_data`.
    pub raw_body: Option<String>,
    pub headers: Vec<(String, String)>,
    pub referer: Option<String>,
    pub encoding: Encoding,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn post(url: impl Into<String>, form: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method: Method::Post,
            post_data: form,
            ..Default::default()
        }
    }

    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = Some(cookies.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Result of one HTTP operation. Redirects are never followed by the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// `Set-Cookie` pairs from this response as a cookie header (`a=1; b=2`).
    pub cookies: String,
    /// Absolute `Location` target when the response is a redirect.
    pub redirect_target: Option<String>,
    /// The URL that produced this response.
    pub url: String,
    pub encoding: Encoding,
}

impl FetchResponse {
    pub fn with_cookies(mut self, cookies: impl Into<String>) -> Self {
        self.cookies = cookies.into();
        self
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.redirect_target.is_some()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded with the request's encoding.
    pub fn text(&self) -> String {
        self.encoding.decode(&self.body)
    }
}
