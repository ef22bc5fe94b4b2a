//! Transport-neutral request/response types and the network seam.
//!
//! The worker never talks to reqwest directly; it goes through [`Network`],
//! which the client crate implements and tests replace with fakes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// A request as seen by the interception layer.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    /// A bodiless GET for `url`.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, headers: Vec::new(), body: Bytes::new() }
    }

    /// Add a header, builder style.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First value of a header, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the Accept header admits an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }
}

/// A response, either fresh from the network or replayed from a cache bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    /// Final URL after redirects.
    pub url: Url,
    pub headers: Vec<(String, String)>,
    #[serde(skip)]
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, url: Url, headers: Vec<(String, String)>, body: Bytes) -> Self {
        Self { status, url, headers, body }
    }

    /// An empty `200 text/css` response returned when stylesheet handling fails.
    pub fn empty_stylesheet(url: Url) -> Self {
        Self {
            status: 200,
            url,
            headers: vec![("content-type".into(), "text/css".into())],
            body: Bytes::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// HTTP 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Outbound network access.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    /// Perform the request.
    ///
    /// Non-2xx statuses are returned as responses; only transport failures
    /// are errors.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_accepts_html() {
        let req = Request::get(url("http://localhost/")).with_header("Accept", "text/html,application/xhtml+xml");
        assert!(req.accepts_html());

        let req = Request::get(url("http://localhost/app.js")).with_header("Accept", "*/*");
        assert!(!req.accepts_html());

        let req = Request::get(url("http://localhost/app.js"));
        assert!(!req.accepts_html());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let resp = Response::new(
            200,
            url("http://localhost/a.css"),
            vec![("Content-Type".into(), "text/css".into())],
            Bytes::new(),
        );
        assert_eq!(resp.content_type(), Some("text/css"));
    }

    #[test]
    fn test_empty_stylesheet() {
        let resp = Response::empty_stylesheet(url("http://localhost/style/index.css"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type(), Some("text/css"));
        assert!(resp.body.is_empty());
    }

    #[test]
    fn test_method_checks() {
        let mut req = Request::get(url("http://localhost/"));
        assert!(req.is_get());
        req.method = "post".into();
        assert!(!req.is_get());
    }
}
