//! Request model
//!
//! The URL is the request identity and the cache key. Method, headers and
//! body are passed through to the transport untouched.

use reqwest::Method;
use serde_json::Value;

/// A request as seen by the fetch controller.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Target URL, also the cache key
    pub url: String,
    /// HTTP method
    pub method: Method,
    /// Extra headers as name/value pairs
    pub headers: Vec<(String, String)>,
    /// Optional JSON body
    pub body: Option<Value>,
}

impl FetchRequest {
    /// Creates a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers: Vec::new(),
            body: None,
        }
    }

    // == Identity ==
    /// The request identity used as cache key and supersession marker.
    pub fn identity(&self) -> &str {
        &self.url
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        FetchRequest::get(url)
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        FetchRequest::get(url)
    }
}
