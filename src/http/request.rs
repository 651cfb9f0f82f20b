//! The inbound side of an exchange, as seen by the routing engine.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use crate::http::error::Error;
use crate::http::method::Method;
use crate::http::response::HttpServerResponse;

/// An inbound HTTP request paired with the response that answers it.
///
/// The transport builds one of these per request and hands it to
/// [`Router::dispatch`](crate::Router::dispatch). Cloning is cheap; every
/// clone refers to the same request, the same parameter map and the same
/// response.
#[derive(Debug, Clone)]
pub struct HttpServerRequest {
    inner: Arc<RequestInner>,
}

#[derive(Debug)]
struct RequestInner {
    method: Method,
    uri: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    params: RwLock<HashMap<String, String>>,
    response: HttpServerResponse,
}

impl HttpServerRequest {
    /// Create a new request with an empty body.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method
    /// * `uri` - The request target, optionally carrying a query string
    /// * `headers` - The HTTP headers
    pub fn new(method: Method, uri: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self::with_body(method, uri, headers, Vec::new())
    }

    /// Create a new request with a body.
    ///
    /// The parameter map starts out holding the query parameters; path
    /// captures are merged into it as routes match.
    pub fn with_body(
        method: Method,
        uri: impl Into<String>,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Self {
        let uri = uri.into();
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query)),
            None => (uri.clone(), None),
        };

        let params: HashMap<String, String> = query
            .map(|query| {
                query
                    .split('&')
                    .filter(|s| !s.is_empty())
                    .map(|pair| {
                        if let Some((k, v)) = pair.split_once('=') {
                            (k.to_string(), v.to_string())
                        } else {
                            (pair.to_string(), String::new())
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            inner: Arc::new(RequestInner {
                method,
                uri,
                path,
                headers,
                body,
                params: RwLock::new(params),
                response: HttpServerResponse::new(),
            }),
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> Method {
        self.inner.method
    }

    /// The full request target, including any query string.
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// All request headers, as received.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.inner.headers
    }

    /// The request body.
    pub fn body(&self) -> &[u8] {
        &self.inner.body
    }

    /// Get a header value.
    ///
    /// Header names are compared case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.inner.headers.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                Some(v.as_str())
            } else {
                None
            }
        })
    }

    /// Check if a header exists.
    pub fn has_header(&self, name: &str) -> bool {
        self.get_header(name).is_some()
    }

    /// Get a parameter, either from the query string or captured from the path.
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.inner.params.read().get(name).cloned()
    }

    /// A copy of every parameter currently known for this request.
    pub fn params(&self) -> HashMap<String, String> {
        self.inner.params.read().clone()
    }

    /// Merge parameters into the request; later values replace earlier ones.
    pub fn add_params<I>(&self, params: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.inner.params.write().extend(params);
    }

    /// Check if the request has a JSON body.
    pub fn is_json(&self) -> bool {
        self.get_header("Content-Type")
            .map(|content_type| content_type.starts_with("application/json"))
            .unwrap_or(false)
    }

    /// Parse the request body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        if !self.is_json() {
            return Err(Error::MissingHeader("Content-Type: application/json".to_string()));
        }

        let json = serde_json::from_slice(&self.inner.body)?;
        Ok(json)
    }

    /// The response paired with this request.
    pub fn response(&self) -> &HttpServerResponse {
        &self.inner.response
    }
}
