//! HTTP response types and utilities.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use crate::http::error::Error;

/// HTTP status codes with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    NotAcceptable = 406,
    UnsupportedMediaType = 415,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::NotAcceptable => "Not Acceptable",
            StatusCode::UnsupportedMediaType => "Unsupported Media Type",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Look up a known status code by number.
    pub fn from_u16(code: u16) -> Option<Self> {
        let status = match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            202 => StatusCode::Accepted,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            406 => StatusCode::NotAcceptable,
            415 => StatusCode::UnsupportedMediaType,
            500 => StatusCode::InternalServerError,
            501 => StatusCode::NotImplemented,
            502 => StatusCode::BadGateway,
            503 => StatusCode::ServiceUnavailable,
            _ => return None,
        };
        Some(status)
    }

    /// Reason phrase for an arbitrary status number; unknown codes fall back
    /// to the phrase of their class.
    pub fn reason_for(code: u16) -> &'static str {
        if let Some(status) = Self::from_u16(code) {
            return status.reason_phrase();
        }
        match code / 100 {
            1 => "Informational",
            2 => "OK",
            3 => "Redirection",
            4 => "Client Error",
            _ => "Server Error",
        }
    }
}

impl From<StatusCode> for u16 {
    fn from(status: StatusCode) -> Self {
        status as u16
    }
}

/// A finished (or in-progress) response, frozen at the time it was taken.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: u16,
    /// The status line's reason phrase
    pub status_message: String,
    /// The HTTP headers
    pub headers: HashMap<String, String>,
    /// The response body
    pub body: Vec<u8>,
    /// Whether the response had been ended when the snapshot was taken
    pub ended: bool,
}

impl HttpResponse {
    /// The body decoded as UTF-8, lossily.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Get a header value, comparing names case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    status_message: Option<String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    ended: bool,
}

#[derive(Debug)]
struct ResponseInner {
    state: Mutex<ResponseState>,
    ended_tx: watch::Sender<bool>,
}

/// The outbound side of an exchange.
///
/// Handlers write to it in chain order and one of them ends it. Once ended,
/// further writes are rejected with [`Error::ResponseEnded`] and the
/// recorded response never changes again.
#[derive(Debug, Clone)]
pub struct HttpServerResponse {
    inner: Arc<ResponseInner>,
}

impl Default for HttpServerResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpServerResponse {
    /// Create an empty `200 OK` response.
    pub fn new() -> Self {
        let (ended_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(ResponseInner {
                state: Mutex::new(ResponseState {
                    status: StatusCode::Ok as u16,
                    status_message: None,
                    headers: HashMap::new(),
                    body: Vec::new(),
                    ended: false,
                }),
                ended_tx,
            }),
        }
    }

    /// Set the status code. Ignored once the response has ended.
    pub fn set_status_code(&self, status: u16) -> &Self {
        let mut state = self.inner.state.lock();
        if !state.ended {
            state.status = status;
        }
        self
    }

    /// The current status code.
    pub fn status_code(&self) -> u16 {
        self.inner.state.lock().status
    }

    /// Override the reason phrase. Ignored once the response has ended.
    pub fn set_status_message(&self, message: impl Into<String>) -> &Self {
        let mut state = self.inner.state.lock();
        if !state.ended {
            state.status_message = Some(message.into());
        }
        self
    }

    /// The reason phrase: the one set explicitly, or the standard phrase for the status.
    pub fn status_message(&self) -> String {
        let state = self.inner.state.lock();
        state
            .status_message
            .clone()
            .unwrap_or_else(|| StatusCode::reason_for(state.status).to_string())
    }

    /// Add or replace a header. Ignored once the response has ended.
    pub fn put_header(&self, name: impl Into<String>, value: impl Into<String>) -> &Self {
        let mut state = self.inner.state.lock();
        if !state.ended {
            state.headers.insert(name.into(), value.into());
        }
        self
    }

    /// Append a chunk to the body.
    pub fn write(&self, chunk: impl AsRef<[u8]>) -> Result<(), Error> {
        let mut state = self.inner.state.lock();
        if state.ended {
            return Err(Error::ResponseEnded);
        }
        state.body.extend_from_slice(chunk.as_ref());
        Ok(())
    }

    /// End the response.
    pub fn end(&self) -> Result<(), Error> {
        {
            let mut state = self.inner.state.lock();
            if state.ended {
                return Err(Error::ResponseEnded);
            }
            state.ended = true;
            let content_length = state.body.len().to_string();
            state.headers.insert("Content-Length".to_string(), content_length);
        }
        self.inner.ended_tx.send_replace(true);
        Ok(())
    }

    /// Write a final chunk and end the response.
    pub fn end_with(&self, chunk: impl AsRef<[u8]>) -> Result<(), Error> {
        self.write(chunk)?;
        self.end()
    }

    /// Serialize `value` as the JSON body and end the response.
    pub fn end_json<T: Serialize>(&self, value: &T) -> Result<(), Error> {
        let json = serde_json::to_vec(value)?;
        self.put_header("Content-Type", "application/json");
        self.end_with(json)
    }

    /// Whether the response has been ended.
    pub fn ended(&self) -> bool {
        self.inner.state.lock().ended
    }

    /// Take a copy of the response as it stands.
    pub fn snapshot(&self) -> HttpResponse {
        let state = self.inner.state.lock();
        HttpResponse {
            status: state.status,
            status_message: state
                .status_message
                .clone()
                .unwrap_or_else(|| StatusCode::reason_for(state.status).to_string()),
            headers: state.headers.clone(),
            body: state.body.clone(),
            ended: state.ended,
        }
    }

    /// Wait until the response has been ended, then return it.
    ///
    /// Chains that resume after asynchronous work end their response on some
    /// other task; this is how the transport learns that it can send.
    pub async fn finished(&self) -> HttpResponse {
        let mut rx = self.inner.ended_tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|ended| *ended).await;
        self.snapshot()
    }
}
