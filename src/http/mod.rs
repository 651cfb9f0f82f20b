//! The request/response boundary.
//!
//! The routing engine never touches sockets or wire bytes. A transport hands it
//! an [`HttpServerRequest`], handlers write to the paired
//! [`HttpServerResponse`], and the transport awaits
//! [`HttpServerResponse::finished`] to learn when it can send.

mod error;
mod media;
mod method;
mod request;
mod response;

// Re-export public items
pub use error::Error;
pub use media::{content_type_matches, sorted_acceptable_types};
pub use method::Method;
pub use request::HttpServerRequest;
pub use response::{HttpResponse, HttpServerResponse, StatusCode};
