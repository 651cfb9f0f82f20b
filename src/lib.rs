//! A minimal library for building HTTP servers out of composable request handlers.
//!
//! Requests are routed through an ordered chain of handlers. Each handler
//! either ends the response, passes control on with
//! [`RoutingContext::next`], or fails, which diverts the request to the
//! failure handlers of the router.
//!
//! # Features
//!
//! - Literal prefix paths, `:token` path patterns and raw regex paths
//! - Method, `Content-Type` and `Accept` matching
//! - Explicit route ordering, enabling, disabling and removal at runtime
//! - Sub-routers mounted behind a route
//! - Default 404 and 500 responses, overridable per status code
//! - Handlers that continue the chain after asynchronous work
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```
//! use std::collections::HashMap;
//! use microweb_rs::{HttpServerRequest, Method, Router};
//!
//! let router = Router::new();
//!
//! // Runs for every request, then hands over to the next matching route
//! router.route().handler(|ctx| {
//!     ctx.response().put_header("X-Powered-By", "microweb-rs");
//!     ctx.next();
//!     Ok(())
//! });
//!
//! router.get("/users/:id")?.handler(|ctx| {
//!     let id = ctx.request().get_param("id").unwrap_or_default();
//!     ctx.response().end_with(format!("user {id}"))?;
//!     Ok(())
//! });
//!
//! let request = HttpServerRequest::new(Method::GET, "/users/42", HashMap::new());
//! let response = request.response().clone();
//! router.dispatch(request);
//!
//! let sent = response.snapshot();
//! assert_eq!(sent.status, 200);
//! assert_eq!(sent.body_string(), "user 42");
//! # Ok::<(), microweb_rs::RouterError>(())
//! ```
//!
//! ## Error handling
//!
//! ```
//! use std::collections::HashMap;
//! use microweb_rs::{HttpServerRequest, Method, Router, RouterError};
//!
//! let router = Router::new();
//!
//! router.route_path("/orders")?.handler(|_ctx| {
//!     Err(RouterError::InternalError("database unavailable".to_string()))
//! });
//!
//! router.route_path("/orders")?.failure_handler(|ctx| {
//!     ctx.response().set_status_code(503).end_with("try again later")?;
//!     Ok(())
//! });
//!
//! let request = HttpServerRequest::new(Method::GET, "/orders", HashMap::new());
//! let response = request.response().clone();
//! router.dispatch(request);
//!
//! assert_eq!(response.snapshot().status, 503);
//! # Ok::<(), RouterError>(())
//! ```

// Export the request/response boundary
pub mod http;

// Export the routing engine
pub mod router;

// Re-export commonly used items for convenience
pub use http::{Error as HttpError, HttpResponse, HttpServerRequest, HttpServerResponse, Method, StatusCode};
pub use router::{Error as RouterError, Route, Router, RouterConfig, RoutingContext};
