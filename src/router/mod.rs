//! Route matching and middleware dispatch.
//!
//! A [`Router`] keeps an ordered list of [`Route`]s. Dispatching a request
//! creates a [`RoutingContext`] that walks the routes matching it, one handler
//! per call to [`RoutingContext::next`]. A handler that fails diverts the
//! request to the failure handlers of the same routes.

mod config;
mod context;
mod error;
mod handler;
mod pattern;
mod route;
#[allow(clippy::module_inception)]
mod router;

// Re-export public items
pub use config::RouterConfig;
pub use context::{RoutingContext, DEFAULT_404, UNHANDLED_FAILURE};
pub use error::Error;
pub use handler::{Handler, HandlerResult, ModifiedHandler};
pub use route::Route;
pub use router::Router;
