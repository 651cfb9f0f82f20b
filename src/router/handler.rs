//! Handler callbacks.

use std::sync::Arc;

use crate::router::context::RoutingContext;
use crate::router::error::Error;

/// Result returned by a handler. An `Err` diverts the request into a failure walk.
pub type HandlerResult = Result<(), Error>;

/// Type alias for a handler: a callback receiving the routing context.
///
/// A handler either ends the response, calls [`RoutingContext::next`] to pass
/// control on (now or after asynchronous work), or fails.
pub type Handler = Arc<dyn Fn(&RoutingContext) -> HandlerResult + Send + Sync>;

/// Listener notified after the set of routes of a router changed.
pub type ModifiedHandler = Arc<dyn Fn(&crate::router::Router) + Send + Sync>;

/// Render a caught panic payload for logs and errors.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
