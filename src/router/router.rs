//! The router: owner of the routes and entry point of dispatch.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{trace, warn};
use parking_lot::{Mutex, RwLock};

use crate::http::{HttpServerRequest, Method};
use crate::router::config::RouterConfig;
use crate::router::context::{Failure, RoutingContext};
use crate::router::error::Error;
use crate::router::handler::{panic_message, Handler, HandlerResult, ModifiedHandler};
use crate::router::pattern::PathPattern;
use crate::router::route::Route;

/// An ordered registry of routes and the dispatch entry point.
///
/// Cloning yields another handle to the same router. Routes can be added,
/// changed and removed while requests are dispatched: every walk iterates the
/// snapshot of active routes taken when it started.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

pub(crate) struct RouterInner {
    config: RouterConfig,
    /// Active routes sorted by `(order, id)`. Replaced wholesale on every change.
    routes: ArcSwap<Vec<Route>>,
    order_sequence: AtomicI32,
    /// Serializes writers of `routes`; readers never take it.
    mutation: Mutex<()>,
    error_handlers: RwLock<HashMap<u16, Handler>>,
    modified_handlers: RwLock<Vec<ModifiedHandler>>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a router with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    /// Create a router with the given configuration.
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                config,
                routes: ArcSwap::from_pointee(Vec::new()),
                order_sequence: AtomicI32::new(0),
                mutation: Mutex::new(()),
                error_handlers: RwLock::new(HashMap::new()),
                modified_handlers: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// Create a route matching every request.
    pub fn route(&self) -> Route {
        let order = self.inner.order_sequence.fetch_add(1, Ordering::SeqCst);
        Route::new(Arc::downgrade(&self.inner), order)
    }

    /// Create a route matching `path` for any method.
    pub fn route_path(&self, path: &str) -> Result<Route, Error> {
        let route = self.route();
        route.path(path)?;
        Ok(route)
    }

    /// Create a route matching `method` and `path`.
    pub fn route_method(&self, method: Method, path: &str) -> Result<Route, Error> {
        let route = self.route();
        route.method(method).path(path)?;
        Ok(route)
    }

    /// Create a route matching request paths against a regular expression, for any method.
    pub fn route_regex(&self, regex: &str) -> Result<Route, Error> {
        let route = self.route();
        route.path_regex(regex)?;
        Ok(route)
    }

    /// Create a route matching `method` and request paths against a regular expression.
    pub fn route_method_regex(&self, method: Method, regex: &str) -> Result<Route, Error> {
        let route = self.route();
        route.method(method).path_regex(regex)?;
        Ok(route)
    }

    pub fn get(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::DELETE, path)
    }

    pub fn patch(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::PATCH, path)
    }

    pub fn head(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::HEAD, path)
    }

    pub fn options(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::OPTIONS, path)
    }

    pub fn trace(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::TRACE, path)
    }

    pub fn connect(&self, path: &str) -> Result<Route, Error> {
        self.route_method(Method::CONNECT, path)
    }

    /// Mount `sub_router` under `mount_point`.
    ///
    /// Requests whose path starts with `mount_point` are handed to
    /// `sub_router`, whose routes see the rest of the path: a sub route on
    /// `/items` answers `{mount_point}/items`. One router may be mounted at
    /// several points, and mounts nest.
    pub fn mount_sub_router(&self, mount_point: &str, sub_router: &Router) -> Result<Route, Error> {
        if mount_point.ends_with('*') || PathPattern::has_tokens(mount_point) {
            return Err(Error::InvalidPath(format!(
                "mount point must be a literal path: {mount_point}"
            )));
        }
        let route = self.route_path(mount_point)?;
        let mount_point = mount_point.trim_end_matches('/').to_string();
        let sub_router = sub_router.clone();
        route.handler(move |ctx| {
            RoutingContext::nested(sub_router.clone(), ctx, &mount_point).next();
            Ok(())
        });
        Ok(route)
    }

    /// The active routes in dispatch order.
    pub fn routes(&self) -> Vec<Route> {
        self.inner.routes.load().iter().cloned().collect()
    }

    /// Drop every route. Walks already in progress keep their snapshot.
    pub fn clear(&self) -> &Self {
        let _guard = self.inner.mutation.lock();
        self.inner.routes.store(Arc::new(Vec::new()));
        self
    }

    /// Install the handler used when a failure walk with `status` ends unhandled.
    pub fn error_handler<F>(&self, status: u16, handler: F) -> &Self
    where
        F: Fn(&RoutingContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.inner.error_handlers.write().insert(status, Arc::new(handler));
        self
    }

    /// Register a listener called after a route is activated or removed.
    pub fn modified_handler<F>(&self, listener: F) -> &Self
    where
        F: Fn(&Router) + Send + Sync + 'static,
    {
        self.inner.modified_handlers.write().push(Arc::new(listener));
        self
    }

    /// Process one inbound request.
    pub fn dispatch(&self, request: HttpServerRequest) {
        if self.inner.config.trace_requests {
            trace!(
                "Router {router:p} accepting request {method} {uri}",
                router = Arc::as_ptr(&self.inner),
                method = request.method(),
                uri = request.uri()
            );
        }
        RoutingContext::root(self.clone(), request).next();
    }

    /// Continue an existing chain through this router's routes.
    ///
    /// The new walk shares the request and data of `ctx`; once it runs out of
    /// routes, `ctx` resumes.
    pub fn handle_context(&self, ctx: &RoutingContext) {
        RoutingContext::nested(self.clone(), ctx, "").next();
    }

    /// Continue an existing failure walk through this router's failure handlers.
    pub fn handle_failure(&self, ctx: &RoutingContext) {
        self.handle_context(ctx);
    }

    /// Start a failure walk for `ctx` over a fresh snapshot of this router.
    pub(crate) fn escalate_failure(&self, failure: Failure, ctx: &RoutingContext) {
        RoutingContext::for_failure(self.clone(), ctx, failure).next();
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Route>> {
        self.inner.routes.load_full()
    }

    pub(crate) fn get_error_handler(&self, status: u16) -> Option<Handler> {
        self.inner.error_handlers.read().get(&status).cloned()
    }
}

impl RouterInner {
    pub(crate) fn add(self: &Arc<Self>, route: Route) {
        {
            let _guard = self.mutation.lock();
            // A concurrent `Route::remove` may have run between attach and here.
            let current = self.routes.load();
            if route.is_removed() || current.contains(&route) {
                return;
            }
            let mut routes = Vec::with_capacity(current.len() + 1);
            routes.extend(current.iter().cloned());
            routes.push(route);
            routes.sort_by_cached_key(Route::sort_key);
            self.routes.store(Arc::new(routes));
        }
        self.notify_modified();
    }

    pub(crate) fn remove(self: &Arc<Self>, route: &Route) {
        {
            let _guard = self.mutation.lock();
            let current = self.routes.load();
            if !current.contains(route) {
                return;
            }
            let routes: Vec<Route> = current.iter().filter(|r| *r != route).cloned().collect();
            self.routes.store(Arc::new(routes));
        }
        self.notify_modified();
    }

    fn notify_modified(self: &Arc<Self>) {
        let listeners = self.modified_handlers.read().clone();
        if listeners.is_empty() {
            return;
        }
        let router = Router { inner: self.clone() };
        for listener in listeners {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| listener(&router))) {
                warn!("Router modified notification failed: {}", panic_message(payload.as_ref()));
            }
        }
    }
}
