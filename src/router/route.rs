//! Routes: a set of matching criteria plus the handlers to run on a match.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use log::warn;
use parking_lot::RwLock;

use crate::http::{content_type_matches, sorted_acceptable_types, HttpServerRequest, Method};
use crate::router::error::Error;
use crate::router::handler::{Handler, HandlerResult};
use crate::router::pattern::PathPattern;
use crate::router::router::{Router, RouterInner};
use crate::router::RoutingContext;

static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(0);

/// A route of a [`Router`].
///
/// Routes are created through the router and stay invisible to dispatch until
/// a handler or failure handler is assigned. Every mutator may be called while
/// requests are being dispatched; a request sees either the old or the new
/// criteria, never a mix. Cloning yields another handle to the same route.
#[derive(Clone)]
pub struct Route {
    inner: Arc<RouteInner>,
}

struct RouteInner {
    id: u64,
    router: Weak<RouterInner>,
    state: RwLock<RouteState>,
}

struct RouteState {
    order: i32,
    methods: Vec<Method>,
    path: Option<String>,
    pattern: Option<PathPattern>,
    consumes: Vec<String>,
    produces: Vec<String>,
    enabled: bool,
    handler: Option<Handler>,
    failure_handler: Option<Handler>,
    attached: bool,
    removed: bool,
}

/// Outcome of a successful match.
pub(crate) struct RouteMatch {
    /// The callback to invoke for this walk.
    pub(crate) handler: Handler,
    /// The `produces` type chosen by content negotiation, if the route declares any.
    pub(crate) acceptable_content_type: Option<String>,
}

impl Route {
    pub(crate) fn new(router: Weak<RouterInner>, order: i32) -> Self {
        Self {
            inner: Arc::new(RouteInner {
                id: NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed),
                router,
                state: RwLock::new(RouteState {
                    order,
                    methods: Vec::new(),
                    path: None,
                    pattern: None,
                    consumes: Vec::new(),
                    produces: Vec::new(),
                    enabled: true,
                    handler: None,
                    failure_handler: None,
                    attached: false,
                    removed: false,
                }),
            }),
        }
    }

    /// Identity of this route, unique within the process.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Add a method this route accepts. A route without methods accepts all of them.
    pub fn method(&self, method: Method) -> &Self {
        let mut state = self.inner.state.write();
        if !state.methods.contains(&method) {
            state.methods.push(method);
        }
        self
    }

    /// Set the path this route matches.
    ///
    /// A literal path matches every request path starting with it. A path with
    /// `:token` segments matches the whole request path and stores each token's
    /// segment as a request parameter.
    pub fn path(&self, path: &str) -> Result<&Self, Error> {
        check_path(path)?;
        let pattern = if PathPattern::has_tokens(path) {
            Some(PathPattern::from_path(path)?)
        } else {
            None
        };

        let mut state = self.inner.state.write();
        match pattern {
            Some(pattern) => {
                state.pattern = Some(pattern);
                state.path = None;
            }
            None => {
                state.path = Some(path.to_string());
                state.pattern = None;
            }
        }
        Ok(self)
    }

    /// Match request paths against a regular expression.
    pub fn path_regex(&self, regex: &str) -> Result<&Self, Error> {
        let pattern = PathPattern::from_regex(regex)?;
        let mut state = self.inner.state.write();
        state.pattern = Some(pattern);
        state.path = None;
        Ok(self)
    }

    /// Add a content type this route can produce.
    pub fn produces(&self, content_type: &str) -> &Self {
        let mut state = self.inner.state.write();
        if !state.produces.iter().any(|ct| ct == content_type) {
            state.produces.push(content_type.to_string());
        }
        self
    }

    /// Add a content type this route can consume.
    pub fn consumes(&self, content_type: &str) -> &Self {
        let mut state = self.inner.state.write();
        if !state.consumes.iter().any(|ct| ct == content_type) {
            state.consumes.push(content_type.to_string());
        }
        self
    }

    /// Set the dispatch priority. Lower orders run first.
    ///
    /// Fails once the route is active, since the router keeps its routes sorted.
    pub fn order(&self, order: i32) -> Result<&Self, Error> {
        let mut state = self.inner.state.write();
        if state.attached {
            return Err(Error::IllegalState(
                "Can't change order after route is active".to_string(),
            ));
        }
        state.order = order;
        Ok(self)
    }

    /// Move this route behind every route with an explicit or sequential order.
    pub fn last(&self) -> Result<&Self, Error> {
        self.order(i32::MAX)
    }

    /// Set the handler run when this route matches a request. Activates the route.
    pub fn handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&RoutingContext) -> HandlerResult + Send + Sync + 'static,
    {
        {
            let mut state = self.inner.state.write();
            if state.handler.is_some() {
                warn!("Setting handler for a route more than once!");
            }
            state.handler = Some(Arc::new(handler));
        }
        self.attach();
        self
    }

    /// Set the handler run when this route matches during a failure walk. Activates the route.
    pub fn failure_handler<F>(&self, handler: F) -> &Self
    where
        F: Fn(&RoutingContext) -> HandlerResult + Send + Sync + 'static,
    {
        {
            let mut state = self.inner.state.write();
            if state.failure_handler.is_some() {
                warn!("Setting failureHandler for a route more than once!");
            }
            state.failure_handler = Some(Arc::new(handler));
        }
        self.attach();
        self
    }

    /// Hand matching requests to another router.
    ///
    /// The sub-router walks its own routes in a child context; when it runs
    /// out, control returns to the routes following this one. A failure raised
    /// inside the sub-router is offered to its failure handlers first and then
    /// to those of the enclosing routers. The sub-router sees the same paths as
    /// this route; see [`Router::mount_sub_router`] for relative paths.
    pub fn sub_router(&self, router: &Router) -> &Self {
        let sub = router.clone();
        self.handler(move |ctx| {
            sub.handle_context(ctx);
            Ok(())
        })
    }

    /// Remove this route from its router. Removal is permanent.
    pub fn remove(&self) -> &Self {
        self.inner.state.write().removed = true;
        if let Some(router) = self.inner.router.upgrade() {
            router.remove(self);
        }
        self
    }

    /// Stop this route from matching until [`enable`](Self::enable) is called.
    pub fn disable(&self) -> &Self {
        self.inner.state.write().enabled = false;
        self
    }

    /// Let this route match again.
    pub fn enable(&self) -> &Self {
        self.inner.state.write().enabled = true;
        self
    }

    /// The literal path of this route, if it has one.
    pub fn get_path(&self) -> Option<String> {
        self.inner.state.read().path.clone()
    }

    /// The dispatch priority of this route.
    pub fn get_order(&self) -> i32 {
        self.inner.state.read().order
    }

    /// The methods this route accepts; empty means any method.
    pub fn methods(&self) -> Vec<Method> {
        self.inner.state.read().methods.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.state.read().enabled
    }

    /// Whether the route has been handed to its router for dispatch.
    pub fn is_active(&self) -> bool {
        let state = self.inner.state.read();
        state.attached && !state.removed
    }

    pub(crate) fn is_removed(&self) -> bool {
        self.inner.state.read().removed
    }

    pub(crate) fn sort_key(&self) -> (i32, u64) {
        (self.get_order(), self.inner.id)
    }

    /// Decide whether this route applies to `request`.
    ///
    /// The checks run in a fixed order and stop at the first miss. A pattern
    /// match stores its captures in the request parameters even if a later
    /// content-type check fails. Paths are checked relative to `mount_point`.
    pub(crate) fn matches(
        &self,
        request: &HttpServerRequest,
        mount_point: Option<&str>,
        failure: bool,
    ) -> Option<RouteMatch> {
        let state = self.inner.state.read();

        let handler = if failure {
            state.failure_handler.clone()?
        } else {
            state.handler.clone()?
        };
        if !state.enabled {
            return None;
        }
        if !state.methods.is_empty() && !state.methods.contains(&request.method()) {
            return None;
        }
        let request_path = match mount_point {
            Some(mount_point) => match request.path().strip_prefix(mount_point)? {
                "" => "/",
                relative => relative,
            },
            None => request.path(),
        };
        if let Some(path) = &state.path {
            if !request_path.starts_with(path.as_str()) {
                return None;
            }
        }
        if let Some(pattern) = &state.pattern {
            let params = pattern.captures(request_path)?;
            request.add_params(params);
        }
        if !state.consumes.is_empty() {
            let content_type = request.get_header("Content-Type")?;
            if !state
                .consumes
                .iter()
                .any(|allowed| content_type_matches(content_type, allowed))
            {
                return None;
            }
        }

        let mut acceptable_content_type = None;
        if !state.produces.is_empty() {
            let chosen = match request.get_header("Accept") {
                Some(accept) => sorted_acceptable_types(accept)
                    .iter()
                    .find_map(|acceptable| {
                        state
                            .produces
                            .iter()
                            .find(|produce| content_type_matches(produce, acceptable))
                    })
                    .cloned(),
                None => state.produces.first().cloned(),
            };
            acceptable_content_type = Some(chosen?);
        }

        Some(RouteMatch {
            handler,
            acceptable_content_type,
        })
    }

    fn attach(&self) {
        {
            let mut state = self.inner.state.write();
            if state.attached || state.removed {
                return;
            }
            state.attached = true;
        }
        // The router reads this route's order while sorting, so the lock must be released first.
        if let Some(router) = self.inner.router.upgrade() {
            router.add(self.clone());
        }
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Route {}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        let methods = state
            .methods
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<String>>()
            .join(",");
        write!(f, "Route[ path:")?;
        match &state.path {
            Some(path) => write!(f, "{path}")?,
            None => write!(f, "null")?,
        }
        write!(f, " pattern:")?;
        match &state.pattern {
            Some(pattern) => write!(f, "{pattern}")?,
            None => write!(f, "null")?,
        }
        write!(
            f,
            " order:{order} methods:[{methods}]]@{id}",
            order = state.order,
            id = self.inner.id
        )
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn check_path(path: &str) -> Result<(), Error> {
    if !path.starts_with('/') {
        return Err(Error::InvalidPath(path.to_string()));
    }
    Ok(())
}
