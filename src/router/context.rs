//! The per-request dispatch state machine.
//!
//! A [`RoutingContext`] walks a frozen snapshot of a router's routes. Each
//! call to [`RoutingContext::next`] resumes the walk, invokes the next
//! matching handler and returns; the handler decides whether the chain goes
//! on. When the snapshot is exhausted the context either hands control back
//! to its parent or, at the top, writes the default 404 or 500 response if
//! nothing matched.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, error};
use parking_lot::{Mutex, RwLock};

use crate::http::{HttpServerRequest, HttpServerResponse, StatusCode};
use crate::router::error::Error;
use crate::router::handler::{panic_message, Handler};
use crate::router::route::Route;
use crate::router::router::Router;

/// Body of the default response for a request no route matched.
pub const DEFAULT_404: &str = "<html><body><h1>Resource not found</h1></body></html>";

/// Body of the default response for a failure no failure handler took.
pub const UNHANDLED_FAILURE: &str = "<html><body><h1>Ooops! Something went wrong</h1></body></html>";

/// What a failure walk is looking for a handler for.
#[derive(Debug, Clone, Default)]
pub(crate) struct Failure {
    pub(crate) error: Option<Arc<Error>>,
    pub(crate) status_code: Option<u16>,
}

impl Failure {
    pub(crate) fn from_error(error: Error) -> Self {
        Self {
            error: Some(Arc::new(error)),
            status_code: None,
        }
    }

    pub(crate) fn from_status(status_code: u16) -> Self {
        Self {
            error: None,
            status_code: Some(status_code),
        }
    }
}

type DataMap = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Cursor over the routes snapshot taken when the walk started.
struct RouteCursor {
    routes: Arc<Vec<Route>>,
    position: usize,
}

impl Iterator for RouteCursor {
    type Item = Route;

    fn next(&mut self) -> Option<Route> {
        let route = self.routes.get(self.position)?.clone();
        self.position += 1;
        Some(route)
    }
}

/// The state of one walk through a router, handed to every handler it invokes.
///
/// Cloning yields another handle to the same walk, which is how a handler
/// keeps the chain alive across asynchronous work before calling
/// [`next`](Self::next).
#[derive(Clone)]
pub struct RoutingContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    router: Router,
    request: HttpServerRequest,
    parent: Option<RoutingContext>,
    cursor: Mutex<RouteCursor>,
    /// Shared by every context of the chain, failure walks included.
    data: Arc<RwLock<DataMap>>,
    failure: Option<Failure>,
    /// Matches of the whole chain; shared with nested contexts.
    match_count: Arc<AtomicUsize>,
    local_matches: AtomicUsize,
    /// Whether this context was entered from a route of its parent.
    nested: bool,
    /// Request path prefix hidden from the routes of this context.
    mount_point: Option<String>,
    delegated: AtomicBool,
    current_route: Mutex<Option<Route>>,
    acceptable_content_type: Mutex<Option<String>>,
}

impl RoutingContext {
    #[allow(clippy::too_many_arguments)]
    fn build(
        router: Router,
        request: HttpServerRequest,
        parent: Option<RoutingContext>,
        data: Arc<RwLock<DataMap>>,
        failure: Option<Failure>,
        match_count: Arc<AtomicUsize>,
        nested: bool,
        mount_point: Option<String>,
    ) -> Self {
        let routes = router.snapshot();
        Self {
            inner: Arc::new(ContextInner {
                router,
                request,
                parent,
                cursor: Mutex::new(RouteCursor { routes, position: 0 }),
                data,
                failure,
                match_count,
                local_matches: AtomicUsize::new(0),
                nested,
                mount_point,
                delegated: AtomicBool::new(false),
                current_route: Mutex::new(None),
                acceptable_content_type: Mutex::new(None),
            }),
        }
    }

    /// The context of a fresh inbound request.
    pub(crate) fn root(router: Router, request: HttpServerRequest) -> Self {
        Self::build(
            router,
            request,
            None,
            Arc::new(RwLock::new(HashMap::new())),
            None,
            Arc::new(AtomicUsize::new(0)),
            false,
            None,
        )
    }

    /// A child walk over `router`, entered from a route of `parent`.
    ///
    /// `mount_point` is appended to the mount point of `parent`; pass `""` to
    /// keep it.
    pub(crate) fn nested(router: Router, parent: &RoutingContext, mount_point: &str) -> Self {
        let mount_point = format!("{}{mount_point}", parent.mount_point().unwrap_or_default());
        Self::build(
            router,
            parent.inner.request.clone(),
            Some(parent.clone()),
            parent.inner.data.clone(),
            parent.inner.failure.clone(),
            parent.inner.match_count.clone(),
            true,
            (!mount_point.is_empty()).then_some(mount_point),
        )
    }

    /// A failure walk over `router` for the request of `ctx`.
    ///
    /// Each ancestor of `ctx` gets a failure walk over its own router as well,
    /// so a failure nobody takes in a sub-router falls back to the failure
    /// handlers of the enclosing routers.
    pub(crate) fn for_failure(router: Router, ctx: &RoutingContext, failure: Failure) -> Self {
        Self::failure_chain(router, ctx, failure, Arc::new(AtomicUsize::new(0)))
    }

    fn failure_chain(
        router: Router,
        ctx: &RoutingContext,
        failure: Failure,
        match_count: Arc<AtomicUsize>,
    ) -> Self {
        let parent = ctx.inner.parent.as_ref().map(|parent| {
            Self::failure_chain(
                parent.inner.router.clone(),
                parent,
                failure.clone(),
                match_count.clone(),
            )
        });
        Self::build(
            router,
            ctx.inner.request.clone(),
            parent,
            ctx.inner.data.clone(),
            Some(failure),
            match_count,
            false,
            ctx.inner.mount_point.clone(),
        )
    }

    /// The request being routed.
    pub fn request(&self) -> &HttpServerRequest {
        &self.inner.request
    }

    /// The response of the request being routed.
    pub fn response(&self) -> &HttpServerResponse {
        self.inner.request.response()
    }

    /// The router this context walks.
    pub fn router(&self) -> &Router {
        &self.inner.router
    }

    /// The path prefix under which the router of this context is mounted.
    pub fn mount_point(&self) -> Option<&str> {
        self.inner.mount_point.as_deref()
    }

    /// The route whose handler is running, or ran last.
    pub fn current_route(&self) -> Option<Route> {
        self.inner.current_route.lock().clone()
    }

    /// The `produces` type the current route negotiated with the `Accept` header.
    pub fn acceptable_content_type(&self) -> Option<String> {
        self.inner.acceptable_content_type.lock().clone()
    }

    /// Whether this is a failure walk.
    pub fn failed(&self) -> bool {
        self.inner.failure.is_some()
    }

    /// The error that started this failure walk, if it was started by one.
    pub fn failure(&self) -> Option<Arc<Error>> {
        self.inner.failure.as_ref().and_then(|f| f.error.clone())
    }

    /// The status code this failure walk was started with, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.inner.failure.as_ref().and_then(|f| f.status_code)
    }

    /// Store a value in the data shared by the whole chain.
    pub fn put<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.inner.data.write().insert(key.into(), Arc::new(value));
    }

    /// Fetch a value from the shared data, if present and of type `T`.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.inner.data.read().get(key).cloned()?;
        value.downcast::<T>().ok()
    }

    /// Remove a value from the shared data.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.data.write().remove(key).is_some()
    }

    /// Divert the request into a failure walk carrying `error`.
    ///
    /// Use this for errors that surface after asynchronous work, once the
    /// handler has already returned.
    pub fn fail(&self, error: Error) {
        self.inner.router.escalate_failure(Failure::from_error(error), self);
    }

    /// Divert the request into a failure walk carrying a status code.
    pub fn fail_status(&self, status_code: u16) {
        self.inner
            .router
            .escalate_failure(Failure::from_status(status_code), self);
    }

    /// Run the next matching handler of the chain.
    ///
    /// Safe to call after the response has ended; the remaining handlers
    /// still run and the default responses are never written over an ended
    /// response.
    pub fn next(&self) {
        let failed = self.failed();

        loop {
            // The cursor lock must not be held while a handler runs: it may call `next` again.
            let route = self.inner.cursor.lock().next();
            let Some(route) = route else {
                break;
            };
            let Some(matched) = route.matches(&self.inner.request, self.mount_point(), failed) else {
                continue;
            };

            self.inner.match_count.fetch_add(1, Ordering::SeqCst);
            self.inner.local_matches.fetch_add(1, Ordering::SeqCst);
            *self.inner.current_route.lock() = Some(route);
            *self.inner.acceptable_content_type.lock() = matched.acceptable_content_type;

            self.invoke(&matched.handler);
            return;
        }

        self.exhausted(failed);
    }

    fn invoke(&self, handler: &Handler) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(self)));
        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(payload) => Error::Panic(panic_message(payload.as_ref())),
        };

        if self.failed() {
            // A failure handler that fails would be found again by a new walk.
            self.unhandled_failure(&Failure::from_error(error));
        } else {
            self.inner
                .router
                .escalate_failure(Failure::from_error(error), self);
        }
    }

    fn exhausted(&self, failed: bool) {
        if let Some(parent) = &self.inner.parent {
            if self.inner.delegated.swap(true, Ordering::SeqCst) {
                return;
            }
            if self.inner.nested && self.inner.local_matches.load(Ordering::SeqCst) == 0 {
                // The route that entered this context does not count as a match on its own,
                // at any depth: the parent may be left with no match of its own either.
                self.inner.match_count.fetch_sub(1, Ordering::SeqCst);
                parent.inner.local_matches.fetch_sub(1, Ordering::SeqCst);
            }
            parent.next();
            return;
        }

        if self.inner.match_count.load(Ordering::SeqCst) > 0 {
            return;
        }
        if failed {
            let failure = self.inner.failure.clone().unwrap_or_default();
            self.unhandled_failure(&failure);
        } else {
            self.not_found();
        }
    }

    fn not_found(&self) {
        self.write_default(StatusCode::NotFound as u16, DEFAULT_404);
    }

    fn unhandled_failure(&self, failure: &Failure) {
        let status = failure
            .status_code
            .unwrap_or(StatusCode::InternalServerError as u16);

        if let Some(handler) = self.inner.router.get_error_handler(status) {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(self))) {
                Ok(Ok(())) => return,
                Ok(Err(err)) => error!("Error handler for status {status} failed: {err}"),
                Err(payload) => error!(
                    "Error handler for status {status} panicked: {}",
                    panic_message(payload.as_ref())
                ),
            }
        }

        if let Some(err) = &failure.error {
            if self.inner.router.config().log_unhandled_failures {
                error!("Unexpected exception in route: {err}");
            }
        }
        self.write_default(status, UNHANDLED_FAILURE);
    }

    fn write_default(&self, status: u16, body: &str) {
        let response = self.response();
        if response.ended() {
            return;
        }
        response
            .set_status_code(status)
            .put_header("Content-Type", "text/html; charset=utf-8");
        if let Some(server_name) = &self.inner.router.config().server_name {
            response.put_header("Server", server_name.clone());
        }
        if let Err(err) = response.end_with(body) {
            debug!("Default {status} response not written: {err}");
        }
    }
}
