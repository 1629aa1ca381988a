//! Collaborator contract between the dispatcher and the hosting runtime
//!
//! The dispatcher owns matching and precedence. Everything that touches
//! content (the manifest itself, HTML, API modules, error pages) comes from a
//! [`RouteHost`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{request::Parts, Method, Request};
use axum::response::Response;
use trailhead_router::{CompiledRoute, Manifest, MiddlewareEntry};

use crate::error::DispatchError;
use crate::middleware::MiddlewareRequest;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Route parameters keyed by logical name, percent-decoded
pub type Params = BTreeMap<String, String>;

/// API method handler
///
/// `Ok(None)` stands for a handler that resolved to something other than a
/// response; the dispatcher reports it as
/// [`DispatchError::InvalidHandlerResult`].
pub type ApiHandler =
    Arc<dyn Fn(Request<Body>, Params) -> BoxFuture<'static, Result<Option<Response>>> + Send + Sync>;

/// What an HTML lookup produced
pub enum HtmlContent {
    /// Markup served with the phase's status and `text/html`
    Html(String),
    /// Passed through untouched (development error pages)
    Response(Response),
}

impl fmt::Debug for HtmlContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HtmlContent::Html(html) => f.debug_tuple("Html").field(&html.len()).finish(),
            HtmlContent::Response(response) => {
                f.debug_tuple("Response").field(&response.status()).finish()
            }
        }
    }
}

/// Method handlers of one API route
#[derive(Clone, Default)]
pub struct ApiModule {
    handlers: HashMap<Method, ApiHandler>,
}

impl ApiModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for `method`
    ///
    /// ```ignore
    /// ApiModule::new().with_handler(Method::GET, |_req, params| async move {
    ///     Ok(Some(Json(params).into_response()))
    /// })
    /// ```
    pub fn with_handler<F, Fut>(mut self, method: Method, handler: F) -> Self
    where
        F: Fn(Request<Body>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Response>>> + Send + 'static,
    {
        let handler: ApiHandler = Arc::new(
            move |request: Request<Body>, params: Params| -> BoxFuture<'static, Result<Option<Response>>> {
                Box::pin(handler(request, params))
            },
        );
        self.handlers.insert(method, handler);
        self
    }

    pub fn handler(&self, method: &Method) -> Option<&ApiHandler> {
        self.handlers.get(method)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.handlers.keys()
    }
}

impl fmt::Debug for ApiModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiModule")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// What an API module lookup produced
#[derive(Debug)]
pub enum ApiModuleSource {
    Module(Arc<ApiModule>),
    /// Passed through untouched (development bundling errors)
    Response(Response),
}

/// Content provider for [`dispatch`](crate::dispatch)
///
/// Request views are passed as [`Parts`] because the body stays with the
/// dispatcher until an API handler takes it.
#[async_trait]
pub trait RouteHost: Send + Sync {
    /// Current manifest; `None` means routing is not set up
    async fn get_routes_manifest(&self) -> Result<Option<Arc<Manifest>>>;

    /// HTML for a page or not-found route
    async fn get_html(&self, request: &Parts, route: &CompiledRoute) -> Result<Option<HtmlContent>>;

    /// Handlers for an API route
    async fn get_api_route(&self, route: &CompiledRoute) -> Result<Option<ApiModuleSource>>;

    /// Turns a page or API failure into a response
    async fn handle_route_error(&self, error: DispatchError) -> Response;

    /// Runs before matching when the manifest names a middleware module
    ///
    /// Returning a response short-circuits the dispatch.
    async fn middleware(
        &self,
        _request: &MiddlewareRequest,
        _entry: &MiddlewareEntry,
    ) -> Result<Option<Response>> {
        Ok(None)
    }
}

#[async_trait]
impl<T: RouteHost + ?Sized> RouteHost for Arc<T> {
    async fn get_routes_manifest(&self) -> Result<Option<Arc<Manifest>>> {
        (**self).get_routes_manifest().await
    }

    async fn get_html(&self, request: &Parts, route: &CompiledRoute) -> Result<Option<HtmlContent>> {
        (**self).get_html(request, route).await
    }

    async fn get_api_route(&self, route: &CompiledRoute) -> Result<Option<ApiModuleSource>> {
        (**self).get_api_route(route).await
    }

    async fn handle_route_error(&self, error: DispatchError) -> Response {
        (**self).handle_route_error(error).await
    }

    async fn middleware(
        &self,
        request: &MiddlewareRequest,
        entry: &MiddlewareEntry,
    ) -> Result<Option<Response>> {
        (**self).middleware(request, entry).await
    }
}
