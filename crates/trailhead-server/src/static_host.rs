//! Filesystem-backed host for exported apps
//!
//! Serves `dist/<page>.html` files described by `dist/_trailhead/routes.json`.
//! When no export exists the manifest is compiled on startup from the app
//! directory. API handlers are registered in-process through [`ApiRegistry`].

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};
use trailhead_router::{
    get_routes, get_server_manifest, CompiledRoute, FsContext, Manifest, MiddlewareEntry,
};

use crate::config::Config;
use crate::error::DispatchError;
use crate::host::{ApiModule, ApiModuleSource, HtmlContent, RouteHost};
use crate::middleware::MiddlewareRequest;
use crate::response;
use crate::views;

/// Middleware hook run when the manifest names a middleware module
pub type MiddlewareFn = Arc<dyn Fn(&MiddlewareRequest) -> Option<Response> + Send + Sync>;

/// In-process API handlers keyed by manifest page (`/hello`, `/users/[id]`)
#[derive(Clone, Default)]
pub struct ApiRegistry {
    routes: HashMap<String, Arc<ApiModule>>,
    middleware: Option<MiddlewareFn>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, page: impl Into<String>, module: ApiModule) -> Self {
        self.routes.insert(page.into(), Arc::new(module));
        self
    }

    pub fn with_middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(&MiddlewareRequest) -> Option<Response> + Send + Sync + 'static,
    {
        self.middleware = Some(Arc::new(middleware));
        self
    }

    pub fn get(&self, page: &str) -> Option<Arc<ApiModule>> {
        self.routes.get(page).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// [`RouteHost`] over an export directory
pub struct DistHost {
    manifest: Option<Arc<Manifest>>,
    dist_dir: PathBuf,
    api: ApiRegistry,
    dev: bool,
}

impl DistHost {
    pub fn new(manifest: Option<Manifest>, dist_dir: impl Into<PathBuf>, api: ApiRegistry) -> Self {
        Self {
            manifest: manifest.map(Arc::new),
            dist_dir: dist_dir.into(),
            api,
            dev: false,
        }
    }

    /// Render error details instead of a bare 500
    pub fn with_dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    /// Exported manifest if present, else one compiled from the app directory
    pub fn from_config(config: &Config, api: ApiRegistry) -> Result<Self> {
        let manifest = load_manifest(config)?;
        Ok(Self::new(manifest, &config.build.output_dir, api).with_dev(config.dev.enabled))
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_deref()
    }

    fn html_path(&self, page: &str) -> PathBuf {
        self.dist_dir
            .join(format!("{}.html", page.trim_start_matches('/')))
    }

    /// Built-in markup for a generated route without an exported file
    fn generated_html(&self, request: &Parts, route: &CompiledRoute) -> Option<String> {
        if !route.is_generated() {
            return None;
        }
        match route.page.as_str() {
            "/_sitemap" => self
                .manifest
                .as_deref()
                .map(|manifest| views::sitemap(manifest).into_string()),
            "/+not-found" => Some(views::not_found(request.uri.path()).into_string()),
            _ => None,
        }
    }
}

fn load_manifest(config: &Config) -> Result<Option<Manifest>> {
    let manifest_path = config.manifest_path();
    if manifest_path.exists() {
        let json = std::fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read manifest: {:?}", manifest_path))?;
        let manifest = Manifest::from_json(&json)
            .with_context(|| format!("Failed to parse manifest: {:?}", manifest_path))?;
        info!(path = ?manifest_path, "loaded exported routes manifest");
        return Ok(Some(manifest));
    }

    let app_dir = Path::new(&config.routing.app_dir);
    if !app_dir.is_dir() {
        warn!(app_dir = ?app_dir, "no exported manifest and no app directory");
        return Ok(None);
    }

    // The dispatcher needs rule entries; aliases have no exported page of their own
    let options = config.routing.options.clone().with_preserved_rules(true);
    let tree = get_routes(&FsContext::new(app_dir), &options)
        .with_context(|| format!("Failed to compile routes in {:?}", app_dir))?;
    for diagnostic in &tree.diagnostics {
        warn!("{diagnostic}");
    }
    let manifest = get_server_manifest(&tree)?;
    info!(
        app_dir = ?app_dir,
        html = manifest.html_routes.len(),
        api = manifest.api_routes.len(),
        "compiled routes manifest"
    );
    Ok(Some(manifest))
}

#[async_trait]
impl RouteHost for DistHost {
    async fn get_routes_manifest(&self) -> Result<Option<Arc<Manifest>>> {
        Ok(self.manifest.clone())
    }

    async fn get_html(&self, request: &Parts, route: &CompiledRoute) -> Result<Option<HtmlContent>> {
        let path = self.html_path(&route.page);
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => Ok(Some(HtmlContent::Html(html))),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Ok(self.generated_html(request, route).map(HtmlContent::Html))
            }
            Err(err) => Err(err).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    async fn get_api_route(&self, route: &CompiledRoute) -> Result<Option<ApiModuleSource>> {
        Ok(self.api.get(&route.page).map(ApiModuleSource::Module))
    }

    async fn handle_route_error(&self, error: DispatchError) -> Response {
        error!(error = %error, "route error");
        if self.dev {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::response::Html(views::route_error(&error).into_string()),
            )
                .into_response();
        }
        response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    async fn middleware(
        &self,
        request: &MiddlewareRequest,
        _entry: &MiddlewareEntry,
    ) -> Result<Option<Response>> {
        Ok(self.api.middleware.as_ref().and_then(|hook| hook(request)))
    }
}
